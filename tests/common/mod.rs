#![allow(dead_code)]

use chrono::NaiveDate;
use paybatch::reference::{Employee, MemberState, PayDateOption, PaymentSubtype, ReferenceData};
use std::collections::BTreeMap;

pub fn employee(name: &str, uuid: &str, payable: bool, frequency: Option<&str>) -> Employee {
    Employee {
        name: name.to_string(),
        uuid: uuid.to_string(),
        payable,
        state: MemberState {
            pay_frequency: frequency.map(str::to_string),
        },
    }
}

pub fn pay_date(date: &str, disabled: bool) -> PayDateOption {
    PayDateOption {
        value: date.parse::<NaiveDate>().unwrap(),
        description: String::new(),
        disabled,
    }
}

pub fn subtype(value: &str, description: &str) -> PaymentSubtype {
    PaymentSubtype {
        value: value.to_string(),
        description: description.to_string(),
    }
}

/// Alice and Bob are payable biweekly employees; Carol is not payable.
/// The biweekly group deliberately lists a disabled date first.
pub fn reference() -> ReferenceData {
    let mut pay_dates = BTreeMap::new();
    pay_dates.insert(
        "biweekly".to_string(),
        vec![
            pay_date("2024-03-01", true),
            pay_date("2024-02-15", false),
            pay_date("2024-02-01", false),
        ],
    );
    pay_dates.insert("monthly".to_string(), vec![pay_date("2024-03-31", true)]);

    ReferenceData {
        employees: vec![
            employee("Alice Smith", "U1", true, Some("biweekly")),
            employee("Bob Jones", "U2", true, Some("biweekly")),
            employee("Carol Held", "U3", false, Some("biweekly")),
            employee("Dan Monthly", "U4", true, Some("monthly")),
        ],
        pay_dates,
        subtypes: vec![
            subtype("bonus", "Discretionary bonus"),
            subtype("reimbursement", "Expense reimbursement"),
        ],
    }
}

/// Wraps a JSON payload in the dashboard's hydration markup.
pub fn hydration_block(key: &str, payload: &str) -> String {
    format!(r#"<script hydration-key="{key}" type="application/json">{payload}</script>"#)
}

pub fn login_page(token: &str) -> String {
    format!(
        "<html><body>{}</body></html>",
        hydration_block("form_authenticity_token", &format!("\"{token}\""))
    )
}

/// The RFC 6238 test seed, base32-encoded.
pub const OTP_SEED: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

pub fn otp_page() -> String {
    format!(
        "<html><body>{}</body></html>",
        hydration_block("tfaInfo", &format!("{{\"key\": \"{OTP_SEED}\"}}"))
    )
}

pub const CSRF_TOKEN: &str = "csrf-abc";

/// Mounts the happy-path authentication protocol. Login and OTP
/// submissions require the CSRF token read off the login page; an
/// unmatched request 404s and fails the flow.
pub async fn mount_login(server: &wiremock::MockServer) {
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_page(CSRF_TOKEN)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("x-csrf-token", CSRF_TOKEN))
        .and(body_string_contains("username="))
        .respond_with(ResponseTemplate::new(302))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tfa"))
        .respond_with(ResponseTemplate::new(200).set_body_string(otp_page()))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tfa"))
        .and(header("x-csrf-token", CSRF_TOKEN))
        .and(body_string_contains("method=app"))
        .and(body_string_contains("auth_code="))
        .respond_with(ResponseTemplate::new(302))
        .mount(server)
        .await;
}

/// The login protocol plus a healthy reference form.
pub async fn mount_auth(server: &wiremock::MockServer) {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    mount_login(server).await;
    Mock::given(method("GET"))
        .and(path("/payments/form"))
        .respond_with(ResponseTemplate::new(200).set_body_string(form_page()))
        .mount(server)
        .await;
}

/// A form page whose three hydration blocks mirror [`reference`].
pub fn form_page() -> String {
    let members = r#"[
        {"name": "Alice Smith", "uuid": "U1", "payable": true,
         "current_member_state": {"pay_frequency": "biweekly"}},
        {"name": "Bob Jones", "uuid": "U2", "payable": true,
         "current_member_state": {"pay_frequency": "biweekly"}},
        {"name": "Carol Held", "uuid": "U3", "payable": false,
         "current_member_state": {"pay_frequency": "biweekly"}}
    ]"#;
    let dates = r#"{
        "biweekly": [
            {"value": "2024-03-01", "description": "Next", "disabled": true},
            {"value": "2024-02-15", "description": "Regular", "disabled": false},
            {"value": "2024-02-01", "description": "Regular", "disabled": false}
        ]
    }"#;
    let subtypes = r#"[
        {"value": "bonus", "description": "Discretionary bonus"},
        {"value": "reimbursement", "description": "Expense reimbursement"}
    ]"#;
    format!(
        "<html><body>{}{}{}</body></html>",
        hydration_block("members", members),
        hydration_block("upcomingPayDates", dates),
        hydration_block("paymentSubtypes", subtypes),
    )
}
