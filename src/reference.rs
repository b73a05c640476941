//! Reference data served by the dashboard's payment form.
//!
//! One page fetch yields three hydration blocks: the employee roster, the
//! upcoming pay dates per pay frequency, and the payment subtype catalog.
//! All three are read from the same document so the snapshot is mutually
//! consistent for the whole run.

use crate::error::{PaybatchError, Result};
use crate::extract::extract_embedded;
use crate::session::Session;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

const MEMBERS_KEY: &str = "members";
const PAY_DATES_KEY: &str = "upcomingPayDates";
const SUBTYPES_KEY: &str = "paymentSubtypes";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Employee {
    pub name: String,
    pub uuid: String,
    pub payable: bool,
    #[serde(rename = "current_member_state")]
    pub state: MemberState,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MemberState {
    pub pay_frequency: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PayDateOption {
    pub value: NaiveDate,
    #[serde(default)]
    pub description: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PaymentSubtype {
    pub value: String,
    pub description: String,
}

/// Immutable snapshot of the dashboard's reference data for one run.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub employees: Vec<Employee>,
    pub pay_dates: BTreeMap<String, Vec<PayDateOption>>,
    pub subtypes: Vec<PaymentSubtype>,
}

/// Fetches the payment form once and decodes the three embedded payloads.
pub fn load_reference_data(session: &mut Session) -> Result<ReferenceData> {
    session.ensure_active()?;
    tracing::info!("loading reference data");
    let response = session.http_get(session.config().form_url()).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(PaybatchError::ReferenceLoadFailed {
            status: status.as_u16(),
        });
    }
    let document = response.text()?;
    Ok(ReferenceData {
        employees: decode(&document, MEMBERS_KEY)?,
        pay_dates: decode(&document, PAY_DATES_KEY)?,
        subtypes: decode(&document, SUBTYPES_KEY)?,
    })
}

fn decode<T: DeserializeOwned>(document: &str, key: &str) -> Result<T> {
    let value = extract_embedded(document, key)?;
    serde_json::from_value(value).map_err(|e| PaybatchError::PayloadShape {
        key: key.to_string(),
        detail: e.to_string(),
    })
}
