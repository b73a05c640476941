//! Submission of validated payment batches.
//!
//! Both shapes refresh the CSRF token unconditionally before posting; the
//! submission endpoints want the freshest token even inside an active
//! session. A non-success response is returned to the caller verbatim, not
//! raised: part of the batch may already have landed remotely, so the
//! operator has to read the response themselves.

use crate::error::Result;
use crate::reconcile::PaymentRecord;
use crate::session::Session;
use chrono::NaiveDate;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    Rejected { status: u16, body: String },
}

/// Posts a payroll batch: one JSON document listing each record with its
/// own pay date, subtype and note. The dashboard answers 200 on success.
pub fn submit_payroll(session: &mut Session, records: &[PaymentRecord]) -> Result<SubmissionOutcome> {
    session.ensure_active()?;
    session.refresh_csrf()?;
    tracing::info!(count = records.len(), "submitting payroll batch");

    let payments: Vec<_> = records
        .iter()
        .map(|record| {
            json!({
                "member_uuid": record.member_uuid,
                "pay_date": record.pay_date,
                "amount": record.amount_string(),
                "subtype": record.subtype,
                "note": record.note,
            })
        })
        .collect();
    let body = json!({ "payments": payments });

    let response = session
        .http_post(session.config().submit_url())
        .json(&body)
        .send()?;
    let status = response.status();
    if status.as_u16() == 200 {
        Ok(SubmissionOutcome::Accepted)
    } else {
        Ok(SubmissionOutcome::Rejected {
            status: status.as_u16(),
            body: response.text()?,
        })
    }
}

/// Posts a bonus batch: a shared form section (one pay date, fixed tax and
/// deduction settings, one note) plus a map from employee uuid to an
/// integer amount in cents. The dashboard answers 201 on success.
pub fn submit_bonus(
    session: &mut Session,
    records: &[PaymentRecord],
    pay_date: NaiveDate,
    note: &str,
) -> Result<SubmissionOutcome> {
    session.ensure_active()?;
    session.refresh_csrf()?;
    tracing::info!(count = records.len(), %pay_date, "submitting bonus batch");

    let amounts: serde_json::Map<String, serde_json::Value> = records
        .iter()
        .map(|record| (record.member_uuid.clone(), json!(record.amount_cents())))
        .collect();
    let body = json!({
        "form": {
            "pay_date": pay_date,
            "note": note,
            "tax_method": "supplemental",
            "apply_deductions": false,
        },
        "amounts": amounts,
    });

    let response = session
        .http_post(session.config().bonus_url())
        .json(&body)
        .send()?;
    let status = response.status();
    if status.as_u16() == 201 {
        Ok(SubmissionOutcome::Accepted)
    } else {
        Ok(SubmissionOutcome::Rejected {
            status: status.as_u16(),
            body: response.text()?,
        })
    }
}
