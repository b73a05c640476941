//! Reconciliation of intended payments against the reference snapshot.
//!
//! Input rows are untrusted: every field is validated before a
//! [`PaymentRecord`] may exist. A bad row rejects that row and marks the run
//! invalid but never aborts the batch; only a header mismatch does, with
//! zero rows processed.

use crate::reference::{Employee, PayDateOption, ReferenceData};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub const MIN_AMOUNT: Decimal = dec!(0.01);
pub const MAX_AMOUNT: Decimal = dec!(100000.00);

/// Run-scoped request identifier threaded through every payment note so the
/// remote side can be audited against one invocation.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
}

impl RunContext {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string()[..4].to_ascii_uppercase();
        Self {
            run_id: format!("{}_{}", now.format("%Y-%m-%d_%H:%M:%S"), suffix),
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Which batch shape the input file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Columns `name, amount, type, note`; each record resolves its own pay
    /// date and subtype.
    Payroll,
    /// Columns `name, amount`; pay date and note are shared at submission.
    Bonus,
}

impl BatchMode {
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            BatchMode::Payroll => &["name", "amount", "type", "note"],
            BatchMode::Bonus => &["name", "amount"],
        }
    }
}

/// One raw input row, exactly as read from the CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntendedPaymentRow {
    pub name: String,
    pub amount: String,
    pub subtype: Option<String>,
    pub note: Option<String>,
}

/// Validated, submission-ready payment. Only reconciliation constructs
/// these; they are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub name: String,
    pub member_uuid: String,
    pub amount: Decimal,
    pub pay_date: Option<NaiveDate>,
    pub subtype: Option<String>,
    pub note: Option<String>,
}

impl PaymentRecord {
    /// Amount as the submission wire format: exactly two fraction digits.
    pub fn amount_string(&self) -> String {
        format!("{:.2}", self.amount)
    }

    /// Amount in minor currency units, rounded half-up.
    pub fn amount_cents(&self) -> i64 {
        (self.amount * dec!(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .expect("amount is bounded by reconciliation")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("CSV header must be exactly {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("expected {expected} fields, found {found}")]
    MalformedRow { expected: usize, found: usize },
    #[error("unknown employee '{0}'")]
    UnknownEmployee(String),
    #[error("employee '{0}' is not payable")]
    NotPayable(String),
    #[error("employee '{employee}' has no pay dates for frequency '{frequency}'")]
    UnknownPayFrequency { employee: String, frequency: String },
    #[error("no enabled pay date for frequency '{0}'")]
    NoEligiblePayDate(String),
    #[error("unknown payment subtype '{0}'")]
    UnknownSubtype(String),
    #[error("'{0}' is not a valid payment amount")]
    InvalidAmount(String),
    #[error("unreadable row: {0}")]
    Unreadable(String),
}

/// A rejected row with enough context to print an actionable error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub line: usize,
    pub row: String,
    pub reason: RejectReason,
}

/// Everything the run produced: accepted records are always returned, even
/// when other rows failed, so the operator sees what would be submitted.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub records: Vec<PaymentRecord>,
    pub rejections: Vec<Rejection>,
}

impl RunOutcome {
    pub fn all_valid(&self) -> bool {
        self.rejections.is_empty()
    }
}

pub struct Reconciler<'a> {
    reference: &'a ReferenceData,
    run_id: &'a str,
    mode: BatchMode,
    employees_by_name: HashMap<&'a str, &'a Employee>,
    subtypes_by_value: HashMap<&'a str, &'a str>,
}

impl<'a> Reconciler<'a> {
    pub fn new(reference: &'a ReferenceData, run_id: &'a str, mode: BatchMode) -> Self {
        let employees_by_name = reference
            .employees
            .iter()
            .map(|e| (e.name.as_str(), e))
            .collect();
        let subtypes_by_value = reference
            .subtypes
            .iter()
            .map(|s| (s.value.as_str(), s.value.as_str()))
            .collect();
        Self {
            reference,
            run_id,
            mode,
            employees_by_name,
            subtypes_by_value,
        }
    }

    /// Reads and reconciles the whole CSV source. A header row matching the
    /// expected columns is skipped; a header row that does not match aborts
    /// the load with zero records.
    pub fn reconcile_csv<R: Read>(&self, source: R) -> RunOutcome {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .has_headers(false)
            .from_reader(source);

        let mut outcome = RunOutcome::default();
        let expected = self.mode.columns();
        let mut first = true;
        for (index, result) in reader.records().enumerate() {
            let line = index + 1;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    outcome.rejections.push(Rejection {
                        line,
                        row: String::new(),
                        reason: RejectReason::Unreadable(e.to_string()),
                    });
                    continue;
                }
            };
            if first {
                first = false;
                if record.get(0) == Some("name") {
                    let found: Vec<String> =
                        record.iter().map(|field| field.to_string()).collect();
                    let expected: Vec<String> =
                        expected.iter().map(|c| c.to_string()).collect();
                    if found != expected {
                        tracing::error!(?expected, ?found, "CSV schema mismatch");
                        return RunOutcome {
                            records: Vec::new(),
                            rejections: vec![Rejection {
                                line,
                                row: found.join(","),
                                reason: RejectReason::SchemaMismatch { expected, found },
                            }],
                        };
                    }
                    continue;
                }
            }
            match self.reconcile_record(&record) {
                Ok(payment) => outcome.records.push(payment),
                Err(reason) => {
                    tracing::error!(line, %reason, "row rejected");
                    outcome.rejections.push(Rejection {
                        line,
                        row: record.iter().collect::<Vec<_>>().join(","),
                        reason,
                    });
                }
            }
        }
        outcome
    }

    /// Reconciles already-parsed rows. Same pipeline as
    /// [`Self::reconcile_csv`] minus the header handling.
    pub fn reconcile(&self, rows: &[IntendedPaymentRow]) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        for (index, row) in rows.iter().enumerate() {
            match self.reconcile_row(row) {
                Ok(payment) => outcome.records.push(payment),
                Err(reason) => outcome.rejections.push(Rejection {
                    line: index + 1,
                    row: format!("{row:?}"),
                    reason,
                }),
            }
        }
        outcome
    }

    fn reconcile_record(
        &self,
        record: &csv::StringRecord,
    ) -> std::result::Result<PaymentRecord, RejectReason> {
        let expected = self.mode.columns().len();
        if record.len() != expected {
            return Err(RejectReason::MalformedRow {
                expected,
                found: record.len(),
            });
        }
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        let row = match self.mode {
            BatchMode::Payroll => IntendedPaymentRow {
                name: field(0),
                amount: field(1),
                subtype: Some(field(2)),
                note: Some(field(3)),
            },
            BatchMode::Bonus => IntendedPaymentRow {
                name: field(0),
                amount: field(1),
                subtype: None,
                note: None,
            },
        };
        self.reconcile_row(&row)
    }

    fn reconcile_row(
        &self,
        row: &IntendedPaymentRow,
    ) -> std::result::Result<PaymentRecord, RejectReason> {
        let name = row.name.trim();
        let employee = self
            .employees_by_name
            .get(name)
            .copied()
            .ok_or_else(|| RejectReason::UnknownEmployee(name.to_string()))?;
        if !employee.payable {
            return Err(RejectReason::NotPayable(employee.name.clone()));
        }

        let (pay_date, subtype, note) = match self.mode {
            BatchMode::Payroll => {
                let frequency = employee.state.pay_frequency.clone().unwrap_or_default();
                let group = self.reference.pay_dates.get(&frequency).ok_or_else(|| {
                    RejectReason::UnknownPayFrequency {
                        employee: employee.name.clone(),
                        frequency: frequency.clone(),
                    }
                })?;
                let pay_date = nearest_enabled(group)
                    .ok_or_else(|| RejectReason::NoEligiblePayDate(frequency.clone()))?;

                let raw_subtype = row.subtype.as_deref().unwrap_or_default().trim();
                let subtype = self
                    .subtypes_by_value
                    .get(raw_subtype)
                    .copied()
                    .ok_or_else(|| RejectReason::UnknownSubtype(raw_subtype.to_string()))?;

                let note = format!(
                    "{} {}",
                    self.run_id,
                    row.note.as_deref().unwrap_or_default()
                );
                (Some(pay_date), Some(subtype.to_string()), Some(note))
            }
            BatchMode::Bonus => (None, None, None),
        };

        let amount = parse_amount(&row.amount)
            .ok_or_else(|| RejectReason::InvalidAmount(row.amount.trim().to_string()))?;

        Ok(PaymentRecord {
            name: employee.name.clone(),
            member_uuid: employee.uuid.clone(),
            amount,
            pay_date,
            subtype,
            note,
        })
    }
}

/// Earliest enabled date within a pay-frequency group.
fn nearest_enabled(group: &[PayDateOption]) -> Option<NaiveDate> {
    group
        .iter()
        .filter(|option| !option.disabled)
        .map(|option| option.value)
        .min()
}

/// Parses a trimmed decimal amount with at most two fraction digits inside
/// the inclusive [0.01, 100000.00] sanity bounds.
fn parse_amount(raw: &str) -> Option<Decimal> {
    let amount = Decimal::from_str(raw.trim()).ok()?.normalize();
    if amount.scale() > 2 || amount < MIN_AMOUNT || amount > MAX_AMOUNT {
        return None;
    }
    Some(amount)
}
