//! Operator-facing listing of what a run would submit.

use crate::reconcile::PaymentRecord;
use std::io::{self, Write};

/// Tabular listing for payroll batches: name, pay date, amount, subtype,
/// note. Printed even when some rows were rejected, so the operator sees
/// exactly what would go out.
pub fn write_payroll<W: Write>(records: &[PaymentRecord], out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "{:<30}\t{:<10}\t{:>10}\t{:<40}\t{}",
        "name", "pay_date", "amount", "subtype", "note"
    )?;
    for record in records {
        let pay_date = record
            .pay_date
            .map(|d| d.to_string())
            .unwrap_or_default();
        writeln!(
            out,
            "{:<30}\t{:<10}\t{:>10}\t{:<40}\t{}",
            record.name,
            pay_date,
            record.amount_string(),
            record.subtype.as_deref().unwrap_or_default(),
            record.note.as_deref().unwrap_or_default(),
        )?;
    }
    Ok(())
}

/// Tabular listing for bonus batches: name and amount only.
pub fn write_bonus<W: Write>(records: &[PaymentRecord], out: &mut W) -> io::Result<()> {
    writeln!(out, "{:<30}\t{:>10}", "name", "amount")?;
    for record in records {
        writeln!(
            out,
            "{:<30}\t{:>10}",
            record.name,
            record.amount_string()
        )?;
    }
    Ok(())
}
