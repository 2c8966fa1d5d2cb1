//! Flat CSV export of a user's expenses, newest first.

use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::db::{Database, Filter};
use crate::error::LedgerResult;

const HEADER: [&str; 4] = ["Date", "Category", "Amount", "Note"];

/// Writes `Date,Category,Amount,Note` rows and returns how many expenses
/// were written.
pub(crate) fn write_expenses<W: Write>(
    db: &Database,
    user_id: i64,
    filter: &Filter,
    out: W,
) -> LedgerResult<usize> {
    let expenses = db.expenses(user_id, filter)?;
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(HEADER)?;
    for e in &expenses {
        wtr.write_record([
            e.date.format("%Y-%m-%d").to_string(),
            e.category.as_str().to_string(),
            format!("{:.2}", e.amount),
            e.note.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(expenses.len())
}

pub(crate) fn export_expenses(db: &Database, user_id: i64, path: &Path) -> LedgerResult<usize> {
    let file = std::fs::File::create(path)?;
    let count = write_expenses(db, user_id, &Filter::all(), file)?;
    info!(user_id, count, path = %path.display(), "exported expenses");
    Ok(count)
}

#[cfg(test)]
mod tests;
