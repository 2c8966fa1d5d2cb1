use std::path::Path;
use tracing::debug;

use crate::db::Database;
use crate::error::LedgerResult;
use crate::ledger::{self, BatchOutcome};
use crate::models::ExpenseDraft;

const DATE_COLUMN: usize = 0;
const CATEGORY_COLUMN: usize = 1;
const AMOUNT_COLUMN: usize = 2;
const NOTE_COLUMN: usize = 3;

const HEADER_NAMES: &[&str] = &["date", "category", "amount", "note", "notes", "description"];

/// Reads `date,category,amount[,note]` rows. A leading header row is
/// detected and skipped.
pub(crate) struct ExpenseCsv;

impl ExpenseCsv {
    /// Every data row as an unvalidated draft, in file order.
    pub(crate) fn read(path: &Path) -> LedgerResult<Vec<ExpenseDraft>> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut rows: Vec<Vec<String>> = Vec::new();
        for result in rdr.records() {
            let record = result?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.first().is_some_and(|first| looks_like_header(first)) {
            rows.remove(0);
        }
        debug!(path = %path.display(), rows = rows.len(), "read expense csv");

        Ok(rows.iter().map(|row| draft_from_row(row)).collect())
    }
}

/// Feeds every row through the bulk-add path; bad rows are counted, not fatal.
pub(crate) fn import_expenses(
    db: &Database,
    user_id: i64,
    path: &Path,
) -> LedgerResult<BatchOutcome> {
    let drafts = ExpenseCsv::read(path)?;
    Ok(ledger::add_expenses(db, user_id, &drafts))
}

/// A row naming its date and amount columns. Any other first row is data.
fn looks_like_header(row: &[String]) -> bool {
    let is_column_name = |idx: usize| {
        row.get(idx)
            .is_some_and(|cell| HEADER_NAMES.iter().any(|name| cell.eq_ignore_ascii_case(name)))
    };
    is_column_name(DATE_COLUMN) && is_column_name(AMOUNT_COLUMN)
}

fn draft_from_row(row: &[String]) -> ExpenseDraft {
    let field = |idx: usize| row.get(idx).map(String::as_str).unwrap_or_default();
    let note = row.get(NOTE_COLUMN).map(String::as_str);
    ExpenseDraft::new(
        &clean_amount(field(AMOUNT_COLUMN)),
        field(CATEGORY_COLUMN),
        field(DATE_COLUMN),
        note,
    )
}

/// Drops a currency sign and thousands separators: `$1,234.50` → `1234.50`.
fn clean_amount(s: &str) -> String {
    s.replace(['$', ','], "").trim().to_string()
}

#[cfg(test)]
#[path = "csv_import_tests.rs"]
mod tests;
