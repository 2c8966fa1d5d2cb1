//! Validating, user-scoped mutations of the ledger.
//!
//! Every function takes the authenticated `user_id` explicitly. Single-item
//! operations return the first failure; batch operations apply each item on
//! its own and only report how many succeeded and failed.

use tracing::{info, warn};

use crate::db::{Database, DateWindow, Filter, Table};
use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::models::{
    Budget, BudgetCategory, Category, Expense, ExpenseDraft, Income, IncomeDraft, Page, YearMonth,
};
use crate::validate;

/// Outcome of a batch where each item is applied independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BatchOutcome {
    pub(crate) succeeded: usize,
    pub(crate) failed: usize,
}

impl BatchOutcome {
    fn record<T>(&mut self, result: &LedgerResult<T>) {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(_) => self.failed += 1,
        }
    }
}

// ── Expenses ──────────────────────────────────────────────────

fn validate_expense(user_id: i64, draft: &ExpenseDraft) -> Result<Expense, ValidationError> {
    let amount = validate::amount(&draft.amount)?;
    let date = validate::date(&draft.date)?;
    let category = validate::category(&draft.category)?;
    let note = validate::sanitize_text(draft.note.as_deref());
    Ok(Expense::new(user_id, amount, category, date, note))
}

pub(crate) fn add_expense(db: &Database, user_id: i64, draft: &ExpenseDraft) -> LedgerResult<i64> {
    let expense = validate_expense(user_id, draft)?;
    let id = db.insert_expense(&expense)?;
    info!(user_id, id, category = %expense.category, "added expense");
    Ok(id)
}

/// Adds each draft independently; a bad item never stops the rest.
pub(crate) fn add_expenses(db: &Database, user_id: i64, drafts: &[ExpenseDraft]) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for (i, draft) in drafts.iter().enumerate() {
        let result = add_expense(db, user_id, draft);
        if let Err(e) = &result {
            warn!(user_id, item = i, error = %e, "skipped expense");
        }
        outcome.record(&result);
    }
    outcome
}

/// Replaces every field of an expense the user owns.
pub(crate) fn edit_expense(
    db: &Database,
    user_id: i64,
    expense_id: i64,
    draft: &ExpenseDraft,
) -> LedgerResult<()> {
    let existing = db
        .get_expense(user_id, expense_id)?
        .ok_or(LedgerError::NotFound)?;
    let mut expense = validate_expense(user_id, draft)?;
    expense.id = existing.id;
    expense.created_at = existing.created_at;
    db.update_expense(&expense)?;
    info!(user_id, id = expense_id, "updated expense");
    Ok(())
}

pub(crate) fn get_expense(db: &Database, user_id: i64, expense_id: i64) -> LedgerResult<Expense> {
    db.get_expense(user_id, expense_id)?
        .ok_or(LedgerError::NotFound)
}

pub(crate) fn delete_expense(db: &Database, user_id: i64, expense_id: i64) -> LedgerResult<()> {
    log_delete(db.delete_by_id(Table::Expenses, user_id, expense_id), user_id, expense_id, "expense")
}

// ── Income ────────────────────────────────────────────────────

pub(crate) fn add_income(db: &Database, user_id: i64, draft: &IncomeDraft) -> LedgerResult<i64> {
    let amount = validate::amount(&draft.amount)?;
    let date = validate::date(&draft.date)?;
    let source = validate::sanitize_text(draft.source.as_deref());
    if source.is_empty() {
        return Err(ValidationError::SourceRequired.into());
    }
    let id = db.insert_income(&Income::new(user_id, amount, date, source))?;
    info!(user_id, id, "added income");
    Ok(id)
}

pub(crate) fn delete_income(db: &Database, user_id: i64, income_id: i64) -> LedgerResult<()> {
    log_delete(db.delete_by_id(Table::Income, user_id, income_id), user_id, income_id, "income")
}

fn log_delete(result: LedgerResult<()>, user_id: i64, id: i64, kind: &str) -> LedgerResult<()> {
    match &result {
        Ok(()) => info!(user_id, id, kind, "deleted"),
        Err(e) if e.is_not_found() => warn!(user_id, id, kind, "delete of missing or foreign row"),
        Err(_) => {}
    }
    result
}

// ── History ───────────────────────────────────────────────────

/// Builds a history filter from optional raw inputs. Both dates are inclusive.
pub(crate) fn history_filter(
    category: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Filter, ValidationError> {
    let from = from.map(validate::date).transpose()?;
    let to = to.map(validate::date).transpose()?;
    let window = match (from, to) {
        (None, None) => DateWindow::All,
        (from, to) => DateWindow::Range { from, to },
    };
    let mut filter = Filter::window(window);
    if let Some(category) = category {
        filter = filter.with_category(validate::category(category)?);
    }
    Ok(filter)
}

pub(crate) fn expense_history(
    db: &Database,
    user_id: i64,
    filter: &Filter,
    page: u32,
    page_size: u32,
) -> LedgerResult<Page<Expense>> {
    db.expense_page(user_id, filter, page, page_size)
}

pub(crate) fn income_history(
    db: &Database,
    user_id: i64,
    filter: &Filter,
    page: u32,
    page_size: u32,
) -> LedgerResult<Page<Income>> {
    db.income_page(user_id, filter, page, page_size)
}

/// Categories the user has spent in, for filter pickers.
pub(crate) fn expense_categories(db: &Database, user_id: i64) -> LedgerResult<Vec<Category>> {
    db.expense_categories(user_id)
}

// ── Budgets ───────────────────────────────────────────────────

/// Sets the limit for one category (or `TOTAL_MONTHLY`) in `month`,
/// replacing any existing limit.
pub(crate) fn set_budget(
    db: &Database,
    user_id: i64,
    category: &str,
    limit: &str,
    month: YearMonth,
) -> LedgerResult<i64> {
    let category = validate::budget_category(category)?;
    let limit = validate::budget_limit(limit)?;
    let id = db.upsert_budget(&Budget::new(user_id, category, month, limit))?;
    info!(user_id, %category, %month, %limit, "set budget");
    Ok(id)
}

pub(crate) fn set_total_budget(
    db: &Database,
    user_id: i64,
    limit: &str,
    month: YearMonth,
) -> LedgerResult<i64> {
    set_budget(db, user_id, BudgetCategory::TOTAL_MONTHLY, limit, month)
}

/// Sets many budgets at once from `(category, limit)` pairs.
/// Invalid pairs are counted as failures and skipped.
pub(crate) fn set_budgets_bulk(
    db: &Database,
    user_id: i64,
    budgets: &[(String, String)],
    month: YearMonth,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for (category, limit) in budgets {
        let result = set_budget(db, user_id, category, limit, month);
        if let Err(e) = &result {
            warn!(user_id, category = %category, error = %e, "skipped budget");
        }
        outcome.record(&result);
    }
    outcome
}

/// Per-category budgets of `month` by category name, without `TOTAL_MONTHLY`.
pub(crate) fn list_budgets(db: &Database, user_id: i64, month: YearMonth) -> LedgerResult<Vec<Budget>> {
    let mut budgets = db.get_budgets(user_id, month)?;
    budgets.retain(|b| !b.is_total());
    Ok(budgets)
}

pub(crate) fn delete_budget(db: &mut Database, user_id: i64, budget_id: i64) -> LedgerResult<()> {
    log_delete(db.delete_budget(user_id, budget_id), user_id, budget_id, "budget")
}

#[cfg(test)]
mod tests;
