//! Budget suggestions from the last 90 days of spending.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::db::{Database, DateWindow, Filter};
use crate::engine::round_money;
use crate::error::LedgerResult;
use crate::models::{Category, YearMonth};

const LOOKBACK_DAYS: u64 = 90;

/// 15% headroom over the average month.
fn buffer() -> Decimal {
    Decimal::new(115, 2)
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Suggestion {
    pub(crate) category: Category,
    pub(crate) avg_spent: Decimal,
    pub(crate) suggested: Decimal,
    /// A budget for this category already exists in the current month.
    pub(crate) has_budget: bool,
}

/// One suggestion per category with spending since `today - 90 days`,
/// ordered by category name.
///
/// The average runs over the months in which the category had spending;
/// months without any are not counted as zero.
pub(crate) fn suggest_budgets(
    db: &Database,
    user_id: i64,
    today: NaiveDate,
) -> LedgerResult<Vec<Suggestion>> {
    let since = today
        .checked_sub_days(Days::new(LOOKBACK_DAYS))
        .unwrap_or(NaiveDate::MIN);
    let expenses = db.expenses(user_id, &Filter::window(DateWindow::Since(since)))?;

    let mut monthly: BTreeMap<&'static str, (Category, BTreeMap<YearMonth, Decimal>)> =
        BTreeMap::new();
    for expense in &expenses {
        *monthly
            .entry(expense.category.as_str())
            .or_insert_with(|| (expense.category, BTreeMap::new()))
            .1
            .entry(YearMonth::of(expense.date))
            .or_insert(Decimal::ZERO) += expense.amount;
    }

    let budgeted: HashSet<Category> = db
        .get_budgets(user_id, YearMonth::of(today))?
        .iter()
        .filter_map(|b| b.category.spending())
        .collect();

    let suggestions: Vec<Suggestion> = monthly
        .into_values()
        .map(|(category, months)| {
            let total: Decimal = months.values().copied().sum();
            let average = total / Decimal::from(months.len().max(1));
            Suggestion {
                category,
                avg_spent: round_money(average),
                suggested: round_money(average * buffer()),
                has_budget: budgeted.contains(&category),
            }
        })
        .collect();

    debug!(user_id, %since, count = suggestions.len(), "budget suggestions");
    Ok(suggestions)
}
