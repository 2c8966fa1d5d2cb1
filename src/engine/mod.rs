//! Aggregation engine: turns a user's ledger into dashboard, report and
//! profile figures.
//!
//! Every entry point takes the caller's `user_id` and the current date, so the
//! results depend only on what is stored and on `today`.

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::advisor::{self, Suggestion};
use crate::db::{Database, DateWindow, Filter, Table};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{BudgetCategory, Category, YearMonth};

/// Shown in place of a top category when there are no expenses.
pub(crate) const NO_CATEGORY: &str = "N/A";

/// Round a money figure to cents, halves away from zero.
pub(crate) fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ── Category breakdown ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CategoryTotal {
    pub(crate) category: Category,
    pub(crate) total: Decimal,
}

/// Expense totals per category, consumed as parallel label/amount lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CategoryBreakdown(Vec<CategoryTotal>);

impl CategoryBreakdown {
    fn load(db: &Database, user_id: i64, window: DateWindow) -> LedgerResult<Self> {
        let totals = db
            .category_totals(user_id, window)?
            .into_iter()
            .map(|(category, total)| CategoryTotal { category, total })
            .collect();
        Ok(Self(totals))
    }

    /// Largest total first. Equal totals keep their name order.
    fn sorted_descending(mut self) -> Self {
        self.0.sort_by(|a, b| b.total.cmp(&a.total));
        self
    }

    pub(crate) fn entries(&self) -> &[CategoryTotal] {
        &self.0
    }

    pub(crate) fn labels(&self) -> Vec<&'static str> {
        self.0.iter().map(|c| c.category.as_str()).collect()
    }

    pub(crate) fn amounts(&self) -> Vec<Decimal> {
        self.0.iter().map(|c| c.total).collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Budgets ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BudgetProgress {
    pub(crate) category: Category,
    pub(crate) limit: Decimal,
    pub(crate) spent: Decimal,
    pub(crate) remaining: Decimal,
    /// Always within 0..=100.
    pub(crate) percentage: Decimal,
    pub(crate) is_exceeded: bool,
}

impl BudgetProgress {
    pub(crate) fn new(category: Category, limit: Decimal, spent: Decimal) -> Self {
        Self {
            category,
            limit,
            spent,
            remaining: (limit - spent).max(Decimal::ZERO),
            percentage: percentage_of(spent, limit),
            is_exceeded: spent > limit,
        }
    }

    fn warning(&self) -> Option<BudgetWarning> {
        BudgetWarning::check(BudgetCategory::Spending(self.category), self.limit, self.spent)
    }
}

/// `spent / limit * 100`, capped at 100; a non-positive limit gives 0.
pub(crate) fn percentage_of(spent: Decimal, limit: Decimal) -> Decimal {
    if limit <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    spent
        .checked_div(limit)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map_or(Decimal::ONE_HUNDRED, round_money)
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BudgetWarning {
    pub(crate) category: BudgetCategory,
    pub(crate) limit: Decimal,
    pub(crate) spent: Decimal,
    pub(crate) exceeded_by: Decimal,
}

impl BudgetWarning {
    fn check(category: BudgetCategory, limit: Decimal, spent: Decimal) -> Option<Self> {
        (spent > limit).then(|| Self {
            category,
            limit,
            spent,
            exceeded_by: spent - limit,
        })
    }
}

/// Progress of every per-category budget in `month`. The `TOTAL_MONTHLY`
/// row is left out.
pub(crate) fn budget_progress(
    db: &Database,
    user_id: i64,
    month: YearMonth,
) -> LedgerResult<Vec<BudgetProgress>> {
    let mut progress = Vec::new();
    for budget in db.get_budgets(user_id, month)? {
        let Some(category) = budget.category.spending() else {
            continue;
        };
        let spent = db.sum_amount(
            Table::Expenses,
            user_id,
            &Filter::window(DateWindow::Month(month)).with_category(category),
        )?;
        progress.push(BudgetProgress::new(category, budget.limit, spent));
    }
    Ok(progress)
}

pub(crate) fn budget_warnings(progress: &[BudgetProgress]) -> Vec<BudgetWarning> {
    progress.iter().filter_map(BudgetProgress::warning).collect()
}

/// Warning when a month's spending is over its `TOTAL_MONTHLY` limit.
pub(crate) fn total_budget_warning(limit: Option<Decimal>, spent: Decimal) -> Option<BudgetWarning> {
    limit.and_then(|limit| BudgetWarning::check(BudgetCategory::TotalMonthly, limit, spent))
}

// ── Dashboard ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Dashboard {
    pub(crate) month: YearMonth,
    pub(crate) total_income: Decimal,
    pub(crate) total_expenses: Decimal,
    pub(crate) balance: Decimal,
    pub(crate) monthly_income: Decimal,
    pub(crate) monthly_expenses: Decimal,
    /// All-time totals, by category name.
    pub(crate) categories: CategoryBreakdown,
    pub(crate) budget_progress: Vec<BudgetProgress>,
    pub(crate) budget_warnings: Vec<BudgetWarning>,
    pub(crate) total_budget_limit: Option<Decimal>,
    pub(crate) total_budget_warning: Option<BudgetWarning>,
}

pub(crate) fn balance(db: &Database, user_id: i64) -> LedgerResult<Decimal> {
    let income = db.sum_amount(Table::Income, user_id, &Filter::all())?;
    let expenses = db.sum_amount(Table::Expenses, user_id, &Filter::all())?;
    Ok(income - expenses)
}

pub(crate) fn dashboard(db: &Database, user_id: i64, today: NaiveDate) -> LedgerResult<Dashboard> {
    let month = YearMonth::of(today);
    let this_month = Filter::window(DateWindow::Month(month));

    let total_income = db.sum_amount(Table::Income, user_id, &Filter::all())?;
    let total_expenses = db.sum_amount(Table::Expenses, user_id, &Filter::all())?;
    let monthly_income = db.sum_amount(Table::Income, user_id, &this_month)?;
    let monthly_expenses = db.sum_amount(Table::Expenses, user_id, &this_month)?;

    let budget_progress = budget_progress(db, user_id, month)?;
    let budget_warnings = budget_warnings(&budget_progress);
    let total_budget_limit = db
        .get_budget(user_id, BudgetCategory::TotalMonthly, month)?
        .map(|b| b.limit);
    let total_budget_warning = total_budget_warning(total_budget_limit, monthly_expenses);

    Ok(Dashboard {
        month,
        total_income,
        total_expenses,
        balance: total_income - total_expenses,
        monthly_income,
        monthly_expenses,
        categories: CategoryBreakdown::load(db, user_id, DateWindow::All)?,
        budget_progress,
        budget_warnings,
        total_budget_limit,
        total_budget_warning,
    })
}

// ── Reports ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Report {
    pub(crate) weekly_expenses: Decimal,
    pub(crate) monthly_expenses: Decimal,
    pub(crate) yearly_expenses: Decimal,
    pub(crate) last_month_expenses: Decimal,
    /// This month minus last month; negative when spending went down.
    pub(crate) month_change: Decimal,
    /// All-time totals, largest first.
    pub(crate) categories: CategoryBreakdown,
}

impl Report {
    pub(crate) fn top_category(&self) -> Option<Category> {
        self.categories.entries().first().map(|c| c.category)
    }

    pub(crate) fn top_category_label(&self) -> &'static str {
        self.top_category().map_or(NO_CATEGORY, |c| c.as_str())
    }
}

/// The start of the weekly window: seven days before `today`, inclusive.
pub(crate) fn week_start(today: NaiveDate) -> NaiveDate {
    today.checked_sub_days(Days::new(7)).unwrap_or(NaiveDate::MIN)
}

pub(crate) fn report(db: &Database, user_id: i64, today: NaiveDate) -> LedgerResult<Report> {
    let month = YearMonth::of(today);
    let expenses = |window| db.sum_amount(Table::Expenses, user_id, &Filter::window(window));

    let weekly_expenses = expenses(DateWindow::Since(week_start(today)))?;
    let monthly_expenses = expenses(DateWindow::Month(month))?;
    let yearly_expenses = expenses(DateWindow::Year(today.year()))?;
    let last_month_expenses = expenses(DateWindow::Month(month.previous()))?;

    Ok(Report {
        weekly_expenses,
        monthly_expenses,
        yearly_expenses,
        last_month_expenses,
        month_change: monthly_expenses - last_month_expenses,
        categories: CategoryBreakdown::load(db, user_id, DateWindow::All)?.sorted_descending(),
    })
}

// ── Profile ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Profile {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) member_since: String,
    pub(crate) total_income: Decimal,
    pub(crate) total_expenses: Decimal,
    pub(crate) balance: Decimal,
    pub(crate) total_monthly_budget: Option<Decimal>,
    pub(crate) suggestions: Vec<Suggestion>,
}

pub(crate) fn profile(db: &Database, user_id: i64, today: NaiveDate) -> LedgerResult<Profile> {
    let user = db.get_user(user_id)?.ok_or(LedgerError::NotFound)?;
    let total_income = db.sum_amount(Table::Income, user_id, &Filter::all())?;
    let total_expenses = db.sum_amount(Table::Expenses, user_id, &Filter::all())?;
    let total_monthly_budget = db
        .get_budget(user_id, BudgetCategory::TotalMonthly, YearMonth::of(today))?
        .map(|b| b.limit);

    Ok(Profile {
        username: user.username,
        email: user.email,
        member_since: user.created_at,
        total_income,
        total_expenses,
        balance: balance(db, user_id)?,
        total_monthly_budget,
        suggestions: advisor::suggest_budgets(db, user_id, today)?,
    })
}
