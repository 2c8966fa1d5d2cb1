use rust_decimal::Decimal;

use super::{BudgetCategory, YearMonth};

#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    pub id: Option<i64>,
    pub user_id: i64,
    pub category: BudgetCategory,
    pub month: YearMonth,
    pub limit: Decimal,
}

impl Budget {
    pub fn new(user_id: i64, category: BudgetCategory, month: YearMonth, limit: Decimal) -> Self {
        Self {
            id: None,
            user_id,
            category,
            month,
            limit,
        }
    }

    pub fn is_total(&self) -> bool {
        self.category == BudgetCategory::TotalMonthly
    }
}
