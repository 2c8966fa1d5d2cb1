use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::Category;

#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: Option<i64>,
    pub user_id: i64,
    pub amount: Decimal,
    pub category: Category,
    pub date: NaiveDate,
    pub note: String,
    pub created_at: String,
}

impl Expense {
    pub fn new(
        user_id: i64,
        amount: Decimal,
        category: Category,
        date: NaiveDate,
        note: String,
    ) -> Self {
        Self {
            id: None,
            user_id,
            amount,
            category,
            date,
            note,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Income {
    pub id: Option<i64>,
    pub user_id: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub source: String,
    pub created_at: String,
}

impl Income {
    pub fn new(user_id: i64, amount: Decimal, date: NaiveDate, source: String) -> Self {
        Self {
            id: None,
            user_id,
            amount,
            date,
            source,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Unvalidated expense fields as submitted by a form, a CLI or a CSV row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub amount: String,
    pub category: String,
    pub date: String,
    pub note: Option<String>,
}

impl ExpenseDraft {
    pub fn new(amount: &str, category: &str, date: &str, note: Option<&str>) -> Self {
        Self {
            amount: amount.to_string(),
            category: category.to_string(),
            date: date.to_string(),
            note: note.map(str::to_string),
        }
    }
}

/// Unvalidated income fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomeDraft {
    pub amount: String,
    pub date: String,
    pub source: Option<String>,
}

impl IncomeDraft {
    pub fn new(amount: &str, date: &str, source: Option<&str>) -> Self {
        Self {
            amount: amount.to_string(),
            date: date.to_string(),
            source: source.map(str::to_string),
        }
    }
}
