//! Input rules shared by every ledger-mutating operation.

use chrono::NaiveDate;
use email_address::EmailAddress;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::models::{BudgetCategory, Category, YearMonth};

pub(crate) const MAX_TEXT_LEN: usize = 500;

/// Largest accepted amount, 999,999.99.
pub(crate) fn max_amount() -> Decimal {
    Decimal::new(99_999_999, 2)
}

pub(crate) fn username(s: &str) -> Result<(), ValidationError> {
    let len = s.chars().count();
    if !(3..=50).contains(&len) {
        return Err(ValidationError::UsernameLength);
    }
    if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::UsernameCharacters);
    }
    Ok(())
}

pub(crate) fn email(s: &str) -> Result<(), ValidationError> {
    let address = EmailAddress::from_str(s).map_err(|e| ValidationError::Email(e.to_string()))?;
    // Only addresses under a dotted domain can receive mail.
    let domain = address.domain();
    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err(ValidationError::Email(format!(
            "'{domain}' is not a deliverable domain"
        )));
    }
    Ok(())
}

pub(crate) fn password(s: &str) -> Result<(), ValidationError> {
    let len = s.chars().count();
    if len < 6 {
        return Err(ValidationError::PasswordTooShort);
    }
    if len > 128 {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}

/// Parse a positive amount no larger than 999,999.99.
pub(crate) fn amount(s: &str) -> Result<Decimal, ValidationError> {
    let amount = Decimal::from_str(s.trim()).map_err(|_| ValidationError::AmountFormat)?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::AmountNotPositive);
    }
    if amount > max_amount() {
        return Err(ValidationError::AmountTooLarge);
    }
    Ok(amount)
}

/// Budget limits only need to be positive.
pub(crate) fn budget_limit(s: &str) -> Result<Decimal, ValidationError> {
    let limit = Decimal::from_str(s.trim()).map_err(|_| ValidationError::AmountFormat)?;
    if limit <= Decimal::ZERO {
        return Err(ValidationError::AmountNotPositive);
    }
    Ok(limit)
}

/// Parse a `YYYY-MM-DD` date.
pub(crate) fn date(s: &str) -> Result<NaiveDate, ValidationError> {
    let s = s.trim();
    // chrono accepts single-digit months and days; the stored form must be ISO.
    if s.len() != 10 {
        return Err(ValidationError::Date);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ValidationError::Date)
}

pub(crate) fn month(s: &str) -> Result<YearMonth, ValidationError> {
    YearMonth::parse(s).ok_or(ValidationError::Month)
}

pub(crate) fn category(s: &str) -> Result<Category, ValidationError> {
    Category::parse(s.trim()).ok_or_else(|| ValidationError::Category(Category::names()))
}

/// Budget targets use the same closed set as expenses, plus `TOTAL_MONTHLY`.
pub(crate) fn budget_category(s: &str) -> Result<BudgetCategory, ValidationError> {
    BudgetCategory::parse(s.trim()).ok_or_else(|| {
        ValidationError::Category(format!(
            "{}, {}",
            Category::names(),
            BudgetCategory::TOTAL_MONTHLY
        ))
    })
}

/// Trim and cut to 500 characters. Missing input becomes an empty string.
pub(crate) fn sanitize_text(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };
    let trimmed = text.trim();
    if trimmed.chars().count() > MAX_TEXT_LEN {
        trimmed.chars().take(MAX_TEXT_LEN).collect()
    } else {
        trimmed.to_string()
    }
}
