#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;
use crate::db::{DateWindow, Filter};
use crate::models::{Category, User};

fn setup() -> (Database, i64) {
    let db = Database::open_in_memory().unwrap();
    let user = User::new("alice".into(), "alice@example.com".into(), "x".into());
    let uid = db.insert_user(&user).unwrap();
    (db, uid)
}

fn jan() -> YearMonth {
    YearMonth::parse("2024-01").unwrap()
}

fn total_expenses(db: &Database, uid: i64) -> Decimal {
    db.sum_amount(Table::Expenses, uid, &Filter::all()).unwrap()
}

// ── Expenses ──────────────────────────────────────────────────

#[test]
fn test_add_expense_stores_validated_values() {
    let (db, uid) = setup();
    let draft = ExpenseDraft::new("12.50", "Food", "2024-01-10", Some("  lunch  "));
    let id = add_expense(&db, uid, &draft).unwrap();

    let stored = db.get_expense(uid, id).unwrap().unwrap();
    assert_eq!(stored.amount, dec!(12.50));
    assert_eq!(stored.category, Category::Food);
    assert_eq!(stored.date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    assert_eq!(stored.note, "lunch");
}

#[test]
fn test_add_expense_without_note() {
    let (db, uid) = setup();
    let id = add_expense(&db, uid, &ExpenseDraft::new("3", "Other", "2024-01-10", None)).unwrap();
    assert_eq!(db.get_expense(uid, id).unwrap().unwrap().note, "");
}

#[test]
fn test_add_expense_rejections() {
    let (db, uid) = setup();
    let cases = [
        ExpenseDraft::new("0", "Food", "2024-01-10", None),
        ExpenseDraft::new("1000000", "Food", "2024-01-10", None),
        ExpenseDraft::new("ten", "Food", "2024-01-10", None),
        ExpenseDraft::new("10", "Groceries", "2024-01-10", None),
        ExpenseDraft::new("10", "Food", "10/01/2024", None),
    ];
    for draft in &cases {
        let err = add_expense(&db, uid, draft).unwrap_err();
        assert!(
            matches!(err, LedgerError::Validation(_)),
            "expected validation error for {draft:?}"
        );
    }
    assert_eq!(total_expenses(&db, uid), Decimal::ZERO);
}

#[test]
fn test_add_expenses_partial_failure() {
    let (db, uid) = setup();
    let drafts = vec![
        ExpenseDraft::new("10", "Food", "2024-01-10", None),
        ExpenseDraft::new("-4", "Food", "2024-01-10", None),
        ExpenseDraft::new("5", "Transport", "2024-01-11", Some("bus")),
        ExpenseDraft::new("7", "Nope", "2024-01-11", None),
    ];
    let outcome = add_expenses(&db, uid, &drafts);
    assert_eq!(
        outcome,
        BatchOutcome {
            succeeded: 2,
            failed: 2
        }
    );
    assert_eq!(total_expenses(&db, uid), dec!(15));
}

#[test]
fn test_edit_expense() {
    let (db, uid) = setup();
    let id = add_expense(&db, uid, &ExpenseDraft::new("10", "Food", "2024-01-10", None)).unwrap();
    let created_at = db.get_expense(uid, id).unwrap().unwrap().created_at;

    edit_expense(
        &db,
        uid,
        id,
        &ExpenseDraft::new("20", "Shopping", "2024-01-12", Some("shoes")),
    )
    .unwrap();

    let stored = db.get_expense(uid, id).unwrap().unwrap();
    assert_eq!(stored.amount, dec!(20));
    assert_eq!(stored.category, Category::Shopping);
    assert_eq!(stored.note, "shoes");
    assert_eq!(stored.created_at, created_at);
}

#[test]
fn test_edit_expense_invalid_leaves_row_untouched() {
    let (db, uid) = setup();
    let id = add_expense(&db, uid, &ExpenseDraft::new("10", "Food", "2024-01-10", None)).unwrap();
    let err = edit_expense(&db, uid, id, &ExpenseDraft::new("-1", "Food", "2024-01-10", None))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert_eq!(db.get_expense(uid, id).unwrap().unwrap().amount, dec!(10));
}

#[test]
fn test_edit_foreign_expense_is_not_found() {
    let (db, alice) = setup();
    let bob = db
        .insert_user(&User::new("bob".into(), "bob@example.com".into(), "x".into()))
        .unwrap();
    let id = add_expense(&db, alice, &ExpenseDraft::new("10", "Food", "2024-01-10", None)).unwrap();

    let err = edit_expense(&db, bob, id, &ExpenseDraft::new("1", "Food", "2024-01-10", None))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_delete_expense() {
    let (db, uid) = setup();
    let id = add_expense(&db, uid, &ExpenseDraft::new("10", "Food", "2024-01-10", None)).unwrap();
    delete_expense(&db, uid, id).unwrap();
    assert!(delete_expense(&db, uid, id).unwrap_err().is_not_found());
}

// ── Income ────────────────────────────────────────────────────

#[test]
fn test_add_income_requires_source() {
    let (db, uid) = setup();
    let err = add_income(&db, uid, &IncomeDraft::new("100", "2024-01-01", Some("   "))).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Validation(ValidationError::SourceRequired)
    ));
    let err = add_income(&db, uid, &IncomeDraft::new("100", "2024-01-01", None)).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Validation(ValidationError::SourceRequired)
    ));
}

#[test]
fn test_add_and_delete_income() {
    let (db, uid) = setup();
    let id = add_income(&db, uid, &IncomeDraft::new("2500", "2024-01-01", Some("Salary"))).unwrap();
    let stored = db.get_income(uid, id).unwrap().unwrap();
    assert_eq!(stored.amount, dec!(2500));
    assert_eq!(stored.source, "Salary");

    delete_income(&db, uid, id).unwrap();
    assert!(db.get_income(uid, id).unwrap().is_none());
}

// ── Budgets ───────────────────────────────────────────────────

#[test]
fn test_set_budget_upserts() {
    let (db, uid) = setup();
    let food = BudgetCategory::Spending(Category::Food);
    set_budget(&db, uid, "Food", "100", jan()).unwrap();
    set_budget(&db, uid, "Food", "250", jan()).unwrap();

    assert_eq!(db.budget_row_count(uid, food, jan()).unwrap(), 1);
    assert_eq!(
        db.get_budget(uid, food, jan()).unwrap().unwrap().limit,
        dec!(250)
    );
}

#[test]
fn test_set_budget_rejects_unknown_category_and_bad_limit() {
    let (db, uid) = setup();
    assert!(matches!(
        set_budget(&db, uid, "Vacation", "100", jan()),
        Err(LedgerError::Validation(ValidationError::Category(_)))
    ));
    assert!(matches!(
        set_budget(&db, uid, "Food", "0", jan()),
        Err(LedgerError::Validation(ValidationError::AmountNotPositive))
    ));
    assert!(db.get_budgets(uid, jan()).unwrap().is_empty());
}

#[test]
fn test_set_total_budget() {
    let (db, uid) = setup();
    set_total_budget(&db, uid, "1500", jan()).unwrap();
    let total = db
        .get_budget(uid, BudgetCategory::TotalMonthly, jan())
        .unwrap()
        .unwrap();
    assert_eq!(total.limit, dec!(1500));
    assert!(total.is_total());
}

#[test]
fn test_set_budgets_bulk_counts() {
    let (db, uid) = setup();
    let pairs = vec![
        ("Food".to_string(), "300".to_string()),
        ("Transport".to_string(), "abc".to_string()),
        ("Vacation".to_string(), "100".to_string()),
        ("Utilities".to_string(), "120.50".to_string()),
    ];
    let outcome = set_budgets_bulk(&db, uid, &pairs, jan());
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 2);
    assert_eq!(db.get_budgets(uid, jan()).unwrap().len(), 2);
}

#[test]
fn test_delete_budget_of_other_user_is_not_found() {
    let (mut db, alice) = setup();
    let bob = db
        .insert_user(&User::new("bob".into(), "bob@example.com".into(), "x".into()))
        .unwrap();
    let id = set_budget(&db, alice, "Food", "100", jan()).unwrap();

    assert!(delete_budget(&mut db, bob, id).unwrap_err().is_not_found());
    delete_budget(&mut db, alice, id).unwrap();
    assert!(db.get_budgets(alice, jan()).unwrap().is_empty());
}

#[test]
fn test_get_expense_scoped_to_owner() {
    let (db, alice) = setup();
    let bob = db
        .insert_user(&User::new("bob".into(), "bob@example.com".into(), "x".into()))
        .unwrap();
    let id = add_expense(&db, alice, &ExpenseDraft::new("10", "Food", "2024-01-10", None)).unwrap();

    assert_eq!(get_expense(&db, alice, id).unwrap().amount, dec!(10));
    assert!(get_expense(&db, bob, id).unwrap_err().is_not_found());
}

// ── History ───────────────────────────────────────────────────

#[test]
fn test_history_filter_parsing() {
    assert_eq!(history_filter(None, None, None).unwrap(), Filter::all());

    let filter = history_filter(Some("Food"), Some("2024-01-01"), None).unwrap();
    assert_eq!(filter.label.as_deref(), Some("Food"));
    assert_eq!(
        filter.window,
        DateWindow::Range {
            from: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            to: None
        }
    );

    assert_eq!(
        history_filter(Some("Vacation"), None, None),
        Err(ValidationError::Category(Category::names()))
    );
    assert_eq!(
        history_filter(None, None, Some("01/31/2024")),
        Err(ValidationError::Date)
    );
}

#[test]
fn test_expense_history_pages_with_inclusive_range() {
    let (db, uid) = setup();
    for day in 1..=25 {
        let date = format!("2024-01-{day:02}");
        add_expense(&db, uid, &ExpenseDraft::new("1", "Food", &date, None)).unwrap();
    }
    add_expense(&db, uid, &ExpenseDraft::new("1", "Transport", "2024-01-05", None)).unwrap();

    let food = history_filter(Some("Food"), None, None).unwrap();
    let page = expense_history(&db, uid, &food, 3, 10).unwrap();
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.total_pages, 3);
    assert!(!page.has_next());

    let range = history_filter(None, Some("2024-01-05"), Some("2024-01-06")).unwrap();
    let page = expense_history(&db, uid, &range, 1, 10).unwrap();
    assert_eq!(page.total_count, 3);
}

#[test]
fn test_income_history() {
    let (db, uid) = setup();
    add_income(&db, uid, &IncomeDraft::new("100", "2024-01-01", Some("Salary"))).unwrap();
    add_income(&db, uid, &IncomeDraft::new("50", "2024-02-01", Some("Gift"))).unwrap();

    let page = income_history(&db, uid, &Filter::all(), 1, 10).unwrap();
    assert_eq!(page.items[0].source, "Gift");
    assert_eq!(page.total_pages, 1);
}

#[test]
fn test_expense_categories_distinct() {
    let (db, uid) = setup();
    add_expense(&db, uid, &ExpenseDraft::new("1", "Transport", "2024-01-05", None)).unwrap();
    add_expense(&db, uid, &ExpenseDraft::new("1", "Food", "2024-01-05", None)).unwrap();
    add_expense(&db, uid, &ExpenseDraft::new("2", "Food", "2024-01-06", None)).unwrap();
    assert_eq!(
        expense_categories(&db, uid).unwrap(),
        vec![Category::Food, Category::Transport]
    );
}

#[test]
fn test_list_budgets_leaves_out_total() {
    let (db, uid) = setup();
    set_total_budget(&db, uid, "1000", jan()).unwrap();
    set_budget(&db, uid, "Utilities", "80", jan()).unwrap();
    set_budget(&db, uid, "Food", "300", jan()).unwrap();

    let names: Vec<&str> = list_budgets(&db, uid, jan())
        .unwrap()
        .iter()
        .map(|b| b.category.as_str())
        .collect();
    assert_eq!(names, vec!["Food", "Utilities"]);
}
