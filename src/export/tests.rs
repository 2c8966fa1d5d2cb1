#![allow(clippy::unwrap_used)]

use super::*;
use crate::db::DateWindow;
use crate::ledger;
use crate::models::{ExpenseDraft, User, YearMonth};

fn setup() -> (Database, i64) {
    let db = Database::open_in_memory().unwrap();
    let uid = db
        .insert_user(&User::new("alice".into(), "a@example.com".into(), "x".into()))
        .unwrap();
    for (amount, category, date, note) in [
        ("4.5", "Food", "2024-01-15", Some("coffee, large")),
        ("12", "Transport", "2024-02-01", None),
        ("100.25", "Shopping", "2024-01-20", Some("shoes")),
    ] {
        ledger::add_expense(&db, uid, &ExpenseDraft::new(amount, category, date, note)).unwrap();
    }
    (db, uid)
}

#[test]
fn test_write_expenses_newest_first() {
    let (db, uid) = setup();
    let mut buf = Vec::new();
    let count = write_expenses(&db, uid, &Filter::all(), &mut buf).unwrap();
    assert_eq!(count, 3);

    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Date,Category,Amount,Note",
            "2024-02-01,Transport,12.00,",
            "2024-01-20,Shopping,100.25,shoes",
            "2024-01-15,Food,4.50,\"coffee, large\"",
        ]
    );
}

#[test]
fn test_write_expenses_filtered() {
    let (db, uid) = setup();
    let mut buf = Vec::new();
    let jan = Filter::window(DateWindow::Month(YearMonth::parse("2024-01").unwrap()));
    assert_eq!(write_expenses(&db, uid, &jan, &mut buf).unwrap(), 2);
}

#[test]
fn test_empty_export_has_header_only() {
    let db = Database::open_in_memory().unwrap();
    let mut buf = Vec::new();
    assert_eq!(write_expenses(&db, 1, &Filter::all(), &mut buf).unwrap(), 0);
    assert_eq!(String::from_utf8(buf).unwrap(), "Date,Category,Amount,Note\n");
}

#[test]
fn test_export_to_file_reads_back() {
    let (db, uid) = setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("expenses.csv");
    assert_eq!(export_expenses(&db, uid, &path).unwrap(), 3);

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[2][3], "coffee, large");
}
