#![allow(clippy::unwrap_used)]

use super::*;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_flag_lookup() {
    let a = args(&["12.50", "Food", "--date", "2024-01-15", "--note", "lunch"]);
    assert_eq!(flag(&a, "--date"), Some("2024-01-15"));
    assert_eq!(flag(&a, "--note"), Some("lunch"));
    assert_eq!(flag(&a, "--month"), None);
}

#[test]
fn test_flag_without_value() {
    let a = args(&["--date"]);
    assert_eq!(flag(&a, "--date"), None);
}

#[test]
fn test_positional_skips_flags_and_their_values() {
    let a = args(&["--user", "alice", "12.50", "--note", "x", "Food", "--yes"]);
    assert_eq!(positional(&a), vec!["12.50", "Food"]);
}

#[test]
fn test_positional_keeps_negative_numbers() {
    let a = args(&["-5", "Food"]);
    assert_eq!(positional(&a), vec!["-5", "Food"]);
}

#[test]
fn test_has_flag() {
    let a = args(&["--yes"]);
    assert!(has_flag(&a, "--yes"));
    assert!(!has_flag(&a, "--no"));
}

#[test]
fn test_required_reports_usage() {
    let values = vec!["only"];
    assert_eq!(required(&values, 0, "x <a> <b>").unwrap(), "only");
    let err = required(&values, 1, "x <a> <b>").unwrap_err();
    assert_eq!(err.to_string(), "Usage: fintrack x <a> <b>");
}

#[test]
fn test_parse_id() {
    assert_eq!(parse_id("42").unwrap(), 42);
    assert!(parse_id("forty-two").is_err());
}

#[test]
fn test_user_commands() {
    for name in [
        "add-expense",
        "add-income",
        "edit-expense",
        "delete-expense",
        "delete-income",
        "expenses",
        "income",
        "categories",
        "budget",
        "total-budget",
        "budgets",
        "delete-budget",
        "dashboard",
        "report",
        "profile",
        "suggest",
        "import",
        "export",
        "change-password",
        "delete-account",
    ] {
        assert!(user_command(name).is_some(), "{name} should be a command");
    }
    assert!(user_command("register").is_none());
    assert!(user_command("frobnicate").is_none());
}

#[test]
fn test_session_month_and_page() {
    let a = args(&["--month", "2023-12", "--page", "3"]);
    let session = Session {
        args: &a,
        user_id: 1,
        today: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        page_size: 10,
    };
    assert_eq!(session.month().unwrap().to_string(), "2023-12");
    assert_eq!(session.page().unwrap(), 3);

    let none: Vec<String> = Vec::new();
    let session = Session {
        args: &none,
        ..session
    };
    assert_eq!(session.month().unwrap().to_string(), "2024-01");
    assert_eq!(session.page().unwrap(), 1);
}

#[test]
fn test_help_and_version_need_no_login() {
    let mut db = Database::open_in_memory().unwrap();
    let config = Config {
        db_path: "unused.db".into(),
        page_size: 10,
        log_filter: "warn".into(),
    };
    assert!(as_cli(&args(&["fintrack", "help"]), &mut db, &config).is_ok());
    assert!(as_cli(&args(&["fintrack", "--version"]), &mut db, &config).is_ok());
    assert!(as_cli(&args(&["fintrack"]), &mut db, &config).is_ok());
    assert!(as_cli(&args(&["fintrack", "frobnicate"]), &mut db, &config).is_err());
}
