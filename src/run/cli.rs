use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;

use super::format::{format_amount, format_change, progress_bar, truncate};
use crate::config::{shellexpand, Config};
use crate::db::{Database, DateWindow, Filter, Table};
use crate::models::{BudgetCategory, Category, ExpenseDraft, IncomeDraft, Page, YearMonth};
use crate::{advisor, auth, engine, export, import, ledger, validate};

const USER_VAR: &str = "FINTRACK_USER";
const PASSWORD_VAR: &str = "FINTRACK_PASSWORD";
const PASSWORD_CONFIRM_VAR: &str = "FINTRACK_PASSWORD_CONFIRM";
const NEW_PASSWORD_VAR: &str = "FINTRACK_NEW_PASSWORD";
const NEW_PASSWORD_CONFIRM_VAR: &str = "FINTRACK_NEW_PASSWORD_CONFIRM";

/// Flags that consume the following argument.
const VALUE_FLAGS: &[&str] = &[
    "--user",
    "--date",
    "--note",
    "--month",
    "--page",
    "--category",
    "--from",
    "--to",
    "--source",
];

/// An authenticated invocation of a per-user command.
struct Session<'a> {
    args: &'a [String],
    user_id: i64,
    today: NaiveDate,
    page_size: u32,
}

impl Session<'_> {
    fn flag(&self, name: &str) -> Option<&str> {
        flag(self.args, name)
    }

    fn positional(&self) -> Vec<&str> {
        positional(self.args)
    }

    /// `--month`, or the month of `today`.
    fn month(&self) -> Result<YearMonth> {
        match self.flag("--month") {
            Some(m) => Ok(validate::month(m)?),
            None => Ok(YearMonth::of(self.today)),
        }
    }

    fn page(&self) -> Result<u32> {
        self.flag("--page")
            .map_or(Ok(1), |p| p.parse().with_context(|| format!("Invalid page: {p}")))
    }
}

type Handler = fn(&Session<'_>, &mut Database) -> Result<()>;

pub(crate) fn as_cli(args: &[String], db: &mut Database, config: &Config) -> Result<()> {
    let Some(command) = args.get(1) else {
        print_usage();
        return Ok(());
    };
    let rest = &args[2..];

    match command.as_str() {
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("fintrack {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "register" => cli_register(rest, db),
        other => {
            let Some(handler) = user_command(other) else {
                print_usage();
                anyhow::bail!("Unknown command: {other}");
            };
            let session = Session {
                args: rest,
                user_id: authenticate(rest, db)?,
                today: chrono::Local::now().date_naive(),
                page_size: config.page_size,
            };
            handler(&session, db)
        }
    }
}

fn user_command(name: &str) -> Option<Handler> {
    let handler: Handler = match name {
        "add-expense" => cli_add_expense,
        "add-income" => cli_add_income,
        "edit-expense" => cli_edit_expense,
        "delete-expense" => cli_delete_expense,
        "delete-income" => cli_delete_income,
        "expenses" => cli_expenses,
        "income" => cli_income,
        "categories" => cli_categories,
        "budget" => cli_budget,
        "total-budget" => cli_total_budget,
        "budgets" => cli_budgets,
        "delete-budget" => cli_delete_budget,
        "dashboard" | "d" => cli_dashboard,
        "report" | "r" => cli_report,
        "profile" => cli_profile,
        "suggest" => cli_suggest,
        "import" => cli_import,
        "export" => cli_export,
        "change-password" => cli_change_password,
        "delete-account" => cli_delete_account,
        _ => return None,
    };
    Some(handler)
}

fn print_usage() {
    println!("fintrack: local-first personal finance tracker");
    println!();
    println!("Usage: fintrack <command> [args] --user <name>");
    println!();
    println!("The password is read from {PASSWORD_VAR}; --user may be replaced by {USER_VAR}.");
    println!();
    println!("Accounts:");
    println!("  register <username> <email>        Create an account");
    println!("  change-password                    Read the new password from {NEW_PASSWORD_VAR}");
    println!("  delete-account --yes               Delete the account and all of its data");
    println!();
    println!("Transactions:");
    println!("  add-expense <amount> <category>    Record an expense");
    println!("    --date <YYYY-MM-DD>              Date (default: today)");
    println!("    --note <text>                    Optional note");
    println!("  add-income <amount> <source>       Record income");
    println!("    --date <YYYY-MM-DD>              Date (default: today)");
    println!("  edit-expense <id> <amount> <category> <YYYY-MM-DD> [--note <text>]");
    println!("  delete-expense <id>                Delete an expense");
    println!("  delete-income <id>                 Delete an income entry");
    println!("  expenses                           Expense history, newest first");
    println!("    --page <n> --category <name> --from <date> --to <date>");
    println!("  income                             Income history, newest first");
    println!("    --page <n> --from <date> --to <date> --source <text>");
    println!("  categories                         Categories you have spent in");
    println!();
    println!("Budgets:");
    println!("  budget <category> <limit>          Set a category budget");
    println!("  budget <category>=<limit>...       Set several budgets at once");
    println!("  total-budget <limit>               Set the total monthly budget");
    println!("  budgets                            List budgets with progress");
    println!("  delete-budget <id>                 Delete a budget");
    println!("    --month <YYYY-MM>                Month for budget commands (default: current)");
    println!("  suggest                            Suggest budgets from the last 90 days");
    println!();
    println!("Reports:");
    println!("  dashboard, d                       Balance, monthly totals, budget status");
    println!("  report, r                          Weekly/monthly/yearly spending");
    println!("  profile                            Account summary and suggestions");
    println!();
    println!("Files:");
    println!("  import <file.csv>                  Import date,category,amount[,note] rows");
    println!("  export [path]                      Export all expenses to CSV");
    println!();
    println!("  --help, -h                         Show this help");
    println!("  --version, -V                      Show version");
}

// ── Argument helpers ──────────────────────────────────────────

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

/// Arguments that are neither flags nor flag values.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            out.push(arg.as_str());
        }
    }
    out
}

fn required<'a>(values: &[&'a str], idx: usize, usage: &str) -> Result<&'a str> {
    values
        .get(idx)
        .copied()
        .with_context(|| format!("Usage: fintrack {usage}"))
}

fn parse_id(s: &str) -> Result<i64> {
    s.parse().with_context(|| format!("Invalid id: {s}"))
}

fn env_password(var: &str) -> Result<String> {
    std::env::var(var).with_context(|| format!("Set {var} to the password"))
}

fn authenticate(args: &[String], db: &Database) -> Result<i64> {
    let username = match flag(args, "--user") {
        Some(name) => name.to_string(),
        None => std::env::var(USER_VAR)
            .with_context(|| format!("Pass --user <name> or set {USER_VAR}"))?,
    };
    let password = env_password(PASSWORD_VAR)?;
    Ok(auth::log_in(db, &username, &password)?)
}

// ── Accounts ──────────────────────────────────────────────────

fn cli_register(args: &[String], db: &mut Database) -> Result<()> {
    const USAGE: &str = "register <username> <email>";
    let values = positional(args);
    let username = required(&values, 0, USAGE)?;
    let email = required(&values, 1, USAGE)?;
    let password = env_password(PASSWORD_VAR)?;
    let confirmation = std::env::var(PASSWORD_CONFIRM_VAR).unwrap_or_else(|_| password.clone());

    let id = auth::register_user(
        db,
        username,
        email,
        &password,
        &confirmation,
        auth::DEFAULT_COST,
    )?;
    println!("Registered {username} (id {id})");
    Ok(())
}

fn cli_change_password(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let current = env_password(PASSWORD_VAR)?;
    let new = env_password(NEW_PASSWORD_VAR)?;
    let confirmation = std::env::var(NEW_PASSWORD_CONFIRM_VAR).unwrap_or_else(|_| new.clone());
    auth::change_password(
        db,
        s.user_id,
        &current,
        &new,
        &confirmation,
        auth::DEFAULT_COST,
    )?;
    println!("Password updated");
    Ok(())
}

fn cli_delete_account(s: &Session<'_>, db: &mut Database) -> Result<()> {
    if !has_flag(s.args, "--yes") {
        anyhow::bail!("This deletes every expense, income entry and budget. Re-run with --yes");
    }
    auth::delete_account(db, s.user_id)?;
    println!("Account deleted");
    Ok(())
}

// ── Transactions ──────────────────────────────────────────────

fn cli_add_expense(s: &Session<'_>, db: &mut Database) -> Result<()> {
    const USAGE: &str = "add-expense <amount> <category> [--date <YYYY-MM-DD>] [--note <text>]";
    let values = s.positional();
    let today = s.today.format("%Y-%m-%d").to_string();
    let draft = ExpenseDraft::new(
        required(&values, 0, USAGE)?,
        required(&values, 1, USAGE)?,
        s.flag("--date").unwrap_or(&today),
        s.flag("--note"),
    );
    let id = ledger::add_expense(db, s.user_id, &draft)?;
    println!("Added expense #{id}");
    Ok(())
}

fn cli_add_income(s: &Session<'_>, db: &mut Database) -> Result<()> {
    const USAGE: &str = "add-income <amount> <source> [--date <YYYY-MM-DD>]";
    let values = s.positional();
    let amount = required(&values, 0, USAGE)?;
    let source = values.get(1..).unwrap_or_default().join(" ");
    let today = s.today.format("%Y-%m-%d").to_string();
    let draft = IncomeDraft::new(amount, s.flag("--date").unwrap_or(&today), Some(&source));
    let id = ledger::add_income(db, s.user_id, &draft)?;
    println!("Added income #{id}");
    Ok(())
}

fn cli_edit_expense(s: &Session<'_>, db: &mut Database) -> Result<()> {
    const USAGE: &str = "edit-expense <id> <amount> <category> <YYYY-MM-DD> [--note <text>]";
    let values = s.positional();
    let id = parse_id(required(&values, 0, USAGE)?)?;
    let draft = ExpenseDraft::new(
        required(&values, 1, USAGE)?,
        required(&values, 2, USAGE)?,
        required(&values, 3, USAGE)?,
        s.flag("--note"),
    );
    ledger::edit_expense(db, s.user_id, id, &draft)
        .with_context(|| format!("Could not update expense #{id}"))?;
    let e = ledger::get_expense(db, s.user_id, id)?;
    println!(
        "Updated expense #{id}: {} {} {}",
        e.date,
        e.category,
        format_amount(e.amount)
    );
    Ok(())
}

fn cli_delete_expense(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let id = parse_id(required(&s.positional(), 0, "delete-expense <id>")?)?;
    ledger::delete_expense(db, s.user_id, id)
        .with_context(|| format!("Could not delete expense #{id}"))?;
    println!("Deleted expense #{id}");
    Ok(())
}

fn cli_delete_income(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let id = parse_id(required(&s.positional(), 0, "delete-income <id>")?)?;
    ledger::delete_income(db, s.user_id, id)
        .with_context(|| format!("Could not delete income #{id}"))?;
    println!("Deleted income #{id}");
    Ok(())
}

fn cli_expenses(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let filter = ledger::history_filter(s.flag("--category"), s.flag("--from"), s.flag("--to"))?;
    let page = ledger::expense_history(db, s.user_id, &filter, s.page()?, s.page_size)?;
    if page.items.is_empty() {
        println!("No expenses");
        return Ok(());
    }

    println!(
        "{:<6} {:<10} {:<14} {:>14}  Note",
        "ID", "Date", "Category", "Amount"
    );
    println!("{}", "─".repeat(60));
    for e in &page.items {
        println!(
            "{:<6} {:<10} {:<14} {:>14}  {}",
            e.id.unwrap_or(0),
            e.date,
            e.category,
            format_amount(e.amount),
            truncate(&e.note, 30),
        );
    }
    print_pager(&page, "expenses");
    Ok(())
}

fn cli_income(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let mut filter = ledger::history_filter(None, s.flag("--from"), s.flag("--to"))?;
    if let Some(source) = s.flag("--source") {
        filter = filter.with_source(source);
    }
    let page = ledger::income_history(db, s.user_id, &filter, s.page()?, s.page_size)?;
    if page.items.is_empty() {
        println!("No income");
        return Ok(());
    }

    println!("{:<6} {:<10} {:>14}  Source", "ID", "Date", "Amount");
    println!("{}", "─".repeat(50));
    for i in &page.items {
        println!(
            "{:<6} {:<10} {:>14}  {}",
            i.id.unwrap_or(0),
            i.date,
            format_amount(i.amount),
            truncate(&i.source, 30),
        );
    }
    print_pager(&page, "entries");
    Ok(())
}

fn print_pager<T>(page: &Page<T>, noun: &str) {
    let mut line = format!(
        "Page {} of {} ({} {noun})",
        page.page, page.total_pages, page.total_count
    );
    if page.has_previous() {
        line.push_str(&format!("  prev: --page {}", page.page - 1));
    }
    if page.has_next() {
        line.push_str(&format!("  next: --page {}", page.page + 1));
    }
    println!("{line}");
}

fn cli_categories(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let used = ledger::expense_categories(db, s.user_id)?;
    if used.is_empty() {
        println!("No expenses yet");
    } else {
        for category in &used {
            println!("{category}");
        }
    }
    println!();
    println!("Valid categories: {}", Category::names());
    Ok(())
}

// ── Budgets ───────────────────────────────────────────────────

fn cli_budget(s: &Session<'_>, db: &mut Database) -> Result<()> {
    const USAGE: &str = "budget <category> <limit> | budget <category>=<limit>...";
    let month = s.month()?;
    let values = s.positional();

    if values.first().is_some_and(|v| v.contains('=')) {
        let pairs: Vec<(String, String)> = values
            .iter()
            .map(|v| {
                let (category, limit) = v.split_once('=').unwrap_or((*v, ""));
                (category.to_string(), limit.to_string())
            })
            .collect();
        let outcome = ledger::set_budgets_bulk(db, s.user_id, &pairs, month);
        println!(
            "Set {} budget(s) for {month}, {} failed",
            outcome.succeeded, outcome.failed
        );
        return Ok(());
    }

    let category = required(&values, 0, USAGE)?;
    let limit = required(&values, 1, USAGE)?;
    ledger::set_budget(db, s.user_id, category, limit, month)?;
    println!("Budget for {category} in {month} set to {limit}");
    Ok(())
}

fn cli_total_budget(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let month = s.month()?;
    let limit = required(&s.positional(), 0, "total-budget <limit>")?;
    ledger::set_total_budget(db, s.user_id, limit, month)?;
    println!("Total budget for {month} set to {limit}");
    Ok(())
}

fn cli_budgets(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let month = s.month()?;
    let budgets = ledger::list_budgets(db, s.user_id, month)?;
    let progress = engine::budget_progress(db, s.user_id, month)?;

    println!("Budgets for {month}");
    println!("{}", "─".repeat(72));
    if budgets.is_empty() {
        println!("  No category budgets");
    }
    for budget in &budgets {
        let Some(p) = progress
            .iter()
            .find(|p| budget.category.spending() == Some(p.category))
        else {
            continue;
        };
        println!(
            "  #{:<5} {:<14} {} {:>6}%  {} of {}{}",
            budget.id.unwrap_or(0),
            p.category,
            progress_bar(p.percentage, 10),
            p.percentage,
            format_amount(p.spent),
            format_amount(p.limit),
            if p.is_exceeded { "  (exceeded)" } else { "" },
        );
    }

    if let Some(total) = db.get_budget(s.user_id, BudgetCategory::TotalMonthly, month)? {
        let spent = db.sum_amount(
            Table::Expenses,
            s.user_id,
            &Filter::window(DateWindow::Month(month)),
        )?;
        println!();
        println!(
            "  #{:<5} Total monthly: {} of {}",
            total.id.unwrap_or(0),
            format_amount(spent),
            format_amount(total.limit)
        );
    }
    Ok(())
}

fn cli_delete_budget(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let id = parse_id(required(&s.positional(), 0, "delete-budget <id>")?)?;
    ledger::delete_budget(db, s.user_id, id)
        .with_context(|| format!("Could not delete budget #{id}"))?;
    println!("Deleted budget #{id}");
    Ok(())
}

fn cli_suggest(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let suggestions = advisor::suggest_budgets(db, s.user_id, s.today)?;
    print_suggestions(&suggestions);
    Ok(())
}

fn print_suggestions(suggestions: &[advisor::Suggestion]) {
    if suggestions.is_empty() {
        println!("No spending in the last 90 days to base suggestions on");
        return;
    }
    println!(
        "{:<14} {:>14} {:>14}  Budget set",
        "Category", "Avg/month", "Suggested"
    );
    println!("{}", "─".repeat(56));
    for sug in suggestions {
        println!(
            "{:<14} {:>14} {:>14}  {}",
            sug.category,
            format_amount(sug.avg_spent),
            format_amount(sug.suggested),
            if sug.has_budget { "yes" } else { "no" },
        );
    }
}

// ── Reports ───────────────────────────────────────────────────

fn cli_dashboard(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let dash = engine::dashboard(db, s.user_id, s.today)?;

    println!("fintrack: {}", dash.month);
    println!("{}", "─".repeat(40));
    println!("  Balance:    {}", format_amount(dash.balance));
    println!("  Income:     {}", format_amount(dash.monthly_income));
    println!("  Expenses:   {}", format_amount(dash.monthly_expenses));
    if let Some(limit) = dash.total_budget_limit {
        println!("  Budget:     {}", format_amount(limit));
    }

    if !dash.categories.is_empty() {
        println!();
        println!("Spending by Category:");
        for entry in dash.categories.entries() {
            println!("  {:<24} {}", entry.category, format_amount(entry.total));
        }
    }

    if !dash.budget_progress.is_empty() {
        println!();
        println!("Budgets:");
        for p in &dash.budget_progress {
            println!(
                "  {:<14} {} {:>6}%  {} left",
                p.category,
                progress_bar(p.percentage, 10),
                p.percentage,
                format_amount(p.remaining),
            );
        }
    }

    let warnings = dash
        .budget_warnings
        .iter()
        .chain(dash.total_budget_warning.as_ref());
    for (i, w) in warnings.enumerate() {
        if i == 0 {
            println!();
        }
        let label = match w.category {
            BudgetCategory::TotalMonthly => "Total monthly budget".to_string(),
            BudgetCategory::Spending(c) => format!("{c} budget"),
        };
        println!(
            "  ! {label} exceeded by {} ({} of {})",
            format_amount(w.exceeded_by),
            format_amount(w.spent),
            format_amount(w.limit),
        );
    }
    Ok(())
}

fn cli_report(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let report = engine::report(db, s.user_id, s.today)?;

    println!("Spending report");
    println!("{}", "─".repeat(40));
    println!("  Last 7 days:   {}", format_amount(report.weekly_expenses));
    println!("  This month:    {}", format_amount(report.monthly_expenses));
    println!("  Last month:    {}", format_amount(report.last_month_expenses));
    println!("  Change:        {}", format_change(report.month_change));
    println!("  This year:     {}", format_amount(report.yearly_expenses));
    println!("  Top category:  {}", report.top_category_label());

    if !report.categories.is_empty() {
        println!();
        let labels = report.categories.labels();
        for (label, total) in labels.iter().zip(report.categories.amounts()) {
            println!("  {label:<24} {}", format_amount(total));
        }
    }
    Ok(())
}

fn cli_profile(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let profile = engine::profile(db, s.user_id, s.today)?;

    println!("{} <{}>", profile.username, profile.email);
    println!("Member since {}", profile.member_since);
    println!("{}", "─".repeat(40));
    println!("  Total income:    {}", format_amount(profile.total_income));
    println!("  Total expenses:  {}", format_amount(profile.total_expenses));
    println!("  Balance:         {}", format_amount(profile.balance));
    match profile.total_monthly_budget {
        Some(limit) => println!("  Monthly budget:  {}", format_amount(limit)),
        None => println!("  Monthly budget:  not set"),
    }
    println!();
    print_suggestions(&profile.suggestions);
    Ok(())
}

// ── Files ─────────────────────────────────────────────────────

fn cli_import(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let file_path = shellexpand(required(&s.positional(), 0, "import <file.csv>")?);
    let path = Path::new(&file_path);
    if !path.exists() {
        anyhow::bail!("File not found: {file_path}");
    }

    let outcome = import::import_expenses(db, s.user_id, path)
        .with_context(|| format!("Failed to import {file_path}"))?;
    println!(
        "Imported {} expenses ({} rows rejected)",
        outcome.succeeded, outcome.failed
    );
    Ok(())
}

fn cli_export(s: &Session<'_>, db: &mut Database) -> Result<()> {
    let output_path = s
        .positional()
        .first()
        .map(|p| shellexpand(p))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            format!("{home}/fintrack-expenses-{}.csv", s.today.format("%Y-%m-%d"))
        });

    let count = export::export_expenses(db, s.user_id, Path::new(&output_path))?;
    if count == 0 {
        println!("No expenses to export");
    } else {
        println!("Exported {count} expenses to {output_path}");
    }
    Ok(())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
