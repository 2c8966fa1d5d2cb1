mod schema;

use chrono::NaiveDate;
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::models::*;

/// The two transaction tables. Both carry `amount` and `date`; the free label
/// is `category` for expenses and `source` for income.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Table {
    Expenses,
    Income,
}

impl Table {
    fn name(&self) -> &'static str {
        match self {
            Self::Expenses => "expenses",
            Self::Income => "income",
        }
    }

    fn label_column(&self) -> &'static str {
        match self {
            Self::Expenses => "category",
            Self::Income => "source",
        }
    }
}

/// Which dates a query covers. Dates are compared as ISO strings, i.e. as
/// calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum DateWindow {
    #[default]
    All,
    /// `date >= from`, no upper bound.
    Since(NaiveDate),
    /// Inclusive on both ends; a missing end is unbounded.
    Range {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    Month(YearMonth),
    Year(i32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Filter {
    pub(crate) window: DateWindow,
    /// Equality on the ledger's label column.
    pub(crate) label: Option<String>,
}

impl Filter {
    pub(crate) fn all() -> Self {
        Self::default()
    }

    pub(crate) fn window(window: DateWindow) -> Self {
        Self {
            window,
            label: None,
        }
    }

    pub(crate) fn with_category(mut self, category: Category) -> Self {
        self.label = Some(category.as_str().to_string());
        self
    }

    pub(crate) fn with_source(mut self, source: &str) -> Self {
        self.label = Some(source.to_string());
        self
    }

    /// `WHERE` clause (always scoped to `user_id`) plus its positional params.
    fn to_sql(&self, table: Table, user_id: i64) -> (String, Vec<Box<dyn ToSql>>) {
        let mut sql = String::from(" WHERE user_id = ?1");
        let mut param_values: Vec<Box<dyn ToSql>> = vec![Box::new(user_id)];

        let mut push = |clause: &str, value: Box<dyn ToSql>, sql: &mut String| {
            param_values.push(value);
            sql.push_str(&format!(" AND {clause} ?{}", param_values.len()));
        };

        match self.window {
            DateWindow::All => {}
            DateWindow::Since(from) => push("date >=", Box::new(iso(from)), &mut sql),
            DateWindow::Range { from, to } => {
                if let Some(from) = from {
                    push("date >=", Box::new(iso(from)), &mut sql);
                }
                if let Some(to) = to {
                    push("date <=", Box::new(iso(to)), &mut sql);
                }
            }
            DateWindow::Month(month) => push("date LIKE", Box::new(month.like_pattern()), &mut sql),
            DateWindow::Year(year) => push("date LIKE", Box::new(format!("{year:04}-%")), &mut sql),
        }

        if let Some(label) = &self.label {
            let clause = format!("{} =", table.label_column());
            push(&clause, Box::new(label.clone()), &mut sql);
        }

        (sql, param_values)
    }
}

pub(crate) struct Database {
    conn: Connection,
}

impl Database {
    pub(crate) fn open(path: &Path) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        debug!(path = %path.display(), "opened ledger database");
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> LedgerResult<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            let tx = self.conn.transaction()?;
            tx.execute_batch(schema::SCHEMA_V1)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            tx.commit()?;
            info!(version = schema::CURRENT_VERSION, "created ledger schema");
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .unwrap_or(0);

        let tx = self.conn.transaction()?;
        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                tx.execute_batch(sql)?;
            }
        }
        if current < schema::CURRENT_VERSION {
            tx.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }
        tx.commit()?;

        Ok(())
    }

    // ── Users ─────────────────────────────────────────────────

    pub(crate) fn insert_user(&self, user: &User) -> LedgerResult<i64> {
        let result = self.conn.execute(
            "INSERT INTO users (username, email, hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user.username, user.email, user.hash, user.created_at],
        );
        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) if is_constraint_violation(&e) => {
                Err(LedgerError::Duplicate("Username or email".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn get_user(&self, id: i64) -> LedgerResult<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, username, email, hash, created_at FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()?)
    }

    pub(crate) fn get_user_by_username(&self, username: &str) -> LedgerResult<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, username, email, hash, created_at FROM users WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()?)
    }

    pub(crate) fn update_password_hash(&self, user_id: i64, hash: &str) -> LedgerResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET hash = ?1 WHERE id = ?2",
            params![hash, user_id],
        )?;
        if changed == 0 {
            return Err(LedgerError::NotFound);
        }
        Ok(())
    }

    /// Removes the user and, through `ON DELETE CASCADE`, everything they own.
    pub(crate) fn delete_user(&self, user_id: i64) -> LedgerResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        if changed == 0 {
            return Err(LedgerError::NotFound);
        }
        Ok(())
    }

    // ── Expenses ──────────────────────────────────────────────

    pub(crate) fn insert_expense(&self, expense: &Expense) -> LedgerResult<i64> {
        self.conn.execute(
            "INSERT INTO expenses (user_id, amount, category, date, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                expense.user_id,
                expense.amount.to_string(),
                expense.category.as_str(),
                iso(expense.date),
                expense.note,
                expense.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn get_expense(&self, user_id: i64, id: i64) -> LedgerResult<Option<Expense>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, amount, category, date, note, created_at
                 FROM expenses WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                expense_from_row,
            )
            .optional()?)
    }

    /// Rewrites amount, category, date and note of an expense the user owns.
    pub(crate) fn update_expense(&self, expense: &Expense) -> LedgerResult<()> {
        let id = expense.id.ok_or(LedgerError::NotFound)?;
        let changed = self.conn.execute(
            "UPDATE expenses SET amount = ?1, category = ?2, date = ?3, note = ?4
             WHERE id = ?5 AND user_id = ?6",
            params![
                expense.amount.to_string(),
                expense.category.as_str(),
                iso(expense.date),
                expense.note,
                id,
                expense.user_id,
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::NotFound);
        }
        Ok(())
    }

    // ── Income ────────────────────────────────────────────────

    pub(crate) fn insert_income(&self, income: &Income) -> LedgerResult<i64> {
        self.conn.execute(
            "INSERT INTO income (user_id, amount, date, source, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                income.user_id,
                income.amount.to_string(),
                iso(income.date),
                income.source,
                income.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    #[cfg(test)]
    pub(crate) fn get_income(&self, user_id: i64, id: i64) -> LedgerResult<Option<Income>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, amount, date, source, created_at
                 FROM income WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                income_from_row,
            )
            .optional()?)
    }

    /// Deletes only when `user_id` owns the row. Anything else is `NotFound`.
    pub(crate) fn delete_by_id(&self, table: Table, user_id: i64, id: i64) -> LedgerResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE id = ?1 AND user_id = ?2",
            table.name()
        );
        let changed = self.conn.execute(&sql, params![id, user_id])?;
        if changed == 0 {
            return Err(LedgerError::NotFound);
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Exact sum of `amount` over the matching rows; zero when nothing matches.
    pub(crate) fn sum_amount(
        &self,
        table: Table,
        user_id: i64,
        filter: &Filter,
    ) -> LedgerResult<Decimal> {
        let (where_sql, param_values) = filter.to_sql(table, user_id);
        let sql = format!("SELECT amount FROM {}{where_sql}", table.name());
        let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), |row| decimal_column(row, 0))?;
        let mut total = Decimal::ZERO;
        for amount in rows {
            total += amount?;
        }
        debug!(user_id, table = table.name(), ?filter, %total, "summed amounts");
        Ok(total)
    }

    /// Total expense amount per distinct category, ordered by category name.
    pub(crate) fn category_totals(
        &self,
        user_id: i64,
        window: DateWindow,
    ) -> LedgerResult<Vec<(Category, Decimal)>> {
        let (where_sql, param_values) = Filter::window(window).to_sql(Table::Expenses, user_id);
        let sql = format!("SELECT category, amount FROM expenses{where_sql}");
        let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), |row| {
            Ok((category_column(row, 0)?, decimal_column(row, 1)?))
        })?;

        let mut totals: BTreeMap<&'static str, (Category, Decimal)> = BTreeMap::new();
        for row in rows {
            let (category, amount) = row?;
            totals
                .entry(category.as_str())
                .or_insert((category, Decimal::ZERO))
                .1 += amount;
        }
        Ok(totals.into_values().collect())
    }

    /// Distinct categories the user has recorded expenses under, by name.
    pub(crate) fn expense_categories(&self, user_id: i64) -> LedgerResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT category FROM expenses WHERE user_id = ?1 ORDER BY category",
        )?;
        let rows = stmt.query_map(params![user_id], |row| category_column(row, 0))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Every matching expense, newest first.
    pub(crate) fn expenses(&self, user_id: i64, filter: &Filter) -> LedgerResult<Vec<Expense>> {
        let (where_sql, param_values) = filter.to_sql(Table::Expenses, user_id);
        let sql = format!(
            "SELECT id, user_id, amount, category, date, note, created_at
             FROM expenses{where_sql}
             ORDER BY date DESC, id DESC"
        );
        let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), expense_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn expense_page(
        &self,
        user_id: i64,
        filter: &Filter,
        page: u32,
        page_size: u32,
    ) -> LedgerResult<Page<Expense>> {
        self.paginated(
            Table::Expenses,
            "id, user_id, amount, category, date, note, created_at",
            user_id,
            filter,
            page,
            page_size,
            expense_from_row,
        )
    }

    pub(crate) fn income_page(
        &self,
        user_id: i64,
        filter: &Filter,
        page: u32,
        page_size: u32,
    ) -> LedgerResult<Page<Income>> {
        self.paginated(
            Table::Income,
            "id, user_id, amount, date, source, created_at",
            user_id,
            filter,
            page,
            page_size,
            income_from_row,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn paginated<T>(
        &self,
        table: Table,
        columns: &str,
        user_id: i64,
        filter: &Filter,
        page: u32,
        page_size: u32,
        map_row: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> LedgerResult<Page<T>> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let (where_sql, mut param_values) = filter.to_sql(table, user_id);

        let count_sql = format!("SELECT COUNT(*) FROM {}{where_sql}", table.name());
        let total_count: i64 = {
            let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();
            self.conn
                .query_row(&count_sql, params_ref.as_slice(), |row| row.get(0))?
        };
        let total_count = u64::try_from(total_count).unwrap_or(0);

        let limit_idx = param_values.len() + 1;
        let sql = format!(
            "SELECT {columns} FROM {}{where_sql}
             ORDER BY date DESC, id DESC
             LIMIT ?{limit_idx} OFFSET ?{}",
            table.name(),
            limit_idx + 1
        );
        param_values.push(Box::new(i64::from(page_size)));
        param_values.push(Box::new(
            i64::try_from(page_offset(page, page_size)).unwrap_or(i64::MAX),
        ));
        let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), map_row)?;
        let items = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(user_id, table = table.name(), page, total_count, "paged listing");

        Ok(Page {
            items,
            page,
            page_size,
            total_count,
            total_pages: total_pages(total_count, page_size),
        })
    }

    // ── Budgets ───────────────────────────────────────────────

    /// Insert or replace the single (user, category, month) row in one statement.
    pub(crate) fn upsert_budget(&self, budget: &Budget) -> LedgerResult<i64> {
        let id = self.conn.query_row(
            "INSERT INTO budgets (user_id, category, budget_limit, month, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, category, month) DO UPDATE SET budget_limit = excluded.budget_limit
             RETURNING id",
            params![
                budget.user_id,
                budget.category.as_str(),
                budget.limit.to_string(),
                budget.month.to_string(),
                chrono::Utc::now().to_rfc3339(),
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// All of the user's budget rows for `month`, ordered by category name.
    pub(crate) fn get_budgets(&self, user_id: i64, month: YearMonth) -> LedgerResult<Vec<Budget>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, category, budget_limit, month FROM budgets
             WHERE user_id = ?1 AND month = ?2
             ORDER BY category",
        )?;
        let rows = stmt.query_map(params![user_id, month.to_string()], budget_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_budget(
        &self,
        user_id: i64,
        category: BudgetCategory,
        month: YearMonth,
    ) -> LedgerResult<Option<Budget>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, category, budget_limit, month FROM budgets
                 WHERE user_id = ?1 AND category = ?2 AND month = ?3",
                params![user_id, category.as_str(), month.to_string()],
                budget_from_row,
            )
            .optional()?)
    }

    /// Checks ownership before deleting, inside one transaction.
    pub(crate) fn delete_budget(&mut self, user_id: i64, id: i64) -> LedgerResult<()> {
        let tx = self.conn.transaction()?;
        let owner: Option<i64> = tx
            .query_row(
                "SELECT user_id FROM budgets WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        if owner != Some(user_id) {
            return Err(LedgerError::NotFound);
        }
        tx.execute("DELETE FROM budgets WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn budget_row_count(
        &self,
        user_id: i64,
        category: BudgetCategory,
        month: YearMonth,
    ) -> LedgerResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM budgets WHERE user_id = ?1 AND category = ?2 AND month = ?3",
            params![user_id, category.as_str(), month.to_string()],
            |row| row.get(0),
        )?)
    }
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

#[derive(Debug, thiserror::Error)]
#[error("unexpected stored value '{0}'")]
struct BadValue(String);

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

fn category_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Category> {
    let text: String = row.get(idx)?;
    Category::parse(&text).ok_or_else(|| conversion_error(idx, BadValue(text)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: Some(row.get(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        amount: decimal_column(row, 2)?,
        category: category_column(row, 3)?,
        date: date_column(row, 4)?,
        note: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn income_from_row(row: &Row<'_>) -> rusqlite::Result<Income> {
    Ok(Income {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        amount: decimal_column(row, 2)?,
        date: date_column(row, 3)?,
        source: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    let category: String = row.get(2)?;
    let month: String = row.get(4)?;
    Ok(Budget {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        category: BudgetCategory::parse(&category)
            .ok_or_else(|| conversion_error(2, BadValue(category)))?,
        limit: decimal_column(row, 3)?,
        month: YearMonth::parse(&month)
            .ok_or_else(|| conversion_error(4, BadValue(month)))?,
    })
}
