mod budget;
mod category;
mod page;
mod period;
mod transaction;
mod user;

pub use budget::Budget;
pub use category::{BudgetCategory, Category};
pub use page::{page_offset, total_pages, Page};
pub use period::YearMonth;
pub use transaction::{Expense, ExpenseDraft, Income, IncomeDraft};
pub use user::User;
