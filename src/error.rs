use thiserror::Error;

/// A rejected input, carrying the reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Username must be between 3-50 characters")]
    UsernameLength,
    #[error("Username can only contain letters, numbers, and underscores")]
    UsernameCharacters,
    #[error("Invalid email: {0}")]
    Email(String),
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Password is too long")]
    PasswordTooLong,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Invalid amount format")]
    AmountFormat,
    #[error("Amount must be greater than 0")]
    AmountNotPositive,
    #[error("Amount is too large")]
    AmountTooLarge,
    #[error("Invalid date format (use YYYY-MM-DD)")]
    Date,
    #[error("Invalid month format (use YYYY-MM)")]
    Month,
    #[error("Invalid category. Must be one of: {0}")]
    Category(String),
    #[error("Income source is required")]
    SourceRequired,
}

/// Errors returned by the ledger store, the engine and the mutating operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The record does not exist or belongs to another user.
    #[error("not found")]
    NotFound,

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("Invalid username or password")]
    Credentials,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("hashing failed: {0}")]
    Hashing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl LedgerError {
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

pub(crate) type LedgerResult<T> = std::result::Result<T, LedgerError>;
