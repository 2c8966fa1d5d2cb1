//! User accounts. Passwords are only ever stored as bcrypt hashes.

use tracing::{info, warn};

use crate::db::Database;
use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::models::User;
use crate::validate;

/// bcrypt work factor used outside of tests.
pub(crate) const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// bcrypt reads 72 bytes, the last of which is the terminating NUL.
const MAX_PASSWORD_BYTES: usize = 71;

fn hash_password(password: &str, cost: u32) -> LedgerResult<String> {
    bcrypt::non_truncating_hash(password, cost).map_err(|e| LedgerError::Hashing(e.to_string()))
}

/// A password too long to have been hashed can never match.
fn verify_password(password: &str, hash: &str) -> LedgerResult<bool> {
    match bcrypt::non_truncating_verify(password, hash) {
        Ok(matches) => Ok(matches),
        Err(bcrypt::BcryptError::Truncation(_)) => Ok(false),
        Err(e) => Err(LedgerError::Hashing(e.to_string())),
    }
}

fn check_new_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    validate::password(password)?;
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::PasswordTooLong);
    }
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Creates an account and returns its id.
pub(crate) fn register_user(
    db: &Database,
    username: &str,
    email: &str,
    password: &str,
    confirmation: &str,
    cost: u32,
) -> LedgerResult<i64> {
    let username = username.trim();
    let email = email.trim();
    validate::username(username)?;
    validate::email(email)?;
    check_new_password(password, confirmation)?;

    let hash = hash_password(password, cost)?;
    let id = db.insert_user(&User::new(username.to_string(), email.to_string(), hash))?;
    info!(user_id = id, username, "registered user");
    Ok(id)
}

/// Exchanges a username and password for the user's id.
///
/// An unknown username and a wrong password fail the same way.
pub(crate) fn log_in(db: &Database, username: &str, password: &str) -> LedgerResult<i64> {
    let Some(user) = db.get_user_by_username(username.trim())? else {
        warn!(username, "log-in for unknown user");
        return Err(LedgerError::Credentials);
    };
    let id = user.id.ok_or(LedgerError::NotFound)?;
    if !verify_password(password, &user.hash)? {
        warn!(user_id = id, "log-in with wrong password");
        return Err(LedgerError::Credentials);
    }
    Ok(id)
}

pub(crate) fn change_password(
    db: &Database,
    user_id: i64,
    current: &str,
    new: &str,
    confirmation: &str,
    cost: u32,
) -> LedgerResult<()> {
    let user = db.get_user(user_id)?.ok_or(LedgerError::NotFound)?;
    if !verify_password(current, &user.hash)? {
        return Err(LedgerError::Credentials);
    }
    check_new_password(new, confirmation)?;

    db.update_password_hash(user_id, &hash_password(new, cost)?)?;
    info!(user_id, "changed password");
    Ok(())
}

/// Removes the account together with all of its transactions and budgets.
pub(crate) fn delete_account(db: &Database, user_id: i64) -> LedgerResult<()> {
    db.delete_user(user_id)?;
    info!(user_id, "deleted account");
    Ok(())
}
