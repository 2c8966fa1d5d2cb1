#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never the password itself.
    pub hash: String,
    pub created_at: String,
}

impl User {
    pub fn new(username: String, email: String, hash: String) -> Self {
        Self {
            id: None,
            username,
            email,
            hash,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
