#[derive(thiserror::Error, Debug)]
pub enum DatabaseError {
    #[error("Database error")]
    DatabaseError(#[source] sqlx::Error),
    #[error("Record not found")]
    NotFound,
    #[error("Record already exists: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
                DatabaseError::Conflict(db_error.message().to_string())
            }
            _ => DatabaseError::DatabaseError(error),
        }
    }
}
