use crate::application::repos::RepoError;

/// Translate driver errors into the repository taxonomy.
///
/// Postgres SQLSTATE classes: 23xxx integrity (23505 unique, 23503 foreign
/// key), 22xxx data exceptions, 57014 statement cancelled.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            },
            Some("23503") => RepoError::InvalidInput {
                message: db.message().to_string(),
            },
            Some("57014") => RepoError::Timeout,
            Some(code) if code.starts_with("23") => RepoError::Integrity {
                message: db.message().to_string(),
            },
            Some(code) if code.starts_with("22") => RepoError::InvalidInput {
                message: db.message().to_string(),
            },
            _ => RepoError::Persistence(db.message().to_string()),
        },
        other => RepoError::from_persistence(other),
    }
}
