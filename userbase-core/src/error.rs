/// Userbase error type with actionable variants.
#[derive(Debug)]
pub enum UserbaseError {
    /// Underlying sqlx error.
    Sqlx(sqlx::Error),
    /// A keyed lookup or keyed update matched no row.
    NotFound { table: &'static str, key: String },
    /// A relation filter named a relation the model does not declare.
    UnknownRelation { table: String, relation: String },
    /// Generic message error.
    Message(String),
}

impl std::fmt::Display for UserbaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlx(err) => write!(f, "sqlx error: {}", err),
            Self::NotFound { table, key } => write!(f, "no row in {} matching {}", table, key),
            Self::UnknownRelation { table, relation } => {
                write!(f, "{} has no relation named {}", table, relation)
            }
            Self::Message(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for UserbaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlx(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for UserbaseError {
    fn from(err: sqlx::Error) -> Self {
        map_sqlx_error(err)
    }
}

/// Result alias for Userbase operations.
pub type UserbaseResult<T> = Result<T, UserbaseError>;

/// Convert sqlx errors to actionable Userbase errors when possible.
pub fn map_sqlx_error(err: sqlx::Error) -> UserbaseError {
    match err {
        sqlx::Error::RowNotFound => UserbaseError::NotFound {
            table: "<unknown>",
            key: "<query>".to_string(),
        },
        other => UserbaseError::Sqlx(other),
    }
}
