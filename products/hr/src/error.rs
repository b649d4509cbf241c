use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HrError {
    #[error("employee with account {account_id} not found")]
    EmployeeNotFound { account_id: i64 },
    #[error("employee {account_id} lacks permission: {permission}")]
    InsufficientPermissions { account_id: i64, permission: String },
    #[error(transparent)]
    Store(#[from] DbErr),
}

pub type HrResult<T> = Result<T, HrError>;

impl HrError {
    /// True when the store rejected a write on a unique key (e.g. a second record for one account).
    pub fn is_unique_violation(&self) -> bool {
        match self {
            HrError::Store(err) => matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))),
            _ => false,
        }
    }
}
