use database_layer::DatabaseError;
use error_common::HimsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Staff member not found")]
    StaffNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already in use")]
    EmailAlreadyInUse,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Only administrators can manage staff accounts")]
    AdminRequired,

    #[error("Hashing error")]
    HashingError,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub type Result<T> = std::result::Result<T, IdentityError>;

impl From<IdentityError> for HimsError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::StaffNotFound => HimsError::not_found("Staff member", "requested"),
            IdentityError::InvalidCredentials
            | IdentityError::AccountDisabled
            | IdentityError::InvalidToken(_) => HimsError::unauthorized(err.to_string()),
            IdentityError::EmailAlreadyInUse => HimsError::conflict(err.to_string()),
            IdentityError::InvalidEmail | IdentityError::WeakPassword(_) => {
                HimsError::validation(err.to_string())
            }
            IdentityError::AdminRequired => HimsError::forbidden(err.to_string()),
            IdentityError::HashingError => HimsError::internal(err.to_string()),
            IdentityError::Database(db) => db.into(),
        }
    }
}
