// 🚨 Ledger errors - one enum per operation
//
// Constraint violations from the store come back as typed, recoverable
// errors. Anything else the store throws at us is `Storage`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("plate {0} is already enrolled as a subscriber")]
    DuplicatePlate(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

#[derive(Error, Debug)]
pub enum CheckInError {
    #[error("vehicle {0} is already parked")]
    AlreadyParked(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

#[derive(Error, Debug)]
pub enum CheckOutError {
    /// No parked vehicle under this plate. Callers may retry with another plate.
    #[error("vehicle {0} is not parked here")]
    NotParked(String),

    /// The exit record was rejected; the vehicle is still parked.
    #[error("could not record exit of {plate}: {source}")]
    HistoryWriteFailed {
        plate: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// True when SQLite refused a write because of a UNIQUE/CHECK/trigger constraint
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
