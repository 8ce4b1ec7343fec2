// Parking Ledger - Core Library
// Subscribers, entries and exits for a parking facility, backed by SQLite

pub mod config;
pub mod db;
pub mod error;
pub mod fees;
pub mod ledger;
pub mod models;
pub mod shell;
pub mod validation;

// Only compile the board when the TUI feature is enabled
#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use config::{Command, Config, DEFAULT_DB_PATH};
pub use error::{CheckInError, CheckOutError, EnrollError};
pub use fees::{compute_charge, Charge, DEFAULT_MONTHLY_FEE, HOURLY_RATE};
pub use ledger::Ledger;
pub use models::{
    ArrivalKind, BillingStatus, CheckInOutcome, CheckOutOutcome, HistoryRecord, ParkedVehicle,
    Subscriber, VehicleInfo,
};
pub use shell::Shell;
pub use validation::{is_valid_name, is_valid_plate};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
