// 🅿️ Parking Ledger - vehicle lifecycle + billing
//
// Per plate:  Unparked --check_in--> Parked --check_out--> Unparked
// Enrollment is an orthogonal, permanent flag that only changes billing.
//
// Every write runs inside one IMMEDIATE transaction, so the uniqueness
// check and the insert (and check-out's insert-then-delete) are atomic.
// A failed operation leaves all three record sets as they were.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::db;
use crate::error::{is_constraint_violation, CheckInError, CheckOutError, EnrollError};
use crate::fees;
use crate::models::{
    ArrivalKind, CheckInOutcome, CheckOutOutcome, HistoryRecord, ParkedVehicle, Subscriber,
    VehicleInfo,
};

pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    /// Open (or create) the ledger database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// Throwaway ledger, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        db::setup_database(&conn).context("Failed to initialize parking schema")?;
        Ok(Ledger { conn })
    }

    // ========================================================================
    // TRANSACTIONS
    // ========================================================================

    /// Register a monthly subscriber on the default plan.
    pub fn enroll(
        &mut self,
        name: &str,
        plate: &str,
        model: &str,
        color: &str,
    ) -> Result<Subscriber, EnrollError> {
        let subscriber = Subscriber::new(VehicleInfo::new(name, plate, model, color));

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        match db::insert_subscriber(&tx, &subscriber) {
            Ok(()) => {}
            Err(e) if is_constraint_violation(&e) => {
                warn!(plate, "enrollment rejected: plate already subscribed");
                return Err(EnrollError::DuplicatePlate(plate.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit()?;

        info!(plate, fee = %subscriber.monthly_fee, "subscriber enrolled");
        Ok(subscriber)
    }

    /// Record a vehicle entering at `now`.
    pub fn check_in(
        &mut self,
        name: &str,
        plate: &str,
        model: &str,
        color: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, CheckInError> {
        let parked = ParkedVehicle::new(VehicleInfo::new(name, plate, model, color), now);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        match db::insert_parked(&tx, &parked) {
            Ok(()) => {}
            Err(e) if is_constraint_violation(&e) => {
                warn!(plate, "check-in rejected: vehicle already parked");
                return Err(CheckInError::AlreadyParked(plate.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        let arrival = if db::find_subscriber(&tx, plate)?.is_some() {
            ArrivalKind::SubscriberArrival
        } else {
            ArrivalKind::CasualArrival
        };
        tx.commit()?;

        info!(plate, arrival = arrival.label(), entry = %now, "vehicle checked in");
        Ok(CheckInOutcome { arrival, parked })
    }

    /// Bill the stay and move the vehicle from parked to history.
    ///
    /// `NotParked` is the recoverable "wrong plate" case. On
    /// `HistoryWriteFailed` the vehicle remains parked.
    pub fn check_out(
        &mut self,
        plate: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckOutOutcome, CheckOutError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let parked = match db::find_parked(&tx, plate)? {
            Some(parked) => parked,
            None => {
                warn!(plate, "check-out rejected: vehicle not parked");
                return Err(CheckOutError::NotParked(plate.to_string()));
            }
        };

        let is_subscriber = db::find_subscriber(&tx, plate)?.is_some();
        let charge = fees::compute_charge(is_subscriber, parked.entry_timestamp, now);
        let record = parked.depart(now, charge.amount);

        match db::insert_history(&tx, &record) {
            Ok(()) => {}
            Err(source) if is_constraint_violation(&source) => {
                warn!(plate, error = %source, "exit record rejected, rolling back check-out");
                return Err(CheckOutError::HistoryWriteFailed {
                    plate: plate.to_string(),
                    source,
                });
            }
            Err(e) => return Err(e.into()),
        }
        db::delete_parked(&tx, plate)?;
        tx.commit()?;

        info!(
            plate,
            status = charge.status.label(),
            hours = %charge.elapsed_hours.round_dp(2),
            amount = %charge.amount,
            "vehicle checked out"
        );
        Ok(CheckOutOutcome {
            status: charge.status,
            elapsed_hours: charge.elapsed_hours,
            amount_paid: charge.amount,
            record,
        })
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Number of vehicles inside right now
    pub fn count_parked(&self) -> rusqlite::Result<i64> {
        let count = db::count_parked(&self.conn)?;
        debug!(count, "occupancy queried");
        Ok(count)
    }

    pub fn find_parked(&self, plate: &str) -> rusqlite::Result<Option<ParkedVehicle>> {
        db::find_parked(&self.conn, plate)
    }

    pub fn find_subscriber(&self, plate: &str) -> rusqlite::Result<Option<Subscriber>> {
        db::find_subscriber(&self.conn, plate)
    }

    pub fn is_subscriber(&self, plate: &str) -> rusqlite::Result<bool> {
        Ok(self.find_subscriber(plate)?.is_some())
    }

    pub fn list_parked(&self) -> rusqlite::Result<Vec<ParkedVehicle>> {
        db::list_parked(&self.conn)
    }

    pub fn history(&self) -> rusqlite::Result<Vec<HistoryRecord>> {
        db::get_history(&self.conn)
    }

    pub fn history_for_plate(&self, plate: &str) -> rusqlite::Result<Vec<HistoryRecord>> {
        db::get_history_for_plate(&self.conn, plate)
    }

    pub fn count_subscribers(&self) -> rusqlite::Result<i64> {
        db::count_subscribers(&self.conn)
    }

    pub fn count_history(&self) -> rusqlite::Result<i64> {
        db::count_history(&self.conn)
    }

    /// Dump the raw exit history as CSV, oldest first. Returns rows written.
    pub fn export_history<W: Write>(&self, writer: W) -> Result<usize> {
        let mut records = self.history().context("Failed to read exit history")?;
        records.reverse();
        let written = db::write_history_csv(&records, writer)?;
        info!(rows = written, "exit history exported");
        Ok(written)
    }
}
