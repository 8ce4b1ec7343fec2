use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use std::str::FromStr;

use crate::models::{HistoryRecord, ParkedVehicle, Subscriber, VehicleInfo};

// Store functions return raw rusqlite results: the ledger needs to see
// ConstraintViolation to turn it into a typed error.

pub fn setup_database(conn: &Connection) -> Result<()> {
    // In-memory databases report "memory" and ignore the switch
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("Failed to enable WAL journal")?;

    // ==========================================================================
    // Subscribers (plate unique)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS subscribers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            plate TEXT UNIQUE NOT NULL,
            model TEXT NOT NULL,
            color TEXT NOT NULL,
            monthly_fee TEXT NOT NULL DEFAULT '300.00',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Parked vehicles (plate unique: one stay at a time)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS parked_vehicles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            plate TEXT UNIQUE NOT NULL,
            model TEXT NOT NULL,
            color TEXT NOT NULL,
            entry_timestamp TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Exit history (append-only, plate repeats)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS exit_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            plate TEXT NOT NULL,
            model TEXT NOT NULL,
            color TEXT NOT NULL,
            entry_timestamp TEXT NOT NULL,
            exit_timestamp TEXT NOT NULL,
            amount_paid TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exit_history_plate ON exit_history(plate)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// COLUMN ENCODING
// ============================================================================

/// Fixed-width RFC 3339 so TEXT ordering matches time ordering
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn decode_decimal(idx: usize, raw: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn vehicle_from_row(row: &Row) -> rusqlite::Result<VehicleInfo> {
    Ok(VehicleInfo {
        name: row.get(0)?,
        plate: row.get(1)?,
        model: row.get(2)?,
        color: row.get(3)?,
    })
}

fn subscriber_from_row(row: &Row) -> rusqlite::Result<Subscriber> {
    let fee: String = row.get(4)?;
    Ok(Subscriber {
        vehicle: vehicle_from_row(row)?,
        monthly_fee: decode_decimal(4, &fee)?,
    })
}

fn parked_from_row(row: &Row) -> rusqlite::Result<ParkedVehicle> {
    let entry: String = row.get(4)?;
    Ok(ParkedVehicle {
        vehicle: vehicle_from_row(row)?,
        entry_timestamp: decode_timestamp(4, &entry)?,
    })
}

fn history_from_row(row: &Row) -> rusqlite::Result<HistoryRecord> {
    let entry: String = row.get(4)?;
    let exit: String = row.get(5)?;
    let amount: String = row.get(6)?;
    Ok(HistoryRecord {
        vehicle: vehicle_from_row(row)?,
        entry_timestamp: decode_timestamp(4, &entry)?,
        exit_timestamp: decode_timestamp(5, &exit)?,
        amount_paid: decode_decimal(6, &amount)?,
    })
}

// ============================================================================
// SUBSCRIBERS
// ============================================================================

pub fn insert_subscriber(conn: &Connection, sub: &Subscriber) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO subscribers (name, plate, model, color, monthly_fee)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            sub.vehicle.name,
            sub.vehicle.plate,
            sub.vehicle.model,
            sub.vehicle.color,
            sub.monthly_fee.to_string(),
        ],
    )?;
    Ok(())
}

pub fn find_subscriber(conn: &Connection, plate: &str) -> rusqlite::Result<Option<Subscriber>> {
    conn.query_row(
        "SELECT name, plate, model, color, monthly_fee FROM subscribers WHERE plate = ?1",
        [plate],
        subscriber_from_row,
    )
    .optional()
}

pub fn count_subscribers(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM subscribers", [], |row| row.get(0))
}

// ============================================================================
// PARKED VEHICLES
// ============================================================================

pub fn insert_parked(conn: &Connection, parked: &ParkedVehicle) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO parked_vehicles (name, plate, model, color, entry_timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            parked.vehicle.name,
            parked.vehicle.plate,
            parked.vehicle.model,
            parked.vehicle.color,
            encode_timestamp(&parked.entry_timestamp),
        ],
    )?;
    Ok(())
}

pub fn find_parked(conn: &Connection, plate: &str) -> rusqlite::Result<Option<ParkedVehicle>> {
    conn.query_row(
        "SELECT name, plate, model, color, entry_timestamp FROM parked_vehicles WHERE plate = ?1",
        [plate],
        parked_from_row,
    )
    .optional()
}

/// Returns the number of rows removed (0 or 1)
pub fn delete_parked(conn: &Connection, plate: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM parked_vehicles WHERE plate = ?1", [plate])
}

pub fn count_parked(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM parked_vehicles", [], |row| row.get(0))
}

/// Everything currently inside, longest stay first
pub fn list_parked(conn: &Connection) -> rusqlite::Result<Vec<ParkedVehicle>> {
    let mut stmt = conn.prepare(
        "SELECT name, plate, model, color, entry_timestamp
         FROM parked_vehicles
         ORDER BY entry_timestamp ASC, id ASC",
    )?;

    let parked = stmt
        .query_map([], parked_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(parked)
}

// ============================================================================
// EXIT HISTORY
// ============================================================================

pub fn insert_history(conn: &Connection, record: &HistoryRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO exit_history (
            name, plate, model, color, entry_timestamp, exit_timestamp, amount_paid
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.vehicle.name,
            record.vehicle.plate,
            record.vehicle.model,
            record.vehicle.color,
            encode_timestamp(&record.entry_timestamp),
            encode_timestamp(&record.exit_timestamp),
            record.amount_paid.to_string(),
        ],
    )?;
    Ok(())
}

/// Most recent exit first
pub fn get_history(conn: &Connection) -> rusqlite::Result<Vec<HistoryRecord>> {
    let mut stmt = conn.prepare(
        "SELECT name, plate, model, color, entry_timestamp, exit_timestamp, amount_paid
         FROM exit_history
         ORDER BY id DESC",
    )?;

    let records = stmt
        .query_map([], history_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn get_history_for_plate(conn: &Connection, plate: &str) -> rusqlite::Result<Vec<HistoryRecord>> {
    let mut stmt = conn.prepare(
        "SELECT name, plate, model, color, entry_timestamp, exit_timestamp, amount_paid
         FROM exit_history
         WHERE plate = ?1
         ORDER BY id DESC",
    )?;

    let records = stmt
        .query_map([plate], history_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn count_history(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM exit_history", [], |row| row.get(0))
}

// ============================================================================
// CSV EXPORT
// ============================================================================

/// Flat CSV shape of one exit record (csv can't serialize nested structs)
#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    name: &'a str,
    plate: &'a str,
    model: &'a str,
    color: &'a str,
    entry_timestamp: String,
    exit_timestamp: String,
    amount_paid: String,
}

impl<'a> From<&'a HistoryRecord> for HistoryRow<'a> {
    fn from(record: &'a HistoryRecord) -> Self {
        HistoryRow {
            name: &record.vehicle.name,
            plate: &record.vehicle.plate,
            model: &record.vehicle.model,
            color: &record.vehicle.color,
            entry_timestamp: encode_timestamp(&record.entry_timestamp),
            exit_timestamp: encode_timestamp(&record.exit_timestamp),
            amount_paid: record.amount_paid.to_string(),
        }
    }
}

pub fn write_history_csv<W: Write>(records: &[HistoryRecord], writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);

    for record in records {
        wtr.serialize(HistoryRow::from(record))
            .context("Failed to write history row")?;
    }
    wtr.flush().context("Failed to flush CSV output")?;

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_constraint_violation;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn vehicle(plate: &str) -> VehicleInfo {
        VehicleInfo::new("Jane Silva", plate, "Onix", "Silver")
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = memory_db();
        setup_database(&conn).unwrap();

        assert_eq!(count_parked(&conn).unwrap(), 0);
        assert_eq!(count_subscribers(&conn).unwrap(), 0);
        assert_eq!(count_history(&conn).unwrap(), 0);
    }

    #[test]
    fn test_subscriber_plate_is_unique() {
        let conn = memory_db();
        let sub = Subscriber::new(vehicle("XYZ5678"));

        insert_subscriber(&conn, &sub).unwrap();
        let err = insert_subscriber(&conn, &sub).unwrap_err();

        assert!(is_constraint_violation(&err));
        assert_eq!(count_subscribers(&conn).unwrap(), 1);
    }

    #[test]
    fn test_subscriber_round_trip_keeps_fee() {
        let conn = memory_db();
        insert_subscriber(&conn, &Subscriber::new(vehicle("XYZ5678"))).unwrap();

        let found = find_subscriber(&conn, "XYZ5678").unwrap().unwrap();
        assert_eq!(found.monthly_fee, dec!(300.00));
        assert_eq!(found.vehicle.name, "Jane Silva");

        assert!(find_subscriber(&conn, "AAA0000").unwrap().is_none());
    }

    #[test]
    fn test_parked_delete_and_count() {
        let conn = memory_db();
        let entry = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        insert_parked(&conn, &ParkedVehicle::new(vehicle("ABC1234"), entry)).unwrap();
        insert_parked(&conn, &ParkedVehicle::new(vehicle("ABC1D23"), entry)).unwrap();
        assert_eq!(count_parked(&conn).unwrap(), 2);

        let found = find_parked(&conn, "ABC1234").unwrap().unwrap();
        assert_eq!(found.entry_timestamp, entry);

        assert_eq!(delete_parked(&conn, "ABC1234").unwrap(), 1);
        assert_eq!(delete_parked(&conn, "ABC1234").unwrap(), 0);
        assert_eq!(count_parked(&conn).unwrap(), 1);
    }

    #[test]
    fn test_list_parked_orders_by_entry() {
        let conn = memory_db();
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 17, 0, 0).unwrap();

        insert_parked(&conn, &ParkedVehicle::new(vehicle("LAT0001"), late)).unwrap();
        insert_parked(&conn, &ParkedVehicle::new(vehicle("EAR0001"), early)).unwrap();

        let plates: Vec<String> = list_parked(&conn)
            .unwrap()
            .into_iter()
            .map(|p| p.vehicle.plate)
            .collect();
        assert_eq!(plates, vec!["EAR0001", "LAT0001"]);
    }

    #[test]
    fn test_history_allows_repeat_plates() {
        let conn = memory_db();
        let entry = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let exit = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

        let first = ParkedVehicle::new(vehicle("ABC1234"), entry).depart(exit, dec!(10.00));
        let second = ParkedVehicle::new(vehicle("ABC1234"), entry).depart(exit, dec!(0.00));
        insert_history(&conn, &first).unwrap();
        insert_history(&conn, &second).unwrap();

        let records = get_history_for_plate(&conn, "ABC1234").unwrap();
        assert_eq!(records.len(), 2);
        // newest first
        assert_eq!(records[0].amount_paid, dec!(0.00));
        assert_eq!(records[1].amount_paid, dec!(10.00));
        assert_eq!(records[1].exit_timestamp, exit);
    }

    #[test]
    fn test_corrupt_amount_is_reported() {
        let conn = memory_db();
        conn.execute(
            "INSERT INTO exit_history (name, plate, model, color, entry_timestamp, exit_timestamp, amount_paid)
             VALUES ('A B', 'ABC1234', 'm', 'c', '2024-01-01T00:00:00Z', '2024-01-01T01:00:00Z', 'ten')",
            [],
        )
        .unwrap();

        let err = get_history(&conn).unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(6, _, _)));
    }
}
