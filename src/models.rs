// 🚗 Record Model - the three record sets the ledger moves vehicles through
//
// Subscriber and ParkedVehicle are keyed by plate (unique per set).
// HistoryRecord is append-only; the same plate shows up once per visit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fees::DEFAULT_MONTHLY_FEE;

// ============================================================================
// VEHICLE DESCRIPTION
// ============================================================================

/// Who is driving what. Collected by the operator at the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub name: String,
    pub plate: String,
    pub model: String,
    pub color: String,
}

impl VehicleInfo {
    pub fn new(name: &str, plate: &str, model: &str, color: &str) -> Self {
        VehicleInfo {
            name: name.to_string(),
            plate: plate.to_string(),
            model: model.to_string(),
            color: color.to_string(),
        }
    }
}

// ============================================================================
// RECORD SETS
// ============================================================================

/// Monthly subscriber. Never mutated, never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub vehicle: VehicleInfo,
    pub monthly_fee: Decimal,
}

impl Subscriber {
    /// New subscriber on the standard monthly plan
    pub fn new(vehicle: VehicleInfo) -> Self {
        Subscriber {
            vehicle,
            monthly_fee: DEFAULT_MONTHLY_FEE,
        }
    }

    pub fn plate(&self) -> &str {
        &self.vehicle.plate
    }
}

/// A vehicle currently inside the facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkedVehicle {
    pub vehicle: VehicleInfo,
    pub entry_timestamp: DateTime<Utc>,
}

impl ParkedVehicle {
    pub fn new(vehicle: VehicleInfo, entry_timestamp: DateTime<Utc>) -> Self {
        ParkedVehicle {
            vehicle,
            entry_timestamp,
        }
    }

    pub fn plate(&self) -> &str {
        &self.vehicle.plate
    }

    /// Close out this stay. Consumes the record: a departed vehicle is no longer parked.
    pub fn depart(self, exit_timestamp: DateTime<Utc>, amount_paid: Decimal) -> HistoryRecord {
        HistoryRecord {
            vehicle: self.vehicle,
            entry_timestamp: self.entry_timestamp,
            exit_timestamp,
            amount_paid,
        }
    }
}

/// One completed stay. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub vehicle: VehicleInfo,
    pub entry_timestamp: DateTime<Utc>,
    pub exit_timestamp: DateTime<Utc>,
    pub amount_paid: Decimal,
}

impl HistoryRecord {
    pub fn plate(&self) -> &str {
        &self.vehicle.plate
    }
}

// ============================================================================
// OPERATION OUTCOMES
// ============================================================================

/// Informational tag for the operator; not stored anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalKind {
    SubscriberArrival,
    CasualArrival,
}

impl ArrivalKind {
    pub fn label(&self) -> &'static str {
        match self {
            ArrivalKind::SubscriberArrival => "subscriber",
            ArrivalKind::CasualArrival => "casual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingStatus {
    /// Flat monthly plan, no per-visit charge
    Subscriber,
    /// Billed by the hour
    Casual,
}

impl BillingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            BillingStatus::Subscriber => "subscriber",
            BillingStatus::Casual => "casual",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckInOutcome {
    pub arrival: ArrivalKind,
    pub parked: ParkedVehicle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutOutcome {
    pub status: BillingStatus,
    /// Zero for subscribers
    pub elapsed_hours: Decimal,
    pub amount_paid: Decimal,
    /// The history row that was written
    pub record: HistoryRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_subscriber_gets_default_fee() {
        let sub = Subscriber::new(VehicleInfo::new("Jane Silva", "XYZ5678", "Gol", "Red"));

        assert_eq!(sub.monthly_fee, dec!(300.00));
        assert_eq!(sub.plate(), "XYZ5678");
    }

    #[test]
    fn test_depart_carries_entry_fields() {
        let entry = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let exit = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        let parked = ParkedVehicle::new(VehicleInfo::new("Ana Costa", "ABC1D23", "Uno", "Blue"), entry);

        let record = parked.clone().depart(exit, dec!(25.00));

        assert_eq!(record.vehicle, parked.vehicle);
        assert_eq!(record.entry_timestamp, entry);
        assert_eq!(record.exit_timestamp, exit);
        assert_eq!(record.amount_paid, dec!(25.00));
    }
}
