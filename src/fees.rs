// 💸 Fee Calculator - pure billing rules
//
// Subscribers pay the flat monthly plan and nothing per visit.
// Everyone else pays HOURLY_RATE per hour, prorated, rounded to cents.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::BillingStatus;

// ============================================================================
// RATES
// ============================================================================

/// Per-hour charge for casual vehicles
pub const HOURLY_RATE: Decimal = dec!(10);

/// Monthly plan price assigned at enrollment
pub const DEFAULT_MONTHLY_FEE: Decimal = dec!(300.00);

const MILLIS_PER_HOUR: Decimal = dec!(3600000);

/// Money is always carried with two decimal places
const CENTS: u32 = 2;

// ============================================================================
// CALCULATION
// ============================================================================

/// Result of billing one stay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charge {
    pub status: BillingStatus,
    pub elapsed_hours: Decimal,
    pub amount: Decimal,
}

/// Hours between entry and exit, fractional.
///
/// An exit stamped before its entry (clock moved backwards) counts as zero.
pub fn elapsed_hours(entry: DateTime<Utc>, exit: DateTime<Utc>) -> Decimal {
    let millis = (exit - entry).num_milliseconds().max(0);
    Decimal::from(millis) / MILLIS_PER_HOUR
}

/// Casual fee for a given duration: hours × rate, rounded to cents
pub fn casual_fee(elapsed_hours: Decimal) -> Decimal {
    let mut fee = (elapsed_hours * HOURLY_RATE).round_dp(CENTS);
    fee.rescale(CENTS);
    fee
}

/// Bill one stay.
pub fn compute_charge(is_subscriber: bool, entry: DateTime<Utc>, exit: DateTime<Utc>) -> Charge {
    if is_subscriber {
        return Charge {
            status: BillingStatus::Subscriber,
            elapsed_hours: Decimal::ZERO,
            amount: dec!(0.00),
        };
    }

    let hours = elapsed_hours(entry, exit);
    Charge {
        status: BillingStatus::Casual,
        elapsed_hours: hours,
        amount: casual_fee(hours),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_one_hour_costs_ten() {
        let charge = compute_charge(false, t0(), t0() + Duration::seconds(3600));

        assert_eq!(charge.status, BillingStatus::Casual);
        assert_eq!(charge.elapsed_hours, dec!(1));
        assert_eq!(charge.amount, dec!(10.00));
    }

    #[test]
    fn test_half_hour_is_prorated() {
        let charge = compute_charge(false, t0(), t0() + Duration::seconds(1800));

        assert_eq!(charge.elapsed_hours, dec!(0.5));
        assert_eq!(charge.amount, dec!(5.00));
    }

    #[test]
    fn test_fee_rounds_to_cents() {
        // 100 seconds = 0.02777.. h -> 0.2777.. -> 0.28
        let charge = compute_charge(false, t0(), t0() + Duration::seconds(100));

        assert_eq!(charge.amount, dec!(0.28));
        assert_eq!(charge.amount.scale(), 2);
    }

    #[test]
    fn test_subscriber_never_pays() {
        let charge = compute_charge(true, t0(), t0() + Duration::hours(72));

        assert_eq!(charge.status, BillingStatus::Subscriber);
        assert_eq!(charge.elapsed_hours, Decimal::ZERO);
        assert_eq!(charge.amount, dec!(0.00));
    }

    #[test]
    fn test_exit_before_entry_is_free() {
        let charge = compute_charge(false, t0(), t0() - Duration::minutes(5));

        assert_eq!(charge.elapsed_hours, Decimal::ZERO);
        assert_eq!(charge.amount, dec!(0.00));
    }

    #[test]
    fn test_zero_duration() {
        assert_eq!(casual_fee(elapsed_hours(t0(), t0())), dec!(0.00));
    }
}
