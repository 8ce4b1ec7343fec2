// 🖥️ Operator Shell - text menu over the ledger
//
// All prompting, the 'v' go-back escape and the exit confirmation loop
// live here. The ledger never sees raw input: names and plates are
// validated before any call goes through.

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use std::io::{BufRead, Write};

use crate::error::{CheckInError, CheckOutError, EnrollError};
use crate::ledger::Ledger;
use crate::models::{ArrivalKind, BillingStatus, ParkedVehicle, VehicleInfo};
use crate::validation::{is_valid_name, is_valid_plate};

/// Source of "now" for entries and exits
pub type Clock = fn() -> DateTime<Utc>;

const BACK_KEY: &str = "v";

pub struct Shell<'a, R, W> {
    ledger: &'a mut Ledger,
    input: R,
    output: W,
    clock: Clock,
    input_closed: bool,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(ledger: &'a mut Ledger, input: R, output: W) -> Self {
        Shell {
            ledger,
            input,
            output,
            clock: Utc::now,
            input_closed: false,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Menu loop. Returns when the operator quits or input runs out.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.print_menu()?;

            let choice = match self.read_line("👉 Choose an option (1-5): ")? {
                Some(choice) => choice,
                None => break,
            };

            match choice.as_str() {
                "1" => self.enroll_subscriber()?,
                "2" => self.register_entry()?,
                "3" => self.register_exit()?,
                "4" => self.show_occupancy()?,
                "5" => break,
                _ => writeln!(self.output, "🤔 Invalid option! Please type a number from 1 to 5.")?,
            }

            if self.input_closed {
                break;
            }
        }

        writeln!(self.output, "\n👋 Leaving the system. Drive safely!")?;
        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.output, "\n{}", "=".repeat(30))?;
        writeln!(self.output, "🌟 PARKING LEDGER 🌟")?;
        writeln!(self.output, "{}", "=".repeat(30))?;
        writeln!(self.output, "1️⃣ Enroll monthly subscriber")?;
        writeln!(self.output, "2️⃣ Register vehicle entry")?;
        writeln!(self.output, "3️⃣ Register vehicle exit")?;
        writeln!(self.output, "4️⃣ Show occupied spots")?;
        writeln!(self.output, "5️⃣ Quit")?;
        writeln!(self.output, "{}", "=".repeat(30))?;
        Ok(())
    }

    // ========================================================================
    // INPUT
    // ========================================================================

    /// One trimmed line, or None once input is exhausted
    fn read_line(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            self.input_closed = true;
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Like read_line, but 'v' means "back to the menu" (also None)
    fn ask(&mut self, label: &str) -> Result<Option<String>> {
        match self.read_line(label)? {
            Some(answer) if answer.eq_ignore_ascii_case(BACK_KEY) => {
                writeln!(self.output, "↩️ Back to the menu.")?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Name, plate, model, color. None if the operator backed out or typed something invalid.
    fn collect_vehicle(&mut self) -> Result<Option<VehicleInfo>> {
        let Some(name) = self.ask("👤 Full name (or 'v' to go back): ")? else {
            return Ok(None);
        };
        if !is_valid_name(&name) {
            writeln!(
                self.output,
                "🚫 Invalid name! 💡 Tip: first and last name, each capitalized."
            )?;
            return Ok(None);
        }

        let Some(plate) = self.ask("🚗 Vehicle plate (or 'v' to go back): ")? else {
            return Ok(None);
        };
        if !is_valid_plate(&plate) {
            writeln!(self.output, "❌ Invalid plate! 💡 Tip: format ABC1234 or ABC1D23.")?;
            return Ok(None);
        }

        let Some(model) = self.ask("🚘 Vehicle model (or 'v' to go back): ")? else {
            return Ok(None);
        };
        let Some(color) = self.ask("🌈 Vehicle color (or 'v' to go back): ")? else {
            return Ok(None);
        };

        Ok(Some(VehicleInfo {
            name,
            plate,
            model,
            color,
        }))
    }

    // ========================================================================
    // MENU ACTIONS
    // ========================================================================

    fn enroll_subscriber(&mut self) -> Result<()> {
        writeln!(self.output, "\n✨ SUBSCRIBER ENROLLMENT ✨")?;
        writeln!(self.output, "---------------------------------")?;

        let Some(v) = self.collect_vehicle()? else {
            return Ok(());
        };

        match self.ledger.enroll(&v.name, &v.plate, &v.model, &v.color) {
            Ok(sub) => writeln!(
                self.output,
                "✅ {} enrolled as a monthly subscriber (R$ {:.2}/month). Welcome! 🎉",
                sub.vehicle.name, sub.monthly_fee
            )?,
            Err(EnrollError::DuplicatePlate(_)) => writeln!(
                self.output,
                "⚠️ This plate is already enrolled as a subscriber!"
            )?,
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn register_entry(&mut self) -> Result<()> {
        writeln!(self.output, "\n➡️ VEHICLE ENTRY ➡️")?;
        writeln!(self.output, "-----------------------------")?;

        let Some(v) = self.collect_vehicle()? else {
            return Ok(());
        };

        let now = (self.clock)();
        match self.ledger.check_in(&v.name, &v.plate, &v.model, &v.color, now) {
            Ok(outcome) => {
                let tag = match outcome.arrival {
                    ArrivalKind::SubscriberArrival => "Monthly subscriber! 🅿️",
                    ArrivalKind::CasualArrival => "Casual customer. ⏱️",
                };
                writeln!(
                    self.output,
                    "✅ Entry of {} (plate: {}) registered. {}",
                    v.name, v.plate, tag
                )?;
            }
            Err(CheckInError::AlreadyParked(_)) => writeln!(
                self.output,
                "🚨 Whoops! This vehicle is already parked."
            )?,
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Loops on the plate until a parked vehicle is confirmed or the operator backs out.
    fn register_exit(&mut self) -> Result<()> {
        loop {
            writeln!(self.output, "\n⬅️ VEHICLE EXIT ⬅️")?;
            writeln!(self.output, "----------------------------")?;

            let Some(plate) = self.ask("🚗 Vehicle plate (or 'v' to go back): ")? else {
                return Ok(());
            };

            let parked = match self.ledger.find_parked(&plate)? {
                Some(parked) => parked,
                None => {
                    writeln!(self.output, "🤷 This vehicle is not parked here right now.")?;
                    continue;
                }
            };
            self.print_vehicle(&parked)?;

            let Some(answer) = self.read_line("Confirm exit of this vehicle? (y/n): ")? else {
                return Ok(());
            };

            match answer.to_lowercase().as_str() {
                "y" => return self.confirm_exit(&plate),
                "n" => writeln!(
                    self.output,
                    "❌ Exit not confirmed. Please try again with the right details."
                )?,
                _ => writeln!(self.output, "Invalid option. Type 'y' for yes or 'n' for no.")?,
            }
        }
    }

    fn confirm_exit(&mut self, plate: &str) -> Result<()> {
        let now = (self.clock)();
        match self.ledger.check_out(plate, now) {
            Ok(outcome) => {
                match outcome.status {
                    BillingStatus::Subscriber => writeln!(
                        self.output,
                        "🥳 Monthly subscriber! Nothing to pay. Drive safely! 👋"
                    )?,
                    BillingStatus::Casual => writeln!(
                        self.output,
                        "💸 Casual customer! Time: {:.2}h. Amount due: R$ {:.2}",
                        outcome.elapsed_hours, outcome.amount_paid
                    )?,
                }
                writeln!(self.output, "📋 Exit recorded in history. Thank you! ✨")?;
                writeln!(self.output, "✅ Vehicle {} has left! Spot is free. 🚀", plate)?;
            }
            Err(CheckOutError::NotParked(_)) => {
                writeln!(self.output, "🤷 This vehicle is not parked here right now.")?;
            }
            Err(e @ CheckOutError::HistoryWriteFailed { .. }) => {
                writeln!(
                    self.output,
                    "🚨 Error recording the exit: {}. The vehicle is still parked.",
                    e
                )?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn show_occupancy(&mut self) -> Result<()> {
        let total = self.ledger.count_parked()?;
        writeln!(self.output, "\n🅿️ OCCUPIED SPOTS: {} vehicles. 🚗💨", total)?;
        Ok(())
    }

    fn print_vehicle(&mut self, parked: &ParkedVehicle) -> Result<()> {
        let entry = parked.entry_timestamp.with_timezone(&Local);
        writeln!(self.output, "\n--- VEHICLE DETAILS FOR EXIT ---")?;
        writeln!(self.output, "Name: {}", parked.vehicle.name)?;
        writeln!(self.output, "Plate: {}", parked.vehicle.plate)?;
        writeln!(self.output, "Model: {}", parked.vehicle.model)?;
        writeln!(self.output, "Color: {}", parked.vehicle.color)?;
        writeln!(self.output, "Entry: {}", entry.format("%Y-%m-%d %H:%M:%S"))?;
        Ok(())
    }
}
