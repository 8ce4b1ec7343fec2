use anyhow::{Context, Result};
use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use tracing_subscriber::EnvFilter;

use parking_ledger::{Command, Config, Ledger, Shell, VERSION};

fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_args(env::args().skip(1))?;
    tracing::debug!(?config, version = VERSION, "starting parking-ledger");

    let mut ledger = Ledger::open(&config.db_path)?;

    match config.command {
        Command::Shell => run_shell(&mut ledger)?,
        Command::Board => run_board(&ledger)?,
        Command::Count => {
            let total = ledger.count_parked()?;
            println!("🅿️  Occupied spots: {}", total);
        }
        Command::Export(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let rows = ledger.export_history(BufWriter::new(file))?;
            println!("✓ Exported {} exit records to {}", rows, path.display());
        }
    }

    Ok(())
}

/// Diagnostics go to stderr so they never interleave with the menu
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_shell(ledger: &mut Ledger) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    Shell::new(ledger, stdin.lock(), stdout.lock()).run()
}

#[cfg(feature = "tui")]
fn run_board(ledger: &Ledger) -> Result<()> {
    parking_ledger::ui::run_ui(ledger)
}

#[cfg(not(feature = "tui"))]
fn run_board(_ledger: &Ledger) -> Result<()> {
    eprintln!("❌ Board mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    std::process::exit(1);
}
