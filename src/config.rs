// ⚙️ Runtime configuration - parsed from the command line
//
// parking-ledger [--db PATH] [shell|board|count|export FILE]

use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "parking.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive operator menu (default)
    Shell,
    /// Full-screen occupancy board
    Board,
    /// Print the number of parked vehicles and exit
    Count,
    /// Write exit history as CSV to the given file
    Export(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub command: Command,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            command: Command::Shell,
        }
    }
}

impl Config {
    /// Parse arguments, excluding the program name.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut command: Option<Command> = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let path = args.next().ok_or_else(|| anyhow!("--db needs a path"))?;
                    config.db_path = PathBuf::from(path);
                }
                "shell" | "board" | "count" | "export" if command.is_some() => {
                    bail!("only one command may be given (got '{}')", arg);
                }
                "shell" => command = Some(Command::Shell),
                "board" => command = Some(Command::Board),
                "count" => command = Some(Command::Count),
                "export" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow!("export needs an output file"))?;
                    command = Some(Command::Export(PathBuf::from(path)));
                }
                other => bail!("unknown argument '{}'", other),
            }
        }

        if let Some(command) = command {
            config.command = command;
        }
        Ok(config)
    }
}
