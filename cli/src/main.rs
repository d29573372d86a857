use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use minefair_core::{Amount, CellCount, Coord, Grid, TableConfig};
use tracing_subscriber::filter::LevelFilter;

mod board;
mod play;
mod simulate;
mod verify;

#[derive(Parser, Debug)]
#[command(version, about = "Provably fair Mines table", long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    /// Table rules as TOML, defaults apply to missing fields
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recompute the layout a set of revealed seeds produced
    Verify(verify::VerifyArgs),
    /// Estimate return to player for a fixed reveal strategy
    Simulate(simulate::SimulateArgs),
    /// Play rounds in the terminal against an in-process host
    Play(play::PlayArgs),
}

/// Board options shared by every subcommand; unset values come from the table config.
#[derive(clap::Args, Debug, Clone, Copy)]
struct BoardArgs {
    /// Rows and columns of a square board
    #[arg(short, long)]
    size: Option<Coord>,

    /// Number of bombs
    #[arg(short, long)]
    bombs: Option<CellCount>,
}

impl BoardArgs {
    fn resolve(self, table: &TableConfig) -> Result<(Grid, CellCount)> {
        let grid = match self.size {
            Some(size) => Grid::square(size)?,
            None => table.grid,
        };
        Ok((grid, self.bombs.unwrap_or(table.bombs)))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.verbose);

    let table = match &args.config {
        Some(path) => load_table(path)?,
        None => TableConfig::default(),
    };
    log::debug!("table: {table:?}");

    match args.command {
        Command::Verify(command) => verify::run(command, &table),
        Command::Simulate(command) => simulate::run(command, &table),
        Command::Play(command) => play::run(command, table),
    }
}

fn init_logging(verbose: &clap_verbosity_flag::Verbosity) {
    let level = match verbose.log_level_filter() {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_table(path: &Path) -> Result<TableConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read config file {}", path.display()))?;
    let table: TableConfig = toml::from_str(&contents)
        .with_context(|| format!("Could not parse config file {}", path.display()))?;
    table.validate().context("Invalid table config")?;
    Ok(table)
}

fn format_amount(amount: Amount) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('_');
        }
        out.push(digit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn amounts_are_grouped() {
        assert_eq!(format_amount(7), "7");
        assert_eq!(format_amount(2_017), "2_017");
        assert_eq!(format_amount(1_000_000), "1_000_000");
    }

    #[test]
    fn table_from_toml() {
        let table: TableConfig = toml::from_str(
            r#"
            house_edge = 0.01
            min_stake = 10
            bombs = 3
            grid = { rows = 4, cols = 4 }
            "#,
        )
        .unwrap();

        assert!(table.validate().is_ok());
        assert_eq!(table.grid, Grid::square(4).unwrap());
        assert_eq!(table.bombs, 3);
        assert_eq!(table.house_edge.ppm(), 10_000);
        assert_eq!(table.max_stake, Amount::MAX);
        assert!(toml::from_str::<TableConfig>("house_edge = 2.0").is_err());
        assert!(toml::from_str::<TableConfig>("jackpot = 1").is_err());
    }
}
