use anyhow::{Context, Result, bail};
use minefair_core::{
    Amount, CellCount, CellIndex, FairnessSource, MemoryWallet, MinesGame, RevealOutcome,
    SecureSource, TableConfig, Wallet,
};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;

use crate::{BoardArgs, format_amount};

#[derive(clap::Args, Debug)]
pub struct SimulateArgs {
    /// Rounds to play
    #[arg(short = 'n', long, default_value_t = 100_000)]
    rounds: u64,

    /// Safe reveals before cashing out
    #[arg(short = 'k', long, default_value_t = 3)]
    reveals: CellCount,

    #[arg(long, default_value_t = 100)]
    stake: Amount,

    /// Seed both the layouts and the reveal order, for repeatable runs
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    board: BoardArgs,
}

/// Totals over a simulated session.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Report {
    pub rounds: u64,
    pub wins: u64,
    pub staked: u128,
    pub paid: u128,
}

impl Report {
    pub fn return_to_player(&self) -> f64 {
        if self.staked == 0 {
            return 0.0;
        }
        self.paid as f64 / self.staked as f64
    }

    pub fn win_rate(&self) -> f64 {
        if self.rounds == 0 {
            return 0.0;
        }
        self.wins as f64 / self.rounds as f64
    }
}

pub fn run(args: SimulateArgs, table: &TableConfig) -> Result<()> {
    let (grid, bombs) = args.board.resolve(table)?;
    let odds = table.check_round(args.stake, grid, bombs)?;
    if args.reveals == 0 || args.reveals > odds.safe_cells() {
        bail!(
            "Reveals must be between 1 and {} on this board",
            odds.safe_cells()
        );
    }

    let strategy = match args.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };
    let report = match args.seed {
        Some(seed) => {
            let source = SecureSource::with_entropy(ChaCha20Rng::seed_from_u64(!seed));
            simulate(table, source, strategy, &args, grid, bombs)?
        }
        None => simulate(table, SecureSource::new(), strategy, &args, grid, bombs)?,
    };

    let survival = odds.survival_probability(args.reveals).unwrap_or(0.0);
    let multiplier = odds
        .payout_multiplier(args.reveals, table.house_edge)
        .unwrap_or(1.0);
    println!(
        "{} rounds, {bombs} bombs on {}x{}, cash out after {} safe reveals",
        format_amount(report.rounds),
        grid.rows(),
        grid.cols(),
        args.reveals
    );
    println!("win rate   {:.4} (expected {survival:.4})", report.win_rate());
    println!(
        "rtp        {:.4} (expected {:.4})",
        report.return_to_player(),
        survival * multiplier
    );
    println!("staked {} paid {}", report.staked, report.paid);
    Ok(())
}

fn simulate<F: FairnessSource>(
    table: &TableConfig,
    source: F,
    mut strategy: ChaCha20Rng,
    args: &SimulateArgs,
    grid: minefair_core::Grid,
    bombs: CellCount,
) -> Result<Report> {
    let mut game = MinesGame::new(table.clone(), Bankroll::default(), source)?;
    let mut order: Vec<CellIndex> = (0..grid.total_cells()).collect();
    let mut report = Report::default();

    for round in 0..args.rounds {
        game.start_round(args.stake, bombs, grid)
            .with_context(|| format!("Round {round} did not start"))?;
        report.rounds += 1;
        report.staked += u128::from(args.stake);

        order.shuffle(&mut strategy);
        for &index in &order {
            match game.reveal(index)? {
                RevealOutcome::Bust => break,
                RevealOutcome::AutoWin { payout } => {
                    report.wins += 1;
                    report.paid += u128::from(payout);
                    break;
                }
                RevealOutcome::Safe { safe_count, .. } if safe_count >= args.reveals => {
                    report.wins += 1;
                    report.paid += u128::from(game.cash_out()?);
                    break;
                }
                RevealOutcome::Safe { .. } | RevealOutcome::NoChange => {}
            }
        }
    }
    log::debug!("bankroll topped up by {}", game.wallet().topped_up);
    Ok(report)
}

/// Wallet that never runs dry, so a long session measures the game rather than ruin.
#[derive(Debug, Default)]
struct Bankroll {
    wallet: MemoryWallet,
    topped_up: Amount,
}

impl Wallet for Bankroll {
    fn debit(&mut self, amount: Amount) -> Result<(), minefair_core::WalletError> {
        if self.wallet.balance() < amount {
            self.wallet.credit(amount);
            self.topped_up = self.topped_up.saturating_add(amount);
        }
        self.wallet.debit(amount)
    }

    fn credit(&mut self, amount: Amount) {
        self.wallet.credit(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(rounds: u64, reveals: CellCount) -> SimulateArgs {
        SimulateArgs {
            rounds,
            reveals,
            stake: 100,
            seed: Some(1),
            board: BoardArgs {
                size: Some(5),
                bombs: Some(5),
            },
        }
    }

    fn run_seeded(table: &TableConfig, args: &SimulateArgs) -> Report {
        let grid = minefair_core::Grid::square(5).unwrap();
        let source = SecureSource::with_entropy(ChaCha20Rng::seed_from_u64(11));
        simulate(table, source, ChaCha20Rng::seed_from_u64(12), args, grid, 5).unwrap()
    }

    #[test]
    fn fair_table_returns_the_stake_on_average() {
        let report = run_seeded(&TableConfig::default(), &args(20_000, 1));

        // one reveal at 5 bombs wins 80% of the time and pays 1.25x
        assert_eq!(report.staked, 2_000_000);
        assert!((report.win_rate() - 0.8).abs() < 0.02);
        assert!((report.return_to_player() - 1.0).abs() < 0.025);
    }

    #[test]
    fn edge_shows_up_in_the_return() {
        let table = TableConfig {
            house_edge: minefair_core::HouseEdge::from_percent(4.0).unwrap(),
            ..Default::default()
        };
        let report = run_seeded(&table, &args(20_000, 1));

        assert!((report.return_to_player() - 0.96).abs() < 0.025);
    }

    #[test]
    fn same_seed_same_session() {
        let first = run_seeded(&TableConfig::default(), &args(500, 4));
        let second = run_seeded(&TableConfig::default(), &args(500, 4));
        assert_eq!(first, second);
    }
}
