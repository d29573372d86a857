use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use minefair_core::{
    Amount, CellCount, CellIndex, EventLog, FlagOutcome, Grid, MinesGame, RevealOutcome,
    RoundError, RoundEvent, SeedMaterial, SeededSource, TableConfig,
};
use minefair_protocol::{Channel, HostNotifier, LoopbackHost, RemoteWallet};

use crate::{BoardArgs, board, format_amount};

#[derive(clap::Args, Debug)]
pub struct PlayArgs {
    /// Starting balance held by the host
    #[arg(long, default_value_t = 1_000)]
    balance: Amount,

    /// Default stake for `start`
    #[arg(long, default_value_t = 10)]
    stake: Amount,

    /// Client seed mixed into every layout
    #[arg(long, default_value = "player")]
    client_seed: String,

    /// Server seed, random unless given
    #[arg(long)]
    server_seed: Option<String>,

    #[command(flatten)]
    board: BoardArgs,
}

const HELP: &str = "\
commands:
  start [stake] [bombs]   debit the stake and deal a new board
  r <index> | r <row> <col>
                          reveal a cell
  f <index> | f <row> <col>
                          toggle a flag
  c                       cash out
  v                       show the board
  b                       ask the host for the balance
  reroll [client seed]    rotate seeds and reveal the old server seed
  q                       quit";

type Game = MinesGame<RemoteWallet<LoopbackHost>, SeededSource>;

pub fn run(args: PlayArgs, table: TableConfig) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    Session::new(args, table)?.run(stdin.lock(), stdout.lock())
}

struct Session {
    game: Game,
    events: EventLog,
    stake: Amount,
    grid: Grid,
    bombs: CellCount,
}

impl Session {
    fn new(args: PlayArgs, table: TableConfig) -> Result<Self> {
        let (grid, bombs) = args.board.resolve(&table)?;
        let material = match args.server_seed {
            Some(server_seed) => SeedMaterial::new(server_seed, args.client_seed),
            None => SeedMaterial::generate(args.client_seed)?,
        };

        let channel = Channel::shared(LoopbackHost::new(args.balance));
        let mut game = MinesGame::new(
            table,
            RemoteWallet::new(channel.clone()),
            SeededSource::new(material),
        )?;
        let events = EventLog::new();
        game.subscribe(events.clone());
        game.subscribe(HostNotifier::new(channel));

        Ok(Self {
            game,
            events,
            stake: args.stake,
            grid,
            bombs,
        })
    }

    fn run(mut self, input: impl BufRead, mut out: impl Write) -> Result<()> {
        writeln!(out, "{HELP}")?;
        writeln!(
            out,
            "server seed commitment {}",
            self.game.fairness().commitment().server_seed_hash
        )?;
        self.print_balance(&mut out)?;

        for line in input.lines() {
            let line = line.context("Could not read input")?;
            let words: Vec<&str> = line.split_whitespace().collect();
            let Some((&command, rest)) = words.split_first() else {
                continue;
            };
            if matches!(command, "q" | "quit" | "exit") {
                break;
            }
            match self.command(command, rest, &mut out) {
                Ok(()) => {}
                Err(err) => match err.downcast_ref::<RoundError>() {
                    Some(round) if round.is_fatal() => return Err(err),
                    _ => writeln!(out, "! {err:#}")?,
                },
            }
            self.print_events(&mut out)?;
        }
        Ok(())
    }

    fn command(&mut self, command: &str, rest: &[&str], out: &mut impl Write) -> Result<()> {
        match command {
            "start" | "s" => {
                let stake = parse_or(rest.first(), self.stake)?;
                let bombs = parse_or(rest.get(1), self.bombs)?;
                self.game.start_round(stake, bombs, self.grid)?;
            }
            "r" | "reveal" => {
                let index = self.parse_cell(rest)?;
                if self.game.reveal(index)? == RevealOutcome::NoChange {
                    writeln!(out, "cell {index} is not hidden")?;
                }
            }
            "f" | "flag" => {
                let index = self.parse_cell(rest)?;
                if self.game.toggle_flag(index)? == FlagOutcome::NoChange {
                    writeln!(out, "cell {index} is already open")?;
                }
            }
            "c" | "cashout" => {
                self.game.cash_out()?;
            }
            "v" | "view" => self.print_view(out)?,
            "b" | "balance" => self.print_balance(out)?,
            "reroll" => {
                let client_seed = match rest.first() {
                    Some(seed) => seed.to_string(),
                    None => self.game.fairness().client_seed().to_string(),
                };
                let next = SeedMaterial::generate(client_seed)?;
                if let Some(retired) = self.game.reroll(next)? {
                    writeln!(
                        out,
                        "retired server seed {} (client {}, {} rounds)",
                        retired.server_seed, retired.client_seed, retired.nonce
                    )?;
                }
                writeln!(
                    out,
                    "new commitment {}",
                    self.game.fairness().commitment().server_seed_hash
                )?;
            }
            "help" | "?" => writeln!(out, "{HELP}")?,
            other => bail!("Unknown command {other:?}, try help"),
        }
        Ok(())
    }

    fn parse_cell(&self, rest: &[&str]) -> Result<CellIndex> {
        let grid = self.game.view().grid.unwrap_or(self.grid);
        match rest {
            [index] => Ok(index.parse().context("Cell index must be a number")?),
            [row, col] => {
                let row = row.parse().context("Row must be a number")?;
                let col = col.parse().context("Column must be a number")?;
                grid.index_of((row, col))
                    .with_context(|| format!("({row}, {col}) is off the board"))
            }
            _ => bail!("Expected a cell index or a row and column"),
        }
    }

    fn print_events(&self, out: &mut impl Write) -> Result<()> {
        let events = self.events.take();
        for event in &events {
            match event {
                RoundEvent::LayoutReady { commitment, .. } => {
                    if let Some(commitment) = commitment {
                        writeln!(out, "round #{} committed", commitment.nonce)?;
                    }
                }
                RoundEvent::RoundStarted {
                    stake, bomb_count, ..
                } => writeln!(out, "staked {} against {bomb_count} bombs", format_amount(*stake))?,
                RoundEvent::CellRevealedSafe {
                    index, multiplier, ..
                } => writeln!(out, "cell {index} safe, {multiplier:.4}x")?,
                RoundEvent::CellFlagged { index, flagged } => {
                    writeln!(out, "cell {index} {}", if *flagged { "flagged" } else { "unflagged" })?
                }
                RoundEvent::Bust { index, .. } => writeln!(out, "BOOM on cell {index}")?,
                RoundEvent::CashedOut { payout, .. } => {
                    writeln!(out, "cashed out {}", format_amount(*payout))?
                }
                RoundEvent::AutoWin { payout, .. } => {
                    writeln!(out, "board cleared, paid {}", format_amount(*payout))?
                }
            }
        }
        if events.iter().any(|event| !matches!(event, RoundEvent::LayoutReady { .. })) {
            self.print_view(out)?;
        }
        if events.iter().any(RoundEvent::ends_round) {
            self.print_balance(out)?;
        }
        Ok(())
    }

    fn print_view(&self, out: &mut impl Write) -> Result<()> {
        let view = self.game.view();
        match board::render_view(&view) {
            Some(board) => write!(out, "{board}")?,
            None => writeln!(out, "no round, type start")?,
        }
        if view.phase.is_active() {
            let next = view
                .next_multiplier
                .map_or_else(|| "-".to_string(), |next| format!("{next:.4}x"));
            writeln!(
                out,
                "{} safe, {:.4}x, cash out {}, next {next}",
                view.safe_count,
                view.multiplier,
                format_amount(view.cashout_value)
            )?;
        }
        Ok(())
    }

    fn print_balance(&self, out: &mut impl Write) -> Result<()> {
        let balance = self.game.wallet().balance()?;
        writeln!(out, "balance {}", format_amount(balance))?;
        Ok(())
    }

    #[cfg(test)]
    fn host_requests(&self) -> Vec<minefair_protocol::Request> {
        self.game.wallet().channel().borrow().transport().received().to_vec()
    }
}

fn parse_or<T: std::str::FromStr>(word: Option<&&str>, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match word {
        Some(word) => Ok(word.parse()?),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minefair_protocol::Request;

    fn session(balance: Amount) -> Session {
        let args = PlayArgs {
            balance,
            stake: 1_000,
            client_seed: "demo".to_string(),
            server_seed: Some("demo".to_string()),
            board: BoardArgs {
                size: Some(5),
                bombs: Some(5),
            },
        };
        Session::new(args, TableConfig::default()).unwrap()
    }

    fn play(session: Session, script: &str) -> String {
        let mut out = Vec::new();
        session.run(script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn scripted_cashout() {
        let out = play(session(10_000), "start\nr 0\nr 0 1\nr 2\nc\nq\nr 3\n");

        assert!(out.contains("staked 1_000 against 5 bombs"));
        assert!(out.contains("cell 1 safe"));
        assert!(out.contains("cashed out 2_017"));
        assert!(out.contains("balance 11_017"));
        assert!(!out.contains("cell 3"));
    }

    #[test]
    fn rejected_intents_are_reported() {
        let out = play(session(10_000), "c\nr 99\nstart\nc\nbogus\n");

        assert!(out.contains("! No round is active"));
        assert!(out.contains("! Reveal at least one safe cell before cashing out"));
        assert!(out.contains("! Unknown command \"bogus\""));
    }

    #[test]
    fn bust_reveals_the_board_and_notifies_the_host() {
        let mut session = session(1_000);
        let mut out = Vec::new();
        for line in ["start", "r 4"] {
            let words: Vec<&str> = line.split_whitespace().collect();
            session.command(words[0], &words[1..], &mut out).unwrap();
        }
        session.print_events(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("BOOM on cell 4"));
        assert!(out.contains("  0  .  .  .  .  *"));
        let names: Vec<_> = session.host_requests().iter().map(Request::name).collect();
        assert_eq!(names, ["bet", "lose", "getBalance"]);
    }
}
