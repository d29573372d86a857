use alloc::vec::Vec;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    #[default]
    Idle,
    Active,
    Resolved {
        won: bool,
    },
}

impl RoundPhase {
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RevealOutcome {
    /// Cell was already open or flagged.
    NoChange,
    Safe {
        multiplier: f64,
        safe_count: CellCount,
    },
    Bust,
    /// Last safe cell found, round paid out.
    AutoWin {
        payout: Amount,
    },
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }

    pub const fn ends_round(self) -> bool {
        matches!(self, Self::Bust | Self::AutoWin { .. })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlagOutcome {
    NoChange,
    Flagged,
    Unflagged,
}

/// State of the round in play, or of the last one until reset.
#[derive(Clone, Debug, PartialEq)]
struct Round {
    layout: BombLayout,
    odds: Odds,
    board: Array2<CellState>,
    safe_count: CellCount,
    stake: Amount,
    multiplier: f64,
    payout: Option<Amount>,
}

impl Round {
    fn new(layout: BombLayout, odds: Odds, stake: Amount) -> Self {
        Self {
            board: Array2::default(layout.grid().dim()),
            layout,
            odds,
            safe_count: 0,
            stake,
            multiplier: 1.0,
            payout: None,
        }
    }

    fn grid(&self) -> Grid {
        self.layout.grid()
    }

    fn cell(&self, index: CellIndex) -> CellState {
        self.board[self.grid().nd_index(index)]
    }

    fn set_cell(&mut self, index: CellIndex, state: CellState) {
        let nd_index = self.grid().nd_index(index);
        self.board[nd_index] = state;
    }

    fn all_safe_found(&self) -> bool {
        self.safe_count == self.odds.safe_cells()
    }

    /// Exact amount a cashout pays right now. Stakes are checked at start so that even a
    /// full clear fits.
    fn cashout_value(&self, edge: HouseEdge) -> Amount {
        self.odds
            .payout(self.stake, self.safe_count, edge)
            .unwrap_or(Amount::MAX)
    }
}

/// Read-only snapshot for rendering a HUD and board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub phase: RoundPhase,
    pub grid: Option<Grid>,
    pub cells: Vec<CellState>,
    pub bomb_count: CellCount,
    pub stake: Amount,
    pub safe_count: CellCount,
    pub multiplier: f64,
    /// What a cashout would pay right now.
    pub cashout_value: Amount,
    /// Multiplier after one more safe reveal, if any safe cell is left.
    pub next_multiplier: Option<f64>,
    /// Bombs, once the round is resolved.
    pub layout: Option<Vec<CellIndex>>,
    pub payout: Option<Amount>,
}

/// One Mines table: a wallet, a layout source, and at most one round at a time.
///
/// Every intent takes `&mut self`, so transitions never interleave. Intents that do not
/// fit the current phase are rejected with an error and leave the game unchanged.
#[derive(Debug)]
pub struct MinesGame<W, F> {
    table: TableConfig,
    wallet: W,
    fairness: F,
    events: EventBus,
    phase: RoundPhase,
    round: Option<Round>,
}

impl<W: Wallet, F: FairnessSource> MinesGame<W, F> {
    pub fn new(table: TableConfig, wallet: W, fairness: F) -> core::result::Result<Self, ConfigError> {
        table.validate()?;
        Ok(Self {
            table,
            wallet,
            fairness,
            events: EventBus::default(),
            phase: RoundPhase::Idle,
            round: None,
        })
    }

    pub fn table(&self) -> &TableConfig {
        &self.table
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn fairness(&self) -> &F {
        &self.fairness
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn subscribe(&mut self, sink: impl EventSink + 'static) -> SubscriberId {
        self.events.subscribe(sink)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn stake(&self) -> Amount {
        self.round.as_ref().map_or(0, |round| round.stake)
    }

    pub fn safe_count(&self) -> CellCount {
        self.round.as_ref().map_or(0, |round| round.safe_count)
    }

    pub fn multiplier(&self) -> f64 {
        self.round.as_ref().map_or(1.0, |round| round.multiplier)
    }

    pub fn cell(&self, index: CellIndex) -> Option<CellState> {
        let round = self.round.as_ref()?;
        round.grid().contains(index).then(|| round.cell(index))
    }

    /// Bomb positions, only once the round is over.
    pub fn revealed_layout(&self) -> Option<&BombLayout> {
        match (self.phase, &self.round) {
            (RoundPhase::Resolved { .. }, Some(round)) => Some(&round.layout),
            _ => None,
        }
    }

    /// Debits `stake` and deals a fresh layout. Refused while a round is active, and
    /// refused without side effects if the table rules, the layout source or the wallet
    /// say no.
    pub fn start_round(&mut self, stake: Amount, bombs: CellCount, grid: Grid) -> Result<()> {
        if self.phase.is_active() {
            return reject("start", RoundError::RoundInProgress);
        }
        let odds = self.table.check_round(stake, grid, bombs)?;

        let SampledLayout { layout, commitment } = self.fairness.sample(grid, bombs)?;
        self.wallet.debit(stake).inspect_err(|err| {
            log::info!("Round refused by wallet: {err}");
        })?;
        self.fairness.advance();

        self.round = Some(Round::new(layout, odds, stake));
        self.phase = RoundPhase::Active;
        log::info!("Round started: stake {stake}, {bombs} bombs on {grid:?}");

        self.events.publish(RoundEvent::LayoutReady {
            grid,
            bomb_count: bombs,
            commitment,
        });
        self.events.publish(RoundEvent::RoundStarted {
            stake,
            grid,
            bomb_count: bombs,
        });
        Ok(())
    }

    /// [`MinesGame::start_round`] on the table's default board.
    pub fn start_default_round(&mut self, stake: Amount) -> Result<()> {
        let (grid, bombs) = (self.table.grid, self.table.bombs);
        self.start_round(stake, bombs, grid)
    }

    pub fn reveal(&mut self, index: CellIndex) -> Result<RevealOutcome> {
        let edge = self.table.house_edge;
        let Some(round) = self.round.as_mut().filter(|_| self.phase.is_active()) else {
            return reject("reveal", RoundError::NotActive);
        };
        if !round.grid().contains(index) {
            return reject("reveal", RoundError::InvalidCell(index));
        }
        if round.cell(index) != CellState::Hidden {
            log::debug!("reveal({index}) ignored, cell is {:?}", round.cell(index));
            return Ok(RevealOutcome::NoChange);
        }

        if round.layout.contains_bomb(index) {
            self.phase = RoundPhase::Resolved { won: false };
            log::info!("Bust on cell {index}, stake {} lost", round.stake);
            self.events.publish(RoundEvent::Bust {
                index,
                layout: round.layout.indices(),
            });
            return Ok(RevealOutcome::Bust);
        }

        round.set_cell(index, CellState::Safe);
        round.safe_count += 1;
        round.multiplier = round
            .odds
            .payout_multiplier(round.safe_count, edge)
            .unwrap_or(round.multiplier);
        let (multiplier, safe_count) = (round.multiplier, round.safe_count);
        self.events.publish(RoundEvent::CellRevealedSafe {
            index,
            multiplier,
            safe_count,
        });

        if round.all_safe_found() {
            let payout = self.settle_win();
            if let Some(round) = &self.round {
                self.events.publish(RoundEvent::AutoWin {
                    payout,
                    layout: round.layout.indices(),
                });
            }
            return Ok(RevealOutcome::AutoWin { payout });
        }

        Ok(RevealOutcome::Safe {
            multiplier,
            safe_count,
        })
    }

    /// Cosmetic marker; never affects the outcome.
    pub fn toggle_flag(&mut self, index: CellIndex) -> Result<FlagOutcome> {
        let Some(round) = self.round.as_mut().filter(|_| self.phase.is_active()) else {
            return reject("flag", RoundError::NotActive);
        };
        if !round.grid().contains(index) {
            return reject("flag", RoundError::InvalidCell(index));
        }

        let (next, outcome) = match round.cell(index) {
            CellState::Hidden => (CellState::Flagged, FlagOutcome::Flagged),
            CellState::Flagged => (CellState::Hidden, FlagOutcome::Unflagged),
            CellState::Safe => return Ok(FlagOutcome::NoChange),
        };
        round.set_cell(index, next);
        self.events.publish(RoundEvent::CellFlagged {
            index,
            flagged: next == CellState::Flagged,
        });
        Ok(outcome)
    }

    /// Pays `stake * multiplier` and ends the round. Needs at least one safe reveal.
    pub fn cash_out(&mut self) -> Result<Amount> {
        let Some(round) = self.round.as_ref().filter(|_| self.phase.is_active()) else {
            return reject("cashout", RoundError::NotActive);
        };
        if round.safe_count == 0 {
            return reject("cashout", RoundError::NothingToCashOut);
        }

        let payout = self.settle_win();
        if let Some(round) = &self.round {
            self.events.publish(RoundEvent::CashedOut {
                payout,
                layout: round.layout.indices(),
            });
        }
        Ok(payout)
    }

    /// Rotates the layout source's seeds for upcoming rounds and clears the board.
    /// Returns the retired seeds so the rounds played with them can be verified.
    pub fn reroll(&mut self, material: SeedMaterial) -> Result<Option<Seeds>> {
        if self.phase.is_active() {
            return reject("reroll", RoundError::RoundInProgress);
        }
        let retired = self.fairness.reseed(material);
        self.clear();
        Ok(retired)
    }

    /// Puts a resolved round away.
    pub fn reset(&mut self) -> Result<()> {
        if self.phase.is_active() {
            return reject("reset", RoundError::RoundInProgress);
        }
        self.clear();
        Ok(())
    }

    pub fn view(&self) -> RoundView {
        let Some(round) = &self.round else {
            return RoundView {
                phase: self.phase,
                grid: None,
                cells: Vec::new(),
                bomb_count: 0,
                stake: 0,
                safe_count: 0,
                multiplier: 1.0,
                cashout_value: 0,
                next_multiplier: None,
                layout: None,
                payout: None,
            };
        };

        let active = self.phase.is_active();
        let cashout_value = if active && round.safe_count > 0 {
            round.cashout_value(self.table.house_edge)
        } else {
            0
        };
        let next_multiplier = if active {
            round
                .odds
                .payout_multiplier(round.safe_count + 1, self.table.house_edge)
        } else {
            None
        };

        RoundView {
            phase: self.phase,
            grid: Some(round.grid()),
            cells: round.board.iter().copied().collect(),
            bomb_count: round.odds.bombs(),
            stake: round.stake,
            safe_count: round.safe_count,
            multiplier: round.multiplier,
            cashout_value,
            next_multiplier,
            layout: self.revealed_layout().map(BombLayout::indices),
            payout: round.payout,
        }
    }

    fn settle_win(&mut self) -> Amount {
        let Some(round) = self.round.as_mut() else {
            return 0;
        };
        let amount = round.cashout_value(self.table.house_edge);
        round.payout = Some(amount);
        self.wallet.credit(amount);
        self.phase = RoundPhase::Resolved { won: true };
        log::info!(
            "Round won: {} safe cells at {:.4}x, paid {amount}",
            round.safe_count,
            round.multiplier
        );
        amount
    }

    fn clear(&mut self) {
        self.round = None;
        self.phase = RoundPhase::Idle;
    }
}

fn reject<T>(intent: &str, err: RoundError) -> Result<T> {
    log::debug!("{intent} rejected: {err}");
    Err(err)
}
