//! Mines: a 5x5 board generated once per round.
//!
//! A board is never reused. Starting a new round always generates a new
//! permutation, so nothing carries over between games.

use crate::errors::ValidationError;
use crate::games::luck::LuckBoost;
use crate::games::payout::{multiplier_payout, JackpotRule};
use crate::games::random::{shuffle, RandomSource};
use crate::games::types::{Bet, OutcomeKind, Payout, Resolution, RevealedState};
use serde::{Deserialize, Serialize};

pub const BOARD_SIZE: usize = 25;
pub const MIN_MINES: usize = 1;
pub const MAX_MINES: usize = BOARD_SIZE - 1;
/// Multiplier reached when every safe tile is revealed
pub const MAX_MULTIPLIER: f64 = 3.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    Mine,
    Safe,
    Jackpot,
}

/// Player-facing cell; hidden until revealed or the round ends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CellView {
    Hidden,
    Mine,
    Safe,
    Jackpot,
}

impl From<Cell> for CellView {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Mine => CellView::Mine,
            Cell::Safe => CellView::Safe,
            Cell::Jackpot => CellView::Jackpot,
        }
    }
}

/// `1 + revealed / (25 - mines) * 2`: 1.0 with nothing revealed, 3.0 with every safe tile.
pub fn multiplier(revealed: usize, mine_count: usize) -> f64 {
    let safe = BOARD_SIZE.saturating_sub(mine_count).max(1);
    1.0 + (revealed as f64 / safe as f64) * (MAX_MULTIPLIER - 1.0)
}

pub fn validate_mine_count(count: usize, min: usize, max: usize) -> Result<(), ValidationError> {
    let min = min.max(MIN_MINES);
    let max = max.min(MAX_MINES);
    if count < min || count > max {
        return Err(ValidationError::InvalidMineCount { count, min, max });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Cell; BOARD_SIZE],
    requested_mines: usize,
    mine_count: usize,
    jackpot: Option<usize>,
}

impl Board {
    /// Generate a board.
    ///
    /// Draw order is fixed so seeded rounds replay exactly:
    /// 1. luck trial (only when the boost is active): a draw below `boost - 1`
    ///    removes one mine, never going under one;
    /// 2. Fisher-Yates over the 25 cell indices, the first N become mines;
    /// 3. jackpot trial: a raw draw below `jackpot_chance` turns the first
    ///    non-mine cell of the permutation into the jackpot.
    pub fn generate<R: RandomSource + ?Sized>(
        source: &mut R,
        requested_mines: usize,
        boost: LuckBoost,
        jackpot_chance: f64,
    ) -> Result<Self, ValidationError> {
        validate_mine_count(requested_mines, MIN_MINES, MAX_MINES)?;

        let mut mine_count = requested_mines;
        if boost.is_active() && source.draw() < boost.value() - 1.0 {
            mine_count = (mine_count - 1).max(MIN_MINES);
        }

        let mut order: [usize; BOARD_SIZE] = std::array::from_fn(|i| i);
        shuffle(source, &mut order);

        let mut cells = [Cell::Safe; BOARD_SIZE];
        for &index in &order[..mine_count] {
            cells[index] = Cell::Mine;
        }

        let jackpot = if source.draw() < jackpot_chance {
            let index = order[mine_count];
            cells[index] = Cell::Jackpot;
            Some(index)
        } else {
            None
        };

        Ok(Self {
            cells,
            requested_mines,
            mine_count,
            jackpot,
        })
    }

    pub fn cells(&self) -> &[Cell; BOARD_SIZE] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Mines the player asked for
    pub fn requested_mines(&self) -> usize {
        self.requested_mines
    }

    /// Mines actually placed (one fewer after a successful luck trial)
    pub fn mine_count(&self) -> usize {
        self.mine_count
    }

    pub fn mine_positions(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == Cell::Mine)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn jackpot_position(&self) -> Option<usize> {
        self.jackpot
    }

    pub fn safe_positions(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == Cell::Safe)
            .map(|(i, _)| i)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MinesState {
    Active,
    LostByMine,
    WonByJackpot,
    WonByCashout,
}

impl MinesState {
    pub fn is_terminal(self) -> bool {
        self != MinesState::Active
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum RevealOutcome {
    Safe { multiplier: f64 },
    Mine,
    Jackpot,
}

/// One round on one board
#[derive(Debug, Clone)]
pub struct MinesRound {
    board: Board,
    revealed: [bool; BOARD_SIZE],
    revealed_safe: usize,
    state: MinesState,
}

impl MinesRound {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            revealed: [false; BOARD_SIZE],
            revealed_safe: 0,
            state: MinesState::Active,
        }
    }

    pub fn state(&self) -> MinesState {
        self.state
    }

    pub fn revealed_safe(&self) -> usize {
        self.revealed_safe
    }

    /// Running multiplier over the mines actually placed, so clearing every
    /// safe tile pays exactly 3.0 even on a board the luck trial thinned out.
    pub fn multiplier(&self) -> f64 {
        multiplier(self.revealed_safe, self.board.mine_count())
    }

    pub fn reveal(&mut self, cell: usize) -> Result<RevealOutcome, ValidationError> {
        if self.state.is_terminal() {
            return Err(ValidationError::RoundFinished);
        }
        let content = self
            .board
            .cell(cell)
            .ok_or(ValidationError::CellOutOfRange { cell })?;
        if self.revealed[cell] {
            return Err(ValidationError::CellAlreadyRevealed { cell });
        }
        self.revealed[cell] = true;

        Ok(match content {
            Cell::Safe => {
                self.revealed_safe += 1;
                RevealOutcome::Safe {
                    multiplier: self.multiplier(),
                }
            }
            Cell::Mine => {
                self.state = MinesState::LostByMine;
                RevealOutcome::Mine
            }
            Cell::Jackpot => {
                self.state = MinesState::WonByJackpot;
                RevealOutcome::Jackpot
            }
        })
    }

    /// Bank the running multiplier
    pub fn cash_out(&mut self) -> Result<f64, ValidationError> {
        if self.state.is_terminal() {
            return Err(ValidationError::RoundFinished);
        }
        self.state = MinesState::WonByCashout;
        Ok(self.multiplier())
    }

    /// Cells as the player sees them; the whole board once the round is over
    pub fn view(&self) -> Vec<CellView> {
        let finished = self.state.is_terminal();
        self.board
            .cells()
            .iter()
            .zip(self.revealed.iter())
            .map(|(cell, shown)| {
                if finished || *shown {
                    CellView::from(*cell)
                } else {
                    CellView::Hidden
                }
            })
            .collect()
    }

    pub fn revealed_state(&self) -> RevealedState {
        RevealedState::Mines {
            cells: self.view(),
            mine_count: self.board.requested_mines(),
            revealed_safe: self.revealed_safe,
        }
    }

    /// Settlement for a finished round; `None` while still active.
    pub fn resolution(&self, bet: &Bet, jackpot: &JackpotRule) -> Option<Resolution> {
        let (outcome, payout, multiplier) = match self.state {
            MinesState::Active => return None,
            MinesState::LostByMine => (OutcomeKind::Loss, Payout::nothing(bet.currency), 0.0),
            MinesState::WonByJackpot => (OutcomeKind::Jackpot, jackpot.payout(bet), 0.0),
            MinesState::WonByCashout => {
                let m = self.multiplier();
                (OutcomeKind::Win, multiplier_payout(bet, m), m)
            }
        };
        Some(Resolution {
            outcome,
            payout,
            multiplier,
            revealed: self.revealed_state(),
            draw: None,
        })
    }
}
