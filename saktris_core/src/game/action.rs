//! Action mode: real-time play without turns.
//!
//! Each side may move whenever its cooldown has elapsed; a shared arrival
//! timer alternates sides and places queued pieces automatically, physically
//! bumping a column forward when the back row is full. Draw detection is off;
//! the game ends only by king capture, triplet push, or bump-off.

use std::time::Duration;

use arrayvec::ArrayVec;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::arrival::ArrivalMode;
use crate::board::{Piece, Side, Square};
use crate::events::GameEvent;
use crate::game::{GameOverReason, GameState, GameStatus};
use crate::settings::GameSettings;

/// How long before an auto-placement the warning event fires.
pub const ARRIVAL_WARNING_LEAD: Duration = Duration::from_secs(2);

/// Where the next automatic placement will go. Cached so the UI indicator
/// and the actual placement agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetColumn {
    pub column: u8,
    /// The back row is full there; the column will be bumped first.
    pub bump: bool,
}

/// Action-mode timers and the seeded RNG used for column tie-breaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionState {
    pub(super) cooldowns: [Duration; 2],
    pub(super) arrival_timer: Duration,
    pub(super) next_arrival_side: Side,
    pub(super) target_column: Option<TargetColumn>,
    pub(super) warned_this_cycle: bool,
    pub(super) rng: ChaCha12Rng,
}

impl ActionState {
    pub(super) fn new(settings: &GameSettings) -> Self {
        Self {
            cooldowns: [Duration::ZERO; 2],
            arrival_timer: settings.action.arrival_interval,
            next_arrival_side: Side::White,
            target_column: None,
            warned_this_cycle: false,
            rng: ChaCha12Rng::seed_from_u64(settings.rng_seed.wrapping_add(0x5EED_AC71)),
        }
    }
}

/// Picks the most central candidate column, with a random tie-break among
/// the near-central group.
fn pick_central_column(candidates: &[u8], rng: &mut ChaCha12Rng) -> Option<u8> {
    // Twice the distance from the board centre (3.5), so 1, 3, 5 or 7.
    let distance = |column: u8| (2 * column as i32 - 7).abs();

    let best = candidates.iter().copied().map(distance).min()?;
    let top: ArrayVec<u8, 8> = candidates
        .iter()
        .copied()
        .filter(|&column| distance(column) <= best + 2)
        .collect();

    Some(top[rng.gen_range(0..top.len())])
}

impl GameState {
    /// Remaining move cooldown for a side, if the game is in Action mode.
    pub fn action_cooldown(&self, side: Side) -> Option<Duration> {
        self.action.as_ref().map(|a| a.cooldowns[side.index()])
    }

    /// Time until the next automatic arrival.
    pub fn action_arrival_timer(&self) -> Option<Duration> {
        self.action.as_ref().map(|a| a.arrival_timer)
    }

    /// The side that receives the next automatic arrival.
    pub fn action_next_arrival_side(&self) -> Option<Side> {
        self.action.as_ref().map(|a| a.next_arrival_side)
    }

    /// The cached destination of the imminent auto-placement, for the UI
    /// indicator.
    pub fn action_target_column(&self) -> Option<TargetColumn> {
        self.action.as_ref().and_then(|a| a.target_column)
    }

    pub(super) fn action_side_ready(&self, side: Side) -> bool {
        self.action
            .as_ref()
            .is_some_and(|a| a.cooldowns[side.index()].is_zero())
    }

    pub(super) fn reset_action_cooldown(&mut self, side: Side) {
        let cooldown = self.settings.action.move_cooldown;
        if let Some(action) = &mut self.action {
            action.cooldowns[side.index()] = cooldown;
        }
    }

    /// Post-move processing for Action mode: just the triplet check. No
    /// draws, no clock, no turn switch.
    pub(super) fn finish_action_move(&mut self, to: Square) {
        if self.settings.triplet_clear_enabled {
            let _ = self.run_triplet_clear(to);
        }
    }

    pub(super) fn action_tick(&mut self, dt: Duration) {
        let max_cooldown = self.settings.action.move_cooldown;
        let interval = self.settings.action.arrival_interval;

        let mut cooldown_updates: ArrayVec<(Side, Duration), 2> = ArrayVec::new();
        let mut warning: Option<(Side, Duration)> = None;
        let mut fire: Option<Side> = None;

        {
            let Some(action) = &mut self.action else {
                return;
            };

            for side in [Side::White, Side::Black] {
                let index = side.index();
                if !action.cooldowns[index].is_zero() {
                    action.cooldowns[index] = action.cooldowns[index].saturating_sub(dt);
                    cooldown_updates.push((side, action.cooldowns[index]));
                }
            }

            action.arrival_timer = action.arrival_timer.saturating_sub(dt);
            let upcoming = action.next_arrival_side;

            if !action.warned_this_cycle
                && !action.arrival_timer.is_zero()
                && action.arrival_timer <= ARRIVAL_WARNING_LEAD
            {
                action.warned_this_cycle = true;
                warning = Some((upcoming, action.arrival_timer));
            }

            if action.arrival_timer.is_zero() {
                fire = Some(upcoming);
            }
        }

        for (side, remaining) in cooldown_updates {
            self.emit(GameEvent::ActionCooldownUpdated {
                side,
                remaining,
                max: max_cooldown,
            });
        }

        if let Some((side, remaining)) = warning {
            self.compute_action_target(side);
            self.emit(GameEvent::ActionArrivalWarning {
                side,
                seconds: remaining.as_secs_f32(),
            });
        }

        if let Some(side) = fire {
            self.action_auto_place(side);
            if let Some(action) = &mut self.action {
                action.arrival_timer = interval;
                action.warned_this_cycle = false;
                action.target_column = None;
                action.next_arrival_side = side.flip();
            }
        }
    }

    /// Makes sure `side` has a current piece, queueing (or in Selectable
    /// mode, auto-drawing) the next one if needed.
    fn ensure_action_current_piece(&mut self, side: Side) {
        if self.arrivals.current_piece(side).is_some() {
            return;
        }

        match self.arrivals.mode() {
            ArrivalMode::Selectable => {
                // No pause for a manual pick in real time; draw at random.
                let _ = self.arrivals.queue_next_piece(side);
                let pool_len = self.arrivals.pool(side).len();
                if pool_len == 0 {
                    return;
                }
                let index = match &mut self.action {
                    Some(action) => action.rng.gen_range(0..pool_len),
                    None => 0,
                };
                let kind = self.arrivals.pool(side)[index];
                if self.arrivals.select_from_pool(side, kind).is_ok() {
                    self.emit(GameEvent::PieceArrived { side, piece: kind });
                }
            }
            _ => {
                if let Some(kind) = self.arrivals.queue_next_piece(side) {
                    self.emit(GameEvent::PieceArrived { side, piece: kind });
                }
            }
        }
    }

    /// Computes and caches where the next auto-placement for `side` will go:
    /// the most central column where the piece may be placed, or -- when the
    /// back row is full -- the most central bumpable column.
    pub(super) fn compute_action_target(&mut self, side: Side) {
        self.ensure_action_current_piece(side);

        let Some(kind) = self.arrivals.current_piece(side) else {
            // Queue exhausted; nothing more will arrive.
            if let Some(action) = &mut self.action {
                action.target_column = None;
            }
            return;
        };
        let piece = Piece::new(side, kind);

        let mut placeable: ArrayVec<u8, 8> = ArrayVec::new();
        let mut bumpable: ArrayVec<u8, 8> = ArrayVec::new();

        for column in 0..8u8 {
            let Some(square) = Square::on_back_row(side, column) else {
                continue;
            };

            // The bishop color constraint holds whether or not the square
            // needs a bump to free it.
            if piece.is_bishop() {
                if let Some(first) = self.board.first_bishop_parity(side) {
                    if square.parity() == first {
                        continue;
                    }
                }
            }

            if self.board.piece_at(square).is_none() {
                placeable.push(column);
            } else {
                bumpable.push(column);
            }
        }

        let (candidates, bump) = if placeable.is_empty() {
            (bumpable, true)
        } else {
            (placeable, false)
        };

        let Some(action) = &mut self.action else {
            return;
        };
        action.target_column =
            pick_central_column(&candidates, &mut action.rng).map(|column| TargetColumn { column, bump });
    }

    /// Performs the automatic placement for `side`, bumping the target
    /// column first if it was computed as full.
    pub(super) fn action_auto_place(&mut self, side: Side) {
        if self.status.is_terminal() {
            return;
        }

        if self.action.as_ref().is_some_and(|a| a.target_column.is_none()) {
            self.compute_action_target(side);
        }

        let Some(target) = self.action.as_ref().and_then(|a| a.target_column) else {
            return;
        };
        let Some(kind) = self.arrivals.current_piece(side) else {
            return;
        };
        let piece = Piece::new(side, kind);
        let Some(square) = Square::on_back_row(side, target.column) else {
            return;
        };

        if target.bump && self.bump_column(target.column, side) {
            return;
        }

        if self.board.place_piece(square, piece).is_ok() {
            self.arrivals.piece_placed(side);
            self.touch.touch(square);
            self.emit(GameEvent::ActionPieceAutoPlaced {
                side,
                column: target.column,
                piece: kind,
            });
            if self.settings.triplet_clear_enabled {
                let _ = self.run_triplet_clear(square);
            }
        } else if let Some(action) = &mut self.action {
            // An intervening move invalidated the cached column; skip this
            // cycle and recompute on the next one.
            action.target_column = None;
        }
    }

    /// Shifts every piece in `column` one rank away from `side`'s back row,
    /// starting from the farthest piece. A piece pushed past the far rank is
    /// captured; a captured king ends the game. Returns true when the game
    /// ended.
    pub(super) fn bump_column(&mut self, column: u8, side: Side) -> bool {
        let forward = side.forward();

        // The shift invalidates any double-push bookkeeping.
        self.board.set_en_passant_target(None);

        let mut ranks: ArrayVec<u8, 8> = (0..8u8)
            .filter(|&rank| {
                self.board
                    .piece_at(Square::new_unchecked(column, rank))
                    .is_some()
            })
            .collect();
        if forward > 0 {
            ranks.sort_unstable_by(|a, b| b.cmp(a));
        } else {
            ranks.sort_unstable();
        }

        for rank in ranks {
            let square = Square::new_unchecked(column, rank);
            let Some(piece) = self.board.remove_piece(square) else {
                continue;
            };

            let target_rank = rank as i8 + forward;
            if (0..8).contains(&target_rank) {
                let target = Square::new_unchecked(column, target_rank as u8);
                self.board.put_piece(target, piece);
                self.touch.touch(target);
            } else {
                self.emit(GameEvent::ActionPieceBumpedOff { square, piece });
                if piece.is_king() {
                    self.end_game(
                        GameStatus::Checkmate,
                        Some(piece.side().flip()),
                        GameOverReason::KingBumpedOff,
                    );
                    return true;
                }
            }
        }

        false
    }
}
