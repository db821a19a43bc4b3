//! Per-side piece arrival queues.
//!
//! Pieces do not start on the board: each side owns a finite, non-restartable
//! queue of piece kinds that become available for placement one at a time.
//! The cadence contract is that a side receives its next piece once
//! `moves_made >= pieces_given * frequency`, which also makes the very first
//! piece arrive before the side's first move.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{PieceKind, Side};

/// How arriving pieces are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrivalMode {
    /// The canonical order: pawns first, then the back rank.
    Fixed,
    /// The player draws a piece of their choice from their remaining pool.
    Selectable,
    /// One shuffled order, shared by both sides.
    RandomSame,
    /// Each side gets an independently shuffled order.
    RandomDifferent,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalError {
    #[error("piece type {0:?} is not in the pool")]
    NotInPool(PieceKind),
    #[error("piece selection is only available in Selectable mode")]
    NotSelectableMode,
    #[error("no piece selection is pending")]
    NoSelectionPending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SideArrivals {
    queue: VecDeque<PieceKind>,
    pool: Vec<PieceKind>,
    current: Option<PieceKind>,
    awaiting_selection: bool,
    pieces_given: u32,
    moves_made: u32,
}

impl SideArrivals {
    fn empty() -> Self {
        Self {
            queue: VecDeque::new(),
            pool: Vec::new(),
            current: None,
            awaiting_selection: false,
            pieces_given: 0,
            moves_made: 0,
        }
    }

    fn with_queue(order: impl IntoIterator<Item = PieceKind>) -> Self {
        Self {
            queue: order.into_iter().collect(),
            ..Self::empty()
        }
    }

    fn with_pool(pool: Vec<PieceKind>) -> Self {
        Self {
            pool,
            ..Self::empty()
        }
    }

    fn has_remaining(&self) -> bool {
        !self.queue.is_empty() || !self.pool.is_empty()
    }

    fn any_pending(&self) -> bool {
        self.current.is_some() || self.awaiting_selection || self.has_remaining()
    }
}

/// Manages both sides' arrival state and the shared, deterministically seeded
/// RNG that produced any shuffles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalManager {
    mode: ArrivalMode,
    frequency: u32,
    sides: [SideArrivals; 2],
    rng: ChaCha12Rng,
}

impl ArrivalManager {
    pub fn new(mode: ArrivalMode, frequency: u32, seed: u64) -> Self {
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let frequency = frequency.max(1);

        let sides = match mode {
            ArrivalMode::Fixed => [
                SideArrivals::with_queue(PieceKind::FULL_SET),
                SideArrivals::with_queue(PieceKind::FULL_SET),
            ],
            ArrivalMode::Selectable => [
                SideArrivals::with_pool(PieceKind::FULL_SET.to_vec()),
                SideArrivals::with_pool(PieceKind::FULL_SET.to_vec()),
            ],
            ArrivalMode::RandomSame => {
                let mut order = PieceKind::FULL_SET;
                order.shuffle(&mut rng);
                [
                    SideArrivals::with_queue(order),
                    SideArrivals::with_queue(order),
                ]
            }
            ArrivalMode::RandomDifferent => {
                let mut white = PieceKind::FULL_SET;
                white.shuffle(&mut rng);
                let mut black = PieceKind::FULL_SET;
                black.shuffle(&mut rng);
                [
                    SideArrivals::with_queue(white),
                    SideArrivals::with_queue(black),
                ]
            }
        };

        Self {
            mode,
            frequency,
            sides,
            rng,
        }
    }

    pub fn mode(&self) -> ArrivalMode {
        self.mode
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    fn side(&self, side: Side) -> &SideArrivals {
        &self.sides[side.index()]
    }

    fn side_mut(&mut self, side: Side) -> &mut SideArrivals {
        &mut self.sides[side.index()]
    }

    /// Whether the cadence entitles this side to its next piece right now.
    pub fn should_piece_arrive(&self, side: Side) -> bool {
        let state = self.side(side);

        state.current.is_none()
            && !state.awaiting_selection
            && state.has_remaining()
            && state.moves_made >= state.pieces_given * self.frequency
    }

    /// Moves the head of this side's queue into the current slot, returning
    /// the arrived kind. In Selectable mode nothing arrives by itself; the
    /// side is instead marked as awaiting a call to
    /// [`Self::select_from_pool`], and [`None`] is returned.
    ///
    /// Returns [`None`] once the queue is exhausted; arrivals simply stop.
    pub fn queue_next_piece(&mut self, side: Side) -> Option<PieceKind> {
        if self.mode == ArrivalMode::Selectable {
            let state = self.side_mut(side);
            if !state.pool.is_empty() {
                state.awaiting_selection = true;
            }
            return None;
        }

        let state = self.side_mut(side);
        let kind = state.queue.pop_front()?;
        state.current = Some(kind);
        state.pieces_given += 1;
        Some(kind)
    }

    /// Selectable mode only: draw the given kind from the pool into the
    /// current slot.
    pub fn select_from_pool(&mut self, side: Side, kind: PieceKind) -> Result<PieceKind, ArrivalError> {
        if self.mode != ArrivalMode::Selectable {
            return Err(ArrivalError::NotSelectableMode);
        }

        let state = self.side_mut(side);
        if !state.awaiting_selection {
            return Err(ArrivalError::NoSelectionPending);
        }

        let index = state
            .pool
            .iter()
            .position(|&k| k == kind)
            .ok_or(ArrivalError::NotInPool(kind))?;

        state.pool.remove(index);
        state.current = Some(kind);
        state.awaiting_selection = false;
        state.pieces_given += 1;
        Ok(kind)
    }

    /// The piece currently waiting to be placed for this side.
    pub fn current_piece(&self, side: Side) -> Option<PieceKind> {
        self.side(side).current
    }

    /// Whether this side must pick a piece from its pool before it can place.
    pub fn awaiting_selection(&self, side: Side) -> bool {
        self.side(side).awaiting_selection
    }

    /// The remaining selectable pool for this side (Selectable mode).
    pub fn pool(&self, side: Side) -> &[PieceKind] {
        &self.side(side).pool
    }

    /// The remaining queue for this side, in arrival order.
    pub fn queue(&self, side: Side) -> impl Iterator<Item = PieceKind> + '_ {
        self.side(side).queue.iter().copied()
    }

    /// Clears the current slot once the piece has been placed on the board.
    pub fn piece_placed(&mut self, side: Side) {
        self.side_mut(side).current = None;
    }

    /// Records a completed move for the cadence counter.
    pub fn record_move(&mut self, side: Side) {
        self.side_mut(side).moves_made += 1;
    }

    pub fn pieces_given(&self, side: Side) -> u32 {
        self.side(side).pieces_given
    }

    pub fn moves_made(&self, side: Side) -> u32 {
        self.side(side).moves_made
    }

    /// Pieces not yet on the board for this side: queue + pool + the current
    /// slot. Together with the board census and captures this conserves the
    /// 16-piece allotment.
    pub fn remaining_allotment(&self, side: Side) -> usize {
        let state = self.side(side);
        state.queue.len() + state.pool.len() + usize::from(state.current.is_some())
    }

    /// Whether this side still has material on the way (queue, pool, current
    /// piece or a pending selection). Insufficient-material draws are
    /// suppressed while this holds for either side.
    pub fn any_pending(&self, side: Side) -> bool {
        self.side(side).any_pending()
    }

    pub fn any_pending_either_side(&self) -> bool {
        self.any_pending(Side::White) || self.any_pending(Side::Black)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fixed_mode_arrives_in_canonical_order() {
        let mut arrivals = ArrivalManager::new(ArrivalMode::Fixed, 1, 1);

        assert!(arrivals.should_piece_arrive(Side::White));
        assert_eq!(arrivals.queue_next_piece(Side::White), Some(PieceKind::Pawn));
        assert_eq!(arrivals.current_piece(Side::White), Some(PieceKind::Pawn));

        // Drain the remaining pawns.
        arrivals.piece_placed(Side::White);
        for _ in 0..7 {
            arrivals.record_move(Side::White);
            assert_eq!(arrivals.queue_next_piece(Side::White), Some(PieceKind::Pawn));
            arrivals.piece_placed(Side::White);
        }

        arrivals.record_move(Side::White);
        assert_eq!(arrivals.queue_next_piece(Side::White), Some(PieceKind::Rook));
    }

    #[test]
    fn cadence_requires_moves_between_arrivals() {
        let mut arrivals = ArrivalManager::new(ArrivalMode::Fixed, 1, 1);

        // First arrival happens before any move: 0 >= 0 * 1.
        assert!(arrivals.should_piece_arrive(Side::White));
        arrivals.queue_next_piece(Side::White);
        arrivals.piece_placed(Side::White);

        // One piece given, no moves made: 0 >= 1 is false.
        assert!(!arrivals.should_piece_arrive(Side::White));

        arrivals.record_move(Side::White);
        assert!(arrivals.should_piece_arrive(Side::White));
    }

    #[test]
    fn cadence_respects_frequency() {
        let mut arrivals = ArrivalManager::new(ArrivalMode::Fixed, 3, 1);

        arrivals.queue_next_piece(Side::Black);
        arrivals.piece_placed(Side::Black);

        for _ in 0..2 {
            arrivals.record_move(Side::Black);
            assert!(!arrivals.should_piece_arrive(Side::Black));
        }
        arrivals.record_move(Side::Black);
        assert!(arrivals.should_piece_arrive(Side::Black));
    }

    #[test]
    fn arrival_blocked_while_current_piece_unplaced() {
        let mut arrivals = ArrivalManager::new(ArrivalMode::Fixed, 1, 1);

        arrivals.queue_next_piece(Side::White);
        arrivals.record_move(Side::White);

        // Cadence is satisfied but the current slot is full.
        assert!(!arrivals.should_piece_arrive(Side::White));
        arrivals.piece_placed(Side::White);
        assert!(arrivals.should_piece_arrive(Side::White));
    }

    #[test]
    fn random_same_gives_both_sides_the_same_order() {
        let arrivals = ArrivalManager::new(ArrivalMode::RandomSame, 1, 42);

        let white: Vec<_> = arrivals.queue(Side::White).collect();
        let black: Vec<_> = arrivals.queue(Side::Black).collect();
        assert_eq!(white, black);

        // Deterministic under the seed.
        let again = ArrivalManager::new(ArrivalMode::RandomSame, 1, 42);
        assert_eq!(again.queue(Side::White).collect::<Vec<_>>(), white);
    }

    #[test]
    fn random_different_shuffles_are_permutations_of_the_full_set() {
        let arrivals = ArrivalManager::new(ArrivalMode::RandomDifferent, 1, 7);

        for side in [Side::White, Side::Black] {
            let mut queue: Vec<_> = arrivals.queue(side).collect();
            queue.sort_by_key(|k| *k as u8);
            let mut expected = PieceKind::FULL_SET.to_vec();
            expected.sort_by_key(|k| *k as u8);
            assert_eq!(queue, expected);
        }
    }

    #[test]
    fn selectable_mode_draws_from_pool() {
        let mut arrivals = ArrivalManager::new(ArrivalMode::Selectable, 1, 1);

        assert!(arrivals.should_piece_arrive(Side::White));
        assert_eq!(arrivals.queue_next_piece(Side::White), None);
        assert!(arrivals.awaiting_selection(Side::White));
        assert_eq!(arrivals.current_piece(Side::White), None);

        assert_eq!(
            arrivals.select_from_pool(Side::White, PieceKind::Queen),
            Ok(PieceKind::Queen)
        );
        assert_eq!(arrivals.current_piece(Side::White), Some(PieceKind::Queen));
        assert!(!arrivals.awaiting_selection(Side::White));

        // Only one queen in the allotment.
        arrivals.piece_placed(Side::White);
        arrivals.record_move(Side::White);
        arrivals.queue_next_piece(Side::White);
        assert_eq!(
            arrivals.select_from_pool(Side::White, PieceKind::Queen),
            Err(ArrivalError::NotInPool(PieceKind::Queen))
        );
    }

    #[test]
    fn selection_errors_outside_selectable_mode_or_without_pending() {
        let mut fixed = ArrivalManager::new(ArrivalMode::Fixed, 1, 1);
        assert_eq!(
            fixed.select_from_pool(Side::White, PieceKind::Pawn),
            Err(ArrivalError::NotSelectableMode)
        );

        let mut selectable = ArrivalManager::new(ArrivalMode::Selectable, 1, 1);
        assert_eq!(
            selectable.select_from_pool(Side::White, PieceKind::Pawn),
            Err(ArrivalError::NoSelectionPending)
        );
    }

    #[test]
    fn queue_exhaustion_is_not_an_error() {
        let mut arrivals = ArrivalManager::new(ArrivalMode::Fixed, 1, 1);

        for _ in 0..16 {
            assert!(arrivals.queue_next_piece(Side::White).is_some());
            arrivals.piece_placed(Side::White);
        }

        assert_eq!(arrivals.queue_next_piece(Side::White), None);
        assert!(!arrivals.should_piece_arrive(Side::White));
        assert!(!arrivals.any_pending(Side::White));
    }

    #[test]
    fn remaining_allotment_is_conserved() {
        let mut arrivals = ArrivalManager::new(ArrivalMode::Fixed, 1, 5);
        assert_eq!(arrivals.remaining_allotment(Side::White), 16);

        arrivals.queue_next_piece(Side::White);
        // Queue shrank but the current slot holds the piece.
        assert_eq!(arrivals.remaining_allotment(Side::White), 16);

        arrivals.piece_placed(Side::White);
        // Now the piece lives on the board instead.
        assert_eq!(arrivals.remaining_allotment(Side::White), 15);
    }

    #[test]
    fn serde_round_trip_preserves_queues_and_rng() {
        let mut arrivals = ArrivalManager::new(ArrivalMode::RandomDifferent, 2, 99);
        arrivals.queue_next_piece(Side::White);
        arrivals.record_move(Side::White);

        let json = serde_json::to_string(&arrivals).unwrap();
        let mut restored: ArrivalManager = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.mode(), arrivals.mode());
        assert_eq!(restored.frequency(), arrivals.frequency());
        assert_eq!(
            restored.queue(Side::White).collect::<Vec<_>>(),
            arrivals.queue(Side::White).collect::<Vec<_>>()
        );
        assert_eq!(
            restored.current_piece(Side::White),
            arrivals.current_piece(Side::White)
        );
        assert_eq!(restored.moves_made(Side::White), arrivals.moves_made(Side::White));

        // The restored manager continues identically.
        assert_eq!(
            restored.queue_next_piece(Side::Black),
            arrivals.queue_next_piece(Side::Black)
        );
    }
}
