//! The game orchestrator: wires the board, arrivals, draw detection and the
//! clock together, owns the turn/placement/promotion loop, and emits every
//! observable event.

mod action;
mod triplet;

pub use action::{ActionState, TargetColumn};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    arrival::{ArrivalError, ArrivalManager},
    board::{
        Board, MoveError, MoveRecord, Piece, PieceKind, PlaceError, PromotionError, Side, Square,
    },
    clock::{Clock, ClockTick},
    draw::{DrawDetector, DrawReason},
    events::GameEvent,
    settings::{GameMode, GameSettings},
};

/// Current phase of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Playing,
    Check,
    Checkmate,
    Stalemate,
    Draw,
    Timeout,
}

impl GameStatus {
    /// Whether the game has ended.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GameStatus::Checkmate | GameStatus::Stalemate | GameStatus::Draw | GameStatus::Timeout
        )
    }
}

/// Why the game ended. `Display` produces the canonical reason strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    Checkmate,
    Stalemate,
    Timeout,
    FiftyMoveRule,
    ThreefoldRepetition,
    InsufficientMaterial,
    TripletClear,
    KingCaptured,
    KingBumpedOff,
}

impl std::fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GameOverReason::Checkmate => "checkmate",
            GameOverReason::Stalemate => "stalemate",
            GameOverReason::Timeout => "timeout",
            GameOverReason::FiftyMoveRule => "50-move rule",
            GameOverReason::ThreefoldRepetition => "threefold repetition",
            GameOverReason::InsufficientMaterial => "insufficient material",
            GameOverReason::TripletClear => "triplet clear",
            GameOverReason::KingCaptured => "king captured",
            GameOverReason::KingBumpedOff => "king bumped off",
        };
        f.write_str(s)
    }
}

impl From<DrawReason> for GameOverReason {
    fn from(reason: DrawReason) -> Self {
        match reason {
            DrawReason::FiftyMoveRule => GameOverReason::FiftyMoveRule,
            DrawReason::ThreefoldRepetition => GameOverReason::ThreefoldRepetition,
            DrawReason::InsufficientMaterial => GameOverReason::InsufficientMaterial,
        }
    }
}

/// Why a move command was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    #[error("no piece at {0}")]
    NoPieceAt(Square),
    #[error("the piece at {0} does not belong to the player to move")]
    NotYourTurn(Square),
    #[error("move cooldown has not elapsed")]
    CooldownActive,
    #[error("no legal move from {from} to {to}")]
    NoSuchMove { from: Square, to: Square },
}

/// Why a placement command was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceRejection {
    #[error("column {0} is out of range")]
    ColumnOutOfRange(u8),
    #[error("no piece is waiting to be placed")]
    NoCurrentPiece,
    #[error("square {0} is occupied")]
    SquareOccupied(Square),
    #[error("bishop must be placed on the opposite square color to the first bishop")]
    BishopColorRule,
    #[error("placement would leave the king in check")]
    LeavesKingInCheck,
    #[error("pieces are placed automatically in Action mode")]
    AutomaticInActionMode,
}

impl From<PlaceError> for PlaceRejection {
    fn from(error: PlaceError) -> Self {
        match error {
            PlaceError::SquareOccupied(square) => PlaceRejection::SquareOccupied(square),
            PlaceError::BishopColorRule => PlaceRejection::BishopColorRule,
        }
    }
}

/// A rejected command. Rejections are recoverable: no state changed and no
/// events were emitted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    #[error("game is not in progress")]
    WrongPhase,
    #[error("a promotion must be completed first")]
    PromotionPending,
    #[error("no promotion is pending")]
    NoPromotionPending,
    #[error("invalid promotion piece: {0:?}")]
    InvalidPromotion(PieceKind),
    #[error("illegal move: {0}")]
    IllegalMove(#[from] MoveRejection),
    #[error("illegal placement: {0}")]
    IllegalPlacement(#[from] PlaceRejection),
    #[error("piece selection failed: {0}")]
    Selection(#[from] ArrivalError),
}

/// Per-square recency stamps, used to pick triplet pushers. Both moves and
/// placements count as touching the destination square.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchLog {
    counter: u64,
    entries: Vec<(Square, u64)>,
}

impl TouchLog {
    pub fn touch(&mut self, square: Square) {
        self.counter += 1;
        let stamp = self.counter;
        match self.entries.iter_mut().find(|(s, _)| *s == square) {
            Some(entry) => entry.1 = stamp,
            None => self.entries.push((square, stamp)),
        }
    }

    pub fn last_touch(&self, square: Square) -> Option<u64> {
        self.entries
            .iter()
            .find(|(s, _)| *s == square)
            .map(|(_, stamp)| *stamp)
    }
}

/// A pawn sitting on its promotion rank, waiting for the promotion piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPromotion {
    pub square: Square,
    pub side: Side,
    pub was_capture: bool,
}

/// The complete Saktris game state machine.
///
/// All mutation flows through the command surface ([`Self::try_move`],
/// [`Self::try_place_piece`], [`Self::complete_promotion`],
/// [`Self::select_piece`], [`Self::tick`]); observers read the emitted
/// [`GameEvent`]s via [`Self::take_events`].
#[derive(Debug, Clone)]
pub struct GameState {
    settings: GameSettings,
    board: Board,
    arrivals: ArrivalManager,
    draws: DrawDetector,
    clock: Option<Clock>,
    status: GameStatus,
    current_player: Side,
    move_count: u32,
    history: Vec<MoveRecord>,
    history_index: usize,
    pending_promotion: Option<PendingPromotion>,
    winner: Option<Side>,
    over_reason: Option<GameOverReason>,
    touch: TouchLog,
    action: Option<ActionState>,
    events: Vec<GameEvent>,
}

impl GameState {
    /// Starts a new game: fresh board, seeded arrival queues, optional clock,
    /// initial arrivals for both sides, then `TurnChanged(White)`.
    pub fn new(mut settings: GameSettings) -> Self {
        if settings.game_mode == GameMode::VsAi {
            settings.use_ai = true;
        }
        settings.arrival_frequency = settings.arrival_frequency.max(1);

        let is_action = settings.game_mode == GameMode::Action;
        let clock = if is_action {
            // Action mode replaces the turn clock with cooldowns.
            None
        } else {
            settings
                .time_control
                .map(|tc| Clock::new(tc.initial_time(), tc.increment()))
        };

        let mut game = Self {
            board: Board::new(),
            arrivals: ArrivalManager::new(
                settings.arrival_mode,
                settings.arrival_frequency,
                settings.rng_seed,
            ),
            draws: DrawDetector::new(),
            clock,
            status: GameStatus::Playing,
            current_player: Side::White,
            move_count: 0,
            history: Vec::new(),
            history_index: 0,
            pending_promotion: None,
            winner: None,
            over_reason: None,
            touch: TouchLog::default(),
            action: is_action.then(|| ActionState::new(&settings)),
            events: Vec::new(),
            settings,
        };

        game.process_arrivals(Side::White);
        game.process_arrivals(Side::Black);

        if !game.is_action_mode() {
            game.draws.record_position(&game.board, Side::White);
        }

        game.emit(GameEvent::TurnChanged(Side::White));
        if game.is_ai_turn() {
            game.emit(GameEvent::AiTurnStarted);
        }

        game
    }

    // --- accessors ---

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn arrivals(&self) -> &ArrivalManager {
        &self.arrivals
    }

    pub fn draws(&self) -> &DrawDetector {
        &self.draws
    }

    pub fn clock(&self) -> Option<&Clock> {
        self.clock.as_ref()
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn current_player(&self) -> Side {
        self.current_player
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn game_over_reason(&self) -> Option<GameOverReason> {
        self.over_reason
    }

    pub fn pending_promotion(&self) -> Option<PendingPromotion> {
        self.pending_promotion
    }

    pub fn is_action_mode(&self) -> bool {
        self.action.is_some()
    }

    /// Whether it is the AI's turn to act (turn-based modes).
    pub fn is_ai_turn(&self) -> bool {
        self.settings.use_ai
            && !self.is_action_mode()
            && self.current_player == self.settings.ai_side
            && !self.status.is_terminal()
    }

    /// Drains the pending event queue. Events within a turn are ordered:
    /// move, triplet-clear, status change, clock, arrivals, turn change.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // --- commands ---

    /// Attempts to move the piece on `from` to `to`.
    pub fn try_move(&mut self, from: Square, to: Square) -> Result<(), CommandError> {
        self.ensure_active()?;
        if self.pending_promotion.is_some() {
            return Err(CommandError::PromotionPending);
        }

        let piece = self
            .board
            .piece_at(from)
            .ok_or(MoveRejection::NoPieceAt(from))?;
        let side = piece.side();

        if self.is_action_mode() {
            if !self.action_side_ready(side) {
                return Err(MoveRejection::CooldownActive.into());
            }
        } else if side != self.current_player {
            return Err(MoveRejection::NotYourTurn(from).into());
        }

        let prior_en_passant = self.board.en_passant_target();
        let prior_castling = self.board.castling_rights();
        let prior_halfmove_clock = self.draws.halfmove_clock();

        let executed = self.board.execute_move(from, to).map_err(|e| match e {
            MoveError::NoPieceAt(square) => MoveRejection::NoPieceAt(square),
            MoveError::NoSuchMove { from, to } => MoveRejection::NoSuchMove { from, to },
        })?;

        let record = MoveRecord {
            mv: executed.mv,
            prior_en_passant,
            prior_castling,
            prior_halfmove_clock,
        };
        self.history.truncate(self.history_index);
        self.history.push(record);
        self.history_index = self.history.len();
        self.move_count += 1;
        self.arrivals.record_move(side);

        self.touch.touch(to);
        if let Some((_, rook_to)) = executed.mv.castle_rook {
            self.touch.touch(rook_to);
        }

        if self.is_action_mode() {
            self.reset_action_cooldown(side);
        }

        self.emit(GameEvent::MoveExecuted(record));

        if let Some(lost) = executed.captured_king {
            self.end_game(
                GameStatus::Checkmate,
                Some(lost.flip()),
                GameOverReason::KingCaptured,
            );
            return Ok(());
        }

        if executed.needs_promotion {
            if self.is_action_mode() {
                // In Action mode a pawn reaching the far rank is bumped off
                // instead of promoting.
                if let Some(pawn) = self.board.remove_piece(to) {
                    self.emit(GameEvent::ActionPieceBumpedOff {
                        square: to,
                        piece: pawn,
                    });
                }
                self.finish_action_move(to);
            } else {
                self.pending_promotion = Some(PendingPromotion {
                    square: to,
                    side,
                    was_capture: executed.mv.is_capture(),
                });
                self.emit(GameEvent::PromotionNeeded { square: to, side });
            }
            return Ok(());
        }

        if self.is_action_mode() {
            self.finish_action_move(to);
        } else {
            self.finish_turn(side, to, executed.mv.is_capture(), executed.mv.is_pawn_move());
        }

        Ok(())
    }

    /// Supplies the promotion piece for a pawn waiting on its promotion rank,
    /// then finishes the held turn.
    pub fn complete_promotion(&mut self, kind: PieceKind) -> Result<(), CommandError> {
        self.ensure_active()?;
        let pending = self
            .pending_promotion
            .ok_or(CommandError::NoPromotionPending)?;

        self.board
            .promote_pawn(pending.square, kind)
            .map_err(|e| match e {
                PromotionError::InvalidPiece(kind) => CommandError::InvalidPromotion(kind),
                PromotionError::NoPawnAt(_) => CommandError::NoPromotionPending,
            })?;

        self.pending_promotion = None;
        if let Some(record) = self.history.last_mut() {
            record.mv.promotion = Some(kind);
        }

        self.finish_turn(pending.side, pending.square, pending.was_capture, true);
        Ok(())
    }

    /// Places the current player's waiting piece on their back row. In
    /// turn-based modes a placement ends the turn.
    pub fn try_place_piece(&mut self, column: u8) -> Result<(), CommandError> {
        self.ensure_active()?;
        if self.pending_promotion.is_some() {
            return Err(CommandError::PromotionPending);
        }
        if self.is_action_mode() {
            return Err(PlaceRejection::AutomaticInActionMode.into());
        }

        let side = self.current_player;
        let square =
            Square::on_back_row(side, column).ok_or(PlaceRejection::ColumnOutOfRange(column))?;
        let kind = self
            .arrivals
            .current_piece(side)
            .ok_or(PlaceRejection::NoCurrentPiece)?;
        let piece = Piece::new(side, kind);

        self.board
            .check_placement(square, piece)
            .map_err(PlaceRejection::from)?;

        // A placement cannot expose one's own king, but while in check it
        // must extinguish the check, since it ends the turn.
        if !self.board.placement_escapes_check(square, piece) {
            return Err(PlaceRejection::LeavesKingInCheck.into());
        }

        self.board
            .place_piece(square, piece)
            .map_err(PlaceRejection::from)?;
        self.arrivals.piece_placed(side);
        self.touch.touch(square);

        self.emit(GameEvent::PiecePlaced {
            side,
            square,
            piece,
        });

        self.finish_turn(side, square, false, false);
        Ok(())
    }

    /// Selectable mode: the current player draws the given kind from their
    /// pool as their current piece.
    pub fn select_piece(&mut self, kind: PieceKind) -> Result<(), CommandError> {
        self.ensure_active()?;
        if self.pending_promotion.is_some() {
            return Err(CommandError::PromotionPending);
        }

        let side = self.current_player;
        let selected = self.arrivals.select_from_pool(side, kind)?;
        self.emit(GameEvent::PieceArrived {
            side,
            piece: selected,
        });
        Ok(())
    }

    /// Advances time: the clock in turn-based modes, cooldowns and the
    /// arrival timer in Action mode.
    pub fn tick(&mut self, dt: Duration) {
        if self.status.is_terminal() {
            return;
        }

        if self.is_action_mode() {
            self.action_tick(dt);
            return;
        }

        let ticks = match &mut self.clock {
            Some(clock) => clock.tick(dt),
            None => return,
        };

        for tick in ticks {
            match tick {
                ClockTick::Updated { white, black } => {
                    self.emit(GameEvent::ClockTimeUpdated { white, black });
                }
                ClockTick::LowTime { side, remaining } => {
                    self.emit(GameEvent::ClockLowTime { side, remaining });
                }
                ClockTick::Expired { side } => {
                    self.end_game(GameStatus::Timeout, Some(side.flip()), GameOverReason::Timeout);
                    return;
                }
            }
        }
    }

    // --- internals ---

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    fn ensure_active(&self) -> Result<(), CommandError> {
        match self.status {
            GameStatus::Playing | GameStatus::Check => Ok(()),
            _ => Err(CommandError::WrongPhase),
        }
    }

    fn process_arrivals(&mut self, side: Side) {
        if self.arrivals.should_piece_arrive(side) {
            if let Some(kind) = self.arrivals.queue_next_piece(side) {
                self.emit(GameEvent::PieceArrived { side, piece: kind });
            }
            // In Selectable mode nothing arrives by itself; the side is now
            // awaiting a select_piece call.
        }
    }

    fn set_status(&mut self, status: GameStatus) {
        if self.status != status {
            self.status = status;
            self.emit(GameEvent::StatusChanged(status));
        }
    }

    fn end_game(&mut self, status: GameStatus, winner: Option<Side>, reason: GameOverReason) {
        self.set_status(status);
        self.winner = winner;
        self.over_reason = Some(reason);
        if let Some(clock) = &mut self.clock {
            clock.pause();
        }
        self.emit(GameEvent::GameOver { winner, reason });
    }

    /// Turn finalisation: draw bookkeeping, triplet clear, status update,
    /// clock switch, player switch, arrivals for the incoming side, events.
    fn finish_turn(&mut self, mover: Side, to: Square, was_capture: bool, was_pawn_move: bool) {
        self.draws.on_move_made(was_capture, was_pawn_move);

        if self.settings.triplet_clear_enabled && self.run_triplet_clear(to) {
            return;
        }

        if self.update_game_status(mover) {
            return;
        }

        let next = mover.flip();
        if let Some(clock) = &mut self.clock {
            clock.switch_side();
        }
        self.current_player = next;
        self.process_arrivals(next);
        self.emit(GameEvent::TurnChanged(next));
        if self.is_ai_turn() {
            self.emit(GameEvent::AiTurnStarted);
        }
    }

    /// Recomputes the status for the opponent of `mover`. Returns true when
    /// the game ended.
    fn update_game_status(&mut self, mover: Side) -> bool {
        let opponent = mover.flip();

        // Record the new position first so the repetition count includes it:
        // the draw fires on the move that completes the third occurrence.
        self.draws.record_position(&self.board, opponent);
        if let Some(reason) = self.draws.check_all_draws(
            &self.board,
            opponent,
            self.arrivals.any_pending_either_side(),
        ) {
            self.end_game(GameStatus::Draw, None, reason.into());
            return true;
        }

        let in_check = self.board.is_in_check(opponent);
        let has_move = self.board.has_any_legal_move(opponent);

        if in_check {
            // A check is only mate if no move *and* no placement of the
            // opponent's pending piece can extinguish it.
            if !has_move && !self.placement_escape_exists(opponent) {
                self.end_game(GameStatus::Checkmate, Some(mover), GameOverReason::Checkmate);
                return true;
            }
            self.set_status(GameStatus::Check);
        } else if !has_move && !self.any_placement_exists(opponent) {
            self.end_game(GameStatus::Stalemate, None, GameOverReason::Stalemate);
            return true;
        } else {
            self.set_status(GameStatus::Playing);
        }

        false
    }

    /// The piece kinds `side` could place right now: the current piece, or
    /// in Selectable mode with a pending selection, anything in the pool.
    fn placeable_kinds(&self, side: Side) -> Vec<PieceKind> {
        if let Some(kind) = self.arrivals.current_piece(side) {
            return vec![kind];
        }
        if self.arrivals.awaiting_selection(side) {
            let mut kinds = self.arrivals.pool(side).to_vec();
            kinds.sort_by_key(|k| *k as u8);
            kinds.dedup();
            return kinds;
        }
        Vec::new()
    }

    /// Whether any legal placement of the side's pending piece blocks the
    /// current check.
    fn placement_escape_exists(&self, side: Side) -> bool {
        for kind in self.placeable_kinds(side) {
            let piece = Piece::new(side, kind);
            for column in 0..8 {
                if let Some(square) = Square::on_back_row(side, column) {
                    if self.board.placement_escapes_check(square, piece) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Whether the side has any legal placement at all.
    fn any_placement_exists(&self, side: Side) -> bool {
        for kind in self.placeable_kinds(side) {
            let piece = Piece::new(side, kind);
            for column in 0..8 {
                if let Some(square) = Square::on_back_row(side, column) {
                    if self.board.can_place_piece_at(square, piece) {
                        return true;
                    }
                }
            }
        }
        false
    }

    // --- snapshot support (fields are reassembled by the snapshot module) ---

    pub(crate) fn parts(
        &self,
    ) -> (
        &GameSettings,
        &Board,
        &ArrivalManager,
        &DrawDetector,
        &Option<Clock>,
        &TouchLog,
        &Option<ActionState>,
    ) {
        (
            &self.settings,
            &self.board,
            &self.arrivals,
            &self.draws,
            &self.clock,
            &self.touch,
            &self.action,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        settings: GameSettings,
        board: Board,
        arrivals: ArrivalManager,
        draws: DrawDetector,
        clock: Option<Clock>,
        status: GameStatus,
        current_player: Side,
        move_count: u32,
        history: Vec<MoveRecord>,
        history_index: usize,
        pending_promotion: Option<PendingPromotion>,
        winner: Option<Side>,
        over_reason: Option<GameOverReason>,
        touch: TouchLog,
        action: Option<ActionState>,
    ) -> Self {
        Self {
            settings,
            board,
            arrivals,
            draws,
            clock,
            status,
            current_player,
            move_count,
            history,
            history_index,
            pending_promotion,
            winner,
            over_reason,
            touch,
            action,
            events: Vec::new(),
        }
    }

    pub(crate) fn history_index(&self) -> usize {
        self.history_index
    }

    pub(crate) fn touch_log(&self) -> &TouchLog {
        &self.touch
    }
}
