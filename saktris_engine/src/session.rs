//! The game session: a [`GameState`] wired to the computer opponent.
//!
//! The session forwards the command surface, drives the AI (cooperative
//! stepping for single-threaded hosts, a worker thread natively, synchronous
//! search for Action-mode reactions), and merges AI events into the game's
//! event stream in chronological order.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        Arc,
    },
    time::{Duration, Instant},
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use thiserror::Error;

use saktris_core::{
    board::{PieceKind, Side, Square},
    events::GameEvent,
    game::{CommandError, GameState},
    settings::GameSettings,
};

use crate::{
    placement::choose_placement,
    search::{Search, SearchStep},
    search_limits::{SearchLimits, YIELD_EVERY_N_NODES},
    search_thread::SearchThread,
};

/// If a worker is still alive this long after the request, the poll loop
/// breaks and the session plays a fallback instead.
pub const WORKER_WATCHDOG: Duration = Duration::from_secs(10);

/// How the AI search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Step the search a few nodes per frame on the host thread
    /// (single-threaded hosts, e.g. browsers).
    Cooperative,
    /// Run the search on a worker thread and poll for completion.
    Threaded,
}

/// What the AI decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiDecision {
    Move { from: Square, to: Square },
    Place { column: u8 },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiRequestError {
    #[error("it is not the AI's turn")]
    NotAiTurn,
    #[error("the AI is already thinking")]
    AlreadyThinking,
}

pub struct GameSession {
    game: GameState,
    mode: SearchMode,
    limits: SearchLimits,
    rng: ChaCha12Rng,
    abort_flag: Arc<AtomicBool>,

    cooperative: Option<Search>,
    thread: SearchThread,
    pending_request: bool,
    request_started: Option<Instant>,

    /// Action mode: remaining reaction delay before the AI acts.
    reaction: Option<Duration>,

    events: Vec<GameEvent>,
}

impl GameSession {
    pub fn new(settings: GameSettings, mode: SearchMode) -> Self {
        Self::with_game(GameState::new(settings), mode)
    }

    /// Wraps an existing game (e.g. one restored from a snapshot).
    pub fn with_game(game: GameState, mode: SearchMode) -> Self {
        let settings = *game.settings();
        let mut session = Self {
            game,
            mode,
            limits: SearchLimits::for_difficulty(settings.ai_difficulty),
            rng: ChaCha12Rng::seed_from_u64(settings.rng_seed.wrapping_add(0x0A11_D1CE)),
            abort_flag: Arc::new(AtomicBool::new(false)),
            cooperative: None,
            thread: SearchThread::new(),
            pending_request: false,
            request_started: None,
            reaction: None,
            events: Vec::new(),
        };
        session.pump();
        session
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// Overrides the search limits (tests, UI difficulty tweaks).
    pub fn set_search_limits(&mut self, limits: SearchLimits) {
        self.limits = limits;
    }

    pub fn searching(&self) -> bool {
        self.pending_request
    }

    /// Drains all pending events, game and AI interleaved in order.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        self.pump();
        std::mem::take(&mut self.events)
    }

    // --- command surface, forwarded ---

    pub fn try_move(&mut self, from: Square, to: Square) -> Result<(), CommandError> {
        let result = self.game.try_move(from, to);
        self.pump();
        result
    }

    pub fn try_place_piece(&mut self, column: u8) -> Result<(), CommandError> {
        let result = self.game.try_place_piece(column);
        self.pump();
        result
    }

    pub fn complete_promotion(&mut self, kind: PieceKind) -> Result<(), CommandError> {
        let result = self.game.complete_promotion(kind);
        self.pump();
        result
    }

    pub fn select_piece(&mut self, kind: PieceKind) -> Result<(), CommandError> {
        let result = self.game.select_piece(kind);
        self.pump();
        result
    }

    /// Starts the AI deciding its move (turn-based modes). The decision is
    /// played automatically once the search completes; watch for
    /// `AiMoveMade`.
    pub fn request_ai_move(&mut self) -> Result<(), AiRequestError> {
        if self.pending_request {
            return Err(AiRequestError::AlreadyThinking);
        }
        if !self.game.is_ai_turn() {
            return Err(AiRequestError::NotAiTurn);
        }

        let side = self.game.current_player();
        self.emit(GameEvent::AiThinkingStarted);

        self.maybe_select_for_ai(side);

        // Placement first: if the AI has a piece to drop and somewhere legal
        // to drop it, it places instead of moving.
        if let Some(column) = self.choose_placement_now(side) {
            self.emit(GameEvent::AiThinkingFinished);
            self.apply_decision(AiDecision::Place { column });
            return Ok(());
        }

        self.abort_flag = Arc::new(AtomicBool::new(false));
        let seed = self.rng.gen();

        match self.mode {
            SearchMode::Cooperative => {
                self.cooperative = Some(Search::new(
                    self.game.board().clone(),
                    side,
                    self.limits.clone(),
                    seed,
                    self.abort_flag.clone(),
                ));
            }
            SearchMode::Threaded => {
                self.thread.send_search_request(
                    self.game.board().clone(),
                    side,
                    self.limits.clone(),
                    seed,
                    self.abort_flag.clone(),
                );
            }
        }
        self.pending_request = true;
        self.request_started = Some(Instant::now());
        Ok(())
    }

    /// Aborts any in-flight search. The host calls this when tearing the
    /// game down; the worker notices the flag, returns, and its result is
    /// ignored.
    pub fn abort_search(&mut self) {
        self.abort_flag.store(true, AtomicOrdering::Relaxed);
        self.thread.cancel();
        self.cooperative = None;
        self.pending_request = false;
        self.request_started = None;
    }

    /// Advances game time and drives any in-flight AI work.
    pub fn tick(&mut self, dt: Duration) {
        self.game.tick(dt);
        self.pump();

        if self.game.is_action_mode() && self.game.settings().use_ai {
            self.drive_action_ai(dt);
        }

        self.poll_search();
    }

    // --- internals ---

    fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    fn pump(&mut self) {
        self.events.extend(self.game.take_events());
    }

    /// Selectable mode: the AI drafts the most valuable piece left in its
    /// pool.
    fn maybe_select_for_ai(&mut self, side: Side) {
        if !self.game.arrivals().awaiting_selection(side) {
            return;
        }
        let pick = self
            .game
            .arrivals()
            .pool(side)
            .iter()
            .copied()
            .max_by_key(|kind| kind.value());
        if let Some(kind) = pick {
            let _ = self.select_piece(kind);
        }
    }

    fn choose_placement_now(&mut self, side: Side) -> Option<u8> {
        let kind = self.game.arrivals().current_piece(side)?;
        choose_placement(self.game.board(), side, kind, &mut self.rng)
    }

    fn poll_search(&mut self) {
        if !self.pending_request {
            return;
        }

        match self.mode {
            SearchMode::Cooperative => {
                let step = match &mut self.cooperative {
                    Some(search) => search.step(YIELD_EVERY_N_NODES),
                    None => {
                        self.pending_request = false;
                        return;
                    }
                };
                match step {
                    SearchStep::InProgress(fraction) => {
                        self.emit(GameEvent::AiProgress(fraction));
                    }
                    SearchStep::Done => {
                        let outcome = self.cooperative.take().map(|search| search.outcome());
                        self.pending_request = false;
                        self.request_started = None;
                        self.emit(GameEvent::AiThinkingFinished);
                        if let Some(mv) = outcome.and_then(|outcome| outcome.best_move) {
                            self.apply_decision(AiDecision::Move {
                                from: mv.from,
                                to: mv.to,
                            });
                        }
                    }
                }
            }
            SearchMode::Threaded => {
                if let Some(outcome) = self.thread.try_receive() {
                    self.pending_request = false;
                    self.request_started = None;
                    self.emit(GameEvent::AiThinkingFinished);
                    if let Some(mv) = outcome.best_move {
                        self.apply_decision(AiDecision::Move {
                            from: mv.from,
                            to: mv.to,
                        });
                    }
                    return;
                }

                // Watchdog: a wedged worker must not hang the game.
                let expired = self
                    .request_started
                    .is_some_and(|started| started.elapsed() >= WORKER_WATCHDOG);
                if expired {
                    self.abort_search();
                    self.emit(GameEvent::AiThinkingFinished);
                    self.play_fallback();
                }
            }
        }
    }

    /// Plays the first legal move (or placement) without searching. Used
    /// only when the worker watchdog fires.
    fn play_fallback(&mut self) {
        let side = self.game.current_player();
        if let Some(column) = self.choose_placement_now(side) {
            self.apply_decision(AiDecision::Place { column });
            return;
        }
        let mv = self.game.board().legal_moves_for(side).first().copied();
        if let Some(mv) = mv {
            self.apply_decision(AiDecision::Move {
                from: mv.from,
                to: mv.to,
            });
        }
    }

    fn apply_decision(&mut self, decision: AiDecision) {
        let result = match decision {
            AiDecision::Move { from, to } => self.game.try_move(from, to).and_then(|()| {
                if self.game.pending_promotion().is_some() {
                    self.game.complete_promotion(PieceKind::Queen)
                } else {
                    Ok(())
                }
            }),
            AiDecision::Place { column } => self.game.try_place_piece(column),
        };
        self.pump();

        if result.is_ok() {
            if let AiDecision::Move { .. } = decision {
                if let Some(record) = self.game.history().last().copied() {
                    self.emit(GameEvent::AiMoveMade(record));
                }
            }
        }
    }

    /// Action mode: once the AI's cooldown expires, wait a sampled reaction
    /// delay, then search synchronously and play. The delay keeps the AI
    /// from acting on the exact frame its cooldown elapses.
    fn drive_action_ai(&mut self, dt: Duration) {
        if self.game.status().is_terminal() {
            return;
        }

        let side = self.game.settings().ai_side;
        let ready = self
            .game
            .action_cooldown(side)
            .is_some_and(|cooldown| cooldown.is_zero());

        if !ready {
            self.reaction = None;
            return;
        }

        match self.reaction {
            None => {
                let min = self.game.settings().action.ai_reaction_min;
                let max = self.game.settings().action.ai_reaction_max;
                let span = max.saturating_sub(min);
                let delay = min + span.mul_f64(self.rng.gen::<f64>());
                self.reaction = Some(delay);
            }
            Some(remaining) => {
                let remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    self.reaction = None;
                    self.act_now(side);
                } else {
                    self.reaction = Some(remaining);
                }
            }
        }
    }

    /// Synchronous search-and-play for Action mode.
    fn act_now(&mut self, side: Side) {
        self.emit(GameEvent::AiThinkingStarted);

        self.abort_flag = Arc::new(AtomicBool::new(false));
        let outcome = Search::new(
            self.game.board().clone(),
            side,
            self.limits.clone(),
            self.rng.gen(),
            self.abort_flag.clone(),
        )
        .run_to_completion();

        self.emit(GameEvent::AiThinkingFinished);
        if let Some(mv) = outcome.best_move {
            self.apply_decision(AiDecision::Move {
                from: mv.from,
                to: mv.to,
            });
        }
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.abort_flag.store(true, AtomicOrdering::Relaxed);
    }
}
