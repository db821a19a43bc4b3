//! Minimax search with alpha-beta pruning.
//!
//! The search is a resumable explicit-stack negamax: one implementation
//! serves both concurrency variants. The cooperative driver steps it a
//! handful of nodes per host frame; the synchronous variant (used by the
//! worker thread and Action mode) just steps it to completion. The search
//! owns a clone of the board and walks it with make/undo -- it never touches
//! live game state.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        Arc,
    },
    time::{Duration, Instant},
};

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha12Rng;
use saktris_core::board::{Board, Move, MoveVec, PieceKind, Side, UnmakeData};

use crate::{evaluation::evaluate, score::Score, search_limits::SearchLimits};

/// How often (in nodes) the wall-clock guard actually reads the clock.
const TIME_CHECK_INTERVAL: u64 = 512;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes_evaluated: u64,
    pub depth_completed: u32,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The chosen move. On abort with no completed depth this falls back to
    /// the first legal move after the seeded root shuffle; it is only `None`
    /// when the side has no legal moves at all.
    pub best_move: Option<Move>,
    pub score: Score,
    pub stats: SearchStats,
    pub elapsed: Duration,
    pub aborted: bool,
}

/// One step of a cooperative search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchStep {
    /// More work remains; the payload is a rough completion fraction.
    InProgress(f32),
    Done,
}

/// An in-flight node of the search tree.
struct Frame {
    depth: u32,
    alpha: Score,
    beta: Score,
    side: Side,
    moves: MoveVec,
    next: usize,
    best_score: Score,
    best_move: Option<Move>,
    /// Undo data for the move currently being explored beneath this node.
    applied: Option<UnmakeData>,
}

/// A resumable search over a snapshot of the board.
pub struct Search {
    board: Board,
    side: Side,
    limits: SearchLimits,
    start_time: Instant,
    abort_flag: Arc<AtomicBool>,

    root_moves: MoveVec,
    stack: Vec<Frame>,
    current_depth: u32,

    best_move: Option<Move>,
    best_score: Score,
    stats: SearchStats,
    aborted: bool,
    done: bool,
}

impl Search {
    /// Prepares a search for `side` on a snapshot of `board`. Root moves are
    /// shuffled with the seeded RNG so equal-scoring moves vary between
    /// games but not between runs.
    pub fn new(
        board: Board,
        side: Side,
        limits: SearchLimits,
        seed: u64,
        abort_flag: Arc<AtomicBool>,
    ) -> Self {
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let mut root_moves = board.legal_moves_for(side);
        root_moves.shuffle(&mut rng);

        let done = root_moves.is_empty();

        Self {
            board,
            side,
            limits,
            start_time: Instant::now(),
            abort_flag,
            root_moves,
            stack: Vec::new(),
            current_depth: 1,
            best_move: None,
            best_score: -Score::INF,
            stats: SearchStats::default(),
            aborted: false,
            done,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Evaluates up to `node_quota` nodes, then yields. Yield points are
    /// node boundaries only, so the search can always resume safely.
    pub fn step(&mut self, node_quota: u64) -> SearchStep {
        let mut processed = 0u64;

        while !self.done && processed < node_quota {
            if self.should_abort() {
                self.abort_unwind();
                break;
            }

            if self.stack.is_empty() {
                self.enter_root(&mut processed);
            } else {
                self.advance_top(&mut processed);
            }
        }

        if self.done {
            SearchStep::Done
        } else {
            SearchStep::InProgress(self.progress())
        }
    }

    /// Runs the search to completion or abort. This is the synchronous
    /// variant used by the worker thread.
    pub fn run_to_completion(mut self) -> SearchOutcome {
        while !self.done {
            let _ = self.step(u64::MAX);
        }
        self.outcome()
    }

    /// The result so far. Meaningful once [`Self::is_done`]; also used for
    /// the abort fallback.
    pub fn outcome(&self) -> SearchOutcome {
        SearchOutcome {
            best_move: self.best_move.or_else(|| self.root_moves.first().copied()),
            score: self.best_score,
            stats: self.stats,
            elapsed: self.start_time.elapsed(),
            aborted: self.aborted,
        }
    }

    fn progress(&self) -> f32 {
        let root_fraction = self
            .stack
            .first()
            .map(|root| root.next as f32 / root.moves.len().max(1) as f32)
            .unwrap_or(0.0);

        (((self.current_depth - 1) as f32 + root_fraction) / self.limits.max_depth.max(1) as f32)
            .clamp(0.0, 1.0)
    }

    /// Search moves auto-promote to queen; the game resolves interactive
    /// promotions separately.
    fn prepared(mut mv: Move) -> Move {
        if mv.reaches_promotion_rank() {
            mv.promotion = Some(PieceKind::Queen);
        }
        mv
    }

    fn enter_root(&mut self, processed: &mut u64) {
        self.stats.nodes_evaluated += 1;
        *processed += 1;

        self.stack.push(Frame {
            depth: self.current_depth,
            alpha: -Score::INF,
            beta: Score::INF,
            side: self.side,
            moves: self.root_moves.clone(),
            next: 0,
            best_score: -Score::INF,
            best_move: None,
            applied: None,
        });
    }

    fn advance_top(&mut self, processed: &mut u64) {
        let next_child = {
            let Some(frame) = self.stack.last_mut() else {
                return;
            };
            if frame.next < frame.moves.len() {
                let mv = Self::prepared(frame.moves[frame.next]);
                frame.next += 1;
                Some((mv, frame.depth - 1, -frame.beta, -frame.alpha, frame.side.flip()))
            } else {
                None
            }
        };

        match next_child {
            Some((mv, depth, alpha, beta, side)) => {
                let undo = self.board.make_move(mv);
                if let Some(frame) = self.stack.last_mut() {
                    frame.applied = Some(undo);
                }
                self.enter_node(depth, alpha, beta, side, processed);
            }
            None => {
                // This node has seen all its children.
                let Some(frame) = self.stack.pop() else {
                    return;
                };
                if self.stack.is_empty() {
                    self.finish_depth(frame.best_score, frame.best_move);
                } else {
                    self.fold(frame.best_score);
                }
            }
        }
    }

    /// Visits a node below the current top of stack: either evaluates it as
    /// a leaf/terminal, or pushes a frame for it.
    fn enter_node(
        &mut self,
        depth: u32,
        alpha: Score,
        beta: Score,
        side: Side,
        processed: &mut u64,
    ) {
        self.stats.nodes_evaluated += 1;
        *processed += 1;

        if depth == 0 {
            let score = evaluate(&self.board, side);
            self.fold(score);
            return;
        }

        let moves = self.board.legal_moves_for(side);
        if moves.is_empty() {
            let ply = self.stack.len() as u32;
            let score = if self.board.is_in_check(side) {
                -Score::mate_in_plies(ply)
            } else {
                Score::ZERO
            };
            self.fold(score);
            return;
        }

        self.stack.push(Frame {
            depth,
            alpha,
            beta,
            side,
            moves,
            next: 0,
            best_score: -Score::INF,
            best_move: None,
            applied: None,
        });
    }

    /// Folds a completed child's score (from the child's perspective) into
    /// its parent, cascading beta cutoffs upward.
    fn fold(&mut self, mut score: Score) {
        loop {
            // Take the undo out first so the board borrow does not overlap
            // the frame borrow.
            let undo = match self.stack.last_mut() {
                Some(parent) => parent.applied.take(),
                None => return,
            };
            if let Some(undo) = undo {
                self.board.undo_move(undo);
            }

            let Some(parent) = self.stack.last_mut() else {
                return;
            };

            let value = -score;
            let mv = parent.moves[parent.next - 1];
            if value > parent.best_score {
                parent.best_score = value;
                parent.best_move = Some(mv);
            }
            if value > parent.alpha {
                parent.alpha = value;
            }

            if parent.alpha >= parent.beta {
                // Fail-high: this whole node is done.
                let Some(frame) = self.stack.pop() else {
                    return;
                };
                score = frame.best_score;
                if self.stack.is_empty() {
                    self.finish_depth(frame.best_score, frame.best_move);
                    return;
                }
                continue;
            }

            return;
        }
    }

    fn finish_depth(&mut self, score: Score, best: Option<Move>) {
        if best.is_some() {
            self.best_move = best;
            self.best_score = score;
        }
        self.stats.depth_completed = self.current_depth;
        self.current_depth += 1;

        // A found forced mate cannot improve with more depth.
        if self.current_depth > self.limits.max_depth || self.best_score.is_winning_mate() {
            self.done = true;
        }
    }

    fn should_abort(&mut self) -> bool {
        if self.aborted {
            return true;
        }

        if self.stats.nodes_evaluated >= self.limits.node_budget
            || self.abort_flag.load(AtomicOrdering::Relaxed)
        {
            self.aborted = true;
            return true;
        }

        // Avoid clock syscalls on every node.
        if self.stats.nodes_evaluated % TIME_CHECK_INTERVAL == 0
            && self.start_time.elapsed() >= self.limits.time_budget
        {
            self.aborted = true;
            return true;
        }

        false
    }

    /// Pops every in-flight frame, undoing its applied move, so the board
    /// clone is left coherent after an abort.
    fn abort_unwind(&mut self) {
        while let Some(mut frame) = self.stack.pop() {
            if let Some(undo) = frame.applied.take() {
                self.board.undo_move(undo);
            }
        }
        self.done = true;
    }
}
