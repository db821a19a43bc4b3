//! The native parallel search driver.
//!
//! A worker thread receives an immutable snapshot of the board plus the
//! search limits, runs the synchronous search to completion or abort, and
//! deposits the result on a channel. The main loop polls for completion
//! frame by frame. Cancellation is a generation counter: results from a
//! cancelled generation are discarded on receipt.

use std::sync::{
    atomic::AtomicBool,
    mpsc::{self, Receiver, Sender},
    Arc,
};

use saktris_core::board::{Board, Side};
use threadpool::ThreadPool;

use crate::{
    search::{Search, SearchOutcome},
    search_limits::SearchLimits,
};

pub struct SearchThread {
    tx: Sender<(SearchOutcome, u64)>,
    rx: Receiver<(SearchOutcome, u64)>,
    thread_pool: ThreadPool,

    outstanding_request: bool,
    search_gen: u64,
}

impl SearchThread {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let thread_pool = ThreadPool::new(1);

        Self {
            tx,
            rx,
            thread_pool,
            outstanding_request: false,
            search_gen: 0,
        }
    }

    pub fn searching(&self) -> bool {
        self.outstanding_request
    }

    /// Ships a board snapshot to the worker. The worker owns its copy
    /// outright; the only shared state is the abort flag.
    pub fn send_search_request(
        &mut self,
        board: Board,
        side: Side,
        limits: SearchLimits,
        seed: u64,
        abort_flag: Arc<AtomicBool>,
    ) {
        let tx = self.tx.clone();
        self.search_gen += 1;
        let search_gen = self.search_gen;

        self.thread_pool.execute(move || {
            let outcome = Search::new(board, side, limits, seed, abort_flag).run_to_completion();
            let _ = tx.send((outcome, search_gen));
        });

        self.outstanding_request = true;
    }

    /// Invalidates any in-flight request. The worker still runs to
    /// completion (or abort via the flag); its result is dropped on arrival.
    pub fn cancel(&mut self) {
        self.search_gen += 1;
        self.outstanding_request = false;
    }

    pub fn try_receive(&mut self) -> Option<SearchOutcome> {
        while let Ok((outcome, search_gen)) = self.rx.try_recv() {
            if search_gen == self.search_gen {
                self.outstanding_request = false;
                return Some(outcome);
            }
        }

        None
    }
}

impl Default for SearchThread {
    fn default() -> Self {
        Self::new()
    }
}
