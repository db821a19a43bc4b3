use std::time::Duration;

use saktris_core::settings::AiDifficulty;

/// Hard cap on evaluated nodes per search.
pub const DEFAULT_MAX_NODES: u64 = 200_000;

/// How many nodes the cooperative driver evaluates per host frame before
/// yielding.
pub const YIELD_EVERY_N_NODES: u64 = 50;

/// Wall-clock budget per search. Browsers get a tighter budget to keep the
/// frame loop responsive.
#[cfg(target_arch = "wasm32")]
pub const SEARCH_TIME_BUDGET: Duration = Duration::from_secs(3);
#[cfg(not(target_arch = "wasm32"))]
pub const SEARCH_TIME_BUDGET: Duration = Duration::from_secs(5);

/// The abort guards for a single search: depth, node count, wall time.
#[derive(Debug, Clone)]
pub struct SearchLimits {
    pub max_depth: u32,
    pub node_budget: u64,
    pub time_budget: Duration,
}

impl SearchLimits {
    pub fn for_difficulty(difficulty: AiDifficulty) -> Self {
        let max_depth = match difficulty {
            AiDifficulty::Easy => 1,
            AiDifficulty::Medium => 3,
            AiDifficulty::Hard => 4,
        };

        Self {
            max_depth,
            node_budget: DEFAULT_MAX_NODES,
            time_budget: SEARCH_TIME_BUDGET,
        }
    }
}
