//! Events emitted by the game state.
//!
//! Events are notifications, not state: everything they carry can be
//! reconstructed from a snapshot, so a UI attached to a loaded game renders
//! correctly without replaying them. Rejected commands emit nothing.

use std::time::Duration;

use crate::board::{MoveRecord, Piece, PieceKind, Side, Square};
use crate::game::{GameOverReason, GameStatus};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    /// The given player is now to move (turn-based modes).
    TurnChanged(Side),
    StatusChanged(GameStatus),
    /// Terminal. `winner` is [`None`] for draws.
    GameOver {
        winner: Option<Side>,
        reason: GameOverReason,
    },
    MoveExecuted(MoveRecord),
    /// A pawn reached its promotion rank; the turn is held until
    /// `complete_promotion` is called.
    PromotionNeeded { square: Square, side: Side },

    /// A queued piece became the side's current piece.
    PieceArrived { side: Side, piece: PieceKind },
    /// A current piece was placed on the back row (turn-based modes).
    PiecePlaced {
        side: Side,
        square: Square,
        piece: Piece,
    },

    AiTurnStarted,
    AiThinkingStarted,
    AiThinkingFinished,
    /// Rough fraction of the search completed, in `0.0..=1.0`.
    AiProgress(f32),
    AiMoveMade(MoveRecord),

    /// A triplet is about to be cleared: the three squares, the victim square
    /// beyond the far end (if any), and the push direction as a file/rank
    /// delta.
    TripletClearing {
        triple: [Square; 3],
        victim: Option<Square>,
        direction: (i8, i8),
    },

    ClockTimeUpdated { white: Duration, black: Duration },
    ClockLowTime { side: Side, remaining: Duration },

    ActionCooldownUpdated {
        side: Side,
        remaining: Duration,
        max: Duration,
    },
    /// An auto-placement for `side` is imminent.
    ActionArrivalWarning { side: Side, seconds: f32 },
    ActionPieceAutoPlaced {
        side: Side,
        column: u8,
        piece: PieceKind,
    },
    /// A piece was pushed off the board by a column bump, or a pawn reached
    /// the far rank in Action mode.
    ActionPieceBumpedOff { square: Square, piece: Piece },
}
