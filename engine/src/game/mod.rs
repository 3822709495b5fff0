mod game_state;
mod session;
mod session_rng;
mod settings;
mod types;

pub use game_state::{DEFAULT_WIN_OCCUPANCY, Food, GameState};
pub use session::{
    GameEndReason, GameObserver, GameOutcome, GameSession, GameSessionState, SessionCommand,
    StateSnapshot,
};
pub use session_rng::SessionRng;
pub use settings::SessionSettings;
pub use types::{Direction, GridCell, Position};
