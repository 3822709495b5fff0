pub mod config;
pub mod game;
pub mod logger;

pub use config::{Difficulty, GameConfig, Validate, load_config, save_config};
pub use game::{
    DEFAULT_WIN_OCCUPANCY, Direction, Food, GameEndReason, GameObserver, GameOutcome, GameSession,
    GameSessionState, GameState, GridCell, Position, SessionCommand, SessionRng, SessionSettings,
    StateSnapshot,
};
