use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::log;
use super::game_state::GameState;
use super::session_rng::SessionRng;
use super::settings::SessionSettings;
use super::types::{Direction, GridCell, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    Turn(Direction),
    Pause,
    Resume,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEndReason {
    Collision,
    Win,
    Abandoned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameOutcome {
    pub score: u32,
    pub reason: GameEndReason,
}

/// Everything a renderer needs for one frame, keyed by `GridCell`.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    pub tick: u64,
    pub rows: usize,
    pub columns: usize,
    pub cells: Vec<GridCell>,
    pub head: Position,
    pub score: u32,
    pub game_over: bool,
}

/// Sink for per-tick snapshots, implemented by the UI driver.
pub trait GameObserver: Send + Sync + 'static {
    fn publish_state(&self, snapshot: StateSnapshot) -> impl Future<Output = ()> + Send;
}

#[derive(Clone)]
pub struct GameSessionState {
    pub game_state: Arc<Mutex<GameState>>,
    pub tick: Arc<Mutex<u64>>,
    pub rng: Arc<Mutex<SessionRng>>,
    pub tick_interval: Duration,
    pub food_expiry: Option<Duration>,
}

impl GameSessionState {
    pub fn create(settings: &SessionSettings, seed: u64) -> Result<Self, String> {
        settings.validate()?;

        let mut rng = SessionRng::new(seed);
        let game_state = GameState::with_win_occupancy(
            settings.rows,
            settings.columns,
            settings.win_occupancy,
            &mut rng,
        )?;
        log!("Created game session with seed {}", seed);

        Ok(Self {
            game_state: Arc::new(Mutex::new(game_state)),
            tick: Arc::new(Mutex::new(0u64)),
            rng: Arc::new(Mutex::new(rng)),
            tick_interval: settings.tick_interval,
            food_expiry: settings.food_expiry,
        })
    }
}

/// Watches the food cell currently on the board and clears it after the
/// configured lifetime. One watcher is alive at a time; the engine-side
/// generation check makes a stale firing a no-op, and dropping the scheduler
/// aborts the pending watcher when the session ends.
struct FoodExpiryScheduler {
    game_state: Arc<Mutex<GameState>>,
    rng: Arc<Mutex<SessionRng>>,
    expiry: Option<Duration>,
    watcher: Option<JoinHandle<()>>,
}

impl FoodExpiryScheduler {
    fn new(state: &GameSessionState) -> Self {
        Self {
            game_state: Arc::clone(&state.game_state),
            rng: Arc::clone(&state.rng),
            expiry: state.food_expiry,
            watcher: None,
        }
    }

    fn schedule(&mut self, generation: u64) {
        let Some(expiry) = self.expiry else {
            return;
        };
        self.cancel();

        let game_state = Arc::clone(&self.game_state);
        let rng = Arc::clone(&self.rng);
        self.watcher = Some(tokio::spawn(async move {
            let mut generation = generation;
            loop {
                tokio::time::sleep(expiry).await;
                let mut game_state = game_state.lock().await;
                let mut rng = rng.lock().await;
                if !game_state.expire_food(generation, &mut rng) {
                    break;
                }
                // The watcher follows its own respawn chain until the food
                // is eaten (stale generation) or the board fills up.
                match game_state.food() {
                    Some(food) => generation = food.generation,
                    None => break,
                }
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

impl Drop for FoodExpiryScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub struct GameSession;

impl GameSession {
    /// Drives the game until collision, win or abandonment. All engine
    /// mutation happens behind the session's mutex, so tick steps, turn
    /// commands and food expiry never interleave.
    pub async fn run(
        state: GameSessionState,
        mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
        observer: impl GameObserver,
    ) -> GameOutcome {
        let mut scheduler = FoodExpiryScheduler::new(&state);
        {
            let game_state = state.game_state.lock().await;
            if let Some(food) = game_state.food() {
                scheduler.schedule(food.generation);
            }
        }

        let mut tick_timer = interval(state.tick_interval);
        let mut paused = false;

        loop {
            tokio::select! {
                _ = tick_timer.tick() => {
                    if paused {
                        continue;
                    }
                    if let Some(outcome) = Self::step(&state, &mut scheduler, &observer).await {
                        return outcome;
                    }
                }
                command = command_rx.recv() => {
                    match command {
                        Some(SessionCommand::Turn(direction)) => {
                            if paused {
                                continue;
                            }
                            // A turn stops the tick source, applies the
                            // direction, advances one step and restarts the
                            // tick, so input is never swallowed mid-interval.
                            tick_timer.reset();
                            {
                                let mut game_state = state.game_state.lock().await;
                                game_state.change_direction(direction);
                            }
                            if let Some(outcome) = Self::step(&state, &mut scheduler, &observer).await {
                                return outcome;
                            }
                        }
                        Some(SessionCommand::Pause) => {
                            paused = true;
                        }
                        Some(SessionCommand::Resume) => {
                            paused = false;
                            tick_timer.reset();
                        }
                        Some(SessionCommand::Quit) | None => {
                            let game_state = state.game_state.lock().await;
                            return GameOutcome {
                                score: game_state.score(),
                                reason: GameEndReason::Abandoned,
                            };
                        }
                    }
                }
            }
        }
    }

    async fn step(
        state: &GameSessionState,
        scheduler: &mut FoodExpiryScheduler,
        observer: &impl GameObserver,
    ) -> Option<GameOutcome> {
        let mut game_state = state.game_state.lock().await;
        let mut rng = state.rng.lock().await;
        let generation_before = game_state.food().map(|food| food.generation);
        game_state.move_snake(&mut rng);
        drop(rng);

        let generation_after = game_state.food().map(|food| food.generation);
        if generation_after != generation_before
            && let Some(generation) = generation_after
        {
            scheduler.schedule(generation);
        }

        let mut tick_value = state.tick.lock().await;
        *tick_value += 1;
        let snapshot = build_snapshot(&game_state, *tick_value);
        drop(tick_value);

        let score = game_state.score();
        let game_over = game_state.is_game_over();
        let won = !game_over && game_state.check_win_condition();
        drop(game_state);

        observer.publish_state(snapshot).await;

        if game_over {
            return Some(GameOutcome {
                score,
                reason: GameEndReason::Collision,
            });
        }
        if won {
            return Some(GameOutcome {
                score,
                reason: GameEndReason::Win,
            });
        }
        None
    }
}

fn build_snapshot(game_state: &GameState, tick: u64) -> StateSnapshot {
    StateSnapshot {
        tick,
        rows: game_state.rows(),
        columns: game_state.columns(),
        cells: game_state.cells().to_vec(),
        head: game_state.head_position(),
        score: game_state.score(),
        game_over: game_state.is_game_over(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingObserver {
        snapshots: Arc<StdMutex<Vec<StateSnapshot>>>,
    }

    impl RecordingObserver {
        fn new() -> (Self, Arc<StdMutex<Vec<StateSnapshot>>>) {
            let snapshots = Arc::new(StdMutex::new(Vec::new()));
            (
                Self {
                    snapshots: Arc::clone(&snapshots),
                },
                snapshots,
            )
        }
    }

    impl GameObserver for RecordingObserver {
        async fn publish_state(&self, snapshot: StateSnapshot) {
            self.snapshots.lock().unwrap().push(snapshot);
        }
    }

    fn create_settings(rows: usize, columns: usize) -> SessionSettings {
        SessionSettings {
            rows,
            columns,
            tick_interval: Duration::from_millis(50),
            food_expiry: None,
            win_occupancy: 0.9,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_runs_to_collision() {
        let state = GameSessionState::create(&create_settings(15, 15), 42).unwrap();
        let (_command_tx, command_rx) = mpsc::unbounded_channel();
        let (observer, snapshots) = RecordingObserver::new();

        let outcome = GameSession::run(state, command_rx, observer).await;

        assert_eq!(outcome.reason, GameEndReason::Collision);
        let snapshots = snapshots.lock().unwrap();
        assert!(!snapshots.is_empty());
        assert!(snapshots.last().unwrap().game_over);
        assert_eq!(snapshots.last().unwrap().tick, snapshots.len() as u64);
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_command_applies_immediately() {
        let mut settings = create_settings(15, 15);
        settings.tick_interval = Duration::from_millis(5000);
        let state = GameSessionState::create(&settings, 42).unwrap();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (observer, _) = RecordingObserver::new();

        let handle = tokio::spawn(GameSession::run(state.clone(), command_rx, observer));

        // The first interval tick fires right away and moves the head to
        // (7, 4); the turn then advances one more step without waiting for
        // the next tick.
        tokio::time::sleep(Duration::from_millis(100)).await;
        command_tx.send(SessionCommand::Turn(Direction::Up)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let head = state.game_state.lock().await.head_position();
        assert_eq!(head, Position::new(6, 4));

        command_tx.send(SessionCommand::Quit).unwrap();
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.reason, GameEndReason::Abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume_gate_ticking() {
        let state = GameSessionState::create(&create_settings(15, 15), 42).unwrap();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (observer, _) = RecordingObserver::new();

        let handle = tokio::spawn(GameSession::run(state.clone(), command_rx, observer));

        command_tx.send(SessionCommand::Pause).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let head_paused = state.game_state.lock().await.head_position();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(state.game_state.lock().await.head_position(), head_paused);

        command_tx.send(SessionCommand::Resume).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_ne!(state.game_state.lock().await.head_position(), head_paused);

        command_tx.send(SessionCommand::Quit).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_food_expiry_respawns_uneaten_food() {
        let mut settings = create_settings(15, 15);
        settings.tick_interval = Duration::from_millis(5000);
        settings.food_expiry = Some(Duration::from_millis(1000));
        let state = GameSessionState::create(&settings, 42).unwrap();
        state
            .game_state
            .lock()
            .await
            .set_food(Position::new(0, 0));
        let watched_generation = state.game_state.lock().await.food().unwrap().generation;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (observer, _) = RecordingObserver::new();

        let handle = tokio::spawn(GameSession::run(state.clone(), command_rx, observer));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let food = state.game_state.lock().await.food().unwrap();
        assert!(food.generation > watched_generation);

        command_tx.send(SessionCommand::Quit).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_abandons_session() {
        let state = GameSessionState::create(&create_settings(15, 15), 42).unwrap();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        drop(command_tx);
        let (observer, _) = RecordingObserver::new();

        let outcome = GameSession::run(state, command_rx, observer).await;
        assert_eq!(outcome.reason, GameEndReason::Abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_reports_win() {
        let settings = SessionSettings {
            rows: 5,
            columns: 5,
            tick_interval: Duration::from_millis(50),
            food_expiry: None,
            win_occupancy: 0.16,
        };
        let state = GameSessionState::create(&settings, 42).unwrap();
        // Pin the food out of the way so the first step neither eats nor
        // collides; 3 snake cells + 1 apple on 25 cells is exactly the
        // configured occupancy.
        state
            .game_state
            .lock()
            .await
            .set_food(Position::new(0, 0));
        let (_command_tx, command_rx) = mpsc::unbounded_channel();
        let (observer, _) = RecordingObserver::new();

        let outcome = GameSession::run(state, command_rx, observer).await;
        assert_eq!(outcome.reason, GameEndReason::Win);
        assert_eq!(outcome.score, 0);
    }
}
