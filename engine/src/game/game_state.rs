use std::collections::VecDeque;

use crate::log;
use super::session_rng::SessionRng;
use super::types::{Direction, GridCell, Position};

pub const DEFAULT_WIN_OCCUPANCY: f64 = 0.05;

/// The food cell currently on the board. `generation` counts spawns; a
/// scheduled expiry holds the generation it watched and is ignored once the
/// counter has moved on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Food {
    pub position: Position,
    pub generation: u64,
}

#[derive(Clone, Debug)]
pub struct GameState {
    rows: usize,
    columns: usize,
    grid: Vec<GridCell>,
    direction: Direction,
    snake_body: VecDeque<Position>,
    score: u32,
    game_over: bool,
    food: Option<Food>,
    food_generation: u64,
    win_occupancy: f64,
}

impl GameState {
    pub fn new(rows: usize, columns: usize, rng: &mut SessionRng) -> Result<Self, String> {
        Self::with_win_occupancy(rows, columns, DEFAULT_WIN_OCCUPANCY, rng)
    }

    pub fn with_win_occupancy(
        rows: usize,
        columns: usize,
        win_occupancy: f64,
        rng: &mut SessionRng,
    ) -> Result<Self, String> {
        if rows < 1 || columns < 1 {
            return Err("Rows and columns must be at least 1".to_string());
        }
        if !(win_occupancy > 0.0 && win_occupancy <= 1.0) {
            return Err("Win occupancy threshold must be greater than 0 and at most 1".to_string());
        }

        let mut state = Self {
            rows,
            columns,
            grid: vec![GridCell::Empty; rows * columns],
            direction: Direction::Right,
            snake_body: VecDeque::new(),
            score: 0,
            game_over: false,
            food: None,
            food_generation: 0,
            win_occupancy,
        };
        state.add_snake();
        state.add_food(rng);
        Ok(state)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn food(&self) -> Option<Food> {
        self.food
    }

    /// Cell classification at `position`; positions outside the grid read as
    /// `Out`.
    pub fn cell(&self, position: Position) -> GridCell {
        if self.outside_grid(position) {
            return GridCell::Out;
        }
        self.grid[self.index(position)]
    }

    /// Row-major view of the whole grid, the authoritative rendering surface.
    pub fn cells(&self) -> &[GridCell] {
        &self.grid
    }

    pub fn head_position(&self) -> Position {
        *self
            .snake_body
            .front()
            .expect("Snake body should never be empty")
    }

    pub fn tail_position(&self) -> Position {
        *self
            .snake_body
            .back()
            .expect("Snake body should never be empty")
    }

    /// Body cells ordered head to tail.
    pub fn snake_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.snake_body.iter().copied()
    }

    /// Replaces the movement direction unless the change would reverse the
    /// snake into its own neck. Takes effect on the next `move_snake`; the
    /// latest valid change between ticks wins.
    pub fn change_direction(&mut self, direction: Direction) {
        if self.direction.is_opposite(direction) {
            return;
        }
        self.direction = direction;
    }

    /// Advances the snake one cell. No-op once the game is over.
    pub fn move_snake(&mut self, rng: &mut SessionRng) {
        if self.game_over {
            return;
        }

        let new_head = self.head_position().translate(self.direction);
        let hit = self.hit(new_head);

        match hit {
            GridCell::Out | GridCell::Snake => {
                log!(
                    "Game over: snake hit {:?} at ({}, {})",
                    hit,
                    new_head.row,
                    new_head.column
                );
                self.kill_snake();
            }
            GridCell::Apple => {
                self.add_head(new_head);
                self.score += 1;
                log!(
                    "Ate food at ({}, {}). Score: {}",
                    new_head.row,
                    new_head.column,
                    self.score
                );
                self.add_food(rng);
            }
            _ => {
                self.remove_tail();
                self.add_head(new_head);
            }
        }
    }

    /// Clears the current food and respawns it elsewhere, but only while the
    /// game is active and `generation` still names the food on the board.
    /// Returns whether anything happened.
    pub fn expire_food(&mut self, generation: u64, rng: &mut SessionRng) -> bool {
        if self.game_over {
            return false;
        }
        match self.food {
            Some(food) if food.generation == generation => {
                self.set_cell(food.position, GridCell::Empty);
                log!(
                    "Food at ({}, {}) expired",
                    food.position.row,
                    food.position.column
                );
                self.add_food(rng);
                true
            }
            _ => false,
        }
    }

    /// Fraction of cells occupied by snake or food, compared inclusively
    /// against the configured threshold.
    pub fn check_win_condition(&self) -> bool {
        let total_cells = self.rows * self.columns;
        let occupied_cells = self
            .grid
            .iter()
            .filter(|cell| matches!(cell, GridCell::Snake | GridCell::Apple))
            .count();
        occupied_cells as f64 / total_cells as f64 >= self.win_occupancy
    }

    fn index(&self, position: Position) -> usize {
        position.row as usize * self.columns + position.column as usize
    }

    fn set_cell(&mut self, position: Position, cell: GridCell) {
        let index = self.index(position);
        self.grid[index] = cell;
    }

    fn outside_grid(&self, position: Position) -> bool {
        position.row < 0
            || position.row >= self.rows as i32
            || position.column < 0
            || position.column >= self.columns as i32
    }

    // The body is seeded tail first, so the last cell added becomes the head.
    // Grids narrower than four columns get the run clipped so the body is
    // never empty.
    fn add_snake(&mut self) {
        let row = (self.rows / 2) as i32;
        let first_column = if self.columns > 3 { 1 } else { 0 };
        let last_column = (self.columns as i32 - 1).min(first_column + 2);

        for column in first_column..=last_column {
            let position = Position::new(row, column);
            self.set_cell(position, GridCell::Snake);
            self.snake_body.push_front(position);
        }
    }

    fn empty_positions(&self) -> Vec<Position> {
        let mut empty = Vec::new();
        for row in 0..self.rows as i32 {
            for column in 0..self.columns as i32 {
                let position = Position::new(row, column);
                if self.grid[self.index(position)] == GridCell::Empty {
                    empty.push(position);
                }
            }
        }
        empty
    }

    fn add_food(&mut self, rng: &mut SessionRng) {
        let empty = self.empty_positions();
        if empty.is_empty() {
            self.food = None;
            return;
        }

        let position = empty[rng.random_range(0..empty.len())];
        self.set_cell(position, GridCell::Apple);
        self.food_generation += 1;
        self.food = Some(Food {
            position,
            generation: self.food_generation,
        });
        log!("Food spawned at ({}, {})", position.row, position.column);
    }

    fn add_head(&mut self, position: Position) {
        self.snake_body.push_front(position);
        self.set_cell(position, GridCell::Snake);
    }

    fn remove_tail(&mut self) {
        let tail = self
            .snake_body
            .pop_back()
            .expect("Snake body should never be empty");
        self.set_cell(tail, GridCell::Empty);
    }

    fn kill_snake(&mut self) {
        let body: Vec<Position> = self.snake_body.iter().copied().collect();
        for (i, position) in body.into_iter().enumerate() {
            let marker = if i == 0 {
                GridCell::DeadHead
            } else {
                GridCell::DeadBody
            };
            self.set_cell(position, marker);
        }
        self.game_over = true;
    }

    /// Resolves what the new head runs into. The current tail reads as empty
    /// because it vacates its cell on the same tick.
    fn hit(&self, new_head: Position) -> GridCell {
        if self.outside_grid(new_head) {
            return GridCell::Out;
        }
        if new_head == self.tail_position() {
            return GridCell::Empty;
        }
        self.grid[self.index(new_head)]
    }

    #[cfg(test)]
    pub(crate) fn set_food(&mut self, position: Position) {
        if let Some(food) = self.food.take() {
            self.set_cell(food.position, GridCell::Empty);
        }
        self.set_cell(position, GridCell::Apple);
        self.food_generation += 1;
        self.food = Some(Food {
            position,
            generation: self.food_generation,
        });
    }
}
