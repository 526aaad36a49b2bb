//! Tic-tac-toe, the reference environment used by the CLI, the benches and
//! the scheduler tests.

use std::fmt;

use crate::{Action, Environment, Player, Rotation};

const SIZE: usize = 3;
const CELLS: usize = SIZE * SIZE;

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone)]
pub struct TicTacToe {
    cells: [Option<Player>; CELLS],
    turn: Player,
    actions: Vec<Action>,
    winner: Option<Player>,
}

impl TicTacToe {
    pub fn new() -> Self {
        Self {
            cells: [None; CELLS],
            turn: Player::One,
            actions: Vec::with_capacity(CELLS),
            winner: None,
        }
    }

    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    fn find_winner(&self) -> Option<Player> {
        LINES.iter().find_map(|line| {
            let first = self.cells[line[0]]?;
            line.iter()
                .all(|&i| self.cells[i] == Some(first))
                .then_some(first)
        })
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for TicTacToe {
    fn reset(&mut self) {
        *self = Self::new();
    }

    fn act(&mut self, action: &Action) -> bool {
        if !self.is_legal_action(action) {
            return false;
        }
        self.cells[action.id()] = Some(action.player());
        self.actions.push(*action);
        self.turn = action.next_player();
        self.winner = self.find_winner();
        true
    }

    fn legal_actions(&self) -> Vec<Action> {
        if self.is_terminal() {
            return Vec::new();
        }
        (0..CELLS)
            .filter(|&i| self.cells[i].is_none())
            .map(|i| Action::new(i, self.turn))
            .collect()
    }

    fn is_legal_action(&self, action: &Action) -> bool {
        action.id() < CELLS
            && action.player() == self.turn
            && self.winner.is_none()
            && self.cells[action.id()].is_none()
    }

    fn is_terminal(&self) -> bool {
        self.winner.is_some() || self.cells.iter().all(Option::is_some)
    }

    fn eval_score(&self, is_resign: bool) -> f32 {
        if is_resign {
            return match self.turn {
                Player::One => -1.0,
                Player::Two => 1.0,
            };
        }
        match self.winner {
            Some(Player::One) => 1.0,
            Some(Player::Two) => -1.0,
            None => 0.0,
        }
    }

    /// Three planes: stones of the player to move, opponent stones, and a
    /// constant plane that is 1 when player one is to move.
    fn features(&self, rotation: Rotation) -> Vec<f32> {
        let mut features = vec![0.0; 3 * CELLS];
        for pos in 0..CELLS {
            let rotated = rotation.rotate_position(pos, SIZE);
            match self.cells[pos] {
                Some(p) if p == self.turn => features[rotated] = 1.0,
                Some(_) => features[CELLS + rotated] = 1.0,
                None => {}
            }
            if self.turn == Player::One {
                features[2 * CELLS + pos] = 1.0;
            }
        }
        features
    }

    fn action_features(&self, action: &Action, rotation: Rotation) -> Vec<f32> {
        let mut features = vec![0.0; CELLS];
        features[rotation.rotate_position(action.id(), SIZE)] = 1.0;
        features
    }

    fn turn(&self) -> Player {
        self.turn
    }

    fn action_history(&self) -> &[Action] {
        &self.actions
    }

    fn name(&self) -> &'static str {
        "tictactoe"
    }

    fn policy_size(&self) -> usize {
        CELLS
    }
}

impl fmt::Display for TicTacToe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..SIZE {
            for col in 0..SIZE {
                let c = match self.cells[row * SIZE + col] {
                    Some(Player::One) => 'X',
                    Some(Player::Two) => 'O',
                    None => '.',
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
