//! Game-side vocabulary shared by the search and the self-play scheduler.
//!
//! The search never looks inside a game: it only needs actions, the player to
//! move, legality, terminal detection and a feature encoding. Everything else
//! stays behind the [`Environment`] trait.

use std::fmt;

mod rotation;
pub mod tictactoe;

pub use rotation::Rotation;
pub use tictactoe::TicTacToe;

/// Side to move. Only two-player games are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// The opponent of this player
    pub fn next(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Letter used for this player in game records
    pub fn to_char(self) -> char {
        match self {
            Player::One => 'B',
            Player::Two => 'W',
        }
    }

    pub fn from_char(c: char) -> Option<Player> {
        match c {
            'B' | 'b' => Some(Player::One),
            'W' | 'w' => Some(Player::Two),
            _ => None,
        }
    }
}

/// A move: action id plus the player making it.
///
/// Ordering compares the id first, which is the canonical tie-break order used
/// when ranking candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action {
    id: usize,
    player: Player,
}

impl Action {
    pub fn new(id: usize, player: Player) -> Self {
        Self { id, player }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn player(&self) -> Player {
        self.player
    }

    /// Player to move once this action has been played
    pub fn next_player(&self) -> Player {
        self.player.next()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.player.to_char(), self.id)
    }
}

/// Rules engine for one game instance.
///
/// Implementations are cloned freely by the search (one copy per simulation
/// replay), so they should be cheap to clone.
pub trait Environment: Clone + Send + fmt::Display + 'static {
    /// Start a fresh game
    fn reset(&mut self);

    /// Play `action`. Returns `false` and leaves the state untouched when the
    /// action is illegal.
    fn act(&mut self, action: &Action) -> bool;

    fn legal_actions(&self) -> Vec<Action>;

    fn is_legal_action(&self, action: &Action) -> bool;

    fn is_terminal(&self) -> bool;

    /// Game result from [`Player::One`]'s point of view, in `[-1, 1]`.
    ///
    /// With `is_resign` set the player to move is treated as having resigned.
    fn eval_score(&self, is_resign: bool) -> f32;

    fn features(&self, rotation: Rotation) -> Vec<f32>;

    fn action_features(&self, action: &Action, rotation: Rotation) -> Vec<f32>;

    fn turn(&self) -> Player;

    fn action_history(&self) -> &[Action];

    /// Short game name, written into records
    fn name(&self) -> &'static str;

    /// Size of the flat action space (number of distinct action ids)
    fn policy_size(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_alternates() {
        assert_eq!(Player::One.next(), Player::Two);
        assert_eq!(Player::Two.next(), Player::One);
    }

    #[test]
    fn player_char_round_trip() {
        for p in [Player::One, Player::Two] {
            assert_eq!(Player::from_char(p.to_char()), Some(p));
        }
        assert_eq!(Player::from_char('x'), None);
    }

    #[test]
    fn actions_order_by_id_first() {
        let a = Action::new(3, Player::Two);
        let b = Action::new(5, Player::One);
        assert!(a < b);
        assert_eq!(a.next_player(), Player::One);
        assert_eq!(b.to_string(), "B5");
    }
}
