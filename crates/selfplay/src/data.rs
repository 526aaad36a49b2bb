use std::collections::BTreeMap;
use std::fmt;

use zeroplay_core::{Action, Environment, Player, Rotation};

use crate::error::{Result, SelfPlayError};

/// Record of a single episode
///
/// Serialized as one line: `(` then the tags `KEY[value]` in key order, then
/// one `P[id|distribution]` per ply, then `)`. `P` is the mover's letter and
/// the distribution is a comma list of `id:count` (empty when every visit went
/// to the played action).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameRecord {
    tags: BTreeMap<String, String>,
    plies: Vec<(Action, String)>,
}

impl GameRecord {
    /// Empty record for the named environment, result 0
    pub fn new(env_name: &str) -> Self {
        let mut record = Self::default();
        record.add_tag("GM", env_name);
        record.add_tag("RE", "0");
        record
    }

    /// Record of the episode played so far in `env`
    ///
    /// `distributions[i]` belongs to the i-th action of the history; missing
    /// entries are left empty.
    pub fn from_environment<E: Environment>(
        env: &E,
        distributions: &[String],
        is_resign: bool,
    ) -> Self {
        let mut record = Self::new(env.name());
        for (i, action) in env.action_history().iter().enumerate() {
            let distribution = distributions.get(i).cloned().unwrap_or_default();
            record.add_ply(*action, distribution);
        }
        record.add_tag("RE", &env.eval_score(is_resign).to_string());
        record.add_tag("RS", if is_resign { "1" } else { "0" });
        record
    }

    pub fn add_tag(&mut self, key: &str, value: &str) {
        self.tags.insert(key.to_string(), value.to_string());
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn add_ply(&mut self, action: Action, distribution: String) {
        self.plies.push((action, distribution));
    }

    pub fn plies(&self) -> &[(Action, String)] {
        &self.plies
    }

    /// Get the number of moves in this game
    pub fn len(&self) -> usize {
        self.plies.len()
    }

    /// Check if the record is empty
    pub fn is_empty(&self) -> bool {
        self.plies.is_empty()
    }

    /// Final score from player one's point of view
    pub fn result(&self) -> Option<f32> {
        self.tag("RE")?.parse().ok()
    }

    pub fn is_resign(&self) -> bool {
        self.tag("RS") == Some("1")
    }

    /// Normalized visit distribution of ply `index` as a training target
    ///
    /// An empty distribution means the search was concentrated on the played
    /// action, which then gets probability 1.
    pub fn policy_distribution(
        &self,
        index: usize,
        policy_size: usize,
        board_size: usize,
        rotation: Rotation,
    ) -> Result<Vec<f32>> {
        let (action, distribution) = self
            .plies
            .get(index)
            .ok_or_else(|| SelfPlayError::Record(format!("no ply {index}")))?;

        let mut policy = vec![0.0; policy_size];
        let mut place = |id: usize, weight: f32| -> Result<()> {
            let pos = rotation.rotate_position(id, board_size);
            let slot = policy
                .get_mut(pos)
                .ok_or_else(|| SelfPlayError::Record(format!("action {id} out of range")))?;
            *slot = weight;
            Ok(())
        };

        if distribution.is_empty() {
            place(action.id(), 1.0)?;
            return Ok(policy);
        }

        let mut total = 0.0;
        for entry in distribution.split(',') {
            let (id, count) = entry
                .split_once(':')
                .ok_or_else(|| SelfPlayError::Record(format!("bad distribution entry {entry:?}")))?;
            let id: usize = id
                .parse()
                .map_err(|_| SelfPlayError::Record(format!("bad action id {id:?}")))?;
            let count: f32 = count
                .parse()
                .map_err(|_| SelfPlayError::Record(format!("bad visit count {count:?}")))?;
            place(id, count)?;
            total += count;
        }
        if total > 0.0 {
            for p in &mut policy {
                *p /= total;
            }
        }
        Ok(policy)
    }

    /// Parse the single-line format produced by `Display`
    pub fn parse(content: &str) -> Result<Self> {
        let start = content
            .find('(')
            .ok_or_else(|| SelfPlayError::Record("missing '('".to_string()))?;
        let mut rest = &content[start + 1..];
        let mut record = Self::default();

        loop {
            if rest.starts_with(')') {
                return Ok(record);
            }
            let open = rest
                .find('[')
                .ok_or_else(|| SelfPlayError::Record("missing '['".to_string()))?;
            let close = rest
                .find(']')
                .ok_or_else(|| SelfPlayError::Record("missing ']'".to_string()))?;
            if close < open {
                return Err(SelfPlayError::Record("unbalanced brackets".to_string()));
            }
            let key = &rest[..open];
            let value = &rest[open + 1..close];

            match single_player_key(key) {
                Some(player) => {
                    let (id, distribution) = value.split_once('|').unwrap_or((value, ""));
                    let id = id
                        .parse()
                        .map_err(|_| SelfPlayError::Record(format!("bad action id {id:?}")))?;
                    record.add_ply(Action::new(id, player), distribution.to_string());
                }
                None => record.add_tag(key, value),
            }

            rest = &rest[close + 1..];
            if rest.is_empty() {
                return Err(SelfPlayError::Record("missing ')'".to_string()));
            }
        }
    }
}

fn single_player_key(key: &str) -> Option<Player> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Player::from_char(c),
        _ => None,
    }
}

impl fmt::Display for GameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (key, value) in &self.tags {
            write!(f, "{key}[{value}]")?;
        }
        for (action, distribution) in &self.plies {
            write!(
                f,
                "{}[{}|{}]",
                action.player().to_char(),
                action.id(),
                distribution
            )?;
        }
        write!(f, ")")
    }
}
