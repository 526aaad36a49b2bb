use zeroplay_core::{Action, Environment, Player};
use zeroplay_nn::NetworkOutput;

use crate::expansion::{rank_candidates, ActionCandidate};

/// Candidates for a single-step network: legal actions of the transitioned
/// position only, ranked by prior.
pub fn single_step_candidates<E: Environment>(
    env_transition: &E,
    output: &NetworkOutput,
) -> Vec<ActionCandidate> {
    let turn = env_transition.turn();
    let mut candidates: Vec<ActionCandidate> = output
        .policy
        .iter()
        .zip(&output.policy_logits)
        .enumerate()
        .map(|(id, (&p, &logit))| ActionCandidate::new(Action::new(id, turn), p, logit))
        .filter(|c| env_transition.is_legal_action(&c.action))
        .collect();
    rank_candidates(&mut candidates);
    candidates
}

/// Candidates for a latent-dynamics network.
///
/// Inside the tree every action id is reachable since the model has no rules;
/// `root_env` restricts the list to legal actions when expanding the root.
pub fn latent_candidates<E: Environment>(
    turn: Player,
    root_env: Option<&E>,
    output: &NetworkOutput,
) -> Vec<ActionCandidate> {
    let mut candidates: Vec<ActionCandidate> = output
        .policy
        .iter()
        .zip(&output.policy_logits)
        .enumerate()
        .map(|(id, (&p, &logit))| ActionCandidate::new(Action::new(id, turn), p, logit))
        .filter(|c| root_env.map_or(true, |env| env.is_legal_action(&c.action)))
        .collect();
    rank_candidates(&mut candidates);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeroplay_core::TicTacToe;

    fn output(logits: Vec<f32>) -> NetworkOutput {
        NetworkOutput::from_logits(logits, 0.0)
    }

    #[test]
    fn single_step_keeps_only_legal_actions() {
        let mut env = TicTacToe::new();
        env.act(&Action::new(4, Player::One));

        let mut logits = vec![0.0; 9];
        logits[4] = 10.0;
        logits[8] = 2.0;
        let candidates = single_step_candidates(&env, &output(logits));

        assert_eq!(candidates.len(), 8);
        assert!(candidates.iter().all(|c| c.action.id() != 4));
        assert!(candidates.iter().all(|c| c.action.player() == Player::Two));
        assert_eq!(candidates[0].action.id(), 8);
        // Remaining equal priors fall back to ascending id
        assert_eq!(candidates[1].action.id(), 0);
        assert_eq!(candidates[2].action.id(), 1);
    }

    #[test]
    fn latent_candidates_cover_full_action_space_below_root() {
        let out = output(vec![0.0; 9]);
        let candidates = latent_candidates::<TicTacToe>(Player::Two, None, &out);
        assert_eq!(candidates.len(), 9);
        assert!(candidates.iter().all(|c| c.action.player() == Player::Two));
    }

    #[test]
    fn latent_candidates_at_root_are_legal_only() {
        let mut env = TicTacToe::new();
        env.act(&Action::new(0, Player::One));
        env.act(&Action::new(1, Player::Two));

        let candidates = latent_candidates(env.turn(), Some(&env), &output(vec![0.0; 9]));
        assert_eq!(candidates.len(), 7);
    }
}
