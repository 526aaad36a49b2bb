use rand::Rng;
use rand_distr::{Distribution, Gamma, Gumbel};

use crate::config::RootNoise;
use crate::error::{MctsError, Result};
use crate::tree::{NodeId, SearchTree};

/// Perturb the children of `node` with the configured root noise
///
/// - Dirichlet: P' = (1-ε)*P + ε*noise
/// - Gumbel: logit' = logit + g, g ~ Gumbel(0, 1)
///
/// Only applied to the root, right after it is expanded.
pub fn add_noise_to_children<R: Rng + ?Sized>(
    tree: &mut SearchTree,
    node: NodeId,
    noise: &RootNoise,
    rng: &mut R,
) -> Result<()> {
    let children = tree.node(node).children();
    if children.is_empty() {
        return Ok(());
    }

    match *noise {
        RootNoise::None => {}
        RootNoise::Dirichlet { alpha, epsilon } => {
            let samples = sample_dirichlet(alpha, children.len(), rng)?;
            for (child_id, eta) in children.zip(samples) {
                let child = tree.node_mut(child_id);
                child.policy_noise = eta;
                child.policy = (1.0 - epsilon) * child.policy + epsilon * eta;
            }
        }
        RootNoise::Gumbel => {
            let samples = sample_gumbel(children.len(), rng)?;
            for (child_id, g) in children.zip(samples) {
                let child = tree.node_mut(child_id);
                child.policy_noise = g;
                child.policy_logit += g;
            }
        }
    }
    Ok(())
}

/// Sample a symmetric Dirichlet vector through normalized Gamma draws
pub fn sample_dirichlet<R: Rng + ?Sized>(alpha: f32, size: usize, rng: &mut R) -> Result<Vec<f32>> {
    let gamma = Gamma::new(alpha, 1.0).map_err(|e| MctsError::NoiseError(e.to_string()))?;
    let mut samples: Vec<f32> = (0..size).map(|_| gamma.sample(rng)).collect();
    let sum: f32 = samples.iter().sum();
    if sum < f32::MIN_POSITIVE {
        return Ok(samples);
    }
    for s in &mut samples {
        *s /= sum;
    }
    Ok(samples)
}

pub fn sample_gumbel<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Result<Vec<f32>> {
    let gumbel = Gumbel::new(0.0f32, 1.0).map_err(|e| MctsError::NoiseError(e.to_string()))?;
    Ok((0..size).map(|_| gumbel.sample(rng)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SearchNode;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use zeroplay_core::{Action, Player};

    fn root_with_priors(priors: &[f32]) -> SearchTree {
        let mut tree = SearchTree::new(1, priors.len());
        tree.allocate_children(
            SearchTree::ROOT,
            priors
                .iter()
                .enumerate()
                .map(|(i, &p)| SearchNode::new_child(Action::new(i, Player::One), p, p.ln())),
        );
        tree
    }

    fn priors(tree: &SearchTree) -> Vec<f32> {
        tree.root().children().map(|id| tree.node(id).policy).collect()
    }

    fn logits(tree: &SearchTree) -> Vec<f32> {
        tree.root()
            .children()
            .map(|id| tree.node(id).policy_logit)
            .collect()
    }

    #[test]
    fn test_dirichlet_noise_changes_priors_only() {
        let mut tree = root_with_priors(&[1.0 / 3.0; 3]);
        let original_priors = priors(&tree);
        let original_logits = logits(&tree);
        let mut rng = StdRng::seed_from_u64(7);

        let noise = RootNoise::Dirichlet {
            alpha: 0.3,
            epsilon: 0.25,
        };
        add_noise_to_children(&mut tree, SearchTree::ROOT, &noise, &mut rng).unwrap();

        let new_priors = priors(&tree);
        assert!(original_priors
            .iter()
            .zip(&new_priors)
            .any(|(o, n)| (o - n).abs() > 1e-6));
        assert_relative_eq!(new_priors.iter().sum::<f32>(), 1.0, epsilon = 0.01);
        assert_eq!(logits(&tree), original_logits);
    }

    #[test]
    fn test_gumbel_noise_changes_logits_only() {
        let mut tree = root_with_priors(&[0.5, 0.3, 0.2]);
        let original_priors = priors(&tree);
        let original_logits = logits(&tree);
        let mut rng = StdRng::seed_from_u64(7);

        add_noise_to_children(&mut tree, SearchTree::ROOT, &RootNoise::Gumbel, &mut rng).unwrap();

        assert_eq!(priors(&tree), original_priors);
        let new_logits = logits(&tree);
        for (i, id) in tree.root().children().enumerate() {
            let child = tree.node(id);
            assert_relative_eq!(new_logits[i], original_logits[i] + child.policy_noise);
        }
        assert!(tree.root().children().any(|id| tree.node(id).policy_noise != 0.0));
    }

    #[test]
    fn test_no_noise_is_a_no_op() {
        let mut tree = root_with_priors(&[0.5, 0.5]);
        let mut rng = StdRng::seed_from_u64(1);
        add_noise_to_children(&mut tree, SearchTree::ROOT, &RootNoise::None, &mut rng).unwrap();
        assert_eq!(priors(&tree), vec![0.5, 0.5]);
        assert!(tree.root().children().all(|id| tree.node(id).policy_noise == 0.0));
    }

    #[test]
    fn test_noise_no_children() {
        let mut tree = SearchTree::new(1, 1);
        let mut rng = StdRng::seed_from_u64(1);
        let noise = RootNoise::Dirichlet {
            alpha: 0.3,
            epsilon: 0.25,
        };
        assert!(add_noise_to_children(&mut tree, SearchTree::ROOT, &noise, &mut rng).is_ok());
    }

    #[test]
    fn test_dirichlet_single_child_is_one() {
        let mut rng = StdRng::seed_from_u64(3);
        let sample = sample_dirichlet(0.3, 1, &mut rng).unwrap();
        assert_relative_eq!(sample[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_alpha_is_an_error() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(sample_dirichlet(-1.0, 3, &mut rng).is_err());
    }

    #[test]
    fn test_dirichlet_preserves_relative_ordering_somewhat() {
        let mut tree = root_with_priors(&[0.8, 0.15, 0.05]);
        let mut rng = StdRng::seed_from_u64(11);
        let noise = RootNoise::Dirichlet {
            alpha: 0.3,
            epsilon: 0.1,
        };
        add_noise_to_children(&mut tree, SearchTree::ROOT, &noise, &mut rng).unwrap();

        let new_priors = priors(&tree);
        // (1 - 0.1) * 0.8 = 0.72 beats anything the others can reach (≤ 0.235)
        assert!(new_priors[0] > new_priors[1] && new_priors[0] > new_priors[2]);
    }
}
