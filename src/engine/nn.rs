// engine/nn.rs — Eval-only neural network forward passes for ABACUS.
//
// Two tiny fixed-topology networks, never trained and never persisted:
//   - ResourceGnn: two-layer graph convolution over the resource graph.
//   - PpoPolicy:   actor-critic head for single-resource keep/terminate.
//
// Weights use the standard fan-in uniform initialisation drawn from a
// fixed-seed PRNG, so every engine instance computes identical logits.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Seed for deterministic weight initialisation across restarts.
pub const WEIGHT_SEED: u64 = 0x7E57_ABAC;

pub const FEATURE_DIM: usize = 8;
const GNN_HIDDEN_DIM: usize = 32;
const GNN_OUT_CLASSES: usize = 2;
const POLICY_HIDDEN_DIM: usize = 64;

// ─── Linear layer ─────────────────────────────────────────────────────────────

/// Dense layer `y = W x + b`, weights stored row-major (out × in).
#[derive(Debug, Clone)]
pub struct Linear {
    weight: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl Linear {
    /// Fan-in uniform init: U(-1/√in, 1/√in) for both weights and bias.
    fn new(in_features: usize, out_features: usize, rng: &mut SmallRng) -> Self {
        let bound = 1.0 / (in_features as f32).sqrt();
        let weight = (0..out_features)
            .map(|_| (0..in_features).map(|_| rng.gen_range(-bound..bound)).collect())
            .collect();
        let bias = (0..out_features).map(|_| rng.gen_range(-bound..bound)).collect();
        Self { weight, bias }
    }

    fn forward(&self, x: &[f32]) -> Vec<f32> {
        self.weight
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f32>() + b)
            .collect()
    }
}

fn relu(x: &mut [f32]) {
    for v in x.iter_mut() {
        *v = v.max(0.0);
    }
}

pub fn argmax(logits: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in logits.iter().enumerate() {
        if *v > logits[best] {
            best = i;
        }
    }
    best
}

// ─── ResourceGnn ──────────────────────────────────────────────────────────────

/// Two-layer graph convolutional network.
///
/// Input:  node feature matrix X (N × FEATURE_DIM) and adjacency A (N × N).
/// Output: per-node termination logits (N × 2).
#[derive(Debug, Clone)]
pub struct ResourceGnn {
    fc1: Linear,
    fc2: Linear,
}

impl ResourceGnn {
    pub fn new(rng: &mut SmallRng) -> Self {
        Self {
            fc1: Linear::new(FEATURE_DIM, GNN_HIDDEN_DIM, rng),
            fc2: Linear::new(GNN_HIDDEN_DIM, GNN_OUT_CLASSES, rng),
        }
    }

    /// `fc2(Â · relu(fc1(Â · X)))` with Â = D⁻¹A, degrees clamped to ≥ 1
    /// so isolated nodes do not divide by zero.
    pub fn forward(&self, x: &[Vec<f32>], adj: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let propagated = propagate(adj, x);
        let mut hidden: Vec<Vec<f32>> = propagated.iter().map(|row| self.fc1.forward(row)).collect();
        for row in &mut hidden {
            relu(row);
        }
        let propagated = propagate(adj, &hidden);
        propagated.iter().map(|row| self.fc2.forward(row)).collect()
    }
}

/// Row-normalised message passing: `(D⁻¹A) · X`.
fn propagate(adj: &[Vec<f32>], x: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let features = x.first().map_or(0, Vec::len);
    adj.iter()
        .map(|neighbors| {
            let degree = neighbors.iter().sum::<f32>().max(1.0);
            let mut out = vec![0.0; features];
            for (weight, node) in neighbors.iter().zip(x) {
                for (acc, v) in out.iter_mut().zip(node) {
                    *acc += weight * v;
                }
            }
            for v in &mut out {
                *v /= degree;
            }
            out
        })
        .collect()
}

// ─── PpoPolicy ────────────────────────────────────────────────────────────────

/// PPO actor-critic policy for single-resource action selection.
///
/// State:  resource feature vector (FEATURE_DIM,)
/// Action: 0 = keep, 1 = terminate
#[derive(Debug, Clone)]
pub struct PpoPolicy {
    shared: Linear,
    actor: Linear,
    critic: Linear,
}

impl PpoPolicy {
    pub fn new(rng: &mut SmallRng) -> Self {
        Self {
            shared: Linear::new(FEATURE_DIM, POLICY_HIDDEN_DIM, rng),
            actor: Linear::new(POLICY_HIDDEN_DIM, 2, rng),
            critic: Linear::new(POLICY_HIDDEN_DIM, 1, rng),
        }
    }

    /// Returns (action logits, state value estimate).
    pub fn forward(&self, state: &[f32]) -> (Vec<f32>, f32) {
        let mut h = self.shared.forward(state);
        relu(&mut h);
        let logits = self.actor.forward(&h);
        let value = self.critic.forward(&h)[0];
        (logits, value)
    }
}

/// Seeded PRNG shared by both network constructors.
pub fn weight_rng() -> SmallRng {
    SmallRng::seed_from_u64(WEIGHT_SEED)
}
