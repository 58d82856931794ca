//! Contextual linear bandit
//!
//! Predicted reward for an arm is the dot product of its learned weight
//! vector and the request context. Weights are trained by online
//! stochastic gradient descent, one step per observed outcome; there is
//! no batch retraining.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use agora_types::AgentId;

use crate::context::{Context, CONTEXT_DIM};

/// Default SGD step size
const DEFAULT_LEARNING_RATE: f64 = 0.01;

/// Linear contextual selector over counterparty arms
#[derive(Debug)]
pub struct ContextualSelector {
    arms: Vec<AgentId>,
    weights: HashMap<AgentId, [f64; CONTEXT_DIM]>,
    learning_rate: f64,
    rng: StdRng,
}

impl ContextualSelector {
    /// Create a selector over the given arms with a random seed
    pub fn new(arms: impl IntoIterator<Item = AgentId>) -> Self {
        Self::build(arms, StdRng::from_entropy(), DEFAULT_LEARNING_RATE)
    }

    /// Create a selector with a fixed seed for reproducible runs
    pub fn with_seed(arms: impl IntoIterator<Item = AgentId>, seed: u64) -> Self {
        Self::build(arms, StdRng::seed_from_u64(seed), DEFAULT_LEARNING_RATE)
    }

    /// Override the SGD step size
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    fn build(arms: impl IntoIterator<Item = AgentId>, rng: StdRng, learning_rate: f64) -> Self {
        let mut selector = Self {
            arms: Vec::new(),
            weights: HashMap::new(),
            learning_rate,
            rng,
        };
        for arm in arms {
            selector.register(arm);
        }
        selector
    }

    /// Register an arm if it is not already tracked
    ///
    /// Fresh arms start from small symmetric noise so early predictions
    /// do not all tie at zero.
    pub fn register(&mut self, arm: AgentId) {
        if !self.weights.contains_key(&arm) {
            let mut initial = [0.0; CONTEXT_DIM];
            for w in &mut initial {
                *w = self.rng.gen_range(-0.1..0.1);
            }
            self.weights.insert(arm.clone(), initial);
            self.arms.push(arm);
        }
    }

    /// The tracked arms, in registration order
    pub fn arms(&self) -> &[AgentId] {
        &self.arms
    }

    /// Predicted reward for an arm in a context (0.0 for unseen arms)
    pub fn predict(&self, arm: &AgentId, context: &Context) -> f64 {
        self.weights
            .get(arm)
            .map(|weights| context.dot(weights))
            .unwrap_or(0.0)
    }

    /// Epsilon-greedy selection over predicted rewards for all arms
    pub fn select(&mut self, context: &Context, exploration: f64) -> Option<AgentId> {
        let arms = self.arms.clone();
        self.select_among(context, &arms, exploration)
    }

    /// Epsilon-greedy selection restricted to the given candidate arms
    ///
    /// The orchestration layer narrows selection to agents that actually
    /// offer the requested service. Unseen candidates are registered
    /// lazily. Ties break toward earlier candidates.
    pub fn select_among(
        &mut self,
        context: &Context,
        candidates: &[AgentId],
        exploration: f64,
    ) -> Option<AgentId> {
        if candidates.is_empty() {
            return None;
        }
        for candidate in candidates {
            self.register(candidate.clone());
        }

        if self.rng.gen::<f64>() < exploration {
            let idx = self.rng.gen_range(0..candidates.len());
            return Some(candidates[idx].clone());
        }

        let mut best: Option<(&AgentId, f64)> = None;
        for candidate in candidates {
            let predicted = self.predict(candidate, context);
            match best {
                Some((_, best_predicted)) if predicted <= best_predicted => {}
                _ => best = Some((candidate, predicted)),
            }
        }
        best.map(|(arm, _)| arm.clone())
    }

    /// Apply one SGD step toward the observed reward
    ///
    /// `w += learning_rate * (reward - predicted) * context`, applied
    /// immediately; the next selection sees the new weights.
    pub fn update(&mut self, arm: &AgentId, context: &Context, reward: f64) {
        self.register(arm.clone());
        let predicted = self.predict(arm, context);
        let error = reward - predicted;
        let weights = self.weights.get_mut(arm).expect("arm registered above");
        for (w, x) in weights.iter_mut().zip(context.0.iter()) {
            *w += self.learning_rate * error * x;
        }
        debug!(arm = %arm, reward, error, "contextual weights updated");
    }
}
