//! Context-free multi-armed bandit selection

use std::collections::{HashMap, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use agora_types::{AgentId, ArmStats};

/// Rewards above this threshold count as a success for the posterior policy
const SUCCESS_THRESHOLD: f64 = 0.5;

/// Size of the bounded recent-reward window behind `recent_avg`
const RECENT_WINDOW: usize = 10;

#[derive(Debug, Clone, Default)]
struct ArmState {
    selections: u64,
    cumulative_reward: f64,
    successes: u64,
    failures: u64,
    recent: VecDeque<f64>,
}

impl ArmState {
    fn avg_reward(&self) -> f64 {
        self.cumulative_reward / self.selections.max(1) as f64
    }

    fn recent_avg(&self) -> f64 {
        if self.recent.is_empty() {
            0.0
        } else {
            self.recent.iter().sum::<f64>() / self.recent.len() as f64
        }
    }
}

/// Context-free bandit over a set of counterparty arms
///
/// Arms keep their registration order; every argmax scans arms in that
/// order and keeps the first maximum, so ties break deterministically
/// toward earlier-registered arms.
#[derive(Debug)]
pub struct ArmSelector {
    arms: Vec<AgentId>,
    states: HashMap<AgentId, ArmState>,
    total_selections: u64,
    rng: StdRng,
}

impl ArmSelector {
    /// Create a selector over the given arms with a random seed
    pub fn new(arms: impl IntoIterator<Item = AgentId>) -> Self {
        Self::build(arms, StdRng::from_entropy())
    }

    /// Create a selector with a fixed seed for reproducible runs
    pub fn with_seed(arms: impl IntoIterator<Item = AgentId>, seed: u64) -> Self {
        Self::build(arms, StdRng::seed_from_u64(seed))
    }

    fn build(arms: impl IntoIterator<Item = AgentId>, rng: StdRng) -> Self {
        let mut selector = Self {
            arms: Vec::new(),
            states: HashMap::new(),
            total_selections: 0,
            rng,
        };
        for arm in arms {
            selector.register(arm);
        }
        selector
    }

    /// Register an arm if it is not already tracked
    pub fn register(&mut self, arm: AgentId) {
        if !self.states.contains_key(&arm) {
            self.states.insert(arm.clone(), ArmState::default());
            self.arms.push(arm);
        }
    }

    /// The tracked arms, in registration order
    pub fn arms(&self) -> &[AgentId] {
        &self.arms
    }

    /// Epsilon-greedy: explore uniformly with probability `epsilon`,
    /// otherwise exploit the highest historical average reward.
    ///
    /// The very first selection always explores, since no averages exist.
    pub fn select_epsilon_greedy(&mut self, epsilon: f64) -> Option<AgentId> {
        if self.arms.is_empty() {
            return None;
        }
        if self.total_selections == 0 || self.rng.gen::<f64>() < epsilon {
            return Some(self.random_arm());
        }
        self.argmax(|state| state.avg_reward())
    }

    /// UCB1: untried arms first, then average reward plus the confidence
    /// bonus `c * sqrt(ln(total) / count)`.
    pub fn select_ucb1(&mut self, c: f64) -> Option<AgentId> {
        if self.arms.is_empty() {
            return None;
        }
        if self.total_selections == 0 {
            return Some(self.random_arm());
        }
        let total = self.total_selections as f64;
        self.argmax(|state| {
            if state.selections == 0 {
                f64::INFINITY
            } else {
                let bonus = c * (total.ln() / state.selections as f64).sqrt();
                state.avg_reward() + bonus
            }
        })
    }

    /// Posterior sampling: draw from Beta(successes + 1, failures + 1)
    /// per arm and pick the highest sample.
    ///
    /// More observed successes tighten the posterior around a higher mean,
    /// so well-performing arms win most draws while cold arms keep a
    /// chance to be explored.
    pub fn select_posterior(&mut self) -> Option<AgentId> {
        if self.arms.is_empty() {
            return None;
        }
        let mut best: Option<(AgentId, f64)> = None;
        for arm in &self.arms {
            let state = &self.states[arm];
            let sample = sample_beta(
                &mut self.rng,
                state.successes + 1,
                state.failures + 1,
            );
            match best {
                Some((_, best_sample)) if sample <= best_sample => {}
                _ => best = Some((arm.clone(), sample)),
            }
        }
        best.map(|(arm, _)| arm)
    }

    /// Record an observed reward for an arm
    ///
    /// Applied immediately: the next selection call sees the new
    /// statistics. Unseen arms are registered lazily, never an error.
    pub fn update_reward(&mut self, arm: &AgentId, reward: f64) {
        self.register(arm.clone());
        let state = self.states.get_mut(arm).expect("arm registered above");
        state.selections += 1;
        state.cumulative_reward += reward;
        if reward > SUCCESS_THRESHOLD {
            state.successes += 1;
        } else {
            state.failures += 1;
        }
        if state.recent.len() == RECENT_WINDOW {
            state.recent.pop_front();
        }
        state.recent.push_back(reward);
        self.total_selections += 1;
        debug!(arm = %arm, reward, selections = state.selections, "bandit reward recorded");
    }

    /// Per-arm statistics snapshot, in registration order
    pub fn stats(&self) -> Vec<ArmStats> {
        self.arms
            .iter()
            .map(|arm| {
                let state = &self.states[arm];
                ArmStats {
                    agent: arm.clone(),
                    selections: state.selections,
                    avg_reward: state.avg_reward(),
                    recent_avg: state.recent_avg(),
                    total_reward: state.cumulative_reward,
                }
            })
            .collect()
    }

    fn random_arm(&mut self) -> AgentId {
        let idx = self.rng.gen_range(0..self.arms.len());
        self.arms[idx].clone()
    }

    fn argmax(&self, score: impl Fn(&ArmState) -> f64) -> Option<AgentId> {
        let mut best: Option<(&AgentId, f64)> = None;
        for arm in &self.arms {
            let value = score(&self.states[arm]);
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((arm, value)),
            }
        }
        best.map(|(arm, _)| arm.clone())
    }
}

/// Draw from Beta(a, b) for integer shape parameters
///
/// Uses the order-statistic construction: the a-th smallest of a + b - 1
/// independent uniforms is Beta(a, b) distributed. Exact for the integer
/// success/failure counts the posterior policy feeds in.
fn sample_beta(rng: &mut StdRng, a: u64, b: u64) -> f64 {
    let n = (a + b - 1) as usize;
    let mut draws: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
    let k = (a - 1) as usize;
    let (_, kth, _) = draws.select_nth_unstable_by(k, |x, y| x.total_cmp(y));
    *kth
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_arms() -> Vec<AgentId> {
        vec![
            AgentId::from("DataProcessor_A"),
            AgentId::from("Translator_B"),
            AgentId::from("Computer_C"),
        ]
    }

    #[test]
    fn test_epsilon_greedy_converges_to_best_arm() {
        let arms = three_arms();
        let best = arms[1].clone();
        let mut selector = ArmSelector::with_seed(arms, 7);

        let mut final_window = Vec::new();
        for pull in 0..500 {
            let chosen = selector.select_epsilon_greedy(0.1).unwrap();
            let reward = if chosen == best { 0.9 } else { 0.1 };
            selector.update_reward(&chosen, reward);
            if pull >= 400 {
                final_window.push(chosen);
            }
        }

        let best_picks = final_window.iter().filter(|arm| **arm == best).count();
        assert!(
            best_picks > 80,
            "expected >80 picks of the high-reward arm in the final 100, got {best_picks}"
        );
    }

    #[test]
    fn test_ucb_tries_every_arm_exactly_once_first() {
        let arms = three_arms();
        let mut selector = ArmSelector::with_seed(arms.clone(), 11);

        let mut first_picks = Vec::new();
        for _ in 0..arms.len() {
            let chosen = selector.select_ucb1(2.0).unwrap();
            selector.update_reward(&chosen, 0.5);
            first_picks.push(chosen);
        }

        for arm in &arms {
            assert_eq!(
                first_picks.iter().filter(|picked| *picked == arm).count(),
                1,
                "arm {arm} not tried exactly once in the initial sweep"
            );
        }
    }

    #[test]
    fn test_posterior_prefers_successful_arm() {
        let arms = three_arms();
        let winner = arms[2].clone();
        let mut selector = ArmSelector::with_seed(arms.clone(), 3);

        for _ in 0..50 {
            selector.update_reward(&winner, 0.9);
            selector.update_reward(&arms[0], 0.1);
            selector.update_reward(&arms[1], 0.1);
        }

        let picks = (0..100)
            .filter(|_| selector.select_posterior().unwrap() == winner)
            .count();
        assert!(picks > 70, "posterior picked the winner only {picks}/100 times");
    }

    #[test]
    fn test_unseen_arm_is_lazily_registered() {
        let mut selector = ArmSelector::with_seed(Vec::new(), 1);
        assert!(selector.select_epsilon_greedy(0.1).is_none());

        selector.update_reward(&AgentId::from("Newcomer"), 0.8);
        assert_eq!(selector.arms().len(), 1);
        assert_eq!(
            selector.select_epsilon_greedy(0.0).unwrap(),
            AgentId::from("Newcomer")
        );
    }

    #[test]
    fn test_stats_report_trailing_window() {
        let mut selector = ArmSelector::with_seed(three_arms(), 5);
        let arm = AgentId::from("DataProcessor_A");

        // 15 old rewards of 0.0, then 10 recent rewards of 1.0: the
        // trailing average must only see the recent window.
        for _ in 0..15 {
            selector.update_reward(&arm, 0.0);
        }
        for _ in 0..10 {
            selector.update_reward(&arm, 1.0);
        }

        let stats = selector.stats();
        let entry = stats.iter().find(|s| s.agent == arm).unwrap();
        assert_eq!(entry.selections, 25);
        assert!((entry.recent_avg - 1.0).abs() < 1e-9);
        assert!((entry.avg_reward - 0.4).abs() < 1e-9);
        assert!((entry.total_reward - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_greedy_ties_break_by_registration_order() {
        let arms = three_arms();
        let mut selector = ArmSelector::with_seed(arms.clone(), 9);
        for arm in &arms {
            selector.update_reward(arm, 0.5);
        }
        // All averages equal: the first-registered arm must win
        assert_eq!(selector.select_epsilon_greedy(0.0).unwrap(), arms[0]);
    }

    #[test]
    fn test_beta_sample_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(42);
        for (a, b) in [(1, 1), (1, 10), (10, 1), (25, 25)] {
            for _ in 0..100 {
                let x = sample_beta(&mut rng, a, b);
                assert!((0.0..=1.0).contains(&x));
            }
        }
    }
}
