//! Situational context vectors
//!
//! The contextual selector scores counterparties against a fixed
//! 4-dimensional feature vector describing the pending request.

use serde::{Deserialize, Serialize};

use agora_types::Amount;

/// Dimension of every context vector
pub const CONTEXT_DIM: usize = 4;

/// Complexity scores for known service types; unknown services score 0.5
fn service_complexity(service: &str) -> f64 {
    match service {
        "clean_data" => 0.3,
        "translate_text" => 0.5,
        "analyze_sentiment" => 0.6,
        "run_analysis" => 0.8,
        "generate_report" => 0.9,
        "optimize_model" => 1.0,
        _ => 0.5,
    }
}

/// A fixed-dimension feature vector for one pending request
///
/// Features, in order: service complexity, urgency, normalized budget,
/// normalized time-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Context(pub [f64; CONTEXT_DIM]);

impl Context {
    /// Build a context from the situational factors of a request
    ///
    /// `urgency` and `time_of_day` are expected in [0.0, 1.0]; the budget
    /// is normalized against a 100-token reference so typical offers land
    /// near the unit scale of the other features.
    pub fn new(service: &str, urgency: f64, budget: Amount, time_of_day: f64) -> Self {
        Self([
            service_complexity(service),
            urgency,
            budget.0 as f64 / 100.0,
            time_of_day,
        ])
    }

    /// Dot product against a weight vector of the same dimension
    pub fn dot(&self, weights: &[f64; CONTEXT_DIM]) -> f64 {
        self.0
            .iter()
            .zip(weights.iter())
            .map(|(x, w)| x * w)
            .sum()
    }
}
