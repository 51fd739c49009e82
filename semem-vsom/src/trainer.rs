//! The VSOM Trainer (C12, §4.12): a Kohonen self-organizing map over entity
//! embeddings, producing 2D grid positions plus quantization/topographic
//! error.
//!
//! No teacher counterpart carries a SOM implementation (DESIGN.md: net-new
//! relative to the teacher), so this module is grounded on the spec's own
//! update rule and on the deterministic-seed testing style the teacher uses
//! elsewhere for reproducible fixtures (`rand::rngs::StdRng::seed_from_u64`).
//! Training is synchronous CPU-bound work; the spec's "runs off the request
//! thread" contract (§4.12) is the caller's job via `tokio::task::spawn_blocking`,
//! not this module's.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VsomError};

/// A single (x, y) cell coordinate on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: usize,
    pub y: usize,
}

/// One embedding to place on the map.
#[derive(Debug, Clone)]
pub struct TrainingEntity {
    pub uri: String,
    pub embedding: Vec<f32>,
}

/// §4.12 tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct TrainerConfig {
    pub grid_size: usize,
    pub epochs: usize,
    pub dimension: usize,
    pub seed: u64,
    pub eta_initial: f32,
    pub eta_final: f32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self { grid_size: 20, epochs: 100, dimension: semem_core::EMBEDDING_DIMENSION, seed: 0, eta_initial: 0.1, eta_final: 0.01 }
    }
}

/// §4.12 output: per-entity BMU coordinates plus the two error measures.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub positions: HashMap<String, GridPosition>,
    /// Mean squared distance to each input's BMU, one value per epoch;
    /// §8 scenario 6 requires this to be "monotonically non-increasing".
    pub quantization_error_by_epoch: Vec<f32>,
    /// Fraction of inputs whose top-2 BMUs are non-adjacent on the grid.
    pub topographic_error: f32,
    pub epochs_completed: usize,
}

/// A trained (or in-training) Kohonen map: a `grid_size * grid_size` array
/// of `dimension`-sized weight vectors.
pub struct VsomTrainer {
    config: TrainerConfig,
    weights: Vec<Vec<f32>>,
}

impl VsomTrainer {
    /// Initialize the grid to small random values from `StdRng::seed_from_u64(config.seed)`
    /// (§4.12 "small random values"; §8 scenario 6 determinism).
    #[must_use]
    pub fn new(config: TrainerConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let cells = config.grid_size * config.grid_size;
        let weights = (0..cells).map(|_| (0..config.dimension).map(|_| rng.gen_range(-0.01f32..0.01f32)).collect()).collect();
        Self { config, weights }
    }

    /// Run the training loop for `config.epochs` epochs (§4.12). `cancel`
    /// is polled between epochs; on cancellation the SOM is left at its
    /// last completed epoch (§5).
    pub fn train(&mut self, entities: &[TrainingEntity], cancel: Option<&AtomicBool>) -> Result<TrainingReport> {
        if entities.is_empty() {
            return Err(VsomError::Validation("training requires at least one entity".to_string()));
        }
        for e in entities {
            if e.embedding.len() != self.config.dimension {
                return Err(VsomError::Validation(format!(
                    "entity {} has embedding dimension {} != configured {}",
                    e.uri,
                    e.embedding.len(),
                    self.config.dimension
                )));
            }
        }

        let n = self.config.epochs.max(1);
        let mut quantization_error_by_epoch = Vec::with_capacity(n);
        let mut epochs_completed = 0;

        for t in 0..n {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                debug!(epoch = t, "train-vsom cancelled; leaving SOM at last completed epoch");
                break;
            }
            let eta = decay(self.config.eta_initial, self.config.eta_final, t, n);
            let sigma = decay(self.config.grid_size as f32 / 2.0, 1.0, t, n);

            for entity in entities {
                let bmu = self.best_matching_unit(&entity.embedding);
                self.update_neighborhood(bmu, &entity.embedding, eta, sigma);
            }

            quantization_error_by_epoch.push(self.quantization_error(entities));
            epochs_completed = t + 1;
        }

        let positions = entities.iter().map(|e| (e.uri.clone(), self.position_of(self.best_matching_unit(&e.embedding)))).collect();
        let topographic_error = self.topographic_error(entities);

        Ok(TrainingReport { positions, quantization_error_by_epoch, topographic_error, epochs_completed })
    }

    fn position_of(&self, cell: usize) -> GridPosition {
        GridPosition { x: cell % self.config.grid_size, y: cell / self.config.grid_size }
    }

    /// §4.12: "find the Best Matching Unit (argmin cosine distance)".
    fn best_matching_unit(&self, input: &[f32]) -> usize {
        self.weights
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| cosine_distance(input, a).partial_cmp(&cosine_distance(input, b)).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// §4.12 update rule: `w <- w + eta(t) * h(d,t) * (x - w)` applied to
    /// every cell, weighted by a Gaussian neighborhood over grid distance
    /// to the BMU.
    fn update_neighborhood(&mut self, bmu: usize, input: &[f32], eta: f32, sigma: f32) {
        let bmu_pos = self.position_of(bmu);
        let grid_size = self.config.grid_size;
        for cell in 0..self.weights.len() {
            let pos = GridPosition { x: cell % grid_size, y: cell / grid_size };
            let dx = pos.x as f32 - bmu_pos.x as f32;
            let dy = pos.y as f32 - bmu_pos.y as f32;
            let d2 = dx * dx + dy * dy;
            let h = (-d2 / (2.0 * sigma * sigma)).exp();
            if h < 1e-6 {
                continue;
            }
            let w = &mut self.weights[cell];
            for (wi, xi) in w.iter_mut().zip(input) {
                *wi += eta * h * (xi - *wi);
            }
        }
    }

    fn quantization_error(&self, entities: &[TrainingEntity]) -> f32 {
        let total: f32 = entities
            .iter()
            .map(|e| {
                let bmu = self.best_matching_unit(&e.embedding);
                squared_distance(&e.embedding, &self.weights[bmu])
            })
            .sum();
        total / entities.len() as f32
    }

    /// Fraction of inputs whose top-2 BMUs are non-adjacent (Chebyshev
    /// distance > 1 on the grid), per §4.12.
    fn topographic_error(&self, entities: &[TrainingEntity]) -> f32 {
        if entities.is_empty() {
            return 0.0;
        }
        let grid_size = self.config.grid_size;
        let mismatches = entities
            .iter()
            .filter(|e| {
                let mut scored: Vec<(usize, f32)> =
                    self.weights.iter().enumerate().map(|(i, w)| (i, cosine_distance(&e.embedding, w))).collect();
                scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
                let first = scored[0].0;
                let second = scored.get(1).map(|(i, _)| *i).unwrap_or(first);
                let p1 = GridPosition { x: first % grid_size, y: first / grid_size };
                let p2 = GridPosition { x: second % grid_size, y: second / grid_size };
                let chebyshev = (p1.x as i64 - p2.x as i64).unsigned_abs().max((p1.y as i64 - p2.y as i64).unsigned_abs());
                chebyshev > 1
            })
            .count();
        mismatches as f32 / entities.len() as f32
    }
}

/// Exponential decay from `initial` to `final_value` over `n` steps
/// (§4.12: "decays exponentially from 0.1 to 0.01"; same shape for sigma).
fn decay(initial: f32, final_value: f32, t: usize, n: usize) -> f32 {
    if n <= 1 {
        return final_value;
    }
    let ratio = final_value / initial;
    initial * ratio.powf(t as f32 / (n - 1) as f32)
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(n: usize, dim: usize, seed: u64) -> Vec<TrainingEntity> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|i| TrainingEntity { uri: format!("http://e/{i}"), embedding: (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect() }).collect()
    }

    #[test]
    fn rejects_empty_training_set() {
        let mut trainer = VsomTrainer::new(TrainerConfig { dimension: 4, grid_size: 3, epochs: 5, ..Default::default() });
        assert!(trainer.train(&[], None).is_err());
    }

    #[test]
    fn rejects_wrong_dimension() {
        let mut trainer = VsomTrainer::new(TrainerConfig { dimension: 4, grid_size: 3, epochs: 5, ..Default::default() });
        let bad = vec![TrainingEntity { uri: "a".to_string(), embedding: vec![0.0; 3] }];
        assert!(trainer.train(&bad, None).is_err());
    }

    #[test]
    fn produces_a_position_for_every_entity() {
        let data = entities(10, 8, 42);
        let mut trainer = VsomTrainer::new(TrainerConfig { dimension: 8, grid_size: 5, epochs: 10, seed: 1, ..Default::default() });
        let report = trainer.train(&data, None).unwrap();
        assert_eq!(report.positions.len(), 10);
        assert_eq!(report.epochs_completed, 10);
    }

    /// §8 scenario 6: identical seed/grid/epochs over the same data gives
    /// bit-for-bit identical final positions.
    #[test]
    fn deterministic_under_fixed_seed() {
        let data = entities(20, 6, 7);
        let config = TrainerConfig { dimension: 6, grid_size: 4, epochs: 15, seed: 99, ..Default::default() };
        let report_a = VsomTrainer::new(config).train(&data, None).unwrap();
        let report_b = VsomTrainer::new(config).train(&data, None).unwrap();
        assert_eq!(report_a.positions, report_b.positions);
        assert_eq!(report_a.quantization_error_by_epoch, report_b.quantization_error_by_epoch);
    }

    #[test]
    fn cancellation_stops_before_all_epochs_complete() {
        let data = entities(5, 4, 3);
        let cancel = AtomicBool::new(true);
        let mut trainer = VsomTrainer::new(TrainerConfig { dimension: 4, grid_size: 3, epochs: 50, ..Default::default() });
        let report = trainer.train(&data, Some(&cancel)).unwrap();
        assert_eq!(report.epochs_completed, 0);
    }
}
