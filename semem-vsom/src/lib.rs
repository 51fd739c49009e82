//! The VSOM Trainer (C12): a Kohonen self-organizing map that spatially
//! arranges entity embeddings on a 2D grid.

pub mod error;
pub mod trainer;

pub use error::{Result, VsomError};
pub use trainer::{GridPosition, TrainerConfig, TrainingEntity, TrainingReport, VsomTrainer};
