//! # Fine-tuning loop
//!
//! Implements the standard fine-tuning recipe: AdamW with weight decay,
//! a linear learning-rate schedule with optional warmup, gradient-norm
//! clipping, shuffled batches and a per-epoch validation pass. A seed sweep
//! repeats the whole loop under several seeds to estimate the variance of
//! the final metrics.

mod schedule;
mod trainer;

pub use schedule::LinearScheduleWithWarmup;
pub use trainer::{
    EpochRecord, StanceTrainer, SweepOutcome, SweepSummary, TrainerConfig, TrainingReport,
};
