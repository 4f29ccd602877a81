//! Seeded train/test splitting.

use crate::config::SplitConfig;
use crate::error::{ProcessingError, Result};
use crate::types::SplitResult;
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::info;

/// Partitions a dataset into train and test subsets.
///
/// Row indices are shuffled with a seeded `StdRng`; the first
/// `round(train_ratio * n)` shuffled indices form the training set. The same
/// seed always yields the same split.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataSplitter {
    config: SplitConfig,
}

impl DataSplitter {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    pub fn with_ratio(train_ratio: f64, seed: u64) -> Self {
        Self::new(SplitConfig { train_ratio, seed })
    }

    /// Number of training rows for a dataset of `n` rows.
    pub fn train_size(&self, n: usize) -> usize {
        (self.config.train_ratio * n as f64).round() as usize
    }

    /// Shuffled row indices for a dataset of `n` rows.
    pub fn shuffled_indices(&self, n: usize) -> Vec<IdxSize> {
        let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        indices.shuffle(&mut rng);
        indices
    }

    /// Split `df` into train and test.
    ///
    /// Fails with a config error if the ratio is outside (0, 1) or the
    /// dataset has fewer than two rows.
    pub fn split(&self, df: &DataFrame) -> Result<SplitResult> {
        self.config
            .validate()
            .map_err(|e| ProcessingError::InvalidConfig(e.to_string()))?;

        let n = df.height();
        if n < 2 {
            return Err(ProcessingError::InsufficientRows {
                required: 2,
                actual: n,
            });
        }

        let indices = self.shuffled_indices(n);
        let (train_idx, test_idx) = indices.split_at(self.train_size(n));

        let train = df.take(&IdxCa::from_vec("idx".into(), train_idx.to_vec()))?;
        let test = df.take(&IdxCa::from_vec("idx".into(), test_idx.to_vec()))?;

        info!(
            "Split {} rows into {} train / {} test (seed {})",
            n,
            train.height(),
            test.height(),
            self.config.seed
        );
        Ok(SplitResult { train, test })
    }
}
