//! Sampling policy
//!
//! Draws a uniform random sample from a query's results. The `pool` size is
//! a promise to the caller that the sample came from at least that many
//! candidates; it only gates the draw and never truncates the candidates.

use super::ConfigurationError;
use netarchive_common::db::Network;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use uuid::Uuid;

/// Sample size and pool requirements for a search
#[derive(Debug, Clone, Default)]
pub struct Sampling {
    /// Networks to draw; zero or less returns every candidate
    pub n: i64,
    /// Minimum number of candidates required; defaults to `n`
    pub pool: Option<i64>,
    /// Networks that may not be drawn
    pub exclude: HashSet<Uuid>,
}

/// Result of a draw
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// The drawn networks
    Drawn(Vec<Network>),
    /// Too few candidates to honour the pool size; nothing drawn
    InsufficientPool { required: i64, available: usize },
}

impl SampleOutcome {
    /// Drawn networks; empty when the pool was insufficient
    pub fn networks(&self) -> &[Network] {
        match self {
            SampleOutcome::Drawn(networks) => networks,
            SampleOutcome::InsufficientPool { .. } => &[],
        }
    }
}

impl Sampling {
    /// Return every candidate
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(n: i64, pool: Option<i64>) -> Self {
        Self {
            n,
            pool,
            exclude: HashSet::new(),
        }
    }

    pub fn excluding<I: IntoIterator<Item = Uuid>>(mut self, ids: I) -> Self {
        self.exclude.extend(ids);
        self
    }

    /// Pool size in effect
    pub fn required_pool(&self) -> i64 {
        self.pool.unwrap_or(self.n)
    }

    /// Reject requests whose pool is smaller than the sample
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let pool = self.required_pool();
        if self.n > 0 && pool < self.n {
            return Err(ConfigurationError::PoolSmallerThanSample { n: self.n, pool });
        }
        Ok(())
    }

    /// Apply exclusions, check the pool and draw
    pub fn draw<R: Rng + ?Sized>(
        &self,
        candidates: Vec<Network>,
        rng: &mut R,
    ) -> Result<SampleOutcome, ConfigurationError> {
        self.validate()?;

        let candidates: Vec<Network> = candidates
            .into_iter()
            .filter(|n| !self.exclude.contains(&n.id))
            .collect();

        if self.n <= 0 {
            return Ok(SampleOutcome::Drawn(candidates));
        }

        let required = self.required_pool();
        if (candidates.len() as i64) < required {
            return Ok(SampleOutcome::InsufficientPool {
                required,
                available: candidates.len(),
            });
        }

        let drawn = candidates
            .choose_multiple(rng, self.n as usize)
            .cloned()
            .collect();
        Ok(SampleOutcome::Drawn(drawn))
    }
}
