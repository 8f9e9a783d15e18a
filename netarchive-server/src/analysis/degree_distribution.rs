//! Degree distribution classification
//!
//! Compares a network's degree histogram against the histogram a theoretical
//! degree distribution predicts for a network of the same order, using a
//! chi-squared goodness-of-fit test. The null hypothesis is that the network
//! follows the theoretical distribution; it is kept (and the network
//! classified) when the p-value exceeds [`SIGNIFICANCE`].

use super::stats::{chi_square_test, ln_choose};
use super::{Analyser, AnalysisError, Derived, Subject};
use crate::graph::NetworkGraph;
use crate::value::MetadataValue;

/// P-value at or below which the null hypothesis is rejected (5%)
pub const SIGNIFICANCE: f64 = 0.05;

/// Metadata key holding the classification
pub const DEGREE_DISTRIBUTION_KEY: &str = "degree-distribution";

/// A theoretical degree distribution
pub trait DegreeGenerator {
    /// Probability that a node has degree `k`
    fn probability(&self, k: usize) -> f64;
}

/// Binomial degree distribution B(n, p)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binomial {
    n: u64,
    p: f64,
}

impl Binomial {
    pub fn new(n: u64, p: f64) -> Self {
        Self {
            n,
            p: p.clamp(0.0, 1.0),
        }
    }

    /// Erdős–Rényi degree distribution for `order` nodes with mean degree `kmean`
    pub fn erdos_renyi(order: u64, kmean: f64) -> Self {
        let p = if order == 0 { 0.0 } else { kmean / order as f64 };
        Self::new(order, p)
    }
}

impl DegreeGenerator for Binomial {
    fn probability(&self, k: usize) -> f64 {
        let k = k as u64;
        if k > self.n {
            return 0.0;
        }
        if self.p == 0.0 {
            return if k == 0 { 1.0 } else { 0.0 };
        }
        if self.p == 1.0 {
            return if k == self.n { 1.0 } else { 0.0 };
        }
        let ln_p = ln_choose(self.n, k)
            + k as f64 * self.p.ln()
            + (self.n - k) as f64 * (1.0 - self.p).ln();
        ln_p.exp()
    }
}

/// Histogram of a degree sequence: entry `k` counts the nodes of degree `k`
pub fn degree_histogram(degrees: &[usize]) -> Vec<u64> {
    let max = degrees.iter().copied().max().unwrap_or(0);
    let mut histogram = vec![0u64; max + 1];
    for &k in degrees {
        histogram[k] += 1;
    }
    histogram
}

/// P-value of the network's degree sequence against a theoretical distribution
///
/// The theoretical count for degree `k` is `floor(P(k) * order)`. Degrees
/// whose theoretical count is zero are dropped from both histograms, since
/// the test cannot weigh against a zero expectation.
pub fn goodness_of_fit(
    degrees: &[usize],
    order: usize,
    generator: &dyn DegreeGenerator,
) -> Result<f64, AnalysisError> {
    if degrees.is_empty() {
        return Err(AnalysisError::EmptyNetwork);
    }

    let empirical = degree_histogram(degrees);
    let mut observed = Vec::with_capacity(empirical.len());
    let mut expected = Vec::with_capacity(empirical.len());
    for (k, &count) in empirical.iter().enumerate() {
        let theory = (generator.probability(k) * order as f64).floor();
        if theory > 0.0 {
            observed.push(count as f64);
            expected.push(theory);
        }
    }

    if observed.len() < 2 {
        return Err(AnalysisError::Inconclusive(format!(
            "{} usable histogram bin(s), need at least 2",
            observed.len()
        )));
    }

    let (statistic, p) = chi_square_test(&observed, &expected);
    tracing::debug!(statistic, p, bins = observed.len(), "Chi-squared test");
    Ok(p)
}

/// Whether the degree sequence is consistent with the theoretical distribution
pub fn follows_distribution(
    degrees: &[usize],
    order: usize,
    generator: &dyn DegreeGenerator,
) -> Result<bool, AnalysisError> {
    Ok(goodness_of_fit(degrees, order, generator)? > SIGNIFICANCE)
}

/// Classifies networks whose degrees are consistent with an Erdős–Rényi
/// random graph
///
/// Reads `N` and `kmean`, so it must run after the topology analyser.
pub struct ErdosRenyi;

impl Analyser for ErdosRenyi {
    fn name(&self) -> &'static str {
        "erdos-renyi"
    }

    fn analyse(&self, subject: &Subject<'_>, graph: &NetworkGraph) -> Result<Derived, AnalysisError> {
        let order = subject.metadata.number("N")?;
        let kmean = subject.metadata.number("kmean")?;
        let generator = Binomial::erdos_renyi(order.max(0.0) as u64, kmean);

        let mut derived = Derived::new();
        if follows_distribution(&graph.degrees(), order as usize, &generator)? {
            derived.insert(
                DEGREE_DISTRIBUTION_KEY.to_string(),
                MetadataValue::from("ER"),
            );
        }
        Ok(derived)
    }
}
