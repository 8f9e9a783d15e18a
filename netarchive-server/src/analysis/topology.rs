//! Topology analyser: order, size and degree summary statistics

use super::{Analyser, AnalysisError, Derived, Subject};
use crate::graph::NetworkGraph;
use crate::value::MetadataValue;

/// Extracts basic topological features of a network
pub struct Topology;

/// Summary statistics of a degree sequence
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeSummary {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub median: f64,
    /// Population variance
    pub variance: f64,
}

impl DegreeSummary {
    /// Summarise a degree sequence; `None` if it is empty
    pub fn of(degrees: &[usize]) -> Option<Self> {
        if degrees.is_empty() {
            return None;
        }

        let mut sorted = degrees.to_vec();
        sorted.sort_unstable();

        let n = sorted.len();
        let mean = sorted.iter().sum::<usize>() as f64 / n as f64;
        let median = if n % 2 == 1 {
            sorted[n / 2] as f64
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
        };
        let variance = sorted
            .iter()
            .map(|&k| {
                let d = k as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n as f64;

        Some(Self {
            min: sorted[0],
            max: sorted[n - 1],
            mean,
            median,
            variance,
        })
    }
}

impl Analyser for Topology {
    fn name(&self) -> &'static str {
        "topology"
    }

    fn analyse(&self, _subject: &Subject<'_>, graph: &NetworkGraph) -> Result<Derived, AnalysisError> {
        let summary = DegreeSummary::of(&graph.degrees()).ok_or(AnalysisError::EmptyNetwork)?;

        let mut topology = Derived::new();
        topology.insert("N".to_string(), MetadataValue::from(graph.order()));
        topology.insert("M".to_string(), MetadataValue::from(graph.size()));
        topology.insert("kmin".to_string(), MetadataValue::from(summary.min));
        topology.insert("kmax".to_string(), MetadataValue::from(summary.max));
        topology.insert("kmean".to_string(), MetadataValue::from(summary.mean));
        topology.insert("kmedian".to_string(), MetadataValue::from(summary.median));
        topology.insert("kvar".to_string(), MetadataValue::from(summary.variance));
        Ok(topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::MetadataView;
    use netarchive_common::db::Network;
    use std::path::Path;
    use uuid::Uuid;

    #[test]
    fn test_summary_statistics() {
        let s = DegreeSummary::of(&[3, 1, 2, 2]).unwrap();
        assert_eq!(s.min, 1);
        assert_eq!(s.max, 3);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.median, 2.0);
        assert_eq!(s.variance, 0.5);

        let odd = DegreeSummary::of(&[5, 1, 1]).unwrap();
        assert_eq!(odd.median, 1.0);
        assert!(DegreeSummary::of(&[]).is_none());
    }

    #[test]
    fn test_topology_keys() {
        // Star with four leaves
        let graph = NetworkGraph::from_adjacency_list("0 1 2 3 4\n".as_bytes()).unwrap();
        let network = Network::new(Uuid::new_v4(), "al", "", "");
        let view = MetadataView::default();
        let subject = Subject {
            network: &network,
            path: Path::new("unused"),
            metadata: &view,
        };

        let derived = Topology.analyse(&subject, &graph).unwrap();
        let keys: Vec<&str> = derived.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["M", "N", "kmax", "kmean", "kmedian", "kmin", "kvar"]);

        let text = |k: &str| derived[k].to_string();
        assert_eq!(text("N"), "5");
        assert_eq!(text("M"), "4");
        assert_eq!(text("kmin"), "1");
        assert_eq!(text("kmax"), "4");
        assert_eq!(text("kmean"), "1.6");
        assert_eq!(text("kmedian"), "1.0");
        let kvar = derived["kvar"].as_number().unwrap();
        assert!((kvar - 1.44).abs() < 1e-12);
    }

    #[test]
    fn test_empty_network_fails() {
        let graph = NetworkGraph::default();
        let network = Network::new(Uuid::new_v4(), "al", "", "");
        let view = MetadataView::default();
        let subject = Subject {
            network: &network,
            path: Path::new("unused"),
            metadata: &view,
        };
        assert!(matches!(
            Topology.analyse(&subject, &graph),
            Err(AnalysisError::EmptyNetwork)
        ));
    }
}
