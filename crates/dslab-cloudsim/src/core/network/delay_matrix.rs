//! Dense matrices of transit delay and link bandwidth between topology nodes.

use crate::core::network::graph::TopologicalGraph;

/// Shortest transit delay between every pair of nodes.
///
/// Computed once with the Floyd–Warshall algorithm. Unreachable pairs hold `f64::INFINITY`.
#[derive(Clone, Debug)]
pub struct DelayMatrix {
    delays: Vec<Vec<f64>>,
}

impl DelayMatrix {
    pub fn new(graph: &TopologicalGraph, directed: bool) -> Self {
        let node_count = graph.node_count();
        let mut delays = vec![vec![f64::INFINITY; node_count]; node_count];
        #[allow(clippy::needless_range_loop)]
        for node in 0..node_count {
            delays[node][node] = 0.0;
        }

        for link in graph.links() {
            let (src, dst) = match (graph.index_of(link.source), graph.index_of(link.dest)) {
                (Some(src), Some(dst)) => (src, dst),
                _ => continue,
            };
            if link.delay < delays[src][dst] {
                delays[src][dst] = link.delay;
            }
            if !directed && link.delay < delays[dst][src] {
                delays[dst][src] = link.delay;
            }
        }

        for k in 0..node_count {
            for i in 0..node_count {
                for j in 0..node_count {
                    if delays[i][k] < f64::INFINITY
                        && delays[k][j] < f64::INFINITY
                        && delays[i][k] + delays[k][j] < delays[i][j]
                    {
                        delays[i][j] = delays[i][k] + delays[k][j];
                    }
                }
            }
        }
        Self { delays }
    }

    /// Returns delay between nodes given by dense indices.
    pub fn delay(&self, src: usize, dst: usize) -> f64 {
        self.delays[src][dst]
    }

    pub fn size(&self) -> usize {
        self.delays.len()
    }
}

/// Bandwidth of direct links, zero for pairs without a link.
#[derive(Clone, Debug)]
pub struct BandwidthMatrix {
    bandwidth: Vec<Vec<f64>>,
}

impl BandwidthMatrix {
    pub fn new(graph: &TopologicalGraph, directed: bool) -> Self {
        let node_count = graph.node_count();
        let mut bandwidth = vec![vec![0.; node_count]; node_count];
        for link in graph.links() {
            if let (Some(src), Some(dst)) = (graph.index_of(link.source), graph.index_of(link.dest)) {
                bandwidth[src][dst] = link.bandwidth;
                if !directed {
                    bandwidth[dst][src] = link.bandwidth;
                }
            }
        }
        Self { bandwidth }
    }

    pub fn bandwidth(&self, src: usize, dst: usize) -> f64 {
        self.bandwidth[src][dst]
    }
}
