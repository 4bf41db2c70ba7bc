//! Network topology shared by simulation entities.

use std::collections::HashMap;

use dslab_core::event::{EventData, EventId};
use dslab_core::{Id, SimulationContext};

use crate::core::network::brite::{parse_brite, read_brite_file};
use crate::core::network::delay_matrix::{BandwidthMatrix, DelayMatrix};
use crate::core::network::graph::TopologicalGraph;

struct LoadedTopology {
    graph: TopologicalGraph,
    delays: DelayMatrix,
    bandwidth: BandwidthMatrix,
}

/// Maps simulation entities onto nodes of a topology graph and provides transit delays between them.
///
/// Topology is created once by the simulation and passed to entities which send messages. If it is disabled
/// (no file given or the file is malformed) every delay is zero.
pub struct NetworkTopology {
    loaded: Option<LoadedTopology>,
    entity_to_node: HashMap<Id, u32>,
    node_to_entity: HashMap<u32, Id>,
}

impl NetworkTopology {
    /// Creates topology which adds no delays.
    pub fn disabled() -> Self {
        Self {
            loaded: None,
            entity_to_node: HashMap::new(),
            node_to_entity: HashMap::new(),
        }
    }

    /// Creates undirected topology from graph.
    pub fn from_graph(graph: TopologicalGraph) -> Self {
        let delays = DelayMatrix::new(&graph, false);
        let bandwidth = BandwidthMatrix::new(&graph, false);
        log::info!(
            "network topology loaded: {} nodes, {} links",
            graph.node_count(),
            graph.link_count()
        );
        Self {
            loaded: Some(LoadedTopology {
                graph,
                delays,
                bandwidth,
            }),
            ..Self::disabled()
        }
    }

    /// Parses BRITE content. Malformed content disables the network.
    pub fn from_brite_str(content: &str) -> Self {
        match parse_brite(content) {
            Ok(graph) => Self::from_graph(graph),
            Err(e) => {
                log::error!("network simulation disabled: {}", e);
                Self::disabled()
            }
        }
    }

    /// Reads BRITE file. Missing or malformed file disables the network.
    pub fn from_brite_file(path: &str) -> Self {
        match read_brite_file(path) {
            Ok(graph) => Self::from_graph(graph),
            Err(e) => {
                log::error!("network simulation disabled: {}", e);
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn graph(&self) -> Option<&TopologicalGraph> {
        self.loaded.as_ref().map(|loaded| &loaded.graph)
    }

    /// Binds entity to graph node. Each entity and each node can be mapped only once.
    pub fn map_node(&mut self, entity: Id, node_id: u32) -> bool {
        let loaded = match &self.loaded {
            Some(loaded) => loaded,
            None => return false,
        };
        if loaded.graph.index_of(node_id).is_none() {
            log::error!("can't map entity #{}: no node {} in topology", entity, node_id);
            return false;
        }
        if let Some(node) = self.entity_to_node.get(&entity) {
            log::error!("entity #{} is already mapped to node {}", entity, node);
            return false;
        }
        if let Some(other) = self.node_to_entity.get(&node_id) {
            log::error!("node {} is already mapped to entity #{}", node_id, other);
            return false;
        }
        self.entity_to_node.insert(entity, node_id);
        self.node_to_entity.insert(node_id, entity);
        true
    }

    pub fn unmap_node(&mut self, entity: Id) {
        if let Some(node) = self.entity_to_node.remove(&entity) {
            self.node_to_entity.remove(&node);
        }
    }

    pub fn node_of(&self, entity: Id) -> Option<u32> {
        self.entity_to_node.get(&entity).copied()
    }

    /// Returns shortest delay between two graph nodes.
    pub fn delay_between_nodes(&self, src: u32, dst: u32) -> Option<f64> {
        let loaded = self.loaded.as_ref()?;
        let src = loaded.graph.index_of(src)?;
        let dst = loaded.graph.index_of(dst)?;
        Some(loaded.delays.delay(src, dst))
    }

    /// Returns transit delay between two entities.
    ///
    /// Zero if the network is disabled, any of entities is not mapped or the nodes are not connected.
    pub fn get_delay(&self, src: Id, dst: Id) -> f64 {
        let (src, dst) = match (self.node_of(src), self.node_of(dst)) {
            (Some(src), Some(dst)) => (src, dst),
            _ => return 0.,
        };
        match self.delay_between_nodes(src, dst) {
            Some(delay) if delay.is_finite() => delay,
            _ => 0.,
        }
    }

    /// Returns bandwidth of the direct link between two entities, zero if there is no such link.
    pub fn get_bandwidth(&self, src: Id, dst: Id) -> f64 {
        let loaded = match &self.loaded {
            Some(loaded) => loaded,
            None => return 0.,
        };
        let index = |entity| self.node_of(entity).and_then(|node| loaded.graph.index_of(node));
        match (index(src), index(dst)) {
            (Some(src), Some(dst)) => loaded.bandwidth.bandwidth(src, dst),
            _ => 0.,
        }
    }
}

/// Sends event adding the transit delay between sender and receiver. Events sent to self are not delayed.
pub fn emit_over_network<T: EventData>(
    ctx: &mut SimulationContext,
    topology: &NetworkTopology,
    data: T,
    dest: Id,
    delay: f64,
) -> EventId {
    if dest == ctx.id() {
        return ctx.emit_self(data, delay);
    }
    let delay = delay + topology.get_delay(ctx.id(), dest);
    ctx.emit(data, dest, delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPOLOGY: &str = "Nodes: ( 3 )
0 0.0 0.0
1 1.0 0.0
2 2.0 0.0
Edges: ( 2 )
0 0 1 1.0 10.0 100.0
1 1 2 1.0 5.0 50.0
";

    #[test]
    fn entity_mapping_is_one_to_one() {
        let mut topology = NetworkTopology::from_brite_str(TOPOLOGY);
        assert!(topology.map_node(10, 0));
        assert!(!topology.map_node(10, 1));
        assert!(!topology.map_node(11, 0));
        assert!(!topology.map_node(11, 9));
        assert_eq!(topology.node_of(10), Some(0));
        assert_eq!(topology.node_of(11), None);

        topology.unmap_node(10);
        assert!(topology.map_node(11, 0));
    }

    #[test]
    fn bandwidth_between_entities() {
        let mut topology = NetworkTopology::from_brite_str(TOPOLOGY);
        topology.map_node(1, 0);
        topology.map_node(2, 1);
        topology.map_node(3, 2);
        assert_eq!(topology.get_bandwidth(1, 2), 100.);
        assert_eq!(topology.get_bandwidth(3, 2), 50.);
        assert_eq!(topology.get_bandwidth(1, 3), 0.);
    }

    #[test]
    fn disabled_topology_has_no_delays() {
        let mut topology = NetworkTopology::disabled();
        assert!(!topology.map_node(1, 0));
        assert_eq!(topology.get_delay(1, 2), 0.);
        assert_eq!(topology.get_bandwidth(1, 2), 0.);
    }
}
