//! Weighted graph of network nodes and links.

use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct TopologicalNode {
    pub id: u32,
    pub label: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopologicalLink {
    pub source: u32,
    pub dest: u32,
    pub delay: f64,
    pub bandwidth: f64,
}

/// Graph imported from a topology file. Node IDs are arbitrary, matrices built from the graph use dense indices
/// given by the order of node insertion.
#[derive(Clone, Debug, Default)]
pub struct TopologicalGraph {
    nodes: Vec<TopologicalNode>,
    links: Vec<TopologicalLink>,
    index: HashMap<u32, usize>,
}

impl TopologicalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds node, returns `false` if node with such ID exists.
    pub fn add_node(&mut self, node: TopologicalNode) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        self.index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Adds link, returns `false` if any of its endpoints is unknown.
    pub fn add_link(&mut self, link: TopologicalLink) -> bool {
        if !self.index.contains_key(&link.source) || !self.index.contains_key(&link.dest) {
            return false;
        }
        self.links.push(link);
        true
    }

    pub fn nodes(&self) -> &[TopologicalNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[TopologicalLink] {
        &self.links
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Returns dense index of node.
    pub fn index_of(&self, node_id: u32) -> Option<usize> {
        self.index.get(&node_id).copied()
    }
}
