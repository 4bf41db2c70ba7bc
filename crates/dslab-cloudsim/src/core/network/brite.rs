//! Reader of BRITE topology files.
//!
//! Only two sections are used. Node lines start with `id x y`, edge lines with
//! `id from to length delay bandwidth`, other fields are ignored.

use std::str::FromStr;

use crate::core::error::CloudError;
use crate::core::network::graph::{TopologicalGraph, TopologicalLink, TopologicalNode};

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Nothing,
    Nodes,
    Edges,
}

fn field<T: FromStr>(fields: &[&str], idx: usize, name: &str, line: usize) -> Result<T, CloudError> {
    let raw = fields.get(idx).ok_or_else(|| CloudError::TopologyParse {
        line,
        reason: format!("missing {}", name),
    })?;
    raw.parse().map_err(|_| CloudError::TopologyParse {
        line,
        reason: format!("bad {} '{}'", name, raw),
    })
}

/// Parses BRITE text into a graph.
pub fn parse_brite(content: &str) -> Result<TopologicalGraph, CloudError> {
    let mut graph = TopologicalGraph::new();
    let mut section = Section::Nothing;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        if line.contains("Nodes:") {
            section = Section::Nodes;
            continue;
        }
        if line.contains("Edges:") {
            section = Section::Edges;
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        match section {
            Section::Nothing => {}
            Section::Nodes => {
                let id: u32 = field(&fields, 0, "node id", line_no)?;
                let node = TopologicalNode {
                    id,
                    label: id.to_string(),
                    x: field(&fields, 1, "x coordinate", line_no)?,
                    y: field(&fields, 2, "y coordinate", line_no)?,
                };
                if !graph.add_node(node) {
                    return Err(CloudError::TopologyParse {
                        line: line_no,
                        reason: format!("duplicate node {}", id),
                    });
                }
            }
            Section::Edges => {
                let link = TopologicalLink {
                    source: field(&fields, 1, "source node", line_no)?,
                    dest: field(&fields, 2, "destination node", line_no)?,
                    delay: field(&fields, 4, "delay", line_no)?,
                    bandwidth: field(&fields, 5, "bandwidth", line_no)?,
                };
                if !graph.add_link(link) {
                    return Err(CloudError::TopologyParse {
                        line: line_no,
                        reason: "edge references unknown node".to_string(),
                    });
                }
            }
        }
    }
    Ok(graph)
}

pub fn read_brite_file(path: &str) -> Result<TopologicalGraph, CloudError> {
    let content = std::fs::read_to_string(path).map_err(|source| CloudError::TopologyIo {
        path: path.to_string(),
        source,
    })?;
    parse_brite(&content)
}
