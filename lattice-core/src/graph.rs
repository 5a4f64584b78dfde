use lattice_scanner::ConnectionRecord;
use petgraph::graphmap::UnGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub image: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

/// Static node/edge document consumed by the force-layout renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDoc {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Build the render document from a connection map.
///
/// An edge exists only when both endpoints were crawled; mutual links are
/// undirected, so each pair appears exactly once regardless of how many
/// records mention it. Output ordering is deterministic (sorted by id).
pub fn build_graph(connections: &HashMap<String, ConnectionRecord>) -> GraphDoc {
    let mut graph: UnGraphMap<&str, ()> = UnGraphMap::new();

    for id in connections.keys() {
        graph.add_node(id.as_str());
    }
    for record in connections.values() {
        for mutual in &record.mutual_ids {
            if *mutual != record.id && connections.contains_key(mutual) {
                graph.add_edge(record.id.as_str(), mutual.as_str(), ());
            }
        }
    }

    let mut nodes: Vec<GraphNode> = connections
        .values()
        .map(|record| {
            let degree = graph.neighbors(record.id.as_str()).count();
            GraphNode {
                id: record.id.clone(),
                label: record.display_name.clone(),
                image: record.avatar_url.clone(),
                title: format!(
                    "{} - {} connection{}",
                    record.display_name,
                    degree,
                    if degree == 1 { "" } else { "s" }
                ),
            }
        })
        .collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut edges: Vec<GraphEdge> = graph
        .all_edges()
        .map(|(a, b, ())| {
            let (from, to) = if a <= b { (a, b) } else { (b, a) };
            GraphEdge {
                from: from.to_string(),
                to: to.to_string(),
            }
        })
        .collect();
    edges.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.to.cmp(&b.to)));

    GraphDoc { nodes, edges }
}
