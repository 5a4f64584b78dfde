// Tests for graph construction and the text report

use lattice_core::{build_graph, generate_scan_report};
use lattice_scanner::{ConnectionRecord, ServerTag};
use std::collections::HashMap;

fn record(id: &str, name: &str, mutuals: &[&str]) -> ConnectionRecord {
    ConnectionRecord {
        id: id.to_string(),
        display_name: name.to_string(),
        tag: name.to_string(),
        discriminator: "0".to_string(),
        avatar_url: format!("https://cdn.example.com/avatars/{}.png", id),
        profile_url: format!("https://example.com/users/{}", id),
        mutual_ids: mutuals.iter().map(|s| s.to_string()).collect(),
        server_tags: Vec::new(),
    }
}

fn map(records: Vec<ConnectionRecord>) -> HashMap<String, ConnectionRecord> {
    records.into_iter().map(|r| (r.id.clone(), r)).collect()
}

// ============================================================================
// Graph Construction Tests
// ============================================================================

#[test]
fn test_every_record_becomes_a_node() {
    let doc = build_graph(&map(vec![
        record("1", "alan", &[]),
        record("2", "lora", &[]),
    ]));

    assert_eq!(doc.nodes.len(), 2);
    assert!(doc.edges.is_empty());
    assert_eq!(doc.nodes[0].id, "1");
    assert_eq!(doc.nodes[0].label, "alan");
}

#[test]
fn test_edges_require_both_endpoints_in_the_map() {
    // "3" is referenced but was never crawled.
    let doc = build_graph(&map(vec![
        record("1", "alan", &["2", "3"]),
        record("2", "lora", &["1"]),
    ]));

    assert_eq!(doc.edges.len(), 1);
    assert_eq!(doc.edges[0].from, "1");
    assert_eq!(doc.edges[0].to, "2");
}

#[test]
fn test_mutual_mentions_produce_one_edge() {
    // Both records mention each other; the edge must not be doubled.
    let doc = build_graph(&map(vec![
        record("1", "alan", &["2"]),
        record("2", "lora", &["1"]),
    ]));

    assert_eq!(doc.edges.len(), 1);
}

#[test]
fn test_self_references_are_ignored() {
    let doc = build_graph(&map(vec![record("1", "alan", &["1"])]));
    assert!(doc.edges.is_empty());
}

#[test]
fn test_node_titles_count_in_map_connections() {
    let doc = build_graph(&map(vec![
        record("1", "alan", &["2", "3", "404"]),
        record("2", "lora", &[]),
        record("3", "sam", &[]),
    ]));

    let alan = doc.nodes.iter().find(|n| n.id == "1").unwrap();
    assert_eq!(alan.title, "alan - 2 connections");
    let lora = doc.nodes.iter().find(|n| n.id == "2").unwrap();
    assert_eq!(lora.title, "lora - 1 connection");
}

#[test]
fn test_output_ordering_is_deterministic() {
    let records = vec![
        record("3", "c", &["1", "2"]),
        record("1", "a", &["3"]),
        record("2", "b", &["3"]),
    ];
    let doc = build_graph(&map(records.clone()));
    let again = build_graph(&map(records));

    let ids: Vec<&str> = doc.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(
        serde_json::to_string(&doc).unwrap(),
        serde_json::to_string(&again).unwrap()
    );
}

// ============================================================================
// Report Tests
// ============================================================================

#[test]
fn test_report_summarizes_counts() {
    let mut records = vec![
        record("1", "alan", &["2"]),
        record("2", "lora", &["1"]),
        record("3", "sam", &[]),
    ];
    records[2].server_tags.push(ServerTag {
        group_id: "g1".to_string(),
        label: "sam_f".to_string(),
    });

    let report = generate_scan_report(&map(records));

    assert!(report.contains("# Summary:"));
    assert!(report.contains("Connections mapped: 3"));
    assert!(report.contains("Mutual edges: 1"));
    assert!(report.contains("Server tags collected: 1"));
}

#[test]
fn test_report_ranks_most_connected() {
    let report = generate_scan_report(&map(vec![
        record("1", "hub", &["2", "3", "4"]),
        record("2", "lora", &["1"]),
        record("3", "sam", &["1"]),
        record("4", "quorra", &["1"]),
    ]));

    assert!(report.contains("## Most connected"));
    let hub_pos = report.find("hub").unwrap();
    let lora_pos = report.find("lora").unwrap();
    assert!(hub_pos < lora_pos);
}

#[test]
fn test_report_on_empty_map_omits_rankings() {
    let report = generate_scan_report(&HashMap::new());

    assert!(report.contains("Connections mapped: 0"));
    assert!(!report.contains("## Most connected"));
}
