//! 🍽️ Responses in, comfy tables out. No I/O in here, so the tests can read the tables too.

use comfy_table::presets::UTF8_HORIZONTAL_ONLY;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use osc::api::cat::CatRow;
use osc::api::cluster::ClusterHealthResponse;
use osc::api::nodes::{NodeInfo, NodesResponse};
use osc::api::root::InfoResponse;
use osc::api::snapshot::SnapshotInfo;
use osc::transport::PingOutcome;
use serde_json::Value;

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_HORIZONTAL_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn number(n: u64) -> Cell {
    Cell::new(n).set_alignment(CellAlignment::Right)
}

pub fn info(info: &InfoResponse) -> Table {
    let mut table = table(vec!["field", "value"]);
    table.add_row(vec!["cluster", info.cluster_name.as_str()]);
    table.add_row(vec!["node", info.name.as_str()]);
    table.add_row(vec![
        "distribution",
        info.version.distribution.as_deref().unwrap_or("opensearch"),
    ]);
    table.add_row(vec!["version", info.version.number.as_str()]);
    if let Some(lucene) = &info.version.lucene_version {
        table.add_row(vec!["lucene", lucene.as_str()]);
    }
    table
}

pub fn health(health: &ClusterHealthResponse) -> Table {
    let mut table = table(vec![
        "cluster",
        "status",
        "nodes",
        "data",
        "primaries",
        "active",
        "relocating",
        "initializing",
        "unassigned",
        "active %",
    ]);
    table.add_row(vec![
        Cell::new(&health.cluster_name),
        Cell::new(health.status),
        number(health.number_of_nodes),
        number(health.number_of_data_nodes),
        number(health.active_primary_shards),
        number(health.active_shards),
        number(health.relocating_shards),
        number(health.initializing_shards),
        number(health.unassigned_shards),
        Cell::new(format!("{:.1}", health.active_shards_percent_as_number)).set_alignment(CellAlignment::Right),
    ]);
    table
}

/// 🐱 Columns in the order they first show up across the rows.
pub fn rows(rows: &[CatRow]) -> Table {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut table = table(columns.clone());
    for row in rows {
        table.add_row(columns.iter().map(|column| match row.get(*column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        }));
    }
    table
}

pub fn nodes(response: &NodesResponse<NodeInfo>) -> Table {
    let mut table = table(vec!["id", "name", "ip", "version", "roles"]);
    for (id, node) in &response.nodes {
        table.add_row(vec![
            id.clone(),
            node.name.clone(),
            node.ip.clone().unwrap_or_default(),
            node.version.clone().unwrap_or_default(),
            node.roles.join(","),
        ]);
    }
    table
}

pub fn pings(outcomes: &[PingOutcome]) -> Table {
    let mut table = table(vec!["node", "answer", "took"]);
    for outcome in outcomes {
        let answer = match &outcome.result {
            Ok(status) if outcome.is_alive() => format!("✅ {status}"),
            Ok(status) => format!("⚠️ {status}"),
            Err(error) => format!("💀 {error}"),
        };
        table.add_row(vec![
            Cell::new(outcome.node.as_str()),
            Cell::new(answer),
            Cell::new(format!("{} ms", outcome.took.as_millis())).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn snapshots(snapshots: &[SnapshotInfo]) -> Table {
    let mut table = table(vec!["snapshot", "state", "indices", "started", "took", "shards"]);
    for snapshot in snapshots {
        let started = snapshot
            .start_time
            .or(snapshot.start_time_in_millis)
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let took = snapshot
            .duration_in_millis
            .map(|millis| format!("{:.1}s", millis as f64 / 1000.0))
            .unwrap_or_default();
        let shards = snapshot
            .shards
            .as_ref()
            .map(|shards| format!("{}/{}", shards.successful, shards.total))
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(&snapshot.snapshot),
            Cell::new(snapshot.state.as_deref().unwrap_or("")),
            number(snapshot.indices.len() as u64),
            Cell::new(started),
            Cell::new(took).set_alignment(CellAlignment::Right),
            Cell::new(shards).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_ragged_cat_rows_still_line_up() {
        let rows: Vec<CatRow> = serde_json::from_value(json!([
            {"index": "logs", "health": "green", "docs.count": "10"},
            {"index": "metrics", "health": "yellow", "pri": 1, "docs.count": null}
        ]))
        .unwrap();

        let rendered = super::rows(&rows).to_string();
        assert!(rendered.contains("docs.count"));
        assert!(rendered.contains("pri"));
        assert!(rendered.contains("yellow"));
        assert!(!rendered.contains("null"), "nulls render as empty cells");
    }

    #[test]
    fn the_one_where_health_wears_its_color() {
        let health: ClusterHealthResponse = serde_json::from_value(json!({
            "cluster_name": "docker-cluster", "status": "yellow",
            "number_of_nodes": 1, "number_of_data_nodes": 1,
            "active_primary_shards": 5, "active_shards": 5, "unassigned_shards": 5,
            "active_shards_percent_as_number": 50.0
        }))
        .unwrap();

        let rendered = super::health(&health).to_string();
        assert!(rendered.contains("docker-cluster"));
        assert!(rendered.contains("yellow"));
        assert!(rendered.contains("50.0"));
    }

    #[test]
    fn the_one_where_a_snapshot_without_timings_is_still_listed() {
        let snapshots: Vec<SnapshotInfo> = serde_json::from_value(json!([
            {"snapshot": "nightly-1", "state": "IN_PROGRESS", "indices": ["logs"]}
        ]))
        .unwrap();

        let rendered = super::snapshots(&snapshots).to_string();
        assert!(rendered.contains("nightly-1"));
        assert!(rendered.contains("IN_PROGRESS"));
    }
}
