//! 🎯 One function per subcommand. Each asks the library, then hands the answer to `render`.

use std::time::Duration;

use anyhow::{Context, Result};
use osc::Client;
use osc::api::cat::{CatApi, CatRequest};
use osc::api::cluster::ClusterHealthRequest;
use osc::api::nodes::NodesInfoRequest;
use osc::api::root::InfoRequest;
use osc::api::snapshot::{CreateSnapshotRequest, GetSnapshotRequest, RestoreRequest, SnapshotStatusRequest};
use osc::transport::{Body, Method, TransportRequest};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::progress::SnapshotProgress;
use crate::render;
use crate::{Command, SnapshotCommand};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(client: &Client, command: Command) -> Result<()> {
    match command {
        Command::Info => info_cmd(client).await,
        Command::Health => health(client).await,
        Command::Cat { api, target } => cat(client, &api, target).await,
        Command::Nodes => nodes(client).await,
        Command::Ping => ping(client).await,
        Command::Snapshot { action } => snapshot(client, action).await,
        Command::Raw { method, path, body } => raw(client, &method, &path, body).await,
    }
}

async fn info_cmd(client: &Client) -> Result<()> {
    let info = client
        .info(InfoRequest::new())
        .await
        .context("💀 Couldn't fetch the cluster info")?;
    println!("{}", render::info(&info));
    Ok(())
}

async fn health(client: &Client) -> Result<()> {
    let health = client
        .cluster()
        .health(ClusterHealthRequest::new())
        .await
        .context("💀 Couldn't fetch cluster health")?;
    println!("{}", render::health(&health));
    Ok(())
}

async fn cat(client: &Client, api: &str, target: Option<String>) -> Result<()> {
    let api: CatApi = api.parse()?;
    let request = match target {
        Some(target) => CatRequest::new(api).target(target.as_str()),
        None => CatRequest::new(api),
    };
    let rows = client
        .cat()
        .rows(request)
        .await
        .with_context(|| format!("💀 _cat/{api} didn't work out"))?;
    println!("{}", render::rows(&rows));
    Ok(())
}

async fn nodes(client: &Client) -> Result<()> {
    let nodes = client
        .nodes()
        .info(NodesInfoRequest::new())
        .await
        .context("💀 Couldn't fetch node info")?;
    println!("{}", render::nodes(&nodes));
    Ok(())
}

async fn ping(client: &Client) -> Result<()> {
    let outcomes = client.transport().ping_all().await;
    println!("{}", render::pings(&outcomes));
    let alive = outcomes.iter().filter(|outcome| outcome.is_alive()).count();
    // -- 🪦 a quiet cluster is a failed command
    anyhow::ensure!(alive > 0, "💀 none of the {} configured nodes answered the ping", outcomes.len());
    Ok(())
}

async fn snapshot(client: &Client, action: SnapshotCommand) -> Result<()> {
    match action {
        SnapshotCommand::List { repository } => {
            let listed = client
                .snapshot()
                .get(GetSnapshotRequest::new(&repository, "_all"))
                .await
                .with_context(|| format!("💀 Couldn't list snapshots in '{repository}'"))?;
            println!("{}", render::snapshots(&listed.snapshots));
            Ok(())
        }
        SnapshotCommand::Create {
            repository,
            snapshot,
            indices,
            wait,
        } => create_snapshot(client, &repository, &snapshot, indices, wait).await,
        SnapshotCommand::Restore {
            repository,
            snapshot,
            indices,
            rename_pattern,
            rename_replacement,
            wait,
        } => {
            let mut body = Map::new();
            if let Some(indices) = indices {
                body.insert("indices".into(), Value::String(indices));
            }
            if let Some(pattern) = rename_pattern {
                body.insert("rename_pattern".into(), Value::String(pattern));
            }
            if let Some(replacement) = rename_replacement {
                body.insert("rename_replacement".into(), Value::String(replacement));
            }
            let restored = client
                .snapshot()
                .restore(
                    RestoreRequest::new(&repository, &snapshot)
                        .wait_for_completion(wait)
                        .body(&body),
                )
                .await
                .with_context(|| format!("💀 Couldn't restore '{repository}/{snapshot}'"))?;
            match restored.snapshot {
                Some(info) => println!(
                    "♻️ restored {} ({} indices, {}/{} shards)",
                    info.snapshot,
                    info.indices.len(),
                    info.shards.successful,
                    info.shards.total
                ),
                None => println!("♻️ restore of {snapshot} accepted"),
            }
            Ok(())
        }
    }
}

/// 📸 Start the snapshot without `wait_for_completion`, then poll `_status` so the bar has
/// something to chew on.
async fn create_snapshot(
    client: &Client,
    repository: &str,
    snapshot: &str,
    indices: Option<String>,
    wait: bool,
) -> Result<()> {
    let body = match indices {
        Some(indices) => json!({ "indices": indices }),
        None => json!({}),
    };
    client
        .snapshot()
        .create(CreateSnapshotRequest::new(repository, snapshot).body(&body))
        .await
        .with_context(|| format!("💀 Couldn't start snapshot '{repository}/{snapshot}'"))?;
    info!(repository, snapshot, "📸 snapshot started");

    if !wait {
        println!("📸 snapshot {snapshot} started in {repository}");
        return Ok(());
    }

    let mut progress = SnapshotProgress::new(format!("{repository}/{snapshot}"));
    loop {
        let status = client
            .snapshot()
            .status(SnapshotStatusRequest::new().repository(repository).snapshot(snapshot))
            .await
            .with_context(|| format!("💀 Lost track of snapshot '{repository}/{snapshot}'"))?;
        let Some(current) = status.snapshots.into_iter().next() else {
            // -- 🫥 not registered yet, or already gone from the in-progress list
            debug!(snapshot, "⏳ no status yet");
            tokio::time::sleep(POLL_INTERVAL).await;
            continue;
        };
        progress.update(&current);
        if current.is_finished() {
            progress.finish();
            anyhow::ensure!(
                current.state == "SUCCESS",
                "💀 snapshot '{snapshot}' ended in state {}",
                current.state
            );
            println!("✅ snapshot {snapshot} finished");
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn raw(client: &Client, method: &str, path: &str, body: Option<String>) -> Result<()> {
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .with_context(|| format!("💀 '{method}' is not an HTTP method"))?;
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    let mut request = TransportRequest::new(method, path.as_str());
    if let Some(body) = body {
        // -- 📦 bulk-ish endpoints take newline-delimited JSON, everything else takes JSON
        request = if path.contains("_bulk") || path.contains("_msearch") {
            request.body(Body::ndjson(body))
        } else {
            let value: Value = serde_json::from_str(&body).context("💀 --body is not valid JSON")?;
            request.json(&value)?
        };
    }

    let response = client.transport().send(request).await?;
    eprintln!("{} {}", response.status, response.url);
    match serde_json::from_slice::<Value>(&response.body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", response.text()),
    }
    anyhow::ensure!(response.is_success(), "💀 the cluster answered {}", response.status);
    Ok(())
}
