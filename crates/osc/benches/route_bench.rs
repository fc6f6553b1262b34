//! 🏎️ The two hot paths every request walks through before it touches a socket:
//! picking a url template, and rendering a bulk body.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;

use osc::api::bulk::{BulkOperation, render_bulk};
use osc::api::{RouteValues, UrlLookup};

static SEARCH: UrlLookup = UrlLookup::new("search", &["/{index}/_search", "/_search"]);
static UPDATE: UrlLookup = UrlLookup::new("update", &["/{index}/_update/{id}"]);

fn routes(c: &mut Criterion) {
    let bare = RouteValues::new();
    let indexed = RouteValues::new().with("index", "logs-2024");
    let update = RouteValues::new().with("index", "logs-2024").with("id", "a/b c");

    c.bench_function("route/no_params", |b| b.iter(|| SEARCH.resolve(black_box(&bare))));
    c.bench_function("route/index", |b| b.iter(|| SEARCH.resolve(black_box(&indexed))));
    c.bench_function("route/index_and_id", |b| b.iter(|| UPDATE.resolve(black_box(&update))));
}

fn bulk(c: &mut Criterion) {
    // -- 📦 one clean raw line, one raw line that needs re-serializing, one Value
    let operations: Vec<BulkOperation> = (0..1_000)
        .map(|i| match i % 3 {
            0 => BulkOperation::index(r#"{"message":"hello","level":"info"}"#).id(i.to_string()),
            1 => BulkOperation::index("{\n  \"message\": \"pretty printed\"\n}").id(i.to_string()),
            _ => BulkOperation::create(json!({"message": "typed", "n": i})).id(i.to_string()),
        })
        .collect();

    c.bench_function("bulk/render_1000", |b| b.iter(|| render_bulk(black_box(&operations))));
}

criterion_group!(benches, routes, bulk);
criterion_main!(benches);
