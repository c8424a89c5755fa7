// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic slice-lifecycle usage example.
//!
//! Demonstrates:
//! 1. Bootstrapping features and slices from a JSON manifest
//! 2. Component mount/unmount driving a deferred reset
//! 3. Route changes driving route-scoped slices
//! 4. Smart fetch skipping the network for fresh data
//! 5. Status reporting and metrics
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use slice_lifecycle::fetch::Selector;
use slice_lifecycle::{
    FetchParams, SliceAction, SliceLifecycleManager, SliceManagerConfig, SliceManifest, SmartFetchOptions,
    SmartFetcher, SystemClock,
};

const MANIFEST: &str = r#"{
    "features": [
        {"name": "blogDemo", "routes": ["^/blog"], "slices": ["posts", "comments", "categories"]},
        {"name": "wallet", "routes": ["^/wallet"], "slices": ["wallet"]}
    ],
    "slices": [
        {"name": "posts", "feature": "blogDemo", "cleanup_strategy": "cached", "cache_timeout": 60000},
        {"name": "comments", "feature": "blogDemo", "cleanup_strategy": "route", "cleanup_delay": 500},
        {"name": "categories", "feature": "blogDemo", "cleanup_strategy": "persistent"},
        {"name": "wallet", "feature": "wallet", "cleanup_strategy": "component", "cleanup_delay": 300}
    ]
}"#;

/// Error returned by the pretend blog API
#[derive(Debug, Clone, thiserror::Error)]
#[error("blog api unavailable")]
struct ApiError;

#[derive(Default)]
struct AppState {
    posts: Vec<String>,
}

fn select_posts(state: &AppState) -> Option<&Vec<String>> {
    Some(&state.posts)
}

const POSTS: Selector<'static, AppState, Vec<String>> = &select_posts;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slice_lifecycle=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           slice-lifecycle: Basic Usage Example                ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Bootstrap
    // ─────────────────────────────────────────────────────────────────────────
    println!("📦 Registering features and slices...");
    let manager = SliceLifecycleManager::with_config(
        SliceManagerConfig::default(),
        Arc::new(|action: SliceAction| {
            println!("   🧹 dispatched {} (slice={})", action.action_type, action.payload.slice_name);
        }),
        Arc::new(SystemClock),
    );
    manager.apply_manifest(&SliceManifest::from_json_str(MANIFEST)?)?;
    println!("   ✓ {} features registered\n", manager.get_feature_status().len());

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Component lifecycle
    // ─────────────────────────────────────────────────────────────────────────
    println!("🧩 Mounting and unmounting WalletPanel...");
    manager.register_component("WalletPanel", &["wallet"]);
    manager.unregister_component("WalletPanel");
    println!("   pending cleanup: {}", manager.has_pending_cleanup("wallet"));
    tokio::time::sleep(Duration::from_millis(400)).await;
    println!();

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Route lifecycle
    // ─────────────────────────────────────────────────────────────────────────
    println!("🧭 Navigating /blog → /wallet...");
    manager.handle_route_change("/blog/42");
    manager.handle_route_change("/wallet");
    tokio::time::sleep(Duration::from_millis(600)).await;
    println!();

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Smart fetch
    // ─────────────────────────────────────────────────────────────────────────
    println!("🌐 Fetching posts twice...");
    let fetcher = SmartFetcher::from_manager(&manager);
    let params = FetchParams::new().with("page", 1);
    let mut state = AppState::default();

    let fetched = fetcher
        .smart_fetch(
            &state,
            "posts",
            &params,
            POSTS,
            || async { Ok::<_, ApiError>(vec!["Hello".to_string(), "World".to_string()]) },
            SmartFetchOptions::new(),
        )
        .await?;
    state.posts = fetched;

    let again = fetcher
        .smart_fetch(
            &state,
            "posts",
            &params,
            POSTS,
            || async { Ok::<_, ApiError>(vec!["never called".to_string()]) },
            SmartFetchOptions::new(),
        )
        .await?;
    println!("   second call returned {:?}\n", again);

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Status and metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("📊 Slice status:");
    for (name, status) in manager.get_slice_status() {
        println!("   {:<12} {}", name, status);
    }
    println!();

    println!("📈 Metrics:");
    dump_metrics(&snapshotter);
    println!();

    Ok(())
}

fn dump_metrics(snapshotter: &Snapshotter) {
    let snapshot = snapshotter.snapshot();

    let mut counters: Vec<_> = vec![];
    let mut gauges: Vec<_> = vec![];

    for (composite_key, _, _, value) in snapshot.into_vec() {
        let (_, key) = composite_key.into_parts();
        let name = key.name().to_string();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };

        match value {
            DebugValue::Counter(v) => counters.push((name, label_str, v)),
            DebugValue::Gauge(v) => gauges.push((name, label_str, v.into_inner())),
            DebugValue::Histogram(_) => {}
        }
    }

    counters.sort();
    gauges.sort_by(|a, b| a.0.cmp(&b.0));

    if !counters.is_empty() {
        println!("   ┌─ Counters (cumulative)");
        for (name, labels, value) in &counters {
            println!("   │  └─ {}{} = {}", name, labels, value);
        }
    }

    if !gauges.is_empty() {
        println!("   └─ Gauges (current value)");
        for (name, labels, value) in &gauges {
            println!("      └─ {}{} = {:.0}", name, labels, value);
        }
    }

    if counters.is_empty() && gauges.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
}
