//! Lifecycle scenarios driven through the public API.
//!
//! Timer behaviour runs on a paused tokio clock; TTL checks use a
//! [`ManualClock`].
//!
//! Run with: `cargo test --test lifecycle`

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use slice_lifecycle::{
    CleanupStrategy, FeatureRouteConfig, ManualClock, SliceAction, SliceConfig, SliceLifecycleManager,
    SliceManagerConfig, SliceManifest,
};

// =============================================================================
// Helpers
// =============================================================================

struct Harness {
    manager: SliceLifecycleManager,
    seen: Arc<Mutex<Vec<SliceAction>>>,
    clock: ManualClock,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(SliceManagerConfig::default())
    }

    fn with_config(config: SliceManagerConfig) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let clock = ManualClock::new(0);
        let sink = {
            let seen = seen.clone();
            move |action: SliceAction| seen.lock().push(action)
        };
        let manager = SliceLifecycleManager::with_config(config, Arc::new(sink), Arc::new(clock.clone()));
        Self { manager, seen, clock }
    }

    fn dispatched(&self) -> Vec<String> {
        self.seen.lock().iter().map(|a| a.action_type.clone()).collect()
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// =============================================================================
// Component strategy
// =============================================================================

#[tokio::test(start_paused = true)]
async fn wallet_resets_two_seconds_after_last_unmount() {
    let h = Harness::new();
    h.manager.register_slice(SliceConfig::new("wallet", "wallet", CleanupStrategy::Component));

    h.manager.register_component("A", &["wallet"]);
    h.manager.unregister_component("A");

    advance(1999).await;
    assert!(h.dispatched().is_empty());

    advance(2).await;
    assert_eq!(h.dispatched(), vec!["wallet/wallet/reset"]);

    let payload = &h.seen.lock()[0].payload;
    assert_eq!(payload.slice_name, "wallet");
    assert_eq!(payload.feature, "wallet");
    assert_eq!(payload.trigger, "lifecycle");
}

#[tokio::test(start_paused = true)]
async fn remount_before_deadline_cancels_reset() {
    let h = Harness::new();
    h.manager.register_slice(SliceConfig::new("wallet", "wallet", CleanupStrategy::Component));

    h.manager.register_component("A", &["wallet"]);
    h.manager.unregister_component("A");
    advance(1500).await;
    h.manager.register_component("B", &["wallet"]);

    advance(10_000).await;
    assert!(h.dispatched().is_empty());
    assert!(!h.manager.has_pending_cleanup("wallet"));
}

#[tokio::test(start_paused = true)]
async fn ref_count_gates_eviction() {
    let h = Harness::new();
    h.manager.register_slice(SliceConfig::new("comments", "blogDemo", CleanupStrategy::Component));

    h.manager.register_component("list", &["comments"]);
    h.manager.register_component("detail", &["comments"]);
    h.manager.unregister_component("list");
    assert!(!h.manager.has_pending_cleanup("comments"));

    advance(5000).await;
    assert!(h.dispatched().is_empty());

    h.manager.unregister_component("detail");
    assert!(h.manager.has_pending_cleanup("comments"));
    advance(2001).await;
    assert_eq!(h.dispatched(), vec!["blogDemo/comments/reset"]);
}

#[tokio::test(start_paused = true)]
async fn custom_delay_and_reducer() {
    let h = Harness::new();
    h.manager.register_slice(
        SliceConfig::new("draft", "editor", CleanupStrategy::Component)
            .with_cleanup_delay(300)
            .with_reducer("clear"),
    );
    h.manager.register_component("Editor", &["draft"]);
    h.manager.unregister_component("Editor");

    advance(301).await;
    assert_eq!(h.dispatched(), vec!["editor/draft/clear"]);
}

#[tokio::test(start_paused = true)]
async fn configured_defaults_apply() {
    let config = SliceManagerConfig {
        component_cleanup_delay_ms: 100,
        default_reducer_name: "purge".into(),
        ..Default::default()
    };
    let h = Harness::with_config(config);
    h.manager.register_slice(SliceConfig::new("wallet", "wallet", CleanupStrategy::Component));
    h.manager.register_component("A", &["wallet"]);
    h.manager.unregister_component("A");

    advance(101).await;
    assert_eq!(h.dispatched(), vec!["wallet/wallet/purge"]);
}

// =============================================================================
// Route strategy
// =============================================================================

#[tokio::test(start_paused = true)]
async fn route_slice_needs_route_and_components_gone() {
    let h = Harness::new();
    h.manager.register_feature(FeatureRouteConfig::new("blogDemo", &["^/blog"], &["posts"]).unwrap());
    h.manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Route));

    h.manager.handle_route_change("/blog/42");
    h.manager.register_component("PostList", &["posts"]);
    h.manager.unregister_component("PostList");
    advance(10_000).await;
    assert!(h.dispatched().is_empty(), "route still active");

    h.manager.register_component("Widget", &["posts"]);
    h.manager.handle_route_change("/home");
    advance(10_000).await;
    assert!(h.dispatched().is_empty(), "component still mounted");

    h.manager.unregister_component("Widget");
    advance(4999).await;
    assert!(h.dispatched().is_empty());
    advance(2).await;
    assert_eq!(h.dispatched(), vec!["blogDemo/posts/reset"]);
}

#[tokio::test(start_paused = true)]
async fn navigating_back_cancels_route_cleanup() {
    let h = Harness::new();
    h.manager.register_feature(FeatureRouteConfig::new("blogDemo", &["^/blog"], &["posts"]).unwrap());
    h.manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Route));

    h.manager.handle_route_change("/blog");
    h.manager.handle_route_change("/about");
    assert!(h.manager.has_pending_cleanup("posts"));

    advance(3000).await;
    h.clock.set(3000);
    h.manager.handle_route_change("/blog/new");
    assert!(!h.manager.has_pending_cleanup("posts"));
    assert_eq!(h.manager.get_slice_last_accessed("posts"), 3000);

    advance(10_000).await;
    assert!(h.dispatched().is_empty());
    assert_eq!(h.manager.current_path(), "/blog/new");
}

// =============================================================================
// Pinning and manual controls
// =============================================================================

#[tokio::test(start_paused = true)]
async fn pinned_slices_survive_everything() {
    let h = Harness::new();
    h.manager.register_feature(FeatureRouteConfig::new("shop", &["^/shop"], &["cart", "notes"]).unwrap());
    h.manager.register_slice(SliceConfig::new("cart", "shop", CleanupStrategy::Route));
    h.manager.register_slice(SliceConfig::new("notes", "shop", CleanupStrategy::Manual));

    h.manager.handle_route_change("/shop");
    h.manager.pin_slice("cart");
    h.manager.pin_slice("notes");
    h.manager.handle_route_change("/home");

    h.manager.manual_cleanup("cart");
    h.manager.manual_cleanup("notes");
    h.manager.cleanup_feature("shop");
    h.manager.cleanup_all_inactive();
    advance(60_000).await;
    assert!(h.dispatched().is_empty());

    h.manager.unpin_slice("notes");
    assert_eq!(h.dispatched(), vec!["shop/notes/reset"]);
}

#[tokio::test]
async fn cached_slices_evict_only_after_timeout() {
    let h = Harness::new();
    h.manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Cached));
    h.manager.register_component("PostList", &["posts"]);

    h.clock.set(300_000);
    h.manager.unregister_component("PostList");
    assert!(h.dispatched().is_empty(), "accessed at registration, still fresh");

    h.manager.register_component("PostList", &["posts"]);
    h.clock.set(600_001);
    h.manager.unregister_component("PostList");
    assert_eq!(h.dispatched(), vec!["blogDemo/posts/reset"]);
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn re_registration_keeps_runtime_state() {
    let h = Harness::new();
    h.manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Cached));
    h.manager.register_component("PostList", &["posts"]);
    h.manager.pin_slice("posts");

    h.clock.set(50);
    h.manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Persistent));

    let status = &h.manager.get_slice_status()["posts"];
    assert_eq!(status.active_components, 1);
    assert!(status.is_pinned);
    assert_eq!(status.last_accessed, 0);
    assert_eq!(status.strategy, Some(CleanupStrategy::Persistent));
}

#[tokio::test]
async fn unknown_names_are_tolerated() {
    let h = Harness::new();
    h.manager.register_component("ghost", &["nothing"]);
    h.manager.unregister_component("ghost");
    h.manager.unregister_component("never-registered");
    h.manager.pin_slice("nothing");
    h.manager.unpin_slice("nothing");
    h.manager.manual_cleanup("nothing");
    h.manager.cleanup_feature("nothing");
    h.manager.handle_route_change("/anywhere");

    assert!(h.dispatched().is_empty());
    assert!(h.manager.get_slice_status().is_empty());
    assert_eq!(h.manager.get_slice_last_accessed("nothing"), 0);
}

#[tokio::test(start_paused = true)]
async fn manifest_bootstrap() {
    let h = Harness::new();
    let manifest = SliceManifest::from_json_str(
        r#"{
            "features": [
                {"name": "blogDemo", "routes": ["^/blog"], "slices": ["posts", "categories"]}
            ],
            "slices": [
                {"name": "posts", "feature": "blogDemo", "cleanup_strategy": "route", "cleanup_delay": 1000},
                {"name": "categories", "feature": "blogDemo", "cleanup_strategy": "persistent"}
            ]
        }"#,
    )
    .unwrap();
    h.manager.apply_manifest(&manifest).unwrap();

    h.manager.handle_route_change("/blog");
    let features = h.manager.get_feature_status();
    assert!(features["blogDemo"].is_any_slice_active);

    h.manager.handle_route_change("/");
    advance(1001).await;
    assert_eq!(h.dispatched(), vec!["blogDemo/posts/reset"]);
}

#[tokio::test]
async fn bad_manifest_pattern_registers_nothing() {
    let h = Harness::new();
    let manifest = SliceManifest::from_json_str(
        r#"{
            "features": [{"name": "broken", "routes": ["(unclosed"], "slices": ["x"]}],
            "slices": [{"name": "x", "feature": "broken", "cleanup_strategy": "component"}]
        }"#,
    )
    .unwrap();

    let err = h.manager.apply_manifest(&manifest).unwrap_err();
    assert!(err.to_string().contains("broken"));
    assert!(h.manager.get_slice_config("x").is_none());
    assert!(h.manager.get_feature_config("broken").is_none());
}
