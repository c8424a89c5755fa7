//! Fetch-flow scenarios: staleness, keyed caching and coalescing.
//!
//! Run with: `cargo test --test smart_fetch`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use slice_lifecycle::fetch::{integration, Selector};
use slice_lifecycle::{
    CleanupStrategy, FetchParams, ManualClock, SliceAction, SliceCache, SliceConfig, SliceLifecycleManager,
    SliceManagerConfig, SmartFetchOptions, SmartFetcher,
};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Post {
    id: u32,
    title: String,
}

#[derive(Default)]
struct BlogState {
    posts: Vec<Post>,
    language: Option<String>,
    last_params: Option<FetchParams>,
}

fn select_posts(s: &BlogState) -> Option<&Vec<Post>> {
    Some(&s.posts)
}

fn select_language(s: &BlogState) -> Option<&str> {
    s.language.as_deref()
}

fn select_last_params(s: &BlogState) -> Option<&FetchParams> {
    s.last_params.as_ref()
}

const POSTS: Selector<'static, BlogState, Vec<Post>> = &select_posts;
const LANGUAGE: Selector<'static, BlogState, str> = &select_language;
const LAST_PARAMS: Selector<'static, BlogState, FetchParams> = &select_last_params;

fn engine() -> (SliceLifecycleManager, ManualClock) {
    let clock = ManualClock::new(0);
    let manager = SliceLifecycleManager::with_config(
        SliceManagerConfig::default(),
        Arc::new(|_: SliceAction| {}),
        Arc::new(clock.clone()),
    );
    (manager, clock)
}

fn post(id: u32) -> Post {
    Post { id, title: format!("post {}", id) }
}

/// Fetcher that counts invocations and returns `posts`.
fn api(
    calls: &Arc<AtomicUsize>,
    posts: Vec<Post>,
) -> impl FnOnce() -> std::future::Ready<Result<Vec<Post>, String>> + Send {
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(posts))
    }
}

// =============================================================================
// Staleness
// =============================================================================

#[tokio::test]
async fn cached_posts_refetch_only_after_timeout() {
    let (manager, clock) = engine();
    manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Cached));
    let fetcher = SmartFetcher::from_manager(&manager);
    let calls = Arc::new(AtomicUsize::new(0));
    let params = FetchParams::new();

    let mut state = BlogState::default();
    let fetched = fetcher
        .smart_fetch(&state, "posts", &params, POSTS, api(&calls, vec![post(1)]), SmartFetchOptions::new())
        .await
        .unwrap();
    state.posts = fetched;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    clock.set(299_999);
    let reused = fetcher
        .smart_fetch(&state, "posts", &params, POSTS, api(&calls, vec![post(2)]), SmartFetchOptions::new())
        .await
        .unwrap();
    assert_eq!(reused, vec![post(1)]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    clock.set(300_001);
    let refreshed = fetcher
        .smart_fetch(&state, "posts", &params, POSTS, api(&calls, vec![post(3)]), SmartFetchOptions::new())
        .await
        .unwrap();
    assert_eq!(refreshed, vec![post(3)]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(manager.get_slice_last_accessed("posts"), 300_001);
}

#[tokio::test]
async fn params_change_refetches_persistent_slice() {
    let (manager, _) = engine();
    manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Persistent));
    let fetcher = SmartFetcher::from_manager(&manager);
    let calls = Arc::new(AtomicUsize::new(0));

    let page1 = FetchParams::new().with("page", 1);
    let state = BlogState {
        posts: vec![post(1)],
        last_params: Some(page1.clone()),
        ..Default::default()
    };
    let tracked = || SmartFetchOptions::new().with_last_fetch_params(LAST_PARAMS);

    let same = fetcher
        .smart_fetch(&state, "posts", &page1, POSTS, api(&calls, vec![post(9)]), tracked())
        .await
        .unwrap();
    assert_eq!(same, vec![post(1)]);

    let page2 = FetchParams::new().with("page", 2);
    let next = fetcher
        .smart_fetch(&state, "posts", &page2, POSTS, api(&calls, vec![post(2)]), tracked())
        .await
        .unwrap();
    assert_eq!(next, vec![post(2)]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn nested_params_need_the_same_instance() {
    let (manager, _) = engine();
    manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Persistent));
    let fetcher = SmartFetcher::from_manager(&manager);
    let calls = Arc::new(AtomicUsize::new(0));

    let filter = Arc::new(json!({"tags": ["rust"]}));
    let state = BlogState {
        posts: vec![post(1)],
        last_params: Some(FetchParams::new().with("filter", filter.clone())),
        ..Default::default()
    };

    let same_instance = FetchParams::new().with("filter", filter);
    fetcher
        .smart_fetch(
            &state,
            "posts",
            &same_instance,
            POSTS,
            api(&calls, vec![post(2)]),
            SmartFetchOptions::new().with_last_fetch_params(LAST_PARAMS),
        )
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Structurally equal, but a different value: shallow comparison sees a change.
    let rebuilt = FetchParams::new().with("filter", Arc::new(json!({"tags": ["rust"]})));
    fetcher
        .smart_fetch(
            &state,
            "posts",
            &rebuilt,
            POSTS,
            api(&calls, vec![post(2)]),
            SmartFetchOptions::new().with_last_fetch_params(LAST_PARAMS),
        )
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn language_switch_refetches() {
    let (manager, _) = engine();
    manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Persistent));
    let fetcher = SmartFetcher::from_manager(&manager);
    let calls = Arc::new(AtomicUsize::new(0));
    let state = BlogState {
        posts: vec![post(1)],
        language: Some("en".into()),
        ..Default::default()
    };

    for (language, expected_calls) in [("en", 0), ("fr", 1)] {
        fetcher
            .smart_fetch(
                &state,
                "posts",
                &FetchParams::new().with("language", language),
                POSTS,
                api(&calls, vec![post(5)]),
                SmartFetchOptions::new().with_language_selector(LANGUAGE),
            )
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), expected_calls, "language {}", language);
    }
}

// =============================================================================
// Keyed cache
// =============================================================================

#[tokio::test(start_paused = true)]
async fn concurrent_smart_fetches_share_one_request() {
    let (manager, _) = engine();
    manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Cached));
    let fetcher = SmartFetcher::from_manager(&manager);
    let calls = Arc::new(AtomicUsize::new(0));
    let state = BlogState::default();
    let params = FetchParams::new().with("page", 1);

    let slow = |calls: Arc<AtomicUsize>| {
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, String>(vec![post(1)])
        }
    };

    let (a, b) = tokio::join!(
        fetcher.smart_fetch(&state, "posts", &params, POSTS, slow(calls.clone()), SmartFetchOptions::new()),
        fetcher.smart_fetch(&state, "posts", &params, POSTS, slow(calls.clone()), SmartFetchOptions::new()),
    );
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = fetcher.cache().stats();
    assert_eq!(stats.coalesced, 1);
    assert_eq!(stats.slice_breakdown.get("posts"), Some(&1));
}

#[tokio::test]
async fn cache_keys_follow_params() {
    let (manager, _) = engine();
    manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Cached));
    let cache = Arc::new(SliceCache::new(&manager));
    let fetcher = SmartFetcher::new(manager.handle(), cache.clone());
    let calls = Arc::new(AtomicUsize::new(0));
    let state = BlogState::default();

    for page in [1, 2, 1] {
        let params = FetchParams::new().with("page", page);
        fetcher
            .smart_fetch(&state, "posts", &params, POSTS, api(&calls, vec![post(page as u32)]), SmartFetchOptions::new())
            .await
            .unwrap();
    }
    // Empty store forces the cache path every time; page 1 is served from cache.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.invalidate_matching("posts", "page=2"), 1);
    assert_eq!(cache.len(), 1);
}

// =============================================================================
// Degradation
// =============================================================================

#[tokio::test]
async fn fetch_flows_survive_engine_teardown() {
    let (manager, _) = engine();
    manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Cached));
    let fetcher = SmartFetcher::from_manager(&manager);
    let handle = manager.handle();
    drop(manager);

    assert_eq!(integration::get_slice_last_accessed(&handle, "posts"), 0);
    assert!(!integration::should_use_slice_cache(&handle, "posts"));
    integration::update_slice_access_time(&handle, "posts");

    let calls = Arc::new(AtomicUsize::new(0));
    let state = BlogState { posts: vec![post(1)], ..Default::default() };
    let result = fetcher
        .smart_fetch(&state, "posts", &FetchParams::new(), POSTS, api(&calls, vec![post(2)]), SmartFetchOptions::new())
        .await
        .unwrap();
    assert_eq!(result, vec![post(1)], "no config means existing data is reused");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
