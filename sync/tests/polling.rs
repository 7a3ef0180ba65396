mod support;

use common::{JobId, QueryKey};
use serde_json::json;
use std::time::Duration;
use support::{cache, jobs_route, page_json, FakeApi, STATS};

#[tokio::test(start_paused = true)]
async fn polls_every_two_seconds_while_observed() {
    let api = FakeApi::new();
    api.set(STATS, json!({"total_jobs": 1}));
    let cache = cache(&api);

    let mut stats = cache.observe(QueryKey::Stats);
    stats.settled().await;
    assert_eq!(api.calls(STATS), 1);
    assert!(cache.is_polling(&QueryKey::Stats));

    tokio::time::sleep(Duration::from_millis(6100)).await;
    assert_eq!(api.calls(STATS), 4);
}

#[tokio::test(start_paused = true)]
async fn polling_stops_when_unobserved_and_resumes_on_return() {
    let api = FakeApi::new();
    api.set(&jobs_route(1), page_json(&["a"], "pending", 1, 1));
    let cache = cache(&api);
    let key = QueryKey::Jobs { limit: 20, offset: 0 };

    let mut view = cache.observe(key.clone());
    view.settled().await;
    drop(view);
    assert!(!cache.is_polling(&key));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.calls(&jobs_route(1)), 1);

    // Data is now older than the stale time: re-observing fetches at once.
    let mut view = cache.observe(key.clone());
    assert!(cache.is_polling(&key));
    view.settled().await;
    assert_eq!(api.calls(&jobs_route(1)), 2);

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(api.calls(&jobs_route(1)), 3);
}

#[tokio::test(start_paused = true)]
async fn job_detail_is_fetched_on_demand_only() {
    let api = FakeApi::new();
    api.set("GET /jobs/abc123", json!({"jobId": "abc123", "status": "completed"}));
    let cache = cache(&api);
    let key = QueryKey::Job(JobId::from("abc123"));

    let mut detail = cache.observe(key.clone());
    detail.settled().await;
    assert!(!cache.is_polling(&key));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.calls("GET /jobs/abc123"), 1);

    detail.refetch().await;
    assert_eq!(api.calls("GET /jobs/abc123"), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_is_not_stacked_by_later_ticks() {
    let api = FakeApi::new();
    api.set(STATS, json!({"total_jobs": 1}));
    let cache = cache(&api);

    let mut stats = cache.observe(QueryKey::Stats);
    stats.settled().await;

    // The next fetch hangs until released; ticks at 4s and 6s find it running.
    let release = api.hold(STATS, json!({"total_jobs": 2}));
    tokio::time::sleep(Duration::from_millis(6100)).await;
    assert_eq!(api.calls(STATS), 2);
    assert!(stats.state().is_fetching);

    release.send(()).unwrap();
    let state = stats.settled().await;
    assert_eq!(state.stats().map(|s| s.total_jobs), Some(2));
}

#[tokio::test(start_paused = true)]
async fn polling_continues_while_any_view_observes() {
    let api = FakeApi::new();
    api.set(STATS, json!({}));
    let cache = cache(&api);

    let mut first = cache.observe(QueryKey::Stats);
    let second = cache.observe(QueryKey::Stats);
    first.settled().await;
    drop(second);

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(api.calls(STATS), 2);

    drop(first);
    assert!(!cache.is_polling(&QueryKey::Stats));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(api.calls(STATS), 2);
}
