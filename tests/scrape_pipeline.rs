mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{instant_throttle, ScriptedAdapter, ScriptedSession};
use job_autopilot::config::ScraperSessionConfig;
use job_autopilot::models::SearchFilters;
use job_autopilot::workflow::{CancelSignal, ScrapeFlow, ScrapeOutcome, StopReason};

fn session_config(max_results: usize, max_pages: usize) -> ScraperSessionConfig {
    ScraperSessionConfig {
        max_results,
        max_pages,
        ..Default::default()
    }
}

async fn scrape(
    adapter: ScriptedAdapter,
    config: &ScraperSessionConfig,
    session: &mut ScriptedSession,
    cancel: &CancelSignal,
) -> (ScrapeOutcome, Arc<ScriptedAdapter>) {
    let adapter = Arc::new(adapter);
    let flow = ScrapeFlow::new(adapter.clone(), instant_throttle(), config);
    let outcome = flow
        .run(session, &SearchFilters::new("rust engineer"), cancel)
        .await
        .expect("抓取不应返回错误");
    (outcome, adapter)
}

fn unique_ids(outcome: &ScrapeOutcome) -> usize {
    outcome
        .postings
        .iter()
        .map(|p| p.id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

#[tokio::test(start_paused = true)]
async fn test_three_pages_until_last_page() {
    let mut session = ScriptedSession::new();
    let (outcome, adapter) = scrape(
        ScriptedAdapter::with_pages(vec![10, 10, 4]),
        &session_config(50, 10),
        &mut session,
        &CancelSignal::new(),
    )
    .await;

    assert_eq!(outcome.postings.len(), 24);
    assert_eq!(unique_ids(&outcome), 24);
    assert_eq!(outcome.pages, 3);
    assert_eq!(outcome.stop, StopReason::LastPage);
    assert!(!outcome.is_partial());
    assert_eq!(adapter.calls().parse_calls, 3);
    assert_eq!(session.close_count(), 1);
    assert!(outcome.postings.iter().all(|p| p.id.starts_with("linkedin:")));
}

#[tokio::test(start_paused = true)]
async fn test_stops_and_truncates_at_max_results() {
    let mut session = ScriptedSession::new();
    let (outcome, _) = scrape(
        ScriptedAdapter::with_pages(vec![10, 10, 10]),
        &session_config(15, 10),
        &mut session,
        &CancelSignal::new(),
    )
    .await;

    assert_eq!(outcome.postings.len(), 15);
    assert_eq!(unique_ids(&outcome), 15);
    assert_eq!(outcome.pages, 2);
    assert_eq!(outcome.stop, StopReason::MaxResults);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_ids_are_dropped() {
    let mut adapter = ScriptedAdapter::with_pages(vec![5, 5, 3]);
    adapter.repeat_ids = true;
    let mut session = ScriptedSession::new();
    let (outcome, _) = scrape(adapter, &session_config(50, 10), &mut session, &CancelSignal::new()).await;

    // 第 2 页与第 1 页完全重复
    assert_eq!(outcome.postings.len(), 8);
    assert_eq!(unique_ids(&outcome), 8);
    assert_eq!(outcome.pages, 3);
}

#[tokio::test(start_paused = true)]
async fn test_initial_navigation_failure_returns_empty() {
    let mut session = ScriptedSession::failing_navigation();
    let (outcome, adapter) = scrape(
        ScriptedAdapter::with_pages(vec![10, 10]),
        &session_config(50, 10),
        &mut session,
        &CancelSignal::new(),
    )
    .await;

    assert!(outcome.postings.is_empty());
    assert_eq!(outcome.pages, 0);
    assert_eq!(outcome.stop, StopReason::NavigationFailed);
    assert_eq!(adapter.calls().parse_calls, 0);
    assert_eq!(session.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pagination_failure_keeps_partial_results() {
    let mut adapter = ScriptedAdapter::with_pages(vec![10, 10, 10]);
    adapter.fail_advance_to = Some(2);
    let mut session = ScriptedSession::new();
    let (outcome, _) = scrape(adapter, &session_config(50, 10), &mut session, &CancelSignal::new()).await;

    assert_eq!(outcome.postings.len(), 20);
    assert_eq!(outcome.stop, StopReason::NavigationFailed);
    assert!(outcome.is_partial());
    assert_eq!(session.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_parser_panic_counts_as_empty_page() {
    let mut adapter = ScriptedAdapter::with_pages(vec![10, 10, 4]);
    adapter.panic_on_page = Some(1);
    let mut session = ScriptedSession::new();
    let (outcome, _) = scrape(adapter, &session_config(50, 10), &mut session, &CancelSignal::new()).await;

    assert_eq!(outcome.postings.len(), 14);
    assert_eq!(outcome.pages, 3);
    assert_eq!(outcome.stop, StopReason::LastPage);
}

#[tokio::test(start_paused = true)]
async fn test_page_cap() {
    let mut session = ScriptedSession::new();
    let (outcome, _) = scrape(
        ScriptedAdapter::with_pages(vec![5; 10]),
        &session_config(100, 2),
        &mut session,
        &CancelSignal::new(),
    )
    .await;

    assert_eq!(outcome.postings.len(), 10);
    assert_eq!(outcome.pages, 2);
    assert_eq!(outcome.stop, StopReason::MaxPages);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_returns_first_page() {
    let cancel = CancelSignal::new();
    cancel.cancel();
    let mut session = ScriptedSession::new();
    let (outcome, _) = scrape(
        ScriptedAdapter::with_pages(vec![5, 5, 5]),
        &session_config(50, 10),
        &mut session,
        &cancel,
    )
    .await;

    assert_eq!(outcome.postings.len(), 5);
    assert_eq!(outcome.stop, StopReason::Cancelled);
    assert_eq!(session.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_challenge_page_keeps_earlier_results() {
    let mut adapter = ScriptedAdapter::with_pages(vec![10, 10, 10]);
    adapter.block_on_page = Some(1);
    let mut session = ScriptedSession::new();
    let (outcome, adapter) = scrape(adapter, &session_config(50, 10), &mut session, &CancelSignal::new()).await;

    assert_eq!(outcome.postings.len(), 10);
    assert_eq!(outcome.pages, 2);
    assert_eq!(outcome.stop, StopReason::Blocked("captcha challenge".to_string()));
    assert!(outcome.is_partial());
    assert_eq!(adapter.calls().parse_calls, 1, "被拦截的页面不解析");
    assert_eq!(session.close_count(), 1);
}
