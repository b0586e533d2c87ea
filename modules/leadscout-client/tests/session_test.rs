use std::sync::Arc;

use uuid::Uuid;

use leadscout_client::testing::{api_error, page, result, MockSearchBackend};
use leadscout_client::{ClientError, SearchSessionState};
use leadscout_common::SessionStatus;

fn holder(backend: MockSearchBackend) -> (SearchSessionState, Arc<MockSearchBackend>) {
    let backend = Arc::new(backend);
    (SearchSessionState::new(backend.clone()), backend)
}

#[tokio::test]
async fn start_search_seeds_state_from_first_page() {
    let id = Uuid::new_v4();
    let (state, backend) = holder(MockSearchBackend::new().on_create(Ok(page(
        id,
        1,
        vec![result("Pizzaria Bella", false, 1), result("Forno Nonna", true, 3)],
        true,
    ))));

    let first = state.start_search(" Pizzarias ", "São Paulo").await.unwrap();

    assert_eq!(first.session_id, id);
    assert_eq!(backend.create_calls(), 1);
    let session = state.session().unwrap();
    assert_eq!(session.id, id);
    assert_eq!(session.query, "Pizzarias");
    assert_eq!(session.current_page, 1);
    assert_eq!(session.new_leads_count, 1);
    assert_eq!(session.duplicate_leads_count, 1);
    assert_eq!(session.total_results_found, 2);
    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(state.results().len(), 2);
    assert!(state.has_more());
    assert!(!state.is_completed());
    assert!(!state.is_searching());
    assert_eq!(state.error(), None);
}

#[tokio::test]
async fn blank_input_is_rejected_without_a_call() {
    let (state, backend) = holder(MockSearchBackend::new());

    let err = state.start_search("   ", "São Paulo").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidInput(_)));

    let err = state.start_search("Pizzarias", "").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidInput(_)));

    assert_eq!(backend.create_calls(), 0);
    assert!(state.error().is_some());
    assert!(state.session().is_none());
}

#[tokio::test]
async fn fetch_more_on_completed_session_makes_no_call() {
    let id = Uuid::new_v4();
    let (state, backend) = holder(
        MockSearchBackend::new().on_create(Ok(page(id, 1, vec![result("Única", false, 1)], false))),
    );

    state.start_search("Pizzarias", "São Paulo").await.unwrap();
    assert!(state.is_completed());

    let next = state.fetch_more().await.unwrap();

    assert!(next.is_none());
    assert_eq!(backend.fetch_more_calls(), 0);
}

#[tokio::test]
async fn fetch_more_without_session_makes_no_call() {
    let (state, backend) = holder(MockSearchBackend::new());

    assert!(state.fetch_more().await.unwrap().is_none());
    assert_eq!(backend.fetch_more_calls(), 0);
}

#[tokio::test]
async fn fetch_more_appends_and_updates_totals() {
    let id = Uuid::new_v4();
    let mut second = page(
        id,
        2,
        vec![result("Pizza Rápida", false, 1), result("Pizzaria Bella", true, 2)],
        false,
    );
    second.total_new = 3;
    second.total_duplicates = 1;

    let (state, backend) = holder(
        MockSearchBackend::new()
            .on_create(Ok(page(
                id,
                1,
                vec![result("Pizzaria Bella", false, 1), result("Forno Nonna", false, 1)],
                true,
            )))
            .on_fetch_more(Ok(second)),
    );

    state.start_search("Pizzarias", "São Paulo").await.unwrap();
    let fetched = state.fetch_more().await.unwrap().unwrap();

    assert_eq!(fetched.current_page, 2);
    assert_eq!(backend.fetched_sessions(), vec![id]);
    let names: Vec<String> = state.results().into_iter().map(|r| r.name).collect();
    assert_eq!(
        names,
        vec!["Pizzaria Bella", "Forno Nonna", "Pizza Rápida", "Pizzaria Bella"]
    );
    let session = state.session().unwrap();
    assert_eq!(session.current_page, 2);
    assert_eq!(session.new_leads_count, 3);
    assert_eq!(session.duplicate_leads_count, 1);
    assert_eq!(session.total_results_found, 4);
    assert!(state.is_completed());
    assert!(!state.has_more());
}

#[tokio::test]
async fn fetch_more_error_keeps_accumulated_results() {
    let id = Uuid::new_v4();
    let (state, _backend) = holder(
        MockSearchBackend::new()
            .on_create(Ok(page(id, 1, vec![result("Pizzaria Bella", false, 1)], true)))
            .on_fetch_more(Err(api_error(429, "rate_limited"))),
    );

    state.start_search("Pizzarias", "São Paulo").await.unwrap();
    let err = state.fetch_more().await.unwrap_err();

    assert_eq!(err.code(), "rate_limited");
    assert!(state.error().is_some());
    assert_eq!(state.results().len(), 1);
    let session = state.session().unwrap();
    assert_eq!(session.current_page, 1);
    assert!(session.has_more);
    assert!(!state.is_searching());
}

#[tokio::test]
async fn failed_start_leaves_previous_session() {
    let id = Uuid::new_v4();
    let (state, _backend) = holder(
        MockSearchBackend::new()
            .on_create(Ok(page(id, 1, vec![result("Pizzaria Bella", false, 1)], true)))
            .on_create(Err(api_error(502, "provider_auth"))),
    );

    state.start_search("Pizzarias", "São Paulo").await.unwrap();
    let err = state.start_search("Hamburguerias", "Curitiba").await.unwrap_err();

    assert_eq!(err.code(), "provider_auth");
    assert_eq!(state.session().unwrap().id, id);
    assert!(state.error().unwrap().contains("provider_auth"));
}

#[tokio::test]
async fn superseded_search_response_is_discarded() {
    let old_id = Uuid::new_v4();
    let new_id = Uuid::new_v4();

    let backend = MockSearchBackend::new();
    let gate = backend.gated_create(Ok(page(old_id, 1, vec![result("Antiga", false, 1)], true)));
    let (state, backend) =
        holder(backend.on_create(Ok(page(new_id, 1, vec![result("Nova", false, 1)], true))));

    let first = {
        let state = state.clone();
        tokio::spawn(async move { state.start_search("Pizzarias", "São Paulo").await })
    };
    while backend.create_calls() < 1 {
        tokio::task::yield_now().await;
    }

    state.start_search("Hamburguerias", "Curitiba").await.unwrap();
    gate.notify_one();
    let stale = first.await.unwrap().unwrap();

    assert_eq!(stale.session_id, old_id);
    assert_eq!(state.session().unwrap().id, new_id);
    let names: Vec<String> = state.results().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Nova"]);
    assert!(!state.is_searching());
}

#[tokio::test]
async fn reset_discards_page_in_flight() {
    let id = Uuid::new_v4();
    let backend = MockSearchBackend::new()
        .on_create(Ok(page(id, 1, vec![result("Pizzaria Bella", false, 1)], true)));
    let gate = backend.gated_fetch_more(Ok(page(id, 2, vec![result("Tardia", false, 1)], false)));
    let (state, backend) = holder(backend);

    state.start_search("Pizzarias", "São Paulo").await.unwrap();

    let pending = {
        let state = state.clone();
        tokio::spawn(async move { state.fetch_more().await })
    };
    while backend.fetch_more_calls() < 1 {
        tokio::task::yield_now().await;
    }

    state.reset_search();
    gate.notify_one();

    assert!(pending.await.unwrap().unwrap().is_none());
    assert!(state.session().is_none());
    assert!(state.results().is_empty());
    assert_eq!(state.error(), None);
}

#[tokio::test]
async fn fetch_more_while_loading_is_a_no_op() {
    let id = Uuid::new_v4();
    let backend = MockSearchBackend::new()
        .on_create(Ok(page(id, 1, vec![result("Pizzaria Bella", false, 1)], true)));
    let gate = backend.gated_fetch_more(Ok(page(id, 2, vec![result("Forno Nonna", false, 1)], true)));
    let (state, backend) = holder(backend);

    state.start_search("Pizzarias", "São Paulo").await.unwrap();

    let pending = {
        let state = state.clone();
        tokio::spawn(async move { state.fetch_more().await })
    };
    while backend.fetch_more_calls() < 1 {
        tokio::task::yield_now().await;
    }

    assert!(state.is_searching());
    assert!(state.fetch_more().await.unwrap().is_none());
    assert_eq!(backend.fetch_more_calls(), 1);

    gate.notify_one();
    assert!(pending.await.unwrap().unwrap().is_some());
    assert_eq!(state.results().len(), 2);
}

#[tokio::test]
async fn reset_clears_everything() {
    let id = Uuid::new_v4();
    let (state, _backend) = holder(
        MockSearchBackend::new().on_create(Ok(page(id, 1, vec![result("Pizzaria Bella", false, 1)], true))),
    );

    state.start_search("Pizzarias", "São Paulo").await.unwrap();
    state.reset_search();

    assert!(state.session().is_none());
    assert!(state.results().is_empty());
    assert!(!state.has_more());
    assert!(!state.is_completed());
}
