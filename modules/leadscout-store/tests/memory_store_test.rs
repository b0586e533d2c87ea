//! Behavioural tests for the in-memory store. The Postgres store is held to the
//! same expectations in pg_store_test.rs.

use std::sync::Arc;

use chrono::{Duration, Utc};
use leadscout_common::{LeadDraft, LeadFilters, SessionStatus, SortOption, MAX_SIGHTINGS};
use leadscout_store::{LeadStore, MemoryStore, PageRecord, StoreError};
use uuid::Uuid;

fn draft(name: &str, address: &str) -> LeadDraft {
    LeadDraft {
        address: Some(address.to_string()),
        ..LeadDraft::new(name)
    }
}

fn page(company_id: Uuid, session_id: Uuid, page: i32, drafts: Vec<LeadDraft>) -> PageRecord {
    PageRecord {
        company_id,
        session_id,
        page,
        drafts,
        has_more: true,
        seen_at: Utc::now(),
    }
}

#[tokio::test]
async fn first_sighting_creates_lead_with_times_found_one() {
    let store = MemoryStore::new();
    let company = Uuid::new_v4();
    let session = store.create_session(company, "Pizzarias", "São Paulo").await.unwrap();

    let recorded = store
        .record_page(page(company, session.id, 0, vec![draft("Pizzaria Bella", "Rua Augusta, 1000")]))
        .await
        .unwrap();

    assert_eq!(recorded.new_count, 1);
    assert_eq!(recorded.duplicate_count, 0);
    assert!(!recorded.results[0].is_duplicate);
    assert_eq!(recorded.results[0].times_found, 1);

    let leads = store.leads(company).await;
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].first_seen_at, leads[0].last_seen_at);
    assert_eq!(leads[0].search_id, Some(session.id));
    assert_eq!(leads[0].sources.len(), 1);
    assert_eq!(leads[0].sources[0].query, "Pizzarias");
}

#[tokio::test]
async fn n_sightings_give_times_found_n() {
    let store = MemoryStore::new();
    let company = Uuid::new_v4();
    let t0 = Utc::now() - Duration::days(3);

    for n in 0..4 {
        let session = store.create_session(company, "Pizzarias", "São Paulo").await.unwrap();
        let mut record = page(company, session.id, 0, vec![draft("Pizzaria Bella", "Rua Augusta, 1000")]);
        record.seen_at = t0 + Duration::days(n);
        store.record_page(record).await.unwrap();
    }

    let leads = store.leads(company).await;
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].times_found, 4);
    assert_eq!(leads[0].first_seen_at, t0);
    assert_eq!(leads[0].last_seen_at, t0 + Duration::days(3));
    assert_eq!(leads[0].sources.len(), 4);
}

#[tokio::test]
async fn only_newest_sightings_are_kept() {
    let store = MemoryStore::new();
    let company = Uuid::new_v4();
    let t0 = Utc::now() - Duration::days(100);

    for n in 0..(MAX_SIGHTINGS as i64 + 5) {
        let session = store.create_session(company, "Pizzarias", "São Paulo").await.unwrap();
        let mut record = page(company, session.id, 0, vec![draft("Pizzaria Bella", "Rua Augusta, 1000")]);
        record.seen_at = t0 + Duration::days(n);
        store.record_page(record).await.unwrap();
    }

    let leads = store.leads(company).await;
    assert_eq!(leads[0].times_found as usize, MAX_SIGHTINGS + 5);
    assert_eq!(leads[0].sources.len(), MAX_SIGHTINGS);
    assert_eq!(leads[0].sources[0].found_at, t0 + Duration::days(5));
    assert_eq!(leads[0].sources.last().unwrap().found_at, leads[0].last_seen_at);
}

#[tokio::test]
async fn opposite_order_pages_give_the_same_counts() {
    let store = Arc::new(MemoryStore::new());
    let company = Uuid::new_v4();
    let forward: Vec<LeadDraft> = (0..20)
        .map(|i| draft(&format!("Pizzaria {i}"), &format!("Rua {i}")))
        .collect();
    let reversed: Vec<LeadDraft> = forward.iter().rev().cloned().collect();

    let mut handles = Vec::new();
    for drafts in [forward, reversed] {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let session = store.create_session(company, "Pizzarias", "SP").await.unwrap();
            store.record_page(page(company, session.id, 0, drafts)).await.unwrap()
        }));
    }
    let mut pages = Vec::new();
    for handle in handles {
        pages.push(handle.await.unwrap());
    }

    assert_eq!(pages[1].results[0].name, "Pizzaria 19");
    assert_eq!(pages[0].new_count + pages[1].new_count, 20);
    let leads = store.leads(company).await;
    assert_eq!(leads.len(), 20);
    assert!(leads.iter().all(|l| l.times_found == 2));
}

#[tokio::test]
async fn repeated_page_is_all_duplicates() {
    let store = MemoryStore::new();
    let company = Uuid::new_v4();
    let drafts = vec![
        draft("Pizzaria Bella", "Rua Augusta, 1000"),
        draft("Forno Nonna", "Rua Oscar Freire, 20"),
        draft("Pizza Rápida", "Av. Paulista, 900"),
    ];

    let first = store.create_session(company, "Pizzarias", "São Paulo").await.unwrap();
    let a = store
        .record_page(page(company, first.id, 0, drafts.clone()))
        .await
        .unwrap();
    assert_eq!(a.new_count, 3);

    let second = store.create_session(company, "Pizzarias", "São Paulo").await.unwrap();
    let b = store.record_page(page(company, second.id, 0, drafts)).await.unwrap();

    assert_eq!(b.new_count, 0);
    assert_eq!(b.duplicate_count, 3);
    assert!(b.results.iter().all(|r| r.is_duplicate && r.times_found == 2));
    assert_eq!(
        b.new_count + b.duplicate_count,
        b.results.len() as i32,
        "every result is either new or a duplicate"
    );
}

#[tokio::test]
async fn repeat_within_one_page_collapses_to_one_lead() {
    let store = MemoryStore::new();
    let company = Uuid::new_v4();
    let session = store.create_session(company, "Pizzarias", "São Paulo").await.unwrap();

    let recorded = store
        .record_page(page(
            company,
            session.id,
            0,
            vec![
                draft("Pizzaria Bella", "Rua Augusta, 1000"),
                draft("PIZZARIA BELLA LTDA", "rua augusta 1000"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(recorded.new_count, 1);
    assert_eq!(recorded.duplicate_count, 1);
    assert_eq!(recorded.results[0].id, recorded.results[1].id);
    assert_eq!(store.leads(company).await.len(), 1);
}

#[tokio::test]
async fn session_advances_and_completes() {
    let store = MemoryStore::new();
    let company = Uuid::new_v4();
    let session = store.create_session(company, "Pizzarias", "São Paulo").await.unwrap();

    let p0 = store
        .record_page(page(company, session.id, 0, vec![draft("A", "Rua 1")]))
        .await
        .unwrap();
    assert_eq!(p0.session.current_page, 1);
    assert_eq!(p0.session.status, SessionStatus::Active);

    let mut last = page(company, session.id, 1, vec![draft("B", "Rua 2"), draft("A", "Rua 1")]);
    last.has_more = false;
    let p1 = store.record_page(last).await.unwrap();

    assert_eq!(p1.session.current_page, 2);
    assert_eq!(p1.session.status, SessionStatus::Completed);
    assert!(!p1.session.has_more);
    assert_eq!(p1.session.new_leads_count, 2);
    assert_eq!(p1.session.duplicate_leads_count, 1);
    assert_eq!(p1.session.total_results_found, 3);
}

#[tokio::test]
async fn stale_page_is_rejected_and_nothing_is_written() {
    let store = MemoryStore::new();
    let company = Uuid::new_v4();
    let session = store.create_session(company, "Pizzarias", "São Paulo").await.unwrap();

    store
        .record_page(page(company, session.id, 0, vec![draft("A", "Rua 1")]))
        .await
        .unwrap();

    let err = store
        .record_page(page(company, session.id, 0, vec![draft("B", "Rua 2")]))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Conflict(_)));
    assert_eq!(store.leads(company).await.len(), 1);
}

#[tokio::test]
async fn concurrent_sightings_never_undercount() {
    let store = Arc::new(MemoryStore::new());
    let company = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let session = store.create_session(company, "Pizzarias", "SP").await.unwrap();
            store
                .record_page(page(company, session.id, 0, vec![draft("Pizzaria Bella", "Rua Augusta, 1000")]))
                .await
                .unwrap()
        }));
    }

    let mut new_total = 0;
    for result in futures::future::join_all(handles).await {
        new_total += result.unwrap().new_count;
    }

    let leads = store.leads(company).await;
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].times_found, 16);
    assert_eq!(new_total, 1);
}

#[tokio::test]
async fn unknown_presence_keeps_stored_flag() {
    let store = MemoryStore::new();
    let company = Uuid::new_v4();

    let mut known = draft("Pizzaria Bella", "Rua Augusta, 1000");
    known.has_whatsapp = Some(true);
    let s1 = store.create_session(company, "Pizzarias", "SP").await.unwrap();
    store.record_page(page(company, s1.id, 0, vec![known])).await.unwrap();

    let unknown = draft("Pizzaria Bella", "Rua Augusta, 1000");
    let s2 = store.create_session(company, "Pizzarias", "SP").await.unwrap();
    let recorded = store.record_page(page(company, s2.id, 0, vec![unknown])).await.unwrap();

    assert!(recorded.results[0].has_whatsapp);
}

#[tokio::test]
async fn deleting_a_session_keeps_its_leads() {
    let store = MemoryStore::new();
    let company = Uuid::new_v4();
    let session = store.create_session(company, "Pizzarias", "SP").await.unwrap();
    store
        .record_page(page(company, session.id, 0, vec![draft("A", "Rua 1")]))
        .await
        .unwrap();

    store.delete_session(company, session.id).await.unwrap();

    let leads = store.leads(company).await;
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].search_id, None);
    assert!(matches!(
        store.get_session(company, session.id).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn tenants_are_isolated() {
    let store = MemoryStore::new();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    for company in [a, b] {
        let s = store.create_session(company, "Pizzarias", "SP").await.unwrap();
        let recorded = store
            .record_page(page(company, s.id, 0, vec![draft("Pizzaria Bella", "Rua Augusta, 1000")]))
            .await
            .unwrap();
        assert_eq!(recorded.new_count, 1);
    }

    let lead_a = store.leads(a).await.remove(0);
    assert!(matches!(
        store.set_favorite(b, lead_a.id, true).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn library_filters_sorts_and_pages() {
    let store = MemoryStore::new();
    let company = Uuid::new_v4();
    let session = store.create_session(company, "Pizzarias", "SP").await.unwrap();

    let mut drafts = Vec::new();
    for i in 0..60 {
        let mut d = draft(&format!("Pizzaria {i}"), &format!("Rua {i}"));
        d.rating = Some(3.0 + (i % 20) as f64 / 10.0);
        d.has_whatsapp = Some(i % 2 == 0);
        drafts.push(d);
    }
    store.record_page(page(company, session.id, 0, drafts)).await.unwrap();

    let everything = LeadFilters::default();
    let first = store
        .query_leads(company, &everything, SortOption::Newest, 0)
        .await
        .unwrap();
    assert_eq!(first.total_count, 60);
    assert_eq!(first.leads.len(), 50);
    assert!(first.has_more);

    let second = store
        .query_leads(company, &everything, SortOption::Newest, 1)
        .await
        .unwrap();
    assert_eq!(second.leads.len(), 10);
    assert!(!second.has_more);

    let filters = LeadFilters {
        min_rating: Some(4.0),
        has_whatsapp: true,
        ..Default::default()
    };
    let filtered = store
        .query_leads(company, &filters, SortOption::HighestRating, 0)
        .await
        .unwrap();
    assert!(filtered.total_count > 0);
    assert!(filtered
        .leads
        .iter()
        .all(|l| l.has_whatsapp && l.rating.is_some_and(|r| r >= 4.0)));
    let ratings: Vec<f64> = filtered.leads.iter().filter_map(|l| l.rating).collect();
    assert!(ratings.windows(2).all(|w| w[0] >= w[1]));

    for sort in [
        SortOption::Newest,
        SortOption::Oldest,
        SortOption::MostFound,
        SortOption::Favorites,
    ] {
        let sorted = store.query_leads(company, &filters, sort, 0).await.unwrap();
        assert_eq!(sorted.total_count, filtered.total_count, "{sort:?}");
        assert!(sorted
            .leads
            .iter()
            .all(|l| l.has_whatsapp && l.rating.is_some_and(|r| r >= 4.0)));
    }
}

#[tokio::test]
async fn tags_favorites_and_deletion() {
    let store = MemoryStore::new();
    let company = Uuid::new_v4();
    let session = store.create_session(company, "Pizzarias", "SP").await.unwrap();
    let mut d = draft("Pizzaria Bella", "Rua Augusta, 1000");
    d.category = Some("Pizzaria".into());
    store.record_page(page(company, session.id, 0, vec![d])).await.unwrap();
    let lead = store.leads(company).await.remove(0);

    let tagged = store
        .set_tags(company, lead.id, vec![" quente ".into(), "quente".into(), "".into()])
        .await
        .unwrap();
    assert_eq!(tagged.tags, vec!["quente".to_string()]);
    assert_eq!(store.lead_tags(company).await.unwrap(), vec!["quente".to_string()]);
    assert_eq!(
        store.lead_categories(company).await.unwrap(),
        vec!["Pizzaria".to_string()]
    );

    let fav = store.set_favorite(company, lead.id, true).await.unwrap();
    assert!(fav.is_favorite);

    store.delete_lead(company, lead.id).await.unwrap();
    assert!(matches!(
        store.delete_lead(company, lead.id).await,
        Err(StoreError::NotFound(_))
    ));
    assert_eq!(store.clear_leads(company).await.unwrap(), 0);
}
