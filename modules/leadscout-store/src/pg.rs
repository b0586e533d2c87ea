// Postgres implementation of LeadStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use leadscout_common::{
    normalize_tags, CompanySettings, Lead, LeadDraft, LeadFilters, LeadPage, SearchResult,
    SearchSession, SessionStatus, Sighting, SortOption, LEADS_PER_PAGE, MAX_SIGHTINGS,
};

use crate::error::{Result, StoreError};
use crate::traits::{
    has_more_after, non_empty, search_result, status_after_page, LeadStore, PageRecord,
    RecordedPage,
};

#[derive(Clone)]
pub struct PgLeadStore {
    pool: PgPool,
}

/// A row from the leads table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct LeadRow {
    id: Uuid,
    company_id: Uuid,
    fingerprint: String,
    name: String,
    phone: Option<String>,
    has_whatsapp: bool,
    email: Option<String>,
    has_email: bool,
    address: Option<String>,
    category: Option<String>,
    rating: Option<f64>,
    reviews_count: i32,
    website: Option<String>,
    tags: Vec<String>,
    is_favorite: bool,
    times_found: i32,
    first_seen_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    search_id: Option<Uuid>,
    sources: Json<Vec<Sighting>>,
}

impl From<LeadRow> for Lead {
    fn from(row: LeadRow) -> Self {
        Lead {
            id: row.id,
            company_id: row.company_id,
            fingerprint: row.fingerprint,
            name: row.name,
            phone: row.phone,
            has_whatsapp: row.has_whatsapp,
            email: row.email,
            has_email: row.has_email,
            address: row.address,
            category: row.category,
            rating: row.rating,
            reviews_count: row.reviews_count,
            website: row.website,
            tags: row.tags,
            is_favorite: row.is_favorite,
            times_found: row.times_found,
            first_seen_at: row.first_seen_at,
            last_seen_at: row.last_seen_at,
            created_at: row.created_at,
            search_id: row.search_id,
            sources: row.sources.0,
        }
    }
}

/// A row from the search_sessions table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    company_id: Uuid,
    query: String,
    location: String,
    current_page: i32,
    new_leads_count: i32,
    duplicate_leads_count: i32,
    total_results_found: i32,
    status: String,
    has_more: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for SearchSession {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self> {
        let status = SessionStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Decode(format!("unknown session status {}", row.status)))?;
        Ok(SearchSession {
            id: row.id,
            company_id: row.company_id,
            query: row.query,
            location: row.location,
            current_page: row.current_page,
            new_leads_count: row.new_leads_count,
            duplicate_leads_count: row.duplicate_leads_count,
            total_results_found: row.total_results_found,
            status,
            has_more: row.has_more,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the company_settings table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SettingsRow {
    company_id: Uuid,
    serpapi_key: Option<String>,
    waha_api_url: Option<String>,
    waha_api_key: Option<String>,
    waha_session: String,
    updated_at: DateTime<Utc>,
}

impl From<SettingsRow> for CompanySettings {
    fn from(row: SettingsRow) -> Self {
        CompanySettings {
            company_id: row.company_id,
            serpapi_key: row.serpapi_key,
            waha_api_url: row.waha_api_url,
            waha_api_key: row.waha_api_key,
            waha_session: row.waha_session,
            updated_at: row.updated_at,
        }
    }
}

/// Insert a sighting or, when the fingerprint is known, count it against the existing row.
/// Presence is only overwritten by a definite answer ($6 NULL keeps the stored flag).
/// Only the newest $17 sightings are kept in `sources`.
const UPSERT_LEAD: &str = r#"
    INSERT INTO leads
        (id, company_id, fingerprint, name, phone, has_whatsapp, email, has_email,
         address, category, rating, reviews_count, website, search_id, sources,
         times_found, first_seen_at, last_seen_at, created_at)
    VALUES ($1, $2, $3, $4, $5, COALESCE($6, false), $7, $8,
            $9, $10, $11, $12, $13, $14, $15,
            1, $16, $16, $16)
    ON CONFLICT (company_id, fingerprint) DO UPDATE SET
        times_found   = leads.times_found + 1,
        last_seen_at  = EXCLUDED.last_seen_at,
        sources       = (
            SELECT COALESCE(jsonb_agg(t.s ORDER BY t.o), '[]'::jsonb)
            FROM jsonb_array_elements(leads.sources || EXCLUDED.sources) WITH ORDINALITY AS t(s, o)
            WHERE t.o > jsonb_array_length(leads.sources || EXCLUDED.sources) - $17
        ),
        has_whatsapp  = COALESCE($6, leads.has_whatsapp),
        phone         = COALESCE(EXCLUDED.phone, leads.phone),
        email         = COALESCE(leads.email, EXCLUDED.email),
        has_email     = leads.has_email OR EXCLUDED.has_email,
        rating        = COALESCE(EXCLUDED.rating, leads.rating),
        reviews_count = GREATEST(leads.reviews_count, EXCLUDED.reviews_count),
        website       = COALESCE(EXCLUDED.website, leads.website),
        category      = COALESCE(leads.category, EXCLUDED.category)
    RETURNING *
"#;

/// Draft indexes with their fingerprints, sorted by fingerprint. The sort is
/// stable, so a place listed twice on one page is still counted new first.
fn lock_order(drafts: &[LeadDraft]) -> Vec<(usize, String)> {
    let mut order: Vec<(usize, String)> = drafts
        .iter()
        .enumerate()
        .map(|(idx, draft)| (idx, draft.fingerprint()))
        .collect();
    order.sort_by(|a, b| a.1.cmp(&b.1));
    order
}

/// Escape LIKE metacharacters and wrap for substring matching.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Append the AND-composed library filters. Assumes the builder already holds `... WHERE `.
fn push_lead_filters(qb: &mut QueryBuilder<'_, Postgres>, company_id: Uuid, filters: &LeadFilters) {
    qb.push("company_id = ");
    qb.push_bind(company_id);

    if let Some(term) = filters.search.as_deref().filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        qb.push(" AND (name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR address ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR category ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    if let Some(category) = filters.category.as_deref().filter(|c| !c.is_empty()) {
        qb.push(" AND category ILIKE ");
        qb.push_bind(like_pattern(category));
    }
    if let Some(city) = filters.city.as_deref().filter(|c| !c.is_empty()) {
        qb.push(" AND address ILIKE ");
        qb.push_bind(like_pattern(city));
    }
    if let Some(min) = filters.min_rating {
        qb.push(" AND rating >= ");
        qb.push_bind(min);
    }
    if filters.has_phone {
        qb.push(" AND phone IS NOT NULL AND btrim(phone) <> ''");
    }
    if filters.has_whatsapp {
        qb.push(" AND has_whatsapp");
    }
    if filters.has_email {
        qb.push(" AND email IS NOT NULL AND btrim(email) <> ''");
    }
    if filters.is_favorite {
        qb.push(" AND is_favorite");
    }
    if !filters.tags.is_empty() {
        qb.push(" AND tags && ");
        qb.push_bind(filters.tags.clone());
    }
}

fn order_clause(sort: SortOption) -> &'static str {
    match sort {
        SortOption::Newest => " ORDER BY last_seen_at DESC, id ASC",
        SortOption::Oldest => " ORDER BY first_seen_at ASC, id ASC",
        SortOption::MostFound => " ORDER BY times_found DESC, id ASC",
        SortOption::HighestRating => " ORDER BY rating DESC NULLS LAST, id ASC",
        SortOption::Favorites => " ORDER BY is_favorite DESC, last_seen_at DESC, id ASC",
    }
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Migrations applied");
        Ok(())
    }

    async fn session_row(&self, company_id: Uuid, session_id: Uuid) -> Result<SessionRow> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM search_sessions WHERE id = $1 AND company_id = $2",
        )
        .bind(session_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Search session {session_id}")))
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn get_settings(&self, company_id: Uuid) -> Result<Option<CompanySettings>> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT * FROM company_settings WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CompanySettings::from))
    }

    async fn upsert_settings(&self, settings: &CompanySettings) -> Result<CompanySettings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            INSERT INTO company_settings
                (company_id, serpapi_key, waha_api_url, waha_api_key, waha_session, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (company_id) DO UPDATE SET
                serpapi_key  = EXCLUDED.serpapi_key,
                waha_api_url = EXCLUDED.waha_api_url,
                waha_api_key = EXCLUDED.waha_api_key,
                waha_session = EXCLUDED.waha_session,
                updated_at   = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(settings.company_id)
        .bind(&settings.serpapi_key)
        .bind(&settings.waha_api_url)
        .bind(&settings.waha_api_key)
        .bind(&settings.waha_session)
        .bind(settings.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn create_session(
        &self,
        company_id: Uuid,
        query: &str,
        location: &str,
    ) -> Result<SearchSession> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO search_sessions (id, company_id, query, location)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(query)
        .bind(location)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get_session(&self, company_id: Uuid, session_id: Uuid) -> Result<SearchSession> {
        self.session_row(company_id, session_id).await?.try_into()
    }

    async fn list_sessions(
        &self,
        company_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SearchSession>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT * FROM search_sessions
            WHERE company_id = $1
            ORDER BY created_at DESC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(company_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SearchSession::try_from).collect()
    }

    async fn delete_session(&self, company_id: Uuid, session_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM search_sessions WHERE id = $1 AND company_id = $2")
            .bind(session_id)
            .bind(company_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Search session {session_id}")));
        }
        Ok(())
    }

    async fn set_session_status(
        &self,
        company_id: Uuid,
        session_id: Uuid,
        status: SessionStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE search_sessions SET status = $3, updated_at = now()
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(session_id)
        .bind(company_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Search session {session_id}")));
        }
        Ok(())
    }

    async fn record_page(&self, record: PageRecord) -> Result<RecordedPage> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes writers on the same session; the page check is the CAS.
        let session = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM search_sessions WHERE id = $1 AND company_id = $2 FOR UPDATE",
        )
        .bind(record.session_id)
        .bind(record.company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Search session {}", record.session_id)))?;

        if session.current_page != record.page {
            return Err(StoreError::Conflict(format!(
                "session {} is at page {}, not {}",
                record.session_id, session.current_page, record.page
            )));
        }

        let sources = Json(vec![Sighting {
            found_at: record.seen_at,
            query: session.query.clone(),
            location: session.location.clone(),
        }]);

        let mut slots: Vec<Option<SearchResult>> = vec![None; record.drafts.len()];
        let (mut new_count, mut duplicate_count) = (0i32, 0i32);

        // Concurrent pages of one company must take lead row locks in the same
        // order or they deadlock each other.
        for (idx, fingerprint) in lock_order(&record.drafts) {
            let draft = &record.drafts[idx];
            let row = sqlx::query_as::<_, LeadRow>(UPSERT_LEAD)
                .bind(Uuid::new_v4())
                .bind(record.company_id)
                .bind(fingerprint)
                .bind(&draft.name)
                .bind(&draft.phone)
                .bind(draft.has_whatsapp)
                .bind(&draft.email)
                .bind(non_empty(&draft.email))
                .bind(&draft.address)
                .bind(&draft.category)
                .bind(draft.rating)
                .bind(draft.reviews_count)
                .bind(&draft.website)
                .bind(record.session_id)
                .bind(&sources)
                .bind(record.seen_at)
                .bind(MAX_SIGHTINGS as i32)
                .fetch_one(&mut *tx)
                .await?;

            let lead = Lead::from(row);
            let is_duplicate = lead.times_found > 1;
            if is_duplicate {
                duplicate_count += 1;
            } else {
                new_count += 1;
            }
            slots[idx] = Some(search_result(&lead, is_duplicate));
        }
        let results: Vec<SearchResult> = slots.into_iter().flatten().collect();

        let advanced = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE search_sessions SET
                current_page          = current_page + 1,
                new_leads_count       = new_leads_count + $3,
                duplicate_leads_count = duplicate_leads_count + $4,
                total_results_found   = total_results_found + $5,
                has_more              = $6,
                status                = $7,
                updated_at            = $8
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(record.session_id)
        .bind(record.company_id)
        .bind(new_count)
        .bind(duplicate_count)
        .bind(results.len() as i32)
        .bind(record.has_more)
        .bind(status_after_page(record.has_more).as_str())
        .bind(record.seen_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            session_id = %record.session_id,
            page = record.page,
            new_count,
            duplicate_count,
            "Recorded search page"
        );

        Ok(RecordedPage {
            session: advanced.try_into()?,
            results,
            new_count,
            duplicate_count,
        })
    }

    async fn query_leads(
        &self,
        company_id: Uuid,
        filters: &LeadFilters,
        sort: SortOption,
        page: u32,
    ) -> Result<LeadPage> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM leads WHERE ");
        push_lead_filters(&mut count_qb, company_id, filters);
        let total_count = count_qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM leads WHERE ");
        push_lead_filters(&mut qb, company_id, filters);
        qb.push(order_clause(sort));
        qb.push(" LIMIT ");
        qb.push_bind(LEADS_PER_PAGE as i64);
        qb.push(" OFFSET ");
        qb.push_bind(i64::from(page) * LEADS_PER_PAGE as i64);

        let rows = qb.build_query_as::<LeadRow>().fetch_all(&self.pool).await?;

        Ok(LeadPage {
            leads: rows.into_iter().map(Lead::from).collect(),
            total_count,
            page,
            has_more: has_more_after(page, total_count),
        })
    }

    async fn get_lead(&self, company_id: Uuid, lead_id: Uuid) -> Result<Lead> {
        sqlx::query_as::<_, LeadRow>("SELECT * FROM leads WHERE id = $1 AND company_id = $2")
            .bind(lead_id)
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Lead::from)
            .ok_or_else(|| StoreError::NotFound(format!("Lead {lead_id}")))
    }

    async fn set_favorite(
        &self,
        company_id: Uuid,
        lead_id: Uuid,
        is_favorite: bool,
    ) -> Result<Lead> {
        sqlx::query_as::<_, LeadRow>(
            "UPDATE leads SET is_favorite = $3 WHERE id = $1 AND company_id = $2 RETURNING *",
        )
        .bind(lead_id)
        .bind(company_id)
        .bind(is_favorite)
        .fetch_optional(&self.pool)
        .await?
        .map(Lead::from)
        .ok_or_else(|| StoreError::NotFound(format!("Lead {lead_id}")))
    }

    async fn set_tags(&self, company_id: Uuid, lead_id: Uuid, tags: Vec<String>) -> Result<Lead> {
        sqlx::query_as::<_, LeadRow>(
            "UPDATE leads SET tags = $3 WHERE id = $1 AND company_id = $2 RETURNING *",
        )
        .bind(lead_id)
        .bind(company_id)
        .bind(normalize_tags(tags))
        .fetch_optional(&self.pool)
        .await?
        .map(Lead::from)
        .ok_or_else(|| StoreError::NotFound(format!("Lead {lead_id}")))
    }

    async fn delete_lead(&self, company_id: Uuid, lead_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1 AND company_id = $2")
            .bind(lead_id)
            .bind(company_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Lead {lead_id}")));
        }
        Ok(())
    }

    async fn clear_leads(&self, company_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM leads WHERE company_id = $1")
            .bind(company_id)
            .execute(&self.pool)
            .await?;

        info!(%company_id, removed = result.rows_affected(), "Cleared leads library");
        Ok(result.rows_affected())
    }

    async fn lead_tags(&self, company_id: Uuid) -> Result<Vec<String>> {
        let tags = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT tag FROM leads, unnest(tags) AS tag
            WHERE company_id = $1
            ORDER BY tag
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    async fn lead_categories(&self, company_id: Uuid) -> Result<Vec<String>> {
        let categories = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT category FROM leads
            WHERE company_id = $1 AND category IS NOT NULL AND btrim(category) <> ''
            ORDER BY category
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}
