//! Search service.
//!
//! Polls are ranked by weighted relevance: matches in the name count fully,
//! matches in the description count 0.4. On `PostgreSQL` the rank comes from
//! `ts_rank` over a weighted tsvector. Elsewhere, or when full-text search
//! fails, candidates are found with LIKE and scored in process.

use myvote_common::{AppResult, FeedConfig};
use myvote_db::{
    entities::{poll, user},
    repositories::{PollRepository, UserRepository},
};
use sea_orm::DatabaseBackend;

use crate::pagination::{Page, Paginator};

/// Weight of a name match.
const NAME_WEIGHT: f32 = 1.0;

/// Weight of a description match.
const DESCRIPTION_WEIGHT: f32 = 0.4;

/// A poll with its relevance for a query, in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct RankedPoll {
    pub poll: poll::Model,
    pub rank: f32,
}

/// Top results of each kind for the combined search page.
#[derive(Debug, Clone)]
pub struct SearchOverview {
    pub query: String,
    pub users: Page<user::Model>,
    pub polls: Page<RankedPoll>,
}

/// Whitespace-separated terms as typed, de-duplicated ignoring case.
fn terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in query.split_whitespace() {
        if !terms.iter().any(|t| t.to_lowercase() == term.to_lowercase()) {
            terms.push(term.to_string());
        }
    }
    terms
}

/// Patterns handed to the database: each term as typed plus its lowercase
/// form, so backends that fold only ASCII case still find lowercase text.
fn candidate_patterns(terms: &[String]) -> Vec<String> {
    let mut patterns = terms.to_vec();
    for term in terms {
        let lower = term.to_lowercase();
        if !patterns.contains(&lower) {
            patterns.push(lower);
        }
    }
    patterns
}

/// In-process relevance: the weighted fraction of terms found in the name
/// and in the description, capped at 1.
#[must_use]
pub fn relevance(terms: &[String], name: &str, description: Option<&str>) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }

    let fraction = |text: &str| {
        let text = text.to_lowercase();
        terms
            .iter()
            .filter(|t| text.contains(t.to_lowercase().as_str()))
            .count() as f32
            / terms.len() as f32
    };

    let score = NAME_WEIGHT * fraction(name)
        + DESCRIPTION_WEIGHT * description.map_or(0.0, fraction);
    score.min(1.0)
}

/// Search service for business logic.
#[derive(Clone)]
pub struct SearchService {
    poll_repo: PollRepository,
    user_repo: UserRepository,
    config: FeedConfig,
}

impl SearchService {
    /// Create a new search service.
    #[must_use]
    pub const fn new(poll_repo: PollRepository, user_repo: UserRepository, config: FeedConfig) -> Self {
        Self {
            poll_repo,
            user_repo,
            config,
        }
    }

    /// First few users and polls for a query.
    pub async fn search_all(&self, query: &str) -> AppResult<SearchOverview> {
        let size = self.config.search_preview_size;
        Ok(SearchOverview {
            query: query.trim().to_string(),
            users: self.users_page(query, 1, size).await?,
            polls: self.polls_page(query, 1, size).await?,
        })
    }

    /// Users whose username contains the query (case-insensitive).
    pub async fn search_users(&self, query: &str, page: u64) -> AppResult<Page<user::Model>> {
        self.users_page(query, page, self.config.search_page_size).await
    }

    /// Polls ranked by relevance to the query.
    pub async fn search_polls(&self, query: &str, page: u64) -> AppResult<Page<RankedPoll>> {
        self.polls_page(query, page, self.config.search_page_size).await
    }

    async fn users_page(&self, query: &str, page: u64, per_page: u64) -> AppResult<Page<user::Model>> {
        let paginator = Paginator::new(per_page);
        let query = query.trim();
        if query.is_empty() {
            return Ok(paginator.empty());
        }

        let total = self.user_repo.count_by_username(query).await?;
        let number = paginator.clamp(page, total);
        let items = self
            .user_repo
            .search_by_username(query, paginator.per_page(), paginator.offset(number))
            .await?;

        Ok(paginator.page(items, number, total))
    }

    async fn polls_page(&self, query: &str, page: u64, per_page: u64) -> AppResult<Page<RankedPoll>> {
        let paginator = Paginator::new(per_page);
        let query = query.trim();
        if query.is_empty() {
            return Ok(paginator.empty());
        }

        if self.poll_repo.backend() == DatabaseBackend::Postgres {
            match self.polls_fulltext(query, page, paginator).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    tracing::warn!(error = %e, "Full-text poll search failed, falling back to LIKE");
                }
            }
        }

        self.polls_like(query, page, paginator).await
    }

    async fn polls_fulltext(
        &self,
        query: &str,
        page: u64,
        paginator: Paginator,
    ) -> AppResult<Page<RankedPoll>> {
        let threshold = self.config.search_rank_threshold;
        let total = self.poll_repo.count_ranked(query, threshold).await?;
        let number = paginator.clamp(page, total);
        let rows = self
            .poll_repo
            .search_ranked(query, threshold, paginator.per_page(), paginator.offset(number))
            .await?;

        let items = rows
            .into_iter()
            .map(|row| {
                let (poll, rank) = row.into_parts();
                RankedPoll {
                    poll,
                    rank: rank.min(1.0),
                }
            })
            .collect();

        Ok(paginator.page(items, number, total))
    }

    async fn polls_like(
        &self,
        query: &str,
        page: u64,
        paginator: Paginator,
    ) -> AppResult<Page<RankedPoll>> {
        let terms = terms(query);
        let threshold = self.config.search_rank_threshold;

        // Candidates arrive newest first; the stable sort keeps that order among equal ranks
        let mut ranked: Vec<RankedPoll> = self
            .poll_repo
            .find_matching_any(&candidate_patterns(&terms))
            .await?
            .into_iter()
            .map(|poll| {
                let rank = relevance(&terms, &poll.name, poll.description.as_deref());
                RankedPoll { poll, rank }
            })
            .filter(|r| r.rank >= threshold)
            .collect();
        ranked.sort_by(|a, b| b.rank.total_cmp(&a.rank));

        Ok(paginator.paginate_vec(ranked, page))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::MockDatabase;
    use std::sync::Arc;

    fn t(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_string()).collect()
    }

    #[test]
    fn test_terms_keep_case_and_deduplicate() {
        assert_eq!(terms("  Best  COLOR best "), t(&["Best", "COLOR"]));
        assert!(terms("   ").is_empty());
    }

    #[test]
    fn test_candidate_patterns_add_lowercase_forms() {
        assert_eq!(
            candidate_patterns(&t(&["Ärger", "color"])),
            t(&["Ärger", "color", "ärger"])
        );
    }

    #[test]
    fn test_relevance_ignores_non_ascii_case() {
        assert_eq!(relevance(&t(&["ÄRGER"]), "Viel Ärger", None), 1.0);
    }

    #[test]
    fn test_relevance_weights() {
        assert_eq!(relevance(&t(&["color"]), "Best color?", None), 1.0);
        assert_eq!(relevance(&t(&["color"]), "Lunch", Some("pick a color")), 0.4);
        assert_eq!(relevance(&t(&["color", "best"]), "Best color?", Some("color")), 1.0);
        assert_eq!(relevance(&t(&["color", "lunch"]), "Lunch", None), 0.5);
        assert_eq!(relevance(&t(&["pizza"]), "Lunch", Some("salad")), 0.0);
    }

    #[test]
    fn test_relevance_stays_in_unit_range() {
        let score = relevance(&t(&["a"]), "a", Some("a"));
        assert!((0.0..=1.0).contains(&score));
    }

    fn create_service(db: MockDatabase) -> SearchService {
        let conn = Arc::new(db.into_connection());
        SearchService::new(
            PollRepository::new(conn.clone()),
            UserRepository::new(conn),
            FeedConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_blank_query_returns_empty_without_querying() {
        let service = create_service(MockDatabase::new(DatabaseBackend::Postgres));

        let polls = service.search_polls("   ", 1).await.unwrap();
        assert!(polls.items.is_empty());
        assert_eq!(polls.total, 0);

        let users = service.search_users("", 2).await.unwrap();
        assert!(users.items.is_empty());
        assert_eq!(users.number, 1);
    }

    #[tokio::test]
    async fn test_fulltext_failure_falls_back_to_like() {
        let older = poll::Model {
            id: "p1".to_string(),
            name: "Best color?".to_string(),
            description: None,
            owner_id: "u1".to_string(),
            created_at: chrono::Utc::now().into(),
        };
        let newer = poll::Model {
            id: "p2".to_string(),
            name: "Lunch".to_string(),
            description: Some("any color of food".to_string()),
            owner_id: "u1".to_string(),
            created_at: chrono::Utc::now().into(),
        };

        // The count query errors; the LIKE candidate query then succeeds
        let service = create_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_errors([sea_orm::DbErr::Custom("no tsvector".to_string())])
                .append_query_results([[newer, older]]),
        );

        let page = service.search_polls("color", 1).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].poll.id, "p1");
        assert_eq!(page.items[0].rank, 1.0);
        assert_eq!(page.items[1].poll.id, "p2");
    }
}
