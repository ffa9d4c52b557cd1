//! Poll service.

use std::collections::HashSet;

use chrono::Utc;
use myvote_common::{AppError, AppResult, IdGenerator};
use myvote_db::{
    entities::{poll, poll_option},
    repositories::{PollOptionRepository, PollRepository, VoteRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::pagination::{Page, Paginator};
use crate::principal::Principal;

/// Maximum length of a poll name and of each option, in characters.
pub const MAX_TEXT_LEN: usize = 100;

/// Minimum number of non-blank options a poll needs.
pub const MIN_OPTIONS: usize = 2;

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    option_repo: PollOptionRepository,
    vote_repo: VoteRepository,
    id_gen: IdGenerator,
}

/// Input for creating a poll.
///
/// Options are kept in submission order; blank entries are dropped.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePollInput {
    #[validate(length(max = 100, message = "Poll name must be at most 100 characters."))]
    pub name: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub options: Vec<String>,
}

/// An option together with its vote count.
#[derive(Debug, Clone)]
pub struct OptionTally {
    pub option: poll_option::Model,
    pub votes: u64,
}

/// A poll with its ordered options and vote counts.
#[derive(Debug, Clone)]
pub struct PollDetail {
    pub poll: poll::Model,
    pub options: Vec<OptionTally>,
    pub total_votes: u64,
}

impl CreatePollInput {
    /// Validate and normalize: trimmed name, trimmed non-blank options.
    fn into_checked(self) -> AppResult<(String, Option<String>, Vec<String>)> {
        self.validate()?;

        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Poll name cannot be blank.".to_string()));
        }

        let options: Vec<String> = self
            .options
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(ToString::to_string)
            .collect();

        if options.iter().any(|o| o.chars().count() > MAX_TEXT_LEN) {
            return Err(AppError::Validation(
                "Poll options must be at most 100 characters.".to_string(),
            ));
        }
        if options.len() < MIN_OPTIONS {
            return Err(AppError::Validation(
                "A poll needs at least two options.".to_string(),
            ));
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok((name, description, options))
    }
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        option_repo: PollOptionRepository,
        vote_repo: VoteRepository,
    ) -> Self {
        Self {
            poll_repo,
            option_repo,
            vote_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a poll with its options. Nothing is stored if validation or
    /// any insert fails.
    pub async fn create_poll(
        &self,
        owner: &Principal,
        input: CreatePollInput,
    ) -> AppResult<PollDetail> {
        let (name, description, options) = input.into_checked()?;

        let now = Utc::now();
        let poll_id = self.id_gen.generate();

        let poll_model = poll::ActiveModel {
            id: Set(poll_id.clone()),
            name: Set(name),
            description: Set(description),
            owner_id: Set(owner.user_id.clone()),
            created_at: Set(now.into()),
        };

        let option_models = options
            .into_iter()
            .enumerate()
            .map(|(position, text)| poll_option::ActiveModel {
                id: Set(self.id_gen.generate()),
                poll_id: Set(poll_id.clone()),
                text: Set(text),
                position: Set(position as i32),
                created_at: Set(now.into()),
            })
            .collect();

        let (poll, options) = self
            .poll_repo
            .create_with_options(poll_model, option_models)
            .await?;

        tracing::info!(poll_id = %poll.id, owner_id = %owner.user_id, options = options.len(), "Created poll");

        Ok(PollDetail {
            poll,
            options: options
                .into_iter()
                .map(|option| OptionTally { option, votes: 0 })
                .collect(),
            total_votes: 0,
        })
    }

    /// Get a poll by ID.
    pub async fn get_poll(&self, poll_id: &str) -> AppResult<poll::Model> {
        self.poll_repo.get_by_id(poll_id).await
    }

    /// Get a poll with its options in submission order and their vote counts.
    pub async fn get_poll_detail(&self, poll_id: &str) -> AppResult<PollDetail> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        let options = self.option_repo.find_by_poll(&poll.id).await?;
        let counts = self.vote_repo.count_by_option(&poll.id).await?;

        let options: Vec<OptionTally> = options
            .into_iter()
            .map(|option| {
                let votes = counts.get(&option.id).copied().unwrap_or(0);
                OptionTally { option, votes }
            })
            .collect();
        let total_votes = options.iter().map(|o| o.votes).sum();

        Ok(PollDetail {
            poll,
            options,
            total_votes,
        })
    }

    /// Delete a poll. Only its owner may do so.
    pub async fn delete_poll(&self, poll_id: &str, requester: &Principal) -> AppResult<()> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;

        if poll.owner_id != requester.user_id {
            tracing::warn!(poll_id = %poll.id, requester_id = %requester.user_id, "Rejected delete of poll owned by another user");
            return Err(AppError::PermissionDenied(
                "You do not have permission to delete this poll.".to_string(),
            ));
        }

        self.poll_repo.delete_cascade(&poll.id).await?;
        tracing::info!(poll_id = %poll.id, owner_id = %poll.owner_id, "Deleted poll");
        Ok(())
    }

    /// Polls owned by anyone in `owner_ids`, newest first.
    pub async fn list_by_owner_set(
        &self,
        owner_ids: &HashSet<String>,
        page: u64,
        per_page: u64,
    ) -> AppResult<Page<poll::Model>> {
        let paginator = Paginator::new(per_page);
        if owner_ids.is_empty() {
            return Ok(paginator.empty());
        }

        let mut owner_ids: Vec<String> = owner_ids.iter().cloned().collect();
        owner_ids.sort();

        let total = self.poll_repo.count_by_owners(&owner_ids).await?;
        let number = paginator.clamp(page, total);
        let items = self
            .poll_repo
            .find_by_owners(&owner_ids, paginator.per_page(), paginator.offset(number))
            .await?;

        Ok(paginator.page(items, number, total))
    }

    /// All polls, newest first.
    pub async fn list_all(&self, page: u64, per_page: u64) -> AppResult<Page<poll::Model>> {
        let paginator = Paginator::new(per_page);
        let total = self.poll_repo.count_all().await?;
        let number = paginator.clamp(page, total);
        let items = self
            .poll_repo
            .find_recent(paginator.per_page(), paginator.offset(number))
            .await?;

        Ok(paginator.page(items, number, total))
    }
}
