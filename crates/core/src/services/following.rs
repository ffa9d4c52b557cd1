//! Following service.

use std::collections::HashSet;

use chrono::Utc;
use myvote_common::{AppError, AppResult, IdGenerator};
use myvote_db::{
    entities::{following, user},
    repositories::{FollowingRepository, UserRepository},
};
use sea_orm::Set;

use crate::principal::Principal;

/// How the viewer relates to a profile they are looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    /// The viewer is looking at their own profile.
    SelfView,
    /// The viewer follows the profile owner.
    Following,
    /// The viewer does not follow the profile owner.
    NotFollowing,
    /// Nobody is signed in.
    Anonymous,
}

/// A user profile as seen by a viewer.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: user::Model,
    pub relationship: Relationship,
    pub followers_count: u64,
    pub following_count: u64,
}

/// Following service for business logic.
#[derive(Clone)]
pub struct FollowingService {
    following_repo: FollowingRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl FollowingService {
    /// Create a new following service.
    #[must_use]
    pub const fn new(following_repo: FollowingRepository, user_repo: UserRepository) -> Self {
        Self {
            following_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow a user.
    ///
    /// Following someone already followed returns the existing edge.
    pub async fn follow(
        &self,
        follower: &Principal,
        followee_id: &str,
    ) -> AppResult<following::Model> {
        if follower.user_id == followee_id {
            return Err(AppError::SelfFollow);
        }

        // Followee must exist
        self.user_repo.get_by_id(followee_id).await?;

        if let Some(existing) = self
            .following_repo
            .find_by_pair(&follower.user_id, followee_id)
            .await?
        {
            tracing::debug!(follower_id = %follower.user_id, followee_id = %followee_id, "Already following");
            return Ok(existing);
        }

        let model = following::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower.user_id.clone()),
            followee_id: Set(followee_id.to_string()),
            created_at: Set(Utc::now().into()),
        };

        match self.following_repo.create(model).await {
            Ok(edge) => {
                tracing::info!(follower_id = %follower.user_id, followee_id = %followee_id, "Followed user");
                Ok(edge)
            }
            // A concurrent follow inserted the same pair first
            Err(AppError::Conflict(_)) => self
                .following_repo
                .find_by_pair(&follower.user_id, followee_id)
                .await?
                .ok_or_else(|| AppError::Internal("Follow edge vanished after conflict".to_string())),
            Err(e) => Err(e),
        }
    }

    /// Unfollow a user. Unfollowing someone not followed is a no-op.
    pub async fn unfollow(&self, follower: &Principal, followee_id: &str) -> AppResult<()> {
        if follower.user_id == followee_id {
            return Err(AppError::SelfUnfollow);
        }

        let removed = self
            .following_repo
            .delete_by_pair(&follower.user_id, followee_id)
            .await?;

        if removed {
            tracing::info!(follower_id = %follower.user_id, followee_id = %followee_id, "Unfollowed user");
        } else {
            tracing::debug!(follower_id = %follower.user_id, followee_id = %followee_id, "Not following, nothing to remove");
        }
        Ok(())
    }

    /// IDs of every user that `user_id` follows.
    pub async fn followees_of(&self, user_id: &str) -> AppResult<HashSet<String>> {
        Ok(self
            .following_repo
            .find_followee_ids(user_id)
            .await?
            .into_iter()
            .collect())
    }

    /// How `viewer` relates to `target_id`.
    pub async fn relationship(
        &self,
        viewer: Option<&Principal>,
        target_id: &str,
    ) -> AppResult<Relationship> {
        let Some(viewer) = viewer else {
            return Ok(Relationship::Anonymous);
        };

        if viewer.user_id == target_id {
            return Ok(Relationship::SelfView);
        }

        if self
            .following_repo
            .is_following(&viewer.user_id, target_id)
            .await?
        {
            Ok(Relationship::Following)
        } else {
            Ok(Relationship::NotFollowing)
        }
    }

    /// Count followers of a user.
    pub async fn count_followers(&self, user_id: &str) -> AppResult<u64> {
        self.following_repo.count_followers(user_id).await
    }

    /// Count users a user follows.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        self.following_repo.count_following(user_id).await
    }

    /// Load a profile by username along with the viewer's relationship to it.
    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<&Principal>,
    ) -> AppResult<UserProfile> {
        let user = self.user_repo.get_by_username(username).await?;
        let relationship = self.relationship(viewer, &user.id).await?;
        let followers_count = self.count_followers(&user.id).await?;
        let following_count = self.count_following(&user.id).await?;

        Ok(UserProfile {
            user,
            relationship,
            followers_count,
            following_count,
        })
    }
}
