//! Account service: signup, credentials and account lifecycle.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use myvote_common::{AppError, AppResult, IdGenerator};
use myvote_db::{
    entities::user,
    repositories::{FollowingRepository, PollRepository, UserRepository, VoteRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::principal::Principal;

/// Characters allowed in a username besides ASCII letters and digits.
const USERNAME_SYMBOLS: &str = "@.+-_";

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || USERNAME_SYMBOLS.contains(c))
    {
        Ok(())
    } else {
        Err(ValidationError::new("username").with_message(
            "Usernames may contain only letters, digits and @/./+/-/_ characters.".into(),
        ))
    }
}

/// Input for creating a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(
        length(min = 1, max = 150),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 72))]
    pub password: String,

    pub password_confirmation: String,
}

/// Input for changing the password.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordInput {
    pub old_password: String,

    #[validate(length(min = 8, max = 72))]
    pub new_password: String,

    pub new_password_confirmation: String,
}

/// Input for changing the email address.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangeEmailInput {
    #[validate(email)]
    pub email: String,

    pub password: String,
}

/// Account overview for the signed-in user.
#[derive(Debug, Clone)]
pub struct AccountOverview {
    pub user: user::Model,
    pub followers_count: u64,
    pub following_count: u64,
    pub polls_count: u64,
    pub votes_count: u64,
}

/// Account service for business logic.
#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
    following_repo: FollowingRepository,
    poll_repo: PollRepository,
    vote_repo: VoteRepository,
    id_gen: IdGenerator,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        following_repo: FollowingRepository,
        poll_repo: PollRepository,
        vote_repo: VoteRepository,
    ) -> Self {
        Self {
            user_repo,
            following_repo,
            poll_repo,
            vote_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user and issue a token.
    pub async fn create_user(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if input.password != input.password_confirmation {
            return Err(AppError::Validation("Passwords must match.".to_string()));
        }

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "A user with that username already exists.".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            email: Set(input.email),
            password_hash: Set(password_hash),
            token: Set(Some(self.id_gen.generate_token())),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "Created user");
        Ok(user)
    }

    /// Authenticate a user by username and password.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Check a plaintext password against the stored hash.
    pub async fn check_password(&self, user_id: &str, password: &str) -> AppResult<bool> {
        let user = self.user_repo.get_by_id(user_id).await?;
        verify_password(password, &user.password_hash)
    }

    /// Replace a user's password.
    pub async fn set_password(&self, user_id: &str, password: &str) -> AppResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let password_hash = hash_password(password)?;

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await?;
        Ok(())
    }

    /// Change the password after confirming the old one.
    pub async fn change_password(
        &self,
        principal: &Principal,
        input: ChangePasswordInput,
    ) -> AppResult<()> {
        if !self
            .check_password(&principal.user_id, &input.old_password)
            .await?
        {
            return Err(AppError::Validation("Incorrect old password.".to_string()));
        }
        if input.new_password != input.new_password_confirmation {
            return Err(AppError::Validation("New passwords must match.".to_string()));
        }
        input.validate()?;

        self.set_password(&principal.user_id, &input.new_password)
            .await?;
        tracing::info!(user_id = %principal.user_id, "Changed password");
        Ok(())
    }

    /// Change the email address after confirming the password.
    pub async fn change_email(
        &self,
        principal: &Principal,
        input: ChangeEmailInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let user = self.user_repo.get_by_id(&principal.user_id).await?;
        if !verify_password(&input.password, &user.password_hash)? {
            return Err(AppError::Validation("Incorrect password.".to_string()));
        }

        let mut active: user::ActiveModel = user.into();
        active.email = Set(input.email);
        active.updated_at = Set(Some(Utc::now().into()));

        let user = self.user_repo.update(active).await?;
        tracing::info!(user_id = %user.id, "Changed email");
        Ok(user)
    }

    /// Regenerate a user's authentication token, invalidating the old one.
    pub async fn regenerate_token(&self, user_id: &str) -> AppResult<String> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let new_token = self.id_gen.generate_token();

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(new_token.clone()));
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await?;

        Ok(new_token)
    }

    /// Delete the account after confirming the password. Owned polls,
    /// votes and follow edges go with it.
    pub async fn delete_user(&self, principal: &Principal, password: &str) -> AppResult<()> {
        if !self.check_password(&principal.user_id, password).await? {
            return Err(AppError::Validation("Incorrect password.".to_string()));
        }

        self.user_repo.delete_cascade(&principal.user_id).await?;
        tracing::info!(user_id = %principal.user_id, "Deleted account");
        Ok(())
    }

    /// Account overview for the signed-in user.
    pub async fn get_overview(&self, principal: &Principal) -> AppResult<AccountOverview> {
        let user = self.user_repo.get_by_id(&principal.user_id).await?;

        Ok(AccountOverview {
            followers_count: self.following_repo.count_followers(&user.id).await?,
            following_count: self.following_repo.count_following(&user.id).await?,
            polls_count: self.poll_repo.count_by_owner(&user.id).await?,
            votes_count: self.vote_repo.count_by_user(&user.id).await?,
            user,
        })
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
