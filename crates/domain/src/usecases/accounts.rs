//! Account sign-up, login and profile pictures

use std::sync::Arc;
use thiserror::Error;
use time::Duration;
use uuid::Uuid;

use crate::{
    model::{
        Account, AccountRecord, AuthSession, ImageUpload, NewAccount, Role, SessionClaims, UserId,
    },
    object_key,
    policy::{ContentPolicy, PolicyViolation},
    ports::{
        AccountStore, Clock, CredentialError, ImageError, ImageStore, PasswordHasher, StoreError,
        TokenIssuer,
    },
};

/// Folder for profile pictures in image storage
pub const PROFILE_PICTURE_FOLDER: &str = "profile-pictures";

/// Errors from account operations
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid input: {0}")]
    Invalid(#[from] PolicyViolation),
    #[error("User already exists: {0}")]
    AlreadyExists(String),
    #[error("Account doesn't exist: {0}")]
    NotFound(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Credential error: {0}")]
    Credential(CredentialError),
    #[error("Storage error: {0}")]
    Store(StoreError),
    #[error("Image storage error: {0}")]
    Image(#[from] ImageError),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AccountError::NotFound(what),
            StoreError::Conflict(what) => AccountError::AlreadyExists(what),
            other => AccountError::Store(other),
        }
    }
}

impl From<CredentialError> for AccountError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Expired => AccountError::TokenExpired,
            CredentialError::Invalid(reason) => AccountError::InvalidToken(reason),
            other => AccountError::Credential(other),
        }
    }
}

/// Configuration for the account use case
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Lifetime of issued session tokens
    pub token_ttl: Duration,
    pub policy: ContentPolicy,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::hours(24),
            policy: ContentPolicy::default(),
        }
    }
}

/// Use case for account management
pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    images: Arc<dyn ImageStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
    config: AccountConfig,
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        images: Arc<dyn ImageStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
        config: AccountConfig,
    ) -> Self {
        Self {
            accounts,
            images,
            hasher,
            tokens,
            clock,
            config,
        }
    }

    /// Register a new account
    pub async fn sign_up(&self, request: NewAccount) -> Result<Account, AccountError> {
        self.config.policy.check_account(&request)?;

        let record = AccountRecord {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            password_hash: self.hasher.hash(&request.password)?,
            role: Role::User,
            created_at: self.clock.now(),
        };

        let account = self.accounts.create_account(&record).await?;
        tracing::info!(uid = account.id, username = %account.username, "Created account");
        Ok(account)
    }

    /// Check credentials and issue a session token
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AccountError> {
        self.config.policy.check_password(password)?;

        let email = email.trim().to_lowercase();
        let stored = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AccountError::NotFound(email.clone()))?;

        if !self.hasher.verify(password, &stored.password_hash) {
            tracing::warn!(uid = stored.account.id, "Rejected login");
            return Err(AccountError::InvalidCredentials);
        }

        let now = self.clock.now();
        let account = stored.account;
        let claims = SessionClaims {
            uid: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
            profile_pic: account.profile_pic.clone(),
            iat: now.unix_timestamp(),
            exp: (now + self.config.token_ttl).unix_timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = self.tokens.issue(&claims)?;

        tracing::info!(uid = account.id, "Issued session token");
        Ok(AuthSession { account, token })
    }

    /// Decode and check a session token
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims, AccountError> {
        Ok(self.tokens.verify(token)?)
    }

    /// Replace a user's profile picture, removing the previous upload
    pub async fn change_profile_picture(
        &self,
        uid: UserId,
        image: ImageUpload,
    ) -> Result<Account, AccountError> {
        self.config.policy.check_image(&image)?;

        let account = self
            .accounts
            .get_account(uid)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("user {}", uid)))?;

        let key = object_key(
            PROFILE_PICTURE_FOLDER,
            uid,
            self.clock.now(),
            None,
            &image.bytes,
        );
        let stored = self
            .images
            .put(&key, &image.content_type, &image.bytes)
            .await?;

        let updated = match self.accounts.set_profile_pic(uid, &stored.public_url).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Err(cleanup) = self.images.delete(&stored.key).await {
                    tracing::warn!(key = %stored.key, error = %cleanup, "Failed to remove orphaned upload");
                }
                return Err(e.into());
            }
        };
        tracing::info!(uid, key = %stored.key, "Changed profile picture");

        // The account already points at the new upload
        let previous = account
            .profile_pic
            .as_deref()
            .filter(|url| *url != stored.public_url);
        if let Some(previous) = previous {
            if let Err(e) = self.remove_previous_picture(uid, previous).await {
                tracing::warn!(uid, url = %previous, error = %e, "Failed to remove previous profile picture");
            }
        }

        Ok(updated)
    }

    /// Only pictures this service uploaded for this user are removed
    async fn remove_previous_picture(&self, uid: UserId, url: &str) -> Result<(), AccountError> {
        let Some(key) = self.images.key_for_url(url) else {
            return Ok(());
        };
        let own_prefix = format!("{}/{}_", PROFILE_PICTURE_FOLDER, uid);
        if !key.starts_with(&own_prefix) {
            return Ok(());
        }

        let existed = self.images.delete(&key).await?;
        tracing::debug!(uid, key = %key, existed, "Removed previous profile picture");
        Ok(())
    }
}
