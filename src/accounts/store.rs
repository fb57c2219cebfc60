//! Storage abstraction for accounts and their pending action tokens.
//!
//! The orchestrator only talks to this trait. Time-based classification
//! happens inside the store so callers never compare clocks themselves.

use anyhow::Result;
use async_trait::async_trait;

use super::model::{NewUser, Role, TokenPurpose, User, UserMutation, UserStatus, UserUpdate};

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub enum InsertUserOutcome {
    Created(User),
    EmailTaken,
}

/// Lifecycle state of a stored action token at lookup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid,
    Expired,
    Consumed,
}

/// A pending (or dead) action token as seen during redemption.
#[derive(Debug)]
pub struct ActionTokenRecord {
    pub user_id: i64,
    pub payload: Option<String>,
    pub state: TokenState,
}

/// Outcome of the atomic consume-and-mutate step.
///
/// `EmailTaken` means the mutation lost a uniqueness race; the token is left
/// pending so the caller may retry once the conflict is resolved.
#[derive(Debug)]
pub enum ConsumeOutcome {
    Applied { user_id: i64 },
    NotFound,
    Expired,
    AlreadyConsumed,
    EmailTaken,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an account by normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Create an account. Email uniqueness is enforced here, not by a prior
    /// lookup, so concurrent registrations cannot both succeed.
    async fn insert_user(&self, new_user: NewUser) -> Result<InsertUserOutcome>;

    /// Apply an allow-listed profile update. Returns the updated record, or
    /// `None` when the user does not exist.
    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<Option<User>>;

    /// Delete an account and its pending tokens. Returns `false` when the
    /// user does not exist.
    async fn delete_user(&self, id: i64) -> Result<bool>;

    async fn set_status(&self, id: i64, status: UserStatus) -> Result<Option<User>>;

    /// List accounts holding at least one of `roles`. An empty slice lists
    /// every account.
    async fn list_by_roles(&self, roles: &[Role]) -> Result<Vec<User>>;

    /// Store a new pending token for `(user_id, purpose)`, atomically
    /// deleting any prior pending token for the same pair. Consumed rows are
    /// kept untouched.
    async fn supersede_action_token(
        &self,
        user_id: i64,
        purpose: TokenPurpose,
        token_hash: &[u8],
        payload: Option<&str>,
        ttl_seconds: i64,
    ) -> Result<()>;

    /// Classify a token by hash and purpose without consuming it.
    async fn find_action_token(
        &self,
        token_hash: &[u8],
        purpose: TokenPurpose,
    ) -> Result<Option<ActionTokenRecord>>;

    /// Atomically mark the token consumed and apply `mutation` to its user.
    /// Exactly one concurrent caller can observe `Applied` for a given token;
    /// the rest see `AlreadyConsumed`.
    async fn consume_action_token(
        &self,
        token_hash: &[u8],
        purpose: TokenPurpose,
        mutation: UserMutation,
    ) -> Result<ConsumeOutcome>;
}
