//! In-memory credential store.
//!
//! Mirrors the Postgres store's semantics, including single-winner token
//! consumption, so the orchestrator can be exercised without a database.
//! Useful for tests and for embedding the service in smaller tools.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use super::model::{NewUser, Role, TokenPurpose, User, UserMutation, UserStatus, UserUpdate};
use super::store::{
    ActionTokenRecord, ConsumeOutcome, CredentialStore, InsertUserOutcome, TokenState,
};

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}

struct TokenRow {
    user_id: i64,
    token_hash: Vec<u8>,
    purpose: TokenPurpose,
    payload: Option<String>,
    expires_at: i64,
    consumed: bool,
}

impl TokenRow {
    fn state(&self, now: i64) -> TokenState {
        if self.consumed {
            TokenState::Consumed
        } else if self.expires_at <= now {
            TokenState::Expired
        } else {
            TokenState::Valid
        }
    }
}

#[derive(Default)]
struct Inner {
    next_user_id: i64,
    users: HashMap<i64, User>,
    tokens: Vec<TokenRow>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| anyhow!("store mutex poisoned"))
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.lock()?;
        Ok(inner.users.values().find(|user| user.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let inner = self.lock()?;
        Ok(inner.users.get(&id).cloned())
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<InsertUserOutcome> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|user| user.email == new_user.email) {
            return Ok(InsertUserOutcome::EmailTaken);
        }

        inner.next_user_id += 1;
        let user = User {
            id: inner.next_user_id,
            name: new_user.name,
            email: new_user.email,
            phone: new_user.phone,
            password_hash: new_user.password_hash,
            status: UserStatus::Active,
            roles: new_user.roles,
            email_confirmed: false,
        };
        inner.users.insert(user.id, user.clone());
        Ok(InsertUserOutcome::Created(user))
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<Option<User>> {
        let mut inner = self.lock()?;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        if let Some(roles) = update.roles {
            user.roles = roles;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let mut inner = self.lock()?;
        if inner.users.remove(&id).is_none() {
            return Ok(false);
        }
        inner.tokens.retain(|token| token.user_id != id);
        Ok(true)
    }

    async fn set_status(&self, id: i64, status: UserStatus) -> Result<Option<User>> {
        let mut inner = self.lock()?;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        user.status = status;
        Ok(Some(user.clone()))
    }

    async fn list_by_roles(&self, roles: &[Role]) -> Result<Vec<User>> {
        let inner = self.lock()?;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|user| roles.is_empty() || user.has_any_role(roles))
            .cloned()
            .collect();
        users.sort_by_key(|user| user.id);
        Ok(users)
    }

    async fn supersede_action_token(
        &self,
        user_id: i64,
        purpose: TokenPurpose,
        token_hash: &[u8],
        payload: Option<&str>,
        ttl_seconds: i64,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        inner.tokens.retain(|token| {
            !(token.user_id == user_id && token.purpose == purpose && !token.consumed)
        });
        inner.tokens.push(TokenRow {
            user_id,
            token_hash: token_hash.to_vec(),
            purpose,
            payload: payload.map(str::to_string),
            expires_at: now_unix() + ttl_seconds,
            consumed: false,
        });
        Ok(())
    }

    async fn find_action_token(
        &self,
        token_hash: &[u8],
        purpose: TokenPurpose,
    ) -> Result<Option<ActionTokenRecord>> {
        let inner = self.lock()?;
        let now = now_unix();
        Ok(inner
            .tokens
            .iter()
            .find(|token| token.token_hash == token_hash && token.purpose == purpose)
            .map(|token| ActionTokenRecord {
                user_id: token.user_id,
                payload: token.payload.clone(),
                state: token.state(now),
            }))
    }

    async fn consume_action_token(
        &self,
        token_hash: &[u8],
        purpose: TokenPurpose,
        mutation: UserMutation,
    ) -> Result<ConsumeOutcome> {
        // One lock covers classification, consumption, and the user mutation,
        // which is what makes consumption single-winner here.
        let mut inner = self.lock()?;
        let now = now_unix();

        let Some(index) = inner
            .tokens
            .iter()
            .position(|token| token.token_hash == token_hash && token.purpose == purpose)
        else {
            return Ok(ConsumeOutcome::NotFound);
        };

        match inner.tokens[index].state(now) {
            TokenState::Consumed => return Ok(ConsumeOutcome::AlreadyConsumed),
            TokenState::Expired => return Ok(ConsumeOutcome::Expired),
            TokenState::Valid => {}
        }
        let user_id = inner.tokens[index].user_id;

        if let UserMutation::SetEmail(email) = &mutation {
            let taken = inner
                .users
                .values()
                .any(|user| user.id != user_id && &user.email == email);
            if taken {
                return Ok(ConsumeOutcome::EmailTaken);
            }
        }

        let Some(user) = inner.users.get_mut(&user_id) else {
            return Ok(ConsumeOutcome::NotFound);
        };
        match mutation {
            UserMutation::SetPasswordHash(password_hash) => {
                user.password_hash = password_hash;
            }
            UserMutation::SetEmail(email) => {
                user.email = email;
                user.email_confirmed = true;
            }
            UserMutation::ConfirmEmail => {
                user.email_confirmed = true;
            }
        }
        inner.tokens[index].consumed = true;

        Ok(ConsumeOutcome::Applied { user_id })
    }
}
