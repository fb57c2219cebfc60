//! Account orchestration: registration, login, sessions, and the token-driven
//! recovery and confirmation flows.
//!
//! The service is stateless between calls. Every flow is a short sequence of
//! store operations; the store's conditional consume is what makes redemption
//! exactly-once, so none of the methods here hold locks or retry loops.

use anyhow::anyhow;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use uuid::Uuid;

use super::error::Error;
use super::model::{
    NewUser, Role, TokenPurpose, User, UserMutation, UserProfile, UserStatus, UserUpdate,
};
use super::notify::{Notification, Notifier};
use super::password::CredentialHasher;
use super::store::{
    ActionTokenRecord, ConsumeOutcome, CredentialStore, InsertUserOutcome, TokenState,
};
use crate::token::{secret, session};

/// Runtime knobs for the account service. TTLs are in seconds.
#[derive(Clone)]
pub struct ServiceConfig {
    session_secret: SecretString,
    session_ttl_seconds: i64,
    reset_token_ttl_seconds: i64,
    email_token_ttl_seconds: i64,
    public_base_url: String,
    list_include_inactive: bool,
}

impl ServiceConfig {
    /// Defaults: 8 hour sessions, 30 minute action tokens.
    #[must_use]
    pub fn new(session_secret: SecretString) -> Self {
        Self {
            session_secret,
            session_ttl_seconds: 28_800,
            reset_token_ttl_seconds: 1_800,
            email_token_ttl_seconds: 1_800,
            public_base_url: "http://localhost:8080".to_string(),
            list_include_inactive: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_email_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.email_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_public_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.public_base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_list_include_inactive(mut self, include: bool) -> Self {
        self.list_include_inactive = include;
        self
    }
}

/// Internal outcome of a recovery request. The boundary reports both cases
/// as accepted; the split exists for logging only.
#[derive(Debug, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Queued,
    UnknownEmail,
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub roles: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct LoginSuccess {
    pub token: String,
    pub user: UserProfile,
}

pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    hasher: CredentialHasher,
    config: ServiceConfig,
}

impl AccountService {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        hasher: CredentialHasher,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            hasher,
            config,
        }
    }

    /// Create an account and issue its email confirmation token.
    ///
    /// The confirmation step is best-effort: a notifier outage is logged and
    /// the account stands.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed input, `EmailTaken` on conflict, `Store`
    /// for storage failures.
    pub async fn register(&self, input: RegisterInput) -> Result<UserProfile, Error> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("name must not be empty".to_string()));
        }
        let email = normalize_email(&input.email);
        if !valid_email(&email) {
            return Err(Error::Validation("invalid email address".to_string()));
        }
        check_password_strength(&input.password)?;
        let roles = if input.roles.is_empty() {
            vec![Role::Employee]
        } else {
            parse_roles(&input.roles)?
        };
        let phone = normalize_phone(input.phone);
        let password_hash = self.hasher.hash(&input.password)?;

        let outcome = self
            .store
            .insert_user(NewUser {
                name,
                email,
                phone,
                password_hash,
                roles,
            })
            .await?;
        let user = match outcome {
            InsertUserOutcome::Created(user) => user,
            InsertUserOutcome::EmailTaken => return Err(Error::EmailTaken),
        };

        if let Err(err) = self.issue_email_confirm(&user).await {
            warn!(user_id = user.id, "email confirmation not sent: {err}");
        }

        info!(user_id = user.id, "user registered");
        Ok(UserProfile::from(user))
    }

    /// Verify credentials and mint a session token.
    ///
    /// Unknown email, wrong password, and inactive account all return the
    /// same `InvalidCredentials`; the unknown-email path still burns one
    /// hash verification so the two cases cost the same.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` or `Store`.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSuccess, Error> {
        let email = normalize_email(email);
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            let _ = self.hasher.verify(password, self.hasher.dummy_hash());
            return Err(Error::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(Error::InvalidCredentials);
        }
        if user.status != UserStatus::Active {
            return Err(Error::InvalidCredentials);
        }

        let token = self.issue_session(&user)?;
        info!(user_id = user.id, "login succeeded");
        Ok(LoginSuccess {
            token,
            user: UserProfile::from(user),
        })
    }

    /// Verify a session token against the signing secret and current time.
    ///
    /// # Errors
    ///
    /// `InvalidToken` or `TokenExpired`.
    pub fn verify_session(&self, token: &str) -> Result<session::SessionClaims, Error> {
        Ok(session::verify_hs256(
            self.config.session_secret.expose_secret().as_bytes(),
            token,
            now_unix(),
        )?)
    }

    /// Resolve a session token to its claims plus the stored profile, so
    /// callers observe status and role changes made after token issuance.
    ///
    /// # Errors
    ///
    /// Token errors, or `NotFound` when the account was deleted.
    pub async fn session_profile(
        &self,
        token: &str,
    ) -> Result<(session::SessionClaims, UserProfile), Error> {
        let claims = self.verify_session(token)?;
        let user = self
            .store
            .find_user_by_id(claims.sub)
            .await?
            .ok_or(Error::NotFound)?;
        Ok((claims, UserProfile::from(user)))
    }

    /// Start a password reset. Unknown emails are not an error: the caller
    /// reports accepted either way.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed email, `Notification` when the reset
    /// message cannot be delivered (the token stays redeemable), `Store`.
    pub async fn request_password_reset(&self, email: &str) -> Result<RecoveryOutcome, Error> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(Error::Validation("invalid email address".to_string()));
        }

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            info!("password reset requested for unknown email");
            return Ok(RecoveryOutcome::UnknownEmail);
        };

        let token = self
            .issue_action_token(
                user.id,
                TokenPurpose::PasswordReset,
                None,
                self.config.reset_token_ttl_seconds,
            )
            .await?;
        let reset_url = build_reset_url(&self.config.public_base_url, &token);
        let payload = json!({ "email": user.email, "reset_url": reset_url }).to_string();
        self.notify(&user.email, "password_reset", payload).await?;

        info!(user_id = user.id, "password reset token issued");
        Ok(RecoveryOutcome::Queued)
    }

    /// Redeem a password reset token and store the new password hash.
    ///
    /// Password validation happens before consumption, so a mismatch leaves
    /// the token pending for another attempt.
    ///
    /// # Errors
    ///
    /// Token lifecycle errors, `PasswordMismatch`, `Validation`, `Store`.
    pub async fn redeem_password_reset(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), Error> {
        let token_hash = secret::hash(token);
        let record = self
            .store
            .find_action_token(&token_hash, TokenPurpose::PasswordReset)
            .await?
            .ok_or(Error::TokenNotFound)?;
        ensure_pending(&record)?;

        if new_password != confirm_password {
            return Err(Error::PasswordMismatch);
        }
        check_password_strength(new_password)?;

        let password_hash = self.hasher.hash(new_password)?;
        let outcome = self
            .store
            .consume_action_token(
                &token_hash,
                TokenPurpose::PasswordReset,
                UserMutation::SetPasswordHash(password_hash),
            )
            .await?;
        let user_id = map_consume(outcome)?;

        info!(user_id, "password reset redeemed");
        Ok(())
    }

    /// Start an email change for `user_id`. The token is bound to the new
    /// address and the confirmation goes to that address.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Validation`, `EmailTaken`, `Notification`, `Store`.
    pub async fn request_email_change(&self, user_id: i64, new_email: &str) -> Result<(), Error> {
        let email = normalize_email(new_email);
        if !valid_email(&email) {
            return Err(Error::Validation("invalid email address".to_string()));
        }

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(Error::NotFound)?;
        if user.email == email {
            return Err(Error::Validation(
                "email is already set to this address".to_string(),
            ));
        }
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(Error::EmailTaken);
        }

        let token = self
            .issue_action_token(
                user.id,
                TokenPurpose::EmailChange,
                Some(&email),
                self.config.email_token_ttl_seconds,
            )
            .await?;
        let confirm_url = build_email_change_url(&self.config.public_base_url, &token, &email);
        let payload = json!({ "email": email, "confirm_url": confirm_url }).to_string();
        self.notify(&email, "email_change", payload).await?;

        info!(user_id = user.id, "email change token issued");
        Ok(())
    }

    /// Redeem an email change token. The presented email must match the one
    /// the token was issued for; a mismatch leaves the token pending.
    ///
    /// # Errors
    ///
    /// Token lifecycle errors, `PayloadMismatch`, `EmailTaken`, `Store`.
    pub async fn redeem_email_change(&self, token: &str, email: &str) -> Result<(), Error> {
        let email = normalize_email(email);
        let token_hash = secret::hash(token);
        let record = self
            .store
            .find_action_token(&token_hash, TokenPurpose::EmailChange)
            .await?
            .ok_or(Error::TokenNotFound)?;
        ensure_pending(&record)?;

        if record.payload.as_deref() != Some(email.as_str()) {
            return Err(Error::PayloadMismatch);
        }

        let outcome = self
            .store
            .consume_action_token(
                &token_hash,
                TokenPurpose::EmailChange,
                UserMutation::SetEmail(email),
            )
            .await?;
        let user_id = map_consume(outcome)?;

        info!(user_id, "email change redeemed");
        Ok(())
    }

    /// Redeem the registration confirmation token for an address.
    ///
    /// # Errors
    ///
    /// Token lifecycle errors, `PayloadMismatch`, `Store`.
    pub async fn redeem_email_confirm(&self, token: &str, email: &str) -> Result<(), Error> {
        let email = normalize_email(email);
        let token_hash = secret::hash(token);
        let record = self
            .store
            .find_action_token(&token_hash, TokenPurpose::EmailConfirm)
            .await?
            .ok_or(Error::TokenNotFound)?;
        ensure_pending(&record)?;

        if record.payload.as_deref() != Some(email.as_str()) {
            return Err(Error::PayloadMismatch);
        }

        let outcome = self
            .store
            .consume_action_token(
                &token_hash,
                TokenPurpose::EmailConfirm,
                UserMutation::ConfirmEmail,
            )
            .await?;
        let user_id = map_consume(outcome)?;

        info!(user_id, "email confirmed");
        Ok(())
    }

    /// # Errors
    ///
    /// `NotFound` or `Store`.
    pub async fn get_user(&self, id: i64) -> Result<UserProfile, Error> {
        let user = self
            .store
            .find_user_by_id(id)
            .await?
            .ok_or(Error::NotFound)?;
        Ok(UserProfile::from(user))
    }

    /// List accounts holding any of `roles` (all accounts when empty).
    /// Inactive accounts are hidden unless configured otherwise.
    ///
    /// # Errors
    ///
    /// `Store`.
    pub async fn list_users(&self, roles: &[Role]) -> Result<Vec<UserProfile>, Error> {
        let users = self.store.list_by_roles(roles).await?;
        Ok(users
            .into_iter()
            .filter(|user| {
                self.config.list_include_inactive || user.status == UserStatus::Active
            })
            .map(UserProfile::from)
            .collect())
    }

    /// # Errors
    ///
    /// `NotFound`, `Validation`, `Store`.
    pub async fn update_user(&self, id: i64, input: UpdateInput) -> Result<UserProfile, Error> {
        let name = match input.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(Error::Validation("name must not be empty".to_string()));
                }
                Some(name)
            }
            None => None,
        };
        let roles = input.roles.as_deref().map(parse_roles).transpose()?;

        let update = UserUpdate {
            name,
            phone: normalize_phone(input.phone),
            roles,
        };
        let user = self
            .store
            .update_user(id, update)
            .await?
            .ok_or(Error::NotFound)?;

        info!(user_id = user.id, "user updated");
        Ok(UserProfile::from(user))
    }

    /// # Errors
    ///
    /// `NotFound` or `Store`.
    pub async fn set_status(&self, id: i64, status: UserStatus) -> Result<UserProfile, Error> {
        let user = self
            .store
            .set_status(id, status)
            .await?
            .ok_or(Error::NotFound)?;

        info!(user_id = user.id, status = %status, "user status updated");
        Ok(UserProfile::from(user))
    }

    /// # Errors
    ///
    /// `NotFound` or `Store`.
    pub async fn delete_user(&self, id: i64) -> Result<(), Error> {
        if !self.store.delete_user(id).await? {
            return Err(Error::NotFound);
        }
        info!(user_id = id, "user deleted");
        Ok(())
    }

    fn issue_session(&self, user: &User) -> Result<String, Error> {
        let now = now_unix();
        let claims = session::SessionClaims {
            v: session::TOKEN_VERSION,
            sub: user.id,
            roles: user.roles.clone(),
            iat: now,
            exp: now + self.config.session_ttl_seconds,
            jti: Uuid::new_v4().to_string(),
        };
        session::sign_hs256(self.config.session_secret.expose_secret().as_bytes(), &claims)
            .map_err(|err| Error::Store(anyhow!("failed to sign session token: {err}")))
    }

    async fn issue_action_token(
        &self,
        user_id: i64,
        purpose: TokenPurpose,
        payload: Option<&str>,
        ttl_seconds: i64,
    ) -> Result<String, Error> {
        let token = secret::generate()?;
        let token_hash = secret::hash(&token);
        self.store
            .supersede_action_token(user_id, purpose, &token_hash, payload, ttl_seconds)
            .await?;
        Ok(token)
    }

    async fn issue_email_confirm(&self, user: &User) -> Result<(), Error> {
        let token = self
            .issue_action_token(
                user.id,
                TokenPurpose::EmailConfirm,
                Some(&user.email),
                self.config.email_token_ttl_seconds,
            )
            .await?;
        let confirm_url = build_confirm_url(&self.config.public_base_url, &token, &user.email);
        let payload = json!({ "email": user.email, "confirm_url": confirm_url }).to_string();
        self.notify(&user.email, "confirm_email", payload).await
    }

    async fn notify(
        &self,
        to_email: &str,
        template: &str,
        payload_json: String,
    ) -> Result<(), Error> {
        let notification = Notification {
            to_email: to_email.to_string(),
            template: template.to_string(),
            payload_json,
        };
        self.notifier
            .notify(&notification)
            .await
            .map_err(|err| Error::Notification(err.to_string()))
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}

fn ensure_pending(record: &ActionTokenRecord) -> Result<(), Error> {
    match record.state {
        TokenState::Consumed => Err(Error::TokenAlreadyConsumed),
        TokenState::Expired => Err(Error::TokenExpired),
        TokenState::Valid => Ok(()),
    }
}

fn map_consume(outcome: ConsumeOutcome) -> Result<i64, Error> {
    match outcome {
        ConsumeOutcome::Applied { user_id } => Ok(user_id),
        ConsumeOutcome::NotFound => Err(Error::TokenNotFound),
        ConsumeOutcome::Expired => Err(Error::TokenExpired),
        ConsumeOutcome::AlreadyConsumed => Err(Error::TokenAlreadyConsumed),
        ConsumeOutcome::EmailTaken => Err(Error::EmailTaken),
    }
}

/// Normalize an email for lookup/uniqueness checks.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
fn valid_email(email_normalized: &str) -> bool {
    regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .is_ok_and(|regex| regex.is_match(email_normalized))
}

fn normalize_phone(phone: Option<String>) -> Option<String> {
    phone
        .map(|phone| phone.trim().to_string())
        .filter(|phone| !phone.is_empty())
}

/// Minimum bar: 8+ characters with at least one letter and one digit.
fn check_password_strength(password: &str) -> Result<(), Error> {
    if password.chars().count() < 8 {
        return Err(Error::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(
            "password must contain a letter and a digit".to_string(),
        ));
    }
    Ok(())
}

/// Parse role names; duplicates collapse, unknown names fail.
fn parse_roles(roles: &[String]) -> Result<Vec<Role>, Error> {
    if roles.is_empty() {
        return Err(Error::Validation(
            "at least one role is required".to_string(),
        ));
    }
    let mut parsed = Vec::with_capacity(roles.len());
    for role in roles {
        let role = Role::parse(role)
            .ok_or_else(|| Error::Validation(format!("unknown role: {role}")))?;
        if !parsed.contains(&role) {
            parsed.push(role);
        }
    }
    Ok(parsed)
}

/// Build the frontend reset link included in outbound notifications.
fn build_reset_url(public_base_url: &str, token: &str) -> String {
    let base = public_base_url.trim_end_matches('/');
    format!("{base}/reset-password#token={token}")
}

fn build_email_change_url(public_base_url: &str, token: &str, email: &str) -> String {
    let base = public_base_url.trim_end_matches('/');
    format!("{base}/confirm-email-change#token={token}&email={email}")
}

fn build_confirm_url(public_base_url: &str, token: &str, email: &str) -> String {
    let base = public_base_url.trim_end_matches('/');
    format!("{base}/confirm-email#token={token}&email={email}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::memory::MemoryStore;
    use crate::accounts::notify::LogNotifier;
    use crate::accounts::password;

    fn test_service(store: Arc<MemoryStore>) -> AccountService {
        let secret = SecretString::from("unit-test-signing-secret-0123456789abcdef".to_string());
        AccountService::new(
            store,
            Arc::new(LogNotifier),
            password::test_hasher(),
            ServiceConfig::new(secret),
        )
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            name: "Test User".to_string(),
            email: email.to_string(),
            phone: None,
            password: "sup3rsecret".to_string(),
            roles: vec!["employee".to_string()],
        }
    }

    #[test]
    fn password_strength_rules() {
        assert!(check_password_strength("sup3rsecret").is_ok());
        assert!(matches!(
            check_password_strength("sh0rt"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            check_password_strength("lettersonly"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            check_password_strength("12345678"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn parse_roles_dedupes_and_rejects_unknown() -> Result<(), Error> {
        let roles = parse_roles(&["manager".to_string(), "Manager".to_string()])?;
        assert_eq!(roles, vec![Role::Manager]);

        assert!(matches!(
            parse_roles(&["wizard".to_string()]),
            Err(Error::Validation(_))
        ));
        assert!(matches!(parse_roles(&[]), Err(Error::Validation(_))));
        Ok(())
    }

    #[test]
    fn action_urls_trim_trailing_slash() {
        assert_eq!(
            build_reset_url("https://helpdesk.example/", "tok"),
            "https://helpdesk.example/reset-password#token=tok"
        );
        assert_eq!(
            build_confirm_url("https://helpdesk.example", "tok", "a@example.com"),
            "https://helpdesk.example/confirm-email#token=tok&email=a@example.com"
        );
        assert_eq!(
            build_email_change_url("https://helpdesk.example", "tok", "a@example.com"),
            "https://helpdesk.example/confirm-email-change#token=tok&email=a@example.com"
        );
    }

    #[tokio::test]
    async fn register_normalizes_email_and_defaults_role() -> Result<(), Error> {
        let store = Arc::new(MemoryStore::new());
        let service = test_service(store);

        let mut input = register_input(" Alice@Example.COM ");
        input.roles = Vec::new();
        let profile = service.register(input).await?;

        assert_eq!(profile.email, "alice@example.com");
        assert_eq!(profile.roles, vec![Role::Employee]);
        assert!(!profile.email_confirmed);
        Ok(())
    }

    #[tokio::test]
    async fn login_is_uniform_for_unknown_and_wrong_password() -> Result<(), Error> {
        let store = Arc::new(MemoryStore::new());
        let service = test_service(store);
        service.register(register_input("a@example.com")).await?;

        let unknown = service.login("ghost@example.com", "sup3rsecret").await;
        assert!(matches!(unknown, Err(Error::InvalidCredentials)));

        let wrong = service.login("a@example.com", "wr0ngpassword").await;
        assert!(matches!(wrong, Err(Error::InvalidCredentials)));
        Ok(())
    }

    #[tokio::test]
    async fn password_mismatch_leaves_token_pending() -> Result<(), Error> {
        let store = Arc::new(MemoryStore::new());
        let service = test_service(Arc::clone(&store));
        let profile = service.register(register_input("a@example.com")).await?;

        // Plant a known reset token.
        let token = "known-reset-token";
        store
            .supersede_action_token(
                profile.id,
                TokenPurpose::PasswordReset,
                &secret::hash(token),
                None,
                600,
            )
            .await
            .map_err(Error::Store)?;

        let mismatch = service
            .redeem_password_reset(token, "n3wsecret", "d1fferent")
            .await;
        assert!(matches!(mismatch, Err(Error::PasswordMismatch)));

        // Mismatch must not consume: a corrected retry succeeds.
        service
            .redeem_password_reset(token, "n3wsecret", "n3wsecret")
            .await?;

        let login = service.login("a@example.com", "n3wsecret").await?;
        assert_eq!(login.user.id, profile.id);
        Ok(())
    }

    #[tokio::test]
    async fn session_round_trip_carries_roles() -> Result<(), Error> {
        let store = Arc::new(MemoryStore::new());
        let service = test_service(store);
        let mut input = register_input("m@example.com");
        input.roles = vec!["manager".to_string(), "hr".to_string()];
        service.register(input).await?;

        let login = service.login("m@example.com", "sup3rsecret").await?;
        let claims = service.verify_session(&login.token)?;
        assert_eq!(claims.sub, login.user.id);
        assert_eq!(claims.roles, vec![Role::Manager, Role::Hr]);
        assert_eq!(claims.exp - claims.iat, 28_800);
        Ok(())
    }

    #[tokio::test]
    async fn garbage_session_token_is_invalid() {
        let store = Arc::new(MemoryStore::new());
        let service = test_service(store);
        assert!(matches!(
            service.verify_session("not-a-token"),
            Err(Error::InvalidToken(_))
        ));
    }
}
