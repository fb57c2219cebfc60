//! End-to-end account lifecycle tests.
//!
//! These run the real service against the in-memory store: registration,
//! login, recovery and confirmation flows go through the same code paths the
//! HTTP handlers call, with a recording notifier standing in for the webhook
//! so tests can pull issued tokens out of the notifications.

use anyhow::{bail, Result};
use argon2::ParamsBuilder;
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::{Arc, Mutex};

use subteno::accounts::{
    error::Error,
    memory::MemoryStore,
    model::{Role, UserProfile, UserStatus},
    notify::{Notification, Notifier},
    password::CredentialHasher,
    service::{AccountService, RecoveryOutcome, RegisterInput, ServiceConfig, UpdateInput},
};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

impl RecordingNotifier {
    fn last(&self) -> Notification {
        self.sent
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("a notification was sent")
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

/// Records the notification, then reports delivery failure.
#[derive(Default)]
struct FailingNotifier {
    sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        bail!("smtp relay down")
    }
}

impl FailingNotifier {
    fn last(&self) -> Notification {
        self.sent
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("a notification was attempted")
    }
}

fn fast_hasher() -> CredentialHasher {
    let params = ParamsBuilder::new()
        .m_cost(1024)
        .t_cost(1)
        .p_cost(1)
        .build()
        .expect("argon2 params");
    CredentialHasher::with_params(params).expect("hasher")
}

fn test_config() -> ServiceConfig {
    ServiceConfig::new(SecretString::from(
        "integration-signing-secret-0123456789abcdef".to_string(),
    ))
    .with_public_base_url("https://helpdesk.example.com")
}

fn service_with(notifier: Arc<dyn Notifier>, config: ServiceConfig) -> AccountService {
    AccountService::new(Arc::new(MemoryStore::new()), notifier, fast_hasher(), config)
}

async fn register(
    service: &AccountService,
    name: &str,
    email: &str,
    roles: &[&str],
) -> UserProfile {
    service
        .register(RegisterInput {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            password: "sup3rsecret".to_string(),
            roles: roles.iter().map(ToString::to_string).collect(),
        })
        .await
        .expect("registration succeeds")
}

/// Pull the raw action token out of a recorded notification payload.
fn token_from(notification: &Notification) -> String {
    let payload: serde_json::Value =
        serde_json::from_str(&notification.payload_json).expect("payload is JSON");
    let url = payload
        .get("reset_url")
        .or_else(|| payload.get("confirm_url"))
        .and_then(|value| value.as_str())
        .expect("payload carries an action URL");
    let (_, fragment) = url.split_once("#token=").expect("URL carries a token");
    fragment
        .split('&')
        .next()
        .expect("token segment")
        .to_string()
}

#[tokio::test]
async fn password_reset_end_to_end() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    let user = register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;

    let outcome = service
        .request_password_reset("ana@example.com")
        .await
        .unwrap();
    assert_eq!(outcome, RecoveryOutcome::Queued);

    let notification = notifier.last();
    assert_eq!(notification.template, "password_reset");
    assert_eq!(notification.to_email, "ana@example.com");

    let token = token_from(&notification);
    service
        .redeem_password_reset(&token, "n3w-password", "n3w-password")
        .await
        .unwrap();

    // Old password is gone, the new one logs in.
    let err = service
        .login("ana@example.com", "sup3rsecret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));

    let success = service
        .login("ana@example.com", "n3w-password")
        .await
        .unwrap();
    assert_eq!(success.user.id, user.id);

    // Single use: the same token cannot be redeemed twice.
    let err = service
        .redeem_password_reset(&token, "an0ther-pass", "an0ther-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TokenAlreadyConsumed));
}

#[tokio::test]
async fn reset_request_is_silent_for_unknown_email() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;
    let sent_before = notifier.count();

    let outcome = service
        .request_password_reset("nobody@example.com")
        .await
        .unwrap();
    assert_eq!(outcome, RecoveryOutcome::UnknownEmail);
    assert_eq!(notifier.count(), sent_before, "no notification for unknown email");
}

#[tokio::test]
async fn second_reset_request_supersedes_the_first() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;

    service
        .request_password_reset("ana@example.com")
        .await
        .unwrap();
    let first_token = token_from(&notifier.last());

    service
        .request_password_reset("ana@example.com")
        .await
        .unwrap();
    let second_token = token_from(&notifier.last());
    assert_ne!(first_token, second_token);

    let err = service
        .redeem_password_reset(&first_token, "n3w-password", "n3w-password")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TokenNotFound));

    service
        .redeem_password_reset(&second_token, "n3w-password", "n3w-password")
        .await
        .unwrap();
}

#[tokio::test]
async fn notifier_failure_surfaces_but_token_stays_redeemable() {
    let notifier = Arc::new(FailingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    // Registration succeeds even though its confirmation cannot be delivered.
    register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;

    let err = service
        .request_password_reset("ana@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Notification(_)));

    // The token was committed before delivery was attempted.
    let token = token_from(&notifier.last());
    service
        .redeem_password_reset(&token, "n3w-password", "n3w-password")
        .await
        .unwrap();
}

#[tokio::test]
async fn password_mismatch_and_weak_password_leave_token_pending() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;
    service
        .request_password_reset("ana@example.com")
        .await
        .unwrap();
    let token = token_from(&notifier.last());

    let err = service
        .redeem_password_reset(&token, "n3w-password", "different")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PasswordMismatch));

    let err = service
        .redeem_password_reset(&token, "short1", "short1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Failed attempts consumed nothing.
    service
        .redeem_password_reset(&token, "n3w-password", "n3w-password")
        .await
        .unwrap();
}

#[tokio::test]
async fn email_change_end_to_end() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    let user = register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;

    service
        .request_email_change(user.id, "ana.lima@example.com")
        .await
        .unwrap();

    let notification = notifier.last();
    assert_eq!(notification.template, "email_change");
    assert_eq!(
        notification.to_email, "ana.lima@example.com",
        "confirmation goes to the new address"
    );

    let token = token_from(&notification);

    // The token is bound to the new address.
    let err = service
        .redeem_email_change(&token, "other@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PayloadMismatch));

    service
        .redeem_email_change(&token, "ana.lima@example.com")
        .await
        .unwrap();

    let profile = service.get_user(user.id).await.unwrap();
    assert_eq!(profile.email, "ana.lima@example.com");
    assert!(profile.email_confirmed);

    // Login moves with the address.
    assert!(service.login("ana@example.com", "sup3rsecret").await.is_err());
    assert!(service
        .login("ana.lima@example.com", "sup3rsecret")
        .await
        .is_ok());
}

#[tokio::test]
async fn email_change_to_taken_address_is_rejected() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    let ana = register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;
    register(&service, "Bia Costa", "bia@example.com", &["employee"]).await;

    let err = service
        .request_email_change(ana.id, "bia@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmailTaken));

    let err = service
        .request_email_change(ana.id, "ana@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn email_change_loses_race_to_new_registration() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    let ana = register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;

    service
        .request_email_change(ana.id, "shared@example.com")
        .await
        .unwrap();
    let token = token_from(&notifier.last());

    // Someone else registers the address while the token is in flight.
    register(&service, "Caio Dias", "shared@example.com", &["employee"]).await;

    let err = service
        .redeem_email_change(&token, "shared@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmailTaken));

    // Losing did not burn the token; it fails the same way again rather
    // than reporting it consumed.
    let err = service
        .redeem_email_change(&token, "shared@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmailTaken));
}

#[tokio::test]
async fn registration_confirmation_end_to_end() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    let user = register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;
    assert!(!user.email_confirmed);

    let notification = notifier.last();
    assert_eq!(notification.template, "confirm_email");
    assert_eq!(notification.to_email, "ana@example.com");

    let token = token_from(&notification);
    service
        .redeem_email_confirm(&token, "ana@example.com")
        .await
        .unwrap();

    let profile = service.get_user(user.id).await.unwrap();
    assert!(profile.email_confirmed);

    let err = service
        .redeem_email_confirm(&token, "ana@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TokenAlreadyConsumed));
}

#[tokio::test]
async fn zero_ttl_tokens_expire_immediately() {
    let notifier = Arc::new(RecordingNotifier::default());
    let config = test_config()
        .with_reset_token_ttl_seconds(0)
        .with_email_token_ttl_seconds(0);
    let service = service_with(notifier.clone(), config);

    let user = register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;

    service
        .request_password_reset("ana@example.com")
        .await
        .unwrap();
    let token = token_from(&notifier.last());
    let err = service
        .redeem_password_reset(&token, "n3w-password", "n3w-password")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TokenExpired));

    service
        .request_email_change(user.id, "new@example.com")
        .await
        .unwrap();
    let token = token_from(&notifier.last());
    let err = service
        .redeem_email_change(&token, "new@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TokenExpired));
}

#[tokio::test]
async fn sessions_survive_deactivation_but_logins_do_not() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    let user = register(&service, "Ana Lima", "ana@example.com", &["manager"]).await;
    let success = service.login("ana@example.com", "sup3rsecret").await.unwrap();

    let claims = service.verify_session(&success.token).unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.roles, vec![Role::Manager]);

    service
        .set_status(user.id, UserStatus::Inactive)
        .await
        .unwrap();

    // Deactivation blocks new logins and looks like bad credentials.
    let err = service
        .login("ana@example.com", "sup3rsecret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));

    // The already-issued token keeps verifying until it expires.
    let (claims, profile) = service.session_profile(&success.token).await.unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(profile.status, UserStatus::Inactive);
}

#[tokio::test]
async fn session_profile_reports_deleted_accounts() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    let user = register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;
    let success = service.login("ana@example.com", "sup3rsecret").await.unwrap();

    service.delete_user(user.id).await.unwrap();

    // The signature still verifies, the subject is gone.
    assert!(service.verify_session(&success.token).is_ok());
    let err = service.session_profile(&success.token).await.unwrap_err();
    assert!(matches!(err, Error::NotFound));
}

#[tokio::test]
async fn listing_hides_inactive_accounts_by_default() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    register(&service, "Ana Lima", "ana@example.com", &["manager"]).await;
    let bia = register(&service, "Bia Costa", "bia@example.com", &["employee"]).await;
    service
        .set_status(bia.id, UserStatus::Inactive)
        .await
        .unwrap();

    let listed = service.list_users(&[]).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].email, "ana@example.com");

    let managers = service.list_users(&[Role::Manager]).await.unwrap();
    assert_eq!(managers.len(), 1);

    let employees = service.list_users(&[Role::Employee]).await.unwrap();
    assert!(employees.is_empty(), "inactive employee is hidden");
}

#[tokio::test]
async fn listing_can_include_inactive_accounts() {
    let notifier = Arc::new(RecordingNotifier::default());
    let config = test_config().with_list_include_inactive(true);
    let service = service_with(notifier.clone(), config);

    let ana = register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;
    service
        .set_status(ana.id, UserStatus::Inactive)
        .await
        .unwrap();

    let listed = service.list_users(&[]).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, UserStatus::Inactive);
}

#[tokio::test]
async fn update_replaces_roles_and_keeps_untouched_fields() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = service_with(notifier.clone(), test_config());

    let user = register(&service, "Ana Lima", "ana@example.com", &["employee"]).await;

    let updated = service
        .update_user(
            user.id,
            UpdateInput {
                name: None,
                phone: Some("+55 11 91234-5678".to_string()),
                roles: Some(vec!["help-desk".to_string(), "hr".to_string()]),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Ana Lima");
    assert_eq!(updated.phone.as_deref(), Some("+55 11 91234-5678"));
    assert_eq!(updated.roles, vec![Role::HelpDesk, Role::Hr]);

    let err = service
        .update_user(
            user.id,
            UpdateInput {
                roles: Some(vec!["wizard".to_string()]),
                ..UpdateInput::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = service
        .delete_user(user.id + 100)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound));
}
