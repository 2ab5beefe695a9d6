use async_trait::async_trait;
use poultry_hub_client::auth::{
    AuthChangeEvent, AuthEvent, AuthResponse, AuthSubscription, IdentityProvider, OAuthProvider,
    Session, User, UserAttributes,
};
use poultry_hub_client::auth_state::AuthContext;
use poultry_hub_client::error::Error;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

fn user(id: &str) -> User {
    serde_json::from_value(json!({ "id": id, "email": format!("{}@example.com", id) })).unwrap()
}

fn session(id: &str) -> Session {
    Session::new("token".into(), "refresh".into(), 3600, user(id))
}

/// Identity provider driven by the test: notifications are pushed by hand and
/// each operation returns a scripted result.
#[derive(Default)]
struct FakeProvider {
    listeners: Mutex<Vec<mpsc::UnboundedSender<AuthChangeEvent>>>,
    reject_sign_in: bool,
    reject_sign_out: bool,
}

impl FakeProvider {
    fn emit(&self, event: AuthEvent, session: Option<Session>) {
        for tx in self.listeners.lock().unwrap().iter() {
            let _ = tx.send(AuthChangeEvent {
                event,
                session: session.clone(),
            });
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn sign_up(&self, _email: &str, _password: &str) -> Result<AuthResponse, Error> {
        Ok(AuthResponse {
            user: Some(user("pending")),
            session: None,
        })
    }

    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<AuthResponse, Error> {
        if self.reject_sign_in {
            return Err(Error::provider(
                400,
                Some("invalid_credentials".into()),
                "Invalid login credentials",
            ));
        }
        let session = session("farmer");
        Ok(AuthResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<String, Error> {
        Ok(format!("https://auth.example.com/authorize?provider={}", provider.as_str()))
    }

    async fn sign_out(&self) -> Result<(), Error> {
        if self.reject_sign_out {
            return Err(Error::provider(500, None, "upstream down"));
        }
        Ok(())
    }

    async fn reset_password_for_email(&self, _email: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn update_user(&self, _attributes: UserAttributes) -> Result<User, Error> {
        Ok(user("renamed"))
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().unwrap().push(tx);
        AuthSubscription::new(rx)
    }
}

#[tokio::test]
async fn loading_until_first_notification() {
    let provider = Arc::new(FakeProvider::default());
    let context = AuthContext::new(provider.clone());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(context.snapshot().loading);
    assert!(context.user().is_none());

    provider.emit(AuthEvent::InitialSession, Some(session("restored")));
    let ready = context.wait_until_ready().await;
    assert!(!ready.loading);
    assert_eq!(ready.user_id(), Some("restored"));
}

#[tokio::test]
async fn notification_without_session_signs_out() {
    let provider = Arc::new(FakeProvider::default());
    let context = AuthContext::new(provider.clone());

    provider.emit(AuthEvent::InitialSession, Some(session("farmer")));
    context.wait_until_ready().await;

    let mut watcher = context.watch();
    provider.emit(AuthEvent::SignedOut, None);
    let snapshot = watcher.wait_for(|s| s.user.is_none()).await.unwrap().clone();
    assert!(!snapshot.is_authenticated());
}

#[tokio::test]
async fn login_sets_user() {
    let provider = Arc::new(FakeProvider::default());
    let context = AuthContext::new(provider);

    let response = context.login("farmer@example.com", "password123").await.unwrap();
    assert!(response.session.is_some());
    assert_eq!(context.user().unwrap().id, "farmer");
    assert!(context.snapshot().last_error.is_none());
}

#[tokio::test]
async fn rejected_login_is_returned_and_recorded() {
    let provider = Arc::new(FakeProvider {
        reject_sign_in: true,
        ..Default::default()
    });
    let context = AuthContext::new(provider);

    let err = context.login("farmer@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::Provider(_)));

    let snapshot = context.snapshot();
    assert!(snapshot.user.is_none());
    assert_eq!(snapshot.last_error.as_deref(), Some("Incorrect email or password"));
}

#[tokio::test]
async fn register_pending_confirmation_keeps_signed_out() {
    let provider = Arc::new(FakeProvider::default());
    let context = AuthContext::new(provider);

    let response = context.register("new@example.com", "password123").await.unwrap();
    assert!(response.session.is_none());
    assert!(context.user().is_none());
}

#[tokio::test]
async fn failed_logout_keeps_user() {
    let provider = Arc::new(FakeProvider {
        reject_sign_out: true,
        ..Default::default()
    });
    let context = AuthContext::new(provider);
    context.login("farmer@example.com", "password123").await.unwrap();

    assert!(context.logout().await.is_err());
    assert_eq!(context.user().unwrap().id, "farmer");
    assert!(context.snapshot().last_error.is_some());
}

#[tokio::test]
async fn logout_clears_user() {
    let provider = Arc::new(FakeProvider::default());
    let context = AuthContext::new(provider);
    context.login("farmer@example.com", "password123").await.unwrap();

    context.logout().await.unwrap();
    assert!(context.user().is_none());
}

#[tokio::test]
async fn oauth_login_returns_redirect() {
    let provider = Arc::new(FakeProvider::default());
    let context = AuthContext::new(provider);

    let redirect = context.login_with_google().await.unwrap();
    assert_eq!(redirect.provider, OAuthProvider::Google);
    assert!(redirect.url.ends_with("provider=google"));
    // The session only arrives through a later notification.
    assert!(context.user().is_none());

    let redirect = context.login_with_facebook().await.unwrap();
    assert!(redirect.url.ends_with("provider=facebook"));
}

#[tokio::test]
async fn update_profile_replaces_user() {
    let provider = Arc::new(FakeProvider::default());
    let context = AuthContext::new(provider);
    context.login("farmer@example.com", "password123").await.unwrap();

    context
        .update_profile(UserAttributes {
            data: Some(json!({ "name": "Renamed" })),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(context.user().unwrap().id, "renamed");
}
