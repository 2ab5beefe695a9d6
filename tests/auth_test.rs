use poultry_hub_client::auth::{Auth, AuthEvent, Session, User, UserAttributes};
use poultry_hub_client::config::ClientOptions;
use poultry_hub_client::error::Error;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn auth(server: &MockServer) -> Auth {
    Auth::new(
        &server.uri(),
        "test_anon_key",
        reqwest::Client::new(),
        ClientOptions::default(),
    )
}

fn session_body() -> serde_json::Value {
    json!({
        "access_token": "test_access_token",
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "test_refresh_token",
        "user": {
            "id": "test_user_id",
            "email": "farmer@example.com",
            "role": "authenticated"
        }
    })
}

fn signed_in_session() -> Session {
    let user: User = serde_json::from_value(json!({ "id": "test_user_id" })).unwrap();
    Session::new("test_access_token".into(), "test_refresh_token".into(), 3600, user)
}

#[tokio::test]
async fn sign_in_stores_session_and_notifies() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "test_anon_key"))
        .and(body_json(json!({ "email": "farmer@example.com", "password": "password123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    let mut subscription = auth.subscribe();
    let initial = subscription.recv().await.unwrap();
    assert_eq!(initial.event, AuthEvent::InitialSession);
    assert!(initial.session.is_none());

    let response = auth
        .sign_in_with_password("farmer@example.com", "password123")
        .await
        .unwrap();
    assert_eq!(response.user.unwrap().id, "test_user_id");

    let session = auth.get_session().unwrap();
    assert_eq!(session.access_token, "test_access_token");
    assert!(session.expires_at.is_some());

    let change = subscription.recv().await.unwrap();
    assert_eq!(change.event, AuthEvent::SignedIn);
    assert_eq!(change.user().unwrap().email.as_deref(), Some("farmer@example.com"));
}

#[tokio::test]
async fn rejected_sign_in_surfaces_provider_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "error_code": "invalid_credentials",
            "msg": "Invalid login credentials"
        })))
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    let err = auth
        .sign_in_with_password("farmer@example.com", "wrong")
        .await
        .unwrap_err();

    match &err {
        Error::Provider(provider) => {
            assert_eq!(provider.status, 400);
            assert_eq!(provider.code.as_deref(), Some("invalid_credentials"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.user_message(), "Incorrect email or password");
    assert!(auth.get_session().is_none());
}

#[tokio::test]
async fn sign_up_pending_confirmation_has_no_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new_user_id",
            "email": "new@example.com",
            "confirmation_sent_at": "2024-05-01T10:00:00Z"
        })))
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    let response = auth.sign_up("new@example.com", "password123").await.unwrap();
    assert!(response.session.is_none());
    assert_eq!(response.user.unwrap().id, "new_user_id");
    assert!(auth.get_session().is_none());
}

#[tokio::test]
async fn sign_out_with_stale_token_still_signs_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer test_access_token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401,
            "error_code": "bad_jwt",
            "msg": "invalid JWT"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    auth.set_session(signed_in_session());
    let mut subscription = auth.subscribe();
    subscription.recv().await.unwrap();

    auth.sign_out().await.unwrap();
    assert!(auth.get_session().is_none());
    assert_eq!(subscription.recv().await.unwrap().event, AuthEvent::SignedOut);
}

#[tokio::test]
async fn failed_sign_out_keeps_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    auth.set_session(signed_in_session());

    assert!(auth.sign_out().await.is_err());
    assert!(auth.get_session().is_some());
}

#[tokio::test]
async fn reset_password_posts_email() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/recover"))
        .and(query_param("redirect_to", "poultryhub://reset"))
        .and(body_json(json!({ "email": "farmer@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    auth.reset_password_for_email("farmer@example.com", Some("poultryhub://reset"))
        .await
        .unwrap();
}

#[tokio::test]
async fn update_user_refreshes_session_user() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer test_access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "test_user_id",
            "email": "farmer@example.com",
            "user_metadata": { "name": "Amaka" }
        })))
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    auth.set_session(signed_in_session());
    let mut subscription = auth.subscribe();
    subscription.recv().await.unwrap();

    let user = auth
        .update_user(UserAttributes {
            data: Some(json!({ "name": "Amaka" })),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(user.user_metadata["name"], "Amaka");

    let change = subscription.recv().await.unwrap();
    assert_eq!(change.event, AuthEvent::UserUpdated);
    assert_eq!(auth.get_session().unwrap().user.user_metadata["name"], "Amaka");
}

#[tokio::test]
async fn update_user_without_session_is_rejected_locally() {
    let mock_server = MockServer::start().await;
    let auth = auth(&mock_server);

    let err = auth.update_user(UserAttributes::default()).await.unwrap_err();
    assert!(matches!(err, Error::Provider(p) if p.status == 401));
}

#[tokio::test]
async fn oauth_redirect_completes_sign_in() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer oauth_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "google_user",
            "email": "farmer@gmail.com"
        })))
        .mount(&mock_server)
        .await;

    let auth = auth(&mock_server);
    let session = auth
        .complete_oauth_sign_in(
            "poultryhub://callback#access_token=oauth_token&refresh_token=r1&expires_in=3600&token_type=bearer",
        )
        .await
        .unwrap();

    assert_eq!(session.user.id, "google_user");
    assert_eq!(session.refresh_token, "r1");
    assert_eq!(auth.get_session().unwrap().access_token, "oauth_token");
}

#[tokio::test]
async fn oauth_redirect_error_is_a_provider_error() {
    let mock_server = MockServer::start().await;
    let auth = auth(&mock_server);

    let err = auth
        .complete_oauth_sign_in(
            "poultryhub://callback#error=access_denied&error_description=User+denied+access",
        )
        .await
        .unwrap_err();

    match err {
        Error::Provider(p) => {
            assert_eq!(p.code.as_deref(), Some("access_denied"));
            assert_eq!(p.message, "User denied access");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
