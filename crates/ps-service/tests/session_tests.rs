//! End-to-end tests for the browser session handoff flow.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use ps_test_utils::TestPsServer;
use serde_json::{json, Value};
use std::collections::HashMap;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config vars wiring the OAuth group at a mock provider plus a complete
/// voice-issuer group.
fn session_vars(provider_uri: &str) -> HashMap<String, String> {
    HashMap::from([
        ("OAUTH_CLIENT_ID".to_string(), "earshot-web".to_string()),
        ("OAUTH_CLIENT_SECRET".to_string(), "web-secret".to_string()),
        (
            "OAUTH_AUTHORIZE_URL".to_string(),
            format!("{provider_uri}/oauth/authorize"),
        ),
        (
            "OAUTH_TOKEN_URL".to_string(),
            format!("{provider_uri}/oauth/token"),
        ),
        (
            "OAUTH_USERINFO_URL".to_string(),
            format!("{provider_uri}/oauth/userinfo"),
        ),
        (
            "OAUTH_REDIRECT_URI".to_string(),
            "http://localhost:3000/oauth/callback".to_string(),
        ),
        ("VOICE_API_KEY".to_string(), "issuer-key".to_string()),
        ("VOICE_API_SECRET".to_string(), "issuer-secret".to_string()),
        ("VOICE_URL".to_string(), "wss://voice.example.com".to_string()),
    ])
}

/// Mount a provider that accepts code `good-code` and resolves user 12345.
async fn mount_happy_provider(provider: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("code=good-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-123",
            "token_type": "Bearer"
        })))
        .mount(provider)
        .await;

    Mock::given(method("GET"))
        .and(path("/oauth/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "12345",
            "preferred_username": "ada"
        })))
        .mount(provider)
        .await;
}

/// A client that keeps cookies but never follows redirects, so each hop of
/// the flow is observable.
fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client should build")
}

#[tokio::test]
async fn test_login_redirects_to_authorization_endpoint() -> Result<()> {
    let provider = MockServer::start().await;
    let server = TestPsServer::spawn_with_vars(session_vars(&provider.uri())).await?;
    let client = browser();

    let response = client.get(format!("{}/login", server.url())).send().await?;
    assert_eq!(response.status(), 307);

    let location = response.headers()["location"].to_str()?;
    assert!(location.starts_with(&format!("{}/oauth/authorize", provider.uri())));
    assert!(location.contains("client_id=earshot-web"));
    assert!(location.contains("response_type=code"));
    Ok(())
}

#[tokio::test]
async fn test_callback_stages_session_and_claim_works_once() -> Result<()> {
    let provider = MockServer::start().await;
    mount_happy_provider(&provider).await;

    let server = TestPsServer::spawn_with_vars(session_vars(&provider.uri())).await?;
    let client = browser();

    // Complete the callback leg.
    let response = client
        .get(format!("{}/oauth/callback?code=good-code", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 303);
    assert_eq!(response.headers()["location"], "/");

    // The staged cookies carry no secrets in the URL and are browser-only.
    let set_cookies: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(String::from))
        .collect();
    let token_cookie = set_cookies
        .iter()
        .find(|c| c.starts_with("ps_session_token="))
        .expect("token cookie should be staged");
    assert!(token_cookie.contains("HttpOnly"));
    assert!(token_cookie.contains("SameSite=Lax"));
    assert!(token_cookie.contains("Max-Age=300"));

    // First claim returns the payload.
    let response = client
        .get(format!("{}/auth/session", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["userId"], "12345");
    assert_eq!(body["username"], "ada");
    assert_eq!(body["url"], "wss://voice.example.com");
    assert!(!body["token"].as_str().unwrap().is_empty());

    // An immediate second claim finds no session, even well inside the
    // original expiry window.
    let response = client
        .get(format!("{}/auth/session", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 401);

    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "NO_SESSION");
    Ok(())
}

#[tokio::test]
async fn test_callback_without_code_is_terminal_400() -> Result<()> {
    let provider = MockServer::start().await;
    let server = TestPsServer::spawn_with_vars(session_vars(&provider.uri())).await?;
    let client = browser();

    let response = client
        .get(format!("{}/oauth/callback", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    // Nothing was staged.
    let response = client
        .get(format!("{}/auth/session", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_failed_exchange_propagates_status_and_stages_nothing() -> Result<()> {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&provider)
        .await;

    let server = TestPsServer::spawn_with_vars(session_vars(&provider.uri())).await?;
    let client = browser();

    let response = client
        .get(format!("{}/oauth/callback?code=expired-code", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("invalid_grant"));

    let response = client
        .get(format!("{}/auth/session", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_claim_without_any_cookies_is_401() -> Result<()> {
    let provider = MockServer::start().await;
    let server = TestPsServer::spawn_with_vars(session_vars(&provider.uri())).await?;

    let response = browser()
        .get(format!("{}/auth/session", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_login_without_oauth_config_is_500() -> Result<()> {
    let server = TestPsServer::spawn().await?;

    let response = browser()
        .get(format!("{}/login", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 500);

    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "CONFIG_MISSING");
    Ok(())
}
