//! HTTP API server: router construction, CORS policy, listener setup.

mod auth;
mod notes;
mod users;

use axum::http::{header, HeaderValue, Method};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::store::Store;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<Store>,
  /// Shared secret for the bearer middleware; empty disables the check
  pub api_token: String,
}

/// Build the application router.
///
/// Note routes sit behind the bearer middleware; user routes do not.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
  let note_routes = Router::new()
    .route(
      "/notes",
      get(notes::list)
        .post(notes::create)
        .patch(notes::update)
        .delete(notes::remove),
    )
    .layer(middleware::from_fn_with_state(
      state.clone(),
      auth::require_bearer,
    ));

  Router::new()
    .route(
      "/users",
      get(users::list)
        .post(users::create)
        .patch(users::update)
        .delete(users::remove),
    )
    .merge(note_routes)
    .layer(TraceLayer::new_for_http())
    .layer(cors_layer(allowed_origins))
    .with_state(state)
}

/// CORS allow-list. Requests without an Origin header (curl, tooling) are
/// not subject to CORS and pass through regardless.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
  let mut origins = Vec::new();
  for origin in allowed_origins {
    match HeaderValue::from_str(origin) {
      Ok(value) => origins.push(value),
      Err(e) => tracing::warn!("ignoring invalid CORS origin '{origin}': {e}"),
    }
  }

  CorsLayer::new()
    .allow_origin(origins)
    .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    .allow_credentials(true)
}

/// Open the store and run the server until shutdown.
pub async fn serve(config: &Config) -> Result<()> {
  let store = Store::open(&config.server.database_path()?)?;
  let state = AppState {
    store: Arc::new(store),
    api_token: Config::api_token().unwrap_or_default(),
  };

  if state.api_token.is_empty() {
    tracing::warn!("NOTEDESK_API_TOKEN not set; note routes are unauthenticated");
  }

  let app = router(state, &config.server.allowed_origins);

  let listener = tokio::net::TcpListener::bind(&config.server.bind)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", config.server.bind, e))?;
  tracing::info!("listening on {}", config.server.bind);

  axum::serve(listener, app).await?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::body::Body;
  use axum::http::{Request, StatusCode};
  use serde_json::{json, Value};
  use tower::util::ServiceExt;

  fn test_router(token: &str) -> Router {
    let store = Store::open_in_memory().unwrap();
    let state = AppState {
      store: Arc::new(store),
      api_token: token.to_string(),
    };
    router(state, &[])
  }

  fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
  }

  fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
  }

  async fn body_value(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn new_alice() -> Value {
    json!({"username": "alice", "password": "pw123456", "roles": ["Employee"]})
  }

  #[tokio::test]
  async fn create_user_then_duplicate() {
    let app = test_router("");

    let response = app
      .clone()
      .oneshot(json_request("POST", "/users", new_alice()))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_value(response).await;
    assert_eq!(body["message"], "New user alice created");

    let response = app
      .oneshot(json_request("POST", "/users", new_alice()))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_value(response).await;
    assert_eq!(body["message"], "Duplicate username");
  }

  #[tokio::test]
  async fn create_user_missing_fields() {
    let app = test_router("");
    let response = app
      .oneshot(json_request(
        "POST",
        "/users",
        json!({"username": "alice"}),
      ))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_value(response).await;
    assert_eq!(body["message"], "All fields are required");
  }

  #[tokio::test]
  async fn empty_collections_are_bad_request() {
    let app = test_router("");

    let response = app.clone().oneshot(get_request("/users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_value(response).await["message"], "No users found");

    let response = app.oneshot(get_request("/notes")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_value(response).await["message"], "No notes found");
  }

  #[tokio::test]
  async fn listed_users_carry_no_password() {
    let app = test_router("");
    app
      .clone()
      .oneshot(json_request("POST", "/users", new_alice()))
      .await
      .unwrap();

    let response = app.oneshot(get_request("/users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "alice");
    assert!(users[0].get("password").is_none());
  }

  #[tokio::test]
  async fn self_username_update_is_ok() {
    let app = test_router("");
    app
      .clone()
      .oneshot(json_request("POST", "/users", new_alice()))
      .await
      .unwrap();
    let response = app.clone().oneshot(get_request("/users")).await.unwrap();
    let id = body_value(response).await[0]["id"].as_str().unwrap().to_string();

    let response = app
      .oneshot(json_request(
        "PATCH",
        "/users",
        json!({"id": id, "username": "alice", "roles": ["Employee"], "active": false}),
      ))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_value(response).await["message"], "alice updated");
  }

  #[tokio::test]
  async fn deleting_user_with_notes_is_blocked() {
    let app = test_router("");
    app
      .clone()
      .oneshot(json_request("POST", "/users", new_alice()))
      .await
      .unwrap();
    let response = app.clone().oneshot(get_request("/users")).await.unwrap();
    let id = body_value(response).await[0]["id"].as_str().unwrap().to_string();

    let response = app
      .clone()
      .oneshot(json_request(
        "POST",
        "/notes",
        json!({"user": id, "title": "First note", "text": "body"}),
      ))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
      .clone()
      .oneshot(json_request("DELETE", "/users", json!({"id": id})))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_value(response).await["message"], "User has assigned notes");

    // User is still listed
    let response = app.oneshot(get_request("/users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn delete_user_returns_confirmation_string() {
    let app = test_router("");
    app
      .clone()
      .oneshot(json_request("POST", "/users", new_alice()))
      .await
      .unwrap();
    let response = app.clone().oneshot(get_request("/users")).await.unwrap();
    let id = body_value(response).await[0]["id"].as_str().unwrap().to_string();

    let response = app
      .oneshot(json_request("DELETE", "/users", json!({"id": id})))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    assert_eq!(
      body.as_str().unwrap(),
      format!("Username alice with ID {id} deleted")
    );
  }

  #[tokio::test]
  async fn note_routes_require_bearer_token() {
    let app = test_router("secret");

    let response = app.clone().oneshot(get_request("/notes")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_value(response).await["message"], "Unauthorized");

    let response = app
      .clone()
      .oneshot(
        Request::builder()
          .uri("/notes")
          .header(header::AUTHORIZATION, "Bearer wrong")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Valid token reaches the handler (empty table -> 400)
    let response = app
      .clone()
      .oneshot(
        Request::builder()
          .uri("/notes")
          .header(header::AUTHORIZATION, "Bearer secret")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // User routes are not behind the middleware
    let response = app.oneshot(get_request("/users")).await.unwrap();
    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
  }
}
