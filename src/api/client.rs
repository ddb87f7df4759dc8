//! Typed HTTP client for the notedesk API.

use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder, Response};
use url::Url;

use super::types::{
  DeleteRequest, MessageResponse, NewNote, NewUser, Note, UpdateNote, UpdateUser, User,
};

/// Plain API client without caching.
#[derive(Clone)]
pub struct Client {
  http: reqwest::Client,
  base_url: Url,
  /// Bearer token sent on note routes; user routes are open
  api_token: Option<String>,
}

impl Client {
  pub fn new(base_url: &str, api_token: Option<String>) -> Result<Self> {
    let base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid base URL {}: {}", base_url, e))?;
    Ok(Self {
      http: reqwest::Client::new(),
      base_url,
      api_token,
    })
  }

  fn request(&self, method: Method, path: &str, authed: bool) -> Result<RequestBuilder> {
    let url = self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid request path {}: {}", path, e))?;
    let mut builder = self.http.request(method, url);
    if authed {
      if let Some(token) = &self.api_token {
        builder = builder.bearer_auth(token);
      }
    }
    Ok(builder)
  }

  /// Surface non-2xx responses as errors carrying the server's message.
  async fn expect_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let message = response
      .json::<MessageResponse>()
      .await
      .map(|m| m.message)
      .unwrap_or_else(|_| status.to_string());
    Err(eyre!("{} ({})", message, status.as_u16()))
  }

  pub async fn get_users(&self) -> Result<Vec<User>> {
    let response = self.request(Method::GET, "/users", false)?.send().await?;
    Ok(Self::expect_success(response).await?.json().await?)
  }

  pub async fn create_user(&self, req: NewUser) -> Result<String> {
    let response = self
      .request(Method::POST, "/users", false)?
      .json(&req)
      .send()
      .await?;
    Ok(
      Self::expect_success(response)
        .await?
        .json::<MessageResponse>()
        .await?
        .message,
    )
  }

  pub async fn update_user(&self, req: UpdateUser) -> Result<String> {
    let response = self
      .request(Method::PATCH, "/users", false)?
      .json(&req)
      .send()
      .await?;
    Ok(
      Self::expect_success(response)
        .await?
        .json::<MessageResponse>()
        .await?
        .message,
    )
  }

  pub async fn delete_user(&self, id: &str) -> Result<String> {
    let response = self
      .request(Method::DELETE, "/users", false)?
      .json(&DeleteRequest::new(id))
      .send()
      .await?;
    Ok(Self::expect_success(response).await?.json().await?)
  }

  pub async fn get_notes(&self) -> Result<Vec<Note>> {
    let response = self.request(Method::GET, "/notes", true)?.send().await?;
    Ok(Self::expect_success(response).await?.json().await?)
  }

  pub async fn create_note(&self, req: NewNote) -> Result<String> {
    let response = self
      .request(Method::POST, "/notes", true)?
      .json(&req)
      .send()
      .await?;
    Ok(
      Self::expect_success(response)
        .await?
        .json::<MessageResponse>()
        .await?
        .message,
    )
  }

  pub async fn update_note(&self, req: UpdateNote) -> Result<String> {
    let response = self
      .request(Method::PATCH, "/notes", true)?
      .json(&req)
      .send()
      .await?;
    Ok(
      Self::expect_success(response)
        .await?
        .json::<MessageResponse>()
        .await?
        .message,
    )
  }

  pub async fn delete_note(&self, id: &str) -> Result<String> {
    let response = self
      .request(Method::DELETE, "/notes", true)?
      .json(&DeleteRequest::new(id))
      .send()
      .await?;
    Ok(Self::expect_success(response).await?.json().await?)
  }
}
