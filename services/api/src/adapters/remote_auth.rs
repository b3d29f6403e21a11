//! services/api/src/adapters/remote_auth.rs
//!
//! The adapter for the managed authentication service. It implements the
//! `AuthProvider` port from the `core` crate against a GoTrue-style REST API
//! (`/auth/v1/token`, `/auth/v1/signup`, `/auth/v1/user`, `/auth/v1/logout`).

use async_trait::async_trait;
use learnhub_core::domain::{Preferences, Role, User};
use learnhub_core::ports::{AuthProvider, PortError, PortResult, ProviderSession, SignUpRequest};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::config::AuthProviderConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct RemoteAuthAdapter {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RemoteAuthAdapter {
    pub fn new(config: &AuthProviderConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.api_key)
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: UserMetadata,
}

#[derive(Serialize, Deserialize, Default)]
struct UserMetadata {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct ProviderUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<ProviderUser>,
}

impl ProviderUser {
    fn to_domain(self) -> User {
        let email = self.email.unwrap_or_default();
        let username = self
            .user_metadata
            .username
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        User {
            id: self.id,
            username,
            email,
            role: self.user_metadata.role.unwrap_or(Role::Student),
            avatar: self.user_metadata.avatar_url,
            preferences: Preferences::default(),
            progress: Default::default(),
        }
    }
}

async fn unexpected(response: Response) -> PortError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!(%status, "auth provider returned an error");
    PortError::Unexpected(format!("auth provider responded {status}: {body}"))
}

fn transport(e: reqwest::Error) -> PortError {
    PortError::Unexpected(format!("auth provider unreachable: {e}"))
}

fn into_session(body: TokenResponse) -> PortResult<ProviderSession> {
    match (body.access_token, body.user) {
        (Some(access_token), Some(user)) => Ok(ProviderSession {
            access_token,
            user: user.to_domain(),
        }),
        (None, Some(_)) => Err(PortError::Conflict(
            "Account created; confirm the email address before signing in".to_string(),
        )),
        _ => Err(PortError::Unexpected(
            "auth provider response is missing the session".to_string(),
        )),
    }
}

//=========================================================================================
// `AuthProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthProvider for RemoteAuthAdapter {
    async fn sign_in(&self, email: &str, password: &str) -> PortResult<ProviderSession> {
        let response = self
            .request(self.client.post(self.endpoint("token?grant_type=password")))
            .json(&PasswordGrant { email, password })
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            s if s.is_success() => {
                let body: TokenResponse = response.json().await.map_err(transport)?;
                into_session(body)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(PortError::Unauthorized)
            }
            _ => Err(unexpected(response).await),
        }
    }

    async fn sign_up(&self, request: &SignUpRequest) -> PortResult<ProviderSession> {
        let body = SignUpBody {
            email: &request.email,
            password: &request.password,
            data: UserMetadata {
                username: Some(request.username.clone()),
                role: Some(request.role),
                avatar_url: None,
            },
        };
        let response = self
            .request(self.client.post(self.endpoint("signup")))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            s if s.is_success() => {
                let raw: serde_json::Value = response.json().await.map_err(transport)?;
                // Without auto-confirm the provider answers with the bare user object.
                let body = if raw.get("user").is_some() {
                    serde_json::from_value::<TokenResponse>(raw)
                } else {
                    serde_json::from_value::<ProviderUser>(raw).map(|user| TokenResponse {
                        access_token: None,
                        user: Some(user),
                    })
                }
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
                into_session(body)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let message = response.text().await.unwrap_or_default();
                Err(PortError::InvalidInput(message))
            }
            _ => Err(unexpected(response).await),
        }
    }

    async fn get_user(&self, access_token: &str) -> PortResult<User> {
        let response = self
            .request(self.client.get(self.endpoint("user")))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            s if s.is_success() => {
                let user: ProviderUser = response.json().await.map_err(transport)?;
                Ok(user.to_domain())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PortError::Unauthorized),
            _ => Err(unexpected(response).await),
        }
    }

    async fn sign_out(&self, access_token: &str) -> PortResult<()> {
        let response = self
            .request(self.client.post(self.endpoint("logout")))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            // An already expired token is as good as signed out.
            s if s.is_success() || s == StatusCode::UNAUTHORIZED => Ok(()),
            _ => Err(unexpected(response).await),
        }
    }
}
