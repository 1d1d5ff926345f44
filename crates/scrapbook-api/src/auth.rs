use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::WithRejection;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Deserialize;
use tracing::{info, warn};

use scrapbook_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "scrapbook_session";

/// Client for the identity provider's code-exchange endpoint. The OAuth
/// handshake itself happens between the browser and the provider; this side
/// only redeems the code for the signed-in user's profile.
pub struct IdentityClient {
    http: reqwest::Client,
    exchange_url: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    user: IdentityUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserMetadata {
    pub full_name: Option<String>,
}

impl IdentityClient {
    pub fn new(exchange_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            exchange_url,
        }
    }

    pub async fn exchange_code(&self, code: &str) -> Result<IdentityUser> {
        let resp: ExchangeResponse = self
            .http
            .post(&self.exchange_url)
            .json(&serde_json::json!({ "auth_code": code }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.user)
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

/// GET /api/auth/callback?code
///
/// Redeem the provider code, record first-time
/// users, start a session, and send the browser home. New users land with
/// `?claim_username=true` so the client prompts for a username.
pub async fn callback(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<CallbackQuery>, ApiError>,
    jar: CookieJar,
) -> impl IntoResponse {
    let origin = state.public_origin.trim_end_matches('/').to_string();

    let Some(code) = query.code else {
        return (jar, Redirect::temporary(&origin));
    };

    let user = match state.identity.exchange_code(&code).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Auth code exchange failed: {}", e);
            return (jar, Redirect::temporary(&origin));
        }
    };

    let Some(email) = user.email.clone() else {
        warn!("Identity {} has no email; not recording", user.id);
        return (jar, Redirect::temporary(&origin));
    };

    let id = user.id.clone();
    let mail = email.clone();
    let full_name = user.user_metadata.full_name.clone();
    let created = match state
        .with_db(move |db| db.insert_user_if_absent(&id, &mail, full_name.as_deref()))
        .await
    {
        Ok(created) => created,
        Err(e) => {
            warn!("Failed to record user {}: {}", user.id, e);
            return (jar, Redirect::temporary(&origin));
        }
    };

    let jar = match create_token(&state.jwt_secret, &user.id, &email) {
        Ok(token) => jar.add(
            Cookie::build((SESSION_COOKIE, token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax),
        ),
        Err(e) => {
            warn!("Failed to sign session for {}: {}", user.id, e);
            jar
        }
    };

    if created {
        info!("New user {} signed in", user.id);
        return (jar, Redirect::temporary(&format!("{}?claim_username=true", origin)));
    }

    (jar, Redirect::temporary(&origin))
}

pub fn create_token(secret: &str, user_id: &str, email: &str) -> Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
