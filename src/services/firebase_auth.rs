// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Authentication adapter (Identity Toolkit REST API).
//!
//! Handles:
//! - Email/password sign-in and sign-up
//! - Google and Apple token exchange
//! - ID token refresh before expiry
//! - Account management (delete, password reset, email/password change)

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::identity::{FederatedCredential, Identity, IdentityProvider, ProviderKind};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, RwLock};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
const TOKEN_REFRESH_SKEW_SECS: i64 = 60;
const IDP_REQUEST_URI: &str = "http://localhost";

/// Signed-in session tokens.
#[derive(Clone)]
struct Session {
    identity: Identity,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - ChronoDuration::seconds(TOKEN_REFRESH_SKEW_SECS) <= now
    }
}

/// Claims read from a Firebase ID token.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    exp: i64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    need_confirmation: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    provider_user_info: Vec<ProviderUserInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderUserInfo {
    provider_id: String,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    error: FirebaseErrorDetail,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorDetail {
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

/// Identity provider backed by Firebase Authentication.
pub struct FirebaseIdentity {
    http: reqwest::Client,
    api_key: String,
    toolkit_url: String,
    token_url: String,
    session: RwLock<Option<Session>>,
    refresh_lock: Mutex<()>,
}

impl FirebaseIdentity {
    /// Create a client for the configured project (or the auth emulator).
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed building identity HTTP client")?;

        let (toolkit_url, token_url) = match &config.auth_emulator_host {
            Some(host) => (
                format!("http://{}/identitytoolkit.googleapis.com/v1", host),
                format!("http://{}/securetoken.googleapis.com/v1", host),
            ),
            None => (IDENTITY_TOOLKIT_URL.to_string(), SECURE_TOKEN_URL.to_string()),
        };

        tracing::info!(toolkit_url = %toolkit_url, "Initialized Firebase identity client");

        Ok(Self {
            http,
            api_key: config.firebase_api_key.clone(),
            toolkit_url,
            token_url,
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// POST a JSON body to an Identity Toolkit endpoint.
    async fn call<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}/{}", self.toolkit_url, endpoint);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Identity request failed: {}", e)))?;

        check_response_json(response).await
    }

    async fn establish(&self, response: SignInResponse) -> Result<Identity> {
        if response.need_confirmation {
            return Err(AppError::AccountConflict(
                "account exists with a different sign-in method".to_string(),
            ));
        }

        let claims = decode_id_token_claims(&response.id_token).ok();
        if let Some(claims) = &claims {
            if claims.sub != response.local_id {
                tracing::warn!(local_id = %response.local_id, "ID token subject does not match account");
                return Err(AppError::InvalidCredential(
                    "ID token issued for a different account".to_string(),
                ));
            }
        }
        let expires_at = expiry_from(claims.as_ref(), response.expires_in.as_deref());

        let identity = Identity {
            user_id: response.local_id,
            email: response
                .email
                .filter(|e| !e.is_empty())
                .or_else(|| claims.as_ref().and_then(|c| c.email.clone())),
            photo_url: response
                .photo_url
                .or_else(|| claims.as_ref().and_then(|c| c.picture.clone())),
        };

        *self.session.write().await = Some(Session {
            identity: identity.clone(),
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_at,
        });

        tracing::info!(user_id = %identity.user_id, "Signed in");
        Ok(identity)
    }

    /// Current session, refreshed if its ID token is about to expire.
    async fn fresh_session(&self) -> Result<Session> {
        {
            let guard = self.session.read().await;
            match guard.as_ref() {
                None => return Err(AppError::NotAuthenticated),
                Some(session) if !session.needs_refresh(Utc::now()) => {
                    return Ok(session.clone())
                }
                Some(_) => {}
            }
        }

        let _lock = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        let session = match self.session.read().await.as_ref() {
            None => return Err(AppError::NotAuthenticated),
            Some(session) if !session.needs_refresh(Utc::now()) => return Ok(session.clone()),
            Some(session) => session.clone(),
        };

        let refreshed = match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(AppError::NotAuthenticated) => {
                tracing::warn!(user_id = %session.identity.user_id, "Refresh token rejected, signing out");
                *self.session.write().await = None;
                return Err(AppError::NotAuthenticated);
            }
            Err(err) => return Err(err),
        };

        let claims = decode_id_token_claims(&refreshed.id_token).ok();
        let updated = Session {
            identity: session.identity,
            expires_at: expiry_from(claims.as_ref(), Some(&refreshed.expires_in)),
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
        };

        *self.session.write().await = Some(updated.clone());
        tracing::debug!(user_id = %updated.identity.user_id, "ID token refreshed");
        Ok(updated)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let response = self
            .http
            .post(format!("{}/token", self.token_url))
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Token refresh request failed: {}", e)))?;

        check_response_json(response).await
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn current_user(&self) -> Result<Identity> {
        Ok(self.fresh_session().await?.identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let response: SignInResponse = self
            .call(
                "accounts:signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        self.establish(response).await
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Identity> {
        let response: SignInResponse = self
            .call(
                "accounts:signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        tracing::info!(user_id = %response.local_id, "Account created");
        self.establish(response).await
    }

    async fn sign_in_with_federated_token(
        &self,
        credential: FederatedCredential,
    ) -> Result<Identity> {
        let body = json!({
            "postBody": idp_post_body(&credential),
            "requestUri": IDP_REQUEST_URI,
            "returnIdpCredential": true,
            "returnSecureToken": true,
        });

        let response: SignInResponse = self.call("accounts:signInWithIdp", &body).await?;
        tracing::debug!(provider = %credential.provider(), "Federated token exchanged");
        self.establish(response).await
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(session) = self.session.write().await.take() {
            tracing::info!(user_id = %session.identity.user_id, "Signed out");
        }
        Ok(())
    }

    async fn delete_account(&self) -> Result<()> {
        let session = self.fresh_session().await?;
        let _: serde_json::Value = self
            .call("accounts:delete", &json!({ "idToken": session.id_token }))
            .await?;

        *self.session.write().await = None;
        tracing::info!(user_id = %session.identity.user_id, "Account deleted");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "accounts:sendOobCode",
                &json!({ "requestType": "PASSWORD_RESET", "email": email }),
            )
            .await?;
        tracing::info!("Password reset email requested");
        Ok(())
    }

    async fn linked_providers(&self) -> Result<Vec<ProviderKind>> {
        let session = self.fresh_session().await?;
        let lookup: LookupResponse = self
            .call("accounts:lookup", &json!({ "idToken": session.id_token }))
            .await?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or(AppError::NotAuthenticated)?;

        Ok(providers_from(user.provider_user_info))
    }

    async fn update_password(&self, new_password: &str) -> Result<()> {
        let session = self.fresh_session().await?;
        let response: UpdateResponse = self
            .call(
                "accounts:update",
                &json!({
                    "idToken": session.id_token,
                    "password": new_password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        // Changing the password revokes the old tokens.
        if let (Some(id_token), Some(refresh_token)) = (response.id_token, response.refresh_token)
        {
            let claims = decode_id_token_claims(&id_token).ok();
            let mut guard = self.session.write().await;
            if let Some(current) = guard.as_mut() {
                current.expires_at = expiry_from(claims.as_ref(), response.expires_in.as_deref());
                current.id_token = id_token;
                current.refresh_token = refresh_token;
            }
        }

        tracing::info!(user_id = %session.identity.user_id, "Password updated");
        Ok(())
    }

    async fn update_email(&self, new_email: &str) -> Result<()> {
        let session = self.fresh_session().await?;
        let _: serde_json::Value = self
            .call(
                "accounts:sendOobCode",
                &json!({
                    "requestType": "VERIFY_AND_CHANGE_EMAIL",
                    "idToken": session.id_token,
                    "newEmail": new_email,
                }),
            )
            .await?;
        tracing::info!(user_id = %session.identity.user_id, "Email change verification sent");
        Ok(())
    }
}

/// Check response status and parse JSON body, mapping Firebase error codes.
async fn check_response_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if let Ok(parsed) = serde_json::from_str::<FirebaseErrorBody>(&body) {
            return Err(map_firebase_error(&parsed.error.message));
        }

        if status.as_u16() == 429 {
            tracing::warn!("Identity backend rate limit hit (429)");
        }
        return Err(AppError::Backend(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)))
}

/// Map an Identity Toolkit error message (e.g. `WEAK_PASSWORD : ...`).
fn map_firebase_error(message: &str) -> AppError {
    let code = message
        .split([' ', ':'])
        .next()
        .unwrap_or(message)
        .to_string();

    match code.as_str() {
        "EMAIL_NOT_FOUND"
        | "INVALID_PASSWORD"
        | "INVALID_LOGIN_CREDENTIALS"
        | "INVALID_IDP_RESPONSE"
        | "INVALID_EMAIL"
        | "USER_DISABLED" => AppError::InvalidCredential(code),
        "EMAIL_EXISTS" | "FEDERATED_USER_ID_ALREADY_LINKED" | "CREDENTIAL_ALREADY_IN_USE" => {
            AppError::AccountConflict(code)
        }
        "TOKEN_EXPIRED"
        | "USER_NOT_FOUND"
        | "INVALID_ID_TOKEN"
        | "INVALID_REFRESH_TOKEN"
        | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => AppError::NotAuthenticated,
        "WEAK_PASSWORD" | "MISSING_PASSWORD" | "MISSING_EMAIL" => {
            AppError::Validation(message.to_string())
        }
        _ => AppError::Backend(message.to_string()),
    }
}

/// Read claims from an ID token without verifying its signature.
///
/// The token came straight from the identity backend over TLS; only its
/// expiry and profile claims are used, never for authorization.
fn decode_id_token_claims(token: &str) -> anyhow::Result<IdTokenClaims> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims::<&str>(&[]);

    let data = decode::<IdTokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .context("failed decoding ID token claims")?;
    Ok(data.claims)
}

fn expiry_from(claims: Option<&IdTokenClaims>, expires_in: Option<&str>) -> DateTime<Utc> {
    if let Some(exp) = claims.and_then(|c| DateTime::from_timestamp(c.exp, 0)) {
        return exp;
    }
    let secs = expires_in.and_then(|s| s.parse::<i64>().ok()).unwrap_or(3600);
    Utc::now() + ChronoDuration::seconds(secs)
}

fn idp_post_body(credential: &FederatedCredential) -> String {
    match credential {
        FederatedCredential::Google {
            id_token,
            access_token,
        } => {
            let mut body = format!(
                "id_token={}&providerId={}",
                urlencoding::encode(id_token),
                ProviderKind::Google.provider_id()
            );
            if let Some(access_token) = access_token {
                body.push_str(&format!("&access_token={}", urlencoding::encode(access_token)));
            }
            body
        }
        FederatedCredential::Apple {
            id_token,
            raw_nonce,
        } => format!(
            "id_token={}&providerId={}&nonce={}",
            urlencoding::encode(id_token),
            ProviderKind::Apple.provider_id(),
            urlencoding::encode(raw_nonce)
        ),
    }
}

fn providers_from(info: Vec<ProviderUserInfo>) -> Vec<ProviderKind> {
    let mut providers = Vec::new();
    for entry in info {
        match ProviderKind::from_provider_id(&entry.provider_id) {
            Some(kind) if !providers.contains(&kind) => providers.push(kind),
            Some(_) => {}
            None => {
                tracing::warn!(provider_id = %entry.provider_id, "Unknown sign-in provider linked");
            }
        }
    }
    providers
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn unsigned_token(claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"not-the-real-key"),
        )
        .unwrap()
    }

    fn sign_in_response(local_id: &str, id_token: String) -> SignInResponse {
        SignInResponse {
            local_id: local_id.to_string(),
            email: None,
            photo_url: None,
            id_token,
            refresh_token: "refresh".to_string(),
            expires_in: Some("3600".to_string()),
            need_confirmation: false,
        }
    }

    #[test]
    fn test_map_firebase_error_codes() {
        assert!(matches!(
            map_firebase_error("INVALID_LOGIN_CREDENTIALS"),
            AppError::InvalidCredential(code) if code == "INVALID_LOGIN_CREDENTIALS"
        ));
        assert!(matches!(
            map_firebase_error("EMAIL_EXISTS"),
            AppError::AccountConflict(_)
        ));
        assert!(matches!(
            map_firebase_error("TOKEN_EXPIRED"),
            AppError::NotAuthenticated
        ));
        assert!(matches!(
            map_firebase_error("WEAK_PASSWORD : Password should be at least 6 characters"),
            AppError::Validation(msg) if msg.contains("6 characters")
        ));
        assert!(matches!(
            map_firebase_error("QUOTA_EXCEEDED"),
            AppError::Backend(_)
        ));
    }

    #[test]
    fn test_decode_id_token_claims_ignores_signature() {
        let token = unsigned_token(json!({
            "sub": "uid-42",
            "exp": 1_900_000_000i64,
            "aud": "spark-tasks",
            "email": "sam@example.com",
        }));

        let decoded = decode_id_token_claims(&token).unwrap();
        assert_eq!(decoded.sub, "uid-42");
        assert_eq!(decoded.email.as_deref(), Some("sam@example.com"));
        assert_eq!(
            expiry_from(Some(&decoded), None),
            DateTime::from_timestamp(1_900_000_000, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_establish_checks_token_subject() {
        let auth = FirebaseIdentity::new(&Config::test_default()).unwrap();
        let claims = json!({
            "sub": "uid-42",
            "exp": 1_900_000_000i64,
            "email": "sam@example.com",
        });

        let err = auth
            .establish(sign_in_response("uid-7", unsigned_token(claims.clone())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredential(_)));
        assert!(auth.session.read().await.is_none());

        let identity = auth
            .establish(sign_in_response("uid-42", unsigned_token(claims)))
            .await
            .unwrap();
        assert_eq!(identity.user_id, "uid-42");
        assert_eq!(identity.email.as_deref(), Some("sam@example.com"));
        assert!(auth.session.read().await.is_some());
    }

    #[test]
    fn test_expiry_falls_back_to_expires_in() {
        let before = Utc::now();
        let expiry = expiry_from(None, Some("120"));
        assert!(expiry >= before + ChronoDuration::seconds(120));
        assert!(expiry <= Utc::now() + ChronoDuration::seconds(120));
    }

    #[test]
    fn test_session_refresh_window() {
        let now = Utc::now();
        let session = Session {
            identity: Identity {
                user_id: "u".to_string(),
                email: None,
                photo_url: None,
            },
            id_token: String::new(),
            refresh_token: String::new(),
            expires_at: now + ChronoDuration::seconds(30),
        };
        assert!(session.needs_refresh(now));
        assert!(!Session {
            expires_at: now + ChronoDuration::minutes(30),
            ..session
        }
        .needs_refresh(now));
    }

    #[test]
    fn test_idp_post_body() {
        let google = FederatedCredential::Google {
            id_token: "a.b.c".to_string(),
            access_token: Some("at/1".to_string()),
        };
        assert_eq!(
            idp_post_body(&google),
            "id_token=a.b.c&providerId=google.com&access_token=at%2F1"
        );

        let apple = FederatedCredential::Apple {
            id_token: "x.y.z".to_string(),
            raw_nonce: "n0nce".to_string(),
        };
        assert_eq!(
            idp_post_body(&apple),
            "id_token=x.y.z&providerId=apple.com&nonce=n0nce"
        );
    }

    #[test]
    fn test_providers_from_skips_unknown_and_duplicates() {
        let info = vec![
            ProviderUserInfo {
                provider_id: "password".to_string(),
            },
            ProviderUserInfo {
                provider_id: "github.com".to_string(),
            },
            ProviderUserInfo {
                provider_id: "google.com".to_string(),
            },
            ProviderUserInfo {
                provider_id: "password".to_string(),
            },
        ];
        assert_eq!(
            providers_from(info),
            vec![ProviderKind::Password, ProviderKind::Google]
        );
    }
}
