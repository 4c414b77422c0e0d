use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::auth::{Account, IdentityProvider, Session};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// FirebaseIdentityProvider implements IdentityProvider against the Google
// Identity Toolkit REST endpoints.
pub struct FirebaseIdentityProvider {
    base_url: String,
    api_key: String,
}

impl FirebaseIdentityProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        FirebaseIdentityProvider {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1/accounts:{}?key={}", self.base_url, action, self.api_key)
    }

    fn client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .user_agent("finboard/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()?)
    }
}

#[derive(Serialize, Debug)]
struct CredentialsPayload<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(rename = "returnSecureToken")]
    return_secure_token: bool,
}

#[derive(Deserialize, Debug)]
struct SignInResponse {
    #[serde(alias = "idToken")]
    id_token: String,
    #[serde(alias = "localId")]
    local_id: String,
    email: String,
}

#[derive(Deserialize, Debug)]
struct LookupResponse {
    users: Vec<LookupUser>,
}

#[derive(Deserialize, Debug)]
struct LookupUser {
    #[serde(alias = "localId")]
    local_id: String,
    email: String,
    // Millisecond epoch, transported as a string.
    #[serde(alias = "createdAt")]
    created_at: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: String,
}

/// Extracts the provider's error message from a failed response, falling
/// back to the HTTP status.
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => body.error.message,
        Err(_) => format!("HTTP error: {status}"),
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    #[instrument(name = "IdentitySignIn", skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.endpoint("signInWithPassword");
        debug!("Requesting sign-in from identity provider");

        let client = self.client()?;
        let response = client
            .post(&url)
            .json(&CredentialsPayload {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} during sign-in", e))?;

        if !response.status().is_success() {
            let message = error_message(response).await;
            debug!("Sign-in rejected: {message}");
            return Err(anyhow!("Sign-in failed: {message}"));
        }

        let data = response.json::<SignInResponse>().await?;
        Ok(Session {
            token: data.id_token,
            uid: data.local_id,
            email: data.email,
        })
    }

    #[instrument(name = "IdentitySignUp", skip(self, password), fields(email = %email))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<()> {
        let url = self.endpoint("signUp");
        debug!("Requesting sign-up from identity provider");

        let client = self.client()?;
        let response = client
            .post(&url)
            .json(&CredentialsPayload {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} during sign-up", e))?;

        if !response.status().is_success() {
            let message = error_message(response).await;
            debug!("Sign-up rejected: {message}");
            return Err(anyhow!("Sign-up failed: {message}"));
        }

        Ok(())
    }

    async fn lookup(&self, token: &str) -> Result<Account> {
        let url = self.endpoint("lookup");
        debug!("Validating session token with identity provider");

        let client = self.client()?;
        let response = client
            .post(&url)
            .json(&serde_json::json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} during token lookup", e))?;

        if !response.status().is_success() {
            let message = error_message(response).await;
            return Err(anyhow!("Invalid session token: {message}"));
        }

        let data = response.json::<LookupResponse>().await?;
        let user = data
            .users
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Invalid session token: no account found"))?;

        let created_at = user
            .created_at
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

        Ok(Account {
            uid: user.local_id,
            email: user.email,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_successful_sign_in() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "idToken": "token-123",
            "localId": "uid-1",
            "email": "user@example.com"
        }"#;

        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .and(body_partial_json(serde_json::json!({
                "email": "user@example.com",
                "returnSecureToken": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = FirebaseIdentityProvider::new(&mock_server.uri(), "test-key");
        let session = provider.sign_in("user@example.com", "hunter2").await.unwrap();
        assert_eq!(session.token, "token-123");
        assert_eq!(session.uid, "uid-1");
        assert_eq!(session.email, "user@example.com");
    }

    #[tokio::test]
    async fn test_sign_in_with_bad_credentials() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{"error": {"message": "INVALID_PASSWORD"}}"#;

        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = FirebaseIdentityProvider::new(&mock_server.uri(), "test-key");
        let result = provider.sign_in("user@example.com", "wrong").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Sign-in failed: INVALID_PASSWORD"
        );
    }

    #[tokio::test]
    async fn test_successful_sign_up() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "idToken": "token-456",
            "localId": "uid-2",
            "email": "new@example.com"
        }"#;

        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = FirebaseIdentityProvider::new(&mock_server.uri(), "test-key");
        assert!(provider.sign_up("new@example.com", "hunter2").await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_up_email_exists() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{"error": {"message": "EMAIL_EXISTS"}}"#;

        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .respond_with(ResponseTemplate::new(400).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = FirebaseIdentityProvider::new(&mock_server.uri(), "test-key");
        let result = provider.sign_up("new@example.com", "hunter2").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Sign-up failed: EMAIL_EXISTS"
        );
    }

    #[tokio::test]
    async fn test_lookup_resolves_account() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "users": [{
                "localId": "uid-1",
                "email": "user@example.com",
                "createdAt": "1700000000000"
            }]
        }"#;

        Mock::given(method("POST"))
            .and(path("/v1/accounts:lookup"))
            .and(body_partial_json(serde_json::json!({"idToken": "token-123"})))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = FirebaseIdentityProvider::new(&mock_server.uri(), "test-key");
        let account = provider.lookup("token-123").await.unwrap();
        assert_eq!(account.uid, "uid-1");
        assert_eq!(account.email, "user@example.com");
        assert_eq!(
            account.created_at,
            Utc.timestamp_millis_opt(1_700_000_000_000).single()
        );
    }

    #[tokio::test]
    async fn test_lookup_rejects_invalid_token() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{"error": {"message": "INVALID_ID_TOKEN"}}"#;

        Mock::given(method("POST"))
            .and(path("/v1/accounts:lookup"))
            .respond_with(ResponseTemplate::new(400).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = FirebaseIdentityProvider::new(&mock_server.uri(), "test-key");
        let result = provider.lookup("stale").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("INVALID_ID_TOKEN"));
    }
}
