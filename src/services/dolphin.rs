//! Dolphin CRM client
//!
//! Member registration, profile updates and activation are mirrored into the
//! CRM. Requests authenticate with a static API key.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::error::{Error, Result};

const API_KEY_HEADER: &str = "x-api-key";

/// Member record exchanged with the CRM
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DolphinMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,

    #[validate(email)]
    #[serde(default)]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[async_trait]
pub trait DolphinService: Send + Sync {
    async fn register_member(&self, member: &DolphinMember) -> Result<()>;

    async fn update_member(&self, member: &DolphinMember) -> Result<()>;

    async fn activate_member(&self, member: &DolphinMember) -> Result<()>;
}

pub struct HttpDolphinService {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpDolphinService {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn call(&self, method: Method, path: &str, member: &DolphinMember) -> Result<()> {
        member.validate()?;

        let response = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(API_KEY_HEADER, &self.api_key)
            .json(member)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http(format!("Dolphin {} returned {}: {}", path, status, body)));
        }

        debug!(path = path, email = %member.email, "Dolphin call succeeded");
        Ok(())
    }
}

#[async_trait]
impl DolphinService for HttpDolphinService {
    async fn register_member(&self, member: &DolphinMember) -> Result<()> {
        self.call(Method::POST, "/members/register", member).await
    }

    async fn update_member(&self, member: &DolphinMember) -> Result<()> {
        self.call(Method::PUT, "/members/update", member).await
    }

    async fn activate_member(&self, member: &DolphinMember) -> Result<()> {
        self.call(Method::POST, "/members/activate", member).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn member() -> DolphinMember {
        DolphinMember {
            member_id: Some("USR1".to_string()),
            email: "jane@example.com".to_string(),
            first_name: Some("Jane".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_activate_member_sends_api_key() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/members/activate")
                    .header(API_KEY_HEADER, "secret")
                    .json_body_partial(r#"{"email":"jane@example.com","memberId":"USR1"}"#);
                then.status(200);
            })
            .await;

        let service = HttpDolphinService::new(Client::new(), server.base_url(), "secret");
        service.activate_member(&member()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_member_uses_put() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT).path("/members/update");
                then.status(204);
            })
            .await;

        let service = HttpDolphinService::new(Client::new(), server.base_url(), "secret");
        service.update_member(&member()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_email_never_reaches_crm() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/members/register");
                then.status(200);
            })
            .await;

        let service = HttpDolphinService::new(Client::new(), server.base_url(), "secret");
        let invalid = DolphinMember {
            email: "not-an-email".to_string(),
            ..Default::default()
        };
        let err = service.register_member(&invalid).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_server_error_is_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/members/register");
                then.status(500).body("boom");
            })
            .await;

        let service = HttpDolphinService::new(Client::new(), server.base_url(), "secret");
        let err = service.register_member(&member()).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }
}
