use anyhow::Result;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::types::*;

/// Non-success response from the NetBox API
#[derive(Debug, thiserror::Error)]
#[error("NetBox API error {status}: {body}")]
pub struct NetBoxApiError {
    pub status: StatusCode,
    pub body: String,
}

impl NetBoxApiError {
    /// NetBox reports uniqueness failures as field validation errors
    pub fn is_unique_violation(&self) -> bool {
        self.status == StatusCode::BAD_REQUEST
            && (self.body.contains("already exists") || self.body.contains("must be unique"))
    }
}

/// NetBox API client
pub struct NetBoxClient {
    base_url: String,
    token: String,
    client: Client,
}

impl NetBoxClient {
    pub fn new(url: String, token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(NetBoxApiError { status, body }.into())
    }

    /// GET a filtered list. Only the first page is read.
    pub async fn list<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let resp = self
            .client
            .get(self.api_url(endpoint))
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .query(filters)
            .query(&[("limit", "1000")])
            .send()
            .await?;

        let paginated: PaginatedResponse<T> = Self::check(resp).await?.json().await?;
        Ok(paginated.results)
    }

    /// Create a resource via POST
    pub async fn create<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let resp = self
            .client
            .post(self.api_url(endpoint))
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        Ok(Self::check(resp).await?.json().await?)
    }

    /// Partially update a resource via PATCH
    pub async fn patch<T, B>(&self, endpoint: &str, id: i64, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let resp = self
            .client
            .patch(self.api_url(&format!("{}{}/", endpoint, id)))
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        Ok(Self::check(resp).await?.json().await?)
    }

    /// Test connectivity to NetBox
    pub async fn test_connection(&self) -> bool {
        match self
            .client
            .get(self.api_url("/dcim/sites/?limit=1"))
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detection() {
        let dup = NetBoxApiError {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"slug":["platform with this slug already exists."]}"#.into(),
        };
        assert!(dup.is_unique_violation());

        let other = NetBoxApiError {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"color":["Enter a valid hexadecimal RGB color code."]}"#.into(),
        };
        assert!(!other.is_unique_violation());

        let server = NetBoxApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "already exists".into(),
        };
        assert!(!server.is_unique_violation());
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = NetBoxClient::new("https://netbox.example.com/".into(), "t".into()).unwrap();
        assert_eq!(client.api_url("/dcim/sites/"), "https://netbox.example.com/api/dcim/sites/");
    }
}
