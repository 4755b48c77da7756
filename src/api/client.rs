

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use super::models::{CqlRequest, CqlResponse};
use crate::core::config::CatalogConfig;
use crate::core::error::{CatalogError, Result};


const CQL_ENDPOINT: &str = "./internal/cql";


/// Anything that can answer a CQL query against the catalog.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn query(&self, request: &CqlRequest) -> Result<CqlResponse>;
}


pub struct CatalogClient {
    client: Client,
    endpoint: Url,
}

impl CatalogClient {
    
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        config.validate()?;

        let endpoint = Url::parse(&config.base_url)?.join(CQL_ENDPOINT)?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        info!("CatalogClient created for {}", endpoint);

        Ok(Self { client, endpoint })
    }

    
    pub fn from_env() -> Result<Self> {
        Self::new(&CatalogConfig::from_env())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl QueryTransport for CatalogClient {
    async fn query(&self, request: &CqlRequest) -> Result<CqlResponse> {
        debug!("POST {} src={} cql={}", self.endpoint, request.src, request.cql);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: CqlResponse = serde_json::from_str(&body)?;
        debug!("CQL query returned {} results", parsed.results.len());
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_resolves_against_base_path() {
        let config = CatalogConfig::new("https://catalog.example:8993/search/catalog/");
        let client = CatalogClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://catalog.example:8993/search/catalog/internal/cql"
        );
    }

    struct CannedTransport;

    #[async_trait]
    impl QueryTransport for CannedTransport {
        async fn query(&self, request: &CqlRequest) -> Result<CqlResponse> {
            if request.src.is_empty() {
                return Err(CatalogError::Internal("no source".to_string()));
            }
            Ok(CqlResponse::default())
        }
    }

    #[test]
    fn test_transport_trait_object() {
        let transport: Box<dyn QueryTransport> = Box::new(CannedTransport);
        let mut request = CqlRequest {
            count: 1,
            cql: "INCLUDE".to_string(),
            id: "0".to_string(),
            sort: "modified:desc".to_string(),
            src: "ddf.distribution".to_string(),
            start: 1,
        };
        let response = tokio_test::block_on(transport.query(&request));
        assert!(tokio_test::assert_ok!(response).results.is_empty());

        request.src.clear();
        tokio_test::assert_err!(tokio_test::block_on(transport.query(&request)));
    }

    #[test]
    fn test_client_rejects_bad_base_url() {
        let config = CatalogConfig::new("::nope::");
        assert!(CatalogClient::new(&config).is_err());
    }
}
