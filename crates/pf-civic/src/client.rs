use reqwest::Url;
use thiserror::Error;

use crate::{
    constants::DEFAULT_VOTER_INFO_URL,
    error::VoterInfoError,
    voter_info::{VoterInfoQuery, VoterInfoResponse},
    ApiKey,
};

/// Client for the Civic Information voter info query.
#[derive(Clone, Debug)]
pub struct Client {
    http_client: reqwest::Client,
    voter_info_url: Url,
    api_key: ApiKey,
}

#[derive(Clone, Debug, Default)]
pub struct EndpointConfig {
    pub voter_info: Option<String>,
}

#[derive(Debug, Error)]
pub enum EndpointConfigError {
    #[error("invalid URL for endpoint {0} (url: {1}): {2}")]
    InvalidUrl(String, String, String),
    #[error("unsupported scheme `{1}` for endpoint {0}")]
    UnsupportedScheme(String, String),
}

impl EndpointConfig {
    pub fn validate(&self) -> Result<(), EndpointConfigError> {
        self.voter_info_url().map(|_| ())
    }

    fn voter_info_url(&self) -> Result<Url, EndpointConfigError> {
        parse_endpoint(
            "voter_info",
            self.voter_info.as_deref().unwrap_or(DEFAULT_VOTER_INFO_URL),
        )
    }
}

pub(crate) fn parse_endpoint(name: &str, raw: &str) -> Result<Url, EndpointConfigError> {
    let url = Url::parse(raw).map_err(|e| {
        EndpointConfigError::InvalidUrl(name.to_string(), raw.to_string(), e.to_string())
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(EndpointConfigError::UnsupportedScheme(
            name.to_string(),
            scheme.to_string(),
        )),
    }
}

#[derive(Debug, Error)]
pub enum ClientInitError {
    #[error("invalid endpoint configuration: {0}")]
    InvalidEndpointConfig(#[from] EndpointConfigError),
}

impl Client {
    pub fn new(
        http_client: reqwest::Client,
        endpoints: Option<EndpointConfig>,
        api_key: ApiKey,
    ) -> Result<Self, ClientInitError> {
        let voter_info_url = endpoints.unwrap_or_default().voter_info_url()?;
        Ok(Self {
            http_client,
            voter_info_url,
            api_key,
        })
    }

    /// Fetch polling data for an address. Empty addresses fail before any request is sent.
    pub async fn fetch_voter_info(
        &self,
        address: &str,
    ) -> Result<VoterInfoResponse, VoterInfoError> {
        let query = VoterInfoQuery::for_address(address)?;
        self.query_voter_info(&query).await
    }

    pub async fn query_voter_info(
        &self,
        query: &VoterInfoQuery,
    ) -> Result<VoterInfoResponse, VoterInfoError> {
        VoterInfoResponse::get(query, &self.api_key, &self.http_client, &self.voter_info_url).await
    }
}
