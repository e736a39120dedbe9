use derive_builder::Builder;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    api_interfaces::voter_info as raw,
    constants::*,
    error::{ApiErrorPayload, VoterInfoError},
    ApiKey,
};

/// Street address of a polling place.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub location_name: String,
    pub line1: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// A physical place a voter may cast a ballot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingLocation {
    pub address: Address,
    pub notes: String,
    pub polling_hours: String,
}

/// The election a query resolved to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Election {
    pub id: String,
    pub name: String,
    pub election_day: String,
    pub ocd_division_id: String,
}

/// Decoded voter info payload. `polling_locations` keeps the order the API sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterInfoResponse {
    pub election: Election,
    pub polling_locations: Vec<PollingLocation>,
}

/// Parameters of a `voterinfo` query.
#[derive(Builder, Clone, Debug, PartialEq, Eq)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct VoterInfoQuery {
    address: String,
    #[builder(default, setter(into, strip_option))]
    election_id: Option<String>,
    #[builder(default)]
    official_only: bool,
    #[builder(default)]
    return_all_available_data: bool,
}

impl VoterInfoQueryBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.address {
            Some(address) if address.trim().is_empty() => {
                Err("the address must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

impl VoterInfoQuery {
    pub fn builder() -> VoterInfoQueryBuilder {
        VoterInfoQueryBuilder::default()
    }

    /// Query for an address with every optional parameter left unset.
    pub fn for_address(address: &str) -> Result<Self, VoterInfoError> {
        Ok(Self::builder().address(address).build()?)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn params<'a>(&'a self, key: &'a ApiKey) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![
            (API_KEY_PARAM, key.get()),
            (ADDRESS_PARAM, self.address.as_str()),
        ];
        if let Some(election_id) = &self.election_id {
            params.push((ELECTION_ID_PARAM, election_id.as_str()));
        }
        if self.official_only {
            params.push((OFFICIAL_ONLY_PARAM, "true"));
        }
        if self.return_all_available_data {
            params.push((RETURN_ALL_DATA_PARAM, "true"));
        }
        params
    }
}

impl VoterInfoResponse {
    /// Issue a single voter info request and decode the response.
    #[instrument(level = "debug", skip_all, fields(address = %query.address))]
    pub async fn get(
        query: &VoterInfoQuery,
        key: &ApiKey,
        client: &Client,
        endpoint: &Url,
    ) -> Result<Self, VoterInfoError> {
        debug!(url = %endpoint, "Sending voter info request");
        // Strip the URL from transport errors so the key never reaches a log line.
        let response = client
            .get(endpoint.clone())
            .query(&query.params(key))
            .send()
            .await
            .map_err(|e| VoterInfoError::TransportError(e.without_url()))?;
        let status = response.status();
        debug!(status = %status, "Received voter info response");
        let body = response
            .text()
            .await
            .map_err(|e| VoterInfoError::TransportError(e.without_url()))?;

        if !status.is_success() {
            let error = match ApiErrorPayload::parse(&body) {
                Some(payload) => {
                    warn!(
                        code = payload.code,
                        reason = ?payload.reason,
                        message = %payload.message,
                        "Civic information API returned an error"
                    );
                    payload.classify(status)
                }
                None => {
                    warn!(
                        status = %status,
                        "Civic information API returned an unrecognized error body"
                    );
                    VoterInfoError::from_status(status)
                }
            };
            return Err(error);
        }

        let parsed_body: raw::Response =
            serde_json::from_str(&body).map_err(VoterInfoError::DecodeFailure)?;
        let decoded = Self::from(parsed_body);
        debug!(
            election = %decoded.election.id,
            polling_locations = decoded.polling_locations.len(),
            "Decoded voter info"
        );
        Ok(decoded)
    }
}

impl From<raw::Address> for Address {
    fn from(address: raw::Address) -> Self {
        Self {
            location_name: address.location_name,
            line1: address.line1,
            city: address.city,
            state: address.state,
            zip: address.zip,
        }
    }
}

impl From<raw::PollingLocation> for PollingLocation {
    fn from(location: raw::PollingLocation) -> Self {
        Self {
            address: location.address.into(),
            notes: location.notes,
            polling_hours: location.polling_hours,
        }
    }
}

impl From<raw::Election> for Election {
    fn from(election: raw::Election) -> Self {
        Self {
            id: election.id,
            name: election.name,
            election_day: election.election_day,
            ocd_division_id: election.ocd_division_id,
        }
    }
}

impl From<raw::Response> for VoterInfoResponse {
    fn from(response: raw::Response) -> Self {
        Self {
            election: response.election.into(),
            polling_locations: response
                .polling_locations
                .into_iter()
                .map(PollingLocation::from)
                .collect(),
        }
    }
}
