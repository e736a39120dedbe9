use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{api_interfaces::voter_info as raw, voter_info::VoterInfoQueryBuilderError};

/// Errors from a voter info request. Descriptions are the user-facing text
/// from the Civic Information API error reference.
#[derive(Debug, Error)]
pub enum VoterInfoError {
    #[error("Unable to build the request: {0}")]
    InvalidRequest(String),
    #[error("Failed to decode response")]
    DecodeFailure(#[source] serde_json::Error),
    #[error("Request falls in an invalid range ({0})")]
    InvalidStatusCode(StatusCode),
    #[error("The address sent to the API was not parseable. This may happen if the address is not completely specified.")]
    ParseError,
    #[error("An address must be specified for this request.")]
    Required,
    #[error("The election that was requested is unknown. This may be because the requested election ID is invalid. This may also happen for requests without an election id specified if there is no data available for the provided address.")]
    InvalidValue,
    #[error("The requested is election is over. Data is no longer available for this election.")]
    InvalidQuery,
    #[error("The request was not appropriately authorized.")]
    Unauthorized,
    #[error("The recursive request required processing too many divisions. Try applying additional filters and/or using a more constrained OCD ID.")]
    LimitExceeded,
    #[error("The API does not have any information for this address. This may be because the address is not a US residential address. Another reason for this error is if there is no election data for this address.")]
    NotFound,
    #[error("The API is experiencing a problem responding to the request. These types of errors can be retried.")]
    BackendError,
    #[error("Unable to reach the civic information service")]
    TransportError(#[source] reqwest::Error),
}

impl VoterInfoError {
    /// Only backend errors are documented as safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VoterInfoError::BackendError)
    }

    /// Map a documented error reason to its variant.
    pub fn from_reason(reason: &str) -> Option<Self> {
        let error = match reason {
            "parseError" => VoterInfoError::ParseError,
            "required" => VoterInfoError::Required,
            "invalidValue" => VoterInfoError::InvalidValue,
            "invalidQuery" => VoterInfoError::InvalidQuery,
            "unauthorized" => VoterInfoError::Unauthorized,
            "limitExceeded" => VoterInfoError::LimitExceeded,
            "notFound" => VoterInfoError::NotFound,
            "backendError" => VoterInfoError::BackendError,
            _ => return None,
        };
        Some(error)
    }

    /// Classify a bare status code when no documented reason is available.
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => VoterInfoError::ParseError,
            401 | 403 => VoterInfoError::Unauthorized,
            404 => VoterInfoError::NotFound,
            500..=599 => VoterInfoError::BackendError,
            _ => VoterInfoError::InvalidStatusCode(status),
        }
    }
}

impl From<VoterInfoQueryBuilderError> for VoterInfoError {
    fn from(err: VoterInfoQueryBuilderError) -> Self {
        VoterInfoError::InvalidRequest(err.to_string())
    }
}

/// Structured error body the API returns in place of a success payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorPayload {
    pub code: i64,
    pub message: String,
    pub reason: Option<String>,
}

impl ApiErrorPayload {
    /// Parse an error body. Returns `None` when the body is not a recognizable error payload.
    pub fn parse(body: &str) -> Option<Self> {
        let payload = serde_json::from_str::<raw::ErrorBody>(body)
            .ok()?
            .into_payload();
        let reason = payload
            .errors
            .into_iter()
            .find_map(|detail| detail.reason);
        Some(Self {
            code: payload.code,
            message: payload.message,
            reason,
        })
    }

    /// Classify this payload. The documented reason wins over the code; the
    /// response status is used when the code is not a valid HTTP status.
    pub fn classify(&self, response_status: StatusCode) -> VoterInfoError {
        if let Some(error) = self.reason.as_deref().and_then(VoterInfoError::from_reason) {
            return error;
        }
        let status = u16::try_from(self.code)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(response_status);
        VoterInfoError::from_status(status)
    }
}

/// Errors from a geocoding backend.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("unable to build the geocoding request: {0}")]
    BuildError(String),
    #[error("the geocoding request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("the geocoding request failed with status code: {0}")]
    ResponseError(StatusCode),
    #[error("unable to parse the geocoding response: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("{0}")]
    Provider(String),
}

/// Errors from resolving a place selection into an address.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("the selection has no text to look up")]
    EmptySelection,
    #[error("unable to locate the selected place: {0}")]
    GeoLookup(String),
    #[error("unable to reverse geocode the given location: {0}")]
    ReverseGeocode(String),
}
