use serde::Deserialize;

// Request structure is omitted since the query is sent as URL parameters.

/// Raw voter info response from API.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub election: Election,
    #[serde(default)]
    pub polling_locations: Vec<PollingLocation>,
}

/// Raw election metadata from API.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Election {
    pub id: String,
    pub name: String,
    pub election_day: String,
    pub ocd_division_id: String,
}

/// Raw polling location from API.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingLocation {
    pub address: Address,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub polling_hours: String,
}

/// Raw address data from API.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub location_name: String,
    pub line1: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Error body returned on non-2xx responses. Google wraps it in an `error`
/// envelope; some proxies return the payload bare.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Wrapped { error: ErrorPayload },
    Bare(ErrorPayload),
}

#[derive(Deserialize)]
pub struct ErrorPayload {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
pub struct ErrorDetail {
    pub reason: Option<String>,
}

impl ErrorBody {
    pub fn into_payload(self) -> ErrorPayload {
        match self {
            ErrorBody::Wrapped { error } => error,
            ErrorBody::Bare(payload) => payload,
        }
    }
}
