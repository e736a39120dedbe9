//! Turns a place suggestion into a mailing address the voter info query accepts.
//!
//! Resolution is two sequential lookups: the selection is located to a single
//! coordinate, then that coordinate is reverse geocoded to the nearest postal
//! placemark. Both lookups are single attempts.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{GeocodeError, ResolveError};

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex pattern"));
static EMPTY_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\s*,\s*)+").expect("Invalid regex pattern"));

/// A place suggestion picked by the user.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub title: String,
    pub subtitle: String,
}

impl Selection {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }

    /// The free-text form of the selection, `"<title>, <subtitle>"`.
    pub fn query_text(&self) -> String {
        normalize(&format!("{}, {}", self.title, self.subtitle))
    }

    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.subtitle.trim().is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Postal details of a reverse geocoded location. Any part may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placemark {
    pub name: Option<String>,
    pub house_number: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl Placemark {
    /// Single-line mailing address: `"<number> <street>, <city>, <state> <zip>"`.
    pub fn formatted_address(&self) -> String {
        let street_line = join_present(&[&self.house_number, &self.street], " ");
        let region = join_present(&[&self.state, &self.postal_code], " ");
        let city = self.city.clone().unwrap_or_default();
        normalize(&[street_line, city, region].join(", "))
    }
}

fn join_present(parts: &[&Option<String>], separator: &str) -> String {
    parts
        .iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Collapse runs of whitespace and drop empty comma-separated segments.
fn normalize(address: &str) -> String {
    let collapsed = WHITESPACE.replace_all(address.trim(), " ");
    let separated = EMPTY_SEPARATORS.replace_all(&collapsed, ", ");
    separated
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .to_string()
}

/// Locates a selection to a coordinate.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn locate(&self, selection: &Selection) -> Result<Option<Coordinate>, GeocodeError>;
}

/// Resolves a coordinate to the nearest postal placemark.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<Placemark>, GeocodeError>;
}

pub struct AddressResolver<S, G> {
    search: S,
    geocoder: G,
}

impl<S: PlaceSearch, G: ReverseGeocoder> AddressResolver<S, G> {
    pub fn new(search: S, geocoder: G) -> Self {
        Self { search, geocoder }
    }

    /// Resolve a selection into a normalized address string.
    #[instrument(level = "debug", skip_all, fields(title = %selection.title))]
    pub async fn resolve(&self, selection: &Selection) -> Result<String, ResolveError> {
        if selection.is_empty() {
            return Err(ResolveError::EmptySelection);
        }

        let coordinate = self
            .search
            .locate(selection)
            .await
            .map_err(|e| ResolveError::GeoLookup(e.to_string()))?
            .ok_or_else(|| ResolveError::GeoLookup("no placemark found".to_string()))?;
        debug!(
            latitude = coordinate.latitude,
            longitude = coordinate.longitude,
            "Located selection"
        );

        let placemark = match self.geocoder.reverse(coordinate).await {
            Ok(Some(placemark)) => placemark,
            Ok(None) => return Err(ResolveError::ReverseGeocode("Unexpected Error".to_string())),
            Err(e) => return Err(ResolveError::ReverseGeocode(e.to_string())),
        };

        let address = placemark.formatted_address();
        if address.is_empty() {
            return Err(ResolveError::ReverseGeocode(
                "placemark has no postal address".to_string(),
            ));
        }
        debug!(address = %address, "Resolved address");
        Ok(address)
    }
}
