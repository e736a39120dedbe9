use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    api_interfaces::nominatim as raw,
    client::{parse_endpoint, EndpointConfigError},
    constants::DEFAULT_GEOCODER_URL,
    error::GeocodeError,
    resolver::{Coordinate, PlaceSearch, Placemark, ReverseGeocoder, Selection},
};

/// Geocoder backed by a Nominatim-compatible HTTP service.
#[derive(Clone, Debug)]
pub struct NominatimGeocoder {
    http_client: Client,
    base_url: Url,
}

impl NominatimGeocoder {
    /// Use a custom base URL. If not provided, the public OpenStreetMap instance will be used.
    pub fn new(http_client: Client, base_url: Option<&str>) -> Result<Self, EndpointConfigError> {
        let mut base_url = parse_endpoint("geocoder", base_url.unwrap_or(DEFAULT_GEOCODER_URL))?;
        // Url::join would otherwise replace the last path segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http_client,
            base_url,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, GeocodeError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| GeocodeError::BuildError(e.to_string()))?;
        debug!(url = %url, "Sending geocoding request");
        let response = self.http_client.get(url).query(params).send().await?;
        if !response.status().is_success() {
            return Err(GeocodeError::ResponseError(response.status()));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl PlaceSearch for NominatimGeocoder {
    async fn locate(&self, selection: &Selection) -> Result<Option<Coordinate>, GeocodeError> {
        let params = [
            ("q", selection.query_text()),
            ("format", "jsonv2".to_string()),
            ("limit", "1".to_string()),
        ];
        let results: Vec<raw::SearchResult> = self.get_json("search", &params).await?;
        results.first().map(Coordinate::try_from).transpose()
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<Placemark>, GeocodeError> {
        let params = [
            ("lat", coordinate.latitude.to_string()),
            ("lon", coordinate.longitude.to_string()),
            ("format", "jsonv2".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        match self.get_json("reverse", &params).await? {
            raw::ReverseResponse::Failure { error } => Err(GeocodeError::Provider(error)),
            raw::ReverseResponse::Place(place) => Ok(Some(Placemark::from(place))),
        }
    }
}

impl TryFrom<&raw::SearchResult> for Coordinate {
    type Error = GeocodeError;

    fn try_from(result: &raw::SearchResult) -> Result<Self, GeocodeError> {
        let parse = |value: &str| {
            value
                .parse::<f64>()
                .map_err(|e| GeocodeError::Provider(format!("invalid coordinate `{value}`: {e}")))
        };
        Ok(Self {
            latitude: parse(&result.lat)?,
            longitude: parse(&result.lon)?,
        })
    }
}

impl From<raw::Place> for Placemark {
    fn from(place: raw::Place) -> Self {
        let address = place.address;
        // Prefer the two-letter code (`US-CA` => `CA`) over the full state name.
        let state = address
            .iso_subdivision
            .as_deref()
            .and_then(|code| code.split_once('-'))
            .map(|(_, subdivision)| subdivision.to_string())
            .or(address.state);
        Self {
            name: place.name.filter(|name| !name.is_empty()),
            house_number: address.house_number,
            street: address.road,
            city: address
                .city
                .or(address.town)
                .or(address.village)
                .or(address.hamlet),
            state,
            postal_code: address.postcode,
            country: address.country,
        }
    }
}
