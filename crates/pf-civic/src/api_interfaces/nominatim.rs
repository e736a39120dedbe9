use serde::Deserialize;

/// Raw search hit from `/search?format=jsonv2`. Coordinates arrive as strings.
#[derive(Deserialize)]
pub struct SearchResult {
    pub lat: String,
    pub lon: String,
}

/// Raw reverse geocoding response from `/reverse?format=jsonv2`.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum ReverseResponse {
    Failure { error: String },
    Place(Place),
}

#[derive(Deserialize)]
pub struct Place {
    pub name: Option<String>,
    #[serde(default)]
    pub address: PlaceAddress,
}

/// Raw address details; `addressdetails=1` fills whichever keys apply.
#[derive(Deserialize, Default)]
pub struct PlaceAddress {
    pub house_number: Option<String>,
    pub road: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub hamlet: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "ISO3166-2-lvl4")]
    pub iso_subdivision: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
}
