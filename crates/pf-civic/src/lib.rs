//! Polling place lookup against the Google Civic Information API.
//!
//! [`AddressResolver`] turns a place suggestion into a mailing address,
//! [`Client`] fetches voter info for that address, and [`Session`] runs both
//! for a user interaction and publishes the result as a [`PollingView`].

mod api_interfaces;
mod api_key;
pub mod client;
pub mod constants;
pub mod error;
pub mod nominatim;
pub mod resolver;
pub mod session;
mod util;
pub mod voter_info;

pub use api_key::{ApiKey, ApiKeyError};
pub use client::{Client, EndpointConfig};
pub use error::{ApiErrorPayload, GeocodeError, ResolveError, VoterInfoError};
pub use nominatim::NominatimGeocoder;
pub use resolver::{AddressResolver, Coordinate, PlaceSearch, Placemark, ReverseGeocoder, Selection};
pub use session::{Alert, PollingView, Session, SessionError};
pub use util::default_http_client;
pub use voter_info::{Address, Election, PollingLocation, VoterInfoQuery, VoterInfoResponse};
