//! Lookup pipeline for one user interaction.
//!
//! A [`Session`] resolves a selection, fetches polling data and publishes the
//! outcome as a [`PollingView`] on a watch channel. Starting a lookup cancels
//! the one in flight, and a stale lookup can never overwrite a newer view.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};

use futures::future::{AbortHandle, AbortRegistration, Abortable};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    client::Client,
    error::VoterInfoError,
    resolver::{AddressResolver, PlaceSearch, ReverseGeocoder, Selection},
    voter_info::PollingLocation,
};

/// What a display layer renders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PollingView {
    /// The canonical search term.
    pub address: String,
    pub polling_locations: Vec<PollingLocation>,
    pub is_refreshing: bool,
    pub alert: Option<Alert>,
}

/// A failure surfaced to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub message: String,
    pub retryable: bool,
}

impl From<&VoterInfoError> for Alert {
    fn from(error: &VoterInfoError) -> Self {
        Self {
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("the lookup was superseded by a newer one")]
    Superseded,
    #[error(transparent)]
    VoterInfo(#[from] VoterInfoError),
}

pub struct Session<S, G> {
    inner: Arc<Inner<S, G>>,
}

struct Inner<S, G> {
    resolver: AddressResolver<S, G>,
    client: Client,
    view: watch::Sender<PollingView>,
    generation: AtomicU64,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl<S, G> Clone for Session<S, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: PlaceSearch, G: ReverseGeocoder> Session<S, G> {
    pub fn new(resolver: AddressResolver<S, G>, client: Client) -> Self {
        let (view, _) = watch::channel(PollingView::default());
        Self {
            inner: Arc::new(Inner {
                resolver,
                client,
                view,
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollingView> {
        self.inner.view.subscribe()
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> PollingView {
        self.inner.view.borrow().clone()
    }

    /// Resolve a selection and look up polling locations for it.
    ///
    /// A resolver failure is not fatal: the address is left as it was and the
    /// selection's own text is queried instead.
    pub async fn select(&self, selection: &Selection) -> Result<(), SessionError> {
        let (generation, registration) = self.inner.begin();
        let inner = &self.inner;
        let pipeline = async move {
            let address = match inner.resolver.resolve(selection).await {
                Ok(address) => {
                    inner.publish(generation, |view| view.address = address.clone());
                    address
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        "No address suggestion available, querying the selection text"
                    );
                    selection.query_text()
                }
            };
            inner.fetch(generation, &address).await
        };
        run(pipeline, registration).await
    }

    /// Look up polling locations for a typed address.
    pub async fn search(&self, address: &str) -> Result<(), SessionError> {
        let (generation, registration) = self.inner.begin();
        let inner = &self.inner;
        let pipeline = async move {
            inner.publish(generation, |view| view.address = address.to_string());
            inner.fetch(generation, address).await
        };
        run(pipeline, registration).await
    }
}

async fn run<F>(pipeline: F, registration: AbortRegistration) -> Result<(), SessionError>
where
    F: std::future::Future<Output = Result<(), SessionError>>,
{
    match Abortable::new(pipeline, registration).await {
        Ok(result) => result,
        Err(_) => {
            debug!("Lookup aborted by a newer one");
            Err(SessionError::Superseded)
        }
    }
}

impl<S, G> Inner<S, G> {
    /// Claim a new generation and abort the lookup in flight.
    fn begin(&self) -> (u64, AbortRegistration) {
        let mut generation = 0;
        // Bumped under the view lock so a racing publish either lands first or is rejected.
        self.view.send_if_modified(|_| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            false
        });
        let (handle, registration) = AbortHandle::new_pair();
        let previous = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        (generation, registration)
    }

    /// Apply `update` only if `generation` is still the latest. Returns whether it applied.
    fn publish(&self, generation: u64, update: impl FnOnce(&mut PollingView)) -> bool {
        self.view.send_if_modified(|view| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            update(view);
            true
        })
    }

    async fn fetch(&self, generation: u64, address: &str) -> Result<(), SessionError> {
        self.publish(generation, |view| view.is_refreshing = true);
        let result = self.client.fetch_voter_info(address).await;
        match result {
            Ok(response) => {
                let applied = self.publish(generation, |view| {
                    view.polling_locations = response.polling_locations;
                    view.is_refreshing = false;
                    view.alert = None;
                });
                if applied {
                    Ok(())
                } else {
                    Err(SessionError::Superseded)
                }
            }
            Err(error) => {
                let alert = Alert::from(&error);
                let applied = self.publish(generation, |view| {
                    view.is_refreshing = false;
                    view.alert = Some(alert);
                });
                if applied {
                    Err(error.into())
                } else {
                    Err(SessionError::Superseded)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        client::EndpointConfig,
        resolver::tests::{amphitheatre, FakeGeocoder, FakeSearch, MOUNTAIN_VIEW},
        ApiKey,
    };
    use httpmock::prelude::*;
    use serde_json::{json, Value};

    const VOTER_INFO_PATH: &str = "/civicinfo/v2/voterinfo";
    const RESOLVED_ADDRESS: &str = "1600 Amphitheatre Parkway, Mountain View, CA 94043";

    fn voter_info_body(lines: &[&str]) -> Value {
        let locations = lines
            .iter()
            .map(|line1| {
                json!({
                    "address": {
                        "locationName": "",
                        "line1": line1,
                        "city": "Mountain View",
                        "state": "CA",
                        "zip": "94043"
                    },
                    "notes": "",
                    "pollingHours": "7am-8pm"
                })
            })
            .collect::<Vec<_>>();
        json!({
            "election": {
                "id": "2000",
                "name": "VIP Test Election",
                "electionDay": "2026-11-03",
                "ocdDivisionId": "ocd-division/country:us"
            },
            "pollingLocations": locations
        })
    }

    fn session(server: &MockServer, geocoder: FakeGeocoder) -> Session<FakeSearch, FakeGeocoder> {
        let search = FakeSearch {
            coordinate: Some(MOUNTAIN_VIEW),
            ..Default::default()
        };
        let endpoints = EndpointConfig {
            voter_info: Some(server.url(VOTER_INFO_PATH)),
        };
        let client = Client::new(
            reqwest::Client::new(),
            Some(endpoints),
            ApiKey::from_raw("fake-api-key").unwrap(),
        )
        .unwrap();
        Session::new(AddressResolver::new(search, geocoder), client)
    }

    fn lines(view: &PollingView) -> Vec<&str> {
        view.polling_locations
            .iter()
            .map(|location| location.address.line1.as_str())
            .collect()
    }

    #[tokio::test]
    async fn select_success_updates_view() {
        // Arrange
        let server = MockServer::start_async().await;
        let voter_info_mock = server
            .mock_async(|when, then| {
                when.path(VOTER_INFO_PATH)
                    .query_param("address", RESOLVED_ADDRESS);
                then.status(200)
                    .json_body(voter_info_body(&["500 Castro St", "201 S Rengstorff Ave"]));
            })
            .await;
        let geocoder = FakeGeocoder {
            placemark: Some(amphitheatre()),
            ..Default::default()
        };
        let session = session(&server, geocoder);
        let mut views = session.subscribe();

        // Act
        let result = session
            .select(&Selection::new("1600 Amphitheatre Pkwy", "Mountain View, CA"))
            .await;

        // Assert
        assert!(result.is_ok(), "Lookup failed: {:?}", result.unwrap_err());
        assert!(views.has_changed().unwrap());
        let view = views.borrow_and_update().clone();
        assert_eq!(view.address, RESOLVED_ADDRESS);
        assert_eq!(lines(&view), vec!["500 Castro St", "201 S Rengstorff Ave"]);
        assert!(!view.is_refreshing);
        assert_eq!(view.alert, None);
        voter_info_mock.assert();
    }

    #[tokio::test]
    async fn select_reverse_failure_queries_selection_text() {
        // Arrange
        let server = MockServer::start_async().await;
        let voter_info_mock = server
            .mock_async(|when, then| {
                when.path(VOTER_INFO_PATH)
                    .query_param("address", "500 Castro St, Mountain View, CA");
                then.status(200).json_body(voter_info_body(&["500 Castro St"]));
            })
            .await;
        let session = session(&server, FakeGeocoder::default());

        // Act
        let result = session
            .select(&Selection::new("500 Castro St", "Mountain View, CA"))
            .await;

        // Assert
        assert!(result.is_ok());
        let view = session.view();
        assert_eq!(view.address, "");
        assert_eq!(lines(&view), vec!["500 Castro St"]);
        voter_info_mock.assert();
    }

    #[tokio::test]
    async fn search_error_keeps_previous_locations() {
        // Arrange
        let server = MockServer::start_async().await;
        let ok_mock = server
            .mock_async(|when, then| {
                when.path(VOTER_INFO_PATH)
                    .query_param("address", "500 Castro St");
                then.status(200)
                    .json_body(voter_info_body(&["500 Castro St", "201 S Rengstorff Ave"]));
            })
            .await;
        let forbidden_mock = server
            .mock_async(|when, then| {
                when.path(VOTER_INFO_PATH)
                    .query_param("address", "1 Forbidden Way");
                then.status(403)
                    .json_body(json!({"code": 403, "message": "unauthorized"}));
            })
            .await;
        let session = session(&server, FakeGeocoder::default());
        session.search("500 Castro St").await.unwrap();

        // Act
        let result = session.search("1 Forbidden Way").await;

        // Assert
        assert!(matches!(
            result.unwrap_err(),
            SessionError::VoterInfo(VoterInfoError::Unauthorized)
        ));
        let view = session.view();
        assert_eq!(lines(&view), vec!["500 Castro St", "201 S Rengstorff Ave"]);
        assert!(!view.is_refreshing);
        assert_eq!(
            view.alert,
            Some(Alert {
                message: VoterInfoError::Unauthorized.to_string(),
                retryable: false,
            })
        );
        ok_mock.assert();
        forbidden_mock.assert();
    }

    #[tokio::test]
    async fn search_success_clears_alert() {
        // Arrange
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.path(VOTER_INFO_PATH)
                    .query_param("address", "1 Broken Rd");
                then.status(503);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.path(VOTER_INFO_PATH)
                    .query_param("address", "500 Castro St");
                then.status(200).json_body(voter_info_body(&["500 Castro St"]));
            })
            .await;
        let session = session(&server, FakeGeocoder::default());
        assert!(session.search("1 Broken Rd").await.is_err());
        assert!(session.view().alert.unwrap().retryable);

        // Act
        let result = session.search("500 Castro St").await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(session.view().alert, None);
    }

    #[tokio::test]
    async fn newer_search_supersedes_in_flight() {
        // Arrange
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.path(VOTER_INFO_PATH)
                    .query_param("address", "100 Slow St");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(voter_info_body(&["100 Slow St"]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.path(VOTER_INFO_PATH)
                    .query_param("address", "200 Fast St");
                then.status(200).json_body(voter_info_body(&["200 Fast St"]));
            })
            .await;
        let session = session(&server, FakeGeocoder::default());
        let slow_session = session.clone();
        let slow = tokio::spawn(async move { slow_session.search("100 Slow St").await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Act
        let fast = session.search("200 Fast St").await;
        let slow = slow.await.unwrap();

        // Assert
        assert!(fast.is_ok());
        assert!(matches!(slow, Err(SessionError::Superseded)));
        let view = session.view();
        assert_eq!(view.address, "200 Fast St");
        assert_eq!(lines(&view), vec!["200 Fast St"]);
        assert!(!view.is_refreshing);
    }

    #[test]
    fn stale_publish_is_rejected() {
        let server = MockServer::start();
        let session = session(&server, FakeGeocoder::default());
        let (stale, _) = session.inner.begin();
        let (current, _) = session.inner.begin();

        assert!(!session
            .inner
            .publish(stale, |view| view.address = "stale".to_string()));
        assert!(session
            .inner
            .publish(current, |view| view.address = "current".to_string()));
        assert_eq!(session.view().address, "current");
    }
}
