//! HTTP client side of the mesh: event delivery, restaurant probes, and
//! the two bootstrap calls.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reparto_mesh::{
    Event, EventTransport, Peer, PeerProbe, RestaurantQuery, TransportError,
};

use crate::wire::{HaveRestaurantResponse, PresentationBody};

/// HTTP client for talking to other mesh nodes.
pub struct HttpPeerClient {
    http: reqwest::Client,
}

impl HttpPeerClient {
    /// Build a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { http })
    }

    /// Fetch the initial peer's full peer list, excluding our own url.
    pub async fn fetch_peers(&self, base: &str, exclude: &str) -> anyhow::Result<Vec<Peer>> {
        let response = self
            .http
            .get(format!("{base}/peer/all"))
            .query(&[("excludes", exclude)])
            .send()
            .await
            .with_context(|| format!("fetching peers from {base}"))?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            anyhow::bail!("{base} answered {status} to the peer list request");
        }
        response.json().await.context("decoding peer list")
    }

    /// Present ourselves to the initial peer.
    pub async fn present(&self, base: &str, body: &PresentationBody) -> anyhow::Result<()> {
        let response = self
            .http
            .post(format!("{base}/peer/present"))
            .json(body)
            .send()
            .await
            .with_context(|| format!("presenting to {base}"))?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            anyhow::bail!("{base} answered {status} to the presentation");
        }
        Ok(())
    }
}

#[async_trait]
impl EventTransport for HttpPeerClient {
    async fn deliver(&self, url: &str, event: &Event) -> Result<(), TransportError> {
        let response = self
            .http
            .post(format!("{url}/peer/event"))
            .json(event)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        // Exactly 200 counts as delivered; anything else triggers a
        // reroute of the branch.
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TransportError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PeerProbe for HttpPeerClient {
    async fn has_restaurant(
        &self,
        url: &str,
        query: &RestaurantQuery,
    ) -> Result<bool, TransportError> {
        let response = self
            .http
            .get(format!("{url}/peer/restaurant/have"))
            .query(query)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TransportError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body: HaveRestaurantResponse =
            response
                .json()
                .await
                .map_err(|e| TransportError::Unreachable {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        Ok(body.result)
    }
}
