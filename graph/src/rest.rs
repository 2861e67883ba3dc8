// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! HTTP/JSON client of the resource graph API server.
//!
//! Resources travel in an envelope keyed by their kind:
//!
//! ```text
//! POST /fqname-to-id      {"type": "virtual-network", "fq_name": ["d", "p", "net"]}
//! GET  /virtual-network/<uuid>
//! POST /virtual-networks  {"virtual-network": {...}}
//! PUT  /virtual-network/<uuid> {"virtual-network": {...}}
//! ```

use crate::{GraphError, ResourceGraph};
use id::Id;
use model::{FqName, Resource, Stored};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, trace};
use uuid::Uuid;

/// Default port of the API server.
pub const DEFAULT_API_PORT: u16 = 8082;
/// Default per request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct FqNameToId<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    fq_name: &'a FqName,
}

#[derive(Deserialize)]
struct IdReply {
    uuid: Uuid,
}

/// A [`ResourceGraph`] backed by the API server.
#[derive(Clone, Debug)]
pub struct RestGraph {
    client: Client,
    base: String,
}

impl RestGraph {
    /// Build a client for the API server at `host:port`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed (e.g. no TLS backend).
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self, GraphError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GraphError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base: format!("http://{host}:{port}"),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn envelope<R: Resource>(value: &R) -> Result<Value, GraphError> {
        let mut map = Map::new();
        map.insert(R::KIND.to_string(), serde_json::to_value(value)?);
        Ok(Value::Object(map))
    }

    fn open_envelope(kind: &'static str, mut body: Value) -> Result<Value, GraphError> {
        body.get_mut(kind)
            .map(Value::take)
            .ok_or_else(|| GraphError::Malformed(format!("response has no '{kind}' member")))
    }

    async fn check(response: Response, kind: &'static str, name: &str) -> Result<Response, GraphError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => GraphError::NotFound {
                kind,
                name: name.to_string(),
            },
            StatusCode::CONFLICT => GraphError::Conflict {
                kind,
                name: name.to_string(),
            },
            status => GraphError::from_status(status.as_u16(), message),
        })
    }
}

impl ResourceGraph for RestGraph {
    async fn locate<R: Resource>(&self, fq_name: &FqName) -> Result<Option<Stored<R>>, GraphError> {
        let url = format!("{}/fqname-to-id", self.base);
        trace!("POST {url} {} {fq_name}", R::KIND);
        let response = self
            .client
            .post(&url)
            .json(&FqNameToId {
                kind: R::KIND,
                fq_name,
            })
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("{} {fq_name} is absent", R::KIND);
            return Ok(None);
        }
        let reply: IdReply = Self::check(response, R::KIND, &fq_name.to_string())
            .await?
            .json()
            .await?;
        self.read(Id::<R>::from_raw(reply.uuid)).await.map(Some)
    }

    async fn read<R: Resource>(&self, id: Id<R>) -> Result<Stored<R>, GraphError> {
        let url = format!("{}/{}/{id}", self.base, R::KIND);
        trace!("GET {url}");
        let response = self.client.get(&url).send().await?;
        let body: Value = Self::check(response, R::KIND, &id.to_string())
            .await?
            .json()
            .await?;
        let value: R = serde_json::from_value(Self::open_envelope(R::KIND, body)?)?;
        Ok(Stored::new(id, value))
    }

    async fn create<R: Resource>(&self, value: &R) -> Result<Id<R>, GraphError> {
        let url = format!("{}/{}s", self.base, R::KIND);
        debug!("POST {url} {}", value.fq_name());
        let response = self
            .client
            .post(&url)
            .json(&Self::envelope(value)?)
            .send()
            .await?;
        let body: Value = Self::check(response, R::KIND, &value.fq_name().to_string())
            .await?
            .json()
            .await?;
        let reply: IdReply = serde_json::from_value(Self::open_envelope(R::KIND, body)?)?;
        Ok(Id::from_raw(reply.uuid))
    }

    async fn update<R: Resource>(&self, id: Id<R>, value: &R) -> Result<(), GraphError> {
        let url = format!("{}/{}/{id}", self.base, R::KIND);
        debug!("PUT {url} {}", value.fq_name());
        let response = self
            .client
            .put(&url)
            .json(&Self::envelope(value)?)
            .send()
            .await?;
        Self::check(response, R::KIND, &value.fq_name().to_string()).await?;
        Ok(())
    }
}
