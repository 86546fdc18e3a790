//! Realtime hub: open stream connections, their subscriptions, and the
//! fan-out from the event bus to each connection.
//!
//! ```text
//! EventBus ──relay──► broadcast ──► per-connection SSE stream (filtered)
//! ```
//!
//! Delivery is lossy: a connection that falls behind the broadcast buffer
//! skips the messages it missed.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde_json::json;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use uuid::Uuid;

use gasdesk_auth::{authorize_subscription, can_access_agency, SessionClaims};
use gasdesk_core::{DomainError, UserId};
use gasdesk_infra::StoreError;
use gasdesk_events::{Audience, Channel, EventBus, InMemoryEventBus, RealtimeMessage};

use crate::app::errors::ApiError;

#[derive(Debug, Clone)]
struct Connection {
    claims: SessionClaims,
    channels: HashSet<Channel>,
}

impl Connection {
    fn is_addressed_by(&self, audience: &Audience) -> bool {
        match audience {
            Audience::Channel(channel) => self.channels.contains(channel),
            Audience::AgencyChannel { channel, agency } => {
                self.channels.contains(channel) && can_access_agency(&self.claims, agency)
            }
            Audience::User(user) => &self.claims.sub == user,
            Audience::Agency(agency) => self.claims.agency_id.as_ref() == Some(agency),
            Audience::Everyone => true,
        }
    }
}

#[derive(Debug)]
pub struct RealtimeHub {
    tx: broadcast::Sender<RealtimeMessage>,
    connections: RwLock<HashMap<String, Connection>>,
}

impl RealtimeHub {
    pub fn new(buffer: usize) -> Self {
        let (tx, _rx) = broadcast::channel(buffer);
        Self {
            tx,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Forward every message published on `bus` into the hub.
    ///
    /// The relay runs on a blocking thread and exits when the bus is dropped.
    pub fn spawn_relay(&self, bus: &InMemoryEventBus<RealtimeMessage>) {
        let subscription = bus.subscribe();
        let tx = self.tx.clone();
        tokio::task::spawn_blocking(move || {
            while let Ok(message) = subscription.recv() {
                // No receivers just means no open connections.
                let _ = tx.send(message);
            }
            tracing::debug!("realtime relay stopped");
        });
    }

    /// Register a connection and return its id plus a receiver positioned
    /// after every message already sent.
    fn open(self: &Arc<Self>, claims: SessionClaims) -> (ConnectionGuard, broadcast::Receiver<RealtimeMessage>) {
        let id = Uuid::now_v7().to_string();
        let rx = self.tx.subscribe();
        if let Ok(mut conns) = self.connections.write() {
            conns.insert(
                id.clone(),
                Connection {
                    claims,
                    channels: HashSet::new(),
                },
            );
        }
        tracing::info!(connection_id = %id, "realtime connection opened");
        (
            ConnectionGuard {
                hub: Arc::clone(self),
                id,
            },
            rx,
        )
    }

    /// Join `channel` on connection `id` on behalf of `caller`.
    pub fn subscribe(&self, id: &str, caller: &SessionClaims, channel: Channel) -> Result<(), ApiError> {
        let mut conns = self
            .connections
            .write()
            .map_err(|_| ApiError::Store(StoreError::Poisoned))?;
        let conn = conns
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found("Connection not found"))?;

        if conn.claims.sub != caller.sub {
            return Err(DomainError::forbidden("Connection belongs to another session").into());
        }
        authorize_subscription(&conn.claims, &channel)?;

        tracing::info!(connection_id = %id, channel = %channel, "subscribed");
        conn.channels.insert(channel);
        Ok(())
    }

    fn is_addressed(&self, id: &str, message: &RealtimeMessage) -> bool {
        let Ok(conns) = self.connections.read() else {
            return false;
        };
        match conns.get(id) {
            Some(conn) => message.audiences.iter().any(|a| conn.is_addressed_by(a)),
            None => false,
        }
    }

    fn close(&self, id: &str) {
        if let Ok(mut conns) = self.connections.write() {
            conns.remove(id);
        }
        tracing::info!(connection_id = %id, "realtime connection closed");
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Open connections authenticated as `user`.
    pub fn connections_of(&self, user: &UserId) -> usize {
        self.connections
            .read()
            .map(|c| c.values().filter(|conn| &conn.claims.sub == user).count())
            .unwrap_or(0)
    }
}

/// Removes the connection from the hub when the stream is dropped.
#[derive(Debug)]
struct ConnectionGuard {
    hub: Arc<RealtimeHub>,
    id: String,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.hub.close(&self.id);
    }
}

/// SSE stream for one connection: a `connect` frame carrying the connection
/// id, then every message addressed to it.
pub fn connection_stream(
    hub: Arc<RealtimeHub>,
    claims: SessionClaims,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (guard, rx) = hub.open(claims);

    let connect = SseEvent::default()
        .event("connect")
        .data(json!({ "connectionId": guard.id }).to_string());

    let live = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if guard.hub.is_addressed(&guard.id, &m) => to_sse(&m).map(Ok),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(connection_id = %guard.id, error = %e, "realtime connection lagged");
            None
        }
    });

    let stream = tokio_stream::once(Ok(connect)).chain(live);
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn to_sse(message: &RealtimeMessage) -> Option<SseEvent> {
    match SseEvent::default()
        .event(message.event.as_str())
        .json_data(&message.envelope)
    {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(event = %message.event, error = %e, "failed to encode realtime message");
            None
        }
    }
}
