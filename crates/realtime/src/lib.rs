//! `gasdesk-realtime`: the client side of live updates.
//!
//! A [`SocketManager`] keeps one authenticated event stream open and
//! subscribed to the channels the session's role needs. A [`Reconciler`]
//! folds the events it receives (plus a REST snapshot and local edits) into a
//! [`LiveState`] the UI renders from.

pub mod config;
pub mod credentials;
pub mod push;
pub mod reconciler;
pub mod rest;
pub mod socket;
pub mod sse;
pub mod toast;
pub mod transport;

pub use config::{ClientConfig, ClientConfigError, ReconnectPolicy};
pub use credentials::{Credentials, InMemorySessionStore, SessionStore};
pub use push::{route_click, ClickOutcome, Notification, NotificationAction, PushMessage, WindowRef};
pub use reconciler::{
    Collection, LiveCollection, LiveEvent, LiveRecord, LiveState, Reconciler, ReconcilerHandle, Seed,
    SessionSignal,
};
pub use rest::{RestClient, RestError};
pub use socket::{ConnectionInfo, ListenerId, SocketManager};
pub use sse::{SseDecoder, SseFrame};
pub use toast::{toast_for, Toast, ToastVariant};
pub use transport::{Connection, HttpTransport, InboundMessage, Transport, TransportError};
