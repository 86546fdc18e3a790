//! Socket connection manager.
//!
//! Owns one realtime connection for one session:
//!
//! ```text
//! connect() ─► Transport::open ─► auto-subscribe by role ─► reader task
//!                                                            │ stream ends
//!                                                            ▼
//!                                              reconnect with backoff (bounded)
//! ```
//!
//! Listeners are plain callbacks keyed by event name. They run on the reader
//! task, in the order the transport delivers events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use gasdesk_core::AgencyId;
use gasdesk_events::{Channel, EventName, RealtimeEnvelope, SubscribeFrame};

use crate::config::ReconnectPolicy;
use crate::credentials::Credentials;
use crate::transport::{Connection, Transport, TransportError};

/// Handle returned by [`SocketManager::on`], used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&RealtimeEnvelope) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub connection_id: String,
}

#[derive(Default)]
struct ConnState {
    connection_id: Option<String>,
    reader: Option<JoinHandle<()>>,
    /// Channels joined explicitly; replayed after every reconnect.
    extra: Vec<Channel>,
}

struct Inner<T> {
    transport: T,
    credentials: Credentials,
    policy: ReconnectPolicy,
    listeners: Mutex<HashMap<EventName, Vec<(ListenerId, Listener)>>>,
    state: Mutex<ConnState>,
    /// Held across connection setup so overlapping `connect` calls share one.
    setup: AsyncMutex<()>,
    next_listener: AtomicU64,
}

pub struct SocketManager<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> SocketManager<T> {
    pub fn new(transport: T, credentials: Credentials, policy: ReconnectPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                credentials,
                policy,
                listeners: Mutex::new(HashMap::new()),
                state: Mutex::new(ConnState::default()),
                setup: AsyncMutex::new(()),
                next_listener: AtomicU64::new(1),
            }),
        }
    }

    /// Connect, or return the live connection. Concurrent callers wait for
    /// the first one and get its connection.
    ///
    /// `None` on failure; `connect_error` listeners have been told why.
    pub async fn connect(&self) -> Option<ConnectionInfo> {
        let _setup = self.inner.setup.lock().await;
        if let Some(current) = self.inner.current() {
            return Some(current);
        }
        if self.inner.reader_running() {
            // Reconnection in progress.
            return None;
        }

        match self.inner.establish().await {
            Ok(conn) => {
                let info = ConnectionInfo {
                    connection_id: conn.connection_id.clone(),
                };
                let reader = tokio::spawn(read_loop(Arc::clone(&self.inner), conn));
                if let Ok(mut state) = self.inner.state.lock() {
                    if let Some(stale) = state.reader.replace(reader) {
                        stale.abort();
                    }
                }
                Some(info)
            }
            Err(e) => {
                tracing::error!(error = %e, "realtime connection failed");
                self.inner.notify_error(&e);
                None
            }
        }
    }

    pub fn disconnect(&self) {
        self.inner.close();
    }

    /// Drop the connection when `event` arrives (a force-logout aimed at
    /// this session). Registered like any other listener.
    pub fn disconnect_on(&self, event: EventName) -> ListenerId {
        let inner: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        self.on(event, move |_| {
            if let Some(inner) = inner.upgrade() {
                tracing::info!(event = %event, "closing realtime connection");
                inner.close();
            }
        })
    }

    pub fn is_connected(&self) -> bool {
        self.inner.current().is_some()
    }

    pub fn connection(&self) -> Option<ConnectionInfo> {
        self.inner.current()
    }

    pub fn on<F>(&self, event: EventName, listener: F) -> ListenerId
    where
        F: Fn(&RealtimeEnvelope) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners
                .entry(event)
                .or_default()
                .push((id, Arc::new(listener)));
        }
        id
    }

    pub fn off(&self, event: EventName, id: ListenerId) {
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            if let Some(list) = listeners.get_mut(&event) {
                list.retain(|(listener_id, _)| *listener_id != id);
            }
        }
    }

    pub async fn subscribe_orders(&self) -> Result<(), TransportError> {
        self.subscribe(Channel::Orders).await
    }

    pub async fn subscribe_products(&self) -> Result<(), TransportError> {
        self.subscribe(Channel::Products).await
    }

    pub async fn subscribe_agencies(&self) -> Result<(), TransportError> {
        self.subscribe(Channel::Agencies).await
    }

    pub async fn subscribe_agents(&self) -> Result<(), TransportError> {
        self.subscribe(Channel::Agents).await
    }

    pub async fn subscribe_inventory(&self, agency_id: AgencyId) -> Result<(), TransportError> {
        self.subscribe(Channel::Inventory(agency_id)).await
    }

    async fn subscribe(&self, channel: Channel) -> Result<(), TransportError> {
        let connection_id = self
            .inner
            .current()
            .map(|c| c.connection_id)
            .ok_or(TransportError::NotConnected)?;
        self.inner.emit(&connection_id, &channel).await?;
        if let Ok(mut state) = self.inner.state.lock() {
            if !state.extra.contains(&channel) {
                state.extra.push(channel);
            }
        }
        Ok(())
    }
}

impl<T: Transport> Drop for SocketManager<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<T: Transport> Inner<T> {
    fn current(&self) -> Option<ConnectionInfo> {
        let state = self.state.lock().ok()?;
        state.connection_id.clone().map(|connection_id| ConnectionInfo { connection_id })
    }

    fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(reader) = state.reader.take() {
                reader.abort();
            }
            if let Some(id) = state.connection_id.take() {
                tracing::info!(connection_id = %id, "realtime connection closed");
            }
        }
    }

    fn reader_running(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.reader.as_ref().is_some_and(|r| !r.is_finished()))
            .unwrap_or(false)
    }

    /// Open a stream, join the role's channels plus any explicit ones, and
    /// announce `connect`.
    async fn establish(&self) -> Result<Connection, TransportError> {
        let conn = self.transport.open(&self.credentials.token).await?;
        let id = conn.connection_id.clone();

        let mut channels = self
            .credentials
            .role
            .default_channels(self.credentials.agency_id.as_ref());
        let extra = self.state.lock().map(|s| s.extra.clone()).unwrap_or_default();
        for channel in extra {
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }
        for channel in &channels {
            if let Err(e) = self.emit(&id, channel).await {
                tracing::warn!(connection_id = %id, channel = %channel, error = %e, "subscribe failed");
            }
        }

        if let Ok(mut state) = self.state.lock() {
            state.connection_id = Some(id.clone());
        }
        tracing::info!(connection_id = %id, role = %self.credentials.role, "realtime connected");
        self.dispatch(
            EventName::Connect,
            &RealtimeEnvelope::new(EventName::Connect, json!({ "connectionId": id })),
        );
        Ok(conn)
    }

    async fn emit(&self, connection_id: &str, channel: &Channel) -> Result<(), TransportError> {
        self.transport
            .emit(&self.credentials.token, connection_id, &SubscribeFrame::from(channel))
            .await
    }

    fn dispatch(&self, event: EventName, envelope: &RealtimeEnvelope) {
        // Copy out so listeners may call on/off.
        let listeners: Vec<Listener> = match self.listeners.lock() {
            Ok(map) => map
                .get(&event)
                .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(envelope);
        }
    }

    fn notify_error(&self, error: &TransportError) {
        self.dispatch(
            EventName::ConnectError,
            &RealtimeEnvelope::new(EventName::ConnectError, json!({ "message": error.to_string() })),
        );
    }

    fn mark_disconnected(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.connection_id = None;
        }
    }

    /// Bounded retry after a drop. `None` once every attempt has failed.
    async fn reconnect(&self) -> Option<Connection> {
        for attempt in 0..self.policy.max_attempts {
            let delay = self.policy.delay_for(attempt);
            tracing::info!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "reconnecting");
            tokio::time::sleep(delay).await;

            match self.establish().await {
                Ok(conn) => return Some(conn),
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "reconnect failed");
                    self.notify_error(&e);
                }
            }
        }
        tracing::error!(
            attempts = self.policy.max_attempts,
            "giving up on the realtime connection"
        );
        None
    }
}

async fn read_loop<T: Transport>(inner: Arc<Inner<T>>, mut conn: Connection) {
    loop {
        while let Some(message) = conn.messages.recv().await {
            inner.dispatch(message.event, &message.envelope);
        }
        tracing::warn!(connection_id = %conn.connection_id, "realtime connection lost");
        inner.mark_disconnected();

        match inner.reconnect().await {
            Some(next) => conn = next,
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use gasdesk_auth::Role;
    use gasdesk_core::UserId;

    use crate::transport::InboundMessage;

    /// Scripted transport: each `open` pops the next outcome.
    #[derive(Default)]
    struct MockTransport {
        opens: Mutex<VecDeque<Result<(String, mpsc::Receiver<InboundMessage>), String>>>,
        emitted: Mutex<Vec<(String, SubscribeFrame)>>,
        open_calls: AtomicUsize,
    }

    impl MockTransport {
        fn script_ok(&self, id: &str) -> mpsc::Sender<InboundMessage> {
            let (tx, rx) = mpsc::channel(16);
            self.opens.lock().unwrap().push_back(Ok((id.to_string(), rx)));
            tx
        }

        fn script_err(&self) {
            self.opens.lock().unwrap().push_back(Err("refused".to_string()));
        }

        fn emitted_events(&self) -> Vec<(String, String)> {
            self.emitted
                .lock()
                .unwrap()
                .iter()
                .map(|(id, f)| (id.clone(), f.event.clone()))
                .collect()
        }
    }

    #[async_trait]
    impl Transport for Arc<MockTransport> {
        async fn open(&self, _token: &str) -> Result<Connection, TransportError> {
            self.open_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.opens.lock().unwrap().pop_front();
            match next {
                Some(Ok((id, rx))) => Ok(Connection::new(id, rx)),
                Some(Err(message)) => Err(TransportError::Rejected { status: 503, message }),
                None => Err(TransportError::NoConnectFrame),
            }
        }

        async fn emit(&self, _token: &str, connection_id: &str, frame: &SubscribeFrame) -> Result<(), TransportError> {
            self.emitted
                .lock()
                .unwrap()
                .push((connection_id.to_string(), frame.clone()));
            Ok(())
        }
    }

    fn credentials(role: Role, agency: Option<&str>) -> Credentials {
        Credentials::new("token", UserId::from("u1"), role, agency.map(AgencyId::from))
    }

    fn manager(transport: &Arc<MockTransport>, creds: Credentials) -> SocketManager<Arc<MockTransport>> {
        SocketManager::new(Arc::clone(transport), creds, ReconnectPolicy::default())
    }

    fn order_created() -> InboundMessage {
        InboundMessage {
            event: EventName::OrderCreated,
            envelope: RealtimeEnvelope::new(EventName::OrderCreated, json!({"id": "o1"})),
        }
    }

    #[tokio::test]
    async fn admin_auto_subscribes_to_every_feed() {
        let transport = Arc::new(MockTransport::default());
        let _tx = transport.script_ok("c1");
        let socket = manager(&transport, credentials(Role::Admin, None));

        let info = socket.connect().await.unwrap();
        assert_eq!(info.connection_id, "c1");
        assert!(socket.is_connected());

        let events: Vec<String> = transport.emitted_events().into_iter().map(|(_, e)| e).collect();
        assert_eq!(
            events,
            vec!["subscribe-orders", "subscribe-products", "subscribe-agencies", "subscribe-agents"]
        );
    }

    #[tokio::test]
    async fn agency_owner_joins_orders_and_own_inventory() {
        let transport = Arc::new(MockTransport::default());
        let _tx = transport.script_ok("c1");
        let socket = manager(&transport, credentials(Role::AgencyOwner, Some("a1")));
        socket.connect().await.unwrap();

        let emitted = transport.emitted.lock().unwrap().clone();
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[1].1.event, "subscribe-inventory");
        assert_eq!(emitted[1].1.data.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn connect_is_idempotent_while_connected() {
        let transport = Arc::new(MockTransport::default());
        let _tx = transport.script_ok("c1");
        let socket = manager(&transport, credentials(Role::Customer, None));

        socket.connect().await.unwrap();
        socket.connect().await.unwrap();
        assert_eq!(transport.open_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn overlapping_connects_share_one_connection() {
        let transport = Arc::new(MockTransport::default());
        let tx = transport.script_ok("c1");
        let _spare = transport.script_ok("c2");
        let socket = manager(&transport, credentials(Role::Admin, None));

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        socket.on(EventName::OrderCreated, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let (first, second) = tokio::join!(socket.connect(), socket.connect());
        assert_eq!(first.unwrap().connection_id, "c1");
        assert_eq!(second.unwrap().connection_id, "c1");
        assert_eq!(transport.open_calls.load(Ordering::SeqCst), 1);

        tx.send(order_created()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        socket.disconnect();
        // The reader is gone, so the stream's receiver has been dropped.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(tx.send(order_created()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_logout_event_closes_the_connection() {
        let transport = Arc::new(MockTransport::default());
        let tx = transport.script_ok("c1");
        let socket = manager(&transport, credentials(Role::Agent, Some("a1")));
        socket.disconnect_on(EventName::UserForceLogout);
        socket.connect().await.unwrap();

        tx.send(InboundMessage {
            event: EventName::UserForceLogout,
            envelope: RealtimeEnvelope::new(EventName::UserForceLogout, json!({"userId": "u1"})),
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!socket.is_connected());
        assert!(tx.send(order_created()).await.is_err());
    }

    #[tokio::test]
    async fn failed_connect_notifies_connect_error() {
        let transport = Arc::new(MockTransport::default());
        transport.script_err();
        let socket = manager(&transport, credentials(Role::Customer, None));

        let errors = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&errors);
        socket.on(EventName::ConnectError, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(socket.connect().await.is_none());
        assert!(!socket.is_connected());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn listeners_receive_events_until_removed() {
        let transport = Arc::new(MockTransport::default());
        let tx = transport.script_ok("c1");
        let socket = manager(&transport, credentials(Role::Admin, None));

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let id = socket.on(EventName::OrderCreated, move |env| {
            let _ = seen_tx.send(env.data["id"].clone());
        });
        socket.connect().await.unwrap();

        tx.send(order_created()).await.unwrap();
        assert_eq!(seen_rx.recv().await.unwrap(), json!("o1"));

        socket.off(EventName::OrderCreated, id);
        tx.send(order_created()).await.unwrap();
        // The listener (and its sender) is gone once removed.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seen_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn explicit_subscriptions_need_a_connection() {
        let transport = Arc::new(MockTransport::default());
        let socket = manager(&transport, credentials(Role::Admin, None));
        assert!(matches!(
            socket.subscribe_agents().await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_stream_reconnects_and_resubscribes() {
        let transport = Arc::new(MockTransport::default());
        let first = transport.script_ok("c1");
        transport.script_err();
        let _second = transport.script_ok("c2");
        let socket = manager(&transport, credentials(Role::Customer, None));

        let (connected_tx, mut connected_rx) = mpsc::unbounded_channel();
        socket.on(EventName::Connect, move |env| {
            let _ = connected_tx.send(env.data["connectionId"].clone());
        });

        socket.connect().await.unwrap();
        socket.subscribe_products().await.unwrap();
        assert_eq!(connected_rx.recv().await.unwrap(), json!("c1"));

        drop(first);
        assert_eq!(connected_rx.recv().await.unwrap(), json!("c2"));
        assert_eq!(socket.connection().unwrap().connection_id, "c2");

        let on_c2: Vec<String> = transport
            .emitted_events()
            .into_iter()
            .filter(|(id, _)| id == "c2")
            .map(|(_, e)| e)
            .collect();
        assert_eq!(on_c2, vec!["subscribe-orders", "subscribe-products"]);
        assert_eq!(transport.open_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_attempt_budget() {
        let transport = Arc::new(MockTransport::default());
        let first = transport.script_ok("c1");
        let socket = manager(&transport, credentials(Role::Customer, None));
        socket.connect().await.unwrap();

        drop(first);
        // 1 + 2 + 4 + 5 + 5 seconds of backoff, then the reader stops.
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(!socket.is_connected());
        assert_eq!(transport.open_calls.load(Ordering::SeqCst), 1 + 5);
        assert!(socket.connect().await.is_none());
    }
}
