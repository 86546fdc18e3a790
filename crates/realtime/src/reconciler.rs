//! Client-side reconciliation of live events into local state.
//!
//! One task owns the state. Socket listeners, REST loaders and local UI
//! mutations all send [`LiveEvent`]s to it; it applies them in arrival order
//! and publishes the result:
//!
//! ```text
//! SocketManager ──┐
//! RestClient ─────┼─► mpsc ─► Reconciler ─► watch<LiveState>
//! UI mutations ───┘                       ├► broadcast<Toast>
//!                                         └► broadcast<SessionSignal>
//! ```
//!
//! Upserts merge shallowly and the last write wins; there are no versions.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::instrument;

use gasdesk_core::{AgencyId, Entity, ProductId};
use gasdesk_events::{EventName, RealtimeEnvelope};
use gasdesk_logistics::{Agency, Agent, InventoryItem, InventoryKey, Order, Product};
use gasdesk_pricing::{Coupon, PlatformCharge, TaxConfig};

use crate::credentials::SessionStore;
use crate::socket::{ListenerId, SocketManager};
use crate::toast::{toast_for, Toast};
use crate::transport::{InboundMessage, Transport};

/// Delay between a force logout and the redirect to the login page.
pub const LOGOUT_REDIRECT_DELAY: Duration = Duration::from_secs(2);
pub const LOGIN_PATH: &str = "/login";

/// A record kept in a [`LiveCollection`].
pub trait LiveRecord: Entity + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Key carried by a JSON payload; equals `id().to_string()` for the
    /// record it describes.
    fn key_of(payload: &JsonValue) -> Option<String> {
        payload.get("id").and_then(JsonValue::as_str).map(str::to_string)
    }
}

impl LiveRecord for Order {}
impl LiveRecord for Agent {}
impl LiveRecord for Agency {}
impl LiveRecord for Product {}
impl LiveRecord for Coupon {}

impl LiveRecord for InventoryItem {
    fn key_of(payload: &JsonValue) -> Option<String> {
        let agency = payload.get("agencyId").and_then(JsonValue::as_str)?;
        let product = payload.get("productId").and_then(JsonValue::as_str)?;
        Some(InventoryKey::new(AgencyId::from(agency), ProductId::from(product)).to_string())
    }
}

/// Ordered list of records, newest first, unique by key.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveCollection<T> {
    items: Vec<T>,
}

impl<T> Default for LiveCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: LiveRecord> LiveCollection<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id().to_string() == key)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id().to_string() == key)
    }

    /// Insert when absent, otherwise merge into the existing record.
    pub fn add(&mut self, payload: &JsonValue) -> Result<(), serde_json::Error> {
        let existing = T::key_of(payload).and_then(|key| self.position(&key));
        match existing {
            Some(index) => {
                self.items[index] = merge(&self.items[index], payload)?;
            }
            None => {
                let record: T = serde_json::from_value(payload.clone())?;
                self.items.insert(0, record);
            }
        }
        Ok(())
    }

    /// Merge into the record with `key`. Returns `false` when it is absent.
    pub fn update(&mut self, key: &str, partial: &JsonValue) -> Result<bool, serde_json::Error> {
        match self.position(key) {
            Some(index) => {
                self.items[index] = merge(&self.items[index], partial)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id().to_string() != key);
        self.items.len() != before
    }

    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
    }
}

/// `{...existing, ...partial}`.
fn merge<T: LiveRecord>(existing: &T, partial: &JsonValue) -> Result<T, serde_json::Error> {
    let mut base = serde_json::to_value(existing)?;
    if let (Some(base), Some(partial)) = (base.as_object_mut(), partial.as_object()) {
        for (field, value) in partial {
            base.insert(field.clone(), value.clone());
        }
    }
    serde_json::from_value(base)
}

/// Everything the UI renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveState {
    pub orders: LiveCollection<Order>,
    pub agents: LiveCollection<Agent>,
    pub agencies: LiveCollection<Agency>,
    pub products: LiveCollection<Product>,
    pub inventory: LiveCollection<InventoryItem>,
    pub coupons: LiveCollection<Coupon>,
    pub tax: Option<TaxConfig>,
    pub platform_charge: Option<PlatformCharge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Orders,
    Agents,
    Agencies,
    Products,
    Inventory,
    Coupons,
}

/// Wholesale replacement from an initial REST load.
#[derive(Debug, Clone)]
pub enum Seed {
    Orders(Vec<Order>),
    Agents(Vec<Agent>),
    Agencies(Vec<Agency>),
    Products(Vec<Product>),
    Inventory(Vec<InventoryItem>),
    Coupons(Vec<Coupon>),
    Tax(Option<TaxConfig>),
    PlatformCharge(Option<PlatformCharge>),
}

#[derive(Debug, Clone)]
pub enum LiveEvent {
    /// Pushed by the server.
    Remote(InboundMessage),
    Seed(Seed),
    Add { collection: Collection, record: JsonValue },
    Update { collection: Collection, key: String, partial: JsonValue },
    Remove { collection: Collection, key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// Credentials were cleared. A socket passed to
    /// [`ReconcilerHandle::bind`] is closed on the same event.
    LoggedOut { reason: String },
    /// Navigate the UI to this path.
    Redirect(String),
}

pub struct Reconciler {
    rx: mpsc::UnboundedReceiver<LiveEvent>,
    state: LiveState,
    state_tx: watch::Sender<LiveState>,
    toasts: broadcast::Sender<Toast>,
    signals: broadcast::Sender<SessionSignal>,
    session: Arc<dyn SessionStore>,
    redirect_delay: Duration,
}

impl Reconciler {
    pub fn new(session: Arc<dyn SessionStore>) -> (Self, ReconcilerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LiveState::default());
        let (toasts, _) = broadcast::channel(64);
        let (signals, _) = broadcast::channel(8);

        let handle = ReconcilerHandle {
            tx,
            state: state_rx,
            toasts: toasts.clone(),
            signals: signals.clone(),
        };
        let reconciler = Self {
            rx,
            state: LiveState::default(),
            state_tx,
            toasts,
            signals,
            session,
            redirect_delay: LOGOUT_REDIRECT_DELAY,
        };
        (reconciler, handle)
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    /// Runs until every handle is dropped.
    #[instrument(name = "reconciler", skip(self))]
    pub async fn run(mut self) {
        tracing::debug!("reconciler started");
        while let Some(event) = self.rx.recv().await {
            self.apply(event);
            self.state_tx.send_replace(self.state.clone());
        }
        tracing::debug!("reconciler stopped");
    }

    fn apply(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::Remote(message) => self.apply_remote(message),
            LiveEvent::Seed(seed) => self.apply_seed(seed),
            LiveEvent::Add { collection, record } => {
                let result = match collection {
                    Collection::Orders => self.state.orders.add(&record),
                    Collection::Agents => self.state.agents.add(&record),
                    Collection::Agencies => self.state.agencies.add(&record),
                    Collection::Products => self.state.products.add(&record),
                    Collection::Inventory => self.state.inventory.add(&record),
                    Collection::Coupons => self.state.coupons.add(&record),
                };
                log_rejected(collection, result);
            }
            LiveEvent::Update {
                collection,
                key,
                partial,
            } => {
                let result = self.update(collection, &key, &partial);
                log_rejected(collection, result.map(|_| ()));
            }
            LiveEvent::Remove { collection, key } => {
                self.remove(collection, &key);
            }
        }
    }

    fn update(&mut self, collection: Collection, key: &str, partial: &JsonValue) -> Result<bool, serde_json::Error> {
        match collection {
            Collection::Orders => self.state.orders.update(key, partial),
            Collection::Agents => self.state.agents.update(key, partial),
            Collection::Agencies => self.state.agencies.update(key, partial),
            Collection::Products => self.state.products.update(key, partial),
            Collection::Inventory => self.state.inventory.update(key, partial),
            Collection::Coupons => self.state.coupons.update(key, partial),
        }
    }

    fn remove(&mut self, collection: Collection, key: &str) -> bool {
        match collection {
            Collection::Orders => self.state.orders.remove(key),
            Collection::Agents => self.state.agents.remove(key),
            Collection::Agencies => self.state.agencies.remove(key),
            Collection::Products => self.state.products.remove(key),
            Collection::Inventory => self.state.inventory.remove(key),
            Collection::Coupons => self.state.coupons.remove(key),
        }
    }

    fn apply_seed(&mut self, seed: Seed) {
        match seed {
            Seed::Orders(items) => self.state.orders.replace(items),
            Seed::Agents(items) => self.state.agents.replace(items),
            Seed::Agencies(items) => self.state.agencies.replace(items),
            Seed::Products(items) => self.state.products.replace(items),
            Seed::Inventory(items) => self.state.inventory.replace(items),
            Seed::Coupons(items) => self.state.coupons.replace(items),
            Seed::Tax(tax) => self.state.tax = tax,
            Seed::PlatformCharge(charge) => self.state.platform_charge = charge,
        }
    }

    fn apply_remote(&mut self, message: InboundMessage) {
        let InboundMessage { event, envelope } = message;
        let data = &envelope.data;

        let applied = match event {
            EventName::OrderCreated
            | EventName::OrderStatusUpdated
            | EventName::OrderAssigned
            | EventName::OrderDelivered => self.state.orders.add(data),

            EventName::ProductCreated | EventName::ProductUpdated => self.state.products.add(data),

            EventName::InventoryUpdated => {
                let action = data.get("action").and_then(JsonValue::as_str).unwrap_or("updated");
                let key = InventoryItem::key_of(data);
                match (action, key) {
                    ("added", _) => self.state.inventory.add(data),
                    ("removed", Some(key)) => {
                        self.state.inventory.remove(&key);
                        Ok(())
                    }
                    (_, Some(key)) => self.state.inventory.update(&key, data).map(|_| ()),
                    (_, None) => Ok(()),
                }
            }
            EventName::InventoryLowStock => match InventoryItem::key_of(data) {
                Some(key) => self.state.inventory.update(&key, data).map(|_| ()),
                None => Ok(()),
            },

            EventName::AgencyCreated | EventName::AgencyUpdated => self.state.agencies.add(data),
            EventName::AgentCreated | EventName::AgentUpdated | EventName::AgentStatusUpdated => {
                self.state.agents.add(data)
            }

            EventName::CouponCreated | EventName::CouponUpdated | EventName::CouponStatusChanged => {
                self.state.coupons.add(data)
            }
            EventName::CouponDeleted => {
                if let Some(key) = Coupon::key_of(data) {
                    self.state.coupons.remove(&key);
                }
                Ok(())
            }

            EventName::TaxUpdated => serde_json::from_value(data.clone()).map(|tax| {
                self.state.tax = Some(tax);
            }),
            EventName::TaxDeleted => {
                self.state.tax = None;
                Ok(())
            }
            EventName::PlatformChargeUpdated => serde_json::from_value(data.clone()).map(|charge| {
                self.state.platform_charge = Some(charge);
            }),
            EventName::PlatformChargeDeleted => {
                self.state.platform_charge = None;
                Ok(())
            }

            EventName::UserForceLogout | EventName::AgencyForceLogout => {
                self.force_logout(&envelope);
                Ok(())
            }

            EventName::Connect | EventName::ConnectError => Ok(()),
        };

        if let Err(e) = applied {
            tracing::warn!(event = %event, error = %e, "could not apply live event");
            return;
        }
        if let Some(toast) = toast_for(event, data) {
            // No subscribers just means nobody is showing toasts.
            let _ = self.toasts.send(toast);
        }
    }

    fn force_logout(&mut self, envelope: &RealtimeEnvelope) {
        let reason = envelope
            .data
            .get("message")
            .and_then(JsonValue::as_str)
            .unwrap_or("Session ended")
            .to_string();
        tracing::warn!(reason = %reason, "forced logout");

        self.session.clear();
        self.state = LiveState::default();
        let _ = self.signals.send(SessionSignal::LoggedOut { reason });

        let signals = self.signals.clone();
        let delay = self.redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = signals.send(SessionSignal::Redirect(LOGIN_PATH.to_string()));
        });
    }
}

fn log_rejected(collection: Collection, result: Result<(), serde_json::Error>) {
    if let Err(e) = result {
        tracing::warn!(collection = ?collection, error = %e, "rejected local mutation");
    }
}

fn to_json<T: Serialize>(record: &T) -> Option<JsonValue> {
    match serde_json::to_value(record) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "could not encode record");
            None
        }
    }
}

/// Cheap, cloneable access to a running [`Reconciler`].
#[derive(Clone)]
pub struct ReconcilerHandle {
    tx: mpsc::UnboundedSender<LiveEvent>,
    state: watch::Receiver<LiveState>,
    toasts: broadcast::Sender<Toast>,
    signals: broadcast::Sender<SessionSignal>,
}

impl ReconcilerHandle {
    /// `false` once the reconciler has stopped.
    pub fn send(&self, event: LiveEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn state(&self) -> watch::Receiver<LiveState> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> LiveState {
        self.state.borrow().clone()
    }

    pub fn toasts(&self) -> broadcast::Receiver<Toast> {
        self.toasts.subscribe()
    }

    pub fn signals(&self) -> broadcast::Receiver<SessionSignal> {
        self.signals.subscribe()
    }

    pub fn seed(&self, seed: Seed) -> bool {
        self.send(LiveEvent::Seed(seed))
    }

    fn add<T: Serialize>(&self, collection: Collection, record: &T) -> bool {
        match to_json(record) {
            Some(record) => self.send(LiveEvent::Add { collection, record }),
            None => false,
        }
    }

    fn update(&self, collection: Collection, key: String, partial: JsonValue) -> bool {
        self.send(LiveEvent::Update {
            collection,
            key,
            partial,
        })
    }

    pub fn add_order(&self, order: &Order) -> bool {
        self.add(Collection::Orders, order)
    }

    pub fn update_order(&self, id: &str, partial: JsonValue) -> bool {
        self.update(Collection::Orders, id.to_string(), partial)
    }

    pub fn add_agent(&self, agent: &Agent) -> bool {
        self.add(Collection::Agents, agent)
    }

    pub fn update_agent(&self, id: &str, partial: JsonValue) -> bool {
        self.update(Collection::Agents, id.to_string(), partial)
    }

    pub fn add_agency(&self, agency: &Agency) -> bool {
        self.add(Collection::Agencies, agency)
    }

    pub fn update_agency(&self, id: &str, partial: JsonValue) -> bool {
        self.update(Collection::Agencies, id.to_string(), partial)
    }

    pub fn add_product(&self, product: &Product) -> bool {
        self.add(Collection::Products, product)
    }

    pub fn add_inventory(&self, item: &InventoryItem) -> bool {
        self.add(Collection::Inventory, item)
    }

    pub fn update_inventory(&self, key: &InventoryKey, partial: JsonValue) -> bool {
        self.update(Collection::Inventory, key.to_string(), partial)
    }

    pub fn remove_inventory(&self, key: &InventoryKey) -> bool {
        self.send(LiveEvent::Remove {
            collection: Collection::Inventory,
            key: key.to_string(),
        })
    }

    pub fn add_coupon(&self, coupon: &Coupon) -> bool {
        self.add(Collection::Coupons, coupon)
    }

    pub fn remove_coupon(&self, id: &str) -> bool {
        self.send(LiveEvent::Remove {
            collection: Collection::Coupons,
            key: id.to_string(),
        })
    }

    /// Forward every server event (and connection failures) from `socket`.
    /// A force-logout also closes `socket` once it has been forwarded.
    pub fn bind<T: Transport>(&self, socket: &SocketManager<T>) -> Vec<(EventName, ListenerId)> {
        let mut ids: Vec<(EventName, ListenerId)> = EventName::ALL
            .iter()
            .copied()
            .filter(|event| *event != EventName::Connect)
            .map(|event| {
                let tx = self.tx.clone();
                let id = socket.on(event, move |envelope| {
                    let _ = tx.send(LiveEvent::Remote(InboundMessage {
                        event,
                        envelope: envelope.clone(),
                    }));
                });
                (event, id)
            })
            .collect();
        for event in [EventName::UserForceLogout, EventName::AgencyForceLogout] {
            ids.push((event, socket.disconnect_on(event)));
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    use gasdesk_auth::Role;
    use gasdesk_core::{AgencyId, AgentId, CouponId, OrderId, ProductId, UserId};
    use gasdesk_logistics::{AgencyInput, AgentInput, AgentStatus, NewOrder, OrderStatus};
    use gasdesk_pricing::{CouponInput, DiscountType};

    use crate::credentials::{Credentials, InMemorySessionStore};

    fn order(id: &str, customer: &str) -> Order {
        Order::place(
            OrderId::from(id),
            NewOrder {
                customer_name: Some(customer.to_string()),
                total_amount: Some(Decimal::new(1250, 2)),
                ..NewOrder::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn remote(event: EventName, data: JsonValue) -> LiveEvent {
        LiveEvent::Remote(InboundMessage {
            event,
            envelope: RealtimeEnvelope::new(event, data),
        })
    }

    fn spawn(session: Arc<dyn SessionStore>) -> ReconcilerHandle {
        let (reconciler, handle) = Reconciler::new(session);
        tokio::spawn(reconciler.run());
        handle
    }

    #[test]
    fn add_merges_into_an_existing_record() {
        let mut orders = LiveCollection::<Order>::default();
        orders.add(&serde_json::to_value(order("o1", "Asha")).unwrap()).unwrap();
        orders
            .add(&json!({"id": "o1", "status": "confirmed"}))
            .unwrap();

        assert_eq!(orders.len(), 1);
        let stored = orders.get("o1").unwrap();
        assert_eq!(stored.status, OrderStatus::Confirmed);
        assert_eq!(stored.customer_name, "Asha");
    }

    #[test]
    fn update_of_a_missing_record_is_a_no_op() {
        let mut orders = LiveCollection::<Order>::default();
        assert!(!orders.update("nope", &json!({"status": "shipped"})).unwrap());
        assert!(orders.is_empty());
    }

    #[test]
    fn partial_add_of_an_unknown_record_is_rejected() {
        let mut orders = LiveCollection::<Order>::default();
        assert!(orders.add(&json!({"id": "o9", "status": "shipped"})).is_err());
        assert!(orders.is_empty());
    }

    #[test]
    fn inventory_is_keyed_by_agency_and_product() {
        let mut inventory = LiveCollection::<InventoryItem>::default();
        let line = json!({
            "agencyId": "a1",
            "productId": "p1",
            "productName": "14kg",
            "stock": 5,
            "lastUpdated": Utc::now(),
        });
        inventory.add(&line).unwrap();
        assert!(inventory.get("a1/p1").is_some());
        assert!(inventory.remove("a1/p1"));
    }

    #[tokio::test]
    async fn adding_the_same_order_twice_keeps_one_entry_with_the_latest_fields() {
        let handle = spawn(Arc::new(InMemorySessionStore::new()));
        let mut state = handle.state();

        handle.add_order(&order("o1", "First"));
        handle.add_order(&order("o1", "Second"));

        let state = state
            .wait_for(|s| s.orders.get("o1").is_some_and(|o| o.customer_name == "Second"))
            .await
            .unwrap()
            .clone();
        assert_eq!(state.orders.len(), 1);
    }

    #[tokio::test]
    async fn remote_events_upsert_and_toast() {
        let handle = spawn(Arc::new(InMemorySessionStore::new()));
        let mut toasts = handle.toasts();
        let mut state = handle.state();

        let created = serde_json::to_value(order("o1", "Asha")).unwrap();
        handle.send(remote(EventName::OrderCreated, created.clone()));
        handle.send(remote(EventName::OrderCreated, created));

        let toast = toasts.recv().await.unwrap();
        assert_eq!(toast.title, "New Order");

        state
            .wait_for(|s| s.orders.len() == 1)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn inventory_actions_add_update_and_remove() {
        let handle = spawn(Arc::new(InMemorySessionStore::new()));
        let mut state = handle.state();
        let line = |stock: u32, action: &str| {
            json!({
                "agencyId": "a1",
                "productId": "p1",
                "productName": "14kg",
                "stock": stock,
                "lastUpdated": Utc::now(),
                "action": action,
            })
        };

        handle.send(remote(EventName::InventoryUpdated, line(8, "added")));
        handle.send(remote(EventName::InventoryLowStock, line(2, "updated")));
        state
            .wait_for(|s| s.inventory.get("a1/p1").is_some_and(|i| i.stock == 2))
            .await
            .unwrap();

        handle.send(remote(EventName::InventoryUpdated, line(2, "removed")));
        state.wait_for(|s| s.inventory.is_empty()).await.unwrap();
    }

    #[tokio::test]
    async fn coupon_delete_and_pricing_singletons() {
        let handle = spawn(Arc::new(InMemorySessionStore::new()));
        let mut state = handle.state();

        handle.send(remote(
            EventName::TaxUpdated,
            json!({"percentage": 5.0, "fixedAmount": 0.0, "updatedAt": Utc::now()}),
        ));
        state.wait_for(|s| s.tax.is_some()).await.unwrap();

        handle.send(remote(EventName::TaxDeleted, json!({})));
        state.wait_for(|s| s.tax.is_none()).await.unwrap();

        handle.send(remote(EventName::CouponDeleted, json!({"id": "missing"})));
        handle.send(remote(
            EventName::PlatformChargeUpdated,
            json!({"amount": 12.5, "updatedAt": Utc::now()}),
        ));
        state.wait_for(|s| s.platform_charge.is_some()).await.unwrap();
    }

    #[tokio::test]
    async fn local_mutations_reach_every_collection() {
        let handle = spawn(Arc::new(InMemorySessionStore::new()));
        let mut state = handle.state();
        let now = Utc::now();

        let agency = Agency::register(
            AgencyId::from("a1"),
            AgencyInput {
                name: Some("North Gas".to_string()),
                email: Some("north@gas.test".to_string()),
                ..AgencyInput::default()
            },
            now,
        )
        .unwrap();
        let agent = Agent::register(
            AgentId::from("g1"),
            AgentInput {
                name: Some("Ravi".to_string()),
                email: Some("ravi@gas.test".to_string()),
                agency_id: Some(AgencyId::from("a1")),
                ..AgentInput::default()
            },
        )
        .unwrap();
        let coupon = Coupon::create(
            CouponId::from("c1"),
            CouponInput {
                code: Some("FLAT50".to_string()),
                discount_type: Some(DiscountType::Fixed),
                discount_value: Some(Decimal::new(50, 0)),
                ..CouponInput::default()
            },
            now,
        )
        .unwrap();
        let (line, _) = InventoryItem::upsert(
            None,
            gasdesk_logistics::InventoryUpdate {
                agency_id: AgencyId::from("a1"),
                product_id: ProductId::from("p1"),
                product_name: Some("14kg".to_string()),
                stock: 9,
            },
            now,
        )
        .unwrap();
        let key = InventoryKey::new(AgencyId::from("a1"), ProductId::from("p1"));

        handle.add_agency(&agency);
        handle.update_agency("a1", json!({"city": "Pune"}));
        handle.add_agent(&agent);
        handle.update_agent("g1", json!({"status": "online"}));
        handle.add_coupon(&coupon);
        handle.add_inventory(&line);
        handle.update_inventory(&key, json!({"stock": 3}));

        let snapshot = state
            .wait_for(|s| s.inventory.get("a1/p1").is_some_and(|i| i.stock == 3))
            .await
            .unwrap()
            .clone();
        assert_eq!(snapshot.agencies.get("a1").unwrap().city.as_deref(), Some("Pune"));
        assert_eq!(snapshot.agents.get("g1").unwrap().status, AgentStatus::Online);
        assert_eq!(snapshot.coupons.len(), 1);

        handle.remove_coupon("c1");
        handle.remove_inventory(&key);
        state
            .wait_for(|s| s.coupons.is_empty() && s.inventory.is_empty())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn redirect_delay_is_configurable() {
        let (reconciler, handle) = Reconciler::new(Arc::new(InMemorySessionStore::new()));
        tokio::spawn(reconciler.with_redirect_delay(Duration::from_millis(100)).run());
        let mut signals = handle.signals();

        let before = tokio::time::Instant::now();
        handle.send(remote(EventName::UserForceLogout, json!({"userId": "u1"})));
        assert!(matches!(signals.recv().await.unwrap(), SessionSignal::LoggedOut { .. }));
        assert_eq!(
            signals.recv().await.unwrap(),
            SessionSignal::Redirect(LOGIN_PATH.to_string())
        );
        let waited = before.elapsed();
        assert!(waited >= Duration::from_millis(100));
        assert!(waited < LOGOUT_REDIRECT_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn force_logout_clears_credentials_then_redirects() {
        let store = Arc::new(InMemorySessionStore::with(Credentials::new(
            "t",
            UserId::from("u1"),
            Role::AgencyOwner,
            Some(AgencyId::from("a1")),
        )));
        let handle = spawn(store.clone());
        let mut signals = handle.signals();
        let mut toasts = handle.toasts();

        handle.add_product(
            &Product::create(
                ProductId::from("p1"),
                gasdesk_logistics::ProductInput {
                    name: Some("14kg".to_string()),
                    price: Some(Decimal::new(900, 0)),
                    is_active: None,
                },
            )
            .unwrap(),
        );
        handle.send(remote(
            EventName::AgencyForceLogout,
            json!({"agencyId": "a1", "message": "Agency suspended"}),
        ));

        assert_eq!(
            signals.recv().await.unwrap(),
            SessionSignal::LoggedOut {
                reason: "Agency suspended".to_string()
            }
        );
        assert!(store.load().is_none());
        assert_eq!(
            toasts.recv().await.unwrap().variant,
            crate::toast::ToastVariant::Destructive
        );

        let before = tokio::time::Instant::now();
        assert_eq!(
            signals.recv().await.unwrap(),
            SessionSignal::Redirect(LOGIN_PATH.to_string())
        );
        assert!(before.elapsed() >= LOGOUT_REDIRECT_DELAY - Duration::from_millis(1));
        assert!(handle.snapshot().products.is_empty());
    }
}
