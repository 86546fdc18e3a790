use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;

use gasdesk_events::{EventBus, EventName, InMemoryEventBus, RealtimeMessage};
use gasdesk_infra::{AppConfig, InMemoryRecordStore, InMemorySingletonStore, RecordStore, SingletonStore};
use gasdesk_logistics::{Agency, Agent, InventoryItem, Order, Product};
use gasdesk_pricing::{Coupon, DeliveryCharge, PlatformCharge, TaxConfig};

use crate::app::realtime::RealtimeHub;

pub type Records<V> = Arc<dyn RecordStore<V>>;
pub type Singleton<V> = Arc<dyn SingletonStore<V>>;

/// Everything handlers need: stores, the event bus and the realtime hub.
pub struct AppServices {
    pub coupons: Records<Coupon>,
    pub delivery_charges: Records<DeliveryCharge>,
    pub tax: Singleton<TaxConfig>,
    pub platform_charge: Singleton<PlatformCharge>,
    pub orders: Records<Order>,
    pub products: Records<Product>,
    pub agencies: Records<Agency>,
    pub agents: Records<Agent>,
    pub inventory: Records<InventoryItem>,
    pub events: Arc<InMemoryEventBus<RealtimeMessage>>,
    pub hub: Arc<RealtimeHub>,
    pub low_stock_threshold: u32,
}

struct Stores {
    coupons: Records<Coupon>,
    delivery_charges: Records<DeliveryCharge>,
    tax: Singleton<TaxConfig>,
    platform_charge: Singleton<PlatformCharge>,
    orders: Records<Order>,
    products: Records<Product>,
    agencies: Records<Agency>,
    agents: Records<Agent>,
    inventory: Records<InventoryItem>,
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let stores = match config.database_url.as_deref() {
        Some(url) => {
            #[cfg(feature = "postgres")]
            {
                build_postgres_stores(url).await?
            }
            #[cfg(not(feature = "postgres"))]
            {
                let _ = url;
                tracing::warn!(
                    "DATABASE_URL is set but the postgres feature is not enabled, falling back to in-memory stores"
                );
                in_memory_stores()
            }
        }
        None => in_memory_stores(),
    };

    let events = Arc::new(InMemoryEventBus::new());
    let hub = Arc::new(RealtimeHub::new(config.realtime_buffer));
    hub.spawn_relay(&events);

    Ok(AppServices {
        coupons: stores.coupons,
        delivery_charges: stores.delivery_charges,
        tax: stores.tax,
        platform_charge: stores.platform_charge,
        orders: stores.orders,
        products: stores.products,
        agencies: stores.agencies,
        agents: stores.agents,
        inventory: stores.inventory,
        events,
        hub,
        low_stock_threshold: config.low_stock_threshold,
    })
}

fn in_memory_stores() -> Stores {
    Stores {
        coupons: Arc::new(InMemoryRecordStore::new()),
        delivery_charges: Arc::new(InMemoryRecordStore::new()),
        tax: Arc::new(InMemorySingletonStore::new()),
        platform_charge: Arc::new(InMemorySingletonStore::new()),
        orders: Arc::new(InMemoryRecordStore::new()),
        products: Arc::new(InMemoryRecordStore::new()),
        agencies: Arc::new(InMemoryRecordStore::new()),
        agents: Arc::new(InMemoryRecordStore::new()),
        inventory: Arc::new(InMemoryRecordStore::new()),
    }
}

#[cfg(feature = "postgres")]
async fn build_postgres_stores(url: &str) -> anyhow::Result<Stores> {
    use gasdesk_infra::{store::postgres::ensure_schema, PostgresRecordStore, PostgresSingletonStore};

    let pool = sqlx::PgPool::connect(url).await?;
    ensure_schema(&pool).await?;
    tracing::info!("using postgres stores");

    Ok(Stores {
        coupons: Arc::new(PostgresRecordStore::new(pool.clone(), "coupons")),
        delivery_charges: Arc::new(PostgresRecordStore::new(pool.clone(), "delivery_charges")),
        tax: Arc::new(PostgresSingletonStore::new(pool.clone(), "tax")),
        platform_charge: Arc::new(PostgresSingletonStore::new(pool.clone(), "platform_charge")),
        orders: Arc::new(PostgresRecordStore::new(pool.clone(), "orders")),
        products: Arc::new(PostgresRecordStore::new(pool.clone(), "products")),
        agencies: Arc::new(PostgresRecordStore::new(pool.clone(), "agencies")),
        agents: Arc::new(PostgresRecordStore::new(pool.clone(), "agents")),
        inventory: Arc::new(PostgresRecordStore::new(pool, "inventory")),
    })
}

impl AppServices {
    /// Publish a record as a realtime event.
    ///
    /// Best-effort: the write has already happened, so a failure here is
    /// logged and never fails the request.
    pub fn publish<T: Serialize>(&self, event: EventName, record: &T) {
        match RealtimeMessage::from_record(event, record) {
            Ok(message) => self.send(message),
            Err(e) => tracing::warn!(event = %event, error = %e, "failed to encode realtime payload"),
        }
    }

    pub fn publish_json(&self, event: EventName, data: JsonValue) {
        self.send(RealtimeMessage::new(event, data));
    }

    fn send(&self, message: RealtimeMessage) {
        let event = message.event;
        if let Err(e) = self.events.publish(message) {
            tracing::warn!(event = %event, error = %e, "failed to publish realtime event");
        }
    }
}
