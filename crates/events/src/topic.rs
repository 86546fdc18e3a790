//! Event-name catalog, subscription channels and audience routing.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use gasdesk_core::{AgencyId, UserId};

/// Every event name that travels over the realtime connection.
///
/// `Connect` / `ConnectError` are connection lifecycle events raised locally
/// (or as the first frame of a stream); the rest are domain events.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "connect")]
    Connect,
    #[serde(rename = "connect_error")]
    ConnectError,

    #[serde(rename = "order:created")]
    OrderCreated,
    #[serde(rename = "order:status-updated")]
    OrderStatusUpdated,
    #[serde(rename = "order:assigned")]
    OrderAssigned,
    #[serde(rename = "order:delivered")]
    OrderDelivered,

    #[serde(rename = "product:created")]
    ProductCreated,
    #[serde(rename = "product:updated")]
    ProductUpdated,

    #[serde(rename = "inventory:updated")]
    InventoryUpdated,
    #[serde(rename = "inventory:low-stock")]
    InventoryLowStock,

    #[serde(rename = "agency:created")]
    AgencyCreated,
    #[serde(rename = "agency:updated")]
    AgencyUpdated,

    #[serde(rename = "agent:created")]
    AgentCreated,
    #[serde(rename = "agent:updated")]
    AgentUpdated,
    #[serde(rename = "agent:status-updated")]
    AgentStatusUpdated,

    #[serde(rename = "user:force-logout")]
    UserForceLogout,
    #[serde(rename = "agency:force-logout")]
    AgencyForceLogout,

    #[serde(rename = "tax:updated")]
    TaxUpdated,
    #[serde(rename = "tax:deleted")]
    TaxDeleted,

    #[serde(rename = "platform-charge:updated")]
    PlatformChargeUpdated,
    #[serde(rename = "platform-charge:deleted")]
    PlatformChargeDeleted,

    #[serde(rename = "coupon:created")]
    CouponCreated,
    #[serde(rename = "coupon:updated")]
    CouponUpdated,
    #[serde(rename = "coupon:status-changed")]
    CouponStatusChanged,
    #[serde(rename = "coupon:deleted")]
    CouponDeleted,
}

impl EventName {
    pub const ALL: [EventName; 25] = [
        EventName::Connect,
        EventName::ConnectError,
        EventName::OrderCreated,
        EventName::OrderStatusUpdated,
        EventName::OrderAssigned,
        EventName::OrderDelivered,
        EventName::ProductCreated,
        EventName::ProductUpdated,
        EventName::InventoryUpdated,
        EventName::InventoryLowStock,
        EventName::AgencyCreated,
        EventName::AgencyUpdated,
        EventName::AgentCreated,
        EventName::AgentUpdated,
        EventName::AgentStatusUpdated,
        EventName::UserForceLogout,
        EventName::AgencyForceLogout,
        EventName::TaxUpdated,
        EventName::TaxDeleted,
        EventName::PlatformChargeUpdated,
        EventName::PlatformChargeDeleted,
        EventName::CouponCreated,
        EventName::CouponUpdated,
        EventName::CouponStatusChanged,
        EventName::CouponDeleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::Connect => "connect",
            EventName::ConnectError => "connect_error",
            EventName::OrderCreated => "order:created",
            EventName::OrderStatusUpdated => "order:status-updated",
            EventName::OrderAssigned => "order:assigned",
            EventName::OrderDelivered => "order:delivered",
            EventName::ProductCreated => "product:created",
            EventName::ProductUpdated => "product:updated",
            EventName::InventoryUpdated => "inventory:updated",
            EventName::InventoryLowStock => "inventory:low-stock",
            EventName::AgencyCreated => "agency:created",
            EventName::AgencyUpdated => "agency:updated",
            EventName::AgentCreated => "agent:created",
            EventName::AgentUpdated => "agent:updated",
            EventName::AgentStatusUpdated => "agent:status-updated",
            EventName::UserForceLogout => "user:force-logout",
            EventName::AgencyForceLogout => "agency:force-logout",
            EventName::TaxUpdated => "tax:updated",
            EventName::TaxDeleted => "tax:deleted",
            EventName::PlatformChargeUpdated => "platform-charge:updated",
            EventName::PlatformChargeDeleted => "platform-charge:deleted",
            EventName::CouponCreated => "coupon:created",
            EventName::CouponUpdated => "coupon:updated",
            EventName::CouponStatusChanged => "coupon:status-changed",
            EventName::CouponDeleted => "coupon:deleted",
        }
    }

    /// The action part of the name (`"status-updated"` for `order:status-updated`).
    ///
    /// This is what goes into the envelope's `type` field.
    pub fn action(&self) -> &'static str {
        let name = self.as_str();
        match name.split_once(':') {
            Some((_, action)) => action,
            None => name,
        }
    }

    pub fn is_lifecycle(&self) -> bool {
        matches!(self, EventName::Connect | EventName::ConnectError)
    }
}

impl core::fmt::Display for EventName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown event: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for EventName {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// A subscription room on the realtime server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Orders,
    Products,
    Agencies,
    Agents,
    Inventory(AgencyId),
}

impl Channel {
    /// Name of the subscribe event a client emits to join this channel.
    pub fn subscribe_event(&self) -> &'static str {
        match self {
            Channel::Orders => "subscribe-orders",
            Channel::Products => "subscribe-products",
            Channel::Agencies => "subscribe-agencies",
            Channel::Agents => "subscribe-agents",
            Channel::Inventory(_) => "subscribe-inventory",
        }
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Channel::Inventory(agency) => write!(f, "inventory:{agency}"),
            other => f.write_str(other.subscribe_event().trim_start_matches("subscribe-")),
        }
    }
}

/// Wire form of a subscribe event: `{"event": "subscribe-inventory", "data": "a1"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl From<&Channel> for SubscribeFrame {
    fn from(channel: &Channel) -> Self {
        let data = match channel {
            Channel::Inventory(agency) => Some(agency.to_string()),
            _ => None,
        };
        Self {
            event: channel.subscribe_event().to_string(),
            data,
        }
    }
}

impl TryFrom<SubscribeFrame> for Channel {
    type Error = UnknownEvent;

    fn try_from(frame: SubscribeFrame) -> Result<Self, Self::Error> {
        match frame.event.as_str() {
            "subscribe-orders" => Ok(Channel::Orders),
            "subscribe-products" => Ok(Channel::Products),
            "subscribe-agencies" => Ok(Channel::Agencies),
            "subscribe-agents" => Ok(Channel::Agents),
            "subscribe-inventory" => match frame.data.as_deref().map(str::trim) {
                Some(agency) if !agency.is_empty() => Ok(Channel::Inventory(AgencyId::from(agency))),
                _ => Err(UnknownEvent("subscribe-inventory requires an agency id".to_string())),
            },
            _ => Err(UnknownEvent(frame.event)),
        }
    }
}

/// Who receives a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Connections subscribed to the channel.
    Channel(Channel),
    /// Connections subscribed to the channel whose session may see the
    /// agency's records: its own members and admins.
    AgencyChannel { channel: Channel, agency: AgencyId },
    /// Connections authenticated as this user.
    User(UserId),
    /// Connections whose session belongs to this agency.
    Agency(AgencyId),
    /// Every open connection.
    Everyone,
}

/// Routing table: which audiences an event with this payload goes to.
///
/// Events whose routing key is missing from the payload (an inventory update
/// without `agencyId`, a force-logout without a target) fall back to the
/// narrowest sensible audience and never to `Everyone`.
pub fn route(event: EventName, data: &JsonValue) -> Vec<Audience> {
    let field = |name: &str| data.get(name).and_then(JsonValue::as_str).map(str::to_string);

    match event {
        EventName::OrderCreated
        | EventName::OrderStatusUpdated
        | EventName::OrderAssigned
        | EventName::OrderDelivered => match field("agencyId") {
            Some(agency) => vec![Audience::AgencyChannel {
                channel: Channel::Orders,
                agency: AgencyId::from(agency),
            }],
            // Orders outside any agency are listed for every session over REST too.
            None => vec![Audience::Channel(Channel::Orders)],
        },

        EventName::ProductCreated | EventName::ProductUpdated => {
            vec![Audience::Channel(Channel::Products)]
        }

        EventName::InventoryUpdated | EventName::InventoryLowStock => {
            let mut audiences = vec![Audience::Channel(Channel::Products)];
            if let Some(agency) = field("agencyId") {
                audiences.push(Audience::Channel(Channel::Inventory(AgencyId::from(agency))));
            }
            audiences
        }

        EventName::AgencyCreated | EventName::AgencyUpdated => {
            vec![Audience::Channel(Channel::Agencies)]
        }

        EventName::AgentCreated | EventName::AgentUpdated | EventName::AgentStatusUpdated => {
            vec![Audience::Channel(Channel::Agents)]
        }

        EventName::UserForceLogout => field("userId")
            .map(|u| vec![Audience::User(UserId::from(u))])
            .unwrap_or_default(),

        EventName::AgencyForceLogout => field("agencyId")
            .map(|a| vec![Audience::Agency(AgencyId::from(a))])
            .unwrap_or_default(),

        EventName::TaxUpdated
        | EventName::TaxDeleted
        | EventName::PlatformChargeUpdated
        | EventName::PlatformChargeDeleted
        | EventName::CouponCreated
        | EventName::CouponUpdated
        | EventName::CouponStatusChanged
        | EventName::CouponDeleted => vec![Audience::Everyone],

        EventName::Connect | EventName::ConnectError => Vec::new(),
    }
}
