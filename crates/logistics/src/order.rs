use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gasdesk_core::{AgencyId, AgentId, DomainError, DomainResult, Entity, OrderId};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_name: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub assigned_agent_id: Option<AgentId>,
    pub agent_name: Option<String>,
    pub delivery_proof: Option<String>,
    #[serde(default)]
    pub payment_received: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub agency_id: Option<AgencyId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub order_number: Option<String>,
    pub customer_name: Option<String>,
    pub total_amount: Option<Decimal>,
    pub agency_id: Option<AgencyId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
    pub delivery_proof: Option<String>,
    pub payment_received: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignOrder {
    pub agent_id: AgentId,
    pub agent_name: Option<String>,
}

impl Order {
    /// Place a new pending order. A missing order number is derived from the id.
    pub fn place(id: OrderId, input: NewOrder, now: DateTime<Utc>) -> DomainResult<Self> {
        let customer_name = input
            .customer_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DomainError::validation("Customer name is required"))?;
        let total_amount = input
            .total_amount
            .ok_or_else(|| DomainError::validation("Total amount is required"))?;
        if total_amount < Decimal::ZERO {
            return Err(DomainError::validation("Total amount cannot be negative"));
        }

        let order_number = input
            .order_number
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| default_order_number(&id));

        Ok(Self {
            id,
            order_number,
            customer_name,
            total_amount,
            status: OrderStatus::Pending,
            assigned_agent_id: None,
            agent_name: None,
            delivery_proof: None,
            payment_received: false,
            delivered_at: None,
            agency_id: input.agency_id,
            created_at: now,
        })
    }

    /// Move to `update.status`. Reaching `Delivered` stamps `delivered_at`
    /// once; later updates keep the first delivery time.
    pub fn with_status(&self, update: OrderStatusUpdate, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.status = update.status;
        if update.delivery_proof.is_some() {
            next.delivery_proof = update.delivery_proof;
        }
        if let Some(paid) = update.payment_received {
            next.payment_received = paid;
        }
        if update.status == OrderStatus::Delivered && next.delivered_at.is_none() {
            next.delivered_at = Some(now);
        }
        next
    }

    pub fn assign(&self, assignment: AssignOrder) -> Self {
        Self {
            assigned_agent_id: Some(assignment.agent_id),
            agent_name: assignment.agent_name,
            ..self.clone()
        }
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn default_order_number(id: &OrderId) -> String {
    let chars: Vec<char> = id.as_str().chars().filter(char::is_ascii_alphanumeric).collect();
    let tail: String = chars[chars.len().saturating_sub(8)..].iter().collect();
    format!("ORD-{}", tail.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn new_order() -> NewOrder {
        NewOrder {
            customer_name: Some("Asha".to_string()),
            total_amount: Some(dec!(899)),
            ..NewOrder::default()
        }
    }

    #[test]
    fn place_starts_pending_with_derived_number() {
        let order = Order::place(OrderId::from("0190-abcd-ef12"), new_order(), Utc::now()).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.order_number, "ORD-ABCDEF12");
        assert!(!order.payment_received);
    }

    #[test]
    fn place_requires_customer_and_amount() {
        let mut input = new_order();
        input.customer_name = Some(" ".to_string());
        assert!(Order::place(OrderId::from("o1"), input, Utc::now()).is_err());

        let mut input = new_order();
        input.total_amount = Some(dec!(-1));
        assert!(Order::place(OrderId::from("o1"), input, Utc::now()).is_err());
    }

    #[test]
    fn delivered_at_is_stamped_once() {
        let placed = Utc::now();
        let order = Order::place(OrderId::from("o1"), new_order(), placed).unwrap();
        let delivered = order.with_status(
            OrderStatusUpdate {
                status: OrderStatus::Delivered,
                delivery_proof: Some("photo.jpg".to_string()),
                payment_received: Some(true),
            },
            placed + Duration::hours(2),
        );
        assert_eq!(delivered.delivered_at, Some(placed + Duration::hours(2)));
        assert!(delivered.payment_received);

        let again = delivered.with_status(
            OrderStatusUpdate { status: OrderStatus::Delivered, delivery_proof: None, payment_received: None },
            placed + Duration::hours(5),
        );
        assert_eq!(again.delivered_at, delivered.delivered_at);
        assert_eq!(again.delivery_proof.as_deref(), Some("photo.jpg"));
    }

    #[test]
    fn status_serializes_snake_case() {
        let wire = serde_json::to_value(OrderStatus::OutForDelivery).unwrap();
        assert_eq!(wire, OrderStatus::OutForDelivery.as_str());
    }
}
