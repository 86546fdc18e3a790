//! User-facing notifications for live events.
//!
//! Wording comes from static tables keyed by the event and the payload's
//! `status` / `action` / `statusChanged` field.

use serde_json::Value as JsonValue;

use gasdesk_events::EventName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastVariant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Destructive,
            ..Self::new(title, description)
        }
    }
}

/// (order status, title, description suffix)
const ORDER_STATUS_TOASTS: &[(&str, &str, &str)] = &[
    ("pending", "Order Pending", "is pending"),
    ("confirmed", "Order Confirmed", "has been confirmed"),
    ("processing", "Order Processing", "is being processed"),
    ("shipped", "Order Shipped", "has been shipped"),
    ("out_for_delivery", "Out for Delivery", "is out for delivery"),
    ("delivered", "Order Delivered", "has been delivered"),
    ("cancelled", "Order Cancelled", "has been cancelled"),
    ("returned", "Order Returned", "has been returned"),
];

/// (agent status, description suffix)
const AGENT_STATUS_TOASTS: &[(&str, &str)] = &[
    ("online", "is now online"),
    ("offline", "is now offline"),
    ("busy", "is now busy"),
    ("available", "is now available"),
];

/// (inventory action, title, description suffix)
const INVENTORY_ACTION_TOASTS: &[(&str, &str, &str)] = &[
    ("added", "Inventory Added", "was added to inventory"),
    ("updated", "Inventory Updated", "stock was updated"),
    ("removed", "Inventory Removed", "was removed from inventory"),
];

fn text<'a>(data: &'a JsonValue, field: &str) -> Option<&'a str> {
    data.get(field).and_then(JsonValue::as_str)
}

fn lookup3(table: &'static [(&'static str, &'static str, &'static str)], key: &str) -> Option<(&'static str, &'static str)> {
    table
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, title, suffix)| (*title, *suffix))
}

/// Toast for a live event, if that event shows one.
pub fn toast_for(event: EventName, data: &JsonValue) -> Option<Toast> {
    let order = || {
        text(data, "orderNumber")
            .map(|n| format!("Order {n}"))
            .unwrap_or_else(|| "An order".to_string())
    };
    let name = |fallback: &str| text(data, "name").unwrap_or(fallback).to_string();
    let product = || text(data, "productName").unwrap_or("A product").to_string();

    let toast = match event {
        EventName::OrderCreated => Toast::new(
            "New Order",
            format!(
                "{} from {}",
                order(),
                text(data, "customerName").unwrap_or("a customer")
            ),
        ),
        EventName::OrderStatusUpdated => {
            let status = text(data, "status").unwrap_or_default();
            let (title, suffix) = lookup3(ORDER_STATUS_TOASTS, status)
                .unwrap_or(("Order Updated", "was updated"));
            Toast::new(title, format!("{} {suffix}", order()))
        }
        EventName::OrderAssigned => Toast::new(
            "Order Assigned",
            format!(
                "{} assigned to {}",
                order(),
                text(data, "agentName").unwrap_or("an agent")
            ),
        ),
        // Status updates already announce deliveries.
        EventName::OrderDelivered => return None,

        EventName::ProductCreated => Toast::new("Product Added", format!("{} is now available", name("A product"))),
        EventName::ProductUpdated => Toast::new("Product Updated", format!("{} was updated", name("A product"))),

        EventName::InventoryUpdated => {
            let action = text(data, "action").unwrap_or("updated");
            let (title, suffix) = lookup3(INVENTORY_ACTION_TOASTS, action)
                .unwrap_or(("Inventory Updated", "stock was updated"));
            Toast::new(title, format!("{} {suffix}", product()))
        }
        EventName::InventoryLowStock => Toast::destructive(
            "Low Stock Alert",
            format!(
                "{} is running low ({} left)",
                product(),
                data.get("stock").and_then(JsonValue::as_u64).unwrap_or(0)
            ),
        ),

        EventName::AgencyCreated => Toast::new("Agency Added", format!("{} has joined", name("An agency"))),
        EventName::AgencyUpdated => {
            let changed = data.get("statusChanged").and_then(JsonValue::as_bool).unwrap_or(false);
            match (changed, text(data, "status")) {
                (true, Some("active")) => {
                    Toast::new("Agency Activated", format!("{} is now active", name("An agency")))
                }
                (true, Some("inactive")) => Toast::destructive(
                    "Agency Deactivated",
                    format!("{} has been deactivated", name("An agency")),
                ),
                _ => Toast::new("Agency Updated", format!("{} was updated", name("An agency"))),
            }
        }

        EventName::AgentCreated => Toast::new("Agent Added", format!("{} has joined", name("An agent"))),
        EventName::AgentUpdated => Toast::new("Agent Updated", format!("{} was updated", name("An agent"))),
        EventName::AgentStatusUpdated => {
            let status = text(data, "status").unwrap_or_default();
            let suffix = AGENT_STATUS_TOASTS
                .iter()
                .find(|(k, _)| *k == status)
                .map(|(_, s)| *s)
                .unwrap_or("changed status");
            Toast::new("Agent Status", format!("{} {suffix}", name("An agent")))
        }

        EventName::UserForceLogout | EventName::AgencyForceLogout => Toast::destructive(
            "Session Ended",
            text(data, "message").unwrap_or("You have been logged out."),
        ),

        EventName::TaxUpdated => Toast::new("Tax Updated", "Tax configuration has been updated"),
        EventName::TaxDeleted => Toast::new("Tax Removed", "Tax configuration has been removed"),
        EventName::PlatformChargeUpdated => {
            Toast::new("Platform Charge Updated", "Platform charge has been updated")
        }
        EventName::PlatformChargeDeleted => {
            Toast::new("Platform Charge Removed", "Platform charge has been removed")
        }

        EventName::CouponCreated => Toast::new("Coupon Created", format!("{} is available", coupon(data))),
        EventName::CouponUpdated => Toast::new("Coupon Updated", format!("{} was updated", coupon(data))),
        EventName::CouponStatusChanged => {
            let active = data.get("isActive").and_then(JsonValue::as_bool).unwrap_or(false);
            let state = if active { "activated" } else { "deactivated" };
            Toast::new("Coupon Status Changed", format!("{} was {state}", coupon(data)))
        }
        EventName::CouponDeleted => Toast::new("Coupon Deleted", format!("{} was deleted", coupon(data))),

        EventName::Connect => return None,
        EventName::ConnectError => Toast::destructive(
            "Connection Error",
            text(data, "message").unwrap_or("Could not reach the realtime server"),
        ),
    };
    Some(toast)
}

fn coupon(data: &JsonValue) -> String {
    text(data, "code")
        .map(|c| format!("Coupon {c}"))
        .unwrap_or_else(|| "A coupon".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_status_uses_the_table() {
        let toast = toast_for(
            EventName::OrderStatusUpdated,
            &json!({"orderNumber": "ORD-1", "status": "out_for_delivery"}),
        )
        .unwrap();
        assert_eq!(toast.title, "Out for Delivery");
        assert_eq!(toast.description, "Order ORD-1 is out for delivery");
        assert_eq!(toast.variant, ToastVariant::Default);
    }

    #[test]
    fn low_stock_and_force_logout_are_destructive() {
        let low = toast_for(
            EventName::InventoryLowStock,
            &json!({"productName": "14kg Cylinder", "stock": 2}),
        )
        .unwrap();
        assert_eq!(low.variant, ToastVariant::Destructive);
        assert_eq!(low.description, "14kg Cylinder is running low (2 left)");

        let logout = toast_for(EventName::UserForceLogout, &json!({"message": "bye"})).unwrap();
        assert_eq!(logout.variant, ToastVariant::Destructive);
        assert_eq!(logout.description, "bye");
    }

    #[test]
    fn agency_wording_depends_on_status_changed() {
        let plain = toast_for(
            EventName::AgencyUpdated,
            &json!({"name": "Northside", "status": "inactive", "statusChanged": false}),
        )
        .unwrap();
        assert_eq!(plain.title, "Agency Updated");

        let deactivated = toast_for(
            EventName::AgencyUpdated,
            &json!({"name": "Northside", "status": "inactive", "statusChanged": true}),
        )
        .unwrap();
        assert_eq!(deactivated.title, "Agency Deactivated");
        assert_eq!(deactivated.variant, ToastVariant::Destructive);
    }

    #[test]
    fn inventory_action_picks_the_title() {
        let removed = toast_for(
            EventName::InventoryUpdated,
            &json!({"productName": "5kg Cylinder", "action": "removed"}),
        )
        .unwrap();
        assert_eq!(removed.title, "Inventory Removed");
    }
}
