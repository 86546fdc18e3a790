//! Background push messages: rendering and click routing.
//!
//! Delivery is external. A push carries an optional `notification` block and a
//! `data` map; `data.orderId` decides where a click lands.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_TITLE: &str = "New Order";
pub const DEFAULT_BODY: &str = "You have a new order";
pub const ORDERS_PATH: &str = "/orders";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Incoming push message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub notification: Option<PushPayload>,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    View,
    Dismiss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub order_id: Option<String>,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Render a push message. Missing text falls back to the new-order wording.
    pub fn from_push(message: &PushMessage) -> Self {
        let payload = message.notification.clone().unwrap_or_default();
        Self {
            title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: payload.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            order_id: message.data.get("orderId").cloned(),
            actions: vec![NotificationAction::View, NotificationAction::Dismiss],
        }
    }

    /// `/orders/{orderId}`, or the order list when the push names no order.
    pub fn target_path(&self) -> String {
        match &self.order_id {
            Some(id) => format!("{ORDERS_PATH}/{id}"),
            None => ORDERS_PATH.to_string(),
        }
    }
}

/// A client window the click can reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRef {
    pub id: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Close,
    FocusAndNavigate { window: u32, path: String },
    OpenWindow { path: String },
}

/// Decide what a click on `notification` does. `action` is `None` when the
/// body was clicked rather than a button.
pub fn route_click(
    notification: &Notification,
    action: Option<NotificationAction>,
    open_windows: &[WindowRef],
) -> ClickOutcome {
    if action == Some(NotificationAction::Dismiss) {
        return ClickOutcome::Close;
    }
    let path = notification.target_path();
    match open_windows.first() {
        Some(window) => ClickOutcome::FocusAndNavigate {
            window: window.id,
            path,
        },
        None => ClickOutcome::OpenWindow { path },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_push() -> Notification {
        let message: PushMessage = serde_json::from_str(
            r#"{"notification":{"title":"Order ORD-1","body":"Asha placed an order"},"data":{"orderId":"o1"}}"#,
        )
        .unwrap();
        Notification::from_push(&message)
    }

    #[test]
    fn renders_with_view_and_dismiss() {
        let notification = order_push();
        assert_eq!(notification.title, "Order ORD-1");
        assert_eq!(
            notification.actions,
            vec![NotificationAction::View, NotificationAction::Dismiss]
        );

        let bare = Notification::from_push(&PushMessage::default());
        assert_eq!(bare.title, DEFAULT_TITLE);
        assert_eq!(bare.target_path(), "/orders");
    }

    #[test]
    fn dismiss_closes() {
        let outcome = route_click(&order_push(), Some(NotificationAction::Dismiss), &[]);
        assert_eq!(outcome, ClickOutcome::Close);
    }

    #[test]
    fn view_focuses_an_existing_window() {
        let windows = [WindowRef {
            id: 7,
            url: "https://app.local/dashboard".to_string(),
        }];
        let outcome = route_click(&order_push(), Some(NotificationAction::View), &windows);
        assert_eq!(
            outcome,
            ClickOutcome::FocusAndNavigate {
                window: 7,
                path: "/orders/o1".to_string()
            }
        );
    }

    #[test]
    fn click_without_windows_opens_one() {
        let outcome = route_click(&order_push(), None, &[]);
        assert_eq!(
            outcome,
            ClickOutcome::OpenWindow {
                path: "/orders/o1".to_string()
            }
        );
    }
}
