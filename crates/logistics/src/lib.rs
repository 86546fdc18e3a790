//! Operational records: orders, agents, agencies, products and inventory.
//!
//! Plain records with field validation and state transitions. Storage and
//! event publishing live in the API layer.

pub mod agency;
pub mod agent;
pub mod inventory;
pub mod order;
pub mod product;

pub use agency::{Agency, AgencyInput, AgencyStatus};
pub use agent::{Agent, AgentInput, AgentStatus};
pub use inventory::{InventoryAction, InventoryItem, InventoryKey, InventoryUpdate};
pub use order::{AssignOrder, NewOrder, Order, OrderStatus, OrderStatusUpdate};
pub use product::{Product, ProductInput};
