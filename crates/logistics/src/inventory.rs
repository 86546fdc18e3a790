use core::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gasdesk_core::{AgencyId, DomainError, DomainResult, Entity, ProductId};

/// Composite key of a stock line: one product at one agency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryKey {
    pub agency_id: AgencyId,
    pub product_id: ProductId,
}

impl InventoryKey {
    pub fn new(agency_id: AgencyId, product_id: ProductId) -> Self {
        Self { agency_id, product_id }
    }
}

/// `agency/product`, with `%` and `/` inside either part percent-escaped so
/// distinct keys never print the same.
impl core::fmt::Display for InventoryKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write_escaped(f, self.agency_id.as_str())?;
        f.write_str("/")?;
        write_escaped(f, self.product_id.as_str())
    }
}

fn write_escaped(f: &mut core::fmt::Formatter<'_>, part: &str) -> core::fmt::Result {
    for ch in part.chars() {
        match ch {
            '%' => f.write_str("%25")?,
            '/' => f.write_str("%2F")?,
            other => f.write_char(other)?,
        }
    }
    Ok(())
}

/// What happened to a stock line; carried on `inventory:updated` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryAction {
    Added,
    Updated,
    Removed,
}

impl InventoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryAction::Added => "added",
            InventoryAction::Updated => "updated",
            InventoryAction::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    #[serde(flatten)]
    pub key: InventoryKey,
    pub product_name: Option<String>,
    pub stock: u32,
    pub last_updated: DateTime<Utc>,
}

/// Body of `PUT /api/inventory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUpdate {
    pub agency_id: AgencyId,
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub stock: i64,
}

impl InventoryUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        if self.agency_id.as_str().trim().is_empty() {
            return Err(DomainError::validation("Agency ID is required"));
        }
        if self.product_id.as_str().trim().is_empty() {
            return Err(DomainError::validation("Product ID is required"));
        }
        Ok(())
    }
}

impl InventoryItem {
    /// Set the stock of a line, creating it when `existing` is `None`.
    ///
    /// Returns the new line and whether it was added or updated.
    pub fn upsert(
        existing: Option<&InventoryItem>,
        update: InventoryUpdate,
        now: DateTime<Utc>,
    ) -> DomainResult<(Self, InventoryAction)> {
        update.validate()?;
        let stock = u32::try_from(update.stock)
            .map_err(|_| DomainError::validation("Stock must be a non-negative whole number"))?;

        let key = InventoryKey::new(update.agency_id, update.product_id);
        match existing {
            Some(current) => Ok((
                Self {
                    key,
                    product_name: update.product_name.or_else(|| current.product_name.clone()),
                    stock,
                    last_updated: now,
                },
                InventoryAction::Updated,
            )),
            None => Ok((
                Self {
                    key,
                    product_name: update.product_name,
                    stock,
                    last_updated: now,
                },
                InventoryAction::Added,
            )),
        }
    }

    pub fn is_low_stock(&self, threshold: u32) -> bool {
        self.stock <= threshold
    }
}

impl Entity for InventoryItem {
    type Id = InventoryKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(stock: i64) -> InventoryUpdate {
        InventoryUpdate {
            agency_id: AgencyId::from("a1"),
            product_id: ProductId::from("p1"),
            product_name: Some("5kg cylinder".to_string()),
            stock,
        }
    }

    #[test]
    fn first_write_adds_then_updates() {
        let (item, action) = InventoryItem::upsert(None, update(20), Utc::now()).unwrap();
        assert_eq!(action, InventoryAction::Added);

        let mut again = update(4);
        again.product_name = None;
        let (next, action) = InventoryItem::upsert(Some(&item), again, Utc::now()).unwrap();
        assert_eq!(action, InventoryAction::Updated);
        assert_eq!(next.stock, 4);
        assert_eq!(next.product_name.as_deref(), Some("5kg cylinder"));
        assert!(next.is_low_stock(10));
        assert!(!item.is_low_stock(10));
    }

    #[test]
    fn negative_stock_is_rejected() {
        assert!(InventoryItem::upsert(None, update(-1), Utc::now()).is_err());
    }

    #[test]
    fn blank_ids_are_rejected() {
        let mut blank_agency = update(3);
        blank_agency.agency_id = AgencyId::from("  ");
        assert!(InventoryItem::upsert(None, blank_agency, Utc::now()).is_err());

        let mut blank_product = update(3);
        blank_product.product_id = ProductId::from("");
        assert!(InventoryItem::upsert(None, blank_product, Utc::now()).is_err());
    }

    #[test]
    fn keys_with_slashes_stay_distinct() {
        let plain = InventoryKey::new(AgencyId::from("a1"), ProductId::from("p1"));
        assert_eq!(plain.to_string(), "a1/p1");

        let left = InventoryKey::new(AgencyId::from("a/b"), ProductId::from("c"));
        let right = InventoryKey::new(AgencyId::from("a"), ProductId::from("b/c"));
        assert_ne!(left.to_string(), right.to_string());
        assert_eq!(left.to_string(), "a%2Fb/c");
    }

    #[test]
    fn key_is_flattened_on_the_wire() {
        let (item, _) = InventoryItem::upsert(None, update(3), Utc::now()).unwrap();
        let wire = serde_json::to_value(&item).unwrap();
        assert_eq!(wire["agencyId"], "a1");
        assert_eq!(wire["productId"], "p1");
        assert_eq!(wire["stock"], 3);
        assert!(wire["lastUpdated"].is_string());
    }
}
