use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gasdesk_core::{DomainError, DomainResult, Entity, ProductId};

use crate::agent::required;

/// Catalog product (cylinder size, refill, accessory).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl Product {
    pub fn create(id: ProductId, input: ProductInput) -> DomainResult<Self> {
        let name = required(input.name, "Product name is required")?;
        let price = input
            .price
            .ok_or_else(|| DomainError::validation("Product price is required"))?;
        let product = Self {
            id,
            name,
            price,
            is_active: input.is_active.unwrap_or(true),
        };
        product.validate()?;
        Ok(product)
    }

    pub fn apply(&self, input: ProductInput) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(name) = input.name {
            next.name = required(Some(name), "Product name cannot be empty")?;
        }
        if let Some(price) = input.price {
            next.price = price;
        }
        if let Some(active) = input.is_active {
            next.is_active = active;
        }
        next.validate()?;
        Ok(next)
    }

    fn validate(&self) -> DomainResult<()> {
        if self.price < Decimal::ZERO {
            return Err(DomainError::validation("Product price cannot be negative"));
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn create_and_update() {
        let product = Product::create(
            ProductId::from("p1"),
            ProductInput { name: Some("14.2kg cylinder".to_string()), price: Some(dec!(903)), is_active: None },
        )
        .unwrap();
        assert!(product.is_active);

        let cheaper = product
            .apply(ProductInput { price: Some(dec!(850)), ..ProductInput::default() })
            .unwrap();
        assert_eq!(cheaper.price, dec!(850));
        assert_eq!(cheaper.name, product.name);

        assert!(product
            .apply(ProductInput { price: Some(dec!(-5)), ..ProductInput::default() })
            .is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any non-negative price is accepted and stored verbatim.
            #[test]
            fn non_negative_prices_are_kept(cents in 0i64..10_000_000) {
                let price = Decimal::new(cents, 2);
                let product = Product::create(
                    ProductId::from("p1"),
                    ProductInput { name: Some("Refill".to_string()), price: Some(price), is_active: None },
                ).unwrap();
                prop_assert_eq!(product.price, price);
            }
        }
    }
}
