use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gasdesk_core::{DomainError, DomainResult};

/// Flat fee added to every order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCharge {
    pub amount: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformChargeInput {
    pub amount: Option<Decimal>,
}

impl PlatformCharge {
    pub fn from_input(input: PlatformChargeInput, now: DateTime<Utc>) -> DomainResult<Self> {
        match input.amount {
            Some(amount) if amount >= Decimal::ZERO => Ok(Self { amount, updated_at: now }),
            Some(_) => Err(DomainError::validation(
                "Platform charge must be a non-negative amount",
            )),
            None => Err(DomainError::validation("Platform charge amount is required")),
        }
    }
}
