use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gasdesk_core::{CouponId, DomainError, DomainResult, Entity};

pub const DUPLICATE_CODE_MESSAGE: &str = "Coupon code already exists";

/// How a coupon's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discount_value` is a percentage in `0..=100`.
    Percentage,
    /// `discount_value` is an absolute amount.
    Fixed,
}

/// A discount coupon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    /// Minimum order amount the coupon applies to.
    #[serde(default)]
    pub min_amount: Decimal,
    /// Maximum order amount the coupon applies to.
    pub max_amount: Option<Decimal>,
    /// Cap on the discount for percentage coupons.
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub used_count: u32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload. On create, `code`, `discount_type` and
/// `discount_value` are required; on update every field is optional and only
/// the provided ones change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponInput {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<u32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl Coupon {
    /// Build and validate a new coupon.
    pub fn create(id: CouponId, input: CouponInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let code = normalize_code(input.code.as_deref())
            .ok_or_else(|| DomainError::validation("Coupon code is required"))?;
        let discount_type = input
            .discount_type
            .ok_or_else(|| DomainError::validation("Discount type is required"))?;
        let discount_value = input
            .discount_value
            .ok_or_else(|| DomainError::validation("Discount value is required"))?;

        let coupon = Self {
            id,
            code,
            name: input.name,
            description: input.description,
            discount_type,
            discount_value,
            min_amount: input.min_amount.unwrap_or_default(),
            max_amount: input.max_amount,
            max_discount: input.max_discount,
            usage_limit: input.usage_limit,
            used_count: 0,
            valid_from: input.valid_from,
            valid_until: input.valid_until,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        coupon.validate()?;
        Ok(coupon)
    }

    /// Return a copy with the provided fields changed, re-validated as a whole.
    pub fn apply(&self, input: CouponInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.clone();

        if let Some(code) = input.code.as_deref() {
            next.code = normalize_code(Some(code))
                .ok_or_else(|| DomainError::validation("Coupon code cannot be empty"))?;
        }
        if input.name.is_some() {
            next.name = input.name;
        }
        if input.description.is_some() {
            next.description = input.description;
        }
        if let Some(t) = input.discount_type {
            next.discount_type = t;
        }
        if let Some(v) = input.discount_value {
            next.discount_value = v;
        }
        if let Some(v) = input.min_amount {
            next.min_amount = v;
        }
        if input.max_amount.is_some() {
            next.max_amount = input.max_amount;
        }
        if input.max_discount.is_some() {
            next.max_discount = input.max_discount;
        }
        if input.usage_limit.is_some() {
            next.usage_limit = input.usage_limit;
        }
        if input.valid_from.is_some() {
            next.valid_from = input.valid_from;
        }
        if input.valid_until.is_some() {
            next.valid_until = input.valid_until;
        }
        if let Some(active) = input.is_active {
            next.is_active = active;
        }

        next.validate()?;
        next.updated_at = now;
        Ok(next)
    }

    /// Toggle activation.
    pub fn with_status(&self, is_active: bool, now: DateTime<Utc>) -> Self {
        Self {
            is_active,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Case-insensitive code comparison (codes are unique under this rule).
    pub fn has_code(&self, code: &str) -> bool {
        self.code.to_lowercase() == code.trim().to_lowercase()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("Coupon code is required"));
        }

        match self.discount_type {
            DiscountType::Percentage => {
                if self.discount_value < Decimal::ZERO || self.discount_value > Decimal::ONE_HUNDRED {
                    return Err(DomainError::validation(
                        "Percentage discount must be between 0 and 100",
                    ));
                }
            }
            DiscountType::Fixed => {
                if self.discount_value < Decimal::ZERO {
                    return Err(DomainError::validation("Fixed discount cannot be negative"));
                }
            }
        }

        if self.min_amount < Decimal::ZERO {
            return Err(DomainError::validation("Minimum amount cannot be negative"));
        }
        if let Some(max) = self.max_amount {
            if max <= self.min_amount {
                return Err(DomainError::validation(
                    "Maximum amount must be greater than minimum amount",
                ));
            }
        }
        if matches!(self.max_discount, Some(cap) if cap < Decimal::ZERO) {
            return Err(DomainError::validation("Maximum discount cannot be negative"));
        }
        if self.usage_limit == Some(0) {
            return Err(DomainError::validation("Usage limit must be greater than 0"));
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if until <= from {
                return Err(DomainError::validation("Expiry date must be after the start date"));
            }
        }

        Ok(())
    }
}

impl Entity for Coupon {
    type Id = CouponId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn normalize_code(code: Option<&str>) -> Option<String> {
    code.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string)
}
