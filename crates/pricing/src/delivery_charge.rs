use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gasdesk_core::{AgencyId, DeliveryChargeId, DomainError, DomainResult, Entity};

/// Message returned when an agency already owns a delivery charge.
pub const DUPLICATE_AGENCY_MESSAGE: &str = "Agency already has a delivery charge.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeType {
    PerKm,
    Fixed,
}

/// Delivery pricing for one agency.
///
/// Exactly one of `rate_per_km` / `fixed_amount` is populated, matching
/// `charge_type`; the other is always `None` (serialized as `null`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryCharge {
    pub id: DeliveryChargeId,
    pub agency_id: AgencyId,
    pub agency_name: Option<String>,
    pub charge_type: ChargeType,
    pub rate_per_km: Option<Decimal>,
    pub fixed_amount: Option<Decimal>,
    pub delivery_radius: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryChargeInput {
    pub agency_id: Option<AgencyId>,
    pub agency_name: Option<String>,
    pub charge_type: Option<ChargeType>,
    pub rate_per_km: Option<Decimal>,
    pub fixed_amount: Option<Decimal>,
    pub delivery_radius: Option<Decimal>,
}

impl DeliveryCharge {
    pub fn create(
        id: DeliveryChargeId,
        input: DeliveryChargeInput,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let agency_id = input
            .agency_id
            .filter(|a| !a.as_str().trim().is_empty())
            .ok_or_else(|| DomainError::validation("Agency is required"))?;
        let charge_type = input
            .charge_type
            .ok_or_else(|| DomainError::validation("Charge type is required"))?;
        let delivery_radius = input
            .delivery_radius
            .ok_or_else(|| DomainError::validation("Delivery radius is required"))?;

        let mut charge = Self {
            id,
            agency_id,
            agency_name: input.agency_name,
            charge_type,
            rate_per_km: input.rate_per_km,
            fixed_amount: input.fixed_amount,
            delivery_radius,
            created_at: now,
            updated_at: now,
        };
        charge.normalize();
        charge.validate()?;
        Ok(charge)
    }

    /// Return a copy with the provided fields changed. Switching the charge
    /// type drops the amount belonging to the old type.
    pub fn apply(&self, input: DeliveryChargeInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.clone();

        if let Some(agency_id) = input.agency_id {
            if agency_id.as_str().trim().is_empty() {
                return Err(DomainError::validation("Agency is required"));
            }
            next.agency_id = agency_id;
        }
        if input.agency_name.is_some() {
            next.agency_name = input.agency_name;
        }
        if let Some(t) = input.charge_type {
            next.charge_type = t;
        }
        if input.rate_per_km.is_some() {
            next.rate_per_km = input.rate_per_km;
        }
        if input.fixed_amount.is_some() {
            next.fixed_amount = input.fixed_amount;
        }
        if let Some(r) = input.delivery_radius {
            next.delivery_radius = r;
        }

        next.normalize();
        next.validate()?;
        next.updated_at = now;
        Ok(next)
    }

    fn normalize(&mut self) {
        match self.charge_type {
            ChargeType::PerKm => self.fixed_amount = None,
            ChargeType::Fixed => self.rate_per_km = None,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        match self.charge_type {
            ChargeType::PerKm => match self.rate_per_km {
                Some(rate) if rate > Decimal::ZERO => {}
                _ => {
                    return Err(DomainError::validation(
                        "Rate per km must be greater than 0",
                    ))
                }
            },
            ChargeType::Fixed => match self.fixed_amount {
                Some(amount) if amount >= Decimal::ZERO => {}
                _ => {
                    return Err(DomainError::validation(
                        "Fixed amount must be a non-negative number",
                    ))
                }
            },
        }

        if self.delivery_radius <= Decimal::ZERO {
            return Err(DomainError::validation(
                "Delivery radius must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Entity for DeliveryCharge {
    type Id = DeliveryChargeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn per_km() -> DeliveryChargeInput {
        DeliveryChargeInput {
            agency_id: Some(AgencyId::from("a1")),
            charge_type: Some(ChargeType::PerKm),
            rate_per_km: Some(dec!(5)),
            delivery_radius: Some(dec!(10)),
            ..DeliveryChargeInput::default()
        }
    }

    #[test]
    fn per_km_drops_fixed_amount() {
        let mut input = per_km();
        input.fixed_amount = Some(dec!(40));
        let charge = DeliveryCharge::create(DeliveryChargeId::from("d1"), input, Utc::now()).unwrap();

        assert_eq!(charge.rate_per_km, Some(dec!(5)));
        assert_eq!(charge.fixed_amount, None);

        let wire = serde_json::to_value(&charge).unwrap();
        assert_eq!(wire["chargeType"], "per_km");
        assert_eq!(wire["ratePerKm"].as_f64(), Some(5.0));
        assert!(wire["fixedAmount"].is_null());
    }

    #[test]
    fn switching_to_fixed_requires_amount_and_drops_rate() {
        let charge = DeliveryCharge::create(DeliveryChargeId::from("d1"), per_km(), Utc::now()).unwrap();

        let missing = charge.apply(
            DeliveryChargeInput { charge_type: Some(ChargeType::Fixed), ..Default::default() },
            Utc::now(),
        );
        assert!(missing.is_err());

        let fixed = charge
            .apply(
                DeliveryChargeInput {
                    charge_type: Some(ChargeType::Fixed),
                    fixed_amount: Some(dec!(0)),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(fixed.rate_per_km, None);
        assert_eq!(fixed.fixed_amount, Some(dec!(0)));
    }

    #[test]
    fn rejects_bad_rate_and_radius() {
        let mut input = per_km();
        input.rate_per_km = Some(dec!(0));
        assert!(DeliveryCharge::create(DeliveryChargeId::from("d1"), input, Utc::now()).is_err());

        let mut input = per_km();
        input.delivery_radius = Some(dec!(-1));
        assert_eq!(
            DeliveryCharge::create(DeliveryChargeId::from("d1"), input, Utc::now()),
            Err(DomainError::validation("Delivery radius must be greater than 0"))
        );
    }

    #[test]
    fn agency_is_required() {
        let mut input = per_km();
        input.agency_id = None;
        assert_eq!(
            DeliveryCharge::create(DeliveryChargeId::from("d1"), input, Utc::now()),
            Err(DomainError::validation("Agency is required"))
        );
    }
}
