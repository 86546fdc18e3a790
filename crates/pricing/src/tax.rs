use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gasdesk_core::{DomainError, DomainResult};

/// Platform-wide tax. Either a percentage or a fixed amount applies; the
/// unused field is stored as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxConfig {
    pub percentage: Decimal,
    pub fixed_amount: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxInput {
    pub percentage: Option<Decimal>,
    pub fixed_amount: Option<Decimal>,
}

impl TaxConfig {
    /// Zero values count as "not provided".
    pub fn from_input(input: TaxInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let percentage = input.percentage.filter(|p| !p.is_zero());
        let fixed_amount = input.fixed_amount.filter(|f| !f.is_zero());

        match (percentage, fixed_amount) {
            (Some(_), Some(_)) => Err(DomainError::validation(
                "Provide either a percentage or a fixed amount, not both",
            )),
            (None, None) => Err(DomainError::validation(
                "Either a percentage or a fixed amount is required",
            )),
            (Some(p), None) => {
                if p <= Decimal::ZERO || p > Decimal::ONE_HUNDRED {
                    return Err(DomainError::validation(
                        "Tax percentage must be between 0 and 100",
                    ));
                }
                Ok(Self {
                    percentage: p,
                    fixed_amount: Decimal::ZERO,
                    updated_at: now,
                })
            }
            (None, Some(f)) => {
                if f <= Decimal::ZERO {
                    return Err(DomainError::validation(
                        "Fixed tax amount must be greater than 0",
                    ));
                }
                Ok(Self {
                    percentage: Decimal::ZERO,
                    fixed_amount: f,
                    updated_at: now,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percentage_clears_fixed_amount() {
        let tax = TaxConfig::from_input(
            TaxInput { percentage: Some(dec!(10)), fixed_amount: None },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(tax.percentage, dec!(10));
        assert_eq!(tax.fixed_amount, Decimal::ZERO);
    }

    #[test]
    fn fixed_amount_clears_percentage() {
        let tax = TaxConfig::from_input(
            TaxInput { percentage: Some(dec!(0)), fixed_amount: Some(dec!(50)) },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(tax.percentage, Decimal::ZERO);
        assert_eq!(tax.fixed_amount, dec!(50));

        let wire = serde_json::to_value(&tax).unwrap();
        assert_eq!(wire["fixedAmount"].as_f64(), Some(50.0));
        assert_eq!(wire["percentage"].as_f64(), Some(0.0));
    }

    #[test]
    fn both_or_neither_is_rejected() {
        let both = TaxInput { percentage: Some(dec!(5)), fixed_amount: Some(dec!(5)) };
        assert!(TaxConfig::from_input(both, Utc::now()).is_err());
        assert!(TaxConfig::from_input(TaxInput::default(), Utc::now()).is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let over = TaxInput { percentage: Some(dec!(100.5)), fixed_amount: None };
        assert!(TaxConfig::from_input(over, Utc::now()).is_err());

        let negative = TaxInput { percentage: None, fixed_amount: Some(dec!(-3)) };
        assert!(TaxConfig::from_input(negative, Utc::now()).is_err());
    }
}
