//! Pricing configuration: coupons, delivery charges, tax and platform charge.
//!
//! Pure validation and state transitions (no IO, no HTTP, no storage). Every
//! rejection is a `DomainError::Validation` whose message is shown to the
//! operator unchanged.

pub mod coupon;
pub mod delivery_charge;
pub mod platform_charge;
pub mod tax;

pub use coupon::{Coupon, CouponInput, DiscountType, DUPLICATE_CODE_MESSAGE};
pub use delivery_charge::{
    ChargeType, DeliveryCharge, DeliveryChargeInput, DUPLICATE_AGENCY_MESSAGE,
};
pub use platform_charge::{PlatformCharge, PlatformChargeInput};
pub use tax::{TaxConfig, TaxInput};
