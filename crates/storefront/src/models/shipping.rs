//! Shipping rate table.
//!
//! Fees and delivery offsets are a fixed price table, looked up by shipping
//! type at checkout; the fee is copied onto the payment record and the
//! offset determines the estimated delivery date.

use chrono::Duration;
use rust_decimal::Decimal;

use ambra_core::ShippingType;

/// A row of the shipping price table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingRate {
    pub shipping_type: ShippingType,
    /// Flat fee charged at checkout.
    pub fee: Decimal,
    /// Offset added to the order date for the estimated delivery.
    pub delivery_offset: Duration,
}

impl ShippingRate {
    /// Look up the rate for a shipping type.
    #[must_use]
    pub fn for_type(shipping_type: ShippingType) -> Self {
        match shipping_type {
            ShippingType::Standard => Self {
                shipping_type,
                fee: Decimal::new(200_00, 2),
                delivery_offset: Duration::days(7),
            },
            ShippingType::Express => Self {
                shipping_type,
                fee: Decimal::new(350_00, 2),
                delivery_offset: Duration::days(2),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rate() {
        let rate = ShippingRate::for_type(ShippingType::Standard);
        assert_eq!(rate.fee.to_string(), "200.00");
        assert_eq!(rate.delivery_offset, Duration::days(7));
    }

    #[test]
    fn test_express_costs_more_and_arrives_sooner() {
        let standard = ShippingRate::for_type(ShippingType::Standard);
        let express = ShippingRate::for_type(ShippingType::Express);
        assert!(express.fee > standard.fee);
        assert!(express.delivery_offset < standard.delivery_offset);
    }
}
