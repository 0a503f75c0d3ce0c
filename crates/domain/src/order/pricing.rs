//! Price-at-purchase calculation.

use common::Money;
use store::ProductRecord;

use super::OrderError;

/// Computes the unit price an order line is frozen at.
///
/// `sale_rate` below 1.0 is a fraction, anything else a percentage, so 0.2
/// and 20 both mean 20% off. A missing sale rate means no discount. A missing
/// base price prices the product at zero unless the calculator is strict.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceCalculator {
    treat_missing_price_as_error: bool,
}

impl PriceCalculator {
    pub fn new(treat_missing_price_as_error: bool) -> Self {
        Self {
            treat_missing_price_as_error,
        }
    }

    /// Discount fraction for a raw sale rate.
    pub fn discount(sale_rate: f64) -> f64 {
        if sale_rate < 1.0 {
            sale_rate
        } else {
            sale_rate / 100.0
        }
    }

    pub fn price(&self, product: &ProductRecord) -> Result<Money, OrderError> {
        let base = match product.base_price {
            Some(base) => base,
            None if self.treat_missing_price_as_error => {
                return Err(OrderError::validation(format!(
                    "product {} has no price",
                    product.id
                )));
            }
            None => Money::zero(),
        };
        let discount = Self::discount(product.sale_rate.unwrap_or(0.0));

        // Discounts above 100% would price below zero.
        Ok(base.scale((1.0 - discount).max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(base: Option<i64>, sale_rate: Option<f64>) -> ProductRecord {
        ProductRecord::new("Chair", base.map(Money::from_units), sale_rate, 10, "Chairs")
    }

    #[test]
    fn percentage_and_fraction_sale_rates_agree() {
        let calc = PriceCalculator::default();
        assert_eq!(
            calc.price(&product(Some(100), Some(20.0))).unwrap(),
            Money::from_units(80)
        );
        assert_eq!(
            calc.price(&product(Some(100), Some(0.2))).unwrap(),
            Money::from_units(80)
        );
    }

    #[test]
    fn rate_of_exactly_one_is_a_percentage() {
        let calc = PriceCalculator::default();
        assert_eq!(
            calc.price(&product(Some(100), Some(1.0))).unwrap(),
            Money::from_units(99)
        );
    }

    #[test]
    fn missing_sale_rate_means_full_price() {
        let calc = PriceCalculator::default();
        assert_eq!(
            calc.price(&product(Some(42), None)).unwrap(),
            Money::from_units(42)
        );
    }

    #[test]
    fn rounds_to_nearest_cent() {
        let calc = PriceCalculator::default();
        let p = ProductRecord::new("Pen", Some(Money::from_cents(999)), Some(0.333), 1, "Pens");
        // 9.99 * 0.667 = 6.66333
        assert_eq!(calc.price(&p).unwrap(), Money::from_cents(666));
    }

    #[test]
    fn missing_base_price_is_zero_by_default() {
        let calc = PriceCalculator::default();
        assert_eq!(
            calc.price(&product(None, Some(20.0))).unwrap(),
            Money::zero()
        );
    }

    #[test]
    fn missing_base_price_fails_when_strict() {
        let calc = PriceCalculator::new(true);
        assert!(matches!(
            calc.price(&product(None, None)),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn oversized_discount_floors_at_zero() {
        let calc = PriceCalculator::default();
        assert_eq!(
            calc.price(&product(Some(100), Some(150.0))).unwrap(),
            Money::zero()
        );
    }
}
