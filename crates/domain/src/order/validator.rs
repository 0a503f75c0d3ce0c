//! Structural validation of order requests.

use common::ProductId;

use super::{OrderError, PlaceOrder};

/// A request line that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A request that passed validation, lines in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub shipping_address: String,
    pub lines: Vec<ValidatedLine>,
}

/// Checks the shape of a [`PlaceOrder`] request. Does no I/O.
pub struct OrderValidator;

impl OrderValidator {
    pub fn validate(request: &PlaceOrder) -> Result<ValidatedOrder, OrderError> {
        let items = match request.items.as_deref() {
            Some(items) if !items.is_empty() => items,
            _ => return Err(OrderError::validation("order must contain at least one item")),
        };

        let mut lines = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let product_id = item.product_id.ok_or_else(|| {
                OrderError::validation(format!("item {index}: product id is required"))
            })?;
            let quantity = match item.quantity {
                None => {
                    return Err(OrderError::validation(format!(
                        "item {index}: quantity is required"
                    )));
                }
                Some(q) if q <= 0 => {
                    return Err(OrderError::validation(format!(
                        "item {index}: quantity must be positive, got {q}"
                    )));
                }
                Some(q) => u32::try_from(q).map_err(|_| {
                    OrderError::validation(format!("item {index}: quantity {q} is too large"))
                })?,
            };
            lines.push(ValidatedLine {
                product_id,
                quantity,
            });
        }

        let shipping_address = request
            .shipping_address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .ok_or_else(|| OrderError::validation("shipping address is required"))?;

        Ok(ValidatedOrder {
            shipping_address: shipping_address.to_string(),
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::LineRequest;

    fn assert_invalid(request: PlaceOrder) {
        assert!(matches!(
            OrderValidator::validate(&request),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn accepts_well_formed_request() {
        let a = ProductId::new();
        let b = ProductId::new();
        let validated =
            OrderValidator::validate(&PlaceOrder::new(" 1 Main St ").line(a, 2).line(b, 1))
                .unwrap();

        assert_eq!(validated.shipping_address, "1 Main St");
        assert_eq!(
            validated.lines,
            vec![
                ValidatedLine {
                    product_id: a,
                    quantity: 2
                },
                ValidatedLine {
                    product_id: b,
                    quantity: 1
                },
            ]
        );
    }

    #[test]
    fn rejects_missing_or_empty_items() {
        assert_invalid(PlaceOrder::new("addr"));
        assert_invalid(PlaceOrder {
            shipping_address: Some("addr".to_string()),
            items: None,
        });
    }

    #[test]
    fn rejects_line_without_product() {
        assert_invalid(PlaceOrder {
            shipping_address: Some("addr".to_string()),
            items: Some(vec![LineRequest {
                product_id: None,
                quantity: Some(1),
            }]),
        });
    }

    #[test]
    fn rejects_bad_quantities() {
        let id = ProductId::new();
        assert_invalid(PlaceOrder::new("addr").line(id, 0));
        assert_invalid(PlaceOrder::new("addr").line(id, -3));
        assert_invalid(PlaceOrder::new("addr").line(id, i64::from(u32::MAX) + 1));
        assert_invalid(PlaceOrder {
            shipping_address: Some("addr".to_string()),
            items: Some(vec![LineRequest {
                product_id: Some(id),
                quantity: None,
            }]),
        });
    }

    #[test]
    fn rejects_blank_shipping_address() {
        assert_invalid(PlaceOrder::new("   ").line(ProductId::new(), 1));
        assert_invalid(PlaceOrder {
            shipping_address: None,
            items: Some(vec![LineRequest {
                product_id: Some(ProductId::new()),
                quantity: Some(1),
            }]),
        });
    }
}
