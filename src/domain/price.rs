//! Fixed-point price arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};

pub const PRICE_SCALE: u32 = 2;

/// Integer digits available in the `NUMERIC(10,2)` price columns.
const PRICE_INTEGER_DIGITS: u32 = 8;

/// True when the price fits the storage column once quantized.
pub fn fits_storage(price: Decimal) -> bool {
    let limit = Decimal::from(10_i64.pow(PRICE_INTEGER_DIGITS));
    quantize(price).abs() < limit
}

/// Round to exactly two fractional digits, ties to even.
pub fn quantize(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(PRICE_SCALE);
    rounded
}

/// Effective price after applying a percentage discount.
///
/// A percentage of 100 or more collapses the price to `0.00`. Returns `None`
/// when the arithmetic leaves the decimal range.
pub fn discounted_price(price: Decimal, percent: Decimal) -> Option<Decimal> {
    let hundred = Decimal::ONE_HUNDRED;
    if percent >= hundred {
        return Some(quantize(Decimal::ZERO));
    }
    let reduction = price.checked_mul(percent)?.checked_div(hundred)?;
    price.checked_sub(reduction).map(quantize)
}
