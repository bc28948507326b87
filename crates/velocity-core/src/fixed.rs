use fixed::types::I64F64;

/// Q64.64 fixed-point: 64 integer bits, 64 fractional bits.
pub type Fixed128 = I64F64;

/// Ticks count simulation steps since the session started.
pub type Ticks = u64;

/// A quantity of a material. Balances and costs are kept in fixed point so
/// affordability checks compare exactly.
pub type Amount = Fixed128;

/// Convert an f64 to an [`Amount`], saturating at the representable range.
/// NaN maps to zero.
pub fn amount_from_f64(v: f64) -> Amount {
    if v.is_nan() {
        return Amount::ZERO;
    }
    match Amount::checked_from_num(v) {
        Some(amount) => amount,
        None => {
            log::warn!("amount {v} out of range, clamping");
            Amount::saturating_from_num(v)
        }
    }
}

/// Convert an [`Amount`] to f64. Use for display and persistence.
#[inline]
pub fn amount_to_f64(v: Amount) -> f64 {
    v.to_num::<f64>()
}

/// Whole-unit amount.
#[inline]
pub fn amount_from_u32(v: u32) -> Amount {
    Amount::saturating_from_num(v)
}

/// Largest whole amount not greater than `v`, computed from an f64.
/// Used for scaled costs, which are always whole units.
#[inline]
pub fn floor_amount(v: f64) -> Amount {
    amount_from_f64(v.floor())
}
