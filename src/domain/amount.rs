//! Integer micro-unit currency
//!
//! Every persisted amount is an integer count of mCurio. Conversion to
//! whole Curio only happens for display.

/// Amount in micro-Curio (1/1000 of a displayed Curio point).
pub type MicroCurio = i64;

/// Number of mCurio in one displayed Curio.
pub const MICRO_PER_CURIO: MicroCurio = 1000;

/// Convert to a displayable Curio value. Presentation only.
pub fn to_display(amount: MicroCurio) -> f64 {
    amount as f64 / MICRO_PER_CURIO as f64
}

/// Format an amount for humans, e.g. `12000` -> `"12"`, `2500` -> `"2.5"`.
pub fn format_curio(amount: MicroCurio) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let whole = abs / MICRO_PER_CURIO as u64;
    let frac = abs % MICRO_PER_CURIO as u64;
    if frac == 0 {
        format!("{sign}{whole}")
    } else {
        let frac = format!("{frac:03}");
        format!("{sign}{whole}.{}", frac.trim_end_matches('0'))
    }
}
