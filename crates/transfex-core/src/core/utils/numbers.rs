/// Tolerance applied before rounding up, so that values such as `2.0000000000004`
/// produced by binary floating point do not jump to the next step.
const ROUNDING_TOLERANCE: f64 = 1e-9;

/// Rounds `value` up (towards positive infinity) to the given number of decimal places.
///
/// Volumes handed to the robot must never be truncated, otherwise individual wells
/// are underfilled. `round_up(33.75, 1)` yields `33.8`, `round_up(2.0, 1)` stays `2.0`.
pub fn round_up(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    let rounded = (scaled - ROUNDING_TOLERANCE).ceil();
    rounded / factor
}

/// Formats a number without a trailing `.0` for integral values (`1400.0` -> `"1400"`).
///
/// The result is stable across numeric representations and is used for hash values
/// and tag values.
pub fn trimmed_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[inline]
pub fn is_positive_number(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
pub(crate) fn f64_approx_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
