/// Convert `amount` between two currencies quoted against the same base.
///
/// The result is rounded half-up to two decimal places.
pub fn convert(amount: f64, from_rate: f64, to_rate: f64) -> f64 {
    ((amount * (to_rate / from_rate) * 100.0) + 0.5).floor() / 100.0
}
