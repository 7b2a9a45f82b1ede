/// Round to one decimal place (0.1 m), the resolution of every output document.
/// Negative zero is normalised so `-0.0` never reaches the JSON.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0 + 0.0
}

/// Squared distance of a local point from the frame origin
pub fn distance_sq_from_origin(x: f64, z: f64) -> f64 {
    x * x + z * z
}

/// Case-insensitive substring match used for anchor and street lookups
pub fn name_matches(name: &str, needle: &str) -> bool {
    name.to_lowercase().contains(&needle.to_lowercase())
}
