//! Redondeos de distancias, horas y montos

use rust_decimal::Decimal;

/// Redondear a 2 decimales (km, horas)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Costo = km × tarifa, redondeado a centavos
pub fn cost_for_distance(distance_km: f64, rate_per_km: Decimal) -> Decimal {
    let km = Decimal::from_f64_retain(distance_km).unwrap_or_default();
    (km * rate_per_km).round_dp(2)
}
