//! Selección de depósitos intermedios
//!
//! Vecino más cercano greedy sobre distancia haversine: desde el origen se
//! elige el depósito más cercano, luego el más cercano a ése, y así hasta
//! tener N. No mira hacia el destino, por lo que puede elegir depósitos que
//! alejan la carga; es una limitación conocida del heurístico.

use tracing::debug;

use crate::models::{Coordinates, Deposit, DepositStatus};
use crate::services::geo::haversine_distance;

/// Elegir exactamente `count` depósitos distintos, o ninguno
pub fn select_deposits(
    candidates: &[Deposit],
    origin: &Coordinates,
    destination: &Coordinates,
    count: usize,
) -> Option<Vec<Deposit>> {
    let mut remaining: Vec<(&Deposit, Coordinates)> = candidates
        .iter()
        .filter(|d| d.status == DepositStatus::Active)
        .filter_map(|d| d.coordinates().map(|c| (d, c)))
        .collect();

    if remaining.len() < count {
        debug!(
            "Depósitos con coordenadas insuficientes: {} requeridos, {} disponibles",
            count,
            remaining.len()
        );
        return None;
    }

    let mut selected = Vec::with_capacity(count);
    let mut current = *origin;

    for _ in 0..count {
        let (index, distance) = remaining
            .iter()
            .enumerate()
            .map(|(i, (_, coords))| (i, haversine_distance(&current, coords)))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((i, d)),
            })?;

        let (deposit, coords) = remaining.remove(index);
        debug!("📍 Depósito elegido: {} a {:.1} km", deposit.name, distance);
        selected.push(deposit.clone());
        current = coords;
    }

    debug!(
        "Último depósito a {:.1} km del destino",
        haversine_distance(&current, destination)
    );
    Some(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn deposit(name: &str, coords: Option<(f64, f64)>) -> Deposit {
        Deposit {
            id: Uuid::new_v4(),
            name: name.to_string(),
            address: name.to_string(),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            max_capacity_m3: None,
            daily_cost: Decimal::from(1000),
            status: DepositStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn argentina() -> Vec<Deposit> {
        vec![
            deposit("Córdoba", Some((-31.3713, -64.2478))),
            deposit("Rosario", Some((-32.92, -60.68))),
            deposit("Buenos Aires Sur", Some((-34.7, -58.5))),
            deposit("Mendoza", Some((-32.85, -68.82))),
        ]
    }

    const BUENOS_AIRES: Coordinates = Coordinates { lat: -34.6037, lon: -58.3816 };
    const MENDOZA: Coordinates = Coordinates { lat: -32.8895, lon: -68.8458 };

    #[test]
    fn test_greedy_chain_from_origin() {
        let chosen = select_deposits(&argentina(), &BUENOS_AIRES, &MENDOZA, 2).unwrap();
        let names: Vec<&str> = chosen.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Buenos Aires Sur", "Rosario"]);
    }

    #[test]
    fn test_no_duplicates_and_exact_count() {
        let deposits = argentina();
        for n in 1..=4 {
            let chosen = select_deposits(&deposits, &BUENOS_AIRES, &MENDOZA, n).unwrap();
            assert_eq!(chosen.len(), n);
            let mut ids: Vec<Uuid> = chosen.iter().map(|d| d.id).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), n);
        }
    }

    #[test]
    fn test_not_enough_deposits_returns_none() {
        let deposits = vec![
            deposit("Con coordenadas", Some((-31.0, -64.0))),
            deposit("Sin coordenadas", None),
        ];
        assert!(select_deposits(&deposits, &BUENOS_AIRES, &MENDOZA, 2).is_none());
        assert_eq!(select_deposits(&deposits, &BUENOS_AIRES, &MENDOZA, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_inactive_deposits_are_ignored() {
        let mut deposits = argentina();
        deposits[2].status = DepositStatus::Inactive;
        let chosen = select_deposits(&deposits, &BUENOS_AIRES, &MENDOZA, 1).unwrap();
        assert_eq!(chosen[0].name, "Rosario");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let deposits = vec![
            deposit("Primero", Some((-33.0, -60.0))),
            deposit("Segundo", Some((-33.0, -60.0))),
        ];
        let chosen = select_deposits(&deposits, &BUENOS_AIRES, &MENDOZA, 1).unwrap();
        assert_eq!(chosen[0].name, "Primero");
    }
}
