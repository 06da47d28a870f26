pub mod fleet_routes;
pub mod leg_routes;
pub mod route_routes;
pub mod saga_routes;
