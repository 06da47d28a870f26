//! Controllers: adaptan los servicios del núcleo a respuestas `ApiResponse`

pub mod fleet_controller;
pub mod leg_controller;
pub mod route_controller;
pub mod saga_controller;
