//! DTOs del API HTTP

pub mod api_response;
pub mod fleet_dto;
pub mod leg_dto;
pub mod route_dto;

pub use api_response::ApiResponse;
