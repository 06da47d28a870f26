//! Middleware del sistema
//!
//! CORS para el API. La autenticación vive en el gateway.

pub mod cors;

pub use cors::*;
