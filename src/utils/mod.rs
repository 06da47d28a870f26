//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores y redondeos
//! compartidos por los servicios.

pub mod errors;
pub mod money;

pub use errors::{AppError, AppResult};
