//! Pixform Image Conversion Service
//!
//! A Rust service that converts uploaded images between formats, with
//! optional quality and size parameters. Pixel work is delegated to the
//! image-processing ecosystem; this crate owns validation, parameter
//! marshalling, and result packaging.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
