//! HTTP handlers, one module per resource group. Each exposes `routes()`.

pub mod access;
pub mod auth;
pub mod catalog;
pub mod media;
pub mod payroll;
pub mod platform;
pub mod reviews;
pub mod shop;
pub mod stock;
