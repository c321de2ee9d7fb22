//! Truck documents server: configuration, service wiring, and the
//! periodic document sync.

pub mod app;
pub mod config;
