//! Neighborhood microgrid settlement simulator.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod devices;
pub mod io;
/// Settlement engine and its tick pipeline.
pub mod sim;
