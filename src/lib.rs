//! Buoy data client, page view-models and map marker lifecycle for the
//! buoy site backend.
pub mod clients;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod markers;
pub mod routes;
pub mod services;
pub mod utils;
pub mod views;

#[cfg(test)]
mod test_support;
