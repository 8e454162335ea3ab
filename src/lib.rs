pub mod config;
pub mod error;
pub mod graph;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
