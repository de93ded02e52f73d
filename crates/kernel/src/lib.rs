//! Estate Kernel Library
//!
//! Property grid query engine and the HTTP service around it.
//! The main entry point for running the server is the `estate` binary.

pub mod config;
pub mod db;
pub mod error;
pub mod grid;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
