//! Integration tests.
//!
//! `scenarios` drives the scheduler against in-memory services;
//! `http_clients` runs the real HTTP clients against local fake servers.

mod mock_services;
mod scenarios;
