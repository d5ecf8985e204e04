//! Client for the resume matching service: session handling, file
//! selection, and the authenticated API client behind them.

pub mod api_client;
pub mod auth;
pub mod config;
pub mod docs;
pub mod errors;
pub mod models;
pub mod storage;
pub mod upload;
