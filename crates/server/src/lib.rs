pub mod config;

pub mod state;

pub mod rest;

pub mod openapi;

pub mod error_convert;

pub mod telemetry;

pub mod health;

pub mod rate_limit;

pub mod client_addr;

// Upstream services
pub mod keys;

pub mod upstream;

pub mod whatsmyname;

pub mod google;

pub mod openrouter;

pub mod relay;
