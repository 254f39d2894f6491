//! Client for the DeckMaster presentation service: plan and quota
//! enforcement, a time-bounded admin session, and the submit-and-poll
//! generation workflow over a retrying REST gateway.

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod state;

pub mod crypto {
    pub mod credential;
}

pub mod gateway {
    pub mod client;
    pub mod endpoints;
    pub mod http;
    pub mod transport;
}

pub mod models {
    pub mod admin;
    pub mod design;
    pub mod generation;
    pub mod job;
    pub mod plan;
    pub mod user;
}

pub mod store {
    pub mod kv;
    pub mod local;
    pub mod memory;
    pub mod redis;
}

pub mod services {
    pub mod admin;
    pub mod generation;
    pub mod quota;
}

pub mod validation {
    pub mod generation;
}

pub use client::DeckClient;
pub use config::Config;
pub use error::{AppError, GatewayError, Result, TransportError};
