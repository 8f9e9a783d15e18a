//! HTTP API handlers

pub mod auth;
pub mod health;
pub mod networks;
pub mod search;

pub use auth::auth_middleware;
pub use health::health_routes;
pub use networks::{delete_network, edit_network, list_networks, list_tags, network_info, network_raw, submit_network};
pub use search::search;

/// Version reported in every response body and checked on search requests
pub const API_VERSION: &str = "1";
