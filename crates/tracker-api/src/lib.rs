pub mod analytics;
pub mod applications;
pub mod auth;
pub mod error;
pub mod filter;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod validation;
