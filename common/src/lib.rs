pub mod access_rules;
pub mod auth;
pub mod auth_session;
pub mod context;
pub mod entities;
pub mod error;
pub mod geo;
pub mod repository;
pub mod retry;
pub mod verification;
