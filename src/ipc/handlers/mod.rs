pub mod auth;
pub mod core;
pub mod evaluations;
pub mod events;
pub mod notifications;
pub mod records;
pub mod reports;
pub mod setup;
pub mod workspace;
