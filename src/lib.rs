#![doc = include_str!("../README.md")]

pub mod appliance;
pub mod client;
pub mod config;
pub mod error;
pub mod pkce;

mod graphql;
mod login;
mod token;

// Re-exports for convenient access
pub use appliance::{Appliance, ApplianceState, Room, SensorKind};
pub use client::MilaClient;
pub use config::MilaConfig;
pub use error::Error;
pub use graphql::Profile;
pub use pkce::PkceChallenge;
pub use token::TokenResponse;
