//! Token issuance service for TechFood users and service clients.
//!
//! Users sign in with a username (or email) and password; service clients use
//! the client credentials grant and receive scoped tokens. Both kinds are
//! HS256 JWTs signed with the same configured key.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

pub mod api;
pub mod config;
pub mod entity;
pub mod error;
pub mod oauth2;
pub mod provisioning;

#[derive(Clone, Debug)]
pub struct AppResources {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
}
