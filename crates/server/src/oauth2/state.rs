//! Shared state for the token endpoints.

use crate::config::AuthenticationConfig;
use crate::error::AuthError;
use crate::oauth2::client_credentials::ClientCredentialsGrant;
use crate::oauth2::directory::{ClientDirectory, DbClientDirectory, DbUserDirectory, UserDirectory};
use crate::oauth2::sign_in::PasswordGrant;
use crate::oauth2::token::TokenIssuer;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Both grants, wired to one issuer so user and service tokens share a key.
#[derive(Clone)]
pub struct OAuth2State {
    pub client_credentials: Arc<ClientCredentialsGrant>,
    pub password: Arc<PasswordGrant>,
}

impl OAuth2State {
    /// Build the grants over the database-backed directories.
    pub fn new(db: Arc<DatabaseConnection>, config: &AuthenticationConfig) -> Result<Self, AuthError> {
        Self::with_directories(
            Arc::new(DbClientDirectory::new(db.clone())),
            Arc::new(DbUserDirectory::new(db)),
            config,
        )
    }

    pub fn with_directories(
        clients: Arc<dyn ClientDirectory>,
        users: Arc<dyn UserDirectory>,
        config: &AuthenticationConfig,
    ) -> Result<Self, AuthError> {
        let issuer = Arc::new(TokenIssuer::from_config(&config.jwt)?);
        let client_credentials = ClientCredentialsGrant::new(clients, issuer.clone())
            .with_fatal_usage_writes(config.usage_write_failure_fatal);

        Ok(Self {
            client_credentials: Arc::new(client_credentials),
            password: Arc::new(PasswordGrant::new(users, issuer)),
        })
    }
}
