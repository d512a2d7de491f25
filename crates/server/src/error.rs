use thiserror::Error;

/// Failures raised while authenticating a caller or issuing a token.
///
/// `InvalidCredentials` deliberately carries no detail: unknown identities,
/// inactive clients and wrong secrets all look the same from the outside.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Unauthorized scopes: {}", .0.join(", "))]
    UnauthorizedScope(Vec<String>),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl AuthError {
    /// True for the failures a caller can fix by changing its request.
    ///
    /// Everything else is an operator problem and is reported without detail.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials | AuthError::UnauthorizedScope(_)
        )
    }
}

/// Failures of the identity stores backing the client and user directories.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the provisioning tooling.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("Client ID '{0}' is already in use")]
    ClientIdTaken(String),
    #[error("Username '{0}' is already in use")]
    UsernameTaken(String),
    #[error("Client '{0}' not found")]
    ClientNotFound(String),
    #[error("Client '{0}' is already active")]
    AlreadyActive(String),
    #[error("Client '{0}' is already inactive")]
    AlreadyInactive(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Failed to hash secret: {0}")]
    Hash(String),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}
