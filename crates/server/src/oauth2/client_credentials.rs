//! Client credentials grant (machine-to-machine).
//!
//! Lookup, secret check, scope authorization, signing, then a best-effort
//! `last_used_at` write. Nothing is persisted before the token is signed.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::error::AuthError;
use crate::oauth2::directory::ClientDirectory;
use crate::oauth2::password::{Verification, verify_secret};
use crate::oauth2::scope;
use crate::oauth2::token::{Claim, IssuedToken, TOKEN_TYPE_BEARER, TokenIssuer};

/// Marker distinguishing service tokens from user tokens.
pub const SERVICE_TOKEN_TYPE: &str = "service";

#[derive(Debug, Clone)]
pub struct ClientCredentialsRequest {
    pub client_id: String,
    pub client_secret: String,
    /// Space-separated requested scopes; `None` or blank requests everything allowed.
    pub scope: Option<String>,
}

pub struct ClientCredentialsGrant {
    clients: Arc<dyn ClientDirectory>,
    issuer: Arc<TokenIssuer>,
    usage_write_failure_fatal: bool,
}

impl ClientCredentialsGrant {
    pub fn new(clients: Arc<dyn ClientDirectory>, issuer: Arc<TokenIssuer>) -> Self {
        Self {
            clients,
            issuer,
            usage_write_failure_fatal: false,
        }
    }

    /// Make a failed `last_used_at` write fail the whole request.
    pub fn with_fatal_usage_writes(mut self, fatal: bool) -> Self {
        self.usage_write_failure_fatal = fatal;
        self
    }

    #[tracing::instrument(skip_all, fields(client_id = %request.client_id))]
    pub async fn execute(&self, request: &ClientCredentialsRequest) -> Result<IssuedToken, AuthError> {
        let client = match self.clients.find_by_client_id(&request.client_id).await? {
            Some(client) if client.is_active => client,
            Some(_) => {
                tracing::info!("rejected token request for inactive client");
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                tracing::info!("rejected token request for unknown client");
                return Err(AuthError::InvalidCredentials);
            }
        };

        match verify_secret(&client.secret_hash, &request.client_secret) {
            Verification::Success => {}
            Verification::SuccessRehashNeeded => {
                tracing::debug!("client secret hash uses outdated parameters");
            }
            Verification::Failed => {
                tracing::info!("rejected token request with invalid client secret");
                return Err(AuthError::InvalidCredentials);
            }
        }

        let requested = scope::parse_requested(request.scope.as_deref());
        let granted = scope::grant(&requested, &client.scopes_list()).inspect_err(|e| {
            tracing::info!(error = %e, "rejected token request with unauthorized scopes");
        })?;

        let mut claims = vec![
            Claim::new("client_id", &client.client_id),
            Claim::new("client_name", &client.name),
            Claim::new("token_type", SERVICE_TOKEN_TYPE),
        ];
        claims.extend(granted.iter().map(|s| Claim::new("scope", s)));

        let signed = self.issuer.issue(&client.client_id, &claims)?;

        if let Err(e) = self
            .clients
            .touch_last_used(&client.id, OffsetDateTime::now_utc())
            .await
        {
            if self.usage_write_failure_fatal {
                return Err(e.into());
            }
            tracing::warn!(error = %e, "failed to record client usage");
        }

        tracing::info!(
            token_id = %signed.token_id,
            scopes = granted.len(),
            "issued service token"
        );

        Ok(IssuedToken {
            access_token: signed.token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: signed.expires_in,
            scope: granted.join(" "),
        })
    }
}
