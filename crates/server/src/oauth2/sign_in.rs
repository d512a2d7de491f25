//! Password grant for human users.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::entity::users;
use crate::error::AuthError;
use crate::oauth2::directory::UserDirectory;
use crate::oauth2::password::{Verification, verify_secret};
use crate::oauth2::token::{Claim, TOKEN_TYPE_BEARER, TokenIssuer};

#[derive(Debug, Clone)]
pub struct SignInRequest {
    /// Username or email address.
    pub username: String,
    pub password: String,
}

/// Public profile returned alongside a user token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
}

impl From<users::Model> for UserProfile {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.full_name,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignInResult {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

pub struct PasswordGrant {
    users: Arc<dyn UserDirectory>,
    issuer: Arc<TokenIssuer>,
}

impl PasswordGrant {
    pub fn new(users: Arc<dyn UserDirectory>, issuer: Arc<TokenIssuer>) -> Self {
        Self { users, issuer }
    }

    #[tracing::instrument(skip_all, fields(login = %request.username))]
    pub async fn execute(&self, request: &SignInRequest) -> Result<SignInResult, AuthError> {
        let Some(user) = self
            .users
            .find_by_username_or_email(&request.username)
            .await?
        else {
            tracing::info!("rejected sign-in for unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        match verify_secret(&user.password_hash, &request.password) {
            Verification::Success => {}
            Verification::SuccessRehashNeeded => {
                tracing::debug!(user_id = %user.id, "password hash uses outdated parameters");
            }
            Verification::Failed => {
                tracing::info!(user_id = %user.id, "rejected sign-in with wrong password");
                return Err(AuthError::InvalidCredentials);
            }
        }

        let claims = [
            Claim::new("role", &user.role),
            Claim::new("username", &user.username),
        ];
        let signed = self.issuer.issue(&user.id, &claims)?;

        tracing::info!(user_id = %user.id, token_id = %signed.token_id, "issued user token");

        Ok(SignInResult {
            access_token: signed.token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: signed.expires_in,
            user: user.into(),
        })
    }
}
