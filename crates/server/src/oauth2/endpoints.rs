//! Token HTTP endpoints.
//!
//! - `POST /v1/token` - client credentials grant
//! - `POST /v1/signin` - password grant
//!
//! Request shape is checked here; everything past that is the grants' business.

use crate::error::AuthError;
use crate::oauth2::client_credentials::ClientCredentialsRequest;
use crate::oauth2::sign_in::{SignInRequest, UserProfile};
use crate::oauth2::{OAUTH2_TAG, state::OAuth2State};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

pub const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";

/// Creates the token router.
pub fn router(state: OAuth2State) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(token))
        .routes(routes!(sign_in))
        .with_state(state)
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Only `client_credentials` is supported.
    #[serde(default = "default_grant_type")]
    pub grant_type: String,
    /// Space-separated scopes. Omit to receive every scope the client is allowed.
    pub scope: Option<String>,
}

fn default_grant_type() -> String {
    GRANT_CLIENT_CREDENTIALS.to_string()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInBody {
    /// Username or email address.
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignInResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

fn error_response(status: StatusCode, error: &str, description: Option<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            error_description: description,
        }),
    )
        .into_response()
}

fn invalid_request(description: impl Into<String>) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        "invalid_request",
        Some(description.into()),
    )
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_authentication_failure() {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                Some(self.to_string()),
            );
        }
        tracing::error!(error = %self, "token request failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "server_error", None)
    }
}

/// `None` when the value is missing or blank.
fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// =============================================================================
// Endpoints
// =============================================================================

/// Client credentials token endpoint.
#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/v1/token",
    tag = OAUTH2_TAG,
    operation_id = "Issue Service Token",
    summary = "Exchange client credentials for an access token",
    description = "Authenticates a service client with its `client_id` and `client_secret` and returns a \
                   signed bearer token carrying the granted scopes.\n\n\
                   When `scope` is omitted or blank the token carries every scope the client is allowed. \
                   Requesting any scope outside that set rejects the whole request.",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Malformed request or unsupported grant type", body = ErrorResponse),
        (status = 401, description = "Invalid credentials or unauthorized scope", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse),
    )
)]
pub async fn token(
    State(state): State<OAuth2State>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Response {
    let Json(params) = match payload {
        Ok(p) => p,
        Err(e) => return invalid_request(e.body_text()),
    };

    if params.grant_type != GRANT_CLIENT_CREDENTIALS {
        return error_response(
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
            Some(format!("Grant type '{}' is not supported", params.grant_type)),
        );
    }

    let (Some(client_id), Some(client_secret)) =
        (required(params.client_id), required(params.client_secret))
    else {
        return invalid_request("client_id and client_secret are required");
    };

    let request = ClientCredentialsRequest {
        client_id,
        client_secret,
        scope: params.scope,
    };

    match state.client_credentials.execute(&request).await {
        Ok(issued) => Json(TokenResponse {
            access_token: issued.access_token,
            token_type: issued.token_type,
            expires_in: issued.expires_in,
            scope: issued.scope,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Password sign-in endpoint.
#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/v1/signin",
    tag = OAUTH2_TAG,
    operation_id = "Sign In",
    summary = "Exchange a username and password for an access token",
    description = "Authenticates a user by username or email address and returns a signed bearer token \
                   together with the user's profile.",
    request_body = SignInBody,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse),
    )
)]
pub async fn sign_in(
    State(state): State<OAuth2State>,
    payload: Result<Json<SignInBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(b) => b,
        Err(e) => return invalid_request(e.body_text()),
    };

    let (Some(username), Some(password)) = (required(body.username), required(body.password))
    else {
        return invalid_request("username and password are required");
    };

    match state
        .password
        .execute(&SignInRequest { username, password })
        .await
    {
        Ok(result) => Json(SignInResponse {
            access_token: result.access_token,
            token_type: result.token_type,
            expires_in: result.expires_in,
            user: result.user,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_missing() {
        assert_eq!(required(None), None);
        assert_eq!(required(Some("   ".into())), None);
        assert_eq!(required(Some("svc".into())), Some("svc".into()));
    }

    #[test]
    fn grant_type_defaults_to_client_credentials() {
        let req: TokenRequest =
            serde_json::from_str(r#"{"client_id":"a","client_secret":"b"}"#).unwrap();
        assert_eq!(req.grant_type, "client_credentials");
        assert!(req.scope.is_none());
    }

    #[test]
    fn authentication_failures_map_to_401() {
        let res = AuthError::InvalidCredentials.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = AuthError::UnauthorizedScope(vec!["admin.write".into()]).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn infrastructure_failures_map_to_500() {
        let res = AuthError::Configuration("missing key".into()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
