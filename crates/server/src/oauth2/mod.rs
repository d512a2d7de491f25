//! Token issuance.
//!
//! Two grants share one [`token::TokenIssuer`]:
//!
//! - client credentials (`POST /v1/token`) for service clients, with scopes
//! - password sign-in (`POST /v1/signin`) for human users
//!
//! Both verify Argon2id hashes through [`password`] and read identities through
//! the [`directory`] traits, so neither touches the database directly.

pub mod client_credentials;
pub mod directory;
pub mod endpoints;
pub mod password;
pub mod scope;
pub mod sign_in;
mod state;
pub mod token;

pub use client_credentials::{ClientCredentialsGrant, ClientCredentialsRequest};
pub use endpoints::router;
pub use password::{Verification, generate_client_secret, hash_secret, verify_secret};
pub use sign_in::{PasswordGrant, SignInRequest, SignInResult, UserProfile};
pub use state::OAuth2State;
pub use token::{Claim, IssuedToken, TokenIssuer};

/// OpenAPI tag for token endpoints
pub const OAUTH2_TAG: &str = "OAuth2";
