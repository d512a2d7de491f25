//! OpenAPI/Utoipa configuration.

use crate::api::health::MISC_TAG;
use crate::oauth2::OAUTH2_TAG;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{
        ClientCredentials, Flow, HttpAuthScheme, HttpBuilder, OAuth2, Scopes, SecurityScheme,
    },
};

/// Security schemes for the issued tokens.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        let bearer = HttpBuilder::new()
            .scheme(HttpAuthScheme::Bearer)
            .bearer_format("JWT")
            .description(Some(
                "Token obtained from `/v1/signin` or `/v1/token`, sent to downstream services.",
            ))
            .build();
        components.add_security_scheme("Authorization", SecurityScheme::Http(bearer));

        // Scopes are per client and stored in the database, so none are listed.
        let oauth2 = OAuth2::new([Flow::ClientCredentials(ClientCredentials::new(
            "/v1/token",
            Scopes::new(),
        ))]);
        components.add_security_scheme("OAuth2", SecurityScheme::OAuth2(oauth2));
    }
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "TechFood Auth API",
        version = "1.0.0",
        description = "Issues bearer tokens to TechFood users and service clients."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = OAUTH2_TAG, description = "Token issuance endpoints")
    )
)]
pub struct ApiDoc;
