//! Seeding and administration of service clients and users.
//!
//! Backs the `client-manager` binary. Plaintext secrets exist only in the
//! return values here; the database sees Argon2id hashes.

use crate::entity::{service_client, users};
use crate::error::ProvisioningError;
use crate::oauth2::password::{CredentialHasher, generate_client_secret};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder,
};
use std::sync::Arc;
use time::OffsetDateTime;

/// Input for [`Provisioner::create_client`].
#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    /// Derived from `name` when absent.
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
}

/// A freshly created client and its one-time plaintext secret.
#[derive(Debug)]
pub struct CreatedClient {
    pub client: service_client::Model,
    pub secret: String,
}

/// Input for [`Provisioner::add_user`].
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
    pub password: String,
}

/// Turn a display name into a client id: lower case, spaces and underscores become `-`.
pub fn derive_client_id(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .collect()
}

fn non_blank(value: &str, field: &str) -> Result<String, ProvisioningError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProvisioningError::InvalidInput(format!(
            "{field} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn new_secret() -> Result<String, ProvisioningError> {
    generate_client_secret()
        .map_err(|e| ProvisioningError::Hash(format!("random source unavailable: {e}")))
}

pub struct Provisioner {
    db: Arc<DatabaseConnection>,
    hasher: CredentialHasher,
}

impl Provisioner {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            hasher: CredentialHasher::default(),
        }
    }

    /// Use a specific hasher (tests use cheap parameters).
    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    fn hash(&self, plaintext: &str) -> Result<String, ProvisioningError> {
        self.hasher
            .hash(plaintext)
            .map_err(|e| ProvisioningError::Hash(e.to_string()))
    }

    async fn find_client(
        &self,
        client_id: &str,
    ) -> Result<service_client::Model, ProvisioningError> {
        service_client::Entity::find()
            .filter(service_client::Column::ClientId.eq(client_id))
            .filter(service_client::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ProvisioningError::ClientNotFound(client_id.to_string()))
    }

    /// Create a service client with a random secret.
    #[tracing::instrument(skip_all, fields(name = %input.name))]
    pub async fn create_client(&self, input: NewClient) -> Result<CreatedClient, ProvisioningError> {
        let name = non_blank(&input.name, "name")?;
        let client_id = match input.client_id.as_deref() {
            Some(id) => non_blank(id, "client id")?,
            None => derive_client_id(&name),
        };

        let taken = service_client::Entity::find()
            .filter(service_client::Column::ClientId.eq(&client_id))
            .filter(service_client::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?
            .is_some();
        if taken {
            return Err(ProvisioningError::ClientIdTaken(client_id));
        }

        let scopes: Vec<&str> = input
            .scopes
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        let secret = new_secret()?;
        let client = service_client::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            client_id: Set(client_id),
            secret_hash: Set(self.hash(&secret)?),
            name: Set(name),
            scopes: Set(scopes.join(" ")),
            is_active: Set(true),
            is_deleted: Set(false),
            created_at: Set(OffsetDateTime::now_utc()),
            last_used_at: Set(None),
        }
        .insert(self.db.as_ref())
        .await?;

        tracing::info!(client_id = %client.client_id, "created service client");
        Ok(CreatedClient { client, secret })
    }

    /// All non-deleted clients, newest first.
    pub async fn list_clients(&self) -> Result<Vec<service_client::Model>, ProvisioningError> {
        let clients = service_client::Entity::find()
            .filter(service_client::Column::IsDeleted.eq(false))
            .order_by_desc(service_client::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(clients)
    }

    /// Flip a client's active flag. Fails if it is already in the requested state.
    #[tracing::instrument(skip(self))]
    pub async fn set_active(
        &self,
        client_id: &str,
        active: bool,
    ) -> Result<service_client::Model, ProvisioningError> {
        let client = self.find_client(client_id).await?;
        match (client.is_active, active) {
            (true, true) => return Err(ProvisioningError::AlreadyActive(client_id.to_string())),
            (false, false) => {
                return Err(ProvisioningError::AlreadyInactive(client_id.to_string()));
            }
            _ => {}
        }

        let mut model: service_client::ActiveModel = client.into();
        model.is_active = Set(active);
        let updated = model.update(self.db.as_ref()).await?;

        tracing::info!(active, "updated service client status");
        Ok(updated)
    }

    /// Replace a client's secret. Returns the new plaintext secret.
    #[tracing::instrument(skip(self))]
    pub async fn rotate_secret(&self, client_id: &str) -> Result<String, ProvisioningError> {
        let client = self.find_client(client_id).await?;
        let secret = new_secret()?;

        let mut model: service_client::ActiveModel = client.into();
        model.secret_hash = Set(self.hash(&secret)?);
        model.update(self.db.as_ref()).await?;

        tracing::info!("rotated client secret");
        Ok(secret)
    }

    /// Create a human user who can sign in with `password`.
    #[tracing::instrument(skip_all, fields(username = %input.username))]
    pub async fn add_user(&self, input: NewUser) -> Result<users::Model, ProvisioningError> {
        let username = non_blank(&input.username, "username")?;
        let full_name = non_blank(&input.full_name, "full name")?;
        let role = non_blank(&input.role, "role")?;
        if input.password.is_empty() {
            return Err(ProvisioningError::InvalidInput(
                "password must not be empty".into(),
            ));
        }
        let email = input
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        let taken = users::Entity::find()
            .filter(users::Column::Username.eq(&username))
            .one(self.db.as_ref())
            .await?
            .is_some();
        if taken {
            return Err(ProvisioningError::UsernameTaken(username));
        }

        let user = users::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            full_name: Set(full_name),
            username: Set(username),
            email: Set(email),
            password_hash: Set(self.hash(&input.password)?),
            role: Set(role),
            is_deleted: Set(false),
        }
        .insert(self.db.as_ref())
        .await?;

        tracing::info!(user_id = %user.id, "created user");
        Ok(user)
    }
}
