//! Identity directories consulted by the grants.
//!
//! The grants only see these traits. The SeaORM-backed implementations below
//! never return soft-deleted rows, so nothing upstream has to filter them.

use crate::entity::{service_client, users};
use crate::error::DirectoryError;
use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, sea_query::Expr,
};
use std::sync::Arc;
use time::OffsetDateTime;

/// Lookup and usage tracking for machine clients.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Find a non-deleted client by its public identifier (exact match).
    async fn find_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<service_client::Model>, DirectoryError>;

    /// Record a successful authentication for the client with primary key `id`.
    async fn touch_last_used(&self, id: &str, at: OffsetDateTime) -> Result<(), DirectoryError>;
}

/// Lookup of human accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a non-deleted user whose username or email equals `login`.
    async fn find_by_username_or_email(
        &self,
        login: &str,
    ) -> Result<Option<users::Model>, DirectoryError>;
}

/// Database-backed client directory.
#[derive(Clone)]
pub struct DbClientDirectory {
    db: Arc<DatabaseConnection>,
}

impl DbClientDirectory {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ClientDirectory for DbClientDirectory {
    async fn find_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<service_client::Model>, DirectoryError> {
        let client = service_client::Entity::find()
            .filter(service_client::Column::ClientId.eq(client_id))
            .filter(service_client::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?;
        Ok(client)
    }

    async fn touch_last_used(&self, id: &str, at: OffsetDateTime) -> Result<(), DirectoryError> {
        // Single-row UPDATE; concurrent writers simply race and the last one wins.
        service_client::Entity::update_many()
            .col_expr(service_client::Column::LastUsedAt, Expr::value(Some(at)))
            .filter(service_client::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}

/// Database-backed user directory.
#[derive(Clone)]
pub struct DbUserDirectory {
    db: Arc<DatabaseConnection>,
}

impl DbUserDirectory {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for DbUserDirectory {
    async fn find_by_username_or_email(
        &self,
        login: &str,
    ) -> Result<Option<users::Model>, DirectoryError> {
        let user = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(login))
                    .add(users::Column::Email.eq(login)),
            )
            .filter(users::Column::IsDeleted.eq(false))
            .one(self.db.as_ref())
            .await?;
        Ok(user)
    }
}
