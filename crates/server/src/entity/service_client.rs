//! Service client entity - machine identities for the client credentials grant.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::oauth2::scope;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_client")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Public identifier presented by the client (case-sensitive), unique among non-deleted rows
    pub client_id: String,
    /// Argon2 PHC string; never leaves the service
    #[serde(skip_serializing)]
    pub secret_hash: String,
    /// Human-readable client name
    pub name: String,
    /// Allowed scopes, separated by whitespace or commas
    pub scopes: String,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: OffsetDateTime,
    pub last_used_at: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The authorization ceiling for this client.
    pub fn scopes_list(&self) -> Vec<String> {
        scope::parse_allowed(&self.scopes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(scopes: &str) -> Model {
        Model {
            id: "a1b2c3d4".into(),
            client_id: "test-client".into(),
            secret_hash: "hash".into(),
            name: "Test Client".into(),
            scopes: scopes.into(),
            is_active: true,
            is_deleted: false,
            created_at: OffsetDateTime::now_utc(),
            last_used_at: None,
        }
    }

    #[test]
    fn scopes_keep_stored_spelling() {
        let c = client("READ  write\tdelete");
        assert_eq!(c.scopes_list(), vec!["READ", "write", "delete"]);
    }

    #[test]
    fn scopes_accept_comma_separated_storage() {
        let c = client("orders.read,orders.write, users.read");
        assert_eq!(
            c.scopes_list(),
            vec!["orders.read", "orders.write", "users.read"]
        );
    }

    #[test]
    fn secret_hash_is_not_serialized() {
        let json = serde_json::to_value(client("read")).unwrap();
        assert!(json.get("secret_hash").is_none());
        assert_eq!(json["client_id"], "test-client");
    }
}
