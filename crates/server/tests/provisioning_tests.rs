//! Provisioning tests (the logic behind `client-manager`).

use argon2::Params;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database, EntityTrait};
use std::sync::Arc;
use techfood_auth::entity::{service_client, users};
use techfood_auth::error::ProvisioningError;
use techfood_auth::oauth2::password::{CredentialHasher, Verification, verify_secret};
use techfood_auth::provisioning::{NewClient, NewUser, Provisioner};
use time::{Duration, OffsetDateTime};

fn cheap_hasher() -> CredentialHasher {
    CredentialHasher::new(Params::new(1024, 1, 1, None).unwrap())
}

async fn provisioner() -> Provisioner {
    let db = Database::connect("sqlite::memory:").await.expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    Provisioner::new(Arc::new(db)).with_hasher(cheap_hasher())
}

fn client(name: &str, scopes: &[&str]) -> NewClient {
    NewClient {
        name: name.to_string(),
        client_id: None,
        scopes: scopes.iter().map(|s| s.to_string()).collect(),
    }
}

#[tokio::test]
async fn test_create_client_stores_only_the_hash() {
    let p = provisioner().await;

    let created = p
        .create_client(client("Order Service", &["orders.read", " orders.write ", ""]))
        .await
        .expect("create");

    assert_eq!(created.client.client_id, "order-service");
    assert_eq!(created.client.name, "Order Service");
    assert_eq!(
        created.client.scopes_list(),
        vec!["orders.read", "orders.write"]
    );
    assert!(created.client.is_active);
    assert!(created.client.last_used_at.is_none());

    assert_ne!(created.client.secret_hash, created.secret);
    assert!(created.client.secret_hash.starts_with("$argon2id$"));
    assert_eq!(
        cheap_hasher().verify(&created.client.secret_hash, &created.secret),
        Verification::Success
    );
    // Hashed below the default work factor, so the default verifier asks for a rehash.
    assert_eq!(
        verify_secret(&created.client.secret_hash, &created.secret),
        Verification::SuccessRehashNeeded
    );
}

#[tokio::test]
async fn test_explicit_client_id_is_kept() {
    let p = provisioner().await;
    let created = p
        .create_client(NewClient {
            name: "Kitchen Display".into(),
            client_id: Some("kds-01".into()),
            scopes: vec![],
        })
        .await
        .expect("create");
    assert_eq!(created.client.client_id, "kds-01");
    assert_eq!(created.client.scopes, "");
}

#[tokio::test]
async fn test_duplicate_client_id_is_rejected() {
    let p = provisioner().await;
    p.create_client(client("Order Service", &[])).await.expect("create");

    let err = p
        .create_client(client("order_service", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisioningError::ClientIdTaken(id) if id == "order-service"));
}

#[tokio::test]
async fn test_soft_deleted_client_id_can_be_reused() {
    let db = Database::connect("sqlite::memory:").await.expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    let db = Arc::new(db);

    service_client::ActiveModel {
        id: Set("retired".to_string()),
        client_id: Set("order-service".to_string()),
        secret_hash: Set("$argon2id$placeholder".to_string()),
        name: Set("Order Service".to_string()),
        scopes: Set(String::new()),
        is_active: Set(false),
        is_deleted: Set(true),
        created_at: Set(OffsetDateTime::now_utc()),
        last_used_at: Set(None),
    }
    .insert(db.as_ref())
    .await
    .expect("insert deleted client");

    let p = Provisioner::new(db.clone()).with_hasher(cheap_hasher());
    let created = p
        .create_client(client("Order Service", &["orders.read"]))
        .await
        .expect("id of a deleted client is free again");
    assert_eq!(created.client.client_id, "order-service");
    assert_ne!(created.client.id, "retired");

    // The live client now holds the id.
    let err = p
        .create_client(client("Order Service", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisioningError::ClientIdTaken(_)));

    let rows = service_client::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_blank_name_is_rejected() {
    let p = provisioner().await;
    let err = p.create_client(client("   ", &[])).await.unwrap_err();
    assert!(matches!(err, ProvisioningError::InvalidInput(_)));
}

#[tokio::test]
async fn test_list_is_newest_first_and_skips_deleted() {
    let db = Database::connect("sqlite::memory:").await.expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    let db = Arc::new(db);

    let now = OffsetDateTime::now_utc();
    for (id, age_days, deleted) in [("old", 3, false), ("new", 1, false), ("gone", 0, true)] {
        service_client::ActiveModel {
            id: Set(id.to_string()),
            client_id: Set(id.to_string()),
            secret_hash: Set("$argon2id$placeholder".to_string()),
            name: Set(id.to_string()),
            scopes: Set(String::new()),
            is_active: Set(true),
            is_deleted: Set(deleted),
            created_at: Set(now - Duration::days(age_days)),
            last_used_at: Set(None),
        }
        .insert(db.as_ref())
        .await
        .expect("insert");
    }

    let listed = Provisioner::new(db).list_clients().await.expect("list");
    let ids: Vec<&str> = listed.iter().map(|c| c.client_id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
}

#[tokio::test]
async fn test_deactivate_and_reactivate() {
    let p = provisioner().await;
    p.create_client(client("Payments", &[])).await.expect("create");

    let off = p.set_active("payments", false).await.expect("deactivate");
    assert!(!off.is_active);

    let err = p.set_active("payments", false).await.unwrap_err();
    assert!(matches!(err, ProvisioningError::AlreadyInactive(_)));

    let on = p.set_active("payments", true).await.expect("reactivate");
    assert!(on.is_active);

    let err = p.set_active("payments", true).await.unwrap_err();
    assert!(matches!(err, ProvisioningError::AlreadyActive(_)));

    let err = p.set_active("missing", true).await.unwrap_err();
    assert!(matches!(err, ProvisioningError::ClientNotFound(_)));
}

#[tokio::test]
async fn test_rotate_secret_invalidates_old_one() {
    let p = provisioner().await;
    let created = p.create_client(client("Payments", &[])).await.expect("create");

    let rotated = p.rotate_secret("payments").await.expect("rotate");
    assert_ne!(rotated, created.secret);

    let stored = p
        .list_clients()
        .await
        .expect("list")
        .into_iter()
        .find(|c| c.client_id == "payments")
        .expect("client");
    assert_eq!(
        verify_secret(&stored.secret_hash, &created.secret),
        Verification::Failed
    );
    assert_eq!(
        cheap_hasher().verify(&stored.secret_hash, &rotated),
        Verification::Success
    );
}

#[tokio::test]
async fn test_add_user_hashes_password() {
    let db = Database::connect("sqlite::memory:").await.expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    let db = Arc::new(db);
    let p = Provisioner::new(db.clone()).with_hasher(cheap_hasher());

    let user = p
        .add_user(NewUser {
            username: "john.admin".into(),
            full_name: "John Admin".into(),
            email: Some("  ".into()),
            role: "admin".into(),
            password: "admin".into(),
        })
        .await
        .expect("add user");

    assert_eq!(user.email, None);
    let stored = users::Entity::find_by_id(user.id.clone())
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert!(verify_secret(&stored.password_hash, "admin").is_success());

    let err = p
        .add_user(NewUser {
            username: "john.admin".into(),
            full_name: "Someone Else".into(),
            email: None,
            role: "staff".into(),
            password: "x".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisioningError::UsernameTaken(_)));
}
