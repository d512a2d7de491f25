//! Database-backed directory tests.

use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database, DatabaseConnection, EntityTrait};
use std::sync::Arc;
use techfood_auth::entity::{service_client, users};
use techfood_auth::oauth2::directory::{
    ClientDirectory, DbClientDirectory, DbUserDirectory, UserDirectory,
};
use time::OffsetDateTime;

async fn create_test_db() -> Arc<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await.expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    Arc::new(db)
}

async fn insert_client(db: &DatabaseConnection, id: &str, client_id: &str, deleted: bool) {
    service_client::ActiveModel {
        id: Set(id.to_string()),
        client_id: Set(client_id.to_string()),
        secret_hash: Set("$argon2id$placeholder".to_string()),
        name: Set("Kitchen Display".to_string()),
        scopes: Set("orders.read".to_string()),
        is_active: Set(true),
        is_deleted: Set(deleted),
        created_at: Set(OffsetDateTime::now_utc()),
        last_used_at: Set(None),
    }
    .insert(db)
    .await
    .expect("insert client");
}

async fn insert_user(
    db: &DatabaseConnection,
    id: &str,
    username: &str,
    email: Option<&str>,
    deleted: bool,
) {
    users::ActiveModel {
        id: Set(id.to_string()),
        full_name: Set("Jane Cook".to_string()),
        username: Set(username.to_string()),
        email: Set(email.map(String::from)),
        password_hash: Set("$argon2id$placeholder".to_string()),
        role: Set("staff".to_string()),
        is_deleted: Set(deleted),
    }
    .insert(db)
    .await
    .expect("insert user");
}

#[tokio::test]
async fn test_find_client_by_exact_client_id() {
    let db = create_test_db().await;
    insert_client(&db, "c1", "kitchen-display", false).await;
    let directory = DbClientDirectory::new(db.clone());

    let found = directory
        .find_by_client_id("kitchen-display")
        .await
        .expect("lookup");
    assert_eq!(found.map(|c| c.id), Some("c1".to_string()));

    let missing = directory
        .find_by_client_id("Kitchen-Display")
        .await
        .expect("lookup");
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_deleted_client_is_invisible() {
    let db = create_test_db().await;
    insert_client(&db, "c1", "retired", true).await;
    let directory = DbClientDirectory::new(db);

    assert!(directory.find_by_client_id("retired").await.unwrap().is_none());
}

#[tokio::test]
async fn test_touch_last_used_updates_only_that_client() {
    let db = create_test_db().await;
    insert_client(&db, "c1", "first", false).await;
    insert_client(&db, "c2", "second", false).await;
    let directory = DbClientDirectory::new(db.clone());

    let at = OffsetDateTime::now_utc();
    directory.touch_last_used("c1", at).await.expect("touch");

    let first = service_client::Entity::find_by_id("c1")
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let second = service_client::Entity::find_by_id("c2")
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();

    let recorded = first.last_used_at.expect("last_used_at set");
    assert_eq!(recorded.unix_timestamp(), at.unix_timestamp());
    assert!(second.last_used_at.is_none());
}

#[tokio::test]
async fn test_find_user_by_username_or_email() {
    let db = create_test_db().await;
    insert_user(&db, "u1", "jane.cook", Some("jane@techfood.test"), false).await;
    let directory = DbUserDirectory::new(db);

    let by_name = directory.find_by_username_or_email("jane.cook").await.unwrap();
    let by_email = directory
        .find_by_username_or_email("jane@techfood.test")
        .await
        .unwrap();

    assert_eq!(by_name.map(|u| u.id), Some("u1".to_string()));
    assert_eq!(by_email.map(|u| u.id), Some("u1".to_string()));
    assert!(
        directory
            .find_by_username_or_email("nobody")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_deleted_user_is_invisible() {
    let db = create_test_db().await;
    insert_user(&db, "u1", "gone", None, true).await;
    let directory = DbUserDirectory::new(db);

    assert!(
        directory
            .find_by_username_or_email("gone")
            .await
            .unwrap()
            .is_none()
    );
}
