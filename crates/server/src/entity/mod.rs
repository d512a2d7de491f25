//! SeaORM entities for the identity tables.

pub mod service_client;
pub mod users;
