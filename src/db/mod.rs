pub mod companies;
pub mod connection;
pub mod tenants;
pub mod users;

pub use connection::{ConnectionProvider, TenantConnection};

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;

/// Open the single shared pool. Fresh physical connections start on the
/// default schema, which is where idle connections always sit.
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    let default_schema = config.default_schema.clone();

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .after_connect(move |conn, _meta| {
            let schema = default_schema.clone();
            Box::pin(async move { connection::set_search_path(conn, &schema).await })
        })
        .connect(&config.database_url)
        .await
}
