use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{ENV, api::error};

pub async fn connect_database() -> Result<PgPool, error::SystemError> {
    let database_url = &ENV.database_url;
    let pool = PgPoolOptions::new()
        .max_connections(ENV.database_max_connections)
        .min_connections(1)
        .acquire_slow_threshold(std::time::Duration::from_secs(3))
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| error::SystemError::InternalError(Box::new(e)))?;

    log::info!("Database connected and migrations applied");
    Ok(pool)
}

/// Pool that never opens a connection, for repositories whose queries are stubbed
#[cfg(test)]
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new().connect_lazy("postgres://localhost/campus_market").unwrap()
}
