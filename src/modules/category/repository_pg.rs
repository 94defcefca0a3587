use crate::{
    api::error,
    modules::category::{repository::CategoryRepository, schema::CategoryEntity},
};

#[derive(Clone)]
pub struct CategoryRepositoryPg {
    pool: sqlx::PgPool,
}

impl CategoryRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CategoryRepository for CategoryRepositoryPg {
    async fn find_all(&self) -> Result<Vec<CategoryEntity>, error::SystemError> {
        let categories = sqlx::query_as::<_, CategoryEntity>(
            "SELECT id, name, slug FROM categories ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }
}
