use std::sync::Arc;

use crate::{
    api::error,
    modules::category::{repository::CategoryRepository, schema::CategoryEntity},
};

#[derive(Clone)]
pub struct CategoryService<R>
where
    R: CategoryRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
}

impl<R> CategoryService<R>
where
    R: CategoryRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(repo: Arc<R>) -> Self {
        CategoryService { repo }
    }

    pub async fn list(&self) -> Result<Vec<CategoryEntity>, error::SystemError> {
        self.repo.find_all().await
    }
}
