use crate::{api::error, modules::category::schema::CategoryEntity};

#[async_trait::async_trait]
pub trait CategoryRepository {
    async fn find_all(&self) -> Result<Vec<CategoryEntity>, error::SystemError>;
}
