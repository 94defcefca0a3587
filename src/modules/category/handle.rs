use actix_web::{get, web};

use crate::{
    api::{error, success},
    modules::category::{
        repository_pg::CategoryRepositoryPg, schema::CategoryEntity, service::CategoryService,
    },
};

pub type CategorySvc = CategoryService<CategoryRepositoryPg>;

#[get("/all")]
pub async fn get_categories(
    category_svc: web::Data<CategorySvc>,
) -> Result<success::Success<Vec<CategoryEntity>>, error::Error> {
    let categories = category_svc.list().await?;
    Ok(success::Success::ok(Some(categories)))
}
