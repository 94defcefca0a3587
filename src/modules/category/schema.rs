use serde::Serialize;
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryEntity {
    pub id: i32,
    pub name: String,
    pub slug: String,
}
