use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{
        model::{AdminUserRow, InsertUser, PublicSellerRow, UpdateProfileModel},
        repository::UserRepository,
        schema::{UserEntity, UserRole},
    },
};

const ADMIN_COLUMNS: &str =
    "id, username, email, phone, school, student_id, role, active, created_at";

#[derive(Clone)]
pub struct UserRepositoryPg {
    pool: sqlx::PgPool,
}

impl UserRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryPg {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, error::SystemError> {
        let user =
            sqlx::query_as::<_, UserEntity>("SELECT * FROM users WHERE lower(email) = lower($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn create(&self, user: &InsertUser) -> Result<UserEntity, error::SystemError> {
        let id = Uuid::now_v7();
        let user = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (id, username, email, hash_password, phone)
            VALUES ($1, $2, lower($3), $4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.hash_password)
        .bind(&user.phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: &Uuid,
        profile: &UpdateProfileModel,
    ) -> Result<UserEntity, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>(
            r#"
            UPDATE users
            SET
                name       = CASE WHEN $2::boolean THEN $3 ELSE name END,
                phone      = CASE WHEN $4::boolean THEN $5 ELSE phone END,
                school     = CASE WHEN $6::boolean THEN $7 ELSE school END,
                student_id = CASE WHEN $8::boolean THEN $9 ELSE student_id END,
                address    = CASE WHEN $10::boolean THEN $11 ELSE address END,
                age        = CASE WHEN $12::boolean THEN $13 ELSE age END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(profile.name.is_some())
        .bind(profile.name.as_ref().and_then(|v| v.as_ref()))
        .bind(profile.phone.is_some())
        .bind(profile.phone.as_ref().and_then(|v| v.as_ref()))
        .bind(profile.school.is_some())
        .bind(profile.school.as_ref().and_then(|v| v.as_ref()))
        .bind(profile.student_id.is_some())
        .bind(profile.student_id.as_ref().and_then(|v| v.as_ref()))
        .bind(profile.address.is_some())
        .bind(profile.address.as_ref().and_then(|v| v.as_ref()))
        .bind(profile.age.is_some())
        .bind(profile.age.flatten())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        Ok(user)
    }

    async fn update_password(&self, id: &Uuid, hash: &str) -> Result<bool, error::SystemError> {
        let rows = sqlx::query(
            "UPDATE users SET hash_password = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(hash)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    async fn replace_avatar(
        &self,
        id: &Uuid,
        path: &str,
    ) -> Result<Option<Option<String>>, error::SystemError> {
        let previous = sqlx::query_scalar::<_, Option<String>>(
            r#"
            UPDATE users u
            SET avatar_path = $2, updated_at = NOW()
            FROM (SELECT id, avatar_path FROM users WHERE id = $1 FOR UPDATE) old
            WHERE u.id = old.id
            RETURNING old.avatar_path
            "#,
        )
        .bind(id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(previous)
    }

    async fn touch_last_seen(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query(
            r#"
            UPDATE users SET last_seen_at = NOW()
            WHERE id = $1
              AND (last_seen_at IS NULL OR last_seen_at < NOW() - INTERVAL '2 minutes')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    async fn find_public_seller(
        &self,
        id: &Uuid,
    ) -> Result<Option<PublicSellerRow>, error::SystemError> {
        let seller = sqlx::query_as::<_, PublicSellerRow>(
            r#"
            SELECT
                u.id, u.username, u.name, u.phone, u.address, u.avatar_path, u.role,
                u.last_seen_at,
                COALESCE((SELECT SUM(p.sold_count) FROM products p WHERE p.seller_id = u.id), 0)::BIGINT
                    AS total_sold,
                COALESCE(ROUND(AVG(r.rating)::numeric, 2), 0)::FLOAT8 AS seller_rating_avg,
                COUNT(r.id) AS seller_rating_count
            FROM users u
            LEFT JOIN products p ON p.seller_id = u.id
            LEFT JOIN product_reviews r ON r.product_id = p.id
            WHERE u.id = $1
            GROUP BY u.id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(seller)
    }

    async fn search(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AdminUserRow>, i64), error::SystemError> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let filter = r#"
            ($1 = '%%'
                OR username ILIKE $1
                OR email ILIKE $1
                OR COALESCE(phone, '') ILIKE $1)
        "#;

        let items = sqlx::query_as::<_, AdminUserRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM users WHERE {filter} ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {filter}"))
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;

        Ok((items, total))
    }

    async fn update_role(
        &self,
        id: &Uuid,
        role: UserRole,
    ) -> Result<Option<AdminUserRow>, error::SystemError> {
        let user = sqlx::query_as::<_, AdminUserRow>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_active(
        &self,
        id: &Uuid,
        active: bool,
    ) -> Result<Option<AdminUserRow>, error::SystemError> {
        let user = sqlx::query_as::<_, AdminUserRow>(&format!(
            "UPDATE users SET active = $2, updated_at = NOW() WHERE id = $1 RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
