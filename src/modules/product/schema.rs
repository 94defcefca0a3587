use serde::Serialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductEntity {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub category_id: i32,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_path: Option<String>,
    pub stock: i32,
    pub is_available: bool,
    pub sold_count: i32,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReviewEntity {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub content: Option<String>,
    pub images: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Mean rating rounded to two decimals, plus the review count
pub fn rating_aggregate(rating_sum: i64, rating_count: i64) -> (f64, i32) {
    if rating_count <= 0 {
        return (0.0, 0);
    }
    let avg = rating_sum as f64 / rating_count as f64;
    ((avg * 100.0).round() / 100.0, i32::try_from(rating_count).unwrap_or(i32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_of_four_five_three() {
        let ratings: [i64; 3] = [4, 5, 3];
        assert_eq!(rating_aggregate(ratings.iter().sum(), 3), (4.0, 3));
    }

    #[test]
    fn aggregate_is_order_independent_and_rounded() {
        assert_eq!(rating_aggregate(5 + 4 + 4, 3), (4.33, 3));
        assert_eq!(rating_aggregate(4 + 5 + 4, 3), (4.33, 3));
        assert_eq!(rating_aggregate(5 + 4, 2), (4.5, 2));
        assert_eq!(rating_aggregate(2 + 3 + 3, 3), (2.67, 3));
    }

    #[test]
    fn no_reviews_means_zero() {
        assert_eq!(rating_aggregate(0, 0), (0.0, 0));
    }
}
