//! Seed sample products and coupons for development.

use clementine_server::config::ServerConfig;
use clementine_server::db;

use super::CommandError;

/// Insert a handful of products and coupons.
///
/// Safe to run more than once: products are only inserted into an empty
/// catalog, and coupon inserts skip codes that already exist.
///
/// # Errors
///
/// Returns `CommandError` if configuration, connection, or a query fails.
pub async fn run() -> Result<(), CommandError> {
    let config = ServerConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    let product_count: i64 = sqlx::query_scalar("SELECT count(*) FROM checkout.product")
        .fetch_one(&pool)
        .await?;

    if product_count == 0 {
        sqlx::query(
            r"
            INSERT INTO checkout.product (name, price, sale_price, stock) VALUES
                ('Clementine Crate (5 lb)',  24.99, 0,     120),
                ('Clementine Crate (10 lb)', 44.99, 39.99, 80),
                ('Citrus Sampler Box',       34.50, 0,     45),
                ('Marmalade Gift Jar',       12.00, 9.50,  200),
                ('Canvas Tote',              18.00, 0,     60)
            ",
        )
        .execute(&pool)
        .await?;
        tracing::info!("seeded products");
    } else {
        tracing::info!(product_count, "catalog not empty, skipping products");
    }

    let inserted = sqlx::query(
        r"
        INSERT INTO checkout.coupon
            (code, description, discount_type, discount_amount, min_purchase,
             max_discount, start_date, end_date, is_active, usage_limit)
        VALUES
            ('WELCOME10', '10% off your first order', 'percentage', 10, 0,
             25, now() - interval '1 day', now() + interval '90 days', true, NULL),
            ('FREESHIP',  '$5 off orders over $40',   'fixed',      5,  40,
             NULL, now() - interval '1 day', now() + interval '30 days', true, 500)
        ON CONFLICT (lower(code)) DO NOTHING
        ",
    )
    .execute(&pool)
    .await?;
    tracing::info!(coupons = inserted.rows_affected(), "seeded coupons");

    Ok(())
}
