use axum_pos_api::{config::AppConfig, db::create_pool, services::auth_service::hash_password};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin", "admin123", "admin").await?;
    let cashier_id = ensure_user(&pool, "cashier", "cashier123", "cashier").await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Cashier ID: {cashier_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (username) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE username = $1")
                .bind(username)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {username} (role={role})");
    Ok(user_id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let categories = vec![
        ("Waffles", "#8B4513", 1),
        ("Shakes", "#FF69B4", 2),
        ("Sundaes", "#FFD700", 3),
    ];

    for (name, color, sort_order) in &categories {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, color, sort_order)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(color)
        .bind(sort_order)
        .execute(pool)
        .await?;
    }

    let products = vec![
        ("Choco Tsunami", "Waffles", "189", "70"),
        ("Mango Tsunami", "Waffles", "199", "75"),
        ("Nutella Shake", "Shakes", "149", "55"),
        ("Brownie Sundae", "Sundaes", "179", "65"),
    ];

    for (name, category, price, cost_price) in products {
        let price: Decimal = price.parse()?;
        let cost_price: Decimal = cost_price.parse()?;
        sqlx::query(
            r#"
            INSERT INTO products (id, name, category_id, price, cost_price, sort_order)
            SELECT $1, $2, c.id, $3, $4, 999
            FROM categories c
            WHERE c.name = $5
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(price)
        .bind(cost_price)
        .bind(category)
        .execute(pool)
        .await?;
    }

    let items = vec![
        ("Dark chocolate", "kg", "10", "2", "600"),
        ("Waffle batter", "kg", "20", "5", "120"),
        ("Mango pulp", "kg", "8", "3", "250"),
        ("Milk", "l", "30", "10", "60"),
    ];

    for (name, unit, stock, min_level, unit_cost) in items {
        let stock: Decimal = stock.parse()?;
        let min_level: Decimal = min_level.parse()?;
        let unit_cost: Decimal = unit_cost.parse()?;
        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO inventory_items (id, name, unit, current_stock, min_stock_level, unit_cost)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(unit)
        .bind(stock)
        .bind(min_level)
        .bind(unit_cost)
        .fetch_optional(pool)
        .await?;

        // Opening balance for freshly created items.
        if let Some((item_id,)) = inserted {
            if stock > Decimal::ZERO {
                sqlx::query(
                    r#"
                    INSERT INTO stock_transactions
                        (id, inventory_item_id, transaction_type, quantity, unit_cost, total_cost, notes)
                    VALUES ($1, $2, 'initial_stock', $3, $4, $5, 'Initial stock entry')
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(item_id)
                .bind(stock)
                .bind(unit_cost)
                .bind(stock * unit_cost)
                .execute(pool)
                .await?;
            }
        }
    }

    let recipes = vec![
        ("Choco Tsunami", "Dark chocolate", "0.05"),
        ("Choco Tsunami", "Waffle batter", "0.15"),
        ("Mango Tsunami", "Mango pulp", "0.1"),
        ("Mango Tsunami", "Waffle batter", "0.15"),
        ("Nutella Shake", "Milk", "0.3"),
    ];

    for (product, item, quantity) in recipes {
        let quantity: Decimal = quantity.parse()?;
        sqlx::query(
            r#"
            INSERT INTO product_recipes (id, product_id, inventory_item_id, quantity, unit)
            SELECT $1, p.id, i.id, $2, i.unit
            FROM products p, inventory_items i
            WHERE p.name = $3 AND i.name = $4
            ON CONFLICT (product_id, inventory_item_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(quantity)
        .bind(product)
        .bind(item)
        .execute(pool)
        .await?;
    }

    println!("Seeded catalog, inventory and recipes");
    Ok(())
}
