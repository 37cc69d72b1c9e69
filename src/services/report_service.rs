use chrono::{Datelike, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;

use crate::{
    db::DbPool,
    dto::reports::{
        CategoryPerformanceRow, CategoryStockUsageRow, DailyProfitRow, DailySalesReport,
        DailySalesSummary, DailyStockMovementRow, DateQuery, DateRangeQuery, MonthQuery,
        MonthlyDayRow, MonthlyReport, MonthlySummary, MonthlyTopProductRow, OrderTypeBreakdownRow,
        PaymentBreakdownRow, ProductProfitRow, ProfitAnalysis, ProfitOrderRow, ProfitSummary,
        StockUsageQuery, StockUsageReport, StockUsageRow, TopProductRow,
    },
    error::{AppError, AppResult},
    models::round_money,
    response::ApiResponse,
};

/// Per-product cost of one sold unit, derived from its recipe.
const RECIPE_UNIT_COST: &str = r#"
    SELECT pr.product_id, SUM(pr.quantity * ii.unit_cost) AS unit_recipe_cost
    FROM product_recipes pr
    JOIN inventory_items ii ON ii.id = pr.inventory_item_id
    GROUP BY pr.product_id
"#;

pub async fn daily_sales(
    pool: &DbPool,
    query: DateQuery,
) -> AppResult<ApiResponse<DailySalesReport>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let summary: DailySalesSummary = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) AS total_orders,
            COUNT(*) FILTER (WHERE payment_status = 'completed') AS completed_orders,
            COUNT(*) FILTER (WHERE payment_status = 'pending') AS pending_orders,
            COALESCE(SUM(total_amount) FILTER (WHERE payment_status = 'completed'), 0) AS total_revenue,
            COALESCE(SUM(subtotal) FILTER (WHERE payment_status = 'completed'), 0) AS total_subtotal,
            COALESCE(SUM(discount_amount) FILTER (WHERE payment_status = 'completed'), 0) AS total_discounts,
            COALESCE(SUM(tax_amount) FILTER (WHERE payment_status = 'completed'), 0) AS total_tax,
            ROUND(AVG(total_amount) FILTER (WHERE payment_status = 'completed'), 2) AS average_order_value
        FROM orders
        WHERE created_at::date = $1
        "#,
    )
    .bind(date)
    .fetch_one(pool)
    .await?;

    let payment_breakdown: Vec<PaymentBreakdownRow> = sqlx::query_as(
        r#"
        SELECT payment_method, COUNT(*) AS order_count, COALESCE(SUM(total_amount), 0) AS total_amount
        FROM orders
        WHERE created_at::date = $1 AND payment_status = 'completed'
        GROUP BY payment_method
        ORDER BY total_amount DESC
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    let order_type_breakdown: Vec<OrderTypeBreakdownRow> = sqlx::query_as(
        r#"
        SELECT order_type, COUNT(*) AS order_count, COALESCE(SUM(total_amount), 0) AS total_amount
        FROM orders
        WHERE created_at::date = $1 AND payment_status = 'completed'
        GROUP BY order_type
        ORDER BY total_amount DESC
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    let top_products: Vec<TopProductRow> = sqlx::query_as(
        r#"
        SELECT
            oi.product_id,
            oi.product_name,
            SUM(oi.quantity) AS total_quantity,
            COALESCE(SUM(oi.total_price), 0) AS total_revenue
        FROM order_items oi
        JOIN orders o ON oi.order_id = o.id
        WHERE o.created_at::date = $1 AND o.payment_status = 'completed'
        GROUP BY oi.product_id, oi.product_name
        ORDER BY total_quantity DESC
        LIMIT 10
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(
        "Daily sales report",
        DailySalesReport {
            date,
            summary,
            payment_breakdown,
            order_type_breakdown,
            top_products,
        },
        None,
    ))
}

pub async fn monthly(pool: &DbPool, query: MonthQuery) -> AppResult<ApiResponse<MonthlyReport>> {
    let now = Utc::now().date_naive();
    let year = query.year.unwrap_or_else(|| now.year());
    let month = query.month.unwrap_or_else(|| now.month());

    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::BadRequest("Invalid year or month".into()))?;
    let (end_year, end_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(end_year, end_month, 1)
        .ok_or_else(|| AppError::BadRequest("Invalid year or month".into()))?;

    let start_ts = start.and_time(NaiveTime::MIN).and_utc();
    let end_ts = end.and_time(NaiveTime::MIN).and_utc();

    let monthly_data: Vec<MonthlyDayRow> = sqlx::query_as(
        r#"
        SELECT
            o.created_at::date AS date,
            COUNT(*) AS total_orders,
            COALESCE(SUM(o.total_amount) FILTER (WHERE o.payment_status = 'completed'), 0) AS daily_revenue,
            COALESCE(SUM(o.subtotal) FILTER (WHERE o.payment_status = 'completed'), 0) AS daily_subtotal,
            COALESCE(SUM(o.discount_amount) FILTER (WHERE o.payment_status = 'completed'), 0) AS daily_discounts,
            COALESCE(SUM(o.tax_amount) FILTER (WHERE o.payment_status = 'completed'), 0) AS daily_tax
        FROM orders o
        WHERE o.created_at >= $1 AND o.created_at < $2
        GROUP BY o.created_at::date
        ORDER BY date ASC
        "#,
    )
    .bind(start_ts)
    .bind(end_ts)
    .fetch_all(pool)
    .await?;

    let monthly_summary: MonthlySummary = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) AS total_orders,
            COUNT(*) FILTER (WHERE payment_status = 'completed') AS completed_orders,
            COALESCE(SUM(total_amount) FILTER (WHERE payment_status = 'completed'), 0) AS total_revenue,
            COALESCE(SUM(subtotal) FILTER (WHERE payment_status = 'completed'), 0) AS total_subtotal,
            COALESCE(SUM(discount_amount) FILTER (WHERE payment_status = 'completed'), 0) AS total_discounts,
            COALESCE(SUM(tax_amount) FILTER (WHERE payment_status = 'completed'), 0) AS total_tax,
            ROUND(AVG(total_amount) FILTER (WHERE payment_status = 'completed'), 2) AS average_order_value
        FROM orders
        WHERE created_at >= $1 AND created_at < $2
        "#,
    )
    .bind(start_ts)
    .bind(end_ts)
    .fetch_one(pool)
    .await?;

    let category_performance: Vec<CategoryPerformanceRow> = sqlx::query_as(
        r#"
        SELECT
            c.name AS category_name,
            c.color AS category_color,
            COUNT(DISTINCT o.id) AS order_count,
            SUM(oi.quantity) AS total_quantity,
            COALESCE(SUM(oi.total_price), 0) AS total_revenue
        FROM order_items oi
        JOIN orders o ON oi.order_id = o.id
        JOIN products p ON oi.product_id = p.id
        JOIN categories c ON p.category_id = c.id
        WHERE o.created_at >= $1 AND o.created_at < $2 AND o.payment_status = 'completed'
        GROUP BY c.id, c.name, c.color
        ORDER BY total_revenue DESC
        "#,
    )
    .bind(start_ts)
    .bind(end_ts)
    .fetch_all(pool)
    .await?;

    let top_products: Vec<MonthlyTopProductRow> = sqlx::query_as(
        r#"
        SELECT
            oi.product_id,
            oi.product_name,
            SUM(oi.quantity) AS total_quantity,
            COALESCE(SUM(oi.total_price), 0) AS total_revenue,
            ROUND(AVG(oi.unit_price), 2) AS average_price
        FROM order_items oi
        JOIN orders o ON oi.order_id = o.id
        WHERE o.created_at >= $1 AND o.created_at < $2 AND o.payment_status = 'completed'
        GROUP BY oi.product_id, oi.product_name
        ORDER BY total_quantity DESC
        LIMIT 15
        "#,
    )
    .bind(start_ts)
    .bind(end_ts)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(
        "Monthly report",
        MonthlyReport {
            year,
            month,
            monthly_data,
            monthly_summary,
            category_performance,
            top_products,
        },
        None,
    ))
}

pub async fn profit_analysis(
    pool: &DbPool,
    query: DateRangeQuery,
) -> AppResult<ApiResponse<ProfitAnalysis>> {
    let (start_date, end_date) = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(AppError::BadRequest(
                "Start date and end date are required".into(),
            ));
        }
    };
    if end_date < start_date {
        return Err(AppError::BadRequest(
            "End date must not be before start date".into(),
        ));
    }

    let orders_sql = format!(
        r#"
        SELECT
            o.id,
            o.order_number,
            o.total_amount AS revenue,
            o.subtotal,
            o.discount_amount,
            o.tax_amount,
            ROUND(COALESCE(SUM(oi.quantity * rc.unit_recipe_cost), 0), 2) AS total_cost,
            o.created_at
        FROM orders o
        LEFT JOIN order_items oi ON oi.order_id = o.id
        LEFT JOIN ({RECIPE_UNIT_COST}) rc ON rc.product_id = oi.product_id
        WHERE o.created_at::date BETWEEN $1 AND $2 AND o.payment_status = 'completed'
        GROUP BY o.id
        ORDER BY o.created_at DESC
        "#
    );
    let orders: Vec<ProfitOrderRow> = sqlx::query_as(&orders_sql)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(pool)
        .await?;

    let total_revenue: Decimal = orders.iter().map(|o| o.revenue).sum();
    let total_cost: Decimal = orders.iter().map(|o| o.total_cost).sum();
    let total_profit = total_revenue - total_cost;
    let profit_margin = if total_revenue > Decimal::ZERO {
        round_money(total_profit / total_revenue * Decimal::from(100))
    } else {
        Decimal::ZERO
    };

    let daily_sql = format!(
        r#"
        SELECT
            d.date,
            d.daily_revenue,
            COALESCE(c.daily_cost, 0) AS daily_cost,
            d.daily_revenue - COALESCE(c.daily_cost, 0) AS daily_profit
        FROM (
            SELECT created_at::date AS date, SUM(total_amount) AS daily_revenue
            FROM orders
            WHERE created_at::date BETWEEN $1 AND $2 AND payment_status = 'completed'
            GROUP BY created_at::date
        ) d
        LEFT JOIN (
            SELECT o.created_at::date AS date,
                   ROUND(SUM(oi.quantity * rc.unit_recipe_cost), 2) AS daily_cost
            FROM orders o
            JOIN order_items oi ON oi.order_id = o.id
            JOIN ({RECIPE_UNIT_COST}) rc ON rc.product_id = oi.product_id
            WHERE o.created_at::date BETWEEN $1 AND $2 AND o.payment_status = 'completed'
            GROUP BY o.created_at::date
        ) c ON c.date = d.date
        ORDER BY d.date ASC
        "#
    );
    let daily_profit: Vec<DailyProfitRow> = sqlx::query_as(&daily_sql)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(pool)
        .await?;

    let product_sql = format!(
        r#"
        SELECT
            oi.product_id,
            oi.product_name,
            SUM(oi.quantity) AS total_quantity,
            COALESCE(SUM(oi.total_price), 0) AS total_revenue,
            ROUND(COALESCE(SUM(oi.quantity * rc.unit_recipe_cost), 0), 2) AS total_cost,
            COALESCE(SUM(oi.total_price), 0)
                - ROUND(COALESCE(SUM(oi.quantity * rc.unit_recipe_cost), 0), 2) AS total_profit,
            CASE WHEN COALESCE(SUM(oi.total_price), 0) > 0
                 THEN ROUND((COALESCE(SUM(oi.total_price), 0)
                             - COALESCE(SUM(oi.quantity * rc.unit_recipe_cost), 0))
                            / SUM(oi.total_price) * 100, 2)
                 ELSE 0 END AS profit_margin
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        LEFT JOIN ({RECIPE_UNIT_COST}) rc ON rc.product_id = oi.product_id
        WHERE o.created_at::date BETWEEN $1 AND $2 AND o.payment_status = 'completed'
        GROUP BY oi.product_id, oi.product_name
        ORDER BY total_profit DESC
        "#
    );
    let product_profit: Vec<ProductProfitRow> = sqlx::query_as(&product_sql)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(pool)
        .await?;

    Ok(ApiResponse::success(
        "Profit analysis",
        ProfitAnalysis {
            start_date,
            end_date,
            summary: ProfitSummary {
                total_revenue,
                total_cost,
                total_profit,
                profit_margin,
            },
            daily_profit,
            product_profit,
            orders,
        },
        None,
    ))
}

pub async fn stock_usage(
    pool: &DbPool,
    query: StockUsageQuery,
) -> AppResult<ApiResponse<StockUsageReport>> {
    let StockUsageQuery {
        start_date,
        end_date,
        category_id,
    } = query;

    let stock_usage: Vec<StockUsageRow> = sqlx::query_as(
        r#"
        SELECT
            i.id,
            i.name,
            i.category_id,
            c.name AS category_name,
            c.color AS category_color,
            i.current_stock,
            i.min_stock_level,
            i.max_stock_level,
            i.unit_cost,
            COALESCE(sin.total_in, 0) AS total_stock_in,
            COALESCE(sout.total_out, 0) AS total_stock_out,
            COALESCE(sin.total_cost_in, 0) AS total_cost_in,
            COALESCE(sout.total_cost_out, 0) AS total_cost_out,
            COALESCE(sin.total_in, 0) - COALESCE(sout.total_out, 0) AS net_stock_change,
            CASE WHEN COALESCE(sout.total_out, 0) > 0
                  AND COALESCE(sin.total_in, 0) + i.current_stock > 0
                 THEN ROUND(COALESCE(sout.total_out, 0)
                            / (COALESCE(sin.total_in, 0) + i.current_stock) * 100, 2)
                 ELSE 0 END AS usage_percentage
        FROM inventory_items i
        LEFT JOIN categories c ON c.id = i.category_id
        LEFT JOIN (
            SELECT inventory_item_id, SUM(quantity) AS total_in, SUM(total_cost) AS total_cost_in
            FROM stock_transactions
            WHERE transaction_type = 'stock_in'
              AND ($1::date IS NULL OR created_at::date >= $1)
              AND ($2::date IS NULL OR created_at::date <= $2)
            GROUP BY inventory_item_id
        ) sin ON sin.inventory_item_id = i.id
        LEFT JOIN (
            SELECT inventory_item_id, SUM(quantity) AS total_out, SUM(total_cost) AS total_cost_out
            FROM stock_transactions
            WHERE transaction_type = 'stock_out'
              AND ($1::date IS NULL OR created_at::date >= $1)
              AND ($2::date IS NULL OR created_at::date <= $2)
            GROUP BY inventory_item_id
        ) sout ON sout.inventory_item_id = i.id
        WHERE ($3::uuid IS NULL OR i.category_id = $3)
        ORDER BY total_stock_out DESC
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .bind(category_id)
    .fetch_all(pool)
    .await?;

    let daily_movement: Vec<DailyStockMovementRow> = sqlx::query_as(
        r#"
        SELECT
            st.created_at::date AS date,
            st.transaction_type,
            SUM(st.quantity) AS total_quantity,
            COALESCE(SUM(st.total_cost), 0) AS total_cost,
            COUNT(*) AS transaction_count
        FROM stock_transactions st
        JOIN inventory_items i ON i.id = st.inventory_item_id
        WHERE ($1::date IS NULL OR st.created_at::date >= $1)
          AND ($2::date IS NULL OR st.created_at::date <= $2)
          AND ($3::uuid IS NULL OR i.category_id = $3)
        GROUP BY st.created_at::date, st.transaction_type
        ORDER BY date DESC, st.transaction_type
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .bind(category_id)
    .fetch_all(pool)
    .await?;

    let category_usage: Vec<CategoryStockUsageRow> = sqlx::query_as(
        r#"
        SELECT
            c.id,
            c.name AS category_name,
            c.color AS category_color,
            COUNT(DISTINCT i.id) AS total_items,
            COALESCE(SUM(i.current_stock), 0) AS total_current_stock,
            COALESCE(SUM(sout.total_out), 0) AS total_usage,
            COALESCE(SUM(sout.total_cost_out), 0) AS total_usage_cost
        FROM categories c
        LEFT JOIN inventory_items i ON i.category_id = c.id
        LEFT JOIN (
            SELECT inventory_item_id, SUM(quantity) AS total_out, SUM(total_cost) AS total_cost_out
            FROM stock_transactions
            WHERE transaction_type = 'stock_out'
              AND ($1::date IS NULL OR created_at::date >= $1)
              AND ($2::date IS NULL OR created_at::date <= $2)
            GROUP BY inventory_item_id
        ) sout ON sout.inventory_item_id = i.id
        WHERE ($3::uuid IS NULL OR c.id = $3)
        GROUP BY c.id, c.name, c.color
        ORDER BY total_usage DESC
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .bind(category_id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(
        "Stock usage report",
        StockUsageReport {
            stock_usage,
            daily_movement,
            category_usage,
        },
        None,
    ))
}
