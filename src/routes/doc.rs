use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{ChangePasswordRequest, CreateUserRequest, LoginRequest, LoginResponse},
        inventory::{
            AddStockRequest, AdjustStockRequest, CreateInventoryItemRequest, DeductStockRequest,
            ExpiryAlert, ExpiryAlertList, InventoryItemWithTransactions, InventoryList,
            LowStockAlert, LowStockAlertList, StockTransactionList, UpdateInventoryItemRequest,
        },
        orders::{
            CreateOrderRequest, CreateOrderResponse, DailySummary, DailySummaryTotals,
            OrderItemRequest, OrderList, OrderWithItems, TopProduct, UpdateOrderRequest,
        },
        products::{
            CategoryList, CreateCategoryRequest, CreateProductRequest, ProductList,
            ProductRecipeLine, ProductWithRecipe, RecipeLineRequest, UpdateCategoryRequest,
            UpdateProductRequest,
        },
        reports::{
            CategoryPerformanceRow, CategoryStockUsageRow, DailyProfitRow, DailySalesReport,
            DailySalesSummary, DailyStockMovementRow, MonthlyDayRow, MonthlyReport,
            MonthlySummary, MonthlyTopProductRow, OrderTypeBreakdownRow, PaymentBreakdownRow,
            ProductProfitRow, ProfitAnalysis, ProfitOrderRow, ProfitSummary, StockUsageReport,
            StockUsageRow, TopProductRow,
        },
    },
    models::{
        Category, DiscountType, InventoryItem, Order, OrderItem, OrderStatus, OrderType,
        PaymentMethod, PaymentStatus, Product, Role, StockTransaction, StockTransactionType, User,
    },
    response::{ApiResponse, Meta},
    routes::{auth, categories, health, inventory, orders, params, products, reports},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::me,
        auth::change_password,
        auth::create_user,
        categories::list_categories,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        products::list_products,
        products::search_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        inventory::list_items,
        inventory::get_item,
        inventory::create_item,
        inventory::update_item,
        inventory::add_stock,
        inventory::deduct_stock,
        inventory::adjust_stock,
        inventory::list_transactions,
        inventory::low_stock_alerts,
        inventory::expiry_alerts,
        orders::list_orders,
        orders::get_order,
        orders::create_order,
        orders::update_order,
        orders::cancel_order,
        orders::daily_summary,
        reports::daily_sales,
        reports::monthly,
        reports::profit_analysis,
        reports::stock_usage,
    ),
    components(
        schemas(
            User,
            Role,
            Category,
            Product,
            InventoryItem,
            StockTransaction,
            StockTransactionType,
            Order,
            OrderItem,
            OrderType,
            OrderStatus,
            PaymentMethod,
            PaymentStatus,
            DiscountType,
            LoginRequest,
            LoginResponse,
            ChangePasswordRequest,
            CreateUserRequest,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryList,
            CreateProductRequest,
            UpdateProductRequest,
            RecipeLineRequest,
            ProductRecipeLine,
            ProductWithRecipe,
            ProductList,
            CreateInventoryItemRequest,
            UpdateInventoryItemRequest,
            AddStockRequest,
            DeductStockRequest,
            AdjustStockRequest,
            InventoryList,
            InventoryItemWithTransactions,
            StockTransactionList,
            LowStockAlert,
            LowStockAlertList,
            ExpiryAlert,
            ExpiryAlertList,
            OrderItemRequest,
            CreateOrderRequest,
            UpdateOrderRequest,
            CreateOrderResponse,
            OrderWithItems,
            OrderList,
            DailySummary,
            DailySummaryTotals,
            TopProduct,
            DailySalesReport,
            DailySalesSummary,
            PaymentBreakdownRow,
            OrderTypeBreakdownRow,
            TopProductRow,
            MonthlyReport,
            MonthlyDayRow,
            MonthlySummary,
            CategoryPerformanceRow,
            MonthlyTopProductRow,
            ProfitAnalysis,
            ProfitOrderRow,
            ProfitSummary,
            DailyProfitRow,
            ProductProfitRow,
            StockUsageReport,
            StockUsageRow,
            DailyStockMovementRow,
            CategoryStockUsageRow,
            params::Pagination,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<InventoryList>,
            ApiResponse<DailySummary>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Catalog", description = "Category and product endpoints"),
        (name = "Inventory", description = "Inventory ledger endpoints"),
        (name = "Orders", description = "Order workflow endpoints"),
        (name = "Reports", description = "Read-only reporting endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
