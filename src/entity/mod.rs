pub mod categories;
pub mod inventory_items;
pub mod order_items;
pub mod orders;
pub mod product_recipes;
pub mod products;
pub mod stock_transactions;
pub mod users;

pub use categories::Entity as Categories;
pub use inventory_items::Entity as InventoryItems;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_recipes::Entity as ProductRecipes;
pub use products::Entity as Products;
pub use stock_transactions::Entity as StockTransactions;
pub use users::Entity as Users;
