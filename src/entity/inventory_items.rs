use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub current_stock: Decimal,
    pub min_stock_level: Decimal,
    pub max_stock_level: Option<Decimal>,
    pub unit: String,
    pub unit_cost: Decimal,
    pub unit_price: Option<Decimal>,
    pub supplier_info: Option<String>,
    pub expiry_date: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id"
    )]
    Categories,
    #[sea_orm(has_many = "super::stock_transactions::Entity")]
    StockTransactions,
    #[sea_orm(has_many = "super::product_recipes::Entity")]
    ProductRecipes,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::stock_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTransactions.def()
    }
}

impl Related<super::product_recipes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductRecipes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
