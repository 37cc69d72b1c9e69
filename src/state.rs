use crate::db::{DbPool, OrmConn};

/// Shared handles to the database, passed to every service explicitly.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
}
