pub mod database;
pub mod entity;
pub mod postgres;

pub use database::{ensure_indexes, init_db};
pub use postgres::PostgresStore;
