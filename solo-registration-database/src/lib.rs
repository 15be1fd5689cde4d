pub mod error;
pub mod gateway;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod schema;
pub mod seed;

pub use error::DatabaseError;
pub use gateway::Gateway;
pub use memory::MemoryGateway;
pub use postgres::{get_database_connection, PgGateway, Pool};
