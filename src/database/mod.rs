pub mod connection;

pub use connection::{close_pool, create_pool, run_migrations};
