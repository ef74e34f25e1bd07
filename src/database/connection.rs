use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::DatabaseConfig;
use crate::error::AppResult;

/// 由进程入口创建并注入到各个服务，关闭也由入口负责
pub async fn create_pool(config: &DatabaseConfig) -> AppResult<DatabaseConnection> {
    let mut opts = ConnectOptions::new(config.url.clone());
    opts.max_connections(config.max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(opts).await?;
    log::info!("Database connected");
    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> AppResult<()> {
    Migrator::up(db, None).await?;
    log::info!("Database migrations applied");
    Ok(())
}

pub async fn close_pool(db: DatabaseConnection) -> AppResult<()> {
    db.close().await?;
    log::info!("Database connection closed");
    Ok(())
}
