use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use commerce_backend::{
    config::Config,
    database::{close_pool, create_pool, run_migrations},
    external::{BiteshipClient, MidtransGateway, PaymentGateways, XenditGateway, build_http_client},
    handlers::{self, WebhookSecrets},
    services::*,
    tasks,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database connection pool")?;

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    // 创建外部服务
    let http = build_http_client(config.http.timeout_secs).context("Failed to build HTTP client")?;
    let frontend_url = config.commerce.frontend_url.clone();
    let gateways = PaymentGateways::new(
        Arc::new(MidtransGateway::new(
            http.clone(),
            config.midtrans.clone(),
            frontend_url.clone(),
        )),
        Arc::new(XenditGateway::new(http.clone(), config.xendit.clone(), frontend_url)),
    )
    .context("Failed to register payment gateways")?;
    let logistics = Arc::new(BiteshipClient::new(http, config.biteship.clone()));

    // 创建服务
    let shipment_service = ShipmentService::new(pool.clone(), logistics, config.shipper.clone());
    let payment_service = PaymentService::new(
        pool.clone(),
        gateways,
        shipment_service.clone(),
        config.commerce.commission_rate_bps,
    );
    let order_service = OrderService::new(
        pool.clone(),
        payment_service.clone(),
        shipment_service.clone(),
    );
    let secrets = WebhookSecrets {
        midtrans_server_key: config.midtrans.server_key.clone(),
        xendit_callback_token: config.xendit.callback_token.clone(),
        biteship_webhook_token: config.biteship.webhook_token.clone(),
    };

    // 启动后台任务
    tasks::spawn_all(
        shipment_service.clone(),
        config.commerce.shipment_retry_interval_secs,
    );

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(secrets.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(order_service.clone()))
            .configure(handlers::webhook_config)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    close_pool(pool).await?;
    Ok(())
}
