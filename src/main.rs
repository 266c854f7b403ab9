use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use giftshop_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{PaymentGatewayService, TelegramService},
    handlers,
    middlewares::{AdminAuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
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
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 创建外部服务
    let telegram_service = TelegramService::new(config.telegram.clone());
    let gateway_service = PaymentGatewayService::new(config.payment.clone());

    // 注册 bot webhook（失败仅记录，不阻止启动）
    if let Some(webhook_url) = &config.telegram.webhook_url {
        if let Err(e) = telegram_service.set_webhook(webhook_url).await {
            log::error!("Telegram webhook registration failed: {e:?}");
        }
    }

    // 创建服务
    let gift_service = GiftService::new(pool.clone());
    let payment_service = PaymentService::new(
        gift_service.clone(),
        gateway_service.clone(),
        telegram_service.clone(),
        config.shop.clone(),
    );
    let redemption_service =
        RedemptionService::new(gift_service.clone(), telegram_service.clone());
    let bot_service = BotService::new(
        gift_service.clone(),
        payment_service.clone(),
        telegram_service.clone(),
        config.telegram.secret_token.clone(),
    );

    // 启动后台清理任务（释放超时预订）
    tasks::spawn_all(gift_service.clone(), config.shop.reservation_ttl_minutes);

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let admin_token = config.admin.token.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AdminAuthMiddleware::new(admin_token.clone()))
            .app_data(web::Data::new(gift_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(redemption_service.clone()))
            .app_data(web::Data::new(bot_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/webhook")
                    .configure(handlers::telegram_webhook_config)
                    .configure(handlers::payment_webhook_config),
            )
            .service(
                web::scope("/api/v1")
                    .configure(handlers::gift_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
