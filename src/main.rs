use actix::Actor;
use actix_cors::Cors;
use actix_web::{self, App, HttpServer, middleware::Logger, web};
use std::sync::{Arc, LazyLock};

use crate::{
    configs::connect_database,
    modules::{
        category::{repository_pg::CategoryRepositoryPg, service::CategoryService},
        conversation::{
            repository_pg::{ConversationPgRepository, ReadCursorPgRepository},
            service::ConversationService,
        },
        file_upload::{BlobStorage, UploadConfig, serve_upload},
        message::{repository_pg::MessageRepositoryPg, service::MessageService},
        order::{repository_pg::OrderRepositoryPg, service::OrderService},
        product::{
            repository_pg::{ProductRepositoryPg, ReviewRepositoryPg},
            service::ProductService,
        },
        user::{repository_pg::UserRepositoryPg, service::UserService},
        websocket::{
            handler::{chat_socket, product_socket},
            server::RealtimeServer,
        },
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check() -> &'static str {
    "Server is running"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let subscriber = tracing_subscriber::fmt().with_max_level(ENV.log_level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| std::io::Error::other("Tracing subscriber already installed"))?;

    let db_pool =
        connect_database().await.map_err(|_| std::io::Error::other("Database connection error"))?;

    let upload_config = UploadConfig::new(ENV.upload_dir.as_str(), ENV.public_base_url.as_str());
    let storage = Arc::new(BlobStorage::new(upload_config));
    let realtime = RealtimeServer::new().start();

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let category_repo = Arc::new(CategoryRepositoryPg::new(db_pool.clone()));
    let product_repo = Arc::new(ProductRepositoryPg::new(db_pool.clone()));
    let order_repo = Arc::new(OrderRepositoryPg::new(db_pool.clone()));
    let conversation_repo = Arc::new(ConversationPgRepository::new(db_pool.clone()));
    let message_repo = Arc::new(MessageRepositoryPg::new(db_pool.clone()));

    let user_service = UserService::with_dependencies(user_repo, storage.clone());
    let category_service = CategoryService::with_dependencies(category_repo);
    let product_service = ProductService::with_dependencies(
        product_repo,
        Arc::new(ReviewRepositoryPg),
        storage.clone(),
        realtime.clone(),
    );
    let order_service = OrderService::with_dependencies(order_repo, realtime.clone());
    let conversation_service = ConversationService::with_dependencies(
        conversation_repo.clone(),
        Arc::new(ReadCursorPgRepository),
        message_repo.clone(),
        storage.clone(),
        realtime.clone(),
    );
    let message_service = MessageService::with_dependencies(
        message_repo,
        conversation_repo,
        storage.clone(),
        realtime.clone(),
    );

    log::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&ENV.frontend_url)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(category_service.clone()))
            .app_data(web::Data::new(product_service.clone()))
            .app_data(web::Data::new(order_service.clone()))
            .app_data(web::Data::new(conversation_service.clone()))
            .app_data(web::Data::new(message_service.clone()))
            .app_data(web::Data::from(storage.clone()))
            .app_data(web::Data::new(realtime.clone()))
            .service(health_check)
            .service(serve_upload)
            .route("/ws/chat", web::get().to(chat_socket))
            .route("/ws/products", web::get().to(product_socket))
            .service(
                web::scope("/api")
                    .configure(modules::user::route::public_api_configure)
                    .configure(modules::user::route::configure)
                    .configure(modules::category::route::configure)
                    .configure(modules::product::route::configure)
                    .configure(modules::order::route::configure)
                    .configure(modules::conversation::route::configure),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await
}
