use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use storefront_engine::{bus::MessageBus, OrderFlowApi, SqliteDatabase};
use tokio::sync::watch;

use crate::{
    amqp::AmqpBus,
    config::ServerConfig,
    errors::ServerError,
    routes::{health, CancelOrderRoute, CheckoutRoute, OrderByIdRoute},
    workers::{start_order_validation_listener, start_payment_status_listener},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let bus = AmqpBus::new(config.broker_url.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = vec![
        start_payment_status_listener(db.clone(), bus.clone(), shutdown_rx.clone(), config.reconnect_delay),
        start_order_validation_listener(db.clone(), bus.clone(), shutdown_rx, config.reconnect_delay),
    ];
    let srv = create_server_instance(config, db, bus)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("🚀️ Web server stopped. Shutting down the listeners.");
    let _ = shutdown_tx.send(true);
    for worker in workers {
        if let Err(e) = worker.await {
            warn!("🚀️ A listener did not shut down cleanly: {e}");
        }
    }
    result
}

pub fn create_server_instance<M: MessageBus>(
    config: ServerConfig,
    db: SqliteDatabase,
    bus: M,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let api = OrderFlowApi::new(db.clone(), bus.clone());
        let api_scope = web::scope("/api/v1")
            .service(CheckoutRoute::<SqliteDatabase, M>::new())
            .service(OrderByIdRoute::<SqliteDatabase, M>::new())
            .service(CancelOrderRoute::<SqliteDatabase, M>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sf::access_log"))
            .app_data(web::Data::new(api))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
