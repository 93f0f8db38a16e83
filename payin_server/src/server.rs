use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use payin_engine::{
    cache::{AuxCache, CacheStore},
    traits::{AuxDataSource, PayinDatabase},
    InvoiceFlowApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{health, CreateInvoiceRoute},
};

/// The auxiliary data source the server runs with: the database, behind the configured cache.
pub type CachedAuxData = AuxCache<SqliteDatabase, CacheStore>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let cache = CacheStore::from_url(config.redis_url.as_ref().map(|u| u.reveal().as_str()))
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let aux = AuxCache::new(db.clone(), cache).with_policy(config.cache_policy);
    let srv = create_server_instance(config, db, aux)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    aux: CachedAuxData,
) -> Result<Server, ServerError> {
    let settings = config.flow_settings;
    info!("🚀️ Invoice flow settings: {settings:?}");
    let srv = HttpServer::new(move || {
        let invoice_api = InvoiceFlowApi::new(db.clone(), aux.clone()).with_settings(settings);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("payin::access_log"))
            .configure(|cfg| configure_routes(cfg, invoice_api))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route and the shared state they need. Also used by the endpoint tests.
pub fn configure_routes<B, A>(cfg: &mut web::ServiceConfig, api: InvoiceFlowApi<B, A>)
where
    B: PayinDatabase + 'static,
    A: AuxDataSource + 'static,
{
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ServerError::CouldNotDeserializePayload(err.to_string()).into());
    cfg.app_data(web::Data::new(api))
        .app_data(json_config)
        .service(health)
        .service(web::scope("/api").service(CreateInvoiceRoute::<B, A>::new()));
}
