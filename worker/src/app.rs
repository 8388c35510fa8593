//! Application state and factory

use std::sync::Arc;

use actix_web::{web, App, HttpResponse};
use serde_json::json;

use kg_core::repositories::{DeliveryQueue, OtpRepository};
use kg_core::services::otp::{BcryptCodeHasher, OtpService, SecureCodeGenerator};
use kg_core::services::outbox::OutboxDrainEngine;
use kg_core::services::token::{TokenIssuer, TokenIssuerConfig};
use kg_infra::DatabasePool;
use kg_shared::config::AppConfig;

/// Shared state of the health endpoint
pub struct AppState<Q: DeliveryQueue + 'static> {
    pub engine: Arc<OutboxDrainEngine<Q>>,
    /// `None` when the worker runs without a database (tests)
    pub database: Option<DatabasePool>,
}

impl<Q: DeliveryQueue + 'static> AppState<Q> {
    pub fn new(engine: Arc<OutboxDrainEngine<Q>>, database: Option<DatabasePool>) -> Self {
        Self { engine, database }
    }
}

/// Create the application with its routes
pub fn create_app<Q: DeliveryQueue + 'static>(
    app_state: web::Data<AppState<Q>>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(app_state)
        .route("/health", web::get().to(health_check::<Q>))
        .route("/health/live", web::get().to(liveness))
        .default_service(web::route().to(|| async {
            HttpResponse::NotFound().json(json!({
                "error": "not_found",
                "message": "The requested resource was not found"
            }))
        }))
}

/// Wire an `OtpService` from configuration over any OTP store
pub fn build_otp_service<R: OtpRepository>(config: &AppConfig, repository: Arc<R>) -> OtpService<R> {
    OtpService::new(
        repository,
        Arc::new(SecureCodeGenerator),
        Arc::new(BcryptCodeHasher::from(&config.hashing)),
        Arc::new(TokenIssuer::new(TokenIssuerConfig::from(&config.token))),
    )
}

async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "alive" }))
}

async fn health_check<Q: DeliveryQueue + 'static>(state: web::Data<AppState<Q>>) -> HttpResponse {
    let database = match &state.database {
        Some(pool) => match pool.health_check().await {
            Ok(()) => "up",
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                "down"
            }
        },
        None => "not_configured",
    };

    let stats = state.engine.stats().await;
    let body = json!({
        "status": if database == "down" { "degraded" } else { "healthy" },
        "service": "keygate-worker",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "database": database,
        "outbox": {
            "enabled": state.engine.config().enabled,
            "running": state.engine.is_running(),
            "stats": stats,
        },
    });

    if database == "down" {
        HttpResponse::ServiceUnavailable().json(body)
    } else {
        HttpResponse::Ok().json(body)
    }
}
