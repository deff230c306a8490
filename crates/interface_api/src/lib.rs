//! HTTP API Layer
//!
//! This crate provides the REST API for the playhouse site backend using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: form submission (public), sync administration (JWT)
//! - **Middleware**: authentication for the admin surface, audit logging
//! - **DTOs**: request/response objects with camelCase canonicalization
//! - **Error Handling**: consistent error responses
//!
//! The application state holds the domain ports (`LeadStorePort`,
//! `CrmPort`) rather than concrete adapters, so the same router serves
//! production (Postgres + legacy CRM) and tests (in-memory mocks).
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(store, crm, config);
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_leads::{CrmPort, IntakeService, LeadStorePort, SyncEngine};

use crate::config::ApiConfig;
use crate::handlers::{health, leads, sync};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LeadStorePort>,
    pub crm: Arc<dyn CrmPort>,
    pub engine: Arc<SyncEngine>,
    pub intake: Arc<IntakeService>,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires the engine and intake service over the given ports
    pub fn new(store: Arc<dyn LeadStorePort>, crm: Arc<dyn CrmPort>, config: ApiConfig) -> Self {
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            crm.clone(),
            config.sync_settings(),
        ));
        let intake = Arc::new(IntakeService::new(store.clone(), engine.clone()));

        Self {
            store,
            crm,
            engine,
            intake,
            config,
        }
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Application state (ports + configuration)
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Form submission routes (public, called by the website)
    let submission_routes = Router::new()
        .route("/contacts", post(leads::submit_contact))
        .route("/consultations", post(leads::submit_consultation))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            audit_middleware,
        ));

    // Admin routes (JWT with sync-management permission). Auth is layered
    // outermost so the audit log sees the authenticated user.
    let admin_routes = Router::new()
        .route("/sync/run", post(sync::run_sync))
        .route("/sync/connection", get(sync::connection_test))
        .route("/contacts/:id", get(leads::get_contact))
        .route("/consultations/:id", get(leads::get_consultation))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            audit_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .merge(submission_routes)
        .nest("/admin", admin_routes);

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
