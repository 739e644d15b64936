// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        admin::admin_handler,
        auth::auth_handler,
        membership::{
            certificate_handler, directory_handler, membership_handler, pricing_handler,
        },
        payments::{payments_handler, payments_public_handler},
        users::users_handler,
    },
    middleware::{
        access_gate::{require_active_membership, require_registered_membership},
        main_middleware::{auth, role_check},
    },
    models::usermodel::UserRole,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Member-only payment routes plus the public gateway callbacks
    let payment_routes = Router::new()
        .merge(payments_handler().layer(middleware::from_fn(auth)))
        .merge(payments_public_handler());

    // The directory needs a fully paid-up member; certificate status only
    // needs registration. Middleware layers run bottom-up, so auth wraps
    // the gate.
    let membership_routes = Router::new()
        .merge(membership_handler().layer(middleware::from_fn(auth)))
        .nest("/pricing", pricing_handler())
        .nest(
            "/directory",
            directory_handler()
                .layer(middleware::from_fn(require_active_membership))
                .layer(middleware::from_fn(auth)),
        )
        .nest(
            "/certificate-status",
            certificate_handler()
                .layer(middleware::from_fn(require_registered_membership))
                .layer(middleware::from_fn(auth)),
        );

    let admin_routes = admin_handler()
        .layer(middleware::from_fn(|state, req, next| {
            role_check(
                state,
                req,
                next,
                vec![UserRole::SuperAdmin, UserRole::Admin, UserRole::Staff],
            )
        }))
        .layer(middleware::from_fn(auth));

    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/users", users_handler().layer(middleware::from_fn(auth)))
        .nest("/memberships", membership_routes)
        .nest("/payments", payment_routes)
        .nest("/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
