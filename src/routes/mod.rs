pub mod admin;
pub mod health;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};

use crate::middleware::auth::require_admin;
use crate::AppState;

/// Health and bootstrap are public; everything else needs an admin token.
pub fn router(state: AppState) -> Router {
    let bootstrap = Router::new()
        .route(
            "/api/admin/bootstrap/otp",
            post(admin::request_bootstrap_code),
        )
        .route("/api/admin/bootstrap", post(admin::complete_bootstrap));

    let admin_api = Router::new()
        .route(
            "/api/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route("/api/admin/owners/:id", delete(admin::delete_owner))
        .route(
            "/api/admin/accountants/:id",
            delete(admin::delete_accountant),
        )
        .route(
            "/api/admin/accountants/:id/properties",
            put(admin::set_accountant_properties),
        )
        .route(
            "/api/admin/properties",
            get(admin::list_properties).post(admin::create_property),
        )
        .route(
            "/api/admin/properties/:property_id",
            get(admin::get_property).delete(admin::delete_property),
        )
        .route(
            "/api/admin/properties/:property_id/owner",
            put(admin::assign_owner),
        )
        .route(
            "/api/admin/properties/:property_id/statement",
            get(admin::owner_statement),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(health::health))
        .merge(bootstrap)
        .merge(admin_api)
        .with_state(state)
}
