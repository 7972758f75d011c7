//! Serapeu tutorial community.
//!
//! The server half is a REST backend with SQLite persistence that owns
//! identity, content and moderation, and enforces every capability check.
//! The client half ([`gateway`], [`session`], [`store`], [`moderation`],
//! [`optimistic`]) keeps an in-memory view of that backend in sync and drives
//! it through typed commands.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod folders;
pub mod gateway;
pub mod models;
pub mod moderation;
pub mod optimistic;
pub mod search;
pub mod session;
pub mod store;
pub mod validation;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Auth
        .route("/auth/sign-up", post(api::sign_up))
        .route("/auth/sign-in", post(api::sign_in))
        .route("/auth/sign-out", post(api::sign_out))
        .route("/auth/me", get(api::me))
        .route("/auth/verify", get(api::verify_email))
        .route("/auth/password-reset", post(api::request_password_reset))
        .route(
            "/auth/password-reset/confirm",
            post(api::confirm_password_reset),
        )
        .route("/auth/profile", put(api::update_profile))
        // Datastore
        .route("/datastore/revision", get(api::get_revision))
        // Tutorials
        .route("/tutorials", get(api::list_tutorials))
        .route("/tutorials", post(api::create_tutorial))
        .route("/tutorials/{id}", get(api::get_tutorial))
        .route("/tutorials/{id}/upvote", post(api::upvote_tutorial))
        .route("/tutorials/{id}/comments", post(api::add_comment))
        // Problems
        .route("/problems", get(api::list_problems))
        .route("/problems", post(api::report_problem))
        // Requests
        .route("/requests", get(api::list_requests))
        .route("/requests", post(api::create_request))
        .route("/requests/{id}/upvote", post(api::toggle_request_upvote))
        // Saved tutorials
        .route("/saved", get(api::list_saved))
        .route("/saved", post(api::save_tutorial))
        .route("/saved/{tutorial_id}", delete(api::unsave_tutorial))
        // Moderation
        .route("/admin/tutorials/{id}/approve", post(api::approve_tutorial))
        .route("/admin/tutorials/{id}", delete(api::delete_tutorial))
        .route(
            "/admin/tutorials/{id}/comments/{comment_id}",
            delete(api::delete_comment),
        )
        .route("/admin/users/{id}/ban", post(api::ban_user))
        .route("/admin/users/{id}/unban", post(api::unban_user))
        .route("/admin/users/{id}/promote", post(api::promote_user))
        .route("/admin/users/{id}/demote", post(api::demote_user))
        .route("/admin/problems/{id}/resolve", post(api::resolve_problem))
        .route("/admin/problems/{id}", delete(api::delete_problem))
        .route("/admin/requests/{id}", delete(api::delete_request))
        .route("/admin/logs", get(api::list_admin_logs))
        .route("/admin/logs", delete(api::clear_admin_logs))
        .route("/users", get(api::list_users))
        // Resolve the bearer token into the acting profile
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_layer,
        ));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
