//! HTTP request handlers

pub mod attachments;
pub mod auth;
pub mod comments;
pub mod complaints;
pub mod departments;
pub mod extract;
pub mod library;
pub mod locations;
pub mod middleware;
pub mod profile;
pub mod settings;
pub mod users;


use crate::config::Config;
use crate::db::Store;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

pub use auth::TokenKeys;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenKeys>,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub max_image_size: usize,
    pub max_images_per_request: usize,
    pub max_body_size: usize,
    pub is_production: bool,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn Store>) -> Self {
        Self {
            store,
            tokens: Arc::new(TokenKeys::new(&config.jwt_secret, config.token_ttl_hours)),
            upload_dir: PathBuf::from(&config.upload_dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            max_image_size: config.max_image_size,
            max_images_per_request: config.max_images_per_request,
            max_body_size: config.max_body_size(),
            is_production: config.is_production(),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// The `/api` router with authentication applied to every route but
/// registration, login and the health check.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        // Complaints
        .route(
            "/complaints",
            get(complaints::list_complaints).post(complaints::create_complaint),
        )
        .route("/complaints/stats", get(complaints::complaint_stats))
        .route("/complaints/monthly", get(complaints::monthly_stats))
        .route("/complaints/meta/officers", get(complaints::list_officers))
        .route(
            "/complaints/meta/departments",
            get(locations::department_options),
        )
        .route(
            "/complaints/:id",
            get(complaints::get_complaint)
                .patch(complaints::update_complaint)
                .delete(complaints::delete_complaint),
        )
        .route("/complaints/:id/images", post(attachments::upload_images))
        .route(
            "/complaints/:id/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        // Departments (admin)
        .route(
            "/departments",
            get(departments::list_departments).post(departments::create_department),
        )
        .route(
            "/departments/:id",
            patch(departments::update_department).delete(departments::delete_department),
        )
        // Locations
        .route(
            "/locations/zones",
            get(locations::list_zones).post(locations::create_zone),
        )
        .route(
            "/locations/wards",
            get(locations::list_wards).post(locations::create_ward),
        )
        .route(
            "/locations/areas",
            get(locations::list_areas).post(locations::create_area),
        )
        .route("/locations/departments", get(locations::department_options))
        // Profile
        .route(
            "/profile",
            get(profile::get_profile).patch(profile::update_profile),
        )
        .route("/profile/avatar", post(profile::upload_avatar))
        .route("/profile/change-password", post(profile::change_password))
        // Users (admin)
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            patch(users::update_user).delete(users::delete_user),
        )
        .route("/users/:id/role", patch(users::update_user_role))
        .route("/users/:id/department", patch(users::update_user_department))
        // Settings
        .route(
            "/settings",
            get(settings::get_settings).patch(settings::update_setting),
        )
        // Library
        .route("/documents", get(library::list_documents))
        .route("/projects", get(library::list_projects))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .nest("/api", public.merge(protected))
        .layer(DefaultBodyLimit::max(state.max_body_size))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::security_headers,
        ))
        .with_state(state)
}
