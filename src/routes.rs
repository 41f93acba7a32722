// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, community, interaction, profile},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, optional_auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, forum, posts, comments).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);
    let optional_auth = middleware::from_fn_with_state(state.clone(), optional_auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(profile::get_me))
                .layer(require_auth.clone()),
        );

    let forum_routes = Router::new()
        .route("/categories", get(community::list_categories))
        .route("/categories/{slug}", get(community::get_category))
        .route("/tags", get(community::list_tags))
        // Admin-only writes: Auth first, then Admin check
        .merge(
            Router::new()
                .route("/categories", post(community::create_category))
                .route("/tags", post(community::create_tag))
                .layer(middleware::from_fn(admin_middleware))
                .layer(require_auth.clone()),
        );

    let post_routes = Router::new()
        .route("/", get(community::list_posts))
        .merge(
            Router::new()
                .route("/{slug}", get(community::get_post))
                .route("/{slug}/comments", get(interaction::list_comments))
                .layer(optional_auth),
        )
        .merge(
            Router::new()
                .route("/", post(community::create_post))
                .route("/{slug}/comments", post(interaction::create_comment))
                .route("/{slug}/reaction", post(interaction::react_to_post))
                .route("/{slug}/like", post(interaction::toggle_post_like))
                .layer(require_auth.clone()),
        );

    let comment_routes = Router::new()
        .route("/{id}", delete(interaction::delete_comment))
        .route("/{id}/reaction", post(interaction::react_to_comment))
        .route("/{id}/like", post(interaction::toggle_comment_like))
        .layer(require_auth);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/forum", forum_routes)
        .nest("/api/posts", post_routes)
        .nest("/api/comments", comment_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
