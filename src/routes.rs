// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, assessments, auth, certificates, courses, lessons, live_classes},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, tutor_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, courses, assessments, certificates, live classes, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let course_routes = Router::new()
        // Public catalog
        .route("/", get(courses::list_courses))
        .route("/{id}", get(courses::get_course))
        // Student routes
        .merge(
            Router::new()
                .route("/{id}/enroll", post(courses::enroll))
                .route("/{id}/progress", get(courses::get_progress))
                .route("/{id}/lessons", get(lessons::list_lessons))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        )
        // Tutor routes
        .merge(
            Router::new()
                .route("/", post(courses::create_course))
                .route("/{id}", put(courses::update_course))
                .route("/{id}/lessons", post(lessons::create_lesson))
                .layer(middleware::from_fn(tutor_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let lesson_routes = Router::new()
        .route("/{id}/complete", post(lessons::complete_lesson))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let assessment_routes = Router::new()
        .route("/{id}", get(assessments::get_assessment))
        .route("/{id}/submit", post(assessments::submit_assessment))
        .route("/{id}/results", get(assessments::get_results))
        .route("/{id}/submissions", get(assessments::list_submissions))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .merge(
            Router::new()
                .route("/", post(assessments::create_assessment))
                .layer(middleware::from_fn(tutor_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let certificate_routes = Router::new()
        // Public verification
        .route("/verify/{credential_id}", get(certificates::verify_certificate))
        .merge(
            Router::new()
                .route("/", get(certificates::list_my_certificates))
                .route(
                    "/generate-from-assessment/{assessment_id}",
                    post(certificates::generate_from_assessment),
                )
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let live_class_routes = Router::new()
        .route("/course/{course_id}", get(live_classes::list_for_course))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .merge(
            Router::new()
                .route("/", post(live_classes::create_live_class))
                .route("/{id}/status", put(live_classes::update_status))
                .layer(middleware::from_fn(tutor_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/assessments/{id}", delete(admin::delete_assessment))
        .route(
            "/certificates/{id}/revoke",
            post(admin::revoke_certificate),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/courses", course_routes)
        .nest("/api/lessons", lesson_routes)
        .nest("/api/assessments", assessment_routes)
        .nest("/api/certificates", certificate_routes)
        .nest("/api/live-classes", live_class_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
