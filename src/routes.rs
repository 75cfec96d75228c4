use crate::{
    auth::backend::SatchelAuthBackend,
    routes::{
        index::get_index_route,
        login::{get_login, post_login, post_logout},
        onboarding::{get_onboarding, post_onboarding},
        profile::get_profile,
        students::{
            get_create_student, get_delete_student, get_edit_student, get_student_list,
            get_student_profile, post_create_student, post_delete_student, post_edit_student,
        },
    },
    state::SatchelState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use axum_login::{
    AuthManagerLayerBuilder, login_required,
    tower_sessions::{Expiry, SessionManagerLayer, SessionStore, cookie::time::Duration},
};
use tower_http::{
    compression::CompressionLayer, limit::RequestBodyLimitLayer, services::ServeDir,
    trace::TraceLayer,
};

pub mod index;
pub mod login;
pub mod onboarding;
pub mod profile;
pub mod students;

#[cfg(test)]
mod tests;

pub fn router<Store: SessionStore + Clone>(state: SatchelState, session_store: Store) -> Router {
    let config = state.config().clone();

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.secure_cookies())
        .with_expiry(Expiry::OnInactivity(Duration::days(config.session_days())));
    let auth_backend = SatchelAuthBackend::new(state.clone());
    let auth_layer = AuthManagerLayerBuilder::new(auth_backend, session_layer).build();

    let protected = Router::new()
        .route(
            "/students/create/",
            get(get_create_student).post(post_create_student),
        )
        .route(
            "/students/{id}/edit/",
            get(get_edit_student).post(post_edit_student),
        )
        .route(
            "/students/{id}/delete/",
            get(get_delete_student).post(post_delete_student),
        )
        .route_layer(login_required!(SatchelAuthBackend, login_url = "/login"));

    let mut app = Router::new()
        .merge(protected)
        .route("/", get(get_index_route))
        .route("/students/list/", get(get_student_list))
        .route("/students/{id}/", get(get_student_profile))
        .route("/login", get(get_login).post(post_login))
        .route("/logout", post(post_logout))
        .route("/onboarding", get(get_onboarding).post(post_onboarding))
        .route("/profile", get(get_profile));

    if let Some(media_root) = state.photos().served_from() {
        app = app.nest_service("/media", ServeDir::new(media_root));
    }

    app.layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes()))
        .layer(auth_layer)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
