use crate::{
    auth::{SatchelSession, backend::SatchelAuthCredentials, local_redirect_target},
    error::SatchelResult,
    maud_conveniences::{form_submit_button, simple_form_element, title},
    state::SatchelState,
};
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_login::tower_sessions::Session;
use maud::{Markup, html};
use secrecy::SecretString;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct LoginOptions {
    pub next: Option<String>,
}

async fn render_login(
    state: &SatchelState,
    session: &SatchelSession,
    tower_session: &Session,
    next: Option<&str>,
    login_failed: bool,
) -> SatchelResult<Markup> {
    state
        .render(
            session,
            tower_session,
            html! {
                div class="bg-gray-800 shadow-md rounded px-8 pt-6 pb-8 mb-4 w-full max-w-sm" {
                    (title("Login"))
                    @if login_failed {
                        div role="alert" class="bg-red-100 border border-red-400 text-red-700 px-4 py-4 rounded relative" {
                            strong class="font-bold" {"Alert!"}
                            br;
                            // avoid giving extra details for security reasons :)
                            span class="block sm:inline" {"Email/Password not found or password incorrect"}
                        }
                        br;
                    }

                    form method="post" action="/login" {
                        @if let Some(next) = next {
                            input type="hidden" name="next" value=(next) {}
                        }
                        (simple_form_element("email", "Email", true, Some("email"), None))
                        (simple_form_element("password", "Password", true, Some("password"), None))
                        (form_submit_button(Some("Login")))
                    }
                }
            },
        )
        .await
}

pub async fn get_login(
    State(state): State<SatchelState>,
    session: SatchelSession,
    tower_session: Session,
    Query(LoginOptions { next }): Query<LoginOptions>,
) -> SatchelResult<Response> {
    if !state.users().any_exist().await? {
        return Ok(Redirect::to("/onboarding").into_response());
    }

    if session.user.is_some() {
        return Ok(Redirect::to(local_redirect_target(next.as_deref())).into_response());
    }

    Ok(render_login(&state, &session, &tower_session, next.as_deref(), false)
        .await?
        .into_response())
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: SecretString,
    next: Option<String>,
}

pub async fn post_login(
    State(state): State<SatchelState>,
    mut session: SatchelSession,
    tower_session: Session,
    Form(LoginForm {
        email,
        password,
        next,
    }): Form<LoginForm>,
) -> SatchelResult<Response> {
    match session
        .authenticate(SatchelAuthCredentials::EmailPassword { email, password })
        .await?
    {
        Some(user) => {
            session.login(&user).await?;
            info!(id=?user.id, "Logged in");
            Ok(Redirect::to(local_redirect_target(next.as_deref())).into_response())
        }
        None => {
            let page = render_login(&state, &session, &tower_session, next.as_deref(), true).await?;
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
    }
}

pub async fn post_logout(mut session: SatchelSession) -> SatchelResult<Redirect> {
    session.logout().await?;
    Ok(Redirect::to("/"))
}
