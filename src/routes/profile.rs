use crate::{
    auth::SatchelSession,
    error::SatchelResult,
    forms::format_date,
    maud_conveniences::title,
    state::SatchelState,
};
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_login::tower_sessions::Session;
use maud::html;

pub async fn get_profile(
    State(state): State<SatchelState>,
    session: SatchelSession,
    tower_session: Session,
) -> SatchelResult<Response> {
    let Some(user) = session.user.clone() else {
        return Ok(Redirect::to("/login?next=/profile").into_response());
    };

    Ok(state
        .render(
            &session,
            &tower_session,
            html! {
                div class="bg-gray-800 p-8 rounded shadow-md w-full max-w-md" {
                    (title(&user.display_name))

                    div class="space-y-4 flex flex-col" {
                        div class="flex items-center justify-between" {
                            span class="block text-sm font-bold text-gray-300" {"Email: "}
                            p class="text-gray-200" {(user.email.as_str())}
                        }
                        div class="flex items-center justify-between" {
                            span class="block text-sm font-bold text-gray-300" {"Account created: "}
                            p class="text-gray-200" {(format_date(user.created_at.date()))}
                        }
                    }
                }
            },
        )
        .await?
        .into_response())
}
