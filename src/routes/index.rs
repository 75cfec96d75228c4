use crate::{auth::SatchelSession, error::SatchelResult, state::SatchelState};
use axum::extract::State;
use axum_login::tower_sessions::Session;
use maud::{Markup, html};

pub async fn get_index_route(
    State(state): State<SatchelState>,
    session: SatchelSession,
    tower_session: Session,
) -> SatchelResult<Markup> {
    let count = state.students().count().await?;
    let signed_in = session.user.is_some();

    state
        .render(
            &session,
            &tower_session,
            html! {
                div class="bg-gray-800 p-8 rounded shadow-md max-w-md w-full" {
                    h1 class="text-2xl font-semibold mb-6 text-center" {
                        "Satchel"
                    }
                    p class="text-center text-gray-300 mb-6" {
                        @match count {
                            0 => { "No students on record yet." }
                            1 => { "1 student on record." }
                            n => { (n) " students on record." }
                        }
                    }

                    div class="flex flex-row space-x-4 justify-center" {
                        a href="/students/list/" class="bg-slate-600 hover:bg-slate-800 font-bold py-2 px-4 rounded"  {
                            "View Students"
                        }
                        @if signed_in {
                            a href="/students/create/" class="bg-slate-600 hover:bg-slate-800 font-bold py-2 px-4 rounded"  {
                                "Add Student"
                            }
                        }
                    }
                }
            },
        )
        .await
}
