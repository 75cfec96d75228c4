use crate::{
    auth::{SatchelSession, hash_password},
    data::user::NewUser,
    error::SatchelResult,
    flash::push_flash,
    maud_conveniences::{errors_list, form_submit_button, simple_form_element, supertitle},
    state::SatchelState,
};
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use bitflags::bitflags;
use email_address::EmailAddress;
use axum_login::tower_sessions::Session;
use maud::html;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::str::FromStr;

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    struct NewAccountDetailsError: u8 {
        const EMPTY_DISPLAY_NAME = 0b0000_0001;
        const INVALID_EMAIL =      0b0000_0010;
        const EMPTY_PASSWORD =     0b0000_0100;

        const MISMATCH_PASSWORD =  0b0001_0000;
    }
}

impl NewAccountDetailsError {
    pub fn as_nice_list(&self) -> impl Iterator<Item = &'static str> {
        self.iter().filter_map(|x| match x {
            Self::EMPTY_DISPLAY_NAME => Some("Provided name was empty"),
            Self::INVALID_EMAIL => Some("Provided email wasn't a valid email address"),
            Self::EMPTY_PASSWORD => Some("Provided password was empty"),
            Self::MISMATCH_PASSWORD => Some("Passwords didn't match"),
            _ => None,
        })
    }
}

#[derive(Deserialize)]
pub struct OnboardingQuery {
    errors: Option<u8>,
}

pub async fn get_onboarding(
    State(state): State<SatchelState>,
    session: SatchelSession,
    tower_session: Session,
    Query(OnboardingQuery { errors }): Query<OnboardingQuery>,
) -> SatchelResult<Response> {
    //only for the very first account
    if state.users().any_exist().await? {
        return Ok(Redirect::to("/").into_response());
    }

    let errors = errors.map_or_else(
        NewAccountDetailsError::empty,
        NewAccountDetailsError::from_bits_truncate,
    );

    Ok(state
        .render(
            &session,
            &tower_session,
            html! {
                div class="flex items-center justify-center" {
                    div class="bg-gray-800 p-8 rounded-lg shadow-xl w-full max-w-md" {
                        (supertitle("Create the first account"))

                        @if !errors.is_empty() {
                            (errors_list(None, errors.as_nice_list()))
                        }

                        form method="post" action="/onboarding" {
                            (simple_form_element("display_name", "Name", true, None, None))
                            (simple_form_element("email", "Email", true, Some("email"), None))
                            (simple_form_element("password", "Password", true, Some("password"), None))
                            (simple_form_element("confirm_password", "Confirm Password", true, Some("password"), None))
                            (form_submit_button(Some("Create Account")))
                        }
                    }
                }
            },
        )
        .await?
        .into_response())
}

#[derive(Deserialize)]
pub struct CreateAccountForm {
    display_name: String,
    email: String,
    password: SecretString,
    confirm_password: SecretString,
}

pub async fn post_onboarding(
    State(state): State<SatchelState>,
    mut session: SatchelSession,
    tower_session: Session,
    Form(CreateAccountForm {
        display_name,
        email,
        password,
        confirm_password,
    }): Form<CreateAccountForm>,
) -> SatchelResult<Redirect> {
    if state.users().any_exist().await? {
        return Ok(Redirect::to("/"));
    }

    let display_name = display_name.trim().to_string();
    let email = EmailAddress::from_str(email.trim()).ok();

    let mut errors = NewAccountDetailsError::empty();
    if display_name.is_empty() {
        errors |= NewAccountDetailsError::EMPTY_DISPLAY_NAME;
    }
    if email.is_none() {
        errors |= NewAccountDetailsError::INVALID_EMAIL;
    }
    if password.expose_secret().trim().is_empty() {
        errors |= NewAccountDetailsError::EMPTY_PASSWORD;
    }
    if password.expose_secret() != confirm_password.expose_secret() {
        errors |= NewAccountDetailsError::MISMATCH_PASSWORD;
    }

    let Some(email) = email.filter(|_| errors.is_empty()) else {
        return Ok(Redirect::to(&format!("/onboarding?errors={}", errors.bits())));
    };

    let bcrypt_hashed_password = hash_password(password, state.config().bcrypt_cost()).await?;
    let Some(user) = state
        .users()
        .insert_first(NewUser {
            email,
            display_name,
            bcrypt_hashed_password,
        })
        .await?
    else {
        warn!("Someone else finished onboarding first");
        return Ok(Redirect::to("/"));
    };

    info!(id=?user.id, "Created first account");
    session.login(&user).await?;
    push_flash(&tower_session, format!("Welcome, {}!", user.display_name)).await?;

    Ok(Redirect::to("/"))
}
