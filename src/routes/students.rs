use crate::{
    auth::SatchelSession,
    data::student::{
        Choice, Field, FieldKind, FieldSpec, STUDENT_FIELDS, Student, StudentOrder, today,
    },
    error::{InvalidStudentIdSnafu, MissingStudentSnafu, SatchelResult},
    flash::push_flash,
    forms::{
        CLEAR_PHOTO_FIELD, FormErrors, PhotoChange, RawStudentForm, ValidatedStudent, format_date,
    },
    maud_conveniences::{form_submit_button, render_table, subtitle, title},
    state::SatchelState,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_login::tower_sessions::Session;
use maud::{Markup, html};
use serde::Deserialize;
use snafu::OptionExt;
use uuid::Uuid;

const LIST_URL: &str = "/students/list/";
const INPUT_CLASSES: &str = "shadow appearance-none border rounded w-full py-2 px-3 bg-gray-700 text-gray-200 leading-tight focus:outline-none focus:shadow-outline";

fn parse_id(original: String) -> SatchelResult<Uuid> {
    Uuid::parse_str(&original)
        .ok()
        .context(InvalidStudentIdSnafu { original })
}

async fn load_student(state: &SatchelState, id: Uuid) -> SatchelResult<Student> {
    state
        .students()
        .get(id)
        .await?
        .context(MissingStudentSnafu { id })
}

#[derive(Deserialize)]
pub struct ListQuery {
    order: Option<String>,
}

pub async fn get_student_list(
    State(state): State<SatchelState>,
    session: SatchelSession,
    tower_session: Session,
    Query(ListQuery { order }): Query<ListQuery>,
) -> SatchelResult<Markup> {
    let order = StudentOrder::from_query(order.as_deref());
    let students = state.students().list(order).await?;
    let today = today();

    let rows: Vec<[Markup; 6]> = students
        .iter()
        .map(|student| {
            [
                html! { a href=(student.profile_url()) class="text-blue-300 underline" {(student.name())} },
                html! { (student.age_on(today)) },
                html! { (student.gender.label()) },
                html! { (student.current_academic_level.label()) },
                html! { (student.enrolled_status.label()) },
                html! { (format_date(student.created_at.date())) },
            ]
        })
        .collect();

    state
        .render(
            &session,
            &tower_session,
            html! {
                div class="flex flex-row space-x-2 mb-4 self-end" {
                    span class="text-gray-400" {"Sort:"}
                    @for option in StudentOrder::ALL {
                        @if option == order {
                            span class="font-bold" {(option.label())}
                        } @else {
                            a href={(LIST_URL) "?order=" (option.query())} class="text-blue-300 underline" {(option.label())}
                        }
                    }
                }
                @if students.is_empty() {
                    (title("Students"))
                    p class="text-gray-300" {"There are no students yet."}
                } @else {
                    (render_table(
                        "Students",
                        ["Name", "Age", "Gender", "Level", "Status", "Created"],
                        rows,
                    ))
                }
            },
        )
        .await
}

pub async fn get_student_profile(
    State(state): State<SatchelState>,
    session: SatchelSession,
    tower_session: Session,
    Path(id): Path<String>,
) -> SatchelResult<Markup> {
    let student = load_student(&state, parse_id(id)?).await?;
    let photo_url = state.photo_url(&student).await?;

    let rows: [(&str, String); 7] = [
        (Field::FirstName.spec().label, student.first_name.clone()),
        (Field::LastName.spec().label, student.last_name.clone()),
        (
            Field::BirthDate.spec().label,
            format_date(student.birth_date),
        ),
        ("Age", student.age().to_string()),
        (Field::Gender.spec().label, student.gender.label().into()),
        (
            Field::CurrentAcademicLevel.spec().label,
            student.current_academic_level.label().into(),
        ),
        (
            Field::EnrolledStatus.spec().label,
            student.enrolled_status.label().into(),
        ),
    ];

    state
        .render(
            &session,
            &tower_session,
            html! {
                div class="bg-gray-800 p-8 rounded shadow-md w-full max-w-lg" {
                    (title(student.name()))
                    @if let Some(photo_url) = photo_url {
                        img src=(photo_url) alt={"Photo of " (student.name())} class="w-40 h-40 object-cover rounded mb-4" {}
                    }
                    dl class="grid grid-cols-2 gap-2 mb-4" {
                        @for (label, value) in rows {
                            dt class="font-bold text-gray-300" {(label)}
                            dd class="text-gray-200" {(value)}
                        }
                    }
                    p class="text-sm text-gray-400" {
                        "Added " (format_date(student.created_at.date()))
                        ", last changed " (format_date(student.updated_at.date()))
                    }
                    div class="flex flex-row space-x-4 mt-6" {
                        a href=(LIST_URL) class="text-blue-300 underline" {"Back to all students"}
                        @if session.user.is_some() {
                            a href={(student.profile_url()) "edit/"} class="text-blue-300 underline" {"Edit"}
                            a href={(student.profile_url()) "delete/"} class="text-red-300 underline" {"Delete"}
                        }
                    }
                }
            },
        )
        .await
}

fn field_input(
    spec: &FieldSpec,
    form: &RawStudentForm,
    errors: &FormErrors,
    current_photo_url: Option<&str>,
) -> Markup {
    let name = spec.field.name();
    let value = form.value(spec.field);

    html! {
        div class="mb-4" {
            label for=(name) class="block text-sm font-bold mb-2 text-gray-300" {(spec.label)}
            @match spec.kind {
                FieldKind::Text { max_len } => {
                    input type="text" id=(name) name=(name) value=(value) maxlength=(max_len) required[spec.required] class=(INPUT_CLASSES) {}
                }
                FieldKind::Date => {
                    input type="date" id=(name) name=(name) value=(value) required[spec.required] class=(INPUT_CLASSES) {}
                }
                FieldKind::Choice(choices) => {
                    select id=(name) name=(name) class=(INPUT_CLASSES) {
                        @for (code, label) in choices {
                            option value=(code) selected[*code == value] {(label)}
                        }
                    }
                }
                FieldKind::Image { accept } => {
                    @if let Some(current_photo_url) = current_photo_url {
                        img src=(current_photo_url) alt="Current photo" class="w-24 h-24 object-cover rounded mb-2" {}
                        label class="block text-sm text-gray-300 mb-2" {
                            input type="checkbox" name=(CLEAR_PHOTO_FIELD) value="on" {}
                            " Remove current photo"
                        }
                    }
                    input type="file" id=(name) name=(name) accept=(accept) class=(INPUT_CLASSES) {}
                }
            }
            @for message in errors.for_field(spec.field) {
                p class="text-red-400 text-sm mt-1" {(message)}
            }
        }
    }
}

struct StudentFormPage<'a> {
    heading: String,
    action: String,
    cancel_href: String,
    submit_text: &'static str,
    current_photo_url: Option<&'a str>,
}

async fn render_student_form(
    state: &SatchelState,
    session: &SatchelSession,
    tower_session: &Session,
    page: StudentFormPage<'_>,
    form: &RawStudentForm,
    errors: &FormErrors,
) -> SatchelResult<Markup> {
    state
        .render(
            session,
            tower_session,
            html! {
                div class="bg-gray-800 p-8 rounded shadow-md w-full max-w-lg" {
                    (title(page.heading))
                    @if !errors.is_empty() {
                        p class="text-red-400 mb-4" {"Please correct the errors below."}
                    }
                    form method="post" action=(page.action) enctype="multipart/form-data" {
                        @for spec in &STUDENT_FIELDS {
                            (field_input(spec, form, errors, page.current_photo_url))
                        }
                        div class="flex flex-row items-center space-x-4" {
                            (form_submit_button(Some(page.submit_text)))
                            a href=(page.cancel_href) class="text-blue-300 underline" {"Cancel"}
                        }
                    }
                }
            },
        )
        .await
}

fn create_page() -> StudentFormPage<'static> {
    StudentFormPage {
        heading: "Add Student".into(),
        action: "/students/create/".into(),
        cancel_href: LIST_URL.into(),
        submit_text: "Create",
        current_photo_url: None,
    }
}

fn edit_page<'a>(student: &Student, current_photo_url: Option<&'a str>) -> StudentFormPage<'a> {
    StudentFormPage {
        heading: format!("Edit {}", student.name()),
        action: format!("{}edit/", student.profile_url()),
        cancel_href: student.profile_url(),
        submit_text: "Save",
        current_photo_url,
    }
}

pub async fn get_create_student(
    State(state): State<SatchelState>,
    session: SatchelSession,
    tower_session: Session,
) -> SatchelResult<Markup> {
    render_student_form(
        &state,
        &session,
        &tower_session,
        create_page(),
        &RawStudentForm::defaults(),
        &FormErrors::default(),
    )
    .await
}

pub async fn post_create_student(
    State(state): State<SatchelState>,
    session: SatchelSession,
    tower_session: Session,
    multipart: Multipart,
) -> SatchelResult<Response> {
    let form = RawStudentForm::from_multipart(multipart).await?;
    let ValidatedStudent {
        mut fields,
        photo_change,
    } = match form.validate() {
        Ok(validated) => validated,
        Err(errors) => {
            let page = render_student_form(&state, &session, &tower_session, create_page(), &form, &errors).await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let saved_photo = match photo_change {
        PhotoChange::Replace(upload) => Some(state.photos().save(upload).await?),
        PhotoChange::Keep | PhotoChange::Clear => None,
    };
    fields.photo.clone_from(&saved_photo);

    let student = match state.students().create(fields).await {
        Ok(student) => student,
        Err(e) => {
            if let Some(key) = saved_photo {
                state.remove_photo_quietly(&key).await;
            }
            return Err(e);
        }
    };

    info!(id=?student.id, "Created student");
    push_flash(
        &tower_session,
        format!("Student \"{}\" was created successfully.", student.name()),
    )
    .await?;

    Ok(Redirect::to(&student.profile_url()).into_response())
}

pub async fn get_edit_student(
    State(state): State<SatchelState>,
    session: SatchelSession,
    tower_session: Session,
    Path(id): Path<String>,
) -> SatchelResult<Markup> {
    let student = load_student(&state, parse_id(id)?).await?;
    let photo_url = state.photo_url(&student).await?;

    render_student_form(
        &state,
        &session,
        &tower_session,
        edit_page(&student, photo_url.as_deref()),
        &RawStudentForm::from_student(&student),
        &FormErrors::default(),
    )
    .await
}

pub async fn post_edit_student(
    State(state): State<SatchelState>,
    session: SatchelSession,
    tower_session: Session,
    Path(id): Path<String>,
    multipart: Multipart,
) -> SatchelResult<Response> {
    let id = parse_id(id)?;
    let existing = load_student(&state, id).await?;

    let form = RawStudentForm::from_multipart(multipart).await?;
    let ValidatedStudent {
        mut fields,
        photo_change,
    } = match form.validate() {
        Ok(validated) => validated,
        Err(errors) => {
            let photo_url = state.photo_url(&existing).await?;
            let page = render_student_form(
                &state,
                &session,
                &tower_session,
                edit_page(&existing, photo_url.as_deref()),
                &form,
                &errors,
            )
            .await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    //(what the student ends up with, what we just saved, what to remove once the update lands)
    let (photo, saved_photo, replaced_photo) = match photo_change {
        PhotoChange::Keep => (existing.photo.clone(), None, None),
        PhotoChange::Clear => (None, None, existing.photo.clone()),
        PhotoChange::Replace(upload) => {
            let key = state.photos().save(upload).await?;
            (Some(key.clone()), Some(key), existing.photo.clone())
        }
    };
    fields.photo = photo;

    let updated = match state
        .students()
        .update(id, fields)
        .await
        .and_then(|updated| updated.context(MissingStudentSnafu { id }))
    {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(key) = saved_photo {
                state.remove_photo_quietly(&key).await;
            }
            return Err(e);
        }
    };

    if let Some(key) = replaced_photo {
        state.remove_photo_quietly(&key).await;
    }

    info!(?id, "Updated student");
    push_flash(
        &tower_session,
        format!("Student \"{}\" was updated successfully.", updated.name()),
    )
    .await?;

    Ok(Redirect::to(&updated.profile_url()).into_response())
}

///never deletes anything, just asks
pub async fn get_delete_student(
    State(state): State<SatchelState>,
    session: SatchelSession,
    tower_session: Session,
    Path(id): Path<String>,
) -> SatchelResult<Markup> {
    let student = load_student(&state, parse_id(id)?).await?;

    state
        .render(
            &session,
            &tower_session,
            html! {
                div class="bg-gray-800 p-8 rounded shadow-md w-full max-w-lg" {
                    (title("Delete Student"))
                    (subtitle(student.name()))
                    p class="mb-6 text-gray-300" {
                        "Are you sure you want to delete this student? This can't be undone."
                    }
                    form method="post" action={(student.profile_url()) "delete/"} class="flex flex-row items-center space-x-4" {
                        button type="submit" class="bg-red-600 hover:bg-red-800 text-white font-bold py-2 px-4 rounded" {"Yes, delete"}
                        a href=(student.profile_url()) class="text-blue-300 underline" {"Cancel"}
                    }
                }
            },
        )
        .await
}

pub async fn post_delete_student(
    State(state): State<SatchelState>,
    session: SatchelSession,
    tower_session: Session,
    Path(id): Path<String>,
) -> SatchelResult<Redirect> {
    let id = parse_id(id)?;
    let student = load_student(&state, id).await?;

    if !state.students().delete(id).await? {
        //someone else got there first
        return MissingStudentSnafu { id }.fail();
    }
    if let Some(key) = &student.photo {
        state.remove_photo_quietly(key).await;
    }

    info!(?id, "Deleted student");
    push_flash(
        &tower_session,
        format!("Student \"{}\" was deleted successfully.", student.name()),
    )
    .await?;

    Ok(Redirect::to(LIST_URL))
}
