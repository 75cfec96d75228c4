use super::router;
use crate::{
    auth::hash_password,
    config::RuntimeConfiguration,
    data::{
        photo::test_images::{GIF, PNG},
        student::{StudentFields, StudentOrder, ada_lovelace},
        user::NewUser,
    },
    state::SatchelState,
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use email_address::EmailAddress;
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{path::PathBuf, str::FromStr};
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use uuid::Uuid;

const BOUNDARY: &str = "satchel-test-boundary";
const EMAIL: &str = "grace@example.com";
const PASSWORD: &str = "hunter22";

#[derive(Clone, Copy)]
enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn ada_parts() -> Vec<Part<'static>> {
    vec![
        Part::Text("first_name", "Ada"),
        Part::Text("last_name", "Lovelace"),
        Part::Text("birth_date", "2010-01-01"),
        Part::Text("gender", "F"),
        Part::Text("current_academic_level", "p3"),
        Part::Text("enrolled_status", "Active"),
    ]
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(LOCATION)
        .expect("redirect without a location")
        .to_str()
        .unwrap()
}

fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(SET_COOKIE)
        .expect("no session cookie set")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn id_from_profile_url(url: &str) -> Uuid {
    Uuid::parse_str(url.trim_start_matches("/students/").trim_end_matches('/')).unwrap()
}

struct TestApp {
    app: Router,
    state: SatchelState,
    media_root: PathBuf,
}

impl TestApp {
    async fn new() -> Self {
        let media_root =
            std::env::temp_dir().join(format!("satchel-routes-test-{}", Uuid::new_v4()));
        let state = SatchelState::new(
            PgPoolOptions::new(),
            RuntimeConfiguration::in_memory(media_root.clone()),
        )
        .await
        .unwrap();
        let app = router(state.clone(), MemoryStore::default());

        Self {
            app,
            state,
            media_root,
        }
    }

    async fn with_account() -> Self {
        let test = Self::new().await;
        test.state
            .users()
            .insert(NewUser {
                email: EmailAddress::from_str(EMAIL).unwrap(),
                display_name: "Grace Hopper".into(),
                bcrypt_hashed_password: hash_password(SecretString::from(PASSWORD), 4)
                    .await
                    .unwrap(),
            })
            .await
            .unwrap();
        test
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::get(uri);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, cookie: Option<&str>, body: &str) -> Response {
        let mut request = Request::post(uri).header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        self.send(request.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn post_multipart(&self, uri: &str, cookie: &str, parts: &[Part<'_>]) -> Response {
        let request = Request::post(uri)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(COOKIE, cookie)
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.send(request).await
    }

    async fn login(&self) -> String {
        let response = self
            .post_form(
                "/login",
                None,
                &format!("email={EMAIL}&password={PASSWORD}"),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        session_cookie(&response)
    }

    async fn create_ada(&self, cookie: &str, extra: &[Part<'_>]) -> Uuid {
        let mut parts: Vec<Part<'_>> = ada_parts();
        parts.extend(extra.iter().copied());
        let response = self
            .post_multipart("/students/create/", cookie, &parts)
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        id_from_profile_url(location(&response))
    }
}

#[tokio::test]
async fn anonymous_changes_are_sent_to_login() {
    let test = TestApp::with_account().await;
    let id = test.state.students().create(ada_lovelace()).await.unwrap().id;

    for uri in [
        "/students/create/".to_string(),
        format!("/students/{id}/edit/"),
        format!("/students/{id}/delete/"),
    ] {
        let response = test.get(&uri, None).await;
        assert!(response.status().is_redirection(), "{uri} wasn't guarded");
        assert!(location(&response).starts_with("/login?next="));
    }

    let response = test
        .post_form(&format!("/students/{id}/delete/"), None, "")
        .await;
    assert!(response.status().is_redirection());
    assert!(test.state.students().get(id).await.unwrap().is_some());
}

#[tokio::test]
async fn reading_needs_no_login() {
    let test = TestApp::with_account().await;

    let response = test.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No students on record yet."));

    let response = test.get("/students/list/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("There are no students yet."));

    let id = test.state.students().create(ada_lovelace()).await.unwrap().id;
    let response = test.get(&format!("/students/{id}/"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Ada Lovelace"));
    assert!(body.contains("Primary 3"));
    assert!(!body.contains("/edit/"));
}

#[tokio::test]
async fn unknown_students_are_not_found() {
    let test = TestApp::with_account().await;
    let cookie = test.login().await;

    let response = test.get("/students/not-a-uuid/", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let missing = Uuid::new_v4();
    let response = test.get(&format!("/students/{missing}/"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = test
        .get(&format!("/students/{missing}/edit/"), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = test
        .post_form(&format!("/students/{missing}/delete/"), Some(&cookie), "")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ada_from_creation_to_deletion() {
    let test = TestApp::with_account().await;
    let cookie = test.login().await;

    let response = test.get("/students/create/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let id = test.create_ada(&cookie, &[]).await;
    let stored = test.state.students().get(id).await.unwrap().unwrap();
    assert_eq!(stored.fields(), ada_lovelace());

    let profile = format!("/students/{id}/");
    let body = body_text(test.get(&profile, Some(&cookie)).await).await;
    assert!(body.contains("Ada Lovelace"));
    assert!(body.contains("was created successfully."));
    assert!(body.contains(&format!("/students/{id}/edit/")));

    //flash messages only show up once
    let body = body_text(test.get(&profile, Some(&cookie)).await).await;
    assert!(!body.contains("was created successfully."));

    let listed = test.state.students().list(Default::default()).await.unwrap();
    assert_eq!(listed.first().map(|student| student.id), Some(id));
    let body = body_text(test.get("/students/list/", None).await).await;
    assert!(body.contains("Ada Lovelace"));

    let response = test
        .post_form(&format!("/students/{id}/delete/"), Some(&cookie), "")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/students/list/");
    assert!(test.state.students().get(id).await.unwrap().is_none());

    let body = body_text(test.get("/students/list/", Some(&cookie)).await).await;
    assert!(body.contains("was deleted successfully."));

    let response = test.get(&profile, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_submissions_are_shown_again() {
    let test = TestApp::with_account().await;
    let cookie = test.login().await;

    let response = test
        .post_multipart(
            "/students/create/",
            &cookie,
            &[
                Part::Text("first_name", "Ada"),
                Part::Text("last_name", ""),
                Part::Text("birth_date", "01/01/2010"),
                Part::Text("gender", "X"),
                Part::Text("current_academic_level", "p3"),
                Part::Text("enrolled_status", "Active"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_text(response).await;
    assert!(body.contains(r#"value="Ada""#));
    assert!(body.contains("This field is required."));
    assert!(body.contains("Enter a valid date."));
    assert!(body.contains("Select a valid choice. X is not one of the available choices."));
    assert_eq!(test.state.students().count().await.unwrap(), 0);
}

#[tokio::test]
async fn future_birth_dates_are_kept() {
    let test = TestApp::with_account().await;
    let cookie = test.login().await;

    let mut parts = ada_parts();
    parts[2] = Part::Text("birth_date", "2999-01-01");
    let response = test.post_multipart("/students/create/", &cookie, &parts).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let students = test
        .state
        .students()
        .list(StudentOrder::NewestFirst)
        .await
        .unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].birth_date, time::macros::date!(2999 - 01 - 01));
}

#[tokio::test]
async fn blank_choices_are_shown_again() {
    let test = TestApp::with_account().await;
    let cookie = test.login().await;

    let mut parts = ada_parts();
    parts[3] = Part::Text("gender", "");
    let response = test.post_multipart("/students/create/", &cookie, &parts).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("This field is required."));
    assert_eq!(test.state.students().count().await.unwrap(), 0);
}

#[tokio::test]
async fn looking_at_delete_does_not_delete() {
    let test = TestApp::with_account().await;
    let cookie = test.login().await;
    let id = test.state.students().create(ada_lovelace()).await.unwrap().id;

    let response = test
        .get(&format!("/students/{id}/delete/"), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Are you sure"));
    assert!(test.state.students().get(id).await.unwrap().is_some());
}

#[tokio::test]
async fn photos_are_stored_served_and_checked() {
    let test = TestApp::with_account().await;
    let cookie = test.login().await;

    let id = test
        .create_ada(&cookie, &[Part::File("photo", "ada.png", PNG)])
        .await;
    let key = test
        .state
        .students()
        .get(id)
        .await
        .unwrap()
        .unwrap()
        .photo
        .expect("photo wasn't kept");
    assert!(test.media_root.join(&key).exists());

    let response = test.get(&format!("/media/{key}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], PNG);

    let mut parts = ada_parts();
    parts.push(Part::File("photo", "ada.gif", GIF));
    let response = test
        .post_multipart("/students/create/", &cookie, &parts)
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Upload a valid image."));
    assert_eq!(test.state.students().count().await.unwrap(), 1);

    //an empty file part is just "no photo"
    let mut parts = ada_parts();
    parts.push(Part::File("photo", "", &[]));
    let response = test
        .post_multipart("/students/create/", &cookie, &parts)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn editing_replaces_fields_and_clears_photos() {
    let test = TestApp::with_account().await;
    let cookie = test.login().await;
    let id = test
        .create_ada(&cookie, &[Part::File("photo", "ada.png", PNG)])
        .await;
    let before = test.state.students().get(id).await.unwrap().unwrap();
    let old_photo = before.photo.clone().unwrap();

    let edit = format!("/students/{id}/edit/");
    let body = body_text(test.get(&edit, Some(&cookie)).await).await;
    assert!(body.contains(r#"value="Lovelace""#));
    assert!(body.contains("Remove current photo"));

    let mut parts = ada_parts();
    parts[1] = Part::Text("last_name", "Byron");
    parts.push(Part::Text("photo_clear", "on"));
    let response = test.post_multipart(&edit, &cookie, &parts).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/students/{id}/"));

    let after = test.state.students().get(id).await.unwrap().unwrap();
    assert_eq!(
        after.fields(),
        StudentFields {
            last_name: "Byron".into(),
            ..ada_lovelace()
        }
    );
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at > before.updated_at);
    assert!(!test.media_root.join(&old_photo).exists());

    let body = body_text(test.get(&format!("/students/{id}/"), Some(&cookie)).await).await;
    assert!(body.contains("was updated successfully."));

    //a bad edit leaves the record alone
    let mut parts = ada_parts();
    parts[0] = Part::Text("first_name", " ");
    let response = test.post_multipart(&edit, &cookie, &parts).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(test.state.students().get(id).await.unwrap().unwrap(), after);
}

#[tokio::test]
async fn list_can_be_sorted_by_last_name() {
    let test = TestApp::with_account().await;
    for (first_name, last_name) in [("Zed", "Able"), ("Amy", "Zulu"), ("Bob", "Moss")] {
        test.state
            .students()
            .create(StudentFields {
                first_name: first_name.into(),
                last_name: last_name.into(),
                ..ada_lovelace()
            })
            .await
            .unwrap();
    }

    let body = body_text(test.get("/students/list/?order=last_name", None).await).await;
    let able = body.find("Zed Able").unwrap();
    let moss = body.find("Bob Moss").unwrap();
    let zulu = body.find("Amy Zulu").unwrap();
    assert!(able < moss && moss < zulu);

    let response = test.get("/students/list/?order=sideways", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn first_visit_goes_through_onboarding() {
    let test = TestApp::new().await;

    let response = test.get("/login", None).await;
    assert_eq!(location(&response), "/onboarding");

    let response = test
        .post_form(
            "/onboarding",
            None,
            "display_name=Grace&email=grace%40example.com&password=pw&confirm_password=nope",
        )
        .await;
    assert_eq!(location(&response), "/onboarding?errors=16");
    assert!(!test.state.users().any_exist().await.unwrap());

    let response = test
        .post_form(
            "/onboarding",
            None,
            "display_name=Grace&email=grace%40example.com&password=pw&confirm_password=pw",
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response);

    let body = body_text(test.get("/profile", Some(&cookie)).await).await;
    assert!(body.contains("grace@example.com"));

    let response = test.get("/onboarding", None).await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn racing_onboardings_make_one_account() {
    let test = TestApp::new().await;

    let (grace, ada) = tokio::join!(
        test.post_form(
            "/onboarding",
            None,
            "display_name=Grace&email=grace%40example.com&password=pw&confirm_password=pw",
        ),
        test.post_form(
            "/onboarding",
            None,
            "display_name=Ada&email=ada%40example.com&password=pw&confirm_password=pw",
        ),
    );
    assert_eq!(location(&grace), "/");
    assert_eq!(location(&ada), "/");

    let users = test.state.users();
    let grace = users.get_by_email("grace@example.com").await.unwrap();
    let ada = users.get_by_email("ada@example.com").await.unwrap();
    assert_eq!(usize::from(grace.is_some()) + usize::from(ada.is_some()), 1);
}

#[tokio::test]
async fn login_checks_passwords_and_next() {
    let test = TestApp::with_account().await;

    let response = test
        .post_form("/login", None, &format!("email={EMAIL}&password=wrong"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Email/Password not found"));

    let response = test
        .post_form(
            "/login",
            None,
            &format!("email={EMAIL}&password={PASSWORD}&next=%2Fstudents%2Fcreate%2F"),
        )
        .await;
    assert_eq!(location(&response), "/students/create/");

    let response = test
        .post_form(
            "/login",
            None,
            &format!("email={EMAIL}&password={PASSWORD}&next=https%3A%2F%2Fexample.com%2F"),
        )
        .await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn logging_out_ends_the_session() {
    let test = TestApp::with_account().await;
    let cookie = test.login().await;

    let response = test.get("/students/create/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = test.post_form("/logout", Some(&cookie), "").await;
    assert_eq!(location(&response), "/");

    let response = test.get("/students/create/", Some(&cookie)).await;
    assert!(response.status().is_redirection());

    let response = test.get("/profile", None).await;
    assert!(location(&response).starts_with("/login"));
}
