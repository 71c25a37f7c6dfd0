use notes_client::{
    Document, EditFormSubmitter, HttpTransport, SubmitOutcome, show_edit_modal,
    headless::{HeadlessBrowser, HeadlessDocument},
    modal::{EDIT_BODY_FIELD, EDIT_TITLE_FIELD, MODAL_TOGGLE, NOTE_ID_FIELD},
    submit::{CSRF_FIELD, EDIT_FORM_ID, FAILURE_MESSAGE},
};
use reqwest::{
    StatusCode,
    header::{COOKIE, LOCATION, SET_COOKIE},
    redirect::Policy,
};

use std::{net::SocketAddr, sync::Arc};

use super::*;
use crate::{hasher::tests::fast_hasher, repository::MemoryRepository};

struct TestApp {
    addr: SocketAddr,
    client: reqwest::Client,
    state: Arc<AppState>,
}

impl TestApp {
    async fn spawn(page_size: u64) -> Self {
        Self::spawn_with(Config {
            page_size,
            ..Config::default()
        })
        .await
    }

    async fn spawn_with(config: Config) -> Self {
        let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
        let state = Arc::new(AppState::new(config, repo, Arc::new(fast_hasher())));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Self::browser_client(),
            state,
        }
    }

    /// Sends `GET path` with a hand-picked session cookie.
    async fn get_as(&self, session_id: &str, path: &str) -> reqwest::Response {
        reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .unwrap()
            .get(self.url(path))
            .header(COOKIE, format!("sessionid={session_id}"))
            .send()
            .await
            .unwrap()
    }

    fn browser_client() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .unwrap()
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        response.text().await.unwrap()
    }

    async fn post(&self, path: &str, fields: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(fields)
            .send()
            .await
            .unwrap()
    }

    /// Posts a form carrying the token rendered on `page_path`.
    async fn post_from(
        &self,
        page_path: &str,
        path: &str,
        fields: &[(&str, &str)],
    ) -> reqwest::Response {
        let token = csrf_token(&self.page(page_path).await);
        let mut fields = fields.to_vec();
        fields.push((CSRF_FIELD, &token));
        self.post(path, &fields).await
    }

    async fn sign_up_and_log_in(&self, username: &str) {
        let response = self
            .post_from(
                "/signup",
                "/signup",
                &[
                    ("username", username),
                    ("email", &format!("{username}@example.com")),
                    ("password", "secret"),
                ],
            )
            .await;
        assert_eq!(location(&response), "/login");

        let response = self
            .post_from(
                "/login",
                "/login",
                &[("username", username), ("password", "secret")],
            )
            .await;
        assert_eq!(location(&response), "/");
    }

    async fn add_note(&self, title: &str, body: &str) {
        let response = self
            .post_from("/", "/", &[("title", title), ("body", body)])
            .await;
        assert_eq!(location(&response), "/");
    }

    /// Mirrors the rendered home page in a headless document, the way the
    /// browser would see it before the edit modal is opened.
    async fn home_document(&self) -> HeadlessDocument {
        let html = self.page("/").await;
        let mut doc = HeadlessDocument::new()
            .with_field("csrf", &csrf_token(&html))
            .with_field(NOTE_ID_FIELD, "")
            .with_field(EDIT_TITLE_FIELD, "")
            .with_field(EDIT_BODY_FIELD, "")
            .with_field(MODAL_TOGGLE, "")
            .with_form(
                EDIT_FORM_ID,
                [
                    (CSRF_FIELD, "csrf"),
                    ("note_id", NOTE_ID_FIELD),
                    ("title", EDIT_TITLE_FIELD),
                    ("body", EDIT_BODY_FIELD),
                ],
            );
        for id in note_ids(&html) {
            doc = doc
                .with_text(&format!("title-{id}"), &element_text(&html, &format!("title-{id}")))
                .with_text(&format!("body-{id}"), &element_text(&html, &format!("body-{id}")));
        }
        doc
    }

    fn transport(&self) -> HttpTransport {
        HttpTransport::with_client(self.client.clone(), &self.url("/")).unwrap()
    }
}

fn location(response: &reqwest::Response) -> &str {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response.headers()[LOCATION].to_str().unwrap()
}

fn issued_session_id(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| value.strip_prefix("sessionid="))
        .and_then(|rest| rest.split(';').next())
        .map(str::to_string)
}

fn csrf_token(html: &str) -> String {
    let marker = r#"name="csrfmiddlewaretoken" value=""#;
    let start = html.find(marker).expect("page has no token") + marker.len();
    let end = start + html[start..].find('"').unwrap();
    html[start..end].to_string()
}

fn note_ids(html: &str) -> Vec<i64> {
    html.match_indices(r#"id="title-"#)
        .filter_map(|(at, marker)| {
            let rest = &html[at + marker.len()..];
            rest[..rest.find('"')?].parse().ok()
        })
        .collect()
}

fn element_text(html: &str, id: &str) -> String {
    let marker = format!(r#"id="{id}">"#);
    let start = html.find(&marker).unwrap() + marker.len();
    let end = start + html[start..].find('<').unwrap();
    html[start..end].to_string()
}

#[tokio::test]
async fn home_requires_login() {
    let app = TestApp::spawn(10).await;

    let response = app.get("/").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn session_cookie_is_issued_once() {
    let app = TestApp::spawn(10).await;

    let first = app.get("/login").await;
    let cookie = first.headers()["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with("sessionid="));
    assert!(cookie.contains("HttpOnly"));

    let second = app.get("/login").await;
    assert!(second.headers().get("set-cookie").is_none());
}

#[tokio::test]
async fn cookieless_traffic_keeps_session_store_bounded() {
    let app = TestApp::spawn_with(Config {
        max_sessions: 20,
        ..Config::default()
    })
    .await;
    let cookieless = reqwest::Client::new();

    for _ in 0..100 {
        let response = cookieless.get(app.url("/login")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert!(app.state.sessions.len().await <= 20);
}

#[tokio::test]
async fn login_rotates_the_session_cookie() {
    let app = TestApp::spawn(10).await;
    let anonymous = issued_session_id(&app.get("/signup").await).unwrap();

    let response = app
        .post_from(
            "/signup",
            "/signup",
            &[
                ("username", "ada"),
                ("email", "ada@example.com"),
                ("password", "secret"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/login");

    let response = app
        .post_from("/login", "/login", &[("username", "ada"), ("password", "secret")])
        .await;
    assert_eq!(location(&response), "/");
    let signed_in = issued_session_id(&response).expect("login issues a cookie");
    assert_ne!(signed_in, anonymous);

    // The pre-login id no longer carries the login.
    assert_eq!(location(&app.get_as(&anonymous, "/").await), "/login");
    assert_eq!(app.get_as(&signed_in, "/").await.status(), StatusCode::OK);

    app.get("/logout").await;
    assert_eq!(location(&app.get_as(&signed_in, "/").await), "/login");
    assert_eq!(location(&app.get("/").await), "/login");
}

#[tokio::test]
async fn signup_login_and_add_note() {
    let app = TestApp::spawn(10).await;
    app.sign_up_and_log_in("ada").await;

    let home = app.page("/").await;
    assert!(home.contains("You have successfully logged in!"));
    assert!(home.contains("Signed in as ada"));

    app.add_note("Groceries", "milk").await;

    let home = app.page("/").await;
    assert!(home.contains(r#"<ul class="messages"><li class="success">Note added successfully</li></ul>"#));
    assert_eq!(note_ids(&home).len(), 1);

    // Flashes are shown once.
    let home = app.page("/").await;
    assert!(!home.contains("messages"));
}

#[tokio::test]
async fn duplicate_signup_is_flashed() {
    let app = TestApp::spawn(10).await;
    app.sign_up_and_log_in("ada").await;
    app.get("/logout").await;

    let response = app
        .post_from(
            "/signup",
            "/signup",
            &[
                ("username", "ada"),
                ("email", "other@example.com"),
                ("password", "secret"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/signup");
    assert!(app.page("/signup").await.contains("User already exists"));
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::spawn(10).await;
    app.sign_up_and_log_in("ada").await;
    app.get("/logout").await;

    let response = app
        .post_from(
            "/login",
            "/login",
            &[("username", "ada"), ("password", "wrong")],
        )
        .await;
    assert_eq!(location(&response), "/login");
    assert!(app.page("/login").await.contains("User does not exist"));
}

#[tokio::test]
async fn forms_without_token_are_forbidden() {
    let app = TestApp::spawn(10).await;
    app.get("/signup").await;

    let response = app
        .post(
            "/signup",
            &[
                ("username", "ada"),
                ("email", "ada@example.com"),
                ("password", "secret"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_note_is_flashed() {
    let app = TestApp::spawn(10).await;
    app.sign_up_and_log_in("ada").await;

    let long_title = "t".repeat(251);
    let response = app
        .post_from("/", "/", &[("title", &long_title), ("body", "b")])
        .await;
    assert_eq!(location(&response), "/");

    let home = app.page("/").await;
    assert!(home.contains("title: Ensure this value has at most 250 characters (it has 251)."));
    assert!(note_ids(&home).is_empty());
}

#[tokio::test]
async fn delete_through_query() {
    let app = TestApp::spawn(10).await;
    app.sign_up_and_log_in("ada").await;
    app.add_note("Groceries", "milk").await;
    let id = note_ids(&app.page("/").await)[0];

    let response = app.get(&format!("/?id={id}&action=delete")).await;
    assert_eq!(location(&response), "/");
    let home = app.page("/").await;
    assert!(home.contains("Note deleted successfully"));
    assert!(note_ids(&home).is_empty());

    app.get(&format!("/?id={id}&action=delete")).await;
    assert!(app.page("/").await.contains("Note not found"));
}

#[tokio::test]
async fn listing_is_paginated() {
    let app = TestApp::spawn(2).await;
    app.sign_up_and_log_in("ada").await;
    for title in ["one", "two", "three"] {
        app.add_note(title, "body").await;
    }

    let first = app.page("/?page=1").await;
    assert_eq!(note_ids(&first).len(), 2);
    assert!(first.contains("Page 1 of 2"));

    let last = app.page("/?page=9").await;
    assert!(last.contains("Page 2 of 2"));
    assert!(last.contains(">three</h3>"));

    let fallback = app.page("/?page=abc").await;
    assert!(fallback.contains("Page 1 of 2"));
}

#[tokio::test]
async fn edit_form_updates_note_in_background() {
    let app = TestApp::spawn(10).await;
    app.sign_up_and_log_in("ada").await;
    app.add_note("Groceries", "milk").await;

    let doc = app.home_document().await;
    let id = note_ids(&app.page("/").await)[0];

    let draft = show_edit_modal(&doc, id).unwrap();
    assert_eq!(draft.title, "Groceries");
    assert_eq!(doc.clicks(MODAL_TOGGLE), 1);

    doc.set_value(EDIT_TITLE_FIELD, "Shopping");
    doc.set_value(EDIT_BODY_FIELD, "milk, eggs");

    let browser = HeadlessBrowser::new();
    let submitter = EditFormSubmitter::new(&doc, app.transport(), &browser);
    assert_eq!(submitter.submit().await, SubmitOutcome::Navigated);
    assert_eq!(browser.navigations(), vec!["/".to_string()]);

    let home = app.page("/").await;
    assert!(home.contains("Note updated successfully"));
    assert!(home.contains(&format!(r#"<h3 id="title-{id}">Shopping</h3>"#)));
    assert!(home.contains("milk, eggs"));
}

#[tokio::test]
async fn background_update_with_stale_token_alerts() {
    let app = TestApp::spawn(10).await;
    app.sign_up_and_log_in("ada").await;
    app.add_note("Groceries", "milk").await;

    let doc = app.home_document().await;
    let id = note_ids(&app.page("/").await)[0];
    show_edit_modal(&doc, id).unwrap();
    doc.set_value("csrf", "stale");

    let browser = HeadlessBrowser::new();
    let submitter = EditFormSubmitter::new(&doc, app.transport(), &browser);
    assert_eq!(submitter.submit().await, SubmitOutcome::Alerted);
    assert_eq!(browser.alerts(), vec![FAILURE_MESSAGE.to_string()]);
    assert!(browser.navigations().is_empty());
}

#[tokio::test]
async fn another_users_note_is_not_updated() {
    let app = TestApp::spawn(10).await;
    app.sign_up_and_log_in("ada").await;
    app.add_note("Private", "secret").await;
    let id = note_ids(&app.page("/").await)[0];

    let intruder = TestApp {
        addr: app.addr,
        client: TestApp::browser_client(),
        state: Arc::clone(&app.state),
    };
    intruder.sign_up_and_log_in("mallory").await;

    let token = csrf_token(&intruder.page("/").await);
    let id = id.to_string();
    let response = intruder
        .client
        .post(intruder.url("/notes/"))
        .header("X-CSRFToken", &token)
        .form(&[
            ("note_id", id.as_str()),
            ("title", "Owned"),
            ("body", "gone"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), r#"{"success":false}"#);

    // The client stays silent on a rejected update.
    let doc = intruder.home_document().await;
    doc.set_value(NOTE_ID_FIELD, &id);
    doc.set_value(EDIT_TITLE_FIELD, "Owned");
    doc.set_value(EDIT_BODY_FIELD, "gone");
    let browser = HeadlessBrowser::new();
    let submitter = EditFormSubmitter::new(&doc, intruder.transport(), &browser);
    assert_eq!(submitter.submit().await, SubmitOutcome::Ignored);
    assert!(browser.alerts().is_empty());
    assert!(browser.navigations().is_empty());

    assert!(app.page("/").await.contains(">Private</h3>"));
}

#[tokio::test]
async fn invalid_update_is_a_bad_request() {
    let app = TestApp::spawn(10).await;
    app.sign_up_and_log_in("ada").await;

    let token = csrf_token(&app.page("/").await);
    let response = app
        .post(
            "/notes/",
            &[
                (CSRF_FIELD, token.as_str()),
                ("note_id", "abc"),
                ("title", ""),
                ("body", "b"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), r#"{"success":false}"#);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::spawn(10).await;

    let response = app.get("/api-doc/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc: serde_json::Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert!(doc["paths"]["/notes/"]["post"].is_object());
}
