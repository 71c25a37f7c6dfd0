//! Server-side rendering of the pages.
//!
//! The markup carries the ids and names the page script relies on:
//! `.messages li`, `title-<id>`, `body-<id>` and the `edit-form` fields.

use std::fmt::Write;

use crate::{
    dto::TITLE_MAX_LEN,
    models::Note,
    service::Page,
    session::{Flash, SessionUser},
};

const CLIENT_SCRIPT: &str = r#"<script type="module">
import init, { showEditModal } from "/static/pkg/notes_client.js";
await init();
window.showEditModal = showEditModal;
</script>"#;

/// Per-request data every page needs.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<SessionUser>,
    pub flashes: Vec<Flash>,
    pub csrf_token: String,
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn csrf_input(ctx: &PageContext) -> String {
    format!(
        r#"<input type="hidden" name="csrfmiddlewaretoken" value="{}">"#,
        escape(&ctx.csrf_token)
    )
}

fn messages(flashes: &[Flash]) -> String {
    if flashes.is_empty() {
        return String::new();
    }

    let mut out = String::from(r#"<ul class="messages">"#);
    for flash in flashes {
        let _ = write!(
            out,
            r#"<li class="{}">{}</li>"#,
            flash.level.css_class(),
            escape(&flash.text)
        );
    }
    out.push_str("</ul>");
    out
}

fn layout(title: &str, ctx: &PageContext, content: &str, script: bool) -> String {
    let nav = match &ctx.user {
        Some(user) => format!(
            r#"<span>Signed in as {}</span> <a href="/logout">Log out</a>"#,
            escape(&user.username)
        ),
        None => r#"<a href="/login">Log in</a> <a href="/signup">Sign up</a>"#.to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · Notes</title>
<link rel="stylesheet" href="/static/css/style.css">
</head>
<body>
<nav>{nav}</nav>
{messages}
<main>
{content}
</main>
{script}
</body>
</html>
"#,
        title = escape(title),
        messages = messages(&ctx.flashes),
        script = if script { CLIENT_SCRIPT } else { "" },
    )
}

pub fn signup_page(ctx: &PageContext) -> String {
    let content = format!(
        r#"<h1>Sign up</h1>
<form method="post" action="/signup">
{csrf}
<input class="form-control" type="text" id="txtUsername" name="username" maxlength="50" placeholder="User Name" autocomplete="off" autofocus required>
<input class="form-control" type="email" id="txtEmail" name="email" maxlength="250" placeholder="Email" autocomplete="off" required>
<input class="form-control" type="password" id="txtPassword" name="password" maxlength="50" placeholder="Password" autocomplete="off" required>
<button type="submit">Sign up</button>
</form>
<p>Already registered? <a href="/login">Log in</a></p>"#,
        csrf = csrf_input(ctx),
    );

    layout("Sign up", ctx, &content, false)
}

pub fn login_page(ctx: &PageContext) -> String {
    let content = format!(
        r#"<h1>Log in</h1>
<form method="post" action="/login">
{csrf}
<input class="form-control" type="text" id="txtUsername" name="username" maxlength="50" placeholder="User Name" autocomplete="off" autofocus required>
<input class="form-control" type="password" id="txtPassword" name="password" maxlength="50" placeholder="Password" autocomplete="off" required>
<button type="submit">Log in</button>
</form>
<p>No account yet? <a href="/signup">Sign up</a></p>"#,
        csrf = csrf_input(ctx),
    );

    layout("Log in", ctx, &content, false)
}

fn note_card(note: &Note) -> String {
    format!(
        r#"<article class="note">
<h3 id="title-{id}">{title}</h3>
<p id="body-{id}">{body}</p>
<button type="button" onclick="showEditModal({id})">Edit</button>
<a href="/?id={id}&amp;action=delete">Delete</a>
</article>"#,
        id = note.id,
        title = escape(&note.title),
        body = escape(&note.body),
    )
}

fn pagination(page: &Page<Note>) -> String {
    let mut out = String::from(r#"<nav class="pagination">"#);
    if page.has_previous() {
        let _ = write!(
            out,
            r#"<a href="?page=1">&laquo; first</a> <a href="?page={}">previous</a> "#,
            page.number - 1
        );
    }
    let _ = write!(
        out,
        r#"<span class="current">Page {} of {}</span>"#,
        page.number, page.num_pages
    );
    if page.has_next() {
        let _ = write!(
            out,
            r#" <a href="?page={}">next</a> <a href="?page={}">last &raquo;</a>"#,
            page.number + 1,
            page.num_pages
        );
    }
    out.push_str("</nav>");
    out
}

fn edit_modal(ctx: &PageContext) -> String {
    format!(
        r#"<button type="button" id="btnModal" hidden onclick="document.getElementById('editModal').showModal()"></button>
<dialog id="editModal">
<form id="edit-form" method="post" action="notes/">
{csrf}
<input type="hidden" id="note_id" name="note_id">
<input class="form-control" type="text" id="edit-title" name="title" maxlength="{TITLE_MAX_LEN}" required>
<textarea class="form-control" id="edit-body" name="body" required></textarea>
<button type="submit">Save</button>
<button type="button" onclick="document.getElementById('editModal').close()">Cancel</button>
</form>
</dialog>"#,
        csrf = csrf_input(ctx),
    )
}

pub fn home_page(ctx: &PageContext, page: &Page<Note>) -> String {
    let mut content = format!(
        r#"<h1>Notes</h1>
<form method="post" action="/">
{csrf}
<input class="form-control" type="text" id="txtTitle" name="title" maxlength="{TITLE_MAX_LEN}" placeholder="Title" autocomplete="off" required>
<textarea class="form-control" id="txtNote" name="body" placeholder="Notes" required></textarea>
<button type="submit">Add note</button>
</form>
<section class="notes">
"#,
        csrf = csrf_input(ctx),
    );

    if page.items.is_empty() {
        content.push_str("<p>No notes yet.</p>\n");
    }
    for note in &page.items {
        content.push_str(&note_card(note));
        content.push('\n');
    }
    content.push_str("</section>\n");
    content.push_str(&pagination(page));
    content.push('\n');
    content.push_str(&edit_modal(ctx));

    layout("Home", ctx, &content, true)
}
