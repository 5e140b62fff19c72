//! services/web/src/web/views.rs
//!
//! Minimal HTML rendering. Post content is stored raw, so every
//! user-supplied value is escaped here, on output, and nowhere else.

use artblog_core::domain::{Flash, FlashKind, Post, User};
use axum::response::Html;

/// Escapes a value for interpolation into HTML text or attributes.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn nav(user: Option<&User>) -> String {
    match user {
        Some(user) => format!(
            r#"<nav><a href="/">Home</a> <a href="/add">New post</a>
<span>{}</span> <a href="/logout">Log out</a></nav>"#,
            escape(&user.username)
        ),
        None => {
            r#"<nav><a href="/">Home</a> <a href="/login">Log in</a> <a href="/signup">Sign up</a></nav>"#
                .to_string()
        }
    }
}

fn flash_banner(flash: Option<&Flash>) -> String {
    match flash {
        Some(flash) => {
            let class = match flash.kind {
                FlashKind::Success => "flash-success",
                FlashKind::Error => "flash-error",
            };
            format!(r#"<p class="{}">{}</p>"#, class, escape(&flash.message))
        }
        None => String::new(),
    }
}

fn layout(title: &str, user: Option<&User>, flash: Option<&Flash>, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n\
         <body>{}{}\n{}\n</body></html>",
        escape(title),
        nav(user),
        flash_banner(flash),
        body
    ))
}

pub fn index(user: Option<&User>, flash: Option<&Flash>, posts: &[Post]) -> Html<String> {
    let mut body = String::from("<main>");
    for post in posts {
        body.push_str(&format!(
            r#"<article><a href="/{id}"><img src="{image}" alt=""><h2>{title}</h2></a>
<p>by {author} on {date}</p></article>"#,
            id = post.id,
            image = escape(&post.image),
            title = escape(&post.title),
            author = escape(&post.author),
            date = post.created_at.format("%Y-%m-%d"),
        ));
    }
    body.push_str("</main>");
    layout("The Art Blog", user, flash, &body)
}

pub fn post_detail(user: Option<&User>, post: &Post) -> Html<String> {
    let is_owner = user.map(|u| u.username == post.author).unwrap_or(false);
    let controls = if is_owner {
        format!(
            r#"<p><a href="/{id}/edit">Edit</a></p>
<form method="post" action="/{id}?_method=DELETE"><button type="submit">Delete</button></form>"#,
            id = post.id
        )
    } else {
        String::new()
    };
    let edited = match post.edited_at {
        Some(edited_at) => format!(" (edited {})", edited_at.format("%Y-%m-%d %H:%M")),
        None => String::new(),
    };
    let body = format!(
        r#"<article><h1>{title}</h1><img src="{image}" alt="">
<p>by {author} on {date}{edited}</p><div>{content}</div>{controls}</article>"#,
        title = escape(&post.title),
        image = escape(&post.image),
        author = escape(&post.author),
        date = post.created_at.format("%Y-%m-%d"),
        edited = edited,
        content = escape(&post.content),
        controls = controls,
    );
    layout(&post.title, user, None, &body)
}

pub fn signup(user: Option<&User>, flash: Option<&Flash>) -> Html<String> {
    let body = r#"<form method="post" action="/signup">
<label>Username <input name="username" required></label>
<label>Email <input name="email" type="email" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Sign up</button>
</form>"#;
    layout("Sign up", user, flash, body)
}

pub fn login(user: Option<&User>, flash: Option<&Flash>) -> Html<String> {
    let body = r#"<form method="post" action="/login">
<label>Username <input name="username" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Log in</button>
</form>"#;
    layout("Log in", user, flash, body)
}

pub fn add_post(user: Option<&User>, flash: Option<&Flash>) -> Html<String> {
    let body = r#"<form method="post" action="/add">
<label>Image URL <input name="image" required></label>
<label>Title <input name="title" required></label>
<label>Content <textarea name="content" required></textarea></label>
<button type="submit">Publish</button>
</form>"#;
    layout("New post", user, flash, body)
}

pub fn edit_post(user: Option<&User>, post: &Post) -> Html<String> {
    let body = format!(
        r#"<form method="post" action="/{id}?_method=PUT">
<label>Image URL <input name="image" value="{image}" required></label>
<label>Title <input name="title" value="{title}" required></label>
<label>Content <textarea name="content" required>{content}</textarea></label>
<button type="submit">Save</button>
</form>"#,
        id = post.id,
        image = escape(&post.image),
        title = escape(&post.title),
        content = escape(&post.content),
    );
    layout("Edit post", user, None, &body)
}

pub fn not_found() -> Html<String> {
    layout("Not found", None, None, "<p>That post does not exist.</p>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn stored_raw_content_is_escaped_on_output() {
        let post = Post {
            id: Uuid::new_v4(),
            author: "alice".to_string(),
            image: "i.png".to_string(),
            title: "<b>Hi</b>".to_string(),
            content: "a < b".to_string(),
            created_at: Utc::now(),
            edited_at: None,
        };
        let Html(page) = post_detail(None, &post);
        assert!(page.contains("&lt;b&gt;Hi&lt;/b&gt;"));
        assert!(page.contains("a &lt; b"));
        assert!(!page.contains("<b>Hi</b>"));
    }
}
