//! Compiled-in Tera templates
//!
//! Templates are embedded with `include_str!` so the binary has no runtime
//! dependency on the working directory.

use once_cell::sync::Lazy;
use tera::{Context, Tera};

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    (
        "includes/header.html",
        include_str!("../templates/includes/header.html"),
    ),
    (
        "includes/paginator.html",
        include_str!("../templates/includes/paginator.html"),
    ),
    (
        "includes/post_card.html",
        include_str!("../templates/includes/post_card.html"),
    ),
    (
        "posts/index.html",
        include_str!("../templates/posts/index.html"),
    ),
    (
        "posts/group_list.html",
        include_str!("../templates/posts/group_list.html"),
    ),
    (
        "posts/profile.html",
        include_str!("../templates/posts/profile.html"),
    ),
    (
        "posts/post_detail.html",
        include_str!("../templates/posts/post_detail.html"),
    ),
    (
        "posts/create_post.html",
        include_str!("../templates/posts/create_post.html"),
    ),
    (
        "posts/follow.html",
        include_str!("../templates/posts/follow.html"),
    ),
    (
        "posts/includes/comments.html",
        include_str!("../templates/posts/includes/comments.html"),
    ),
    (
        "users/signup.html",
        include_str!("../templates/users/signup.html"),
    ),
    (
        "users/login.html",
        include_str!("../templates/users/login.html"),
    ),
    (
        "users/logged_out.html",
        include_str!("../templates/users/logged_out.html"),
    ),
    ("core/404.html", include_str!("../templates/core/404.html")),
];

static TERA: Lazy<Result<Tera, tera::Error>> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())?;
    tera.autoescape_on(vec![".html"]);
    tera.set_escape_fn(escape_html);
    Ok(tera)
});

/// HTML escaping for `{{ }}` output. Unlike Tera's default this leaves `/`
/// alone so paths and URLs render verbatim.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a named template.
///
/// Template parse errors surface on the first render instead of panicking
/// at startup; `main` renders the 404 page once to fail fast.
pub fn render(name: &str, context: &Context) -> Result<String, tera::Error> {
    match TERA.as_ref() {
        Ok(tera) => tera.render(name, context),
        Err(e) => Err(tera::Error::msg(format!("template set failed to load: {e}"))),
    }
}

pub fn names() -> impl Iterator<Item = &'static str> {
    TEMPLATES.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_parse() {
        assert!(TERA.is_ok(), "{:?}", TERA.as_ref().err());
        assert_eq!(names().count(), TEMPLATES.len());
    }

    #[test]
    fn test_escaping_keeps_slashes() {
        assert_eq!(
            escape_html("<a href='/x'>&</a>"),
            "&lt;a href=&#x27;/x&#x27;&gt;&amp;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_404_renders_for_anonymous_user() {
        let mut context = Context::new();
        context.insert("user", &Option::<()>::None);
        context.insert("path", "/nowhere/");
        let html = render("core/404.html", &context).unwrap();
        assert!(html.contains("/nowhere/"));
        assert!(html.contains("Войти"));
    }
}
