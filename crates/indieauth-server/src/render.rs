//! HTML rendering of the login form

use axum::response::{Html, IntoResponse, Response};
use html_escape::{encode_double_quoted_attribute, encode_text};
use indieauth::LoginView;

/// A [`LoginView`] rendered as an HTML response
#[derive(Debug, Clone)]
pub struct LoginPage(pub LoginView);

impl IntoResponse for LoginPage {
    fn into_response(self) -> Response {
        (self.0.status, Html(render_login(&self.0))).into_response()
    }
}

/// Render the login form
///
/// The h-app block identifies this instance to the authorization server,
/// which fetches the client identifier to show the user who is asking.
pub fn render_login(view: &LoginView) -> String {
    let title = encode_text(&view.title);
    let instance_url = encode_double_quoted_attribute(&view.instance_url);
    let form_action = encode_double_quoted_attribute(&view.form_action);
    let error = view
        .error
        .as_deref()
        .map(|message| format!("    <p class=\"message-error\">{}</p>\n", encode_text(message)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Sign in with IndieAuth - {title}</title>
    <style>
        body {{ font-family: sans-serif; margin: 40px; }}
        .message-error {{ color: #900; background-color: #fee; padding: 10px; }}
    </style>
</head>
<body>
    <div class="h-app">
        <a href="{instance_url}" class="u-url p-name">{title}</a>
    </div>
    <h1>Sign in with IndieAuth</h1>
{error}    <form action="{form_action}" method="post">
        <p>
            <label for="me">Your website</label>
            <input type="text" id="me" name="me" placeholder="example.com" autocomplete="url">
            <input type="submit" value="Sign in">
        </p>
    </form>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_h_app_and_form() {
        let html = render_login(&LoginView::form(
            "My Notes",
            "https://notes.example/",
            "/-/indieauth",
        ));

        assert!(html.contains(
            r#"<a href="https://notes.example/" class="u-url p-name">My Notes</a>"#
        ));
        assert!(html.contains(r#"<form action="/-/indieauth" method="post">"#));
        assert!(html.contains(r#"name="me""#));
        assert!(!html.contains("message-error\">"));
    }

    #[test]
    fn test_escapes_user_controlled_text() {
        let view = LoginView::form("<b>T</b>", "https://x.example/\"onclick=\"x", "/-/indieauth")
            .with_error("Invalid IndieAuth identifier: <script>");
        let html = render_login(&view);

        assert!(html.contains("&lt;b&gt;T&lt;/b&gt;"));
        assert!(!html.contains("\"onclick=\""));
        assert!(html.contains("Invalid IndieAuth identifier: &lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
