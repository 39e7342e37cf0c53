//! View data for the login form
//!
//! The engine does not render HTML; hosts turn a [`LoginView`] into a page.

use http::StatusCode;
use serde::Serialize;

use crate::error::Error;

/// What the login form should show, and with which status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginView {
    /// Instance title, shown in the h-app block
    pub title: String,
    /// Absolute URL of the instance, linked from the h-app block
    pub instance_url: String,
    /// Where the identifier form posts to
    pub form_action: String,
    /// Inline error message
    pub error: Option<String>,
    /// Response status
    #[serde(skip)]
    pub status: StatusCode,
}

impl LoginView {
    /// A blank form
    pub fn form(
        title: impl Into<String>,
        instance_url: impl Into<String>,
        form_action: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            instance_url: instance_url.into(),
            form_action: form_action.into(),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Show `message` above the form
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Override the response status
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// The form as shown to a request the access gate denied
    pub fn forbidden(self) -> Self {
        self.with_status(StatusCode::FORBIDDEN)
    }

    /// Show an engine error.
    ///
    /// User-facing failures keep the status their class calls for (400 for a
    /// bad `state`, 200 otherwise); internal failures become a generic 500.
    pub fn for_error(self, error: &Error) -> Self {
        match (error.user_message(), error) {
            (Some(message), Error::Callback(callback)) => {
                self.with_error(message).with_status(callback.status_code())
            }
            (Some(message), _) => self.with_error(message),
            (None, _) => self
                .with_error("Sign-in is temporarily unavailable")
                .with_status(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::CallbackError;
    use crate::error::LoginError;
    use crate::signing::SignatureError;

    fn view() -> LoginView {
        LoginView::form("Demo", "https://app.test/", "/-/indieauth")
    }

    #[test]
    fn test_blank_form() {
        let view = view();
        assert_eq!(view.status, StatusCode::OK);
        assert_eq!(view.error, None);
        assert_eq!(view.forbidden().status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_error_statuses() {
        let bad_state = view().for_error(&CallbackError::InvalidState.into());
        assert_eq!(bad_state.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad_state.error.as_deref(), Some("Invalid state"));

        let bad_cookie = view().for_error(&CallbackError::InvalidCookie.into());
        assert_eq!(bad_cookie.status, StatusCode::OK);

        let login = view().for_error(&LoginError::NoAuthorizationEndpoint.into());
        assert_eq!(login.status, StatusCode::OK);
        assert_eq!(
            login.error.as_deref(),
            Some("Invalid IndieAuth identifier - no authorization_endpoint found")
        );

        let internal = view().for_error(&SignatureError::KeyGeneration.into());
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_serializes_without_status() {
        let value = serde_json::to_value(view().with_error("oops")).unwrap();
        assert_eq!(value["error"], "oops");
        assert!(value.get("status").is_none());
    }
}
