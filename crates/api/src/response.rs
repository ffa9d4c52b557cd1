//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use myvote_core::Page;
use serde::Serialize;

/// Standard API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = if self.error.is_some() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        };
        (status, Json(self)).into_response()
    }
}

/// Severity of a message attached to an action result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A user-visible message attached to an action result.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

/// Result of a state-changing action: where the client should go next and
/// what to tell the user when it gets there.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse<T: Serialize = ()> {
    pub redirect_to: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ActionResponse {
    /// Redirect with no messages.
    pub fn redirect(to: impl Into<String>) -> Self {
        Self {
            redirect_to: to.into(),
            messages: Vec::new(),
            data: None,
        }
    }
}

impl<T: Serialize> ActionResponse<T> {
    /// Attach a message.
    #[must_use]
    pub fn message(mut self, level: MessageLevel, text: impl Into<String>) -> Self {
        self.messages.push(Message {
            level,
            text: text.into(),
        });
        self
    }

    #[must_use]
    pub fn success(self, text: impl Into<String>) -> Self {
        self.message(MessageLevel::Success, text)
    }

    #[must_use]
    pub fn warning(self, text: impl Into<String>) -> Self {
        self.message(MessageLevel::Warning, text)
    }

    #[must_use]
    pub fn error(self, text: impl Into<String>) -> Self {
        self.message(MessageLevel::Error, text)
    }

    /// Attach a payload.
    pub fn with_data<U: Serialize>(self, data: U) -> ActionResponse<U> {
        ActionResponse {
            redirect_to: self.redirect_to,
            messages: self.messages,
            data: Some(data),
        }
    }
}

impl<T: Serialize> IntoResponse for ActionResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// A page of results with navigation metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T: Serialize> {
    pub items: Vec<T>,
    pub page: u64,
    pub num_pages: u64,
    pub per_page: u64,
    pub total: u64,
    pub previous_page: Option<u64>,
    pub next_page: Option<u64>,
    pub links: Vec<u64>,
}

impl<T: Serialize> PageResponse<T> {
    /// Convert a service page, mapping each item into its response type.
    pub fn from_page<U, F: FnMut(U) -> T>(page: Page<U>, f: F) -> Self {
        let previous_page = page.previous_page();
        let next_page = page.next_page();
        let links = page.links();
        let page = page.map(f);

        Self {
            items: page.items,
            page: page.number,
            num_pages: page.num_pages,
            per_page: page.per_page,
            total: page.total,
            previous_page,
            next_page,
            links,
        }
    }
}

/// Only same-site paths are followed after an action.
#[must_use]
pub fn local_redirect(next_url: Option<&str>) -> String {
    match next_url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.contains('\\') => {
            url.to_string()
        }
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_redirect() {
        assert_eq!(local_redirect(Some("/users/alice")), "/users/alice");
        assert_eq!(local_redirect(Some("//evil.example")), "/");
        assert_eq!(local_redirect(Some("https://evil.example/")), "/");
        assert_eq!(local_redirect(Some("/\\evil.example")), "/");
        assert_eq!(local_redirect(None), "/");
    }

    #[test]
    fn test_action_response_serializes_camel_case() {
        let action = ActionResponse::redirect("/polls/p1").success("Vote recorded successfully!");
        let json = serde_json::to_value(&action).unwrap_or_default();

        assert_eq!(json["redirectTo"], "/polls/p1");
        assert_eq!(json["messages"][0]["level"], "success");
        assert_eq!(json["messages"][0]["text"], "Vote recorded successfully!");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_page_response_navigation() {
        let page = myvote_core::Paginator::new(10).paginate_vec((0..25).collect::<Vec<u32>>(), 2);
        let response = PageResponse::from_page(page, |n| n * 2);

        assert_eq!(response.page, 2);
        assert_eq!(response.num_pages, 3);
        assert_eq!(response.previous_page, Some(1));
        assert_eq!(response.next_page, Some(3));
        assert_eq!(response.links, vec![1, 3]);
        assert_eq!(response.items[0], 20);
    }
}
