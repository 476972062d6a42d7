//! The `user` group: registration and removal of users.
//!
//! No storage is kept; `register` validates and echoes the request it
//! receives, which makes the advice's phone-number normalization visible
//! in the response body.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::advice::{normalize_phone_number, Advised};
use crate::registry::HandlerId;

pub const REGISTER: HandlerId = HandlerId::new("user", "register");
pub const REMOVE: HandlerId = HandlerId::new("user", "remove");

pub const REGISTER_PATH: &str = "/api/user";
pub const REMOVE_PATH: &str = "/api/user/{id}";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub name: String,

    #[serde(default)]
    pub phone_number: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

impl Advised for UserRequest {
    fn advised_copy(&self) -> Self {
        Self {
            phone_number: normalize_phone_number(&self.phone_number),
            ..self.clone()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("phone number '{0}' must contain digits only")]
    InvalidPhoneNumber(String),

    #[error("user {0} not found")]
    NotFound(u64),
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::EmptyName | Self::InvalidPhoneNumber(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub async fn register(
    Json(user): Json<UserRequest>,
) -> Result<(StatusCode, Json<UserRequest>), UserError> {
    if user.name.trim().is_empty() {
        return Err(UserError::EmptyName);
    }
    if !user.phone_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(UserError::InvalidPhoneNumber(user.phone_number));
    }

    tracing::info!(name = %user.name, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn remove(Path(id): Path<u64>) -> Result<StatusCode, UserError> {
    if id == 0 {
        return Err(UserError::NotFound(id));
    }
    tracing::info!(id, "user removed");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(phone: &str) -> UserRequest {
        UserRequest {
            name: "kim".into(),
            phone_number: phone.into(),
            email: "kim@example.com".into(),
            age: Some(30),
        }
    }

    #[test]
    fn advised_copy_normalizes_phone_only() {
        let original = user("010-1234-5678");
        let copy = original.advised_copy();
        assert_eq!(copy.phone_number, "01012345678");
        assert_eq!(copy.name, original.name);
        assert_eq!(copy.email, original.email);
        assert_eq!(copy.age, original.age);
        assert_eq!(original.phone_number, "010-1234-5678");
    }

    #[test]
    fn deserializes_camel_case() {
        let parsed: UserRequest =
            serde_json::from_str(r#"{"name":"kim","phoneNumber":"010-1","age":3}"#).unwrap();
        assert_eq!(parsed.phone_number, "010-1");
        assert_eq!(parsed.age, Some(3));
        assert!(parsed.email.is_empty());
    }

    #[tokio::test]
    async fn register_rejects_separators() {
        let err = register(Json(user("010-1234-5678"))).await.unwrap_err();
        assert!(matches!(err, UserError::InvalidPhoneNumber(_)));
    }

    #[tokio::test]
    async fn register_echoes_valid_user() {
        let (status, Json(body)) = register(Json(user("01012345678"))).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, user("01012345678"));
    }

    #[tokio::test]
    async fn register_requires_name() {
        let mut blank = user("1");
        blank.name = "  ".into();
        assert!(matches!(
            register(Json(blank)).await,
            Err(UserError::EmptyName)
        ));
    }

    #[tokio::test]
    async fn remove_unknown_id() {
        assert!(matches!(
            remove(Path(0)).await,
            Err(UserError::NotFound(0))
        ));
        assert_eq!(remove(Path(5)).await.unwrap(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(
            UserError::EmptyName.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UserError::NotFound(1).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
