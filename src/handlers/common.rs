use crate::errors::{ApiError, ServiceError};
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// A JSON request body with a fixed rejection message.
///
/// Anything wrong with the body (bad syntax, wrong content type, a missing or
/// mistyped field, a failed validation rule) is reported with `REJECTION`.
pub trait RequestBody: DeserializeOwned + Validate {
    const REJECTION: &'static str;
}

/// JSON extractor that validates the body before the handler runs
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: RequestBody,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            debug!(reason = %rejection.body_text(), "rejected request body");
            ApiError::ValidationError(T::REJECTION.to_string())
        })?;

        value.validate().map_err(|e| {
            debug!(reason = %e, "request body failed validation");
            ApiError::ValidationError(T::REJECTION.to_string())
        })?;

        Ok(Self(value))
    }
}

/// Rejects the nil UUID, which deserializes fine but names nothing
pub fn validate_not_nil(id: &Uuid) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::new("nil_uuid"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Probe {
        #[validate(custom = "validate_not_nil")]
        user_id: Uuid,
        count: i32,
    }

    impl RequestBody for Probe {
        const REJECTION: &'static str = "User ID and count are required";
    }

    async fn echo(ValidatedJson(probe): ValidatedJson<Probe>) -> String {
        format!("{}:{}", probe.user_id, probe.count)
    }

    async fn send(body: &str) -> (StatusCode, String) {
        let app = Router::new().route("/", post(echo));
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn accepts_well_formed_body() {
        let id = Uuid::new_v4();
        let (status, body) = send(&format!(r#"{{"userId":"{id}","count":3}}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("{id}:3"));
    }

    #[tokio::test]
    async fn every_body_problem_is_a_400_with_the_fixed_message() {
        let id = Uuid::new_v4();
        let cases = [
            "not json".to_string(),
            format!(r#"{{"userId":"{id}"}}"#),
            format!(r#"{{"userId":"{id}","count":"three"}}"#),
            format!(r#"{{"userId":"{id}","count":1.5}}"#),
            format!(r#"{{"userId":"{}","count":1}}"#, Uuid::nil()),
        ];

        for case in cases {
            let (status, body) = send(&case).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {case}");
            let payload: crate::errors::ErrorResponse = serde_json::from_str(&body).unwrap();
            assert_eq!(payload.message, Probe::REJECTION);
        }
    }
}
