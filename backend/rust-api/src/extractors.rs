use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use validator::Validate;

/// JSON body extractor that also runs `validator` rules, answering with a
/// JSON 400 body instead of axum's plain-text rejection.
pub struct ValidatedJson<T>(pub T);

fn bad_request(message: String) -> Response {
    tracing::warn!("{}", message);
    let error_response = json!({
        "message": message,
        "status": 400
    });
    (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
}

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                bad_request(format!("Failed to parse JSON request body: {}", rejection))
            })?;

        value
            .validate()
            .map_err(|e| bad_request(format!("Invalid request: {}", e)))?;

        Ok(ValidatedJson(value))
    }
}
