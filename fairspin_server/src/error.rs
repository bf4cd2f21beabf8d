use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use fairspin_core::SpinError;
use fairspin_shared::ApiError;

/// Carries an [`ApiError`] out of a handler.
#[derive(Debug)]
pub struct ApiFailure(pub ApiError);

impl From<ApiError> for ApiFailure {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<SpinError> for ApiFailure {
    fn from(e: SpinError) -> Self {
        if let SpinError::Persistence(inner) = &e {
            tracing::error!(error = %inner, "store failure");
        }
        Self(e.into())
    }
}

impl From<JsonRejection> for ApiFailure {
    fn from(e: JsonRejection) -> Self {
        Self(ApiError::Invalid(format!("invalid request body: {}", e.body_text())))
    }
}

impl From<QueryRejection> for ApiFailure {
    fn from(e: QueryRejection) -> Self {
        Self(ApiError::Invalid(format!("invalid query: {}", e.body_text())))
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut resp = (status, Json(self.0.body())).into_response();
        if let ApiError::RateLimited { retry_after_ms } = self.0 {
            let secs = retry_after_ms.div_ceil(1000).max(1);
            resp.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        resp
    }
}
