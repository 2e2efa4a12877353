use poem_openapi::payload::Json;
use poem_openapi::{ApiResponse, Object};

#[derive(Debug, Clone, Object, serde::Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(ApiResponse, Debug)]
pub enum QueryError {
    #[oai(status = 400)]
    BadRequest(Json<ErrorBody>),
    #[oai(status = 404)]
    NotFound(Json<ErrorBody>),
    #[oai(status = 429)]
    RateLimited(Json<ErrorBody>),
    #[oai(status = 500)]
    InternalError(Json<ErrorBody>),
}

impl QueryError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        QueryError::BadRequest(Json(ErrorBody { error: msg.into() }))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        QueryError::NotFound(Json(ErrorBody { error: msg.into() }))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        QueryError::InternalError(Json(ErrorBody { error: msg.into() }))
    }
}

impl From<chomp_storage::StorageError> for QueryError {
    fn from(value: chomp_storage::StorageError) -> Self {
        QueryError::internal(value.to_string())
    }
}

impl From<chomp_cache::CacheError> for QueryError {
    fn from(value: chomp_cache::CacheError) -> Self {
        QueryError::internal(value.to_string())
    }
}
