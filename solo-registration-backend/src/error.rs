use std::convert::Infallible;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use http_body_util::{BodyExt as _, Full};
use serde::Serialize;
use solo_registration_allocation::AllocationError;
use solo_registration_config::ConfigError;
use solo_registration_database::DatabaseError;
use tracing::{error, warn};

use crate::ResponseBody;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Allocation(#[from] AllocationError),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid query string: {0}")]
    Query(#[from] serde_urlencoded::de::Error),
    #[error("failed to read request body: {0}")]
    Body(BoxError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("password hash error: {0}")]
    PasswordHash(argon2::password_hash::Error),
    #[error("wrong csrf token")]
    WrongCsrfToken,
    #[error("please log in as an administrator")]
    Unauthorized,
    #[error("wrong email or password")]
    InvalidCredentials,
    #[error("this operation can't be undone, resend it with \"confirm\": true")]
    ConfirmationRequired,
    #[error("{0}")]
    BadRequest(String),
    #[error("expected a JSON request body")]
    UnsupportedMediaType,
    #[error("no route for {0}")]
    NotFound(String),
    #[error("this command needs a database_url, set SOLO_DATABASE_URL")]
    MissingDatabaseUrl,
    #[error("{completed} of {attempted} items succeeded, see the log for the failures")]
    PartialBatch { completed: usize, attempted: usize },
}

impl From<Infallible> for AppError {
    fn from(value: Infallible) -> Self {
        match value {}
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::PasswordHash(value)
    }
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Allocation(err) => match err {
                AllocationError::SlotOutOfRange { .. }
                | AllocationError::InvalidMaxSlots(_)
                | AllocationError::EmptyField(_)
                | AllocationError::UnknownValue { .. }
                | AllocationError::NoSongOptions
                | AllocationError::WrongRegistration { .. } => StatusCode::BAD_REQUEST,
                AllocationError::UnknownRegistration(_) | AllocationError::UnknownSubmission(_) => {
                    StatusCode::NOT_FOUND
                }
                AllocationError::SlotTaken(_)
                | AllocationError::RegistrationFull
                | AllocationError::NoAvailableSlots
                | AllocationError::Locked
                | AllocationError::InvalidTransition { .. } => StatusCode::CONFLICT,
            },
            Self::Database(err) => match err {
                DatabaseError::NotFound { .. } => StatusCode::NOT_FOUND,
                DatabaseError::UniqueViolation(_) => StatusCode::CONFLICT,
                DatabaseError::ReadOnly => StatusCode::FORBIDDEN,
                DatabaseError::PoolBuild(_)
                | DatabaseError::Pool(_)
                | DatabaseError::Database(_)
                | DatabaseError::InvalidValue { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Json(_) | Self::Query(_) | Self::Body(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::WrongCsrfToken => StatusCode::FORBIDDEN,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::ConfirmationRequired => StatusCode::PRECONDITION_REQUIRED,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PartialBatch { .. } => StatusCode::CONFLICT,
            Self::Config(_)
            | Self::Io(_)
            | Self::PasswordHash(_)
            | Self::MissingDatabaseUrl => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Logs `app_error` and renders it as `{"error": "..."}`.
#[must_use]
pub fn to_error_response(app_error: &AppError) -> Response<ResponseBody> {
    let status = app_error.status();
    if status.is_server_error() {
        error!("{app_error}");
    } else {
        warn!("{app_error}");
    }
    // internal details stay in the log
    let message = if status.is_server_error() {
        "internal server error".to_owned()
    } else {
        app_error.to_string()
    };
    let body = serde_json::to_vec(&ErrorBody { error: message }).unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from(body)).boxed_unsync());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
