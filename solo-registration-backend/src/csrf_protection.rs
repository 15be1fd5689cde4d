use bytes::Bytes;
use headers::{ContentType, HeaderMapExt as _};
use http::{Method, Request};
use mime::Mime;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::session::Session;

/// Header a client echoes the `__Host-csrf_token` cookie in.
pub const CSRF_HEADER: &str = "x-csrf-token";

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .fold(0_u8, |diff, (left, right)| diff | (left ^ right))
            == 0
}

/// Double submit check: anything but `GET` and `HEAD` has to carry the
/// csrf cookie it was sent with in [`CSRF_HEADER`].
pub fn verify_csrf_token<B>(request: &Request<B>, session: &Session) -> Result<(), AppError> {
    if request.method() == Method::GET || request.method() == Method::HEAD {
        return Ok(());
    }
    let actual = request
        .headers()
        .get(CSRF_HEADER)
        .map(http::HeaderValue::as_bytes);
    match actual {
        Some(actual)
            if session.has_client_csrf_token()
                && constant_time_eq(actual, session.csrf_token().as_bytes()) =>
        {
            Ok(())
        }
        _ => Err(AppError::WrongCsrfToken),
    }
}

/// JSON body of a request that passed [`verify_csrf_token`].
#[derive(Debug)]
pub struct CsrfSafeJson<T>(pub T);

impl<T: DeserializeOwned> CsrfSafeJson<T> {
    pub fn from_request(request: &Request<Bytes>, session: &Session) -> Result<Self, AppError> {
        verify_csrf_token(request, session)?;
        let is_json = request
            .headers()
            .typed_get::<ContentType>()
            .map(Mime::from)
            .is_some_and(|mime| mime.essence_str() == mime::APPLICATION_JSON.essence_str());
        if !is_json {
            return Err(AppError::UnsupportedMediaType);
        }
        Ok(Self(serde_json::from_slice(request.body())?))
    }
}
