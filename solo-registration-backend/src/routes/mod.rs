pub mod admin;
pub mod events;
pub mod registrations;
pub mod repertoire;
pub mod roster;
pub mod session;
pub mod status;
pub mod waitlist;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt as _, Empty, Full};
use serde::de::DeserializeOwned;
use serde::Serialize;
use solo_registration_database::Gateway;

use crate::error::AppError;
use crate::session::Session;
use crate::{MyState, ResponseBody};

pub fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
) -> Result<Response<ResponseBody>, AppError> {
    let body = serde_json::to_vec(value)?;
    let mut response = Response::new(Full::new(Bytes::from(body)).boxed_unsync());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

pub fn ok_json<T: Serialize + ?Sized>(value: &T) -> Result<Response<ResponseBody>, AppError> {
    json_response(StatusCode::OK, value)
}

pub fn created_json<T: Serialize + ?Sized>(value: &T) -> Result<Response<ResponseBody>, AppError> {
    json_response(StatusCode::CREATED, value)
}

#[must_use]
pub fn no_content() -> Response<ResponseBody> {
    let mut response = Response::new(Empty::new().boxed_unsync());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

/// Parses the query string, a missing one counts as empty.
pub fn query<T: DeserializeOwned>(request: &Request<Bytes>) -> Result<T, AppError> {
    Ok(serde_urlencoded::from_str(
        request.uri().query().unwrap_or_default(),
    )?)
}

pub async fn dispatch<G: Gateway>(
    state: &MyState<G>,
    session: &mut Session,
    request: Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let path = request.uri().path().to_owned();
    match (request.method(), path.as_str()) {
        (&Method::GET, "/api/session") => session::show(state, session).await,
        (&Method::GET, "/api/slots") => registrations::slots(state).await,
        (&Method::POST, "/api/registrations") => {
            registrations::reserve(state, session, &request).await
        }
        (&Method::POST, "/api/waitlist") => waitlist::join(state, session, &request).await,
        (&Method::POST, "/api/repertoire") => repertoire::submit(state, session, &request).await,
        (&Method::GET, "/api/status") => status::lookup(state, &request).await,
        (&Method::GET, "/api/roster") => roster::roster(state).await,
        (&Method::GET, "/api/weeks") => roster::weeks(state).await,
        (&Method::GET, "/api/stage") => roster::stage(state, &request).await,
        (&Method::GET, "/api/events") => events::events(state).await,
        (&Method::POST, "/api/admin/login") => session::login(state, session, &request).await,
        (&Method::POST, "/api/admin/logout") => session::logout(state, session, &request).await,
        (_, path) if path.starts_with("/api/admin/") => {
            let admin = admin::require_admin(state, session).await?;
            admin::dispatch(state, &admin, session, &request).await
        }
        (method, path) => Err(AppError::NotFound(format!("{method} {path}"))),
    }
}
