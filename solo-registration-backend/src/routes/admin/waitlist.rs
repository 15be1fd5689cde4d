use bytes::Bytes;
use http::{Request, Response};
use solo_registration_database::Gateway;

use super::IdPayload;
use crate::csrf_protection::CsrfSafeJson;
use crate::error::AppError;
use crate::routes::ok_json;
use crate::session::Session;
use crate::{MyState, ResponseBody};

pub async fn list<G: Gateway>(state: &MyState<G>) -> Result<Response<ResponseBody>, AppError> {
    ok_json(&state.portal.waitlist().await?)
}

/// Responds with the registration the entry turned into.
pub async fn promote<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<IdPayload>::from_request(request, session)?;
    ok_json(&state.portal.promote(payload.id).await?)
}

pub async fn remove<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<IdPayload>::from_request(request, session)?;
    ok_json(&state.portal.remove_waitlist_entry(payload.id).await?)
}
