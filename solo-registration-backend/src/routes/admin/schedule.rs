//! Performance weeks and the live stage controls.

use bytes::Bytes;
use http::{Request, Response};
use serde::{Deserialize, Serialize};
use solo_registration_allocation::models::{PerformanceStatus, RegistrationId, SlotNumber};
use solo_registration_database::Gateway;

use super::{ConfirmPayload, IdPayload};
use crate::csrf_protection::CsrfSafeJson;
use crate::error::AppError;
use crate::routes::{created_json, ok_json};
use crate::session::Session;
use crate::{MyState, ResponseBody};

#[derive(Deserialize)]
pub struct WeekPayload {
    pub date: String,
    pub slot_ids: Vec<SlotNumber>,
}

pub async fn add_week<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<WeekPayload>::from_request(request, session)?;
    created_json(&state.portal.add_week(&payload.date, payload.slot_ids).await?)
}

pub async fn delete_week<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<IdPayload>::from_request(request, session)?;
    ok_json(&state.portal.delete_week(payload.id).await?)
}

#[derive(Deserialize)]
pub struct StatusPayload {
    pub id: RegistrationId,
    pub status: PerformanceStatus,
}

pub async fn set_status<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<StatusPayload>::from_request(request, session)?;
    ok_json(
        &state
            .portal
            .set_performance_status(payload.id, payload.status)
            .await?,
    )
}

#[derive(Serialize)]
pub struct ResetOutcome {
    pub reset: usize,
}

/// Puts every performer back to pending.
pub async fn reset<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<ConfirmPayload>::from_request(request, session)?;
    let reset = state.portal.reset_performance(payload.confirm).await?;
    ok_json(&ResetOutcome { reset })
}
