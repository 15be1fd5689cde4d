use bytes::Bytes;
use http::{Request, Response};
use serde::{Deserialize, Serialize};
use solo_registration_allocation::dashboard::RegistrationQuery;
use solo_registration_allocation::models::{RegistrationId, SlotNumber, VoicePart};
use solo_registration_database::Gateway;

use super::ConfirmIdPayload;
use crate::csrf_protection::CsrfSafeJson;
use crate::error::AppError;
use crate::routes::{ok_json, query};
use crate::session::Session;
use crate::{MyState, ResponseBody};

/// Filtered and paginated registrations with the voice part counts.
pub async fn list<G: Gateway>(
    state: &MyState<G>,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let registration_query: RegistrationQuery = query(request)?;
    ok_json(&state.portal.dashboard(&registration_query).await?)
}

#[derive(Deserialize)]
pub struct EditPayload {
    pub id: RegistrationId,
    pub full_name: String,
    pub voice_part: VoicePart,
}

pub async fn edit<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<EditPayload>::from_request(request, session)?;
    ok_json(
        &state
            .portal
            .edit_registration(payload.id, &payload.full_name, payload.voice_part)
            .await?,
    )
}

pub async fn delete<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<ConfirmIdPayload>::from_request(request, session)?;
    ok_json(
        &state
            .portal
            .delete_registration(payload.id, payload.confirm)
            .await?,
    )
}

#[derive(Deserialize, Serialize)]
pub struct MaxSlotsPayload {
    pub max_slots: SlotNumber,
}

pub async fn max_slots<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<MaxSlotsPayload>::from_request(request, session)?;
    let max_slots = state.portal.update_max_slots(payload.max_slots).await?;
    ok_json(&MaxSlotsPayload { max_slots })
}
