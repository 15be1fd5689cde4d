use std::collections::HashMap;

use bytes::Bytes;
use http::{Request, Response};
use serde::{Deserialize, Serialize};
use solo_registration_allocation::models::{
    Registration, RegistrationId, RepertoireSubmission, SlotNumber, SubmissionId,
};
use solo_registration_database::Gateway;

use super::{ConfirmIdPayload, ConfirmPayload};
use crate::csrf_protection::CsrfSafeJson;
use crate::error::AppError;
use crate::routes::ok_json;
use crate::session::Session;
use crate::{MyState, ResponseBody};

/// A submission together with the soloist it belongs to.
#[derive(Serialize)]
pub struct SubmissionRow<'a> {
    #[serde(flatten)]
    pub submission: &'a RepertoireSubmission,
    pub full_name: Option<&'a str>,
    pub slot_id: Option<SlotNumber>,
}

#[derive(Serialize)]
pub struct BatchOutcome {
    pub completed: usize,
}

pub async fn list<G: Gateway>(state: &MyState<G>) -> Result<Response<ResponseBody>, AppError> {
    let submissions = state.portal.list_submissions().await?;
    let registrations = state.portal.grid_state().await?.registrations;
    let by_id: HashMap<RegistrationId, &Registration> = registrations
        .iter()
        .map(|registration| (registration.id, registration))
        .collect();
    let rows: Vec<SubmissionRow<'_>> = submissions
        .iter()
        .map(|submission| {
            let registration = by_id.get(&submission.registration_id);
            SubmissionRow {
                submission,
                full_name: registration.map(|registration| registration.full_name.as_str()),
                slot_id: registration.map(|registration| registration.slot_id),
            }
        })
        .collect();
    ok_json(&rows)
}

#[derive(Deserialize)]
pub struct ApprovePayload {
    pub id: SubmissionId,
    pub registration_id: RegistrationId,
}

pub async fn approve<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<ApprovePayload>::from_request(request, session)?;
    ok_json(
        &state
            .portal
            .approve(payload.id, payload.registration_id)
            .await?,
    )
}

#[derive(Deserialize)]
pub struct CommentPayload {
    pub id: SubmissionId,
    #[serde(default)]
    pub comments: Option<String>,
}

pub async fn reject<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<CommentPayload>::from_request(request, session)?;
    ok_json(&state.portal.reject(payload.id, payload.comments).await?)
}

pub async fn comment<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<CommentPayload>::from_request(request, session)?;
    ok_json(&state.portal.comment(payload.id, payload.comments).await?)
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
            .delete_submission(payload.id, payload.confirm)
            .await?,
    )
}

#[derive(Deserialize)]
pub struct BulkPayload {
    pub ids: Vec<SubmissionId>,
    #[serde(default)]
    pub confirm: bool,
}

pub async fn bulk_approve<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<BulkPayload>::from_request(request, session)?;
    let completed = state.portal.bulk_approve(&payload.ids).await?;
    ok_json(&BatchOutcome { completed })
}

pub async fn bulk_delete<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<BulkPayload>::from_request(request, session)?;
    let completed = state
        .portal
        .bulk_delete(&payload.ids, payload.confirm)
        .await?;
    ok_json(&BatchOutcome { completed })
}

/// Deletes every submission of every soloist.
pub async fn factory_reset<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<ConfirmPayload>::from_request(request, session)?;
    let completed = state.portal.factory_reset(payload.confirm).await?;
    ok_json(&BatchOutcome { completed })
}
