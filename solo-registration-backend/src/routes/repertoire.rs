use bytes::Bytes;
use http::{Request, Response};
use serde::Deserialize;
use solo_registration_allocation::models::{RegistrationId, SongOption};
use solo_registration_database::Gateway;

use super::created_json;
use crate::csrf_protection::CsrfSafeJson;
use crate::error::AppError;
use crate::session::Session;
use crate::{MyState, ResponseBody};

#[derive(Deserialize)]
pub struct SubmitPayload {
    pub registration_id: RegistrationId,
    pub options: Vec<SongOption>,
}

pub async fn submit<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<SubmitPayload>::from_request(request, session)?;
    let submissions = state
        .portal
        .submit_repertoire(payload.registration_id, payload.options)
        .await?;
    created_json(&submissions)
}
