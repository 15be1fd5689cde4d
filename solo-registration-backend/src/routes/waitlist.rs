use bytes::Bytes;
use http::{Request, Response};
use serde::Deserialize;
use solo_registration_allocation::models::VoicePart;
use solo_registration_database::Gateway;

use super::created_json;
use crate::csrf_protection::CsrfSafeJson;
use crate::error::AppError;
use crate::session::Session;
use crate::{MyState, ResponseBody};

#[derive(Deserialize)]
pub struct JoinPayload {
    pub full_name: String,
    pub voice_part: VoicePart,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

pub async fn join<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<JoinPayload>::from_request(request, session)?;
    let entry = state
        .portal
        .join_waitlist(
            &payload.full_name,
            payload.voice_part,
            payload.email,
            payload.phone,
        )
        .await?;
    created_json(&entry)
}
