use bytes::Bytes;
use http::{Request, Response};
use serde::{Deserialize, Serialize};
use solo_registration_database::Gateway;

use super::{no_content, ok_json};
use crate::csrf_protection::{verify_csrf_token, CsrfSafeJson};
use crate::error::AppError;
use crate::session::Session;
use crate::{MyState, ResponseBody};

#[derive(Serialize)]
pub struct SessionInfo<'a> {
    pub csrf_token: &'a str,
    pub admin: Option<String>,
    pub demo: bool,
}

pub async fn show<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
) -> Result<Response<ResponseBody>, AppError> {
    let admin = match session.admin_session() {
        Some(token) => state.sessions.lookup(token).await.map(|admin| admin.email),
        None => None,
    };
    ok_json(&SessionInfo {
        csrf_token: session.csrf_token(),
        admin,
        demo: state.portal.is_demo(),
    })
}

#[derive(Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

pub async fn login<G: Gateway>(
    state: &MyState<G>,
    session: &mut Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<LoginPayload>::from_request(request, session)?;
    let admin = state.portal.login(&payload.email, &payload.password).await?;
    if let Some(previous) = session.admin_session() {
        state.sessions.revoke(previous).await;
    }
    let token = state.sessions.create(admin.id, admin.email.clone()).await;
    session.set_admin_session(token);
    ok_json(&SessionInfo {
        csrf_token: session.csrf_token(),
        admin: Some(admin.email),
        demo: state.portal.is_demo(),
    })
}

pub async fn logout<G: Gateway>(
    state: &MyState<G>,
    session: &mut Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    verify_csrf_token(request, session)?;
    if let Some(token) = session.admin_session() {
        state.sessions.revoke(token).await;
    }
    session.clear_admin_session();
    Ok(no_content())
}
