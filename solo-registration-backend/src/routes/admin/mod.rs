//! Routes below `/api/admin/`. Every one of them needs a live admin
//! session, writes additionally need the csrf token.

pub mod export;
pub mod registrations;
pub mod repertoire;
pub mod schedule;
pub mod waitlist;

use bytes::Bytes;
use http::{Method, Request, Response};
use serde::Deserialize;
use solo_registration_database::Gateway;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::error::AppError;
use crate::session::Session;
use crate::{MyState, ResponseBody};

/// Body of the operations that only name a record.
#[derive(Deserialize)]
pub struct IdPayload {
    pub id: Uuid,
}

/// Body of the destructive operations, `confirm` has to be `true`.
#[derive(Deserialize)]
pub struct ConfirmPayload {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Deserialize)]
pub struct ConfirmIdPayload {
    pub id: Uuid,
    #[serde(default)]
    pub confirm: bool,
}

pub async fn require_admin<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
) -> Result<AdminSession, AppError> {
    let Some(token) = session.admin_session() else {
        return Err(AppError::Unauthorized);
    };
    state
        .sessions
        .lookup(token)
        .await
        .ok_or(AppError::Unauthorized)
}

pub async fn dispatch<G: Gateway>(
    state: &MyState<G>,
    admin: &AdminSession,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let method = request.method();
    let path = request.uri().path();
    if method != Method::GET {
        info!("{} {method} {path}", admin.email);
    }
    let route = path.trim_start_matches("/api/admin/");
    match (method, route) {
        (&Method::GET, "registrations") => registrations::list(state, request).await,
        (&Method::POST, "registrations/edit") => registrations::edit(state, session, request).await,
        (&Method::POST, "registrations/delete") => {
            registrations::delete(state, session, request).await
        }
        (&Method::POST, "config/max-slots") => {
            registrations::max_slots(state, session, request).await
        }
        (&Method::GET, "repertoire") => repertoire::list(state).await,
        (&Method::POST, "repertoire/approve") => repertoire::approve(state, session, request).await,
        (&Method::POST, "repertoire/reject") => repertoire::reject(state, session, request).await,
        (&Method::POST, "repertoire/comment") => repertoire::comment(state, session, request).await,
        (&Method::POST, "repertoire/delete") => repertoire::delete(state, session, request).await,
        (&Method::POST, "repertoire/bulk-approve") => {
            repertoire::bulk_approve(state, session, request).await
        }
        (&Method::POST, "repertoire/bulk-delete") => {
            repertoire::bulk_delete(state, session, request).await
        }
        (&Method::POST, "repertoire/factory-reset") => {
            repertoire::factory_reset(state, session, request).await
        }
        (&Method::GET, "waitlist") => waitlist::list(state).await,
        (&Method::POST, "waitlist/promote") => waitlist::promote(state, session, request).await,
        (&Method::POST, "waitlist/remove") => waitlist::remove(state, session, request).await,
        (&Method::POST, "weeks/add") => schedule::add_week(state, session, request).await,
        (&Method::POST, "weeks/delete") => schedule::delete_week(state, session, request).await,
        (&Method::POST, "stage/status") => schedule::set_status(state, session, request).await,
        (&Method::POST, "stage/reset") => schedule::reset(state, session, request).await,
        (&Method::GET, "export.csv") => export::csv(state).await,
        (method, _) => {
            debug!("unknown admin route {method} {path}");
            Err(AppError::NotFound(format!("{method} {path}")))
        }
    }
}
