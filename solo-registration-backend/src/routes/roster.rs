use bytes::Bytes;
use http::{Request, Response};
use serde::{Deserialize, Serialize};
use solo_registration_allocation::models::{PerformanceWeek, WeekId};
use solo_registration_allocation::stage::{roster as build_roster, StageQueue};
use solo_registration_database::Gateway;

use super::{ok_json, query};
use crate::error::AppError;
use crate::{MyState, ResponseBody};

pub async fn roster<G: Gateway>(state: &MyState<G>) -> Result<Response<ResponseBody>, AppError> {
    let weeks = state.portal.weeks().await?;
    let registrations = state.portal.grid_state().await?.registrations;
    ok_json(&build_roster(&weeks, &registrations))
}

pub async fn weeks<G: Gateway>(state: &MyState<G>) -> Result<Response<ResponseBody>, AppError> {
    ok_json(&state.portal.weeks().await?)
}

#[derive(Deserialize)]
pub struct StageQuery {
    #[serde(default)]
    pub week: Option<WeekId>,
}

#[derive(Serialize)]
pub struct StageView<'a> {
    pub week: Option<&'a PerformanceWeek>,
    pub queue: Option<StageQueue<'a>>,
}

/// Current performer and the ones up next. Without `week` the first week
/// is shown.
pub async fn stage<G: Gateway>(
    state: &MyState<G>,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let StageQuery { week } = query(request)?;
    let week = state.portal.stage_week(week).await?;
    let registrations = state.portal.grid_state().await?.registrations;
    ok_json(&StageView {
        week: week.as_ref(),
        queue: week
            .as_ref()
            .map(|week| StageQueue::for_week(week, &registrations)),
    })
}
