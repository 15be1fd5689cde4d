use bytes::Bytes;
use http::{Request, Response};
use serde::{Deserialize, Serialize};
use solo_registration_allocation::models::{SlotNumber, VoicePart};
use solo_registration_allocation::slots::{Intake, Occupancy};
use solo_registration_allocation::stage::RosterOccupant;
use solo_registration_database::Gateway;

use super::{created_json, ok_json};
use crate::csrf_protection::CsrfSafeJson;
use crate::error::AppError;
use crate::session::Session;
use crate::{MyState, ResponseBody};

#[derive(Serialize)]
pub struct PublicSlot<'a> {
    pub slot: SlotNumber,
    pub available: bool,
    pub occupant: Option<RosterOccupant<'a>>,
}

#[derive(Serialize)]
pub struct SlotBoard<'a> {
    pub max_slots: SlotNumber,
    pub occupancy: Occupancy,
    pub intake: Intake,
    pub slots: Vec<PublicSlot<'a>>,
}

pub async fn slots<G: Gateway>(state: &MyState<G>) -> Result<Response<ResponseBody>, AppError> {
    let grid_state = state.portal.grid_state().await?;
    let grid = grid_state.grid();
    ok_json(&SlotBoard {
        max_slots: grid_state.max_slots,
        occupancy: grid.occupancy(),
        intake: grid.intake(),
        slots: grid
            .cells()
            .map(|cell| PublicSlot {
                slot: cell.slot,
                available: cell.occupant.is_none(),
                occupant: cell.occupant.map(|registration| RosterOccupant {
                    full_name: &registration.full_name,
                    voice_part: registration.voice_part,
                }),
            })
            .collect(),
    })
}

#[derive(Deserialize)]
pub struct ReservePayload {
    pub full_name: String,
    pub voice_part: VoicePart,
    pub slot_id: SlotNumber,
}

pub async fn reserve<G: Gateway>(
    state: &MyState<G>,
    session: &Session,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let CsrfSafeJson(payload) = CsrfSafeJson::<ReservePayload>::from_request(request, session)?;
    let registration = state
        .portal
        .reserve(&payload.full_name, payload.voice_part, payload.slot_id)
        .await?;
    created_json(&registration)
}
