use bytes::Bytes;
use http::{Request, Response};
use serde::Deserialize;
use solo_registration_database::Gateway;

use super::{ok_json, query};
use crate::error::AppError;
use crate::{MyState, ResponseBody};

#[derive(Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub name: String,
}

/// Everything a soloist sees after looking themselves up by name.
pub async fn lookup<G: Gateway>(
    state: &MyState<G>,
    request: &Request<Bytes>,
) -> Result<Response<ResponseBody>, AppError> {
    let StatusQuery { name } = query(request)?;
    ok_json(&state.portal.status_lookup(&name).await?)
}
