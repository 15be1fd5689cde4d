use bytes::Bytes;
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::{HeaderValue, Response};
use http_body_util::{BodyExt as _, Full};
use solo_registration_database::Gateway;

use crate::error::AppError;
use crate::export::{registrations_csv, EXPORT_CONTENT_DISPOSITION};
use crate::{MyState, ResponseBody};

pub async fn csv<G: Gateway>(state: &MyState<G>) -> Result<Response<ResponseBody>, AppError> {
    let registrations = state.portal.grid_state().await?.registrations;
    let csv = registrations_csv(&registrations, state.export_offset);
    let mut response = Response::new(Full::new(Bytes::from(csv)).boxed_unsync());
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    response.headers_mut().insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_static(EXPORT_CONTENT_DISPOSITION),
    );
    Ok(response)
}
