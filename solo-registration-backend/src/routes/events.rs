//! Server-sent events: a `snapshot` first, then one `change` per patch.
//! A subscriber that falls behind gets a fresh `snapshot`.

use core::convert::Infallible;

use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderValue, Response};
use http_body::Frame;
use http_body_util::{BodyExt as _, StreamBody};
use serde::Serialize;
use solo_registration_allocation::sync::Change;
use solo_registration_database::Gateway;
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, warn};

use crate::error::AppError;
use crate::portal::Portal;
use crate::{MyState, ResponseBody};

fn encode<T: Serialize>(event: &str, data: &T) -> Result<Bytes, serde_json::Error> {
    let data = serde_json::to_string(data)?;
    Ok(Bytes::from(format!("event: {event}\ndata: {data}\n\n")))
}

struct EventStream<G> {
    portal: Portal<G>,
    receiver: broadcast::Receiver<Change>,
    closed: watch::Receiver<bool>,
    pending: Option<Bytes>,
}

impl<G: Gateway> EventStream<G> {
    async fn next_event(&mut self) -> Option<Bytes> {
        if let Some(pending) = self.pending.take() {
            return Some(pending);
        }
        if *self.closed.borrow() {
            return None;
        }
        loop {
            #[allow(clippy::redundant_pub_crate)]
            let received = select! {
                received = self.receiver.recv() => received,
                _ = self.closed.changed() => return None,
            };
            match received {
                Ok(change) => match encode("change", &change) {
                    Ok(event) => return Some(event),
                    Err(err) => warn!("failed to encode change: {err}"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("event stream missed {skipped} changes, resending the snapshot");
                    let snapshot = match self.portal.snapshot().await {
                        Ok(snapshot) => snapshot,
                        Err(err) => {
                            error!("failed to load snapshot: {err}");
                            return None;
                        }
                    };
                    match encode("snapshot", &snapshot) {
                        Ok(event) => return Some(event),
                        Err(err) => {
                            error!("failed to encode snapshot: {err}");
                            return None;
                        }
                    }
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

pub async fn events<G: Gateway>(state: &MyState<G>) -> Result<Response<ResponseBody>, AppError> {
    let changes = state.portal.changes();
    let closed = changes.closed();
    // subscribe first, a change racing the snapshot is applied twice at worst
    let receiver = changes.subscribe();
    let snapshot = state.portal.snapshot().await?;
    let stream = EventStream {
        portal: state.portal.clone(),
        receiver,
        closed,
        pending: Some(encode("snapshot", &snapshot)?),
    };
    debug!("event stream opened");
    let frames = futures_util::stream::unfold(stream, |mut stream| async move {
        let event = stream.next_event().await?;
        Some((Ok::<_, Infallible>(Frame::data(event)), stream))
    });
    let mut response = Response::new(StreamBody::new(frames).boxed_unsync());
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}
