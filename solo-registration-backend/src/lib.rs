pub mod auth;
pub mod changes;
pub mod csrf_protection;
pub mod error;
pub mod export;
pub mod portal;
pub mod routes;
pub mod session;

use core::convert::Infallible;
use core::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use chrono::FixedOffset;
use error::{to_error_response, AppError, BoxError};
use futures_util::pin_mut;
use http::{Request, Response};
use http_body::Body;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt as _, Limited};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use session::{ResponseSessionExt as _, Session};
use solo_registration_config::Config;
use solo_registration_database::Gateway;
use tokio::net::TcpListener;
use tokio::select;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::auth::SessionStore;
use crate::changes::ChangeFeed;
use crate::export::export_offset;
use crate::portal::Portal;

pub type ResponseBody = UnsyncBoxBody<Bytes, Infallible>;

/// Request bodies are small JSON documents.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

#[derive(Clone)]
pub struct MyState<G> {
    pub portal: Portal<G>,
    pub sessions: SessionStore,
    pub export_offset: FixedOffset,
}

impl<G: Gateway> MyState<G> {
    #[must_use]
    pub fn new(gateway: G, config: &Config) -> Self {
        Self {
            portal: Portal::new(
                gateway,
                ChangeFeed::new(config.event_buffer()),
                config.default_max_slots,
            ),
            sessions: SessionStore::new(config.session_ttl_minutes),
            export_offset: export_offset(config.export_utc_offset_minutes),
        }
    }
}

/// Serves one request. Errors are rendered here so the connection never
/// sees them.
pub async fn handle<G, B>(state: MyState<G>, request: Request<B>) -> Response<ResponseBody>
where
    G: Gateway,
    B: Body<Data = Bytes> + Send,
    B::Error: Into<BoxError>,
{
    let mut session = Session::new(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let result = async {
        let (parts, body) = request.into_parts();
        let body = Limited::new(body, MAX_BODY_SIZE)
            .collect()
            .await
            .map_err(AppError::Body)?
            .to_bytes();
        routes::dispatch(&state, &mut session, Request::from_parts(parts, body)).await
    }
    .await;
    let response = result.unwrap_or_else(|app_error| to_error_response(&app_error));
    debug!("{method} {path} {}", response.status());
    response.with_session(&session)
}

/// Binds the listener and returns the accept loop. The loop ends after
/// Ctrl+C or SIGTERM once every connection has finished.
#[allow(clippy::cognitive_complexity)]
pub async fn run_server<G: Gateway>(
    state: MyState<G>,
    listen: SocketAddr,
) -> Result<impl Future<Output = Result<(), AppError>>, AppError> {
    let listener = TcpListener::bind(listen).await?;

    // tell the connections to shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let shutdown_tx = Arc::new(shutdown_tx);

    // wait for the connections to finish shutdown
    let (closed_tx, closed_rx) = watch::channel(());

    info!(
        "listening on {listen}{}",
        if state.portal.is_demo() {
            " in demo mode"
        } else {
            ""
        }
    );

    Ok(async move {
        let shutdown = shutdown_signal();
        pin_mut!(shutdown);
        #[allow(clippy::redundant_pub_crate)]
        loop {
            select! {
                accept = listener.accept() => {
                    let (socket, remote_addr) = match accept {
                        Ok(accepted) => accepted,
                        Err(err) => {
                            warn!("failed to accept connection: {err}");
                            continue;
                        }
                    };

                    let state = state.clone();
                    let shutdown_tx = Arc::clone(&shutdown_tx);
                    let closed_rx = closed_rx.clone();

                    let fut = async move {
                        let socket = TokioIo::new(socket);

                        let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
                            let state = state.clone();
                            async move { Ok::<_, Infallible>(handle(state, request).await) }
                        });

                        let builder = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new());
                        let connection = builder.serve_connection_with_upgrades(socket, hyper_service);
                        pin_mut!(connection);

                        let mut shutting_down = false;
                        loop {
                            select! {
                                connection_result = connection.as_mut() => {
                                    if let Err(err) = connection_result {
                                        debug!("failed to serve connection {remote_addr}: {err:#}");
                                    }
                                    break;
                                }
                                () = shutdown_tx.closed(), if !shutting_down => {
                                    shutting_down = true;
                                    connection.as_mut().graceful_shutdown();
                                }
                            }
                        }

                        drop(closed_rx);
                    };
                    tokio::spawn(fut);
                }
                () = &mut shutdown => {
                    warn!("shutting down");
                    // event streams would otherwise keep their connections open
                    state.portal.changes().close();
                    drop(shutdown_rx);
                    drop(closed_rx);
                    closed_tx.closed().await;
                    break;
                }
            }
        }

        info!("all connections closed");
        Ok(())
    })
}

#[allow(clippy::redundant_pub_crate)]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {err}");
            core::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                error!("failed to install signal handler: {err}");
                core::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<()>();

    select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
