//! A stand-in front-end that answers with canned responses.

use crate::{
    data::{RecordedRequest, ResponseData},
    error::Error,
    util,
};
use futures::channel::oneshot;
use hyper::{
    body,
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use std::{
    collections::{HashMap, VecDeque},
    convert::Infallible,
    net::{SocketAddr, TcpListener},
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
};
use tokio::runtime::Runtime;
use tracing::{debug, error};

#[derive(Debug, Default)]
struct StubState {
    routes: HashMap<(String, String), VecDeque<ResponseData>>,
    received: Vec<RecordedRequest>,
}

impl StubState {
    /// Pops the next canned response of a route; the last one repeats.
    fn respond(&mut self, method: &str, path: &str) -> ResponseData {
        match self.routes.get_mut(&(method.to_owned(), path.to_owned())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_found),
            Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

fn not_found() -> ResponseData {
    ResponseData::new(404, "")
}

/// HTTP server on `127.0.0.1` with an ephemeral port, running on its own
/// thread until dropped.
#[derive(Debug)]
pub struct StubFrontend {
    address: SocketAddr,
    state: Arc<Mutex<StubState>>,
    shutdown: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl StubFrontend {
    pub fn start() -> Result<Self, Error> {
        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        listener.set_nonblocking(true)?;
        let address = listener.local_addr()?;

        let state = Arc::new(Mutex::new(StubState::default()));
        let (shutdown, shutdown_signal) = oneshot::channel::<()>();
        let runtime = Runtime::new()?;
        let server_state = state.clone();

        let join_handle = thread::spawn(move || {
            runtime.block_on(async move {
                let server = match Server::from_tcp(listener) {
                    Ok(builder) => builder,
                    Err(e) => {
                        error!("Stub front-end error: {}", e);
                        return;
                    }
                };

                let make_service = make_service_fn(move |_| {
                    let state = server_state.clone();
                    async move {
                        Ok::<_, Infallible>(service_fn(move |request| {
                            handle_request(state.clone(), request)
                        }))
                    }
                });

                let graceful = server.serve(make_service).with_graceful_shutdown(async {
                    shutdown_signal.await.ok();
                });

                if let Err(e) = graceful.await {
                    error!("Stub front-end error: {}", e);
                }
            });
        });

        debug!(%address, "stub front-end listening");
        Ok(Self {
            address,
            state,
            shutdown: Some(shutdown),
            join_handle: Some(join_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.address.port()
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Queues `response` for `method` requests to `path` (without query).
    pub fn respond<S1: Into<String>, S2: Into<String>>(
        &self,
        method: S1,
        path: S2,
        response: ResponseData,
    ) -> &Self {
        if let Ok(mut state) = self.state.lock() {
            state
                .routes
                .entry((method.into(), path.into()))
                .or_default()
                .push_back(response);
        }
        self
    }

    pub fn received(&self) -> Vec<RecordedRequest> {
        self.state
            .lock()
            .map(|state| state.received.clone())
            .unwrap_or_default()
    }
}

impl Drop for StubFrontend {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            if join_handle.join().is_err() {
                error!("Couldn't gracefully shut down the stub front-end thread");
            }
        }
    }
}

async fn handle_request(
    state: Arc<Mutex<StubState>>,
    request: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let (parts, request_body) = request.into_parts();
    let body = body::to_bytes(request_body).await.unwrap_or_default();

    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        uri: parts.uri.to_string(),
        headers: util::extract_headers(&parts.headers),
        body: String::from_utf8_lossy(&body).into(),
    };

    let response = match state.lock() {
        Ok(mut state) => {
            let response = state.respond(&recorded.method, parts.uri.path());
            state.received.push(recorded);
            response
        }
        Err(_) => ResponseData::new(500, "The lock was poisoned"),
    };

    Ok(Response::builder()
        .status(response.status_code)
        .body(Body::from(response.body))
        .unwrap_or_else(|_| Response::new(Body::empty())))
}
