//! Scripted transport and client builders shared by unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::{ApiClient, HttpRequest, HttpResponse, Transport, TransportError};
use crate::auth::MemorySessionStore;
use crate::config::{ClientConfig, LOCAL_API_BASE_URL};
use crate::offline::ConnectivityMonitor;
use crate::services::LocalStore;

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Transport that answers from a closure and records every attempt.
///
/// While "offline" every request is recorded and then fails as unreachable.
#[derive(Clone)]
pub struct FakeTransport {
    handler: Arc<Handler>,
    online: Arc<AtomicBool>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl FakeTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            online: Arc::new(AtomicBool::new(true)),
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of recorded requests whose URL ends with `suffix`
    pub fn requests_to(&self, suffix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.ends_with(suffix))
            .count()
    }
}

impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.requests.lock().unwrap().push(request.clone());
        if !self.online.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable("connection refused".to_string()));
        }
        (self.handler)(&request)
    }
}

/// Client over an in-memory store, pointed at the local API base URL.
pub fn client_with(
    transport: FakeTransport,
    session: MemorySessionStore,
) -> ApiClient<FakeTransport, MemorySessionStore> {
    let config = ClientConfig::new(LOCAL_API_BASE_URL).unwrap();
    ApiClient::new(
        config,
        transport,
        session,
        LocalStore::in_memory(),
        ConnectivityMonitor::default(),
    )
}
