//! Authenticated HTTP client with offline fallback.

use std::sync::Arc;

use serde_json::{json, Value};

use super::error::{parse_api_error, ApiError};
use super::response::{ApiResponse, RequestOptions};
use super::transport::{
    HttpRequest, HttpResponse, RequestBody, Transport, UploadFile, STATUS_UNAUTHORIZED,
};
use crate::auth::{
    parse_refresh_response, AuthPhase, LoginRedirect, Session, SessionPersistence,
    REFRESH_ENDPOINT,
};
use crate::config::ClientConfig;
use crate::models::HttpMethod;
use crate::offline::{ConnectivityMonitor, ConnectivityState, OfflineDispatcher};
use crate::services::LocalStore;

pub const HEALTH_ENDPOINT: &str = "/health";

/// Front door for every remote call.
///
/// Attaches the bearer token, recovers once from an expired token, caches
/// successful reads, and hands unreachable requests to the offline dispatcher.
///
/// Once the monitor reads `Offline`, writes are queued without touching the
/// network. Nothing here polls: the caller has to call
/// [`ApiClient::check_connectivity`] (or complete a sync pass) to go back online.
pub struct ApiClient<T, S> {
    config: Arc<ClientConfig>,
    transport: Arc<T>,
    session: S,
    store: LocalStore,
    monitor: ConnectivityMonitor,
    dispatcher: OfflineDispatcher,
    login_redirect: Option<Arc<dyn LoginRedirect>>,
}

impl<T, S: Clone> Clone for ApiClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            session: self.session.clone(),
            store: self.store.clone(),
            monitor: self.monitor.clone(),
            dispatcher: self.dispatcher.clone(),
            login_redirect: self.login_redirect.clone(),
        }
    }
}

impl<T, S> ApiClient<T, S>
where
    T: Transport,
    S: SessionPersistence,
{
    pub fn new(
        config: ClientConfig,
        transport: T,
        session: S,
        store: LocalStore,
        monitor: ConnectivityMonitor,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            session,
            dispatcher: OfflineDispatcher::new(store.clone()),
            store,
            monitor,
            login_redirect: None,
        }
    }

    /// Hook fired after the session is cleared on an unrecoverable 401.
    #[must_use]
    pub fn with_login_redirect(mut self, hook: impl LoginRedirect + 'static) -> Self {
        self.login_redirect = Some(Arc::new(hook));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub const fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub async fn get(&self, endpoint: &str) -> Result<ApiResponse, ApiError> {
        self.request(HttpMethod::Get, endpoint, None, RequestOptions::default())
            .await
    }

    pub async fn post(&self, endpoint: &str, data: Value) -> Result<ApiResponse, ApiError> {
        self.request(HttpMethod::Post, endpoint, Some(data), RequestOptions::default())
            .await
    }

    pub async fn put(&self, endpoint: &str, data: Value) -> Result<ApiResponse, ApiError> {
        self.request(HttpMethod::Put, endpoint, Some(data), RequestOptions::default())
            .await
    }

    pub async fn patch(&self, endpoint: &str, data: Value) -> Result<ApiResponse, ApiError> {
        self.request(HttpMethod::Patch, endpoint, Some(data), RequestOptions::default())
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<ApiResponse, ApiError> {
        self.request(HttpMethod::Delete, endpoint, None, RequestOptions::default())
            .await
    }

    /// Issue a request against `endpoint` (relative to the base URL).
    ///
    /// A JSON body is only sent for POST/PUT/PATCH. When the network is
    /// unavailable and `options.offline_fallback` is set, writes are queued
    /// and reads are answered from the cache.
    pub async fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        data: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.config.url_for(endpoint);

        if options.offline_fallback && self.monitor.is_offline() {
            tracing::debug!("Offline; not sending {} {}", method, endpoint);
            return self
                .dispatcher
                .dispatch(
                    method,
                    endpoint,
                    data.as_ref(),
                    &url,
                    ApiError::Network("client is offline".to_string()),
                )
                .await;
        }

        let body = match data.as_ref() {
            Some(value) if method.carries_body() => RequestBody::Json(value.clone()),
            _ => RequestBody::Empty,
        };

        let response = match self.send_authorized(method, &url, body).await {
            Ok(response) => response,
            Err(error @ ApiError::Network(_)) if options.offline_fallback => {
                tracing::warn!("{} {} failed: {}", method, endpoint, error);
                return self
                    .dispatcher
                    .dispatch(method, endpoint, data.as_ref(), &url, error)
                    .await;
            }
            Err(error) => return Err(error),
        };

        let payload = decode_payload(&response)?;
        if method == HttpMethod::Get {
            if let Err(error) = self.store.cache_response(endpoint, &payload).await {
                tracing::warn!("Failed to cache response for {}: {}", endpoint, error);
            }
        }
        Ok(ApiResponse::Online(payload))
    }

    /// Multipart POST of `file` plus text `fields`. Never queued.
    pub async fn upload(
        &self,
        endpoint: &str,
        file: UploadFile,
        fields: Vec<(String, String)>,
    ) -> Result<Value, ApiError> {
        let url = self.config.url_for(endpoint);
        tracing::debug!("Uploading {:?} to {}", file, endpoint);
        let response = self
            .send_authorized(HttpMethod::Post, &url, RequestBody::Multipart { file, fields })
            .await?;
        decode_payload(&response)
    }

    /// Probe `GET /health` and record the result on the monitor.
    ///
    /// Any HTTP response counts as reachable.
    pub async fn check_connectivity(&self) -> ConnectivityState {
        let request = HttpRequest::new(HttpMethod::Get, self.config.url_for(HEALTH_ENDPOINT));
        let state = match self.transport.send(request).await {
            Ok(_) => ConnectivityState::Online,
            Err(error) => {
                tracing::debug!("Health check failed: {}", error);
                ConnectivityState::Offline
            }
        };
        self.monitor.set(state);
        state
    }

    async fn send_authorized(
        &self,
        method: HttpMethod,
        url: &str,
        body: RequestBody,
    ) -> Result<HttpResponse, ApiError> {
        let mut session = self.current_session();
        let mut phase = AuthPhase::Authenticated;

        while phase.may_send() {
            let request = HttpRequest::new(method, url)
                .with_bearer_token(session.as_ref().map(|session| session.token.clone()))
                .with_body(body.clone());

            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(error) => {
                    let error = ApiError::from(error);
                    if error.is_network() {
                        self.monitor.set(ConnectivityState::Offline);
                    }
                    return Err(error);
                }
            };
            self.monitor.set(ConnectivityState::Online);

            if response.status != STATUS_UNAUTHORIZED {
                return ensure_success(response);
            }

            phase = phase.on_unauthorized();
            if phase == AuthPhase::Refreshing {
                session = self.refresh_session(session.as_ref()).await;
                phase = phase.on_refresh(session.is_some());
            }
        }

        Err(self.fail_authentication())
    }

    fn current_session(&self) -> Option<Session> {
        match self.session.load_session() {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!("Failed to load stored session: {}", error);
                None
            }
        }
    }

    async fn refresh_session(&self, current: Option<&Session>) -> Option<Session> {
        let Some(refresh_token) = current.and_then(|session| session.refresh_token.as_deref())
        else {
            tracing::debug!("No refresh token stored; cannot renew session");
            return None;
        };

        let request = HttpRequest::new(HttpMethod::Post, self.config.url_for(REFRESH_ENDPOINT))
            .with_body(RequestBody::Json(json!({ "refreshToken": refresh_token })));

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!("Token refresh failed: {}", error);
                return None;
            }
        };
        if !response.is_success() {
            tracing::warn!(
                "Token refresh rejected: {}",
                parse_api_error(response.status, &response.text())
            );
            return None;
        }

        match parse_refresh_response(&response.body, refresh_token) {
            Ok(session) => {
                if let Err(error) = self.session.save_session(&session) {
                    tracing::warn!("Failed to persist refreshed session: {}", error);
                }
                tracing::debug!("Session refreshed");
                Some(session)
            }
            Err(error) => {
                tracing::warn!("Token refresh returned an unusable payload: {}", error);
                None
            }
        }
    }

    fn fail_authentication(&self) -> ApiError {
        if let Err(error) = self.session.clear_session() {
            tracing::warn!("Failed to clear stored session: {}", error);
        }
        if let Some(hook) = &self.login_redirect {
            hook.redirect_to_login();
        }
        ApiError::Authentication("session expired, please log in again".to_string())
    }
}

fn ensure_success(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Server {
            status: response.status,
            message: parse_api_error(response.status, &response.text()),
        })
    }
}

fn decode_payload(response: &HttpResponse) -> Result<Value, ApiError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&response.body)?)
}
