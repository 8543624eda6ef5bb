use crate::{
    config::BackendConfig,
    document::CallQuery,
    error::{ConfigError, FeedError},
    source::{
        CallSource, Listener, Subscription,
        gateway::{ListenRequest, run_listener},
    },
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

/// Explicitly constructed handle to the document backend.
///
/// Built once, shared by cloning (clones share one connection context) and torn down with
/// [`Backend::shutdown`], which ends every listen stream spawned through it. Listening
/// requires a running Tokio runtime.
#[derive(Debug, Clone)]
pub struct Backend {
    inner: Arc<BackendInner>,
}

#[derive(Debug)]
struct BackendInner {
    config: BackendConfig,
    endpoint: Url,
    shutdown: watch::Sender<bool>,
}

impl Backend {
    pub fn new(config: BackendConfig) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint()?;
        let (shutdown, _) = watch::channel(false);

        info!(
            %endpoint,
            project_id = %config.project_id,
            api_key = config.api_key.is_some(),
            "initialised backend handle"
        );

        Ok(Self {
            inner: Arc::new(BackendInner {
                config,
                endpoint,
                shutdown,
            }),
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Stop every listen stream started through this handle. Later listens fail immediately.
    pub fn shutdown(&self) {
        if !self.inner.shutdown.send_replace(true) {
            info!("backend handle shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }
}

impl CallSource for Backend {
    fn listen(&self, query: CallQuery, listener: Listener) -> Subscription {
        if self.is_shut_down() {
            listener.deliver_error(FeedError::Unavailable(
                "backend handle has been shut down".to_string(),
            ));
            return Subscription::new(listener);
        }

        let config = &self.inner.config;
        let request = ListenRequest::new(&config.project_id, config.api_key.as_deref(), &query);
        let request = match serde_json::to_string(&request) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "failed to encode listen request");
                listener.deliver_error(FeedError::Unavailable(error.to_string()));
                return Subscription::new(listener);
            }
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("no Tokio runtime, cannot start gateway listen stream");
                listener.deliver_error(FeedError::Unavailable("no Tokio runtime".to_string()));
                return Subscription::new(listener);
            }
        };

        let task = runtime.spawn(run_listener(
            self.inner.endpoint.clone(),
            request,
            listener.clone(),
            self.inner.shutdown.subscribe(),
        ));

        Subscription::new(listener).with_teardown(move || task.abort())
    }
}
