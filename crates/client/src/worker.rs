//! Lifecycle signal dispatch.
//!
//! The host delivers install, activate, fetch and push signals; each is
//! routed to its component. Failures stop here: every signal produces an
//! outcome, degraded if need be.

use std::sync::Arc;

use shellcache_core::{AppConfig, CacheStorage, Error};
use url::Url;

use crate::fetch::{Transport, resolve};
use crate::generations::GenerationManager;
use crate::normalize::KeyNormalizer;
use crate::precache::{PrecacheLoader, PrecacheManifest, PrecacheReport};
use crate::push::{Notification, Notifier, PushHandler, PushPayload};
use crate::request::Request;
use crate::strategy::{FetchStrategy, Intercepted};

/// A lifecycle signal from the host.
#[derive(Debug, Clone)]
pub enum Signal {
    Install,
    Activate,
    Fetch(Box<Request>),
    Push(PushPayload),
}

/// What handling a signal produced.
#[derive(Debug)]
pub enum SignalOutcome {
    Installed(PrecacheReport),
    /// Names of the generations that were deleted.
    Activated(Vec<String>),
    Fetched(Intercepted),
    Pushed(Notification),
}

/// The caching worker: one instance per deployed version.
pub struct ServiceWorker {
    generation: String,
    origin: Url,
    precache: PrecacheLoader,
    strategy: FetchStrategy,
    generations: GenerationManager,
    push: PushHandler,
}

impl ServiceWorker {
    /// Build every component for the version named in `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the origin, icon, or a manifest entry
    /// can't be resolved.
    pub fn new(
        config: &AppConfig, store: Arc<dyn CacheStorage>, transport: Arc<dyn Transport>, notifier: Arc<dyn Notifier>,
    ) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let generation = config.current_generation();
        let icon = resolve(&config.icon_url, &origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.icon_url)))?;
        let manifest = PrecacheManifest::render(&config.precache_urls, &config.sw_version, icon.as_str(), &origin)?;

        Ok(Self {
            precache: PrecacheLoader::new(Arc::clone(&store), Arc::clone(&transport), manifest, generation.clone()),
            strategy: FetchStrategy::new(
                Arc::clone(&store),
                transport,
                KeyNormalizer::from_config(config),
                generation.clone(),
                origin.clone(),
            ),
            generations: GenerationManager::new(store, generation.clone()),
            push: PushHandler::new(notifier, icon.as_str(), config.notification_tag.clone()),
            generation,
            origin,
        })
    }

    /// Name of the current generation.
    pub fn generation(&self) -> &str {
        &self.generation
    }

    /// Origin the worker serves; relative request URLs resolve against it.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub async fn dispatch(&self, signal: Signal) -> SignalOutcome {
        match signal {
            Signal::Install => SignalOutcome::Installed(self.install().await),
            Signal::Activate => SignalOutcome::Activated(self.activate().await),
            Signal::Fetch(request) => SignalOutcome::Fetched(self.fetch(&request).await),
            Signal::Push(payload) => SignalOutcome::Pushed(self.push(&payload).await),
        }
    }

    /// Precache the shell. A store failure yields an empty report.
    pub async fn install(&self) -> PrecacheReport {
        tracing::info!(generation = %self.generation, "install event processing");
        match self.precache.install().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(generation = %self.generation, error = %e, "install failed");
                PrecacheReport { generation: self.generation.clone(), ..Default::default() }
            }
        }
    }

    /// Drop superseded generations.
    pub async fn activate(&self) -> Vec<String> {
        match self.generations.activate().await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!(generation = %self.generation, error = %e, "activate failed");
                Vec::new()
            }
        }
    }

    pub async fn fetch(&self, request: &Request) -> Intercepted {
        self.strategy.handle(request).await
    }

    pub async fn push(&self, payload: &PushPayload) -> Notification {
        self.push.handle(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::LogNotifier;
    use crate::strategy::FetchOutcome;
    use crate::testing::{ORIGIN, ScriptedTransport, as_storage, memory_store};

    fn config() -> AppConfig {
        AppConfig {
            origin: ORIGIN.into(),
            sw_version: "2".into(),
            icon_url: "/assets/logo.png".into(),
            precache_urls: vec!["/".into(), "{{ icon_url }}".into(), "/pwa.js".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let db = memory_store().await;
        db.open_generation("frappe-cache-v1").await.unwrap();

        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(&format!("{ORIGIN}/"), 200, "shell")
                .respond(&format!("{ORIGIN}/assets/logo.png"), 200, "png")
                .fail(&format!("{ORIGIN}/pwa.js")),
        );
        let worker =
            ServiceWorker::new(&config(), as_storage(&db), transport.clone(), Arc::new(LogNotifier)).unwrap();
        assert_eq!(worker.generation(), "frappe-cache-v2");

        let SignalOutcome::Installed(report) = worker.dispatch(Signal::Install).await else {
            panic!("expected install outcome");
        };
        assert_eq!(report.stored.len(), 2);
        assert_eq!(report.failed.len(), 1);

        let SignalOutcome::Activated(deleted) = worker.dispatch(Signal::Activate).await else {
            panic!("expected activate outcome");
        };
        assert_eq!(deleted, vec!["frappe-cache-v1".to_string()]);

        transport.set_offline(true);
        let request = Request::parse("GET", &format!("{ORIGIN}/")).unwrap();
        let SignalOutcome::Fetched(intercepted) = worker.dispatch(Signal::Fetch(Box::new(request))).await else {
            panic!("expected fetch outcome");
        };
        match intercepted.outcome {
            FetchOutcome::Cache(response) => assert_eq!(response.text_lossy(), "shell"),
            other => panic!("expected cached shell, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_push_signal() {
        let db = memory_store().await;
        let worker =
            ServiceWorker::new(&config(), as_storage(&db), Arc::new(ScriptedTransport::new()), Arc::new(LogNotifier))
                .unwrap();

        let SignalOutcome::Pushed(notification) =
            worker.dispatch(Signal::Push(PushPayload { text: Some("Leave approved".into()) })).await
        else {
            panic!("expected push outcome");
        };
        assert_eq!(notification.title, "Leave approved");
        assert_eq!(notification.icon, format!("{ORIGIN}/assets/logo.png"));
        assert_eq!(notification.tag, "push-frappe-notification");
    }

    #[tokio::test]
    async fn test_new_rejects_bad_origin() {
        let db = memory_store().await;
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        let result =
            ServiceWorker::new(&config, as_storage(&db), Arc::new(ScriptedTransport::new()), Arc::new(LogNotifier));
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
