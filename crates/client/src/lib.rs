//! Caching worker for shellcache.
//!
//! This crate holds the request/response model, the network transport, and
//! the four worker components (precache loader, key normalizer, fetch
//! strategy, generation manager) plus push handling and signal dispatch.

pub mod fetch;
pub mod generations;
pub mod normalize;
pub mod precache;
pub mod push;
pub mod request;
pub mod response;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fetch::{FetchClient, FetchConfig, Transport};
pub use generations::GenerationManager;
pub use normalize::KeyNormalizer;
pub use precache::{PrecacheFailure, PrecacheLoader, PrecacheManifest, PrecacheReport};
pub use push::{LogNotifier, Notification, Notifier, PushHandler, PushPayload};
pub use request::{CacheDirective, Credentials, RedirectPolicy, Request, RequestMode};
pub use response::Response;
pub use strategy::{FetchOutcome, FetchStrategy, Intercepted};
pub use worker::{ServiceWorker, Signal, SignalOutcome};
