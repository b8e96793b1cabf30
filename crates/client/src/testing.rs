//! In-process transport and fixtures shared by unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use shellcache_core::{CacheDb, CacheStorage, Error};
use url::Url;

use crate::fetch::Transport;
use crate::request::Request;
use crate::response::Response;

pub const ORIGIN: &str = "https://erp.example.com";

pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub fn url(path: &str) -> Url {
    origin().join(path).unwrap()
}

pub async fn memory_store() -> Arc<CacheDb> {
    Arc::new(CacheDb::open_in_memory().await.unwrap())
}

pub fn as_storage(db: &Arc<CacheDb>) -> Arc<dyn CacheStorage> {
    Arc::clone(db) as Arc<dyn CacheStorage>
}

#[derive(Clone)]
enum Route {
    Respond { final_url: Option<Url>, status: StatusCode, body: String },
    Fail,
}

/// Transport answering from a fixed route table.
///
/// Unknown URLs and every URL while offline fail like a dropped connection.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<(String, String)>>,
    offline: AtomicBool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, status: u16, body: &str) -> Self {
        let final_url = Url::parse(url).ok();
        self.respond_as(url, final_url, status, body)
    }

    /// Respond with an explicit final URL (None for opaque responses).
    pub fn respond_as(self, url: &str, final_url: Option<Url>, status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Respond { final_url, status, body: body.to_string() });
        self
    }

    pub fn fail(self, url: &str) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Fail);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// (method, url) of every fetch attempted so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls
            .lock()
            .unwrap()
            .push((request.method.to_string(), request.url.to_string()));

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }

        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        match route {
            Some(Route::Respond { final_url, status, body }) => {
                Ok(Response::new(final_url, status, HeaderMap::new(), body))
            }
            Some(Route::Fail) | None => Err(Error::Network(format!("{}: connection refused", request.url))),
        }
    }
}
