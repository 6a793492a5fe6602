//! Test fixtures: a scripted network and a small site behind it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use offcache_client::{Network, RouterConfig};
use offcache_core::{AppConfig, CapturedResponse, Error, RequestDescriptor};

/// Serves fixed responses by absolute URL; anything else fails like a refused connection.
#[derive(Default)]
pub(crate) struct StaticNetwork {
    pages: Mutex<HashMap<String, CapturedResponse>>,
    calls: AtomicUsize,
}

impl StaticNetwork {
    /// The manifest assets of [`app_config`] plus one remote image and one data endpoint.
    pub(crate) fn with_site() -> Self {
        let network = Self::default();
        network.serve("https://example.com/", "text/html", "<html>home</html>");
        network.serve("https://example.com/app.js", "text/javascript", "console.log('app')");
        network.serve("https://picsum.photos/200", "image/jpeg", "jpeg-bytes");
        network.serve("https://example.com/api/todos.json", "application/json", "[]");
        network
    }

    pub(crate) fn serve(&self, url: &str, content_type: &str, body: &str) {
        let response = CapturedResponse::new(200, body.to_string()).with_content_type(content_type);
        self.pages.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Network for StaticNetwork {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<CapturedResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .get(request.url().as_str())
            .cloned()
            .ok_or_else(|| Error::HttpError(format!("connection refused: {}", request.url())))
    }
}

pub(crate) fn app_config() -> AppConfig {
    AppConfig {
        origin: "https://example.com".into(),
        version: 2,
        manifest: vec!["/".into(), "/app.js".into()],
        ..AppConfig::default()
    }
}

pub(crate) fn router_config() -> RouterConfig {
    RouterConfig { fetch_timeout: Duration::from_millis(200), ..RouterConfig::from_app_config(&app_config()).unwrap() }
}
