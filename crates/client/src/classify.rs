//! Resource kind classification.
//!
//! Host allowlists win over path extensions. The extension is taken from the
//! last path segment only (`/a/photo.jpg`), never from anywhere else in the
//! path, so `/photos.jpg.html` is a document and `/jpg-gallery/` is not an image.

use std::collections::HashMap;

use offcache_core::{AppConfig, ResourceKind};
use url::Url;

const DEFAULT_EXTENSIONS: &[(&str, ResourceKind)] = &[
    ("html", ResourceKind::Document),
    ("htm", ResourceKind::Document),
    ("js", ResourceKind::Script),
    ("mjs", ResourceKind::Script),
    ("css", ResourceKind::Style),
    ("woff", ResourceKind::Font),
    ("woff2", ResourceKind::Font),
    ("ttf", ResourceKind::Font),
    ("otf", ResourceKind::Font),
    ("eot", ResourceKind::Font),
    ("jpg", ResourceKind::Image),
    ("jpeg", ResourceKind::Image),
    ("png", ResourceKind::Image),
    ("gif", ResourceKind::Image),
    ("webp", ResourceKind::Image),
    ("avif", ResourceKind::Image),
    ("svg", ResourceKind::Image),
    ("ico", ResourceKind::Image),
    ("json", ResourceKind::Data),
    ("xml", ResourceKind::Data),
    ("csv", ResourceKind::Data),
];

/// Maps request URLs to a [`ResourceKind`].
#[derive(Debug, Clone)]
pub struct Classifier {
    extensions: HashMap<String, ResourceKind>,
    image_hosts: Vec<String>,
    data_hosts: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS
                .iter()
                .map(|(ext, kind)| (ext.to_string(), *kind))
                .collect(),
            image_hosts: Vec::new(),
            data_hosts: Vec::new(),
        }
    }
}

impl Classifier {
    /// Default extension table plus the configured hosts and overrides.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut classifier = Self::default();
        for host in &config.image_hosts {
            classifier = classifier.with_image_host(host);
        }
        for host in &config.data_hosts {
            classifier = classifier.with_data_host(host);
        }
        for (ext, kind) in &config.extensions {
            classifier = classifier.with_extension(ext, *kind);
        }
        classifier
    }

    /// Map a path extension (without the dot, case-insensitive) to a kind.
    pub fn with_extension(mut self, ext: &str, kind: ResourceKind) -> Self {
        self.extensions.insert(ext.trim_start_matches('.').to_ascii_lowercase(), kind);
        self
    }

    /// Treat every response from `host` (or its subdomains) as an image.
    pub fn with_image_host(mut self, host: &str) -> Self {
        self.image_hosts.push(host.to_ascii_lowercase());
        self
    }

    /// Treat every response from `host` (or its subdomains) as dynamic data.
    pub fn with_data_host(mut self, host: &str) -> Self {
        self.data_hosts.push(host.to_ascii_lowercase());
        self
    }

    pub fn classify(&self, url: &Url) -> ResourceKind {
        if let Some(host) = url.host_str() {
            if self.image_hosts.iter().any(|h| host_matches(host, h)) {
                return ResourceKind::Image;
            }
            if self.data_hosts.iter().any(|h| host_matches(host, h)) {
                return ResourceKind::Data;
            }
        }

        let last = url.path_segments().and_then(|mut segments| segments.next_back()).unwrap_or("");
        if last.is_empty() {
            return ResourceKind::Document;
        }

        path_extension(last)
            .and_then(|ext| self.extensions.get(&ext).copied())
            .unwrap_or(ResourceKind::Other)
    }
}

fn host_matches(host: &str, pattern: &str) -> bool {
    host == pattern || host.strip_suffix(pattern).is_some_and(|rest| rest.ends_with('.'))
}

/// Extension of a single path segment; dotfiles like `.htaccess` have none.
fn path_extension(segment: &str) -> Option<String> {
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
