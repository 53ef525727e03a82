//! Static table of the applications this host serves.
//!
//! The table is built once at startup and shared read-only with every
//! connection.  Each entry knows how to create a fresh [`Application`] for a
//! new session, plus the metadata the listing and the discovery
//! announcement publish.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use hme_core::protocol::constants::HME_MIME;
use hme_core::{AppMetadata, Application};
use uuid::Uuid;

/// Creates one application instance per session.
pub type AppFactory = Arc<dyn Fn() -> Box<dyn Application> + Send + Sync>;

/// A hosted application.
#[derive(Clone)]
pub struct AppEntry {
    pub metadata: AppMetadata,
    /// `/<name>/`
    pub url: String,
    /// `/<name>/icon.png`
    pub icon_url: String,
    pub content_type: String,
    pub uuid: Uuid,
    /// Directory served for `/<name>/<path>` requests.
    pub resource_dir: Option<PathBuf>,
    factory: AppFactory,
}

impl AppEntry {
    pub fn new<F, A>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Application + 'static,
    {
        let factory: AppFactory = Arc::new(move || Box::new(factory()) as Box<dyn Application>);
        Self::from_factory(AppMetadata::new(name), factory)
    }

    pub fn from_factory(metadata: AppMetadata, factory: AppFactory) -> Self {
        let url = format!("/{}/", metadata.name);
        let icon_url = format!("{url}icon.png");
        Self {
            metadata,
            url,
            icon_url,
            content_type: HME_MIME.to_string(),
            uuid: Uuid::new_v4(),
            resource_dir: None,
            factory,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = title.into();
        self
    }

    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dir = Some(dir.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// A new application instance for one session.
    pub fn instantiate(&self) -> Box<dyn Application> {
        (self.factory)()
    }
}

impl fmt::Debug for AppEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppEntry")
            .field("name", &self.metadata.name)
            .field("title", &self.metadata.title)
            .field("uuid", &self.uuid)
            .field("resource_dir", &self.resource_dir)
            .finish_non_exhaustive()
    }
}

/// Applications keyed by name, listed in name order.
#[derive(Debug, Default, Clone)]
pub struct AppRegistry {
    apps: BTreeMap<String, Arc<AppEntry>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `entry`, returning the entry it replaced, if any.
    pub fn register(&mut self, entry: AppEntry) -> Option<Arc<AppEntry>> {
        self.apps.insert(entry.metadata.name.clone(), Arc::new(entry))
    }

    pub fn get(&self, name: &str) -> Option<Arc<AppEntry>> {
        self.apps.get(name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AppEntry>> {
        self.apps.values()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
