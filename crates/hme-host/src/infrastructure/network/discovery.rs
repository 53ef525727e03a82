//! DNS-SD announcement of hosted applications.
//!
//! Receivers find HME applications by browsing for the `_tivo-hme._tcp`
//! service type.  Each application is published as its own service instance:
//!
//! - the instance name is the display title, with spaces replaced by
//!   non-breaking spaces (receivers split names on plain spaces);
//! - the port is the host's listening port;
//! - the TXT record carries `path=<app url>` and `version=<major.minor>`,
//!   each as a length-prefixed string.
//!
//! Publishing goes through the [`Announcer`] trait.  The default
//! [`LoggingAnnouncer`] only records what would be published.

use hme_core::protocol::constants::version_string;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::registry::{AppEntry, AppRegistry};

/// Service type browsed for by receivers.
pub const SERVICE_TYPE: &str = "_tivo-hme._tcp";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A TXT entry longer than 255 bytes cannot be length-prefixed.
    #[error("TXT entry too long ({0} bytes)")]
    TxtEntryTooLong(usize),

    #[error("announcement failed: {0}")]
    Publish(String),
}

/// One service instance to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub instance_name: String,
    pub service_type: String,
    pub port: u16,
    /// `key=value` entries, in publication order.
    pub txt: Vec<String>,
}

impl Announcement {
    pub fn for_app(entry: &AppEntry, port: u16) -> Self {
        Self {
            instance_name: entry.title().replace(' ', "\u{00A0}"),
            service_type: SERVICE_TYPE.to_string(),
            port,
            txt: vec![
                format!("path={}", entry.url),
                format!("version={}", version_string()),
            ],
        }
    }

    /// The TXT record in wire form: each entry preceded by its length byte.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::TxtEntryTooLong`] for an entry over 255 bytes.
    pub fn txt_record(&self) -> Result<Vec<u8>, DiscoveryError> {
        let mut record = Vec::new();
        for entry in &self.txt {
            let len = u8::try_from(entry.len())
                .map_err(|_| DiscoveryError::TxtEntryTooLong(entry.len()))?;
            record.push(len);
            record.extend_from_slice(entry.as_bytes());
        }
        Ok(record)
    }
}

/// Publishes announcements on the local network.
#[cfg_attr(test, mockall::automock)]
pub trait Announcer: Send + Sync {
    fn announce(&self, announcement: &Announcement) -> Result<(), DiscoveryError>;
}

/// Logs each announcement instead of publishing it.
#[derive(Debug, Default)]
pub struct LoggingAnnouncer;

impl Announcer for LoggingAnnouncer {
    fn announce(&self, announcement: &Announcement) -> Result<(), DiscoveryError> {
        let txt_len = announcement.txt_record()?.len();
        info!(
            name = %announcement.instance_name,
            service = %announcement.service_type,
            port = announcement.port,
            txt = ?announcement.txt,
            txt_len,
            "announcing application"
        );
        Ok(())
    }
}

/// Announces every registered application. Returns how many succeeded.
pub fn announce_all(announcer: &dyn Announcer, registry: &AppRegistry, port: u16) -> usize {
    registry
        .iter()
        .map(|entry| Announcement::for_app(entry, port))
        .filter(|announcement| match announcer.announce(announcement) {
            Ok(()) => true,
            Err(e) => {
                warn!(name = %announcement.instance_name, error = %e, "announcement failed");
                false
            }
        })
        .count()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
