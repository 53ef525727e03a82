//! Hooks through which a session reports events to application code.

use std::sync::Arc;

use crate::protocol::codec::Dict;
use crate::protocol::messages::{FontMetrics, InfoMap, Resolution};
use crate::domain::resource::{Resource, ResourceId};
use crate::session::Session;

/// An HME application bound to one session.
///
/// Every hook has a default so an application only overrides what it uses.
/// Hooks run on the session's receive thread and should return promptly.
pub trait Application {
    /// Called once after the handshake, before the root view is shown.
    fn startup(&mut self, _session: &Session) {}

    /// Called once when the receive loop ends, before the session closes.
    fn cleanup(&mut self, _session: &Session) {}

    /// The receiver has made this application active.
    fn handle_active(&mut self, _session: &Session) {}

    fn handle_key_press(&mut self, _session: &Session, _code: i64, _rawcode: i64) {}

    /// Auto-repeat; treated as another press unless overridden.
    fn handle_key_repeat(&mut self, session: &Session, code: i64, rawcode: i64) {
        self.handle_key_press(session, code, rawcode);
    }

    fn handle_key_release(&mut self, _session: &Session, _code: i64, _rawcode: i64) {}

    /// The receiver reported an error. The session keeps running.
    fn handle_error(&mut self, _session: &Session, _code: &str, _text: &str) {}

    fn handle_app_info(&mut self, _session: &Session, _info: &InfoMap) {}

    fn handle_device_info(&mut self, _session: &Session, _info: &InfoMap) {}

    fn handle_resource_info(
        &mut self,
        _session: &Session,
        _resource: ResourceId,
        _status: i64,
        _info: &InfoMap,
    ) {
    }

    /// Metrics for a font created with a metrics flag.
    fn handle_font_info(&mut self, _session: &Session, _font: &Resource, _metrics: &FontMetrics) {}

    /// The receiver is entering (`true`) or leaving idle. Return `true` if
    /// the application handled it; the answer is sent back to the receiver.
    fn handle_idle(&mut self, _session: &Session, _idle: bool) -> bool {
        false
    }

    /// Parameters and memento handed over by the previous application.
    fn handle_init_info(&mut self, _session: &Session, _params: &Dict, _memento: &[u8]) {}

    /// Picks a resolution after the receiver lists what it supports.
    /// Keeps the current one unless overridden.
    fn handle_resolution(&mut self, session: &Session) -> Resolution {
        session.current_resolution()
    }
}

/// Something that can hold the session's focus.
///
/// Each capability is optional; when the focused object does not provide
/// one, the event goes to the [`Application`] instead.
pub trait FocusTarget: Send + Sync {
    fn key_handler(&self) -> Option<&dyn KeyHandler> {
        None
    }

    fn focus_listener(&self) -> Option<&dyn FocusListener> {
        None
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait KeyHandler {
    fn handle_key_press(&self, session: &Session, code: i64, rawcode: i64);

    fn handle_key_repeat(&self, session: &Session, code: i64, rawcode: i64) {
        self.handle_key_press(session, code, rawcode);
    }

    fn handle_key_release(&self, _session: &Session, _code: i64, _rawcode: i64) {}
}

#[cfg_attr(test, mockall::automock)]
pub trait FocusListener {
    /// `gained` is true when focus arrives and false when it leaves.
    fn handle_focus(&self, session: &Session, gained: bool);
}

/// Shared pointer to a focus target.
pub type Focus = Arc<dyn FocusTarget>;

/// Name and display title of an application, used when announcing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMetadata {
    pub name: String,
    pub title: String,
}

impl AppMetadata {
    /// Metadata whose title is derived from `name`: `"my_app"` becomes `"My App"`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let title = title_case(&name);
        Self { name, title }
    }

    pub fn with_title(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
        }
    }
}

fn title_case(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_title_from_name() {
        assert_eq!(AppMetadata::new("hello").title, "Hello");
        assert_eq!(AppMetadata::new("my_cool-app").title, "My Cool App");
    }

    #[test]
    fn test_metadata_explicit_title() {
        let meta = AppMetadata::with_title("clock", "Wall Clock");
        assert_eq!(meta.name, "clock");
        assert_eq!(meta.title, "Wall Clock");
    }
}
