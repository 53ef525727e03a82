//! # hme-core
//!
//! Protocol engine for HME, the binary protocol a set-top receiver uses to
//! display a user interface driven entirely by a remote host.
//!
//! # Architecture overview (for beginners)
//!
//! The host draws by sending commands ("create a view here", "add this
//! color", "attach that text to this view") and the receiver answers with
//! events (key presses, idle notices, font metrics). This crate is
//! everything between a connected byte stream and application code:
//!
//! - **`protocol`** – how values travel: variable-length integers, strings,
//!   dictionaries, chunk framing, the 8-byte handshake, and the typed
//!   [`Command`] / [`Event`] messages.
//!
//! - **`domain`** – what lives on the receiver. [`Resource`] handles are
//!   allocated and deduplicated per session; [`View`] handles mirror the
//!   receiver's scene graph and only send commands when something changes.
//!
//! - **`session`** – one connection. [`Session::run`] performs the handshake
//!   and dispatches events to an [`Application`] until the connection ends.
//!   Clones of a [`Session`] may be moved to producer threads.
//!
//! The crate opens no sockets; the hosting layer hands it a [`Transport`].

pub mod domain;
pub mod protocol;
pub mod session;

pub use domain::resource::{
    normalize_color, FontSpec, Resource, ResourceError, ResourceId, ResourceKey, ResourceKind,
    Source, TextStyle,
};
pub use domain::view::{Bounds, Timing, View, ViewContent, ViewOptions};
pub use protocol::codec::{Dict, DictValue, ProtocolError};
pub use protocol::constants::{ids, keys, KeyAction, TransitionDirection};
pub use protocol::messages::{Command, Event, FontMetrics, InfoMap, Resolution};
pub use session::{
    AppMetadata, Application, Duplex, Focus, FocusListener, FocusTarget, KeyHandler, Session,
    SessionError, SessionOutcome, SessionPhase, Transport,
};
