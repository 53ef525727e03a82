//! The per-connection session: handshake, receive loop and event dispatch.
//!
//! # Lifecycle (for beginners)
//!
//! ```text
//! Unstarted ──► Handshaking ──► Active ──► Draining ──► Terminated
//!                    │                                      ▲
//!                    └──────────── bad answer ──────────────┘
//! ```
//!
//! [`Session::run`] drives the whole lifecycle on the calling thread. While
//! it blocks reading events, any number of producer threads may hold clones
//! of the [`Session`] and create resources or update views. Two locks keep
//! that safe:
//!
//! - the **state lock** guards the resource registry, the view tree, focus
//!   and resolution bookkeeping;
//! - the **writer lock** guards the buffered output stream.
//!
//! The state lock is always taken before the writer lock, never the other
//! way around, so the two cannot deadlock.

pub mod handler;
pub mod transport;

use std::fmt;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::domain::resource::{Registry, Resource, ResourceError, ResourceKind};
use crate::domain::view::{animation_id, Timing, View, ViewTree};
use crate::protocol::codec::Dict;
use crate::protocol::constants::{ids, KeyAction, TransitionDirection, MAX_MEMENTO_SIZE};
use crate::protocol::framing::{read_chunked, write_chunked};
use crate::protocol::handshake::{self, HandshakeAnswer, HandshakeError};
use crate::protocol::messages::{decode_event, encode_command, Command, Event, Resolution};

pub use handler::{AppMetadata, Application, Focus, FocusListener, FocusTarget, KeyHandler};
pub use transport::{Duplex, Transport};

/// Default capacity of the buffered writer.
pub const DEFAULT_WRITE_BUFFER: usize = 0x10000;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("memento of {size} bytes exceeds the {max} byte limit")]
    MementoTooLarge { size: usize, max: usize },

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("session is not active")]
    NotActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unstarted,
    Handshaking,
    Active,
    Draining,
    Terminated,
}

/// How [`Session::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The receiver did not answer with the protocol magic; no hooks ran.
    HandshakeFailed,
    /// The session went through startup and cleanup.
    Completed,
    /// `run` was already called on this session.
    AlreadyStarted,
}

/// Mutable per-session bookkeeping, guarded by the state lock.
pub(crate) struct SessionState {
    pub(crate) phase: SessionPhase,
    pub(crate) registry: Registry,
    pub(crate) views: ViewTree,
    pub(crate) focus: Option<Focus>,
    pub(crate) resolution: Resolution,
    pub(crate) resolutions: Vec<Resolution>,
    pub(crate) answer: Option<HandshakeAnswer>,
}

struct Shared {
    state: Mutex<SessionState>,
    writer: Mutex<BufWriter<transport::WriteHalf>>,
    reader: Mutex<Option<transport::ReadHalf>>,
    active: AtomicBool,
}

/// A handle to one receiver connection. Clones share the same session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("phase", &self.shared.state.try_lock().map(|s| s.phase).ok())
            .field("active", &self.is_active())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn same_focus(a: &Option<Focus>, b: &Option<Focus>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const (),
        _ => false,
    }
}

impl Session {
    /// Binds a new session to `transport`, ready for [`Session::run`].
    ///
    /// # Errors
    ///
    /// Returns the error raised while splitting the transport.
    pub fn new<T: Transport>(transport: T) -> io::Result<Self> {
        Self::with_write_buffer(transport, DEFAULT_WRITE_BUFFER)
    }

    /// Like [`Session::new`] with an explicit write buffer capacity.
    ///
    /// # Errors
    ///
    /// See [`Session::new`].
    pub fn with_write_buffer<T: Transport>(transport: T, capacity: usize) -> io::Result<Self> {
        let (reader, writer) = transport.into_split()?;
        let resolution = Resolution::default();
        let state = SessionState {
            phase: SessionPhase::Unstarted,
            registry: Registry::new(),
            views: ViewTree::with_root(resolution),
            focus: None,
            resolution,
            resolutions: Vec::new(),
            answer: None,
        };
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                writer: Mutex::new(BufWriter::with_capacity(capacity, writer)),
                reader: Mutex::new(Some(reader)),
                active: AtomicBool::new(false),
            }),
        })
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.shared.state)
    }

    fn set_phase(&self, phase: SessionPhase) {
        debug!(?phase, "session phase");
        self.lock_state().phase = phase;
    }

    /// Encodes `command` for `target` and queues it on the writer.
    ///
    /// A write failure marks the session inactive instead of returning an error.
    pub(crate) fn send(&self, target: i64, command: &Command) {
        let body = match encode_command(target, command) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, ?command, "failed to encode command");
                return;
            }
        };
        trace!(id = target, command = ?command.id(), len = body.len(), "queue command");
        let mut writer = lock(&self.shared.writer);
        if let Err(e) = write_chunked(&mut *writer, &body) {
            debug!(error = %e, "command write failed; deactivating session");
            self.shared.active.store(false, Ordering::SeqCst);
        }
    }

    /// Flushes queued commands to the transport.
    ///
    /// # Errors
    ///
    /// Returns the transport's write error.
    pub fn flush(&self) -> io::Result<()> {
        lock(&self.shared.writer).flush()
    }

    /// Flushes, deactivating the session if the transport has failed.
    pub(crate) fn flush_or_deactivate(&self) {
        if let Err(e) = self.flush() {
            debug!(error = %e, "flush failed; deactivating session");
            self.shared.active.store(false, Ordering::SeqCst);
        }
    }

    // ── Metadata ──────────────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.lock_state().phase
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Setting `false` ends the receive loop before its next read.
    pub fn set_active(&self, active: bool) {
        self.shared.active.store(active, Ordering::SeqCst);
    }

    /// The receiver's handshake answer, once received.
    pub fn handshake_answer(&self) -> Option<HandshakeAnswer> {
        self.lock_state().answer
    }

    /// Protocol version advertised by the receiver as `(major, minor)`.
    pub fn peer_version(&self) -> Option<(u8, u8)> {
        self.handshake_answer().map(|a| a.peer_version())
    }

    pub fn root(&self) -> View {
        View::root(self)
    }

    /// The zero-duration animation.
    pub fn immediate(&self) -> Resource {
        Resource::bound(self, ResourceKind::Animation, ids::NULL, None)
    }

    pub fn current_resolution(&self) -> Resolution {
        self.lock_state().resolution
    }

    /// Resolutions the receiver offered besides the current one.
    pub fn resolutions(&self) -> Vec<Resolution> {
        self.lock_state().resolutions.clone()
    }

    // ── Focus ─────────────────────────────────────────────────────────────────

    pub fn focus(&self) -> Option<Focus> {
        self.lock_state().focus.clone()
    }

    /// Moves focus to `target`, notifying the old and new holders.
    pub fn set_focus(&self, target: Option<Focus>) {
        let previous = self.focus();
        if same_focus(&previous, &target) {
            return;
        }
        if let Some(listener) = previous.as_deref().and_then(|t| t.focus_listener()) {
            listener.handle_focus(self, false);
        }
        self.lock_state().focus = target.clone();
        if let Some(listener) = target.as_deref().and_then(|t| t.focus_listener()) {
            listener.handle_focus(self, true);
        }
    }

    // ── Receiver control ──────────────────────────────────────────────────────

    /// Switches to `resolution` if the receiver offered it and it differs
    /// from the current one, then resizes the root view to match.
    pub fn set_resolution(&self, resolution: Resolution) {
        {
            let mut state = self.lock_state();
            if resolution == state.resolution || !state.resolutions.contains(&resolution) {
                return;
            }
            self.send(ids::ROOT_STREAM, &Command::SetResolution(resolution));
            state.resolution = resolution;
        }
        info!(width = resolution.width, height = resolution.height, "resolution changed");
        self.root()
            .set_size(resolution.width, resolution.height, Timing::Immediate);
    }

    /// Asks the receiver to echo a key press back after `timing` elapses.
    ///
    /// This is the only way to schedule a callback: the key arrives as a
    /// normal key event once the animation completes.
    pub fn send_key(&self, code: i64, rawcode: i64, timing: Timing) {
        {
            let mut state = self.lock_state();
            let animation = animation_id(self, &mut state.registry, &timing);
            self.send(
                ids::ROOT_STREAM,
                &Command::SendKey {
                    animation,
                    resource: ids::ROOT_STREAM,
                    action: KeyAction::Press,
                    code,
                    rawcode,
                },
            );
        }
        self.flush_or_deactivate();
    }

    /// Plays a built-in sound by name.
    ///
    /// # Errors
    ///
    /// [`ResourceError::UnknownSound`] for a name that is not built in.
    pub fn play_sound(&self, name: &str) -> Result<(), ResourceError> {
        Resource::named_sound(self, name)?.play();
        Ok(())
    }

    /// Flushes pending output, then blocks the calling producer thread.
    pub fn sleep(&self, interval: Duration) {
        self.flush_or_deactivate();
        thread::sleep(interval);
    }

    /// Hands the receiver over to another application.
    ///
    /// `url` is only sent for forward transitions.
    ///
    /// # Errors
    ///
    /// [`SessionError::MementoTooLarge`] if `memento` exceeds 10 KiB, or
    /// [`SessionError::NotActive`] if the session is not running.
    pub fn transition(
        &self,
        direction: TransitionDirection,
        params: &Dict,
        url: Option<&str>,
        memento: &[u8],
    ) -> Result<(), SessionError> {
        if memento.len() > MAX_MEMENTO_SIZE {
            return Err(SessionError::MementoTooLarge {
                size: memento.len(),
                max: MAX_MEMENTO_SIZE,
            });
        }
        if !self.is_active() {
            return Err(SessionError::NotActive);
        }
        let url = match direction {
            TransitionDirection::Forward => url.unwrap_or_default(),
            _ => "",
        };
        self.send(
            ids::ROOT_STREAM,
            &Command::Transition {
                url: url.to_string(),
                direction,
                params: params.clone(),
                memento: memento.to_vec(),
            },
        );
        Ok(())
    }

    // ── Receive loop ──────────────────────────────────────────────────────────

    /// Runs the session to completion on the calling thread.
    ///
    /// Performs the handshake, calls `startup`, dispatches events until the
    /// connection ends or the session is deactivated, then calls `cleanup`.
    pub fn run<A: Application + ?Sized>(&self, app: &mut A) -> SessionOutcome {
        let Some(reader) = lock(&self.shared.reader).take() else {
            warn!("session already started");
            return SessionOutcome::AlreadyStarted;
        };
        let mut reader = BufReader::new(reader);

        self.set_phase(SessionPhase::Handshaking);
        match self.handshake(&mut reader) {
            Ok(answer) => {
                debug!(version = ?answer.peer_version(), "handshake complete");
                self.lock_state().answer = Some(answer);
            }
            Err(e) => {
                warn!(error = %e, "handshake failed");
                self.terminate();
                return SessionOutcome::HandshakeFailed;
            }
        }

        self.set_active(true);
        self.set_phase(SessionPhase::Active);
        app.startup(self);
        self.root().set_visible(true, Timing::Immediate);
        while self.is_active() && self.next_event(&mut reader, app) {}

        self.set_phase(SessionPhase::Draining);
        self.set_active(false);
        app.cleanup(self);
        self.send(ids::ROOT_STREAM, &Command::SetActive { active: false });
        self.drain(&mut reader);
        self.terminate();
        SessionOutcome::Completed
    }

    fn handshake(&self, reader: &mut impl Read) -> Result<HandshakeAnswer, HandshakeError> {
        handshake::write_preamble(&mut *lock(&self.shared.writer))?;
        handshake::read_answer(reader)
    }

    /// One Active iteration. Returns `false` when the loop should end.
    fn next_event<A: Application + ?Sized>(&self, reader: &mut impl Read, app: &mut A) -> bool {
        if let Err(e) = self.flush() {
            debug!(error = %e, "flush failed");
            return false;
        }
        let body = match read_chunked(reader) {
            Ok(body) if !body.is_empty() => body,
            Ok(_) => {
                debug!("empty message; ending session");
                return false;
            }
            Err(e) => {
                debug!(error = %e, "read failed; ending session");
                return false;
            }
        };
        match decode_event(&body) {
            Ok(event) => self.dispatch(event, app),
            Err(e) => {
                warn!(error = %e, len = body.len(), "skipping undecodable event");
                true
            }
        }
    }

    fn dispatch<A: Application + ?Sized>(&self, event: Event, app: &mut A) -> bool {
        trace!(kind = ?event.kind(), resource = event.resource(), "dispatch event");
        match event {
            Event::Key { action, code, rawcode, .. } => {
                let focus = self.focus();
                match focus.as_deref().and_then(|t| t.key_handler()) {
                    Some(handler) => match action {
                        KeyAction::Press => handler.handle_key_press(self, code, rawcode),
                        KeyAction::Repeat => handler.handle_key_repeat(self, code, rawcode),
                        KeyAction::Release => handler.handle_key_release(self, code, rawcode),
                    },
                    None => match action {
                        KeyAction::Press => app.handle_key_press(self, code, rawcode),
                        KeyAction::Repeat => app.handle_key_repeat(self, code, rawcode),
                        KeyAction::Release => app.handle_key_release(self, code, rawcode),
                    },
                }
            }
            Event::DeviceInfo { info, .. } => app.handle_device_info(self, &info),
            Event::AppInfo { info, .. } => {
                if let Some(code) = info.get("error.code") {
                    let text = info.get("error.text").map_or("", String::as_str);
                    warn!(code = %code, text = %text, "receiver reported an error");
                    app.handle_error(self, code, text);
                } else if let Some(active) = info.get("active") {
                    if active == "true" {
                        app.handle_active(self);
                    } else {
                        debug!("receiver deactivated the application");
                        return false;
                    }
                } else {
                    app.handle_app_info(self, &info);
                }
            }
            Event::ResourceInfo { resource, status, info } => {
                app.handle_resource_info(self, resource, status, &info);
            }
            Event::Idle { idle, .. } => {
                let handled = app.handle_idle(self, idle);
                self.send(ids::ROOT_STREAM, &Command::AcknowledgeIdle { handled });
            }
            Event::FontInfo { resource, metrics } => {
                let metrics = Arc::new(metrics);
                let font = {
                    let mut state = self.lock_state();
                    let key = state.registry.font_key(resource);
                    if key.is_none() {
                        debug!(resource, "font info for a font this session did not cache");
                    }
                    state.registry.set_metrics(resource, Arc::clone(&metrics));
                    Resource::bound(self, ResourceKind::Font, resource, key)
                };
                app.handle_font_info(self, &font, &metrics);
            }
            Event::InitInfo { params, memento, .. } => app.handle_init_info(self, &params, &memento),
            Event::ResolutionInfo { current, available, .. } => {
                {
                    let mut state = self.lock_state();
                    state.resolution = current;
                    state.resolutions = available;
                }
                let requested = app.handle_resolution(self);
                self.set_resolution(requested);
            }
        }
        true
    }

    /// Discards whatever the receiver still sends until the stream ends.
    fn drain(&self, reader: &mut impl Read) {
        if let Err(e) = self.flush() {
            debug!(error = %e, "flush failed while draining");
            return;
        }
        let mut discarded = 0usize;
        while matches!(read_chunked(reader), Ok(body) if !body.is_empty()) {
            discarded += 1;
        }
        debug!(discarded, "drained remaining events");
    }

    fn terminate(&self) {
        let mut state = self.lock_state();
        // Focus targets may hold session handles.
        state.focus = None;
        state.phase = SessionPhase::Terminated;
        debug!(phase = ?SessionPhase::Terminated, "session phase");
    }
}
