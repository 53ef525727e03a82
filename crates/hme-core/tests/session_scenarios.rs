//! End-to-end session scenarios against an in-memory receiver.
//!
//! Each test scripts what the receiver sends, runs a session to completion
//! and then inspects the hooks that fired and the commands that were written.

use std::io::{self, Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hme_core::protocol::framing::{encode_chunked, read_chunked};
use hme_core::protocol::handshake::{preamble, PREAMBLE_LEN};
use hme_core::protocol::messages::{decode_command, encode_event};
use hme_core::{
    ids, Application, Command, Duplex, Event, Resolution, Resource, Session, SessionOutcome,
    SessionPhase, Timing, View, ViewOptions,
};

const ANSWER: &[u8] = b"SBTV\0\0\0\x31";

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn bytes(&self) -> Vec<u8> {
        self.0.lock().expect("capture lock").clone()
    }

    /// Commands written after the preamble.
    fn commands(&self) -> Vec<(i64, Command)> {
        let bytes = self.bytes();
        assert_eq!(&bytes[..PREAMBLE_LEN], &preamble(), "preamble written first");
        let mut cursor = Cursor::new(&bytes[PREAMBLE_LEN..]);
        let mut out = Vec::new();
        while (cursor.position() as usize) < bytes.len() - PREAMBLE_LEN {
            let body = read_chunked(&mut cursor).expect("framed command");
            out.push(decode_command(&body).expect("known command"));
        }
        out
    }
}

fn session_with_input(input: Vec<u8>) -> (Session, Capture) {
    let capture = Capture::default();
    let session = Session::new(Duplex::new(Cursor::new(input), capture.clone())).expect("session");
    (session, capture)
}

#[derive(Default)]
struct Counting {
    hooks: usize,
    presses: Vec<(i64, i64)>,
}

impl Application for Counting {
    fn startup(&mut self, _session: &Session) {
        self.hooks += 1;
    }
    fn cleanup(&mut self, _session: &Session) {
        self.hooks += 1;
    }
    fn handle_key_press(&mut self, _session: &Session, code: i64, rawcode: i64) {
        self.hooks += 1;
        self.presses.push((code, rawcode));
    }
}

#[test]
fn test_handshake_failure_invokes_no_handlers() {
    // Arrange
    let (session, capture) = session_with_input(b"XXXX0000".to_vec());
    let mut app = Counting::default();

    // Act
    let outcome = session.run(&mut app);

    // Assert
    assert_eq!(outcome, SessionOutcome::HandshakeFailed);
    assert_eq!(app.hooks, 0);
    assert_eq!(session.phase(), SessionPhase::Terminated);
    assert_eq!(capture.bytes(), preamble().to_vec());
}

#[test]
fn test_key_press_split_over_two_chunks_is_dispatched() {
    // Arrange: key event (kind 4, resource 1, press, key 5, raw 0) plus five
    // trailing bytes a newer receiver might append, sent as two chunks.
    let mut body = encode_event(&Event::Key {
        resource: ids::ROOT_STREAM,
        action: hme_core::KeyAction::Press,
        code: 5,
        rawcode: 0,
    });
    body.extend_from_slice(&[0x80; 5]);
    let (first, second) = body.split_at(4);
    let mut frame = Vec::new();
    for part in [first, second] {
        frame.extend_from_slice(&(part.len() as u16).to_be_bytes());
        frame.extend_from_slice(part);
    }
    frame.extend_from_slice(&[0, 0]);
    assert_eq!(frame.len(), 16);

    let mut input = ANSWER.to_vec();
    input.extend(frame);
    let (session, _capture) = session_with_input(input);
    let mut app = Counting::default();

    // Act
    let outcome = session.run(&mut app);

    // Assert
    assert_eq!(outcome, SessionOutcome::Completed);
    assert_eq!(app.presses, vec![(5, 0)]);
}

struct PickHighest;

impl Application for PickHighest {
    fn handle_resolution(&mut self, session: &Session) -> Resolution {
        session
            .resolutions()
            .into_iter()
            .max_by_key(|r| r.width * r.height)
            .unwrap_or_else(|| session.current_resolution())
    }
}

#[test]
fn test_resolution_negotiation_resizes_root() {
    // Arrange
    let event = encode_event(&Event::ResolutionInfo {
        resource: ids::ROOT_STREAM,
        current: Resolution::new(640, 480),
        available: vec![Resolution::new(1280, 720)],
    });
    let mut input = ANSWER.to_vec();
    input.extend(encode_chunked(&event));
    let (session, capture) = session_with_input(input);

    // Act
    session.run(&mut PickHighest);

    // Assert
    let sent = capture.commands();
    let set_resolution: Vec<_> = sent
        .iter()
        .filter(|(_, c)| matches!(c, Command::SetResolution(_)))
        .collect();
    assert_eq!(
        set_resolution,
        vec![&(ids::ROOT_STREAM, Command::SetResolution(Resolution::new(1280, 720)))]
    );
    let root = session.root();
    assert_eq!((root.width(), root.height()), (1280, 720));
    assert_eq!(session.current_resolution(), Resolution::new(1280, 720));
}

/// Builds a small scene in startup and checks the command order.
struct Scene;

impl Application for Scene {
    fn startup(&mut self, session: &Session) {
        let panel = View::create(session, None, ViewOptions::new().bounds(10, 10, 200, 100));
        panel.set_color(Some(0xff20_4080));
        panel.set_color(Some(0xff20_4080));
        let label = panel.child(ViewOptions::new().text("Hi"));
        label.set_transparency(0.5, Timing::Immediate);
        label.set_transparency(0.5, Timing::Immediate);
        let _ = Resource::color(session, Some(0xff20_4080));
    }
}

#[test]
fn test_scene_built_in_startup_is_deduplicated() {
    // Arrange
    let (session, capture) = session_with_input(ANSWER.to_vec());

    // Act
    session.run(&mut Scene);

    // Assert
    let kinds: Vec<_> = capture.commands().into_iter().map(|(_, c)| c.id()).collect();
    use hme_core::protocol::CommandId::*;
    assert_eq!(
        kinds,
        vec![
            ViewAdd,
            AddColor,
            ViewSetResource,
            ViewAdd,
            AddFont,
            AddText,
            ViewSetResource,
            ViewSetTransparency,
            ViewSetVisible,
            SetActive,
        ]
    );
}

// ── Connection loss and draining ─────────────────────────────────────────────

fn framed_key(code: i64) -> Vec<u8> {
    encode_chunked(&encode_event(&Event::Key {
        resource: ids::ROOT_STREAM,
        action: hme_core::KeyAction::Press,
        code,
        rawcode: 0,
    }))
}

/// Accepts every write; every flush after the handshake fails.
#[derive(Clone, Default)]
struct BrokenAfterHandshake {
    flushes: Arc<AtomicUsize>,
}

impl Write for BrokenAfterHandshake {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.flushes.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "receiver went away"))
        }
    }
}

/// Counts the bytes the session has read.
struct Tracked {
    inner: Cursor<Vec<u8>>,
    consumed: Arc<AtomicUsize>,
}

impl Read for Tracked {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }
}

/// Deactivates the session on the first key press.
#[derive(Default)]
struct QuitOnKey {
    presses: usize,
    cleanups: usize,
}

impl Application for QuitOnKey {
    fn handle_key_press(&mut self, session: &Session, _code: i64, _rawcode: i64) {
        self.presses += 1;
        session.set_active(false);
    }
    fn cleanup(&mut self, _session: &Session) {
        self.cleanups += 1;
    }
}

#[test]
fn test_flush_failure_deactivates_and_still_cleans_up_once() {
    // Arrange: the receiver has key events queued, but output is broken
    let mut input = ANSWER.to_vec();
    input.extend(framed_key(5));
    input.extend(framed_key(6));
    let writer = BrokenAfterHandshake::default();
    let session = Session::new(Duplex::new(Cursor::new(input), writer.clone())).expect("session");
    let mut app = Counting::default();

    // Act
    let outcome = session.run(&mut app);

    // Assert: startup and cleanup only, no event was dispatched
    assert_eq!(outcome, SessionOutcome::Completed);
    assert_eq!(app.hooks, 2);
    assert!(app.presses.is_empty());
    assert!(!session.is_active());
    assert_eq!(session.phase(), SessionPhase::Terminated);
    assert!(writer.flushes.load(Ordering::SeqCst) >= 2);
}

#[test]
fn test_draining_discards_events_queued_after_deactivation() {
    // Arrange
    let mut input = ANSWER.to_vec();
    for code in [5, 6, 7] {
        input.extend(framed_key(code));
    }
    let total = input.len();
    let consumed = Arc::new(AtomicUsize::new(0));
    let reader = Tracked {
        inner: Cursor::new(input),
        consumed: Arc::clone(&consumed),
    };
    let capture = Capture::default();
    let session = Session::new(Duplex::new(reader, capture.clone())).expect("session");
    let mut app = QuitOnKey::default();

    // Act
    let outcome = session.run(&mut app);

    // Assert: one press handled, the rest read and thrown away
    assert_eq!(outcome, SessionOutcome::Completed);
    assert_eq!(app.presses, 1);
    assert_eq!(app.cleanups, 1);
    assert_eq!(consumed.load(Ordering::SeqCst), total);
    assert_eq!(
        capture.commands().last(),
        Some(&(ids::ROOT_STREAM, Command::SetActive { active: false }))
    );
    assert_eq!(session.phase(), SessionPhase::Terminated);
}

#[test]
fn test_truncated_chunk_ends_the_session() {
    // Arrange: a complete key event, then a chunk cut short mid-payload
    let mut input = ANSWER.to_vec();
    input.extend(framed_key(5));
    input.extend_from_slice(&[0x00, 0x0a, 0x84, 0x81, 0x81]);
    let (session, capture) = session_with_input(input);
    let mut app = Counting::default();

    // Act
    let outcome = session.run(&mut app);

    // Assert
    assert_eq!(outcome, SessionOutcome::Completed);
    assert_eq!(app.presses, vec![(5, 0)]);
    assert_eq!(app.hooks, 3);
    assert_eq!(
        capture.commands().last(),
        Some(&(ids::ROOT_STREAM, Command::SetActive { active: false }))
    );
}
