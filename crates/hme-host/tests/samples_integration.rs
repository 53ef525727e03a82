//! Runs the sample applications against an in-memory receiver and checks
//! the commands they send.

use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex};

use hme_core::protocol::constants::font_style;
use hme_core::protocol::framing::{encode_chunked, read_chunked};
use hme_core::protocol::handshake::PREAMBLE_LEN;
use hme_core::protocol::messages::{decode_command, encode_event};
use hme_core::protocol::CommandId;
use hme_core::{ids, Command, Duplex, Event, InfoMap, Session, SessionOutcome};
use hme_host::application::samples;

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

/// Runs the named sample over `events` and returns the commands it sent.
fn run_sample(name: &str, events: &[Event]) -> Vec<(i64, Command)> {
    let mut input = ANSWER.to_vec();
    for event in events {
        input.extend(encode_chunked(&encode_event(event)));
    }
    let capture = Capture::default();
    let session =
        Session::new(Duplex::new(Cursor::new(input), capture.clone())).expect("session");
    let entry = samples::sample(name).expect("sample exists");
    let mut app = entry.instantiate();

    assert_eq!(session.run(app.as_mut()), SessionOutcome::Completed);

    let bytes = capture.0.lock().expect("capture").clone();
    let body = &bytes[PREAMBLE_LEN..];
    let mut cursor = Cursor::new(body);
    let mut commands = Vec::new();
    while (cursor.position() as usize) < body.len() {
        let chunk = read_chunked(&mut cursor).expect("framed command");
        commands.push(decode_command(&chunk).expect("command"));
    }
    commands
}

fn count(commands: &[(i64, Command)], id: CommandId) -> usize {
    commands.iter().filter(|(_, c)| c.id() == id).count()
}

#[test]
fn test_hello_shows_bold_text_on_root() {
    // Act
    let commands = run_sample("hello", &[]);

    // Assert
    assert!(commands.iter().any(|(_, c)| matches!(
        c,
        Command::AddFont { style, size, .. } if *style == font_style::BOLD && *size == 36.0
    )));
    assert!(commands.iter().any(|(_, c)| matches!(
        c,
        Command::AddText { text, .. } if text == "Hello, world!"
    )));
    assert!(commands
        .iter()
        .any(|(target, c)| *target == ids::ROOT_VIEW && c.id() == CommandId::ViewSetResource));
}

#[test]
fn test_clock_builds_two_time_views() {
    let commands = run_sample("clock", &[]);

    assert_eq!(count(&commands, CommandId::ViewAdd), 2);
    assert!(commands.iter().any(|(_, c)| matches!(
        c,
        Command::AddFont { size, .. } if *size == 96.0
    )));
    assert_eq!(
        commands.last(),
        Some(&(ids::ROOT_STREAM, Command::SetActive { active: false }))
    );
}

#[test]
fn test_animate_starts_every_sprite_after_device_info() {
    // Arrange
    let mut info = InfoMap::new();
    info.insert("version".to_string(), "20.4.1-01-2-746".to_string());
    let device = Event::DeviceInfo {
        resource: ids::ROOT_STREAM,
        info,
    };

    // Act
    let commands = run_sample("animate", &[device]);

    // Assert: a content view plus sixteen sprites, each with a pending key
    assert_eq!(count(&commands, CommandId::ViewAdd), 17);
    assert_eq!(count(&commands, CommandId::SendEvent), 16);
    assert!(commands
        .iter()
        .filter(|(_, c)| c.id() == CommandId::SendEvent)
        .all(|(target, _)| *target == ids::ROOT_STREAM));
}

#[test]
fn test_animate_refuses_known_bad_receiver_versions() {
    let mut info = InfoMap::new();
    info.insert("version".to_string(), "9.1-01-2-540".to_string());
    let device = Event::DeviceInfo {
        resource: ids::ROOT_STREAM,
        info,
    };

    let commands = run_sample("animate", &[device]);

    assert_eq!(count(&commands, CommandId::ViewAdd), 0);
    assert!(commands.iter().any(|(_, c)| matches!(
        c,
        Command::AddText { text, .. } if text.starts_with("Sorry")
    )));
}
