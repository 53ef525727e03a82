//! Sprites moving with animated bounds.
//!
//! Each sprite asks the receiver to send a key event back once its movement
//! finishes; that event starts the next movement.

use std::time::Duration;

use hme_core::protocol::constants::safe_area;
use hme_core::{keys, Application, InfoMap, Session, TextStyle, Timing, View, ViewOptions};
use tracing::debug;

use super::{random_below, random_range};

const SPRITE_COUNT: usize = 16;

#[derive(Debug, Default)]
pub struct Animate {
    sprites: Vec<View>,
}

impl Application for Animate {
    fn handle_device_info(&mut self, session: &Session, info: &InfoMap) {
        if !self.sprites.is_empty() {
            return;
        }
        let version = info.get("version").map_or("", String::as_str);
        if !is_compatible(version) {
            session.root().set_text(
                "Sorry, this program is not compatible\nwith this software version.",
                &TextStyle::default(),
                0,
            );
            session.sleep(Duration::from_secs(5));
            session.set_active(false);
            return;
        }

        let root = session.root();
        let content = View::create(
            session,
            None,
            ViewOptions::new().bounds(
                safe_area::ACTION_H / 2,
                safe_area::ACTION_V / 2,
                root.width() - safe_area::ACTION_H,
                root.height() - safe_area::ACTION_V,
            ),
        );
        self.sprites = (0..SPRITE_COUNT)
            .map(|_| {
                content.child(
                    ViewOptions::new()
                        .bounds(
                            random_below(content.width()),
                            random_below(content.height()),
                            random_range(8, 72),
                            random_range(8, 72),
                        )
                        .color(random_below(0xff_ffff) as u32),
                )
            })
            .collect();
        for (index, sprite) in self.sprites.iter().enumerate() {
            move_sprite(session, sprite, index);
        }
    }

    fn handle_key_press(&mut self, session: &Session, code: i64, rawcode: i64) {
        match code {
            keys::TIVO => {
                let sprite = usize::try_from(rawcode)
                    .ok()
                    .and_then(|i| self.sprites.get(i).map(|s| (i, s)));
                if let Some((index, sprite)) = sprite {
                    move_sprite(session, sprite, index);
                }
            }
            keys::LEFT | keys::CLEAR | keys::PAUSE => {
                if let Err(e) = session.play_sound("left") {
                    debug!(error = %e, "sound unavailable");
                }
                session.set_active(false);
            }
            _ => {}
        }
    }

    /// Keep animating through the screensaver.
    fn handle_idle(&mut self, _session: &Session, _idle: bool) -> bool {
        true
    }
}

/// Starts one movement and schedules the key event that triggers the next.
fn move_sprite(session: &Session, sprite: &View, index: usize) {
    // 50 ms steps keep the number of distinct animation resources small.
    let duration = Duration::from_millis(random_range(5, 105) as u64 * 50);
    let (width, height) = sprite
        .parent()
        .map_or((0, 0), |parent| (parent.width(), parent.height()));

    sprite.set_position(random_below(width), random_below(height), Timing::Over(duration));
    session.send_key(keys::TIVO, index as i64, Timing::Over(duration));
}

/// Some 9.1 and 9.3 receiver builds mishandle animated bounds.
fn is_compatible(version: &str) -> bool {
    let broken_release = version.starts_with("9.1") || version.starts_with("9.3");
    let patched = version.ends_with("648") || version.ends_with("652");
    !broken_release || patched
}
