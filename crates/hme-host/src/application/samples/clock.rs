//! Animation from a separate producer thread.
//!
//! Two views take turns: every second the current time fades out of one and
//! into the other.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use hme_core::protocol::constants::layout;
use hme_core::{keys, Application, FontSpec, Resource, Session, TextStyle, Timing, View, ViewOptions};
use tracing::{debug, warn};

const FADE: Duration = Duration::from_millis(750);

#[derive(Debug, Default)]
pub struct Clock {
    ticker: Option<JoinHandle<()>>,
}

impl Application for Clock {
    fn startup(&mut self, session: &Session) {
        let root = session.root();
        root.set_color(None);
        let views = [0, 1].map(|_| {
            View::create(session, None, ViewOptions::new().bounds(0, 100, root.width(), 280))
        });

        Resource::font(session, FontSpec::sized(96.0).bold());
        Resource::color(session, Some(0));

        let ticker_session = session.clone();
        match thread::Builder::new()
            .name("hme-clock".to_string())
            .spawn(move || tick(&ticker_session, &views))
        {
            Ok(handle) => self.ticker = Some(handle),
            Err(e) => warn!(error = %e, "failed to start clock thread"),
        }
    }

    fn handle_key_press(&mut self, session: &Session, code: i64, _rawcode: i64) {
        if matches!(code, keys::LEFT | keys::CLEAR | keys::PAUSE) {
            if let Err(e) = session.play_sound("left") {
                debug!(error = %e, "sound unavailable");
            }
            session.set_active(false);
        }
    }

    fn cleanup(&mut self, _session: &Session) {
        if let Some(handle) = self.ticker.take() {
            if handle.join().is_err() {
                warn!("clock thread panicked");
            }
        }
    }
}

fn tick(session: &Session, views: &[View; 2]) {
    let fade = Resource::animation(session, FADE, 0.0);
    let flags = layout::HALIGN_CENTER | layout::VALIGN_CENTER;
    let mut deadline = Instant::now();
    let mut current = 0;

    while session.is_active() {
        views[current].set_transparency(1.0, Timing::With(fade.clone()));

        current = (current + 1) % views.len();
        let view = &views[current];
        // The outgoing text faded out a second ago; release it before replacing.
        view.remove_resource();
        view.set_text(&clock_text(SystemTime::now()), &TextStyle::default(), flags);
        view.set_transparency(0.0, Timing::With(fade.clone()));

        deadline += Duration::from_secs(1);
        session.sleep(deadline.saturating_duration_since(Instant::now()));
    }
    debug!("clock thread stopping");
}

/// `HH:MM:SS` in UTC.
fn clock_text(now: SystemTime) -> String {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        % 86_400;
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}
