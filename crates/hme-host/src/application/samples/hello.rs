use hme_core::protocol::constants::layout;
use hme_core::{Application, FontSpec, Resource, Session, TextStyle};

pub const TITLE: &str = "Hello World";

/// Shows one line of bold text in the middle of the screen.
#[derive(Debug, Default)]
pub struct Hello;

impl Application for Hello {
    fn startup(&mut self, session: &Session) {
        // Becomes the session's current font, so the text below picks it up.
        Resource::font(session, FontSpec::sized(36.0).bold());
        session.root().set_text(
            "Hello, world!",
            &TextStyle::default(),
            layout::HALIGN_CENTER | layout::VALIGN_CENTER,
        );
    }
}
