//! Numeric constants of the HME protocol.
//!
//! Command and event identifiers are exposed as `#[repr]` enums with
//! `TryFrom<i64>` so that decoders can reject unknown values; the open-ended
//! families (resource ids, key codes, layout flags) are plain constants grouped
//! in sub-modules.

// ── Handshake ─────────────────────────────────────────────────────────────────

/// The four ASCII bytes that open both sides of the handshake.
pub const MAGIC: &[u8; 4] = b"SBTV";

/// Protocol major version sent in the handshake preamble.
pub const MAJOR_VERSION: u8 = 0;

/// Protocol minor version sent in the handshake preamble.
pub const MINOR_VERSION: u8 = 49;

/// MIME type the hosting layer announces for an HME application stream.
pub const HME_MIME: &str = "application/x-hme";

/// Largest memento that may accompany an application transition.
pub const MAX_MEMENTO_SIZE: usize = 10 * 1024;

/// Returns the protocol version as the `"major.minor"` string used in discovery records.
pub fn version_string() -> String {
    format!("{MAJOR_VERSION}.{MINOR_VERSION}")
}

// ── Command identifiers ───────────────────────────────────────────────────────

/// Every command the host can send to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum CommandId {
    // View commands (1–9)
    ViewAdd = 1,
    ViewSetBounds = 2,
    ViewSetScale = 3,
    ViewSetTranslation = 4,
    ViewSetTransparency = 5,
    ViewSetVisible = 6,
    ViewSetPainting = 7,
    ViewSetResource = 8,
    ViewRemove = 9,
    // Resource creation (20–27)
    AddColor = 20,
    AddTtf = 21,
    AddFont = 22,
    AddText = 23,
    AddImage = 24,
    AddSound = 25,
    AddStream = 26,
    AddAnimation = 27,
    // Resource control (40–46)
    SetActive = 40,
    SetPosition = 41,
    SetSpeed = 42,
    SendEvent = 44,
    Close = 45,
    Remove = 46,
    // Receiver control (60–62)
    AcknowledgeIdle = 60,
    Transition = 61,
    SetResolution = 62,
}

impl TryFrom<i64> for CommandId {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CommandId::ViewAdd),
            2 => Ok(CommandId::ViewSetBounds),
            3 => Ok(CommandId::ViewSetScale),
            4 => Ok(CommandId::ViewSetTranslation),
            5 => Ok(CommandId::ViewSetTransparency),
            6 => Ok(CommandId::ViewSetVisible),
            7 => Ok(CommandId::ViewSetPainting),
            8 => Ok(CommandId::ViewSetResource),
            9 => Ok(CommandId::ViewRemove),
            20 => Ok(CommandId::AddColor),
            21 => Ok(CommandId::AddTtf),
            22 => Ok(CommandId::AddFont),
            23 => Ok(CommandId::AddText),
            24 => Ok(CommandId::AddImage),
            25 => Ok(CommandId::AddSound),
            26 => Ok(CommandId::AddStream),
            27 => Ok(CommandId::AddAnimation),
            40 => Ok(CommandId::SetActive),
            41 => Ok(CommandId::SetPosition),
            42 => Ok(CommandId::SetSpeed),
            44 => Ok(CommandId::SendEvent),
            45 => Ok(CommandId::Close),
            46 => Ok(CommandId::Remove),
            60 => Ok(CommandId::AcknowledgeIdle),
            61 => Ok(CommandId::Transition),
            62 => Ok(CommandId::SetResolution),
            other => Err(other),
        }
    }
}

// ── Event kinds ───────────────────────────────────────────────────────────────

/// Every event kind the receiver can push to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum EventKind {
    DeviceInfo = 1,
    AppInfo = 2,
    ResourceInfo = 3,
    Key = 4,
    Idle = 5,
    FontInfo = 6,
    InitInfo = 7,
    ResolutionInfo = 8,
}

impl TryFrom<i64> for EventKind {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EventKind::DeviceInfo),
            2 => Ok(EventKind::AppInfo),
            3 => Ok(EventKind::ResourceInfo),
            4 => Ok(EventKind::Key),
            5 => Ok(EventKind::Idle),
            6 => Ok(EventKind::FontInfo),
            7 => Ok(EventKind::InitInfo),
            8 => Ok(EventKind::ResolutionInfo),
            other => Err(other),
        }
    }
}

/// What happened to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum KeyAction {
    Press = 1,
    Repeat = 2,
    Release = 3,
}

impl TryFrom<i64> for KeyAction {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(KeyAction::Press),
            2 => Ok(KeyAction::Repeat),
            3 => Ok(KeyAction::Release),
            other => Err(other),
        }
    }
}

/// Direction of an application transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum TransitionDirection {
    Forward = 1,
    Back = 2,
    Teleport = 3,
}

// ── Well-known resource ids ───────────────────────────────────────────────────

/// Resource ids with a fixed meaning on every receiver.
///
/// Ids below [`ids::CLIENT`] are built in and are never removed by the host.
pub mod ids {
    pub const NULL: i64 = 0;
    /// The session itself; application-level commands target this id.
    pub const ROOT_STREAM: i64 = 1;
    pub const ROOT_VIEW: i64 = 2;
    pub const DEFAULT_TTF: i64 = 10;
    pub const SYSTEM_TTF: i64 = 11;

    pub const BONK_SOUND: i64 = 20;
    pub const UPDOWN_SOUND: i64 = 21;
    pub const THUMBSUP_SOUND: i64 = 22;
    pub const THUMBSDOWN_SOUND: i64 = 23;
    pub const SELECT_SOUND: i64 = 24;
    pub const TIVO_SOUND: i64 = 25;
    pub const LEFT_SOUND: i64 = 26;
    pub const RIGHT_SOUND: i64 = 27;
    pub const PAGEUP_SOUND: i64 = 28;
    pub const PAGEDOWN_SOUND: i64 = 29;
    pub const ALERT_SOUND: i64 = 30;
    pub const DESELECT_SOUND: i64 = 31;
    pub const ERROR_SOUND: i64 = 32;
    pub const SLOWDOWN1_SOUND: i64 = 33;
    pub const SPEEDUP1_SOUND: i64 = 34;
    pub const SPEEDUP2_SOUND: i64 = 35;
    pub const SPEEDUP3_SOUND: i64 = 36;
    pub const SPEEDUP4_SOUND: i64 = 37;

    /// First id the host may allocate for its own resources.
    pub const CLIENT: i64 = 2048;

    /// Value a released resource handle carries in place of its id.
    pub const RELEASED: i64 = -1;
}

/// Built-in sounds addressable by name.
pub const SOUNDS: &[(&str, i64)] = &[
    ("bonk", ids::BONK_SOUND),
    ("updown", ids::UPDOWN_SOUND),
    ("thumbsup", ids::THUMBSUP_SOUND),
    ("thumbsdown", ids::THUMBSDOWN_SOUND),
    ("select", ids::SELECT_SOUND),
    ("tivo", ids::TIVO_SOUND),
    ("left", ids::LEFT_SOUND),
    ("right", ids::RIGHT_SOUND),
    ("pageup", ids::PAGEUP_SOUND),
    ("pagedown", ids::PAGEDOWN_SOUND),
    ("alert", ids::ALERT_SOUND),
    ("deselect", ids::DESELECT_SOUND),
    ("error", ids::ERROR_SOUND),
    ("slowdown1", ids::SLOWDOWN1_SOUND),
    ("speedup1", ids::SPEEDUP1_SOUND),
    ("speedup2", ids::SPEEDUP2_SOUND),
    ("speedup3", ids::SPEEDUP3_SOUND),
    ("speedup4", ids::SPEEDUP4_SOUND),
];

/// Looks up a built-in sound id by its name.
pub fn sound_id(name: &str) -> Option<i64> {
    SOUNDS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, id)| *id)
}

// ── Key codes ─────────────────────────────────────────────────────────────────

/// Remote-control key codes carried in key events.
pub mod keys {
    pub const UNKNOWN: i64 = 0;
    pub const TIVO: i64 = 1;
    pub const UP: i64 = 2;
    pub const DOWN: i64 = 3;
    pub const LEFT: i64 = 4;
    pub const RIGHT: i64 = 5;
    pub const SELECT: i64 = 6;
    pub const PLAY: i64 = 7;
    pub const PAUSE: i64 = 8;
    pub const SLOW: i64 = 9;
    pub const REVERSE: i64 = 10;
    pub const FORWARD: i64 = 11;
    pub const REPLAY: i64 = 12;
    pub const ADVANCE: i64 = 13;
    pub const THUMBSUP: i64 = 14;
    pub const THUMBSDOWN: i64 = 15;
    pub const VOLUMEUP: i64 = 16;
    pub const VOLUMEDOWN: i64 = 17;
    pub const CHANNELUP: i64 = 18;
    pub const CHANNELDOWN: i64 = 19;
    pub const MUTE: i64 = 20;
    pub const RECORD: i64 = 21;
    pub const LIVETV: i64 = 23;
    pub const INFO: i64 = 25;
    pub const DISPLAY: i64 = INFO;
    pub const CLEAR: i64 = 28;
    pub const ENTER: i64 = 29;
    pub const NUM0: i64 = 40;
    pub const NUM1: i64 = 41;
    pub const NUM2: i64 = 42;
    pub const NUM3: i64 = 43;
    pub const NUM4: i64 = 44;
    pub const NUM5: i64 = 45;
    pub const NUM6: i64 = 46;
    pub const NUM7: i64 = 47;
    pub const NUM8: i64 = 48;
    pub const NUM9: i64 = 49;
    pub const OPT_WINDOW: i64 = 51;
    pub const OPT_ASPECT: i64 = OPT_WINDOW;
    pub const OPT_PIP: i64 = 52;
    pub const OPT_EXIT: i64 = 53;
    pub const OPT_LIST: i64 = 54;
    pub const OPT_GUIDE: i64 = 55;
    pub const OPT_STOP: i64 = 56;
    pub const OPT_MENU: i64 = 57;
    pub const OPT_TOP_MENU: i64 = 58;
    pub const OPT_ANGLE: i64 = 59;
    pub const OPT_DVD: i64 = 60;
    pub const OPT_A: i64 = 61;
    pub const OPT_B: i64 = 62;
    pub const OPT_C: i64 = 63;
    pub const OPT_D: i64 = 64;
    pub const OPT_TV_POWER: i64 = 65;
    pub const OPT_TV_INPUT: i64 = 66;
    pub const OPT_VOD: i64 = 67;
    pub const OPT_POWER: i64 = 68;
    pub const BACKSPACE: i64 = 69;
    pub const FLIP: i64 = 70;

    /// Characters produced by the QWERTY keyboard accessory, indexed from raw code 0x3c.
    const QWERTY_MAP: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ-=[]\\;',./` ";

    /// Translates the raw code of an [`UNKNOWN`] key event into its ASCII
    /// character, or `'?'` when the code falls outside the keyboard table.
    pub fn qwerty_map(rawcode: i64) -> char {
        let index = ((rawcode & 0xff00) >> 8) - 0x3c;
        usize::try_from(index)
            .ok()
            .and_then(|i| QWERTY_MAP.get(i))
            .map(|b| *b as char)
            .unwrap_or('?')
    }
}

// ── Font styles ───────────────────────────────────────────────────────────────

pub mod font_style {
    pub const PLAIN: i64 = 0;
    pub const BOLD: i64 = 1;
    pub const ITALIC: i64 = 2;
    pub const BOLD_ITALIC: i64 = 3;
}

/// Font flags requesting metrics events.
pub mod font_flags {
    pub const METRICS_BASIC: i64 = 1;
    pub const METRICS_GLYPH: i64 = 2;
}

// ── Resource layout flags ─────────────────────────────────────────────────────

/// Flags passed alongside a resource when it is attached to a view.
pub mod layout {
    pub const HALIGN_LEFT: i64 = 0x1;
    pub const HALIGN_CENTER: i64 = 0x2;
    pub const HALIGN_RIGHT: i64 = 0x4;
    pub const VALIGN_TOP: i64 = 0x10;
    pub const VALIGN_CENTER: i64 = 0x20;
    pub const VALIGN_BOTTOM: i64 = 0x40;
    pub const TEXT_WRAP: i64 = 0x100;
    pub const IMAGE_HFIT: i64 = 0x1000;
    pub const IMAGE_VFIT: i64 = 0x2000;
    pub const IMAGE_BESTFIT: i64 = 0x4000;
}

// ── Resource status codes ─────────────────────────────────────────────────────

/// Status codes reported by resource info events.
pub mod status {
    pub const UNKNOWN: i64 = 0;
    pub const CONNECTING: i64 = 1;
    pub const CONNECTED: i64 = 2;
    pub const LOADING: i64 = 3;
    pub const READY: i64 = 4;
    pub const PLAYING: i64 = 5;
    pub const PAUSED: i64 = 6;
    pub const SEEKING: i64 = 7;
    pub const CLOSED: i64 = 8;
    pub const COMPLETE: i64 = 9;
    pub const ERROR: i64 = 10;
}

// ── Screen safe areas ─────────────────────────────────────────────────────────

/// Insets that keep content inside the visible area of a television.
pub mod safe_area {
    pub const ACTION_H: i64 = 32;
    pub const ACTION_V: i64 = 24;
    pub const TITLE_H: i64 = 64;
    pub const TITLE_V: i64 = 48;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_id_try_from_round_trips_every_variant() {
        for id in [1, 2, 3, 4, 5, 6, 7, 8, 9, 20, 21, 22, 23, 24, 25, 26, 27, 40, 41, 42, 44, 45, 46, 60, 61, 62] {
            let cmd = CommandId::try_from(id).expect("known command id");
            assert_eq!(cmd as i64, id);
        }
    }

    #[test]
    fn test_command_id_rejects_gap_values() {
        assert_eq!(CommandId::try_from(43), Err(43));
        assert!(CommandId::try_from(0).is_err());
        assert!(CommandId::try_from(63).is_err());
    }

    #[test]
    fn test_event_kind_rejects_unknown_value() {
        assert_eq!(EventKind::try_from(4), Ok(EventKind::Key));
        assert_eq!(EventKind::try_from(9), Err(9));
        assert_eq!(KeyAction::try_from(0), Err(0));
    }

    #[test]
    fn test_sound_id_resolves_known_names() {
        assert_eq!(sound_id("bonk"), Some(ids::BONK_SOUND));
        assert_eq!(sound_id("speedup4"), Some(ids::SPEEDUP4_SOUND));
        assert_eq!(sound_id("kazoo"), None);
    }

    #[test]
    fn test_qwerty_map_translates_raw_codes() {
        assert_eq!(keys::qwerty_map(0x3c00), 'A');
        assert_eq!(keys::qwerty_map(0x5500), 'Z');
        assert_eq!(keys::qwerty_map(0x6100), ' ');
    }

    #[test]
    fn test_qwerty_map_out_of_range_yields_question_mark() {
        assert_eq!(keys::qwerty_map(0x0100), '?');
        assert_eq!(keys::qwerty_map(0xff00), '?');
    }

    #[test]
    fn test_version_string_matches_constants() {
        assert_eq!(version_string(), "0.49");
    }
}
