//! Typed HME commands and events.
//!
//! A command body is `[vint command][vint target]` followed by the fields of
//! the command's schema. An event body is `[vint kind][vint resource]`
//! followed by kind-specific fields; receivers may append fields this host
//! does not know about, so event decoding ignores trailing bytes.

use std::collections::BTreeMap;

use crate::protocol::codec::{pack_into, write_vint, Dict, ProtocolError, Reader, Value};
use crate::protocol::constants::{CommandId, EventKind, KeyAction, TransitionDirection};

// ── Shared payload types ──────────────────────────────────────────────────────

/// A display mode the receiver can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: i64,
    pub height: i64,
    pub pixel_aspect_numerator: i64,
    pub pixel_aspect_denominator: i64,
}

impl Resolution {
    pub const fn new(width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            pixel_aspect_numerator: 1,
            pixel_aspect_denominator: 1,
        }
    }
}

impl Default for Resolution {
    /// Standard-definition 640x480, assumed until the receiver reports otherwise.
    fn default() -> Self {
        Self::new(640, 480)
    }
}

/// Per-glyph measurements from a font info event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    pub advance: f32,
    pub bounding: f32,
}

/// Font measurements reported by the receiver.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FontMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub height: f32,
    pub line_gap: f32,
    /// Glyph measurements keyed by Unicode scalar value.
    pub glyphs: BTreeMap<u32, GlyphMetrics>,
}

impl FontMetrics {
    pub fn glyph(&self, ch: char) -> Option<&GlyphMetrics> {
        self.glyphs.get(&u32::from(ch))
    }

    /// Sum of advances for the characters of `text`; unknown glyphs count as zero.
    pub fn text_width(&self, text: &str) -> f32 {
        text.chars()
            .filter_map(|c| self.glyph(c))
            .map(|g| g.advance)
            .sum()
    }
}

/// String pairs carried by device, application and resource info events.
pub type InfoMap = BTreeMap<String, String>;

// ── Commands ──────────────────────────────────────────────────────────────────

/// A command sent from the host to the receiver. The target id travels
/// alongside, see [`encode_command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ViewAdd { parent: i64, x: i64, y: i64, width: i64, height: i64, visible: bool },
    ViewSetBounds { x: i64, y: i64, width: i64, height: i64, animation: i64 },
    ViewSetScale { x: f32, y: f32, animation: i64 },
    ViewSetTranslation { x: i64, y: i64, animation: i64 },
    ViewSetTransparency { transparency: f32, animation: i64 },
    ViewSetVisible { visible: bool, animation: i64 },
    ViewSetPainting { painting: bool },
    ViewSetResource { resource: i64, flags: i64 },
    ViewRemove { animation: i64 },
    AddColor { argb: u32 },
    AddTtf { data: Vec<u8> },
    AddFont { ttf: i64, style: i64, size: f32, flags: i64 },
    AddText { font: i64, color: i64, text: String },
    AddImage { data: Vec<u8> },
    AddSound { data: Vec<u8> },
    AddStream { url: String, mime: String, play: bool, params: Dict },
    AddAnimation { duration_ms: i64, ease: f32 },
    SetActive { active: bool },
    SetPosition { position: i64 },
    SetSpeed { speed: f32 },
    /// Injects a synthetic key event into the receiver's event queue.
    SendKey { animation: i64, resource: i64, action: KeyAction, code: i64, rawcode: i64 },
    Close,
    Remove,
    AcknowledgeIdle { handled: bool },
    Transition { url: String, direction: TransitionDirection, params: Dict, memento: Vec<u8> },
    SetResolution(Resolution),
}

/// Field schema of each command, excluding the leading command and target ids.
pub fn command_schema(id: CommandId) -> &'static str {
    match id {
        CommandId::ViewAdd => "iiiiib",
        CommandId::ViewSetBounds => "iiiii",
        CommandId::ViewSetScale => "ffi",
        CommandId::ViewSetTranslation => "iii",
        CommandId::ViewSetTransparency => "fi",
        CommandId::ViewSetVisible => "bi",
        CommandId::ViewSetPainting => "b",
        CommandId::ViewSetResource => "ii",
        CommandId::ViewRemove => "i",
        CommandId::AddColor | CommandId::AddTtf | CommandId::AddImage | CommandId::AddSound => "r",
        CommandId::AddFont => "iifi",
        CommandId::AddText => "iis",
        CommandId::AddStream => "ssbd",
        CommandId::AddAnimation => "if",
        CommandId::SetActive => "b",
        CommandId::SetPosition => "i",
        CommandId::SetSpeed => "f",
        CommandId::SendEvent => "iiiiii",
        CommandId::Close | CommandId::Remove => "",
        CommandId::AcknowledgeIdle => "b",
        CommandId::Transition => "sidv",
        CommandId::SetResolution => "iiii",
    }
}

impl Command {
    pub fn id(&self) -> CommandId {
        match self {
            Command::ViewAdd { .. } => CommandId::ViewAdd,
            Command::ViewSetBounds { .. } => CommandId::ViewSetBounds,
            Command::ViewSetScale { .. } => CommandId::ViewSetScale,
            Command::ViewSetTranslation { .. } => CommandId::ViewSetTranslation,
            Command::ViewSetTransparency { .. } => CommandId::ViewSetTransparency,
            Command::ViewSetVisible { .. } => CommandId::ViewSetVisible,
            Command::ViewSetPainting { .. } => CommandId::ViewSetPainting,
            Command::ViewSetResource { .. } => CommandId::ViewSetResource,
            Command::ViewRemove { .. } => CommandId::ViewRemove,
            Command::AddColor { .. } => CommandId::AddColor,
            Command::AddTtf { .. } => CommandId::AddTtf,
            Command::AddFont { .. } => CommandId::AddFont,
            Command::AddText { .. } => CommandId::AddText,
            Command::AddImage { .. } => CommandId::AddImage,
            Command::AddSound { .. } => CommandId::AddSound,
            Command::AddStream { .. } => CommandId::AddStream,
            Command::AddAnimation { .. } => CommandId::AddAnimation,
            Command::SetActive { .. } => CommandId::SetActive,
            Command::SetPosition { .. } => CommandId::SetPosition,
            Command::SetSpeed { .. } => CommandId::SetSpeed,
            Command::SendKey { .. } => CommandId::SendEvent,
            Command::Close => CommandId::Close,
            Command::Remove => CommandId::Remove,
            Command::AcknowledgeIdle { .. } => CommandId::AcknowledgeIdle,
            Command::Transition { .. } => CommandId::Transition,
            Command::SetResolution(_) => CommandId::SetResolution,
        }
    }

    /// The command's fields in schema order.
    fn values(&self) -> Vec<Value> {
        use Value::{Bool, Data, Float, Int, Raw, Str};
        match self {
            Command::ViewAdd { parent, x, y, width, height, visible } => vec![
                Int(*parent),
                Int(*x),
                Int(*y),
                Int(*width),
                Int(*height),
                Bool(*visible),
            ],
            Command::ViewSetBounds { x, y, width, height, animation } => {
                vec![Int(*x), Int(*y), Int(*width), Int(*height), Int(*animation)]
            }
            Command::ViewSetScale { x, y, animation } => vec![Float(*x), Float(*y), Int(*animation)],
            Command::ViewSetTranslation { x, y, animation } => vec![Int(*x), Int(*y), Int(*animation)],
            Command::ViewSetTransparency { transparency, animation } => {
                vec![Float(*transparency), Int(*animation)]
            }
            Command::ViewSetVisible { visible, animation } => vec![Bool(*visible), Int(*animation)],
            Command::ViewSetPainting { painting } => vec![Bool(*painting)],
            Command::ViewSetResource { resource, flags } => vec![Int(*resource), Int(*flags)],
            Command::ViewRemove { animation } => vec![Int(*animation)],
            Command::AddColor { argb } => vec![Raw(argb.to_be_bytes().to_vec())],
            Command::AddTtf { data } | Command::AddImage { data } | Command::AddSound { data } => {
                vec![Raw(data.clone())]
            }
            Command::AddFont { ttf, style, size, flags } => {
                vec![Int(*ttf), Int(*style), Float(*size), Int(*flags)]
            }
            Command::AddText { font, color, text } => vec![Int(*font), Int(*color), Str(text.clone())],
            Command::AddStream { url, mime, play, params } => vec![
                Str(url.clone()),
                Str(mime.clone()),
                Bool(*play),
                Value::Dict(params.clone()),
            ],
            Command::AddAnimation { duration_ms, ease } => vec![Int(*duration_ms), Float(*ease)],
            Command::SetActive { active } => vec![Bool(*active)],
            Command::SetPosition { position } => vec![Int(*position)],
            Command::SetSpeed { speed } => vec![Float(*speed)],
            Command::SendKey { animation, resource, action, code, rawcode } => vec![
                Int(*animation),
                Int(EventKind::Key as i64),
                Int(*resource),
                Int(*action as i64),
                Int(*code),
                Int(*rawcode),
            ],
            Command::Close | Command::Remove => Vec::new(),
            Command::AcknowledgeIdle { handled } => vec![Bool(*handled)],
            Command::Transition { url, direction, params, memento } => vec![
                Str(url.clone()),
                Int(*direction as i64),
                Value::Dict(params.clone()),
                Data(memento.clone()),
            ],
            Command::SetResolution(r) => vec![
                Int(r.width),
                Int(r.height),
                Int(r.pixel_aspect_numerator),
                Int(r.pixel_aspect_denominator),
            ],
        }
    }
}

/// Encodes `command` addressed to resource or view `target`.
///
/// # Errors
///
/// Returns [`ProtocolError::SchemaMismatch`] only if a command's values
/// disagree with its schema table, which indicates a bug in this module.
pub fn encode_command(target: i64, command: &Command) -> Result<Vec<u8>, ProtocolError> {
    let id = command.id();
    let mut buf = Vec::new();
    write_vint(&mut buf, id as i64);
    write_vint(&mut buf, target);
    pack_into(&mut buf, command_schema(id), &command.values())?;
    Ok(buf)
}

/// Decodes a command body into its target id and command.
///
/// Used by tests and tooling that play the receiver role.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownCommand`] for an unrecognized command id, or
/// a decoding error if the fields do not match the command's schema.
pub fn decode_command(bytes: &[u8]) -> Result<(i64, Command), ProtocolError> {
    let mut reader = Reader::new(bytes);
    let raw_id = reader.read_vint()?;
    let target = reader.read_vint()?;
    let id = CommandId::try_from(raw_id).map_err(|_| ProtocolError::UnknownCommand(raw_id))?;
    let mut f = Fields::new(reader.unpack(command_schema(id))?);
    let command = match id {
        CommandId::ViewAdd => Command::ViewAdd {
            parent: f.int()?,
            x: f.int()?,
            y: f.int()?,
            width: f.int()?,
            height: f.int()?,
            visible: f.boolean()?,
        },
        CommandId::ViewSetBounds => Command::ViewSetBounds {
            x: f.int()?,
            y: f.int()?,
            width: f.int()?,
            height: f.int()?,
            animation: f.int()?,
        },
        CommandId::ViewSetScale => Command::ViewSetScale {
            x: f.float()?,
            y: f.float()?,
            animation: f.int()?,
        },
        CommandId::ViewSetTranslation => Command::ViewSetTranslation {
            x: f.int()?,
            y: f.int()?,
            animation: f.int()?,
        },
        CommandId::ViewSetTransparency => Command::ViewSetTransparency {
            transparency: f.float()?,
            animation: f.int()?,
        },
        CommandId::ViewSetVisible => Command::ViewSetVisible {
            visible: f.boolean()?,
            animation: f.int()?,
        },
        CommandId::ViewSetPainting => Command::ViewSetPainting { painting: f.boolean()? },
        CommandId::ViewSetResource => Command::ViewSetResource {
            resource: f.int()?,
            flags: f.int()?,
        },
        CommandId::ViewRemove => Command::ViewRemove { animation: f.int()? },
        CommandId::AddColor => {
            let raw = f.raw()?;
            let bytes: [u8; 4] = raw.as_slice().try_into().map_err(|_| {
                ProtocolError::MalformedPayload(format!("color needs 4 bytes, got {}", raw.len()))
            })?;
            Command::AddColor { argb: u32::from_be_bytes(bytes) }
        }
        CommandId::AddTtf => Command::AddTtf { data: f.raw()? },
        CommandId::AddImage => Command::AddImage { data: f.raw()? },
        CommandId::AddSound => Command::AddSound { data: f.raw()? },
        CommandId::AddFont => Command::AddFont {
            ttf: f.int()?,
            style: f.int()?,
            size: f.float()?,
            flags: f.int()?,
        },
        CommandId::AddText => Command::AddText {
            font: f.int()?,
            color: f.int()?,
            text: f.string()?,
        },
        CommandId::AddStream => Command::AddStream {
            url: f.string()?,
            mime: f.string()?,
            play: f.boolean()?,
            params: f.dict()?,
        },
        CommandId::AddAnimation => Command::AddAnimation {
            duration_ms: f.int()?,
            ease: f.float()?,
        },
        CommandId::SetActive => Command::SetActive { active: f.boolean()? },
        CommandId::SetPosition => Command::SetPosition { position: f.int()? },
        CommandId::SetSpeed => Command::SetSpeed { speed: f.float()? },
        CommandId::SendEvent => {
            let animation = f.int()?;
            let kind = f.int()?;
            if kind != EventKind::Key as i64 {
                return Err(ProtocolError::MalformedPayload(format!(
                    "only key events can be sent, got event kind {kind}"
                )));
            }
            let resource = f.int()?;
            let raw_action = f.int()?;
            let action = KeyAction::try_from(raw_action)
                .map_err(|_| ProtocolError::UnknownKeyAction(raw_action))?;
            Command::SendKey {
                animation,
                resource,
                action,
                code: f.int()?,
                rawcode: f.int()?,
            }
        }
        CommandId::Close => Command::Close,
        CommandId::Remove => Command::Remove,
        CommandId::AcknowledgeIdle => Command::AcknowledgeIdle { handled: f.boolean()? },
        CommandId::Transition => {
            let url = f.string()?;
            let raw_direction = f.int()?;
            let direction = match raw_direction {
                1 => TransitionDirection::Forward,
                2 => TransitionDirection::Back,
                3 => TransitionDirection::Teleport,
                other => {
                    return Err(ProtocolError::MalformedPayload(format!(
                        "unknown transition direction {other}"
                    )))
                }
            };
            Command::Transition {
                url,
                direction,
                params: f.dict()?,
                memento: f.data()?,
            }
        }
        CommandId::SetResolution => Command::SetResolution(Resolution {
            width: f.int()?,
            height: f.int()?,
            pixel_aspect_numerator: f.int()?,
            pixel_aspect_denominator: f.int()?,
        }),
    };
    Ok((target, command))
}

/// Typed access to the values produced by [`Reader::unpack`].
struct Fields {
    values: std::vec::IntoIter<Value>,
}

impl Fields {
    fn new(values: Vec<Value>) -> Self {
        Self { values: values.into_iter() }
    }

    fn next(&mut self, expected: &str) -> Result<Value, ProtocolError> {
        self.values
            .next()
            .ok_or_else(|| ProtocolError::MalformedPayload(format!("missing {expected} field")))
    }

    fn int(&mut self) -> Result<i64, ProtocolError> {
        match self.next("integer")? {
            Value::Int(v) => Ok(v),
            other => Err(unexpected("integer", &other)),
        }
    }

    fn float(&mut self) -> Result<f32, ProtocolError> {
        match self.next("float")? {
            Value::Float(v) => Ok(v),
            other => Err(unexpected("float", &other)),
        }
    }

    fn boolean(&mut self) -> Result<bool, ProtocolError> {
        match self.next("bool")? {
            Value::Bool(v) => Ok(v),
            other => Err(unexpected("bool", &other)),
        }
    }

    fn string(&mut self) -> Result<String, ProtocolError> {
        match self.next("string")? {
            Value::Str(v) => Ok(v),
            other => Err(unexpected("string", &other)),
        }
    }

    fn data(&mut self) -> Result<Vec<u8>, ProtocolError> {
        match self.next("data")? {
            Value::Data(v) => Ok(v),
            other => Err(unexpected("data", &other)),
        }
    }

    fn raw(&mut self) -> Result<Vec<u8>, ProtocolError> {
        match self.next("raw")? {
            Value::Raw(v) => Ok(v),
            other => Err(unexpected("raw", &other)),
        }
    }

    fn dict(&mut self) -> Result<Dict, ProtocolError> {
        match self.next("dict")? {
            Value::Dict(v) => Ok(v),
            other => Err(unexpected("dict", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &Value) -> ProtocolError {
    ProtocolError::MalformedPayload(format!("expected {expected} field, got {got:?}"))
}

// ── Events ────────────────────────────────────────────────────────────────────

/// An event pushed by the receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    DeviceInfo { resource: i64, info: InfoMap },
    AppInfo { resource: i64, info: InfoMap },
    ResourceInfo { resource: i64, status: i64, info: InfoMap },
    Key { resource: i64, action: KeyAction, code: i64, rawcode: i64 },
    Idle { resource: i64, idle: bool },
    FontInfo { resource: i64, metrics: FontMetrics },
    InitInfo { resource: i64, params: Dict, memento: Vec<u8> },
    ResolutionInfo { resource: i64, current: Resolution, available: Vec<Resolution> },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::DeviceInfo { .. } => EventKind::DeviceInfo,
            Event::AppInfo { .. } => EventKind::AppInfo,
            Event::ResourceInfo { .. } => EventKind::ResourceInfo,
            Event::Key { .. } => EventKind::Key,
            Event::Idle { .. } => EventKind::Idle,
            Event::FontInfo { .. } => EventKind::FontInfo,
            Event::InitInfo { .. } => EventKind::InitInfo,
            Event::ResolutionInfo { .. } => EventKind::ResolutionInfo,
        }
    }

    /// The resource id the event refers to.
    pub fn resource(&self) -> i64 {
        match self {
            Event::DeviceInfo { resource, .. }
            | Event::AppInfo { resource, .. }
            | Event::ResourceInfo { resource, .. }
            | Event::Key { resource, .. }
            | Event::Idle { resource, .. }
            | Event::FontInfo { resource, .. }
            | Event::InitInfo { resource, .. }
            | Event::ResolutionInfo { resource, .. } => *resource,
        }
    }
}

fn read_count(reader: &mut Reader<'_>) -> Result<usize, ProtocolError> {
    let count = reader.read_vint()?;
    usize::try_from(count)
        .map_err(|_| ProtocolError::MalformedPayload(format!("negative count {count}")))
}

fn read_info_pairs(reader: &mut Reader<'_>, count: usize) -> Result<InfoMap, ProtocolError> {
    let mut info = InfoMap::new();
    for _ in 0..count {
        let key = reader.read_string()?;
        let value = reader.read_string()?;
        info.insert(key, value);
    }
    Ok(info)
}

/// Reads a resolution record of `field_count` integers, keeping the first four.
fn read_resolution(reader: &mut Reader<'_>, field_count: usize) -> Result<Resolution, ProtocolError> {
    let resolution = Resolution {
        width: reader.read_vint()?,
        height: reader.read_vint()?,
        pixel_aspect_numerator: reader.read_vint()?,
        pixel_aspect_denominator: reader.read_vint()?,
    };
    for _ in 4..field_count {
        reader.read_vint()?;
    }
    Ok(resolution)
}

/// Decodes one event body.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownEventKind`] for an unrecognized event
/// number, or a decoding error if the body is truncated or malformed.
pub fn decode_event(bytes: &[u8]) -> Result<Event, ProtocolError> {
    let mut reader = Reader::new(bytes);
    let raw_kind = reader.read_vint()?;
    let resource = reader.read_vint()?;
    let kind = EventKind::try_from(raw_kind).map_err(|_| ProtocolError::UnknownEventKind(raw_kind))?;
    let r = &mut reader;

    let event = match kind {
        EventKind::DeviceInfo => {
            let count = read_count(r)?;
            Event::DeviceInfo { resource, info: read_info_pairs(r, count)? }
        }
        EventKind::AppInfo => {
            let count = read_count(r)?;
            Event::AppInfo { resource, info: read_info_pairs(r, count)? }
        }
        EventKind::ResourceInfo => {
            let status = r.read_vint()?;
            let count = read_count(r)?;
            Event::ResourceInfo { resource, status, info: read_info_pairs(r, count)? }
        }
        EventKind::Key => {
            let raw_action = r.read_vint()?;
            let action =
                KeyAction::try_from(raw_action).map_err(|_| ProtocolError::UnknownKeyAction(raw_action))?;
            Event::Key {
                resource,
                action,
                code: r.read_vint()?,
                rawcode: r.read_vint()?,
            }
        }
        EventKind::Idle => Event::Idle { resource, idle: r.read_bool()? },
        EventKind::FontInfo => {
            let ascent = r.read_float()?;
            let descent = r.read_float()?;
            let height = r.read_float()?;
            let line_gap = r.read_float()?;
            // Per-glyph field count; the first three are id, advance and bounding.
            let field_count = r.read_vint()?;
            let extra_fields = usize::try_from(field_count.saturating_sub(3)).unwrap_or(0);
            let extra_bytes = extra_fields.checked_mul(4).ok_or_else(|| {
                ProtocolError::MalformedPayload(format!("glyph field count {field_count} is too large"))
            })?;
            let glyph_count = read_count(r)?;
            let mut glyphs = BTreeMap::new();
            for _ in 0..glyph_count {
                let id = r.read_vint()?;
                let advance = r.read_float()?;
                let bounding = r.read_float()?;
                r.skip(extra_bytes)?;
                if let Ok(code) = u32::try_from(id) {
                    glyphs.insert(code, GlyphMetrics { advance, bounding });
                }
            }
            Event::FontInfo {
                resource,
                metrics: FontMetrics { ascent, descent, height, line_gap, glyphs },
            }
        }
        EventKind::InitInfo => Event::InitInfo {
            resource,
            params: r.read_dict()?,
            memento: r.read_vdata()?,
        },
        EventKind::ResolutionInfo => {
            let field_count = read_count(r)?;
            let current = read_resolution(r, field_count)?;
            let count = read_count(r)?;
            let available = (0..count)
                .map(|_| read_resolution(r, field_count))
                .collect::<Result<Vec<_>, _>>()?;
            Event::ResolutionInfo { resource, current, available }
        }
    };
    Ok(event)
}

fn write_info_pairs(buf: &mut Vec<u8>, info: &InfoMap) {
    write_vint(buf, info.len() as i64);
    for (key, value) in info {
        crate::protocol::codec::write_string(buf, key);
        crate::protocol::codec::write_string(buf, value);
    }
}

fn write_resolution(buf: &mut Vec<u8>, r: &Resolution) {
    write_vint(buf, r.width);
    write_vint(buf, r.height);
    write_vint(buf, r.pixel_aspect_numerator);
    write_vint(buf, r.pixel_aspect_denominator);
}

/// Encodes an event body the way a receiver would.
///
/// Used by tests and tooling that play the receiver role.
pub fn encode_event(event: &Event) -> Vec<u8> {
    use crate::protocol::codec::{write_bool, write_dict, write_float, write_vdata};

    let mut buf = Vec::new();
    write_vint(&mut buf, event.kind() as i64);
    write_vint(&mut buf, event.resource());
    match event {
        Event::DeviceInfo { info, .. } | Event::AppInfo { info, .. } => write_info_pairs(&mut buf, info),
        Event::ResourceInfo { status, info, .. } => {
            write_vint(&mut buf, *status);
            write_info_pairs(&mut buf, info);
        }
        Event::Key { action, code, rawcode, .. } => {
            write_vint(&mut buf, *action as i64);
            write_vint(&mut buf, *code);
            write_vint(&mut buf, *rawcode);
        }
        Event::Idle { idle, .. } => write_bool(&mut buf, *idle),
        Event::FontInfo { metrics, .. } => {
            write_float(&mut buf, metrics.ascent);
            write_float(&mut buf, metrics.descent);
            write_float(&mut buf, metrics.height);
            write_float(&mut buf, metrics.line_gap);
            write_vint(&mut buf, 3);
            write_vint(&mut buf, metrics.glyphs.len() as i64);
            for (code, glyph) in &metrics.glyphs {
                write_vint(&mut buf, i64::from(*code));
                write_float(&mut buf, glyph.advance);
                write_float(&mut buf, glyph.bounding);
            }
        }
        Event::InitInfo { params, memento, .. } => {
            write_dict(&mut buf, params);
            write_vdata(&mut buf, memento);
        }
        Event::ResolutionInfo { current, available, .. } => {
            write_vint(&mut buf, 4);
            write_resolution(&mut buf, current);
            write_vint(&mut buf, available.len() as i64);
            for r in available {
                write_resolution(&mut buf, r);
            }
        }
    }
    buf
}
