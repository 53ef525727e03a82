//! Remote resources: identity allocation, content-keyed caching and handles.
//!
//! Every color, font, image, sound, stream, text and animation lives on the
//! receiver and is addressed by an integer id that the host allocates. The
//! [`Registry`] hands out ids and remembers which content key already has a
//! live id, so that asking twice for the same color (say) reuses the first
//! allocation without sending anything.
//!
//! [`Resource`] is the handle applications hold. Cloning a handle aliases the
//! same remote object.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use crate::protocol::codec::Dict;
use crate::protocol::constants::{font_style, ids, sound_id};
use crate::protocol::messages::{Command, FontMetrics};
use crate::session::Session;

/// Identifier of a remote resource or view.
pub type ResourceId = i64;

/// Local precondition failures raised before anything is written.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("no source supplied for {0:?} resource")]
    MissingSource(ResourceKind),

    #[error("unknown sound '{0}'")]
    UnknownSound(String),

    #[error("failed to read resource file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Color,
    Ttf,
    Font,
    Text,
    Image,
    Sound,
    Stream,
    Animation,
}

/// Content identity of a cacheable resource.
///
/// Floats are keyed by their bit pattern so the key can be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Color(u32),
    Ttf(String),
    Font { ttf: ResourceId, style: i64, size_bits: u32, flags: i64 },
    Image(String),
    Animation { duration_ms: i64, ease_bits: u32 },
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Per-session id counter and content caches.
#[derive(Debug)]
pub(crate) struct Registry {
    next_id: ResourceId,
    cache: HashMap<ResourceKey, ResourceId>,
    metrics: HashMap<ResourceId, Arc<FontMetrics>>,
    last_color: Option<ResourceId>,
    last_ttf: Option<ResourceId>,
    last_font: Option<ResourceId>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            next_id: ids::CLIENT,
            cache: HashMap::new(),
            metrics: HashMap::new(),
            last_color: None,
            last_ttf: None,
            last_font: None,
        }
    }

    /// Returns the next unused id. Views and resources share the counter.
    pub(crate) fn allocate(&mut self) -> ResourceId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn lookup(&self, key: &ResourceKey) -> Option<ResourceId> {
        self.cache.get(key).copied()
    }

    fn insert(&mut self, key: ResourceKey, id: ResourceId) {
        self.cache.insert(key, id);
    }

    /// Drops the cache entry for `key` if it still points at `id`.
    fn evict(&mut self, key: &ResourceKey, id: ResourceId) {
        if self.cache.get(key) == Some(&id) {
            self.cache.remove(key);
        }
    }

    /// Clears every per-session slot that refers to `id`.
    fn forget(&mut self, id: ResourceId) {
        for slot in [&mut self.last_color, &mut self.last_ttf, &mut self.last_font] {
            if *slot == Some(id) {
                *slot = None;
            }
        }
        self.metrics.remove(&id);
    }

    /// Finds the cached font key whose id is `id`.
    pub(crate) fn font_key(&self, id: ResourceId) -> Option<ResourceKey> {
        self.cache
            .iter()
            .find(|(key, cached)| matches!(key, ResourceKey::Font { .. }) && **cached == id)
            .map(|(key, _)| key.clone())
    }

    pub(crate) fn set_metrics(&mut self, id: ResourceId, metrics: Arc<FontMetrics>) {
        self.metrics.insert(id, metrics);
    }

    pub(crate) fn metrics(&self, id: ResourceId) -> Option<Arc<FontMetrics>> {
        self.metrics.get(&id).cloned()
    }

    #[cfg(test)]
    pub(crate) fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

/// Returns a handle for `key`, reusing a cached id when one exists and
/// otherwise allocating an id and sending the command built by `payload`.
///
/// The caller holds the session state lock for the whole call.
fn acquire<E>(
    session: &Session,
    registry: &mut Registry,
    kind: ResourceKind,
    key: Option<ResourceKey>,
    payload: impl FnOnce() -> Result<Command, E>,
) -> Result<Resource, E> {
    if let Some(id) = key.as_ref().and_then(|k| registry.lookup(k)) {
        trace!(?kind, id, "resource cache hit");
        return Ok(Resource::bound(session, kind, id, key));
    }
    let command = payload()?;
    let id = registry.allocate();
    debug!(?kind, id, "allocating resource");
    session.send(id, &command);
    if let Some(k) = &key {
        registry.insert(k.clone(), id);
    }
    Ok(Resource::bound(session, kind, id, key))
}

fn acquire_infallible(
    session: &Session,
    registry: &mut Registry,
    kind: ResourceKind,
    key: Option<ResourceKey>,
    payload: impl FnOnce() -> Command,
) -> Resource {
    match acquire::<Infallible>(session, registry, kind, key, || Ok(payload())) {
        Ok(resource) => resource,
        Err(never) => match never {},
    }
}

// ── Construction inputs ───────────────────────────────────────────────────────

/// Where the bytes of a TTF, image or sound come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A well-known built-in or previously allocated id.
    Id(ResourceId),
    /// Anonymous bytes; never cached.
    Data(Vec<u8>),
    /// Bytes cached under `name`.
    Named { name: String, data: Vec<u8> },
    /// A file read from disk and cached under its path.
    File(PathBuf),
}

impl Source {
    fn check(&self, kind: ResourceKind) -> Result<(), ResourceError> {
        let empty = match self {
            Source::Id(_) => false,
            Source::Data(data) => data.is_empty(),
            Source::Named { name, .. } => name.is_empty(),
            Source::File(path) => path.as_os_str().is_empty(),
        };
        if empty {
            Err(ResourceError::MissingSource(kind))
        } else {
            Ok(())
        }
    }

    fn cache_name(&self) -> Option<String> {
        match self {
            Source::Named { name, .. } => Some(name.clone()),
            Source::File(path) => Some(path.to_string_lossy().into_owned()),
            Source::Id(_) | Source::Data(_) => None,
        }
    }

    fn load(&self) -> Result<Vec<u8>, ResourceError> {
        match self {
            Source::Data(data) | Source::Named { data, .. } => Ok(data.clone()),
            Source::File(path) => std::fs::read(path).map_err(|source| ResourceError::Io {
                path: path.clone(),
                source,
            }),
            Source::Id(_) => Ok(Vec::new()),
        }
    }
}

/// Parameters of a font resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    /// TTF to render with; defaults to the session's last TTF, then the built-in default.
    pub ttf: Option<ResourceId>,
    pub style: i64,
    pub size: f32,
    pub flags: i64,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            ttf: None,
            style: font_style::PLAIN,
            size: 24.0,
            flags: 0,
        }
    }
}

impl FontSpec {
    pub fn sized(size: f32) -> Self {
        Self { size, ..Self::default() }
    }

    pub fn bold(mut self) -> Self {
        self.style = font_style::BOLD;
        self
    }
}

/// Font and color for a text resource; unset fields fall back to the
/// session's most recently created font and color.
#[derive(Debug, Clone, Default)]
pub struct TextStyle {
    pub font: Option<Resource>,
    pub color: Option<Resource>,
}

/// Applies the color defaults: absent means opaque white, and a zero alpha
/// byte means fully opaque.
pub fn normalize_color(argb: Option<u32>) -> u32 {
    let argb = argb.unwrap_or(0xffff_ffff);
    if argb & 0xff00_0000 == 0 {
        argb | 0xff00_0000
    } else {
        argb
    }
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// A handle to a remote resource.
#[derive(Clone)]
pub struct Resource {
    session: Session,
    kind: ResourceKind,
    id: ResourceId,
    key: Option<ResourceKey>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("key", &self.key)
            .finish()
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl Resource {
    pub(crate) fn bound(
        session: &Session,
        kind: ResourceKind,
        id: ResourceId,
        key: Option<ResourceKey>,
    ) -> Self {
        Self {
            session: session.clone(),
            kind,
            id,
            key,
        }
    }

    pub(crate) fn color_in(session: &Session, registry: &mut Registry, argb: Option<u32>) -> Resource {
        let argb = normalize_color(argb);
        let color = acquire_infallible(
            session,
            registry,
            ResourceKind::Color,
            Some(ResourceKey::Color(argb)),
            || Command::AddColor { argb },
        );
        registry.last_color = Some(color.id);
        color
    }

    pub(crate) fn font_in(session: &Session, registry: &mut Registry, spec: FontSpec) -> Resource {
        let ttf = spec.ttf.or(registry.last_ttf).unwrap_or(ids::DEFAULT_TTF);
        let key = ResourceKey::Font {
            ttf,
            style: spec.style,
            size_bits: spec.size.to_bits(),
            flags: spec.flags,
        };
        let font = acquire_infallible(session, registry, ResourceKind::Font, Some(key), || {
            Command::AddFont {
                ttf,
                style: spec.style,
                size: spec.size,
                flags: spec.flags,
            }
        });
        registry.last_font = Some(font.id);
        font
    }

    pub(crate) fn animation_in(
        session: &Session,
        registry: &mut Registry,
        duration: Duration,
        ease: f32,
    ) -> Resource {
        let duration_ms = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        let key = ResourceKey::Animation {
            duration_ms,
            ease_bits: ease.to_bits(),
        };
        acquire_infallible(session, registry, ResourceKind::Animation, Some(key), || {
            Command::AddAnimation { duration_ms, ease }
        })
    }

    /// A color; `None` is opaque white.
    pub fn color(session: &Session, argb: Option<u32>) -> Resource {
        let mut state = session.lock_state();
        Self::color_in(session, &mut state.registry, argb)
    }

    /// A TrueType font file; `None` is the receiver's default TTF.
    ///
    /// # Errors
    ///
    /// [`ResourceError::MissingSource`] for an empty source, or
    /// [`ResourceError::Io`] if a file source cannot be read.
    pub fn ttf(session: &Session, source: Option<Source>) -> Result<Resource, ResourceError> {
        let source = source.unwrap_or(Source::Id(ids::DEFAULT_TTF));
        source.check(ResourceKind::Ttf)?;
        let mut state = session.lock_state();
        let registry = &mut state.registry;
        let ttf = match &source {
            Source::Id(id) => Resource::bound(session, ResourceKind::Ttf, *id, None),
            _ => {
                let key = source.cache_name().map(ResourceKey::Ttf);
                acquire(session, registry, ResourceKind::Ttf, key, || {
                    source.load().map(|data| Command::AddTtf { data })
                })?
            }
        };
        registry.last_ttf = Some(ttf.id);
        Ok(ttf)
    }

    pub fn font(session: &Session, spec: FontSpec) -> Resource {
        let mut state = session.lock_state();
        Self::font_in(session, &mut state.registry, spec)
    }

    /// A text string rendered with a font and color. Text is never cached.
    pub fn text(session: &Session, text: &str, style: &TextStyle) -> Resource {
        let mut state = session.lock_state();
        let registry = &mut state.registry;
        let font = match &style.font {
            Some(font) => font.id,
            None => match registry.last_font {
                Some(id) => id,
                None => Self::font_in(session, registry, FontSpec::default()).id,
            },
        };
        let color = match &style.color {
            Some(color) => color.id,
            None => match registry.last_color {
                Some(id) => id,
                None => Self::color_in(session, registry, None).id,
            },
        };
        acquire_infallible(session, registry, ResourceKind::Text, None, || Command::AddText {
            font,
            color,
            text: text.to_string(),
        })
    }

    /// An image. Named and file sources are cached by name.
    ///
    /// # Errors
    ///
    /// [`ResourceError::MissingSource`] when the source carries no data or
    /// name, or [`ResourceError::Io`] if a file source cannot be read.
    pub fn image(session: &Session, source: Source) -> Result<Resource, ResourceError> {
        source.check(ResourceKind::Image)?;
        if let Source::Id(id) = source {
            return Ok(Resource::bound(session, ResourceKind::Image, id, None));
        }
        let mut state = session.lock_state();
        let key = source.cache_name().map(ResourceKey::Image);
        acquire(session, &mut state.registry, ResourceKind::Image, key, || {
            source.load().map(|data| Command::AddImage { data })
        })
    }

    /// A sound clip; `None` is the built-in "updown" sound.
    ///
    /// # Errors
    ///
    /// See [`Resource::image`].
    pub fn sound(session: &Session, source: Option<Source>) -> Result<Resource, ResourceError> {
        let source = source.unwrap_or(Source::Id(ids::UPDOWN_SOUND));
        source.check(ResourceKind::Sound)?;
        if let Source::Id(id) = source {
            return Ok(Resource::bound(session, ResourceKind::Sound, id, None));
        }
        let mut state = session.lock_state();
        acquire(session, &mut state.registry, ResourceKind::Sound, None, || {
            source.load().map(|data| Command::AddSound { data })
        })
    }

    /// A built-in sound looked up by name, e.g. `"bonk"` or `"select"`.
    ///
    /// # Errors
    ///
    /// [`ResourceError::UnknownSound`] if `name` is not a built-in sound.
    pub fn named_sound(session: &Session, name: &str) -> Result<Resource, ResourceError> {
        let id = sound_id(name).ok_or_else(|| ResourceError::UnknownSound(name.to_string()))?;
        Ok(Resource::bound(session, ResourceKind::Sound, id, None))
    }

    /// A streamed media resource fetched by the receiver from `url`.
    pub fn stream(session: &Session, url: &str, mime: &str, play: bool, params: Dict) -> Resource {
        let mut state = session.lock_state();
        acquire_infallible(session, &mut state.registry, ResourceKind::Stream, None, || {
            Command::AddStream {
                url: url.to_string(),
                mime: mime.to_string(),
                play,
                params,
            }
        })
    }

    /// An animation of `duration` with easing `ease` (-1.0 ease in, 0.0 linear, 1.0 ease out).
    pub fn animation(session: &Session, duration: Duration, ease: f32) -> Resource {
        let mut state = session.lock_state();
        Self::animation_in(session, &mut state.registry, duration, ease)
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn key(&self) -> Option<&ResourceKey> {
        self.key.as_ref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// True once [`Resource::release`] removed the remote object through this handle.
    pub fn is_released(&self) -> bool {
        self.id == ids::RELEASED
    }

    /// Metrics reported by the receiver for this font, once they arrive.
    pub fn metrics(&self) -> Option<Arc<FontMetrics>> {
        self.session.lock_state().registry.metrics(self.id)
    }

    // ── Controls ──────────────────────────────────────────────────────────────

    pub fn set_active(&self, active: bool) {
        self.session.send(self.id, &Command::SetActive { active });
    }

    pub fn set_position(&self, position: i64) {
        self.session.send(self.id, &Command::SetPosition { position });
    }

    /// Sets the playback speed and flushes so that the change is immediate.
    pub fn set_speed(&self, speed: f32) {
        self.session.send(self.id, &Command::SetSpeed { speed });
        self.session.flush_or_deactivate();
    }

    pub fn play(&self) {
        self.set_speed(1.0);
    }

    pub fn pause(&self) {
        self.set_speed(0.0);
    }

    pub fn close(&self) {
        self.session.send(self.id, &Command::Close);
    }

    /// Removes the remote object and invalidates this handle.
    ///
    /// Built-in resources (ids below [`ids::CLIENT`]) are never removed, and
    /// neither are anonymous TTFs.
    pub fn release(&mut self) {
        let session = self.session.clone();
        let mut state = session.lock_state();
        self.release_in(&mut state.registry);
    }

    pub(crate) fn release_in(&mut self, registry: &mut Registry) {
        if self.is_released() {
            return;
        }
        if self.kind == ResourceKind::Ttf && self.key.is_none() {
            debug!(id = self.id, "anonymous TTF is not removable");
            return;
        }
        if let Some(key) = &self.key {
            registry.evict(key, self.id);
        }
        if self.id >= ids::CLIENT {
            self.session.send(self.id, &Command::Remove);
            registry.forget(self.id);
            self.id = ids::RELEASED;
        }
    }
}
