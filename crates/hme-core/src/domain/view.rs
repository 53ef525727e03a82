//! The scene graph mirrored on the receiver.
//!
//! The session keeps a local copy of every view's attributes in a
//! [`ViewTree`] arena keyed by view id. Each mutator compares the requested
//! value with that copy and sends a command only when something changes, so
//! applications can call setters freely without flooding the connection.
//!
//! [`View`] is a cheap handle (session + id); the attributes themselves live
//! behind the session lock.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::domain::resource::{
    Registry, Resource, ResourceError, ResourceId, ResourceKey, ResourceKind, Source, TextStyle,
};
use crate::protocol::constants::ids;
use crate::protocol::messages::{Command, Resolution};
use crate::session::Session;

/// Position and size of a view, relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Bounds {
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self { x, y, width, height }
    }
}

/// How a visual change is applied.
#[derive(Debug, Clone, Default)]
pub enum Timing {
    /// Apply at once using the session's zero-duration animation.
    #[default]
    Immediate,
    /// Animate linearly over the duration; a zero duration is immediate.
    Over(Duration),
    /// Animate with an existing animation resource.
    With(Resource),
}

impl From<Duration> for Timing {
    fn from(duration: Duration) -> Self {
        Timing::Over(duration)
    }
}

impl From<Resource> for Timing {
    fn from(animation: Resource) -> Self {
        Timing::With(animation)
    }
}

/// Resolves `timing` to the animation id carried by a command.
pub(crate) fn animation_id(session: &Session, registry: &mut Registry, timing: &Timing) -> ResourceId {
    match timing {
        Timing::Immediate => ids::NULL,
        Timing::Over(duration) if duration.is_zero() => ids::NULL,
        Timing::Over(duration) => Resource::animation_in(session, registry, *duration, 0.0).id(),
        Timing::With(animation) => animation.id(),
    }
}

// ── Arena ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Attachment {
    kind: ResourceKind,
    id: ResourceId,
    key: Option<ResourceKey>,
    flags: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct ViewNode {
    parent: Option<ResourceId>,
    children: Vec<ResourceId>,
    bounds: Bounds,
    visible: bool,
    painting: bool,
    scale: (f32, f32),
    translation: (i64, i64),
    transparency: f32,
    resource: Option<Attachment>,
}

impl ViewNode {
    fn new(parent: Option<ResourceId>, bounds: Bounds, visible: bool) -> Self {
        Self {
            parent,
            children: Vec::new(),
            bounds,
            visible,
            painting: true,
            scale: (1.0, 1.0),
            translation: (0, 0),
            transparency: 0.0,
            resource: None,
        }
    }
}

/// Local state of every live view in one session.
#[derive(Debug)]
pub(crate) struct ViewTree {
    nodes: HashMap<ResourceId, ViewNode>,
}

impl ViewTree {
    /// A tree holding only the root view, sized to `resolution` and hidden.
    pub(crate) fn with_root(resolution: Resolution) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            ids::ROOT_VIEW,
            ViewNode::new(None, Bounds::new(0, 0, resolution.width, resolution.height), false),
        );
        Self { nodes }
    }

    fn get(&self, id: ResourceId) -> Option<&ViewNode> {
        self.nodes.get(&id)
    }

    fn get_mut(&mut self, id: ResourceId) -> Option<&mut ViewNode> {
        self.nodes.get_mut(&id)
    }

    fn insert(&mut self, id: ResourceId, node: ViewNode) {
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.push(id);
        }
        self.nodes.insert(id, node);
    }

    /// Unlinks `id` from its parent and forgets it and its descendants.
    fn detach(&mut self, id: ResourceId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != id);
        }
        let mut pending = node.children;
        while let Some(child) = pending.pop() {
            if let Some(removed) = self.nodes.remove(&child) {
                pending.extend(removed.children);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

// ── Construction options ──────────────────────────────────────────────────────

/// Content attached to a view when it is created.
#[derive(Debug, Clone)]
pub enum ViewContent {
    Resource(Resource),
    Text(String),
    Color(u32),
}

/// Options for [`View::create`]. Width and height default to the parent's
/// extent remaining after the offset.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub x: i64,
    pub y: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub visible: bool,
    pub transparency: Option<f32>,
    pub content: Option<ViewContent>,
    /// Layout flags used when attaching `content`.
    pub flags: i64,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: None,
            height: None,
            visible: true,
            transparency: None,
            content: None,
            flags: 0,
        }
    }
}

impl ViewOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounds(mut self, x: i64, y: i64, width: i64, height: i64) -> Self {
        self.x = x;
        self.y = y;
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn position(mut self, x: i64, y: i64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn transparency(mut self, transparency: f32) -> Self {
        self.transparency = Some(transparency);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.content = Some(ViewContent::Text(text.into()));
        self
    }

    pub fn color(mut self, argb: u32) -> Self {
        self.content = Some(ViewContent::Color(argb));
        self
    }

    pub fn resource(mut self, resource: Resource) -> Self {
        self.content = Some(ViewContent::Resource(resource));
        self
    }

    pub fn flags(mut self, flags: i64) -> Self {
        self.flags = flags;
        self
    }
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// A handle to one view of a session.
#[derive(Clone)]
pub struct View {
    session: Session,
    id: ResourceId,
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View").field("id", &self.id).finish()
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl View {
    pub(crate) fn root(session: &Session) -> View {
        View {
            session: session.clone(),
            id: ids::ROOT_VIEW,
        }
    }

    /// Creates a view under `parent`, or under the root view when `parent` is `None`.
    pub fn create(session: &Session, parent: Option<&View>, options: ViewOptions) -> View {
        let requested = parent.map_or(ids::ROOT_VIEW, View::id);
        let view = {
            let mut guard = session.lock_state();
            let state = &mut *guard;
            // A removed parent cannot take children; attach to the root instead.
            let parent_id = if state.views.get(requested).is_some() {
                requested
            } else {
                warn!(parent = requested, "parent view was removed; creating under the root");
                ids::ROOT_VIEW
            };
            let extent = match state.views.get(parent_id) {
                Some(node) => (node.bounds.width, node.bounds.height),
                None => (state.resolution.width, state.resolution.height),
            };
            let bounds = Bounds::new(
                options.x,
                options.y,
                options.width.unwrap_or(extent.0 - options.x),
                options.height.unwrap_or(extent.1 - options.y),
            );
            let id = state.registry.allocate();
            session.send(
                id,
                &Command::ViewAdd {
                    parent: parent_id,
                    x: bounds.x,
                    y: bounds.y,
                    width: bounds.width,
                    height: bounds.height,
                    visible: options.visible,
                },
            );
            state
                .views
                .insert(id, ViewNode::new(Some(parent_id), bounds, options.visible));
            trace!(id, parent = parent_id, ?bounds, "view created");
            View { session: session.clone(), id }
        };

        if let Some(transparency) = options.transparency {
            view.set_transparency(transparency, Timing::Immediate);
        }
        match options.content {
            Some(ViewContent::Resource(resource)) => view.set_resource(&resource, options.flags),
            Some(ViewContent::Text(text)) => view.set_text(&text, &TextStyle::default(), options.flags),
            Some(ViewContent::Color(argb)) => view.set_color(Some(argb)),
            None => {}
        }
        view
    }

    /// Creates a child of this view.
    pub fn child(&self, options: ViewOptions) -> View {
        View::create(&self.session, Some(self), options)
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn read<R: Default>(&self, f: impl FnOnce(&ViewNode) -> R) -> R {
        self.session.lock_state().views.get(self.id).map(f).unwrap_or_default()
    }

    /// Runs `f` against this view's node and the registry under one lock.
    /// Views already removed are left alone.
    fn update(&self, f: impl FnOnce(&mut ViewNode, &mut Registry)) {
        let mut guard = self.session.lock_state();
        let state = &mut *guard;
        match state.views.get_mut(self.id) {
            Some(node) => f(node, &mut state.registry),
            None => debug!(id = self.id, "ignoring update to removed view"),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn bounds(&self) -> Bounds {
        self.read(|n| n.bounds)
    }

    pub fn x(&self) -> i64 {
        self.bounds().x
    }

    pub fn y(&self) -> i64 {
        self.bounds().y
    }

    pub fn width(&self) -> i64 {
        self.bounds().width
    }

    pub fn height(&self) -> i64 {
        self.bounds().height
    }

    pub fn is_visible(&self) -> bool {
        self.read(|n| n.visible)
    }

    pub fn is_painting(&self) -> bool {
        self.read(|n| n.painting)
    }

    pub fn scale(&self) -> (f32, f32) {
        self.read(|n| n.scale)
    }

    pub fn translation(&self) -> (i64, i64) {
        self.read(|n| n.translation)
    }

    pub fn transparency(&self) -> f32 {
        self.read(|n| n.transparency)
    }

    /// The attached resource and its layout flags.
    pub fn resource(&self) -> Option<(Resource, i64)> {
        self.read(|n| n.resource.clone()).map(|a| {
            (Resource::bound(&self.session, a.kind, a.id, a.key), a.flags)
        })
    }

    pub fn parent(&self) -> Option<View> {
        self.read(|n| n.parent).map(|id| View {
            session: self.session.clone(),
            id,
        })
    }

    pub fn children(&self) -> Vec<View> {
        self.read(|n| n.children.clone())
            .into_iter()
            .map(|id| View {
                session: self.session.clone(),
                id,
            })
            .collect()
    }

    // ── Mutators ──────────────────────────────────────────────────────────────

    pub fn set_bounds(&self, bounds: Bounds, timing: Timing) {
        self.update_bounds(|_| bounds, timing);
    }

    /// Derives new bounds from the current ones under a single lock.
    fn update_bounds(&self, f: impl FnOnce(Bounds) -> Bounds, timing: Timing) {
        self.update(|node, registry| {
            let bounds = f(node.bounds);
            if node.bounds == bounds {
                return;
            }
            let animation = animation_id(&self.session, registry, &timing);
            self.session.send(
                self.id,
                &Command::ViewSetBounds {
                    x: bounds.x,
                    y: bounds.y,
                    width: bounds.width,
                    height: bounds.height,
                    animation,
                },
            );
            node.bounds = bounds;
        });
    }

    /// Moves the view, keeping its size.
    pub fn set_position(&self, x: i64, y: i64, timing: Timing) {
        self.update_bounds(|b| Bounds::new(x, y, b.width, b.height), timing);
    }

    /// Resizes the view, keeping its position.
    pub fn set_size(&self, width: i64, height: i64, timing: Timing) {
        self.update_bounds(|b| Bounds::new(b.x, b.y, width, height), timing);
    }

    pub fn set_scale(&self, x: f32, y: f32, timing: Timing) {
        self.update(|node, registry| {
            if node.scale == (x, y) {
                return;
            }
            let animation = animation_id(&self.session, registry, &timing);
            self.session.send(self.id, &Command::ViewSetScale { x, y, animation });
            node.scale = (x, y);
        });
    }

    pub fn set_translation(&self, x: i64, y: i64, timing: Timing) {
        self.update_translation(|_| (x, y), timing);
    }

    fn update_translation(&self, f: impl FnOnce((i64, i64)) -> (i64, i64), timing: Timing) {
        self.update(|node, registry| {
            let (x, y) = f(node.translation);
            if node.translation == (x, y) {
                return;
            }
            let animation = animation_id(&self.session, registry, &timing);
            self.session
                .send(self.id, &Command::ViewSetTranslation { x, y, animation });
            node.translation = (x, y);
        });
    }

    /// Shifts the translation by `(dx, dy)`.
    pub fn translate(&self, dx: i64, dy: i64, timing: Timing) {
        self.update_translation(|(x, y)| (x + dx, y + dy), timing);
    }

    /// Sets transparency, from 0.0 (opaque) to 1.0 (invisible).
    pub fn set_transparency(&self, transparency: f32, timing: Timing) {
        self.update(|node, registry| {
            if node.transparency == transparency {
                return;
            }
            let animation = animation_id(&self.session, registry, &timing);
            self.session.send(
                self.id,
                &Command::ViewSetTransparency { transparency, animation },
            );
            node.transparency = transparency;
        });
    }

    pub fn set_visible(&self, visible: bool, timing: Timing) {
        self.update(|node, registry| {
            if node.visible == visible {
                return;
            }
            let animation = animation_id(&self.session, registry, &timing);
            self.session
                .send(self.id, &Command::ViewSetVisible { visible, animation });
            node.visible = visible;
        });
    }

    /// Enables or suspends painting. Always sent, even when unchanged.
    pub fn set_painting(&self, painting: bool) {
        self.update(|node, _| {
            self.session.send(self.id, &Command::ViewSetPainting { painting });
            node.painting = painting;
        });
    }

    /// Attaches `resource` with the given layout flags.
    pub fn set_resource(&self, resource: &Resource, flags: i64) {
        let attachment = Attachment {
            kind: resource.kind(),
            id: resource.id(),
            key: resource.key().cloned(),
            flags,
        };
        self.update(|node, _| {
            if node
                .resource
                .as_ref()
                .is_some_and(|a| a.id == attachment.id && a.flags == flags)
            {
                return;
            }
            self.session.send(
                self.id,
                &Command::ViewSetResource {
                    resource: attachment.id,
                    flags,
                },
            );
            node.resource = Some(attachment);
        });
    }

    /// Detaches the current resource, if any, without releasing it.
    pub fn clear_resource(&self) {
        self.update(|node, _| {
            if node.resource.take().is_some() {
                self.session.send(
                    self.id,
                    &Command::ViewSetResource {
                        resource: ids::NULL,
                        flags: 0,
                    },
                );
            }
        });
    }

    /// Detaches the current resource and releases it on the receiver.
    pub fn remove_resource(&self) {
        self.update(|node, registry| {
            let Some(attachment) = node.resource.take() else {
                return;
            };
            self.session.send(
                self.id,
                &Command::ViewSetResource {
                    resource: ids::NULL,
                    flags: 0,
                },
            );
            let mut resource =
                Resource::bound(&self.session, attachment.kind, attachment.id, attachment.key);
            resource.release_in(registry);
        });
    }

    /// Shows `text`, creating a text resource with `style`.
    pub fn set_text(&self, text: &str, style: &TextStyle, flags: i64) {
        let resource = Resource::text(&self.session, text, style);
        self.set_resource(&resource, flags);
    }

    /// Shows an image.
    ///
    /// # Errors
    ///
    /// Propagates the [`ResourceError`] raised while creating the image.
    pub fn set_image(&self, source: Source, flags: i64) -> Result<(), ResourceError> {
        let resource = Resource::image(&self.session, source)?;
        self.set_resource(&resource, flags);
        Ok(())
    }

    /// Fills the view with a color; `None` is opaque white.
    pub fn set_color(&self, argb: Option<u32>) {
        let resource = Resource::color(&self.session, argb);
        self.set_resource(&resource, 0);
    }

    /// Removes the view from the receiver and from its parent's children.
    ///
    /// Children are dropped locally; the receiver removes them along with this view.
    pub fn remove(&self, timing: Timing) {
        if self.id == ids::ROOT_VIEW {
            debug!("the root view cannot be removed");
            return;
        }
        let mut guard = self.session.lock_state();
        let state = &mut *guard;
        if state.views.get(self.id).is_none() {
            return;
        }
        let animation = animation_id(&self.session, &mut state.registry, &timing);
        self.session.send(self.id, &Command::ViewRemove { animation });
        state.views.detach(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::CommandId;
    use crate::test_support::{commands, memory_session};

    #[test]
    fn test_root_starts_hidden_at_default_resolution() {
        let (session, _output) = memory_session();
        let root = session.root();

        assert_eq!(root.id(), ids::ROOT_VIEW);
        assert!(!root.is_visible());
        assert_eq!(root.bounds(), Bounds::new(0, 0, 640, 480));
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_create_defaults_size_to_remaining_parent_extent() {
        // Arrange
        let (session, output) = memory_session();

        // Act
        let view = View::create(&session, None, ViewOptions::new().position(40, 30));

        // Assert
        assert_eq!(view.bounds(), Bounds::new(40, 30, 600, 450));
        assert_eq!(session.root().children(), vec![view.clone()]);
        let sent = commands(&session, &output);
        assert_eq!(
            sent,
            vec![(
                view.id(),
                Command::ViewAdd { parent: ids::ROOT_VIEW, x: 40, y: 30, width: 600, height: 450, visible: true }
            )]
        );
    }

    #[test]
    fn test_set_transparency_is_idempotent() {
        // Arrange
        let (session, output) = memory_session();
        let view = View::create(&session, None, ViewOptions::new());

        // Act
        view.set_transparency(0.5, Timing::Immediate);
        view.set_transparency(0.5, Timing::Immediate);
        view.set_transparency(0.25, Timing::Immediate);

        // Assert: add + two transparency changes
        let ids: Vec<_> = commands(&session, &output).iter().map(|(_, c)| c.id()).collect();
        assert_eq!(
            ids,
            vec![CommandId::ViewAdd, CommandId::ViewSetTransparency, CommandId::ViewSetTransparency]
        );
    }

    #[test]
    fn test_timed_change_allocates_animation_once() {
        let (session, output) = memory_session();
        let view = View::create(&session, None, ViewOptions::new());

        view.set_visible(false, Timing::Over(Duration::from_millis(500)));
        view.set_visible(true, Timing::Over(Duration::from_millis(500)));

        let sent = commands(&session, &output);
        let anim_id = sent[1].0;
        assert_eq!(sent[1].1, Command::AddAnimation { duration_ms: 500, ease: 0.0 });
        assert_eq!(sent[2].1, Command::ViewSetVisible { visible: false, animation: anim_id });
        assert_eq!(sent[3].1, Command::ViewSetVisible { visible: true, animation: anim_id });
        assert_eq!(sent.len(), 4);
    }

    #[test]
    fn test_zero_duration_uses_immediate_animation() {
        let (session, output) = memory_session();
        let view = View::create(&session, None, ViewOptions::new());

        view.set_scale(2.0, 2.0, Timing::Over(Duration::ZERO));

        let sent = commands(&session, &output);
        assert_eq!(sent[1].1, Command::ViewSetScale { x: 2.0, y: 2.0, animation: ids::NULL });
    }

    #[test]
    fn test_set_painting_is_always_sent() {
        let (session, output) = memory_session();
        let view = View::create(&session, None, ViewOptions::new());

        view.set_painting(true);
        view.set_painting(true);

        assert_eq!(commands(&session, &output).len(), 3);
    }

    #[test]
    fn test_translate_is_relative() {
        let (session, output) = memory_session();
        let view = View::create(&session, None, ViewOptions::new());

        view.translate(10, 5, Timing::Immediate);
        view.translate(10, 5, Timing::Immediate);

        assert_eq!(view.translation(), (20, 10));
        let sent = commands(&session, &output);
        assert_eq!(sent[2].1, Command::ViewSetTranslation { x: 20, y: 10, animation: 0 });
    }

    #[test]
    fn test_concurrent_translate_keeps_every_increment() {
        // Arrange
        let (session, _output) = memory_session();
        let view = View::create(&session, None, ViewOptions::new());

        // Act
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let view = view.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        view.translate(1, 0, Timing::Immediate);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("translate worker");
        }

        // Assert
        assert_eq!(view.translation(), (4000, 0));
    }

    #[test]
    fn test_set_position_and_size_keep_the_other_half() {
        let (session, _output) = memory_session();
        let view = View::create(&session, None, ViewOptions::new().bounds(10, 20, 100, 50));

        view.set_position(30, 40, Timing::Immediate);
        view.set_size(200, 80, Timing::Immediate);

        assert_eq!(view.bounds(), Bounds::new(30, 40, 200, 80));
    }

    #[test]
    fn test_set_resource_same_resource_is_noop_and_clear_sends_null() {
        let (session, output) = memory_session();
        let view = View::create(&session, None, ViewOptions::new());
        let color = Resource::color(&session, Some(0xff00_ff00));

        view.set_resource(&color, 0);
        view.set_resource(&color, 0);
        view.clear_resource();
        view.clear_resource();

        let sent = commands(&session, &output);
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[3].1, Command::ViewSetResource { resource: ids::NULL, flags: 0 });
        assert!(view.resource().is_none());
    }

    #[test]
    fn test_remove_resource_releases_it() {
        let (session, output) = memory_session();
        let view = View::create(&session, None, ViewOptions::new().color(0xff11_2233));
        let color_id = view.resource().map(|(r, _)| r.id()).expect("attached");

        view.remove_resource();

        let sent = commands(&session, &output);
        assert_eq!(sent.last(), Some(&(color_id, Command::Remove)));
        // A new request for the same color allocates again.
        let again = Resource::color(&session, Some(0xff11_2233));
        assert_ne!(again.id(), color_id);
    }

    #[test]
    fn test_remove_detaches_from_parent() {
        // Arrange
        let (session, output) = memory_session();
        let parent = View::create(&session, None, ViewOptions::new());
        let child = parent.child(ViewOptions::new().bounds(0, 0, 10, 10));

        // Act
        parent.remove(Timing::Immediate);

        // Assert
        assert!(session.root().children().is_empty());
        assert_eq!(session.lock_state().views.len(), 1);
        let sent = commands(&session, &output);
        assert_eq!(sent.last(), Some(&(parent.id(), Command::ViewRemove { animation: 0 })));
        // Updates to views that are gone are ignored.
        child.set_visible(false, Timing::Immediate);
        assert_eq!(commands(&session, &output).len(), 0);
    }

    #[test]
    fn test_child_of_removed_view_is_created_under_root() {
        // Arrange
        let (session, output) = memory_session();
        let parent = View::create(&session, None, ViewOptions::new());
        parent.remove(Timing::Immediate);
        commands(&session, &output);

        // Act
        let child = parent.child(ViewOptions::new().bounds(0, 0, 10, 10));

        // Assert
        assert_eq!(child.parent(), Some(session.root()));
        assert_eq!(session.root().children(), vec![child.clone()]);
        let sent = commands(&session, &output);
        assert_eq!(
            sent,
            vec![(
                child.id(),
                Command::ViewAdd { parent: ids::ROOT_VIEW, x: 0, y: 0, width: 10, height: 10, visible: true }
            )]
        );
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let (session, output) = memory_session();

        session.root().remove(Timing::Immediate);

        assert!(commands(&session, &output).is_empty());
        assert_eq!(session.root().bounds(), Bounds::new(0, 0, 640, 480));
    }

    #[test]
    fn test_create_with_text_content_attaches_text() {
        let (session, output) = memory_session();

        let view = View::create(&session, None, ViewOptions::new().transparency(0.5).text("hi"));

        let ids: Vec<_> = commands(&session, &output).iter().map(|(_, c)| c.id()).collect();
        assert_eq!(
            ids,
            vec![
                CommandId::ViewAdd,
                CommandId::ViewSetTransparency,
                CommandId::AddFont,
                CommandId::AddColor,
                CommandId::AddText,
                CommandId::ViewSetResource,
            ]
        );
        assert_eq!(view.resource().map(|(r, _)| r.kind()), Some(ResourceKind::Text));
    }
}
