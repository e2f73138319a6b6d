use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::zones::Anchor;

/// An axis-aligned box in the renderer's coordinate space (y grows downward).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A full-width row, handy when only vertical placement matters.
    pub fn row(top: f32, height: f32) -> Self {
        Self::new(0., top, 0., height)
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    #[inline]
    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom()) / 2.
    }
}

/// Geometry and visibility answers supplied by the rendering layer.
///
/// The engine never measures anything itself; every decision that depends on
/// the on-screen layout goes through this trait.
pub trait DragLayout {
    /// Bounds of the ghost following the pointer, if one is rendered.
    fn drag_ghost_bounds(&self) -> Option<Bounds>;

    /// Bounds of a drop anchor, if it is rendered.
    fn anchor_bounds(&self, anchor: Anchor) -> Option<Bounds>;

    /// Bounds of the drop preview (the placeholder at the resolved slot).
    fn drop_ghost_bounds(&self) -> Option<Bounds> {
        None
    }

    /// Whether the anchor is currently shown, e.g. not inside a collapsed group.
    fn is_anchor_visible(&self, _anchor: Anchor) -> bool {
        true
    }
}

/// A layout where everything is visible and nothing has geometry.
///
/// Enough for keyboard sessions, which never look at bounds.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyboardOnlyLayout;

impl DragLayout for KeyboardOnlyLayout {
    fn drag_ghost_bounds(&self) -> Option<Bounds> {
        None
    }

    fn anchor_bounds(&self, _anchor: Anchor) -> Option<Bounds> {
        None
    }
}

/// Geometry captured once per frame by the renderer.
#[derive(Clone, Debug, Default)]
pub struct LayoutSnapshot {
    drag_ghost: Option<Bounds>,
    drop_ghost: Option<Bounds>,
    anchors: HashMap<Anchor, Bounds>,
    hidden: HashSet<Anchor>,
}

impl LayoutSnapshot {
    pub fn drag_ghost(mut self, bounds: Bounds) -> Self {
        self.drag_ghost = Some(bounds);
        self
    }

    pub fn drop_ghost(mut self, bounds: Bounds) -> Self {
        self.drop_ghost = Some(bounds);
        self
    }

    pub fn anchor(mut self, anchor: Anchor, bounds: Bounds) -> Self {
        self.anchors.insert(anchor, bounds);
        self
    }

    /// Mark an anchor as not rendered, e.g. a chip in a collapsed group.
    pub fn hide(mut self, anchor: Anchor) -> Self {
        self.hidden.insert(anchor);
        self
    }

    pub fn set_drag_ghost(&mut self, bounds: Option<Bounds>) {
        self.drag_ghost = bounds;
    }

    pub fn set_drop_ghost(&mut self, bounds: Option<Bounds>) {
        self.drop_ghost = bounds;
    }
}

impl DragLayout for LayoutSnapshot {
    fn drag_ghost_bounds(&self) -> Option<Bounds> {
        self.drag_ghost
    }

    fn anchor_bounds(&self, anchor: Anchor) -> Option<Bounds> {
        if self.hidden.contains(&anchor) {
            return None;
        }
        self.anchors.get(&anchor).copied()
    }

    fn drop_ghost_bounds(&self) -> Option<Bounds> {
        self.drop_ghost
    }

    fn is_anchor_visible(&self, anchor: Anchor) -> bool {
        !self.hidden.contains(&anchor)
    }
}
