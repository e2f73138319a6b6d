use crate::resolve::{DropSlot, DropTarget};
use crate::session::DragEvent;

/// The drop preview currently on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GhostPreview {
    pub target: DropTarget,
    pub slot: DropSlot,
}

/// Keeps at most one drop preview alive.
///
/// The preview never touches the expression tree; it is a slot the renderer
/// draws a placeholder into.
#[derive(Debug, Default)]
pub struct GhostController {
    current: Option<GhostPreview>,
}

impl GhostController {
    pub fn current(&self) -> Option<&GhostPreview> {
        self.current.as_ref()
    }

    #[inline]
    pub fn is_shown(&self) -> bool {
        self.current.is_some()
    }

    /// Replace the preview. Showing the same placement twice is not skipped.
    pub fn show(&mut self, target: DropTarget, slot: DropSlot) -> DragEvent {
        self.current = Some(GhostPreview { target, slot });
        DragEvent::GhostChanged { target, slot }
    }

    /// Remove the preview; yields an event only if one was shown.
    pub fn clear(&mut self) -> Option<DragEvent> {
        self.current.take().map(|_| DragEvent::GhostCleared)
    }
}
