use log::{debug, error, warn};

use crate::config::DragConfig;
use crate::error::DragError;
use crate::ghost::{GhostController, GhostPreview};
use crate::layout::DragLayout;
use crate::resolve::{self, DropSlot, DropTarget};
use crate::stepper::{KeyboardStepper, StepDirection};
use crate::tree::{Condition, ExpressionTree, ItemId};
use crate::zones::{Anchor, DropZoneIndex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragMode {
    Pointer,
    Keyboard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging(DragMode),
}

/// Keys a drag session reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragKey {
    Up,
    Down,
    Enter,
    Space,
    Escape,
    Tab,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyPress {
    pub key: DragKey,
    /// Generated by holding the key down.
    pub repeat: bool,
}

impl KeyPress {
    pub fn new(key: DragKey) -> Self {
        Self { key, repeat: false }
    }

    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }
}

/// Where the renderer should put focus once its next render pass is done.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusIntent {
    /// The n-th condition chip in display order. Groups are not counted.
    Chip(usize),
    /// The drag handle of the drop preview.
    DropGhostHandle,
    /// The drag handle of the item that was picked up.
    SourceHandle(ItemId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragEvent {
    SourceHidden(ItemId),
    SourceRestored(ItemId),
    GhostChanged { target: DropTarget, slot: DropSlot },
    GhostCleared,
    TreeMutated,
    FocusRequested(FocusIntent),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropOutcome {
    /// The item moved; `focus_index` is its chip position after the move.
    Moved { focus_index: usize },
    /// The drop resolved to where the item already was.
    Unchanged,
    /// Nothing to drop on; the session was cancelled.
    Cancelled,
    /// The drop could not be applied and the tree was left untouched.
    Aborted(DragError),
}

#[derive(Debug, Clone)]
enum SessionInput {
    Pointer,
    /// The stepper is built on the first key press.
    Keyboard(Option<KeyboardStepper>),
}

/// One pick-up-to-drop (or cancel) cycle.
#[derive(Debug, Clone)]
pub struct DragSession {
    source: ItemId,
    input: SessionInput,
    target: Option<DropTarget>,
    source_hidden: bool,
}

impl DragSession {
    #[inline]
    pub fn source(&self) -> ItemId {
        self.source
    }

    pub fn mode(&self) -> DragMode {
        match self.input {
            SessionInput::Pointer => DragMode::Pointer,
            SessionInput::Keyboard(_) => DragMode::Keyboard,
        }
    }

    #[inline]
    pub fn target(&self) -> Option<DropTarget> {
        self.target
    }

    pub fn insert_after(&self) -> Option<bool> {
        self.target.map(|target| target.insert_after())
    }

    #[inline]
    pub fn is_source_hidden(&self) -> bool {
        self.source_hidden
    }

    pub fn stepper(&self) -> Option<&KeyboardStepper> {
        match &self.input {
            SessionInput::Keyboard(stepper) => stepper.as_ref(),
            SessionInput::Pointer => None,
        }
    }

    /// Net key-press displacement; `None` for pointer sessions.
    pub fn step_offset(&self) -> Option<isize> {
        match &self.input {
            SessionInput::Keyboard(stepper) => {
                Some(stepper.as_ref().map_or(0, KeyboardStepper::step_offset))
            }
            SessionInput::Pointer => None,
        }
    }
}

/// Drives pointer and keyboard drag sessions over an [`ExpressionTree`].
///
/// All calls run to completion; the tree is only written when a drop is
/// committed. Notifications for the renderer queue up until
/// [`DragEngine::take_events`] drains them.
pub struct DragEngine<E> {
    tree: ExpressionTree<E>,
    config: DragConfig,
    session: Option<DragSession>,
    ghost: GhostController,
    events: Vec<DragEvent>,
    pending_focus: Option<FocusIntent>,
    pending_blur_cancel: bool,
}

impl<E> DragEngine<E> {
    pub fn new(tree: ExpressionTree<E>) -> Self {
        Self {
            tree,
            config: DragConfig::default(),
            session: None,
            ghost: GhostController::default(),
            events: Vec::new(),
            pending_focus: None,
            pending_blur_cancel: false,
        }
    }

    pub fn config(mut self, config: DragConfig) -> Self {
        self.config = config;
        self
    }

    pub fn drag_config(&self) -> &DragConfig {
        &self.config
    }

    pub fn tree(&self) -> &ExpressionTree<E> {
        &self.tree
    }

    /// Edit the tree outside of a drop. Edits made while a session is active
    /// may invalidate it; the session then aborts on its next call.
    pub fn tree_mut(&mut self) -> &mut ExpressionTree<E> {
        &mut self.tree
    }

    pub fn into_tree(self) -> ExpressionTree<E> {
        self.tree
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> DragState {
        match &self.session {
            Some(session) => DragState::Dragging(session.mode()),
            None => DragState::Idle,
        }
    }

    pub fn ghost(&self) -> Option<&GhostPreview> {
        self.ghost.current()
    }

    pub fn drop_zones<'a>(&'a self, layout: &'a dyn DragLayout) -> DropZoneIndex<'a, E> {
        let index = DropZoneIndex::new(&self.tree, layout);
        match &self.session {
            Some(session) => index.dragging(session.source),
            None => index,
        }
    }

    pub fn take_events(&mut self) -> Vec<DragEvent> {
        std::mem::take(&mut self.events)
    }

    /// The latest focus request, for the renderer to apply after it has
    /// rendered the current state.
    pub fn take_focus_intent(&mut self) -> Option<FocusIntent> {
        self.pending_focus.take()
    }

    fn emit(&mut self, event: DragEvent) {
        if let DragEvent::FocusRequested(intent) = event {
            self.pending_focus = Some(intent);
        }
        self.events.push(event);
    }

    fn hide_source(&mut self) {
        if let Some(session) = self.session.as_mut()
            && !session.source_hidden
        {
            session.source_hidden = true;
            let source = session.source;
            self.emit(DragEvent::SourceHidden(source));
        }
    }

    fn clear_target(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.target = None;
        }
        if let Some(event) = self.ghost.clear() {
            self.emit(event);
        }
    }

    fn end_session(&mut self, session: &DragSession, restore_focus: bool) {
        self.pending_blur_cancel = false;
        if let Some(event) = self.ghost.clear() {
            self.emit(event);
        }
        if !self.tree.contains(session.source) {
            return;
        }
        if session.source_hidden {
            self.emit(DragEvent::SourceRestored(session.source));
        }
        if restore_focus
            && session.mode() == DragMode::Keyboard
            && self.config.restore_focus_on_cancel
        {
            self.emit(DragEvent::FocusRequested(FocusIntent::SourceHandle(
                session.source,
            )));
        }
    }

    fn abort(&mut self, err: DragError) {
        warn!("drag abandoned: {err}");
        if let Some(session) = self.session.take() {
            self.end_session(&session, false);
        }
    }

    /// Point the session and the preview at `target`.
    ///
    /// Unless `force` is set, a target equal to the current one is left alone.
    fn retarget(&mut self, target: DropTarget, force: bool) -> bool {
        let slot = match resolve::insertion_slot(&self.tree, target) {
            Ok(slot) => slot,
            Err(err) => {
                self.abort(err);
                return false;
            }
        };
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !force && session.target == Some(target) {
            return false;
        }
        session.target = Some(target);
        let event = self.ghost.show(target, slot);
        self.emit(event);
        true
    }

    /// End the session without touching the tree.
    pub fn cancel_drag(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        debug!("drag of {} cancelled", session.source);
        self.end_session(&session, true);
        true
    }

    /// The chip handle of a keyboard session lost focus before the first
    /// step; the pick-up is dropped silently.
    pub fn drag_handle_blurred(&mut self) -> bool {
        let idle_pick_up = self
            .session
            .as_ref()
            .is_some_and(|s| s.mode() == DragMode::Keyboard && !s.source_hidden);
        if !idle_pick_up {
            return false;
        }
        if let Some(session) = self.session.take() {
            self.end_session(&session, false);
        }
        true
    }

    /// Focus left the tree while a keyboard preview is shown. Whether the
    /// session survives is decided by [`DragEngine::focus_settled`].
    pub fn focus_lost(&mut self) -> bool {
        let previewing = self.ghost.is_shown()
            && self
                .session
                .as_ref()
                .is_some_and(|s| s.mode() == DragMode::Keyboard);
        if previewing {
            self.pending_blur_cancel = true;
        }
        previewing
    }

    /// Focus has settled after a [`DragEngine::focus_lost`]. Unless it landed
    /// on the drop preview's own handle, the keyboard session is cancelled.
    pub fn focus_settled(&mut self, on_drop_ghost_handle: bool) -> bool {
        if !std::mem::take(&mut self.pending_blur_cancel) || on_drop_ghost_handle {
            return false;
        }
        let Some(session) = self.session.take() else {
            return false;
        };
        debug!("keyboard drag of {} cancelled by focus loss", session.source);
        self.end_session(&session, false);
        true
    }
}

impl<E: Condition> DragEngine<E> {
    /// Pick up `source`. Refused while another session is active.
    pub fn start_drag(&mut self, source: ItemId, mode: DragMode) -> Result<(), DragError> {
        if self.session.is_some() {
            warn!("ignoring pick-up of {source}: a drag is already in progress");
            return Err(DragError::SessionActive);
        }
        let item = self
            .tree
            .get(source)
            .ok_or(DragError::UnknownSource(source))?;
        if item.parent().is_none() {
            return Err(DragError::RootNotDraggable);
        }
        if item.is_group() && !self.config.allow_group_drag {
            return Err(DragError::GroupDragDisabled);
        }

        let input = match mode {
            DragMode::Pointer => SessionInput::Pointer,
            DragMode::Keyboard => SessionInput::Keyboard(None),
        };
        self.session = Some(DragSession {
            source,
            input,
            target: None,
            source_hidden: false,
        });
        self.pending_blur_cancel = false;
        if mode == DragMode::Pointer {
            self.hide_source();
        }
        debug!("picked up {source} ({mode:?})");
        Ok(())
    }

    /// The pointer moved over `anchor`. Returns whether the preview moved.
    pub fn hover_over(&mut self, anchor: Anchor, layout: &dyn DragLayout) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        if session.mode() != DragMode::Pointer {
            return false;
        }
        let source = session.source;
        if !self.tree.contains(source) {
            self.abort(DragError::StaleSource(source));
            return false;
        }
        if let Some(id) = anchor.item()
            && !self.tree.contains(id)
        {
            self.abort(DragError::StaleTarget(id));
            return false;
        }
        if !DropZoneIndex::new(&self.tree, layout)
            .dragging(source)
            .accepts(anchor)
        {
            return false;
        }

        let target = match anchor {
            Anchor::AddCondition => DropTarget::Append,
            Anchor::Chip(_) | Anchor::GroupRoot(_) => {
                let (Some(ghost), Some(bounds)) =
                    (layout.drag_ghost_bounds(), layout.anchor_bounds(anchor))
                else {
                    debug!("no geometry for {anchor:?}; hover ignored");
                    return false;
                };
                let insert_after = resolve::ghost_in_lower_part(ghost, bounds);
                match resolve::resolve_anchor(&self.tree, anchor, insert_after) {
                    Ok(target) => target,
                    Err(err) => {
                        self.abort(err);
                        return false;
                    }
                }
            }
        };
        self.retarget(target, false)
    }

    /// The pointer left the anchor it was over. The preview stays while the
    /// dragged ghost is still on the preview's row.
    pub fn pointer_leave(&mut self, layout: &dyn DragLayout) -> bool {
        let previewing = self
            .session
            .as_ref()
            .is_some_and(|s| s.mode() == DragMode::Pointer && s.target.is_some());
        if !previewing {
            return false;
        }
        if let (Some(drag_ghost), Some(drop_ghost)) =
            (layout.drag_ghost_bounds(), layout.drop_ghost_bounds())
            && resolve::is_on_same_row(drag_ghost, drop_ghost, self.config.row_tolerance)
        {
            return false;
        }
        self.clear_target();
        true
    }

    /// The pointer was released away from any drop zone: drop onto the
    /// preview if there is one, cancel otherwise.
    pub fn release_pointer(&mut self) -> DropOutcome {
        let Some(session) = &self.session else {
            return DropOutcome::Aborted(DragError::NoSession);
        };
        if session.target.is_some() {
            self.commit_drop()
        } else {
            self.cancel_drag();
            DropOutcome::Cancelled
        }
    }

    /// The pointer was released over `anchor`.
    pub fn drop_on(&mut self, anchor: Anchor) -> DropOutcome {
        let Some(session) = &self.session else {
            return DropOutcome::Aborted(DragError::NoSession);
        };
        if anchor.item() == Some(session.source) {
            self.cancel_drag();
            return DropOutcome::Unchanged;
        }
        self.commit_drop()
    }

    /// Move the keyboard preview one position. Returns whether it moved.
    pub fn step_drag(&mut self, direction: StepDirection, layout: &dyn DragLayout) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        if session.mode() != DragMode::Keyboard {
            return false;
        }
        let source = session.source;
        let needs_stepper = session.stepper().is_none();
        if !self.tree.contains(source) {
            self.abort(DragError::StaleSource(source));
            return false;
        }

        if needs_stepper {
            let locations = DropZoneIndex::new(&self.tree, layout)
                .dragging(source)
                .drop_locations();
            match KeyboardStepper::new(locations, source) {
                Ok(stepper) => {
                    if let Some(session) = self.session.as_mut() {
                        session.input = SessionInput::Keyboard(Some(stepper));
                    }
                }
                Err(err) => {
                    error!("dragged expression {source} not found among drop locations");
                    self.abort(err);
                    return false;
                }
            }
            self.hide_source();
        }

        let Some(DragSession {
            input: SessionInput::Keyboard(Some(stepper)),
            ..
        }) = self.session.as_mut()
        else {
            return false;
        };
        let Some(target) = stepper.step(direction) else {
            return false;
        };
        if !self.retarget(target, true) {
            return false;
        }
        self.emit(DragEvent::FocusRequested(FocusIntent::DropGhostHandle));
        true
    }

    /// Route a key press to the active session. Returns whether it was used.
    pub fn handle_key(&mut self, press: KeyPress, layout: &dyn DragLayout) -> bool {
        if self.session.is_none() || press.repeat {
            return false;
        }
        let keyboard = self.state() == DragState::Dragging(DragMode::Keyboard);
        match press.key {
            DragKey::Escape => self.cancel_drag(),
            DragKey::Up if keyboard => {
                self.step_drag(StepDirection::Up, layout);
                true
            }
            DragKey::Down if keyboard => {
                self.step_drag(StepDirection::Down, layout);
                true
            }
            DragKey::Enter | DragKey::Space if keyboard => {
                self.commit_drop();
                true
            }
            _ => false,
        }
    }

    /// A chip's drag handle received focus: start a keyboard session for it,
    /// replacing a keyboard pick-up that has not moved yet.
    pub fn drag_handle_focused(&mut self, item: ItemId) -> bool {
        if let Some(session) = &self.session {
            let replaceable = session.mode() == DragMode::Keyboard
                && !session.source_hidden
                && session.source != item;
            if !replaceable {
                return false;
            }
            if let Some(session) = self.session.take() {
                self.end_session(&session, false);
            }
        }
        match self.start_drag(item, DragMode::Keyboard) {
            Ok(()) => true,
            Err(err) => {
                debug!("drag handle of {item} focused but not picked up: {err}");
                false
            }
        }
    }

    /// Apply the session's drop and end it.
    pub fn commit_drop(&mut self) -> DropOutcome {
        let Some(session) = self.session.take() else {
            return DropOutcome::Aborted(DragError::NoSession);
        };

        match self.apply_drop(&session) {
            Ok(Some(focus_index)) => {
                debug!("dropped {} at chip {focus_index}", session.source);
                self.emit(DragEvent::TreeMutated);
                self.end_session(&session, false);
                self.emit(DragEvent::FocusRequested(FocusIntent::Chip(focus_index)));
                DropOutcome::Moved { focus_index }
            }
            Ok(None) if session.target.is_none() => {
                self.end_session(&session, true);
                DropOutcome::Cancelled
            }
            Ok(None) => {
                debug!("drop of {} left it in place", session.source);
                self.end_session(&session, true);
                DropOutcome::Unchanged
            }
            Err(err) => {
                warn!("drop of {} abandoned: {err}", session.source);
                self.end_session(&session, false);
                DropOutcome::Aborted(err)
            }
        }
    }

    /// Returns the focus index of the moved item, or `None` when there is
    /// nothing to move.
    fn apply_drop(&mut self, session: &DragSession) -> Result<Option<usize>, DragError> {
        let source = session.source;
        if !self.tree.contains(source) {
            return Err(DragError::StaleSource(source));
        }
        let Some(target) = session.target else {
            return Ok(None);
        };
        if target.is_on(source) {
            return Ok(None);
        }

        let slot = resolve::insertion_slot(&self.tree, target)?;
        if self.tree.is_ancestor_or_self(source, slot.group) {
            return Err(DragError::Cycle { item: source });
        }
        if slot.is_origin_of(&self.tree, source) {
            return Ok(None);
        }

        self.tree.move_item(source, slot.group, slot.index)?;
        let focus_index = self.focus_index_of(source);
        let discarded = self.tree.exit_edit_mode();
        if !discarded.is_empty() {
            debug!("discarded {} incomplete condition(s)", discarded.len());
        }
        debug_assert_eq!(self.tree.validate(), Ok(()));
        Ok(Some(focus_index))
    }

    /// Chips before `moved` (or before its first chip, for a group), skipping
    /// edited chips that are about to be discarded.
    fn focus_index_of(&self, moved: ItemId) -> usize {
        self.tree
            .leaf_list()
            .into_iter()
            .filter(|id| !self.tree.is_discarded_on_exit(*id))
            .take_while(|id| !self.tree.is_ancestor_or_self(moved, *id))
            .count()
    }
}
