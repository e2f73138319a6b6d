use serde::{Deserialize, Serialize};

use crate::error::DragError;
use crate::layout::Bounds;
use crate::tree::{ExpressionTree, ItemId};
use crate::zones::Anchor;

/// A resolved insertion point.
///
/// "Over" and "Under" are the query builder's words for inserting before and
/// after an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "at", content = "item", rename_all = "snake_case")]
pub enum DropTarget {
    Over(ItemId),
    Under(ItemId),
    /// New first child of a group, dropped on its AND/OR marker.
    GroupStart(ItemId),
    /// New last child of the root group, dropped on the append affordance.
    Append,
}

impl DropTarget {
    #[inline]
    pub fn insert_after(&self) -> bool {
        matches!(self, Self::Under(_) | Self::Append)
    }

    /// The item the preview is rendered next to, if any.
    pub fn item(&self) -> Option<ItemId> {
        match self {
            Self::Over(id) | Self::Under(id) | Self::GroupStart(id) => Some(*id),
            Self::Append => None,
        }
    }

    /// The anchor the preview is rendered next to.
    pub fn anchor<E>(&self, tree: &ExpressionTree<E>) -> Anchor {
        match self {
            Self::Over(id) | Self::Under(id) => Anchor::of(tree, *id),
            Self::GroupStart(id) => Anchor::GroupRoot(*id),
            Self::Append => Anchor::AddCondition,
        }
    }

    /// Dropping over or under the dragged item itself.
    pub fn is_on(&self, source: ItemId) -> bool {
        matches!(self, Self::Over(id) | Self::Under(id) if *id == source)
    }
}

/// A concrete sibling list and index: the preview sits before the child that
/// currently occupies `index` of `group` (`index == len` means at the end).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DropSlot {
    pub group: ItemId,
    pub index: usize,
}

impl DropSlot {
    /// Whether dropping `source` here would leave it where it already is.
    pub fn is_origin_of<E>(&self, tree: &ExpressionTree<E>, source: ItemId) -> bool {
        if tree.parent(source) != Some(self.group) {
            return false;
        }
        tree.index_in_parent(source)
            .is_some_and(|ix| self.index == ix || self.index == ix + 1)
    }
}

/// Pointer tie-break: the dragged ghost resolves "under" a target when its
/// vertical center is at or below the target's center.
pub fn ghost_in_lower_part(drag_ghost: Bounds, target: Bounds) -> bool {
    drag_ghost.center_y() >= target.center_y()
}

/// Whether the dragged ghost is roughly on the drop preview's row.
///
/// The preview's vertical span is widened on both sides by `tolerance` times
/// the ghost's height.
pub fn is_on_same_row(drag_ghost: Bounds, drop_ghost: Bounds, tolerance: f32) -> bool {
    let slack = drag_ghost.height * tolerance;
    !(drag_ghost.bottom() < drop_ghost.top - slack || drag_ghost.top > drop_ghost.bottom() + slack)
}

/// Map an anchor plus an over/under decision to a drop target.
///
/// AND/OR markers have no sibling slot of their own: dropping under a marker,
/// or anywhere on the root marker, lands over the group's first child, and
/// dropping over a nested marker makes the item the group's new first child.
/// The append affordance always means "last child of the root".
pub fn resolve_anchor<E>(
    tree: &ExpressionTree<E>,
    anchor: Anchor,
    insert_after: bool,
) -> Result<DropTarget, DragError> {
    match anchor {
        Anchor::AddCondition => Ok(DropTarget::Append),
        Anchor::Chip(id) => {
            if !tree.contains(id) {
                return Err(DragError::StaleTarget(id));
            }
            Ok(if insert_after {
                DropTarget::Under(id)
            } else {
                DropTarget::Over(id)
            })
        }
        Anchor::GroupRoot(group) => {
            if !tree.is_group(group) {
                return Err(DragError::StaleTarget(group));
            }
            let is_root = tree.parent(group).is_none();
            if insert_after || is_root {
                Ok(tree
                    .first_child(group)
                    .map(DropTarget::Over)
                    .unwrap_or(DropTarget::GroupStart(group)))
            } else {
                Ok(DropTarget::GroupStart(group))
            }
        }
    }
}

/// Turn a target into the slot it denotes in the current tree.
pub fn insertion_slot<E>(tree: &ExpressionTree<E>, target: DropTarget) -> Result<DropSlot, DragError> {
    match target {
        DropTarget::Over(id) | DropTarget::Under(id) => {
            let group = tree.parent(id).ok_or(DragError::StaleTarget(id))?;
            let index = tree.index_in_parent(id).ok_or(DragError::StaleTarget(id))?;
            Ok(DropSlot {
                group,
                index: index + target.insert_after() as usize,
            })
        }
        DropTarget::GroupStart(group) => {
            if !tree.is_group(group) {
                return Err(DragError::StaleTarget(group));
            }
            Ok(DropSlot { group, index: 0 })
        }
        DropTarget::Append => {
            let group = tree.root();
            Ok(DropSlot {
                group,
                index: tree.children(group).len(),
            })
        }
    }
}
