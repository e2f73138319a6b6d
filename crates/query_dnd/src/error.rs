use thiserror::Error;

use crate::tree::ItemId;

/// Structural errors raised by [`crate::ExpressionTree`] edits and validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("item {0} is not part of the tree")]
    UnknownItem(ItemId),
    #[error("item {0} is not a group")]
    NotAGroup(ItemId),
    #[error("the root group cannot be removed")]
    RootRemoval,
    #[error("item {item} cannot be placed inside its own subtree {group}")]
    Cycle { item: ItemId, group: ItemId },
    #[error("items to group must share the same parent")]
    NotSiblings,
    #[error("no items given")]
    EmptySelection,
    #[error("group {0} has no children")]
    EmptyGroup(ItemId),
    #[error("item {item} claims parent {parent} which does not own it")]
    ParentMismatch { item: ItemId, parent: ItemId },
    #[error("group {group} lists child {child} more than once")]
    DuplicateChild { group: ItemId, child: ItemId },
    #[error("item {0} is not reachable from the root")]
    Orphan(ItemId),
}

/// Reasons a drag operation was refused or abandoned.
///
/// None of these are fatal: the engine stays (or returns to) a consistent
/// idle state and the tree is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DragError {
    #[error("a drag session is already active")]
    SessionActive,
    #[error("no drag session is active")]
    NoSession,
    #[error("drag source {0} is not part of the tree")]
    UnknownSource(ItemId),
    #[error("the root group cannot be dragged")]
    RootNotDraggable,
    #[error("dragging groups is disabled")]
    GroupDragDisabled,
    #[error("drag source {0} is no longer part of the tree")]
    StaleSource(ItemId),
    #[error("drop target {0} is no longer part of the tree")]
    StaleTarget(ItemId),
    #[error("cannot drop {item} inside its own subtree")]
    Cycle { item: ItemId },
    #[error(transparent)]
    Tree(#[from] TreeError),
}
