use crate::layout::DragLayout;
use crate::resolve::DropTarget;
use crate::tree::{ExpressionTree, ItemId};

/// An on-screen position that can receive a drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// A condition chip.
    Chip(ItemId),
    /// The AND/OR marker rendered at the top of a group.
    GroupRoot(ItemId),
    /// The trailing "add condition" affordance of the root group.
    AddCondition,
}

impl Anchor {
    /// The anchor representing `id` on screen.
    pub fn of<E>(tree: &ExpressionTree<E>, id: ItemId) -> Self {
        if tree.is_group(id) {
            Self::GroupRoot(id)
        } else {
            Self::Chip(id)
        }
    }

    pub fn item(&self) -> Option<ItemId> {
        match self {
            Self::Chip(id) | Self::GroupRoot(id) => Some(*id),
            Self::AddCondition => None,
        }
    }
}

/// Pre-order list of every item of the tree.
pub fn build_expression_list<E>(tree: &ExpressionTree<E>) -> Vec<ItemId> {
    tree.expression_list()
}

/// Flattened, order-preserving view of the drop positions of one tree.
///
/// Built fresh from the current tree and layout whenever it is needed. Anchors
/// that are hidden, and every anchor of the item being dragged, are left out.
pub struct DropZoneIndex<'a, E> {
    tree: &'a ExpressionTree<E>,
    layout: &'a dyn DragLayout,
    dragged: Option<ItemId>,
}

impl<'a, E> DropZoneIndex<'a, E> {
    pub fn new(tree: &'a ExpressionTree<E>, layout: &'a dyn DragLayout) -> Self {
        Self {
            tree,
            layout,
            dragged: None,
        }
    }

    pub fn dragging(mut self, source: ItemId) -> Self {
        self.dragged = Some(source);
        self
    }

    fn is_dragged(&self, id: ItemId) -> bool {
        self.dragged
            .is_some_and(|source| self.tree.is_ancestor_or_self(source, id))
    }

    fn is_visible(&self, anchor: Anchor) -> bool {
        self.layout.is_anchor_visible(anchor)
    }

    /// Whether `id` would be hidden from view because an enclosing group's
    /// marker is hidden.
    fn is_inside_hidden_group(&self, id: ItemId) -> bool {
        let mut current = self.tree.parent(id);
        while let Some(group) = current {
            if group != self.tree.root() && !self.is_visible(Anchor::GroupRoot(group)) {
                return true;
            }
            current = self.tree.parent(group);
        }
        false
    }

    /// Visible items in pre-order, excluding the dragged subtree.
    pub fn expression_list(&self) -> Vec<ItemId> {
        let mut out = Vec::new();
        self.push_expressions(self.tree.root(), &mut out);
        out
    }

    fn push_expressions(&self, id: ItemId, out: &mut Vec<ItemId>) {
        if self.is_dragged(id) {
            return;
        }
        let anchor = Anchor::of(self.tree, id);
        if id != self.tree.root() && !self.is_visible(anchor) {
            return;
        }
        out.push(id);
        for &child in self.tree.children(id) {
            self.push_expressions(child, out);
        }
    }

    /// Visible anchors in display order, ending with the append affordance.
    pub fn anchors(&self) -> Vec<Anchor> {
        let mut out = Vec::new();
        let root = self.tree.root();
        if self.is_visible(Anchor::GroupRoot(root)) {
            out.push(Anchor::GroupRoot(root));
        }
        for &child in self.tree.children(root) {
            self.push_anchors(child, &mut out);
        }
        if self.is_visible(Anchor::AddCondition) {
            out.push(Anchor::AddCondition);
        }
        out
    }

    fn push_anchors(&self, id: ItemId, out: &mut Vec<Anchor>) {
        if self.is_dragged(id) {
            return;
        }
        let anchor = Anchor::of(self.tree, id);
        if !self.is_visible(anchor) {
            return;
        }
        out.push(anchor);
        for &child in self.tree.children(id) {
            self.push_anchors(child, out);
        }
    }

    /// Whether a hover over `anchor` can be resolved to a drop position.
    pub fn accepts(&self, anchor: Anchor) -> bool {
        match anchor {
            Anchor::AddCondition => self.is_visible(anchor),
            Anchor::Chip(id) | Anchor::GroupRoot(id) => {
                self.tree.contains(id)
                    && Anchor::of(self.tree, id) == anchor
                    && !self.is_dragged(id)
                    && (id == self.tree.root() || self.is_visible(anchor))
                    && !self.is_inside_hidden_group(id)
            }
        }
    }

    /// Every insertion gap of the tree in display order.
    ///
    /// Each group contributes the slot under its AND/OR marker (named after the
    /// group, so a hidden first chip is never a target), the slot under each of its children, and, unless it is the root,
    /// the slot under the whole group. The dragged item and groups with a
    /// hidden marker are walked as a single unit. The last entry is always the
    /// append position of the root group.
    pub fn drop_locations(&self) -> Vec<DropTarget> {
        let mut out = Vec::new();
        self.push_locations(self.tree.root(), &mut out);
        out
    }

    fn push_locations(&self, group: ItemId, out: &mut Vec<DropTarget>) {
        let children = self.tree.children(group);
        if !children.is_empty() {
            out.push(DropTarget::GroupStart(group));
        }

        for &child in children {
            let walk_into = self.tree.is_group(child)
                && self.dragged != Some(child)
                && self.is_visible(Anchor::GroupRoot(child));
            if walk_into {
                self.push_locations(child, out);
            } else if self.tree.is_group(child)
                || self.dragged == Some(child)
                || self.is_visible(Anchor::Chip(child))
            {
                out.push(DropTarget::Under(child));
            }
        }

        if group != self.tree.root() {
            out.push(DropTarget::Under(group));
        }
    }
}
