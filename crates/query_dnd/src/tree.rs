use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::TreeError;

/// Stable handle of an item inside an [`ExpressionTree`].
///
/// Handles are never reused, so a handle to a removed item stays invalid.
/// The tree only grows: a freed slot is left empty rather than recycled, and
/// one tree can hand out at most `u32::MAX` handles over its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(u32);

impl ItemId {
    #[inline]
    fn ix(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilteringLogic {
    #[default]
    And,
    Or,
}

impl FilteringLogic {
    pub fn toggled(self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }
}

/// Capability the engine needs from an otherwise opaque condition payload.
pub trait Condition {
    /// Whether the condition survives leaving edit mode.
    ///
    /// Chips that are being edited and return `false` here are discarded once
    /// a drop completes, so they are never counted as focus positions.
    fn is_committable(&self) -> bool {
        true
    }
}

impl Condition for String {
    fn is_committable(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Condition for &'static str {
    fn is_committable(&self) -> bool {
        !self.trim().is_empty()
    }
}

/// A plain, owned expression tree used to build an [`ExpressionTree`] and to
/// snapshot it for structural comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ExpressionNode<E> {
    Group {
        operator: FilteringLogic,
        children: Vec<ExpressionNode<E>>,
    },
    Condition {
        expression: E,
    },
}

impl<E> ExpressionNode<E> {
    pub fn and(children: impl Into<Vec<ExpressionNode<E>>>) -> Self {
        Self::Group {
            operator: FilteringLogic::And,
            children: children.into(),
        }
    }

    pub fn or(children: impl Into<Vec<ExpressionNode<E>>>) -> Self {
        Self::Group {
            operator: FilteringLogic::Or,
            children: children.into(),
        }
    }

    pub fn condition(expression: E) -> Self {
        Self::Condition { expression }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionGroup {
    pub operator: FilteringLogic,
    children: Vec<ItemId>,
}

impl ExpressionGroup {
    #[inline]
    pub fn children(&self) -> &[ItemId] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionOperand<E> {
    pub expression: E,
    pub in_edit_mode: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind<E> {
    Group(ExpressionGroup),
    Operand(ExpressionOperand<E>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionItem<E> {
    parent: Option<ItemId>,
    kind: ItemKind<E>,
}

impl<E> ExpressionItem<E> {
    #[inline]
    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    #[inline]
    pub fn kind(&self) -> &ItemKind<E> {
        &self.kind
    }

    #[inline]
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ItemKind::Group(_))
    }

    pub fn as_group(&self) -> Option<&ExpressionGroup> {
        match &self.kind {
            ItemKind::Group(group) => Some(group),
            ItemKind::Operand(_) => None,
        }
    }

    pub fn as_operand(&self) -> Option<&ExpressionOperand<E>> {
        match &self.kind {
            ItemKind::Operand(operand) => Some(operand),
            ItemKind::Group(_) => None,
        }
    }
}

/// A boolean filter-expression tree: nested AND/OR groups whose ordered
/// children are conditions or further groups.
///
/// Items are stored in an arena and refer to each other by [`ItemId`]. The
/// `parent` link of every item is the only record of the tree's shape; a group
/// lists its children in display order.
#[derive(Debug, Clone)]
pub struct ExpressionTree<E> {
    items: Vec<Option<ExpressionItem<E>>>,
    root: ItemId,
    live: usize,
}

impl<E> ExpressionTree<E> {
    /// Create a tree holding only an empty root group.
    pub fn new(operator: FilteringLogic) -> Self {
        Self {
            items: vec![Some(ExpressionItem {
                parent: None,
                kind: ItemKind::Group(ExpressionGroup {
                    operator,
                    children: Vec::new(),
                }),
            })],
            root: ItemId(0),
            live: 1,
        }
    }

    /// Build a tree from a value snapshot.
    ///
    /// A bare condition is wrapped in an AND root group. Nested groups that end
    /// up without children are dropped.
    pub fn from_node(node: ExpressionNode<E>) -> Self {
        match node {
            ExpressionNode::Group { operator, children } => {
                let mut tree = Self::new(operator);
                let root = tree.root;
                for child in children {
                    tree.push_node(root, child);
                }
                tree
            }
            condition @ ExpressionNode::Condition { .. } => {
                let mut tree = Self::new(FilteringLogic::And);
                let root = tree.root;
                tree.push_node(root, condition);
                tree
            }
        }
    }

    fn push_node(&mut self, parent: ItemId, node: ExpressionNode<E>) {
        match node {
            ExpressionNode::Condition { expression } => {
                let id = self.alloc(
                    Some(parent),
                    ItemKind::Operand(ExpressionOperand {
                        expression,
                        in_edit_mode: false,
                    }),
                );
                self.children_mut(parent).push(id);
            }
            ExpressionNode::Group { operator, children } => {
                let id = self.alloc(
                    Some(parent),
                    ItemKind::Group(ExpressionGroup {
                        operator,
                        children: Vec::new(),
                    }),
                );
                self.children_mut(parent).push(id);
                for child in children {
                    self.push_node(id, child);
                }
                if self.children(id).is_empty() {
                    self.children_mut(parent).pop();
                    self.free_slot(id);
                }
            }
        }
    }

    fn alloc(&mut self, parent: Option<ItemId>, kind: ItemKind<E>) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        self.items.push(Some(ExpressionItem { parent, kind }));
        self.live += 1;
        id
    }

    fn free_slot(&mut self, id: ItemId) {
        if let Some(slot) = self.items.get_mut(id.ix())
            && slot.take().is_some()
        {
            self.live -= 1;
        }
    }

    #[inline]
    pub fn root(&self) -> ItemId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: ItemId) -> Option<&ExpressionItem<E>> {
        self.items.get(id.ix()).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: ItemId) -> Option<&mut ExpressionItem<E>> {
        self.items.get_mut(id.ix()).and_then(Option::as_mut)
    }

    #[inline]
    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live items, groups included.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.get(id).and_then(|item| item.parent)
    }

    /// Children of a group; empty for conditions and unknown ids.
    pub fn children(&self, id: ItemId) -> &[ItemId] {
        self.group(id).map(|group| group.children()).unwrap_or(&[])
    }

    fn children_mut(&mut self, id: ItemId) -> &mut Vec<ItemId> {
        match self.get_mut(id).map(|item| &mut item.kind) {
            Some(ItemKind::Group(group)) => &mut group.children,
            _ => unreachable!("{id} is not a live group"),
        }
    }

    pub fn group(&self, id: ItemId) -> Option<&ExpressionGroup> {
        self.get(id).and_then(ExpressionItem::as_group)
    }

    pub fn operand(&self, id: ItemId) -> Option<&ExpressionOperand<E>> {
        self.get(id).and_then(ExpressionItem::as_operand)
    }

    pub fn operand_mut(&mut self, id: ItemId) -> Option<&mut ExpressionOperand<E>> {
        match self.get_mut(id).map(|item| &mut item.kind) {
            Some(ItemKind::Operand(operand)) => Some(operand),
            _ => None,
        }
    }

    #[inline]
    pub fn is_group(&self, id: ItemId) -> bool {
        self.group(id).is_some()
    }

    pub fn first_child(&self, group: ItemId) -> Option<ItemId> {
        self.children(group).first().copied()
    }

    pub fn index_in_parent(&self, id: ItemId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    /// Whether `item` is `ancestor` itself or lives somewhere below it.
    pub fn is_ancestor_or_self(&self, ancestor: ItemId, item: ItemId) -> bool {
        let mut current = Some(item);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn require_group(&self, id: ItemId) -> Result<(), TreeError> {
        match self.get(id) {
            None => Err(TreeError::UnknownItem(id)),
            Some(item) if !item.is_group() => Err(TreeError::NotAGroup(id)),
            Some(_) => Ok(()),
        }
    }

    /// Append a condition to `parent`.
    pub fn add_condition(&mut self, parent: ItemId, expression: E) -> Result<ItemId, TreeError> {
        self.require_group(parent)?;
        let id = self.alloc(
            Some(parent),
            ItemKind::Operand(ExpressionOperand {
                expression,
                in_edit_mode: false,
            }),
        );
        self.children_mut(parent).push(id);
        Ok(id)
    }

    /// Append a new group holding `expressions` to `parent`.
    pub fn add_group(
        &mut self,
        parent: ItemId,
        operator: FilteringLogic,
        expressions: impl IntoIterator<Item = E>,
    ) -> Result<ItemId, TreeError> {
        self.require_group(parent)?;
        let mut expressions = expressions.into_iter().peekable();
        if expressions.peek().is_none() {
            return Err(TreeError::EmptySelection);
        }

        let id = self.alloc(
            Some(parent),
            ItemKind::Group(ExpressionGroup {
                operator,
                children: Vec::new(),
            }),
        );
        self.children_mut(parent).push(id);
        for expression in expressions {
            self.add_condition(id, expression)?;
        }
        Ok(id)
    }

    pub fn set_operator(&mut self, group: ItemId, operator: FilteringLogic) -> Result<(), TreeError> {
        match self.get_mut(group).map(|item| &mut item.kind) {
            Some(ItemKind::Group(group)) => {
                group.operator = operator;
                Ok(())
            }
            Some(ItemKind::Operand(_)) => Err(TreeError::NotAGroup(group)),
            None => Err(TreeError::UnknownItem(group)),
        }
    }

    pub fn set_edit_mode(&mut self, id: ItemId, in_edit_mode: bool) -> Result<(), TreeError> {
        if !self.contains(id) {
            return Err(TreeError::UnknownItem(id));
        }
        if let Some(operand) = self.operand_mut(id) {
            operand.in_edit_mode = in_edit_mode;
        }
        Ok(())
    }

    /// Delete `id` and its subtree. A group left without children is deleted
    /// as well, recursively, stopping at the root.
    pub fn remove(&mut self, id: ItemId) -> Result<(), TreeError> {
        if id == self.root {
            return Err(TreeError::RootRemoval);
        }
        let (parent, _) = self.detach(id).ok_or(TreeError::UnknownItem(id))?;
        self.free_subtree(id);
        self.prune_empty(parent);
        Ok(())
    }

    /// Move `item` into `group` so that it lands before the child currently at
    /// `index` (`index == len` appends).
    ///
    /// `index` is read against the children as they are before the move, so
    /// moving forward inside the same group accounts for the item's own slot.
    /// The group the item leaves is pruned if it becomes empty.
    pub fn move_item(&mut self, item: ItemId, group: ItemId, index: usize) -> Result<(), TreeError> {
        if item == self.root {
            return Err(TreeError::RootRemoval);
        }
        if !self.contains(item) {
            return Err(TreeError::UnknownItem(item));
        }
        self.require_group(group)?;
        if self.is_ancestor_or_self(item, group) {
            return Err(TreeError::Cycle { item, group });
        }

        let (old_parent, old_index) = self.detach(item).ok_or(TreeError::UnknownItem(item))?;
        let mut index = index;
        if old_parent == group && old_index < index {
            index -= 1;
        }
        self.attach(item, group, index);
        self.prune_empty(old_parent);
        Ok(())
    }

    /// Replace a nested group with its children.
    pub fn ungroup(&mut self, group: ItemId) -> Result<(), TreeError> {
        self.require_group(group)?;
        let parent = self.parent(group).ok_or(TreeError::RootRemoval)?;
        let index = self
            .index_in_parent(group)
            .ok_or(TreeError::Orphan(group))?;

        let children = std::mem::take(self.children_mut(group));
        for child in &children {
            if let Some(item) = self.get_mut(*child) {
                item.parent = Some(parent);
            }
        }
        self.children_mut(parent)
            .splice(index..=index, children.iter().copied());
        self.free_slot(group);
        Ok(())
    }

    /// Move sibling `items` into a new group placed where the first of them
    /// was. The items keep their relative display order.
    pub fn wrap_in_group(
        &mut self,
        items: &[ItemId],
        operator: FilteringLogic,
    ) -> Result<ItemId, TreeError> {
        let first = *items.first().ok_or(TreeError::EmptySelection)?;
        if items.contains(&self.root) {
            return Err(TreeError::RootRemoval);
        }
        let parent = self.parent(first).ok_or(TreeError::UnknownItem(first))?;

        let mut ordered = Vec::with_capacity(items.len());
        for &item in items {
            if !self.contains(item) {
                return Err(TreeError::UnknownItem(item));
            }
            if self.parent(item) != Some(parent) {
                return Err(TreeError::NotSiblings);
            }
            let index = self.index_in_parent(item).ok_or(TreeError::Orphan(item))?;
            if !ordered.iter().any(|(_, id)| *id == item) {
                ordered.push((index, item));
            }
        }
        ordered.sort_unstable();

        let insert_at = ordered[0].0;
        let group = self.alloc(
            Some(parent),
            ItemKind::Group(ExpressionGroup {
                operator,
                children: Vec::new(),
            }),
        );
        self.children_mut(parent).insert(insert_at, group);
        for (_, item) in ordered {
            self.detach(item);
            let len = self.children(group).len();
            self.attach(item, group, len);
        }
        Ok(group)
    }

    fn detach(&mut self, id: ItemId) -> Option<(ItemId, usize)> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children_mut(parent).remove(index);
        if let Some(item) = self.get_mut(id) {
            item.parent = None;
        }
        Some((parent, index))
    }

    fn attach(&mut self, id: ItemId, group: ItemId, index: usize) {
        let children = self.children_mut(group);
        let index = index.min(children.len());
        children.insert(index, id);
        if let Some(item) = self.get_mut(id) {
            item.parent = Some(group);
        }
    }

    fn free_subtree(&mut self, id: ItemId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.free_subtree(child);
        }
        self.free_slot(id);
    }

    fn prune_empty(&mut self, mut group: ItemId) {
        while group != self.root && self.children(group).is_empty() {
            let Some((parent, _)) = self.detach(group) else {
                return;
            };
            self.free_slot(group);
            group = parent;
        }
    }

    /// Pre-order list of every item: a group comes before its children.
    pub fn expression_list(&self) -> Vec<ItemId> {
        let mut out = Vec::with_capacity(self.items.len());
        self.walk(self.root, &mut |id, _| out.push(id));
        out
    }

    /// Conditions only, in display order.
    pub fn leaf_list(&self) -> Vec<ItemId> {
        let mut out = Vec::new();
        self.walk(self.root, &mut |id, item| {
            if !item.is_group() {
                out.push(id);
            }
        });
        out
    }

    fn walk(&self, id: ItemId, f: &mut impl FnMut(ItemId, &ExpressionItem<E>)) {
        let Some(item) = self.get(id) else {
            return;
        };
        f(id, item);
        for &child in self.children(id) {
            self.walk(child, f);
        }
    }

    /// Check every structural invariant of the tree.
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.parent(self.root).is_some() || !self.is_group(self.root) {
            return Err(TreeError::NotAGroup(self.root));
        }

        let mut reachable = vec![false; self.items.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            reachable[id.ix()] = true;
            let children = self.children(id);
            if id != self.root && self.is_group(id) && children.is_empty() {
                return Err(TreeError::EmptyGroup(id));
            }
            for (ix, &child) in children.iter().enumerate() {
                if children[..ix].contains(&child) {
                    return Err(TreeError::DuplicateChild { group: id, child });
                }
                match self.get(child) {
                    None => return Err(TreeError::UnknownItem(child)),
                    Some(item) if item.parent != Some(id) => {
                        return Err(TreeError::ParentMismatch {
                            item: child,
                            parent: id,
                        });
                    }
                    Some(_) => stack.push(child),
                }
            }
        }

        for (ix, item) in self.items.iter().enumerate() {
            if item.is_some() && !reachable[ix] {
                return Err(TreeError::Orphan(ItemId(ix as u32)));
            }
        }
        Ok(())
    }
}

impl<E: Clone> ExpressionTree<E> {
    /// Snapshot the tree as plain values, ignoring edit state.
    pub fn to_node(&self) -> ExpressionNode<E> {
        self.node_at(self.root)
            .unwrap_or_else(|| ExpressionNode::and(Vec::new()))
    }

    pub fn node_at(&self, id: ItemId) -> Option<ExpressionNode<E>> {
        Some(match &self.get(id)?.kind {
            ItemKind::Operand(operand) => ExpressionNode::condition(operand.expression.clone()),
            ItemKind::Group(group) => ExpressionNode::Group {
                operator: group.operator,
                children: group
                    .children
                    .iter()
                    .filter_map(|child| self.node_at(*child))
                    .collect(),
            },
        })
    }
}

impl<E: Clone + Serialize> ExpressionTree<E> {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_node())
    }
}

impl<E: DeserializeOwned> ExpressionTree<E> {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        let node: ExpressionNode<E> = serde_json::from_str(s)?;
        Ok(Self::from_node(node))
    }
}

impl<E: Condition> ExpressionTree<E> {
    /// Whether `id` is a chip being edited that leaving edit mode would discard.
    pub fn is_discarded_on_exit(&self, id: ItemId) -> bool {
        self.operand(id)
            .is_some_and(|operand| operand.in_edit_mode && !operand.expression.is_committable())
    }

    /// Leave edit mode everywhere: committable chips are kept, incomplete ones
    /// are removed. Returns the removed ids.
    pub fn exit_edit_mode(&mut self) -> Vec<ItemId> {
        let editing: Vec<ItemId> = self
            .leaf_list()
            .into_iter()
            .filter(|id| self.operand(*id).is_some_and(|operand| operand.in_edit_mode))
            .collect();

        let mut discarded = Vec::new();
        for id in editing {
            if self.is_discarded_on_exit(id) {
                if self.remove(id).is_ok() {
                    discarded.push(id);
                }
            } else if let Some(operand) = self.operand_mut(id) {
                operand.in_edit_mode = false;
            }
        }
        discarded
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    type Node = ExpressionNode<&'static str>;

    fn c(name: &'static str) -> Node {
        Node::condition(name)
    }

    fn find(tree: &ExpressionTree<&'static str>, name: &str) -> ItemId {
        tree.leaf_list()
            .into_iter()
            .find(|id| tree.operand(*id).is_some_and(|op| op.expression == name))
            .unwrap()
    }

    #[test]
    fn from_node_round_trips_and_drops_empty_groups() {
        let node = Node::and(vec![c("a"), Node::or(vec![]), Node::or(vec![c("b")])]);
        let tree = ExpressionTree::from_node(node);
        assert_eq!(tree.to_node(), Node::and(vec![c("a"), Node::or(vec![c("b")])]));
        tree.validate().unwrap();
    }

    #[test]
    fn bare_condition_is_wrapped_in_and_root() {
        let tree = ExpressionTree::from_node(c("a"));
        assert_eq!(tree.to_node(), Node::and(vec![c("a")]));
    }

    #[test]
    fn remove_cascades_empty_groups_but_keeps_root() {
        let mut tree =
            ExpressionTree::from_node(Node::and(vec![Node::or(vec![Node::and(vec![c("a")])])]));
        let a = find(&tree, "a");
        tree.remove(a).unwrap();
        assert_eq!(tree.to_node(), Node::and(vec![]));
        assert_eq!(tree.len(), 1);
        tree.validate().unwrap();
        assert_eq!(tree.remove(tree.root()), Err(TreeError::RootRemoval));
    }

    #[test]
    fn move_item_forward_in_same_group_adjusts_index() {
        let mut tree = ExpressionTree::from_node(Node::and(vec![c("a"), c("b"), c("c")]));
        let a = find(&tree, "a");
        // before "c"
        tree.move_item(a, tree.root(), 2).unwrap();
        assert_eq!(tree.to_node(), Node::and(vec![c("b"), c("a"), c("c")]));
    }

    #[test]
    fn move_group_into_itself_is_rejected() {
        let mut tree = ExpressionTree::from_node(Node::and(vec![Node::or(vec![
            c("a"),
            Node::and(vec![c("b")]),
        ])]));
        let or = tree.first_child(tree.root()).unwrap();
        let inner = tree.children(or)[1];
        assert_eq!(
            tree.move_item(or, inner, 0),
            Err(TreeError::Cycle {
                item: or,
                group: inner
            })
        );
        tree.validate().unwrap();
    }

    #[test]
    fn ungroup_and_wrap_are_inverse() {
        let mut tree =
            ExpressionTree::from_node(Node::and(vec![c("a"), Node::or(vec![c("b"), c("c")]), c("d")]));
        let or = tree.children(tree.root())[1];
        tree.ungroup(or).unwrap();
        assert_eq!(tree.to_node(), Node::and(vec![c("a"), c("b"), c("c"), c("d")]));
        assert!(!tree.contains(or));

        let b = find(&tree, "b");
        let cc = find(&tree, "c");
        tree.wrap_in_group(&[cc, b], FilteringLogic::Or).unwrap();
        assert_eq!(
            tree.to_node(),
            Node::and(vec![c("a"), Node::or(vec![c("b"), c("c")]), c("d")])
        );
        tree.validate().unwrap();
    }

    #[test]
    fn wrap_requires_siblings() {
        let mut tree =
            ExpressionTree::from_node(Node::and(vec![c("a"), Node::or(vec![c("b"), c("c")])]));
        let a = find(&tree, "a");
        let b = find(&tree, "b");
        assert_eq!(
            tree.wrap_in_group(&[a, b], FilteringLogic::And),
            Err(TreeError::NotSiblings)
        );
    }

    #[test]
    fn exit_edit_mode_discards_incomplete_chips() {
        let mut tree = ExpressionTree::from_node(Node::and(vec![c("a"), Node::or(vec![c("")])]));
        let a = find(&tree, "a");
        let empty = find(&tree, "");
        tree.set_edit_mode(a, true).unwrap();
        tree.set_edit_mode(empty, true).unwrap();
        assert!(tree.is_discarded_on_exit(empty));
        assert!(!tree.is_discarded_on_exit(a));

        assert_eq!(tree.exit_edit_mode(), vec![empty]);
        assert_eq!(tree.to_node(), Node::and(vec![c("a")]));
        assert!(!tree.operand(a).unwrap().in_edit_mode);
    }

    #[test]
    fn json_snapshot_round_trips() {
        let tree = ExpressionTree::from_node(ExpressionNode::and(vec![
            ExpressionNode::condition("a".to_string()),
            ExpressionNode::or(vec![ExpressionNode::condition("b".to_string())]),
        ]));
        let json = tree.to_json_pretty().unwrap();
        let parsed = ExpressionTree::<String>::from_json_str(&json).unwrap();
        assert_eq!(parsed.to_node(), tree.to_node());
    }

    #[test]
    fn len_counts_live_items_and_ids_are_not_reused() {
        let mut tree =
            ExpressionTree::from_node(Node::and(vec![c("a"), Node::or(vec![c("b"), c("c")])]));
        assert_eq!(tree.len(), 5);
        let or = tree.children(tree.root())[1];
        tree.ungroup(or).unwrap();
        assert_eq!(tree.len(), 4);

        let a = find(&tree, "a");
        tree.remove(a).unwrap();
        assert_eq!(tree.len(), 3);
        let d = tree.add_condition(tree.root(), "d").unwrap();
        assert_ne!(d, a);
        assert!(!tree.contains(a));
        assert_eq!(tree.len(), 4);

        // freeing an already empty slot is not counted twice
        tree.free_slot(a);
        assert_eq!(tree.len(), 4);
        tree.validate().unwrap();
    }

    #[test]
    fn snapshot_payload_needs_only_deserialize() {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        struct Field {
            name: String,
            value: u32,
        }

        let json = r#"{
            "node": "group",
            "operator": "or",
            "children": [
                { "node": "condition", "expression": { "name": "age", "value": 30 } }
            ]
        }"#;
        let tree = ExpressionTree::<Field>::from_json_str(json).unwrap();
        assert_eq!(
            tree.to_node(),
            ExpressionNode::or(vec![ExpressionNode::condition(Field {
                name: "age".into(),
                value: 30,
            })])
        );
    }

    #[test]
    fn validate_reports_empty_nested_group() {
        let mut tree = ExpressionTree::<&'static str>::new(FilteringLogic::And);
        let root = tree.root();
        let group = tree.add_group(root, FilteringLogic::Or, ["x"]).unwrap();
        let x = tree.children(group)[0];
        tree.detach(x);
        tree.free_slot(x);
        assert_eq!(tree.validate(), Err(TreeError::EmptyGroup(group)));
    }
}
