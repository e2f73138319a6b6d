use manos_query_dnd::{
    Anchor, Bounds, DragEngine, DragEvent, DragKey, DragMode, DragState, DropOutcome, DropTarget,
    ExpressionNode, ExpressionTree, FocusIntent, ItemId, KeyPress, KeyboardOnlyLayout,
    LayoutSnapshot,
};
use pretty_assertions::assert_eq;

type Node = ExpressionNode<&'static str>;

fn c(name: &'static str) -> Node {
    Node::condition(name)
}

fn find(engine: &DragEngine<&'static str>, name: &str) -> ItemId {
    let tree = engine.tree();
    tree.leaf_list()
        .into_iter()
        .find(|id| tree.operand(*id).is_some_and(|op| op.expression == name))
        .unwrap()
}

/// The dragged ghost sits on the lower half of `anchor` when `under` is set,
/// on the upper half otherwise.
fn pointer_at(anchor: Anchor, under: bool) -> LayoutSnapshot {
    let ghost_top = if under { 5. } else { -5. };
    LayoutSnapshot::default()
        .anchor(anchor, Bounds::row(0., 20.))
        .drag_ghost(Bounds::row(ghost_top, 20.))
}

fn press(engine: &mut DragEngine<&'static str>, key: DragKey) -> bool {
    engine.handle_key(KeyPress::new(key), &KeyboardOnlyLayout)
}

#[test]
fn pointer_drop_under_next_sibling() -> anyhow::Result<()> {
    let mut engine = DragEngine::new(ExpressionTree::from_node(Node::and(vec![
        c("a"),
        c("b"),
        c("c"),
    ])));
    let a = find(&engine, "a");
    let b = find(&engine, "b");

    engine.start_drag(a, DragMode::Pointer)?;
    let layout = pointer_at(Anchor::Chip(b), true);
    assert!(engine.hover_over(Anchor::Chip(b), &layout));
    assert_eq!(
        engine.session().and_then(|s| s.target()),
        Some(DropTarget::Under(b))
    );

    assert_eq!(
        engine.drop_on(Anchor::Chip(b)),
        DropOutcome::Moved { focus_index: 1 }
    );
    assert_eq!(engine.tree().to_node(), Node::and(vec![c("b"), c("a"), c("c")]));
    assert_eq!(engine.state(), DragState::Idle);
    assert_eq!(engine.take_focus_intent(), Some(FocusIntent::Chip(1)));
    Ok(())
}

#[test]
fn pointer_drop_over_nested_group_marker_becomes_first_child() -> anyhow::Result<()> {
    let tree = ExpressionTree::from_node(Node::and(vec![
        c("a"),
        Node::or(vec![c("b"), c("c")]),
    ]));
    let or = tree.children(tree.root())[1];
    let mut engine = DragEngine::new(tree);
    let a = find(&engine, "a");

    engine.start_drag(a, DragMode::Pointer)?;
    let layout = pointer_at(Anchor::GroupRoot(or), false);
    assert!(engine.hover_over(Anchor::GroupRoot(or), &layout));
    assert_eq!(
        engine.session().and_then(|s| s.target()),
        Some(DropTarget::GroupStart(or))
    );

    assert_eq!(engine.release_pointer(), DropOutcome::Moved { focus_index: 0 });
    assert_eq!(
        engine.tree().to_node(),
        Node::and(vec![Node::or(vec![c("a"), c("b"), c("c")])])
    );
    engine.tree().validate()?;
    Ok(())
}

#[test]
fn pointer_drop_under_nested_group_marker_goes_over_its_first_child() -> anyhow::Result<()> {
    let tree = ExpressionTree::from_node(Node::and(vec![
        c("a"),
        Node::or(vec![c("b"), c("c")]),
    ]));
    let or = tree.children(tree.root())[1];
    let mut engine = DragEngine::new(tree);
    let a = find(&engine, "a");
    let b = find(&engine, "b");

    engine.start_drag(a, DragMode::Pointer)?;
    let layout = pointer_at(Anchor::GroupRoot(or), true);
    assert!(engine.hover_over(Anchor::GroupRoot(or), &layout));
    assert_eq!(
        engine.session().and_then(|s| s.target()),
        Some(DropTarget::Over(b))
    );
    assert_eq!(engine.release_pointer(), DropOutcome::Moved { focus_index: 0 });
    assert_eq!(
        engine.tree().to_node(),
        Node::and(vec![Node::or(vec![c("a"), c("b"), c("c")])])
    );
    Ok(())
}

#[test]
fn keyboard_down_then_enter_moves_past_next_sibling() -> anyhow::Result<()> {
    let mut engine = DragEngine::new(ExpressionTree::from_node(Node::and(vec![c("a"), c("b")])));
    let a = find(&engine, "a");
    let b = find(&engine, "b");

    assert!(engine.drag_handle_focused(a));
    assert_eq!(engine.state(), DragState::Dragging(DragMode::Keyboard));
    assert!(press(&mut engine, DragKey::Down));
    assert_eq!(
        engine.session().and_then(|s| s.target()),
        Some(DropTarget::Under(b))
    );
    assert_eq!(engine.session().and_then(|s| s.step_offset()), Some(1));
    assert_eq!(engine.take_focus_intent(), Some(FocusIntent::DropGhostHandle));

    assert!(press(&mut engine, DragKey::Enter));
    assert_eq!(engine.tree().to_node(), Node::and(vec![c("b"), c("a")]));
    assert_eq!(engine.take_focus_intent(), Some(FocusIntent::Chip(1)));
    Ok(())
}

#[test]
fn keyboard_drop_events_arrive_in_order() -> anyhow::Result<()> {
    let mut engine = DragEngine::new(ExpressionTree::from_node(Node::and(vec![c("a"), c("b")])));
    let a = find(&engine, "a");
    let b = find(&engine, "b");
    let root = engine.tree().root();

    engine.start_drag(a, DragMode::Keyboard)?;
    assert!(engine.take_events().is_empty());

    press(&mut engine, DragKey::Down);
    press(&mut engine, DragKey::Space);
    assert_eq!(
        engine.take_events(),
        vec![
            DragEvent::SourceHidden(a),
            DragEvent::GhostChanged {
                target: DropTarget::Under(b),
                slot: manos_query_dnd::DropSlot {
                    group: root,
                    index: 2
                },
            },
            DragEvent::FocusRequested(FocusIntent::DropGhostHandle),
            DragEvent::TreeMutated,
            DragEvent::GhostCleared,
            DragEvent::SourceRestored(a),
            DragEvent::FocusRequested(FocusIntent::Chip(1)),
        ]
    );
    Ok(())
}

#[test]
fn dragging_out_the_last_child_removes_its_group() -> anyhow::Result<()> {
    let mut engine = DragEngine::new(ExpressionTree::from_node(Node::and(vec![
        c("a"),
        Node::or(vec![c("b")]),
    ])));
    let a = find(&engine, "a");
    let b = find(&engine, "b");

    engine.start_drag(b, DragMode::Pointer)?;
    let layout = pointer_at(Anchor::Chip(a), false);
    assert!(engine.hover_over(Anchor::Chip(a), &layout));
    assert_eq!(engine.release_pointer(), DropOutcome::Moved { focus_index: 0 });
    assert_eq!(engine.tree().to_node(), Node::and(vec![c("b"), c("a")]));
    assert_eq!(engine.tree().len(), 3);
    engine.tree().validate()?;
    Ok(())
}

#[test]
fn appending_the_only_nested_child_keeps_the_root() -> anyhow::Result<()> {
    let mut engine = DragEngine::new(ExpressionTree::from_node(Node::and(vec![Node::or(vec![
        c("a"),
    ])])));
    let a = find(&engine, "a");

    engine.start_drag(a, DragMode::Pointer)?;
    assert!(engine.hover_over(Anchor::AddCondition, &LayoutSnapshot::default()));
    assert_eq!(engine.release_pointer(), DropOutcome::Moved { focus_index: 0 });
    assert_eq!(engine.tree().to_node(), Node::and(vec![c("a")]));

    let root = engine.tree().root();
    engine.tree_mut().remove(a)?;
    assert!(engine.tree().contains(root));
    assert_eq!(engine.tree().to_node(), Node::and(vec![]));
    engine.tree().validate()?;
    Ok(())
}

#[test]
fn dropping_on_itself_leaves_the_tree_alone() -> anyhow::Result<()> {
    let initial = Node::and(vec![c("a"), Node::or(vec![c("b"), c("c")]), c("d")]);
    let mut engine = DragEngine::new(ExpressionTree::from_node(initial.clone()));
    let b = find(&engine, "b");
    let c_id = find(&engine, "c");

    engine.start_drag(b, DragMode::Pointer)?;
    assert_eq!(engine.drop_on(Anchor::Chip(b)), DropOutcome::Unchanged);
    assert_eq!(engine.tree().to_node(), initial);

    // the slot right above the next sibling is where b already is
    engine.start_drag(b, DragMode::Pointer)?;
    let layout = pointer_at(Anchor::Chip(c_id), false);
    assert!(engine.hover_over(Anchor::Chip(c_id), &layout));
    assert_eq!(engine.release_pointer(), DropOutcome::Unchanged);
    assert_eq!(engine.tree().to_node(), initial);
    assert_eq!(engine.state(), DragState::Idle);
    Ok(())
}

#[test]
fn moving_back_restores_the_original_order() -> anyhow::Result<()> {
    let initial = Node::and(vec![c("a"), c("b"), c("c")]);
    let mut engine = DragEngine::new(ExpressionTree::from_node(initial.clone()));
    let a = find(&engine, "a");
    let b = find(&engine, "b");
    let root = engine.tree().root();

    engine.start_drag(a, DragMode::Pointer)?;
    engine.hover_over(Anchor::Chip(b), &pointer_at(Anchor::Chip(b), true));
    engine.release_pointer();
    assert_eq!(engine.tree().to_node(), Node::and(vec![c("b"), c("a"), c("c")]));

    // a had no predecessor, so it goes back to the start of the root group
    engine.start_drag(a, DragMode::Pointer)?;
    engine.hover_over(
        Anchor::GroupRoot(root),
        &pointer_at(Anchor::GroupRoot(root), true),
    );
    assert_eq!(engine.release_pointer(), DropOutcome::Moved { focus_index: 0 });
    assert_eq!(engine.tree().to_node(), initial);
    Ok(())
}

#[test]
fn hidden_chips_do_not_take_hovers() -> anyhow::Result<()> {
    let tree = ExpressionTree::from_node(Node::and(vec![c("a"), Node::or(vec![c("b"), c("c")])]));
    let or = tree.children(tree.root())[1];
    let mut engine = DragEngine::new(tree);
    let a = find(&engine, "a");
    let b = find(&engine, "b");

    engine.start_drag(a, DragMode::Pointer)?;
    let layout = pointer_at(Anchor::Chip(b), true).hide(Anchor::GroupRoot(or));
    assert!(!engine.hover_over(Anchor::Chip(b), &layout));
    assert!(engine.ghost().is_none());
    assert_eq!(engine.release_pointer(), DropOutcome::Cancelled);
    Ok(())
}

#[test]
fn escape_cancels_a_pointer_drag() -> anyhow::Result<()> {
    let mut engine = DragEngine::new(ExpressionTree::from_node(Node::and(vec![c("a"), c("b")])));
    let a = find(&engine, "a");
    let b = find(&engine, "b");

    engine.start_drag(a, DragMode::Pointer)?;
    engine.hover_over(Anchor::Chip(b), &pointer_at(Anchor::Chip(b), true));
    assert!(!press(&mut engine, DragKey::Down));
    assert!(press(&mut engine, DragKey::Escape));
    assert_eq!(engine.state(), DragState::Idle);
    assert_eq!(engine.tree().to_node(), Node::and(vec![c("a"), c("b")]));
    // pointer sessions do not move focus on cancel
    assert_eq!(engine.take_focus_intent(), None);
    Ok(())
}

#[test]
fn removed_source_aborts_keyboard_step() -> anyhow::Result<()> {
    let mut engine = DragEngine::new(ExpressionTree::from_node(Node::and(vec![
        c("a"),
        c("b"),
        c("c"),
    ])));
    let b = find(&engine, "b");

    engine.start_drag(b, DragMode::Keyboard)?;
    engine.tree_mut().remove(b)?;
    assert!(press(&mut engine, DragKey::Down));
    assert_eq!(engine.state(), DragState::Idle);
    assert!(engine.ghost().is_none());
    assert_eq!(engine.tree().to_node(), Node::and(vec![c("a"), c("c")]));
    Ok(())
}
