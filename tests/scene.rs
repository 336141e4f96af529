mod common;

use slidegl::prelude::*;

#[test]
fn attaching_below_a_descendant_is_refused() {
    common::init_logger();
    let a = SceneNode::empty();
    let b = SceneNode::empty();
    let c = SceneNode::empty();
    a.add_child(&b);
    b.add_child(&c);
    let _ = common::take_logs();

    c.add_child(&a);
    assert!(a.parent().is_none());
    assert!(c.children().is_empty());
    assert!(b.parent().is_some_and(|p| p.ptr_eq(&a)));

    let warnings = common::take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains(&format!("Cannot attach scene node {}", a.id())));

    // A node cannot be its own parent either.
    a.add_child(&a);
    assert!(a.parent().is_none());
    assert_eq!(common::take_warnings().len(), 1);
}

#[test]
fn reparenting_keeps_both_sides_consistent() {
    common::init_logger();
    let first = SceneNode::empty();
    let second = SceneNode::empty();
    let child = SceneNode::empty();

    first.add_child(&child);
    second.add_child(&child);
    assert!(first.children().is_empty());
    assert_eq!(second.children().len(), 1);
    assert!(child.parent().is_some_and(|p| p.ptr_eq(&second)));
    assert!(common::take_warnings().is_empty());
}
