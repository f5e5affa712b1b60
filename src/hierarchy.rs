//! Nesting of leveled headings into an outline forest.

use crate::model::{OutlineEntry, OutlineNode};

/// Build a forest from headings in document order.
///
/// Uses a stack of open nodes: each heading closes every open node whose
/// level is not shallower than its own, then becomes a child of the node left
/// on top (or a new root). Single pass, no look-ahead.
pub fn build_hierarchy(entries: &[OutlineEntry]) -> Vec<OutlineNode> {
    let mut roots: Vec<OutlineNode> = Vec::new();
    // Open path from a root down to the most recent node.
    let mut stack: Vec<OutlineNode> = Vec::new();

    for entry in entries {
        let level = entry.level.get();
        while stack.last().is_some_and(|top| top.level >= level) {
            close_top(&mut stack, &mut roots);
        }
        stack.push(OutlineNode::new(entry.text.clone(), level, entry.page));
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    roots
}

/// Pop the deepest open node and attach it to its parent (or the roots).
fn close_top(stack: &mut Vec<OutlineNode>, roots: &mut Vec<OutlineNode>) {
    if let Some(node) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}
