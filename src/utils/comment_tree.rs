// src/utils/comment_tree.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{
    comment::{CommentNode, CommentWithAuthor},
    reaction::{Reaction, ReactionTally},
};

/// Deepest reply level kept in a built forest; roots sit at level 0.
///
/// Replies below the last level are listed beside their ancestor at that
/// level, in creation order, with `parent_id` still pointing at the real
/// parent.
pub const MAX_REPLY_DEPTH: usize = 32;

/// Builds the reply forest for one post.
///
/// `comments` is expected in creation order; that order is kept for roots
/// and for the replies under every parent. A comment whose parent is not in
/// `comments` (deleted, or from another post) is placed at the root. The
/// function never fails and never drops an input comment.
pub fn build_tree(
    comments: Vec<CommentWithAuthor>,
    reactions: &[Reaction],
    viewer: Option<Uuid>,
) -> Vec<CommentNode> {
    let tally = ReactionTally::new(reactions, viewer);

    let nodes: Vec<CommentNode> = comments
        .into_iter()
        .map(|row| CommentNode {
            id: row.comment.id,
            post_id: row.comment.post_id,
            parent_id: row.comment.parent_id,
            content: row.comment.content,
            created_at: row.comment.created_at,
            author: row.author,
            reactions: tally.summary(&row.comment.id),
            replies: Vec::new(),
        })
        .collect();

    let index: HashMap<Uuid, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id, i))
        .collect();

    // Placement pass over input order. The index is complete before this
    // loop runs, so a reply may precede its parent in the input.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut roots = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        match node.parent_id.and_then(|pid| index.get(&pid).copied()) {
            Some(parent) if parent != i => children[parent].push(i),
            _ => roots.push(i),
        }
    }

    let layout = Layout::new(&roots, &children);

    let mut slots: Vec<Option<CommentNode>> = nodes.into_iter().map(Some).collect();

    // Pre-order puts every node after the one it hangs under, so walking it
    // backwards finishes each reply list before its owner is collected.
    for &i in layout.order.iter().rev() {
        let replies: Vec<CommentNode> = layout.replies[i]
            .iter()
            .filter_map(|&child| slots[child].take())
            .collect();
        if let Some(node) = slots[i].as_mut() {
            node.replies = replies;
        }
    }

    layout
        .top
        .iter()
        .filter_map(|&i| slots[i].take())
        .collect()
}

/// Final position of every node, computed without recursion.
struct Layout {
    /// Forest roots in output order.
    top: Vec<usize>,
    /// Reply indices per node, in output order.
    replies: Vec<Vec<usize>>,
    /// Pre-order of every placed node.
    order: Vec<usize>,
}

impl Layout {
    fn new(roots: &[usize], children: &[Vec<usize>]) -> Self {
        let len = children.len();
        let mut layout = Layout {
            top: Vec::new(),
            replies: vec![Vec::new(); len],
            order: Vec::with_capacity(len),
        };
        let mut seen = vec![false; len];

        // Regular roots first. Anything still unseen afterwards sits on a
        // parent cycle that no root reaches and is emitted as a root too.
        for start in roots.iter().copied().chain(0..len) {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            layout.top.push(start);

            // (node, level, node it is listed under)
            let mut stack = vec![(start, 0usize, None::<usize>)];
            while let Some((i, level, owner)) = stack.pop() {
                layout.order.push(i);
                if let Some(owner) = owner {
                    layout.replies[owner].push(i);
                }

                let (child_level, child_owner) = if level + 1 < MAX_REPLY_DEPTH {
                    (level + 1, Some(i))
                } else {
                    (level, owner)
                };
                for &child in children[i].iter().rev() {
                    if !seen[child] {
                        seen[child] = true;
                        stack.push((child, child_level, child_owner));
                    }
                }
            }
        }

        // Flattened replies arrive in walk order; input order is creation order.
        for list in layout.replies.iter_mut() {
            list.sort_unstable();
        }

        layout
    }
}
