use std::collections::HashMap;

use crate::api::{Comment, NestedComment, UserId, VoteTally};

/// Sorts comments the way `build_comment_tree` expects them: oldest first,
/// ties broken by id so that the result does not depend on the source order
pub fn sort_for_tree(comments: &mut [Comment]) {
    comments.sort_unstable_by_key(|c| (c.date, c.id));
}

/// Turns the flat comment list of a post into its reply forest, as seen by `viewer`
///
/// Roots and replies keep the relative order they have in `comments`. A comment
/// whose parent is absent from `comments` is an orphan and becomes a root, and
/// so does every comment lying on a `parent_id` cycle. Every input comment
/// appears exactly once in the output.
pub fn build_comment_tree(comments: Vec<Comment>, viewer: UserId) -> Vec<NestedComment> {
    let n = comments.len();

    // The first comment with a given id owns it. Any later duplicate still gets its own node.
    let mut index = HashMap::with_capacity(n);
    for (i, c) in comments.iter().enumerate() {
        index.entry(c.id).or_insert(i);
    }
    let parent_of = comments
        .iter()
        .map(|c| c.parent_id.and_then(|p| index.get(&p).copied()))
        .collect::<Vec<_>>();
    let on_cycle = nodes_on_cycles(&parent_of);

    let mut roots = Vec::new();
    let mut children = vec![Vec::new(); n];
    for (i, parent) in parent_of.iter().enumerate() {
        match parent {
            Some(p) if !on_cycle[i] => children[*p].push(i),
            _ => {
                if on_cycle[i] {
                    tracing::warn!(
                        comment = ?comments[i].id,
                        "comment is part of a reply cycle, listing it as top-level"
                    );
                }
                roots.push(i);
            }
        }
    }

    let mut nodes = comments
        .into_iter()
        .map(|comment| {
            let tally = VoteTally::of(&comment.votes, viewer);
            Some(NestedComment {
                comment,
                tally,
                replies: Vec::new(),
            })
        })
        .collect::<Vec<_>>();

    // Assemble bottom-up: every node is finished before its parent takes it
    for i in post_order(&roots, &children) {
        let replies = children[i]
            .iter()
            .filter_map(|c| nodes[*c].take())
            .collect::<Vec<_>>();
        if let Some(node) = &mut nodes[i] {
            node.replies = replies;
        }
    }

    roots.into_iter().filter_map(|r| nodes[r].take()).collect()
}

/// Each node has at most one outgoing edge (to its parent), so walking from any
/// node either ends at a root or loops back onto a path already walked
fn nodes_on_cycles(parent_of: &[Option<usize>]) -> Vec<bool> {
    let mut walked_by = vec![None; parent_of.len()];
    let mut on_cycle = vec![false; parent_of.len()];
    for start in 0..parent_of.len() {
        let mut cur = Some(start);
        while let Some(i) = cur {
            match walked_by[i] {
                None => {
                    walked_by[i] = Some(start);
                    cur = parent_of[i];
                }
                Some(walk) if walk == start => {
                    // Looped back onto this walk: i is on a cycle, mark all of it
                    let mut j = i;
                    loop {
                        on_cycle[j] = true;
                        match parent_of[j] {
                            Some(p) if p != i => j = p,
                            _ => break,
                        }
                    }
                    break;
                }
                Some(_) => break,
            }
        }
    }
    on_cycle
}

fn post_order(roots: &[usize], children: &[Vec<usize>]) -> Vec<usize> {
    let mut res = Vec::with_capacity(children.len());
    let mut stack = roots.iter().rev().map(|r| (*r, false)).collect::<Vec<_>>();
    while let Some((i, expanded)) = stack.pop() {
        if expanded {
            res.push(i);
        } else {
            stack.push((i, true));
            stack.extend(children[i].iter().map(|c| (*c, false)));
        }
    }
    res
}
