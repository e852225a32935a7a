//! Iterative depth-first traversals over the edge list.
//!
//! Both traversals work on slot indices and reuse marks and a stack sized for
//! the whole arena, so they never allocate and never recurse.

use super::Edge;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

#[derive(Debug)]
pub(crate) struct Traversal {
    marks: Vec<Mark>,
    /// (slot, cursor into the edge list)
    stack: Vec<(usize, usize)>,
}

/// Next successor of `node` at or after `cursor`; advances the cursor past it.
#[inline]
fn next_successor(edges: &[Edge], node: usize, cursor: &mut usize) -> Option<usize> {
    while *cursor < edges.len() {
        let edge = &edges[*cursor];
        *cursor += 1;
        if edge.from.node.index() == node {
            return Some(edge.to.node.index());
        }
    }
    None
}

impl Traversal {
    pub fn new(slots: usize) -> Self {
        Self {
            marks: vec![Mark::Unvisited; slots],
            stack: Vec::with_capacity(slots),
        }
    }

    /// Fill `order` with live slots so every edge points forward.
    ///
    /// Returns `false` if a cycle was found; `order` is then incomplete.
    pub fn sort(
        &mut self,
        is_live: impl Fn(usize) -> bool,
        edges: &[Edge],
        order: &mut Vec<usize>,
    ) -> bool {
        let Self { marks, stack } = self;
        marks.fill(Mark::Unvisited);
        order.clear();

        for root in 0..marks.len() {
            if !is_live(root) || marks[root] != Mark::Unvisited {
                continue;
            }
            stack.clear();
            marks[root] = Mark::InProgress;
            stack.push((root, 0));

            while let Some((node, cursor)) = stack.last_mut() {
                let node = *node;
                match next_successor(edges, node, cursor) {
                    Some(next) => match marks[next] {
                        Mark::Unvisited => {
                            marks[next] = Mark::InProgress;
                            stack.push((next, 0));
                        }
                        Mark::InProgress => return false,
                        Mark::Done => {}
                    },
                    None => {
                        marks[node] = Mark::Done;
                        order.push(node);
                        stack.pop();
                    }
                }
            }
        }

        // post-order lists sinks first
        order.reverse();
        true
    }

    /// Whether `target` can be reached from `start` along `edges`.
    pub fn reaches(&mut self, start: usize, target: usize, edges: &[Edge]) -> bool {
        if start == target {
            return true;
        }
        let Self { marks, stack } = self;
        marks.fill(Mark::Unvisited);
        stack.clear();
        marks[start] = Mark::Done;
        stack.push((start, 0));

        while let Some((node, cursor)) = stack.last_mut() {
            let node = *node;
            match next_successor(edges, node, cursor) {
                Some(next) if next == target => return true,
                Some(next) => {
                    if marks[next] == Mark::Unvisited {
                        marks[next] = Mark::Done;
                        stack.push((next, 0));
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }
        false
    }
}
