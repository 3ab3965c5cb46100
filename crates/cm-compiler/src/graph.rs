//! Cycle detection for class dependency graphs.
//!
//! The parent relation (and, checked separately, the mandatory-aspect
//! relation) must form a DAG. An undetected cycle would recurse forever
//! when flattening inherited properties, so detection runs before any
//! flattening is attempted.

use cm_core::{FxHashMap, QName};

/// DFS colors: white = unvisited, gray = on the current path,
/// black = fully explored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Finds a cycle in a dependency graph, if one exists.
///
/// `edges` maps each node to its dependencies; nodes absent from the map
/// have none. Only edges between the supplied nodes participate (externally
/// resolved ancestors are terminal by construction). Returns the cycle
/// members in traversal order, with the entry node repeated at the end.
pub(crate) fn find_cycle(
    nodes: impl Iterator<Item = QName>,
    edges: &FxHashMap<QName, Vec<QName>>,
) -> Option<Vec<QName>> {
    let mut colors: FxHashMap<QName, Color> = FxHashMap::default();
    let mut stack: Vec<QName> = Vec::new();

    for node in nodes {
        if colors.get(&node).copied().unwrap_or(Color::White) == Color::White {
            if let Some(cycle) = visit(&node, edges, &mut colors, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit(
    node: &QName,
    edges: &FxHashMap<QName, Vec<QName>>,
    colors: &mut FxHashMap<QName, Color>,
    stack: &mut Vec<QName>,
) -> Option<Vec<QName>> {
    colors.insert(node.clone(), Color::Gray);
    stack.push(node.clone());

    if let Some(targets) = edges.get(node) {
        for next in targets {
            match colors.get(next).copied().unwrap_or(Color::White) {
                // Back-edge to a gray node closes a cycle.
                Color::Gray => {
                    let start = stack.iter().position(|n| n == next).unwrap_or(0);
                    let mut cycle: Vec<QName> = stack[start..].to_vec();
                    cycle.push(next.clone());
                    return Some(cycle);
                }
                Color::Black => {}
                Color::White => {
                    if let Some(cycle) = visit(next, edges, colors, stack) {
                        return Some(cycle);
                    }
                }
            }
        }
    }

    stack.pop();
    colors.insert(node.clone(), Color::Black);
    None
}
