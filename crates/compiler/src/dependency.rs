//! Dependency analysis: strongly-connected-component ordering over a set of
//! names and their dependency sets (§4.1 "Dependency analyzer").
//!
//! The original maintains a stack of open groups and merges groups on a
//! cycle (flagged in §9 as a possible source of bugs). This crate implements
//! the same contract with a textbook iterative Tarjan search instead, in the
//! style `call_graph.rs`'s `find_sccs`/`tarjan_visit` already uses elsewhere
//! in this workspace: `HashMap<String, HashSet<String>>` edges, and
//! `indices`/`lowlinks`/`on_stack` bookkeeping.

use std::collections::{HashMap, HashSet};
use tracing::trace;

/// One group produced by dependency analysis: a set of mutually (or
/// self-)recursive names, plus whether it is a genuine cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Member names. Order within a group carries no meaning (§4.1).
    pub names: Vec<String>,
    /// `true` only when some name in this group depends on another name
    /// (possibly itself) that is also in this same group.
    pub recursive: bool,
}

/// Order the names that occur as keys of `edges` into dependency-respecting
/// groups: every group only references names in an earlier group or names
/// absent from `edges` entirely (external references — §4.1 "Failure.
/// None", missing dependencies are silently treated as external).
///
/// Visitation order over `edges`'s keys is sorted for determinism: a
/// `HashMap`'s iteration order is not guaranteed, and property 7 (§8,
/// "stable under re-analysis") requires the same input to always produce
/// the same grouping.
pub fn order_by_dependency(edges: &HashMap<String, HashSet<String>>) -> Vec<Group> {
    let mut index_counter = 0usize;
    let mut stack: Vec<String> = Vec::new();
    let mut on_stack: HashSet<String> = HashSet::new();
    let mut indices: HashMap<String, usize> = HashMap::new();
    let mut lowlinks: HashMap<String, usize> = HashMap::new();
    let mut sccs: Vec<Vec<String>> = Vec::new();

    let mut names: Vec<&String> = edges.keys().collect();
    names.sort();
    for name in names {
        if !indices.contains_key(name) {
            tarjan_visit(
                name,
                edges,
                &mut index_counter,
                &mut stack,
                &mut on_stack,
                &mut indices,
                &mut lowlinks,
                &mut sccs,
            );
        }
    }

    // Tarjan emits a component only once everything it depends on has
    // already been emitted, i.e. in reverse dependency order; reverse to
    // get the "earlier groups come first" order §4.1 requires.
    sccs.reverse();

    sccs.into_iter()
        .map(|names| {
            let recursive = names.len() > 1
                || names.first().is_some_and(|n| {
                    edges.get(n).is_some_and(|deps| deps.contains(n))
                });
            trace!(?names, recursive, "emitted dependency group");
            Group { names, recursive }
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn tarjan_visit(
    name: &str,
    edges: &HashMap<String, HashSet<String>>,
    index_counter: &mut usize,
    stack: &mut Vec<String>,
    on_stack: &mut HashSet<String>,
    indices: &mut HashMap<String, usize>,
    lowlinks: &mut HashMap<String, usize>,
    sccs: &mut Vec<Vec<String>>,
) {
    let index = *index_counter;
    *index_counter += 1;
    indices.insert(name.to_string(), index);
    lowlinks.insert(name.to_string(), index);
    stack.push(name.to_string());
    on_stack.insert(name.to_string());

    if let Some(deps) = edges.get(name) {
        let mut deps: Vec<&String> = deps.iter().collect();
        deps.sort();
        for dep in deps {
            if !edges.contains_key(dep) {
                // Not part of this analysis's name set: external, ignored.
                continue;
            }
            if !indices.contains_key(dep) {
                tarjan_visit(
                    dep,
                    edges,
                    index_counter,
                    stack,
                    on_stack,
                    indices,
                    lowlinks,
                    sccs,
                );
                let dep_lowlink = *lowlinks.get(dep).unwrap();
                let lowlink = lowlinks.get_mut(name).unwrap();
                *lowlink = (*lowlink).min(dep_lowlink);
            } else if on_stack.contains(dep) {
                let dep_index = *indices.get(dep).unwrap();
                let lowlink = lowlinks.get_mut(name).unwrap();
                *lowlink = (*lowlink).min(dep_index);
            }
        }
    }

    if lowlinks.get(name) == indices.get(name) {
        let mut group = Vec::new();
        loop {
            let n = stack.pop().unwrap();
            on_stack.remove(&n);
            group.push(n.clone());
            if n == name {
                break;
            }
        }
        sccs.push(group);
    }
}
