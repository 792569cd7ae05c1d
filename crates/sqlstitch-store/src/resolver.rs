//! Dependency resolution
//!
//! Expands root references through recorded snippet dependencies into a
//! dependency-first expansion order, detecting reference cycles. The
//! graph is arena-indexed and the traversal is iterative, so deep
//! snippet chains cannot overflow the stack.

use std::collections::{HashMap, VecDeque};

use sqlstitch_catalog::Catalog;
use sqlstitch_core::{CompositionError, Snippet};

use crate::store::SnippetStore;

const UNVISITED: u8 = 0;
const ON_PATH: u8 = 1;
const DONE: u8 = 2;

/// Arena-indexed dependency graph over snippet names
#[derive(Debug, Default)]
struct SnippetGraph {
    /// Node names in discovery order
    names: Vec<String>,
    /// Name -> arena index
    index: HashMap<String, usize>,
    /// Outgoing edges per node, in recorded dependency order
    edges: Vec<Vec<usize>>,
}

impl SnippetGraph {
    /// Add a node if new. Returns true when it was not seen before.
    fn intern(&mut self, name: &str) -> bool {
        if self.index.contains_key(name) {
            return false;
        }
        self.index.insert(name.to_string(), self.names.len());
        self.names.push(name.to_string());
        self.edges.push(Vec::new());
        true
    }

    fn add_edge(&mut self, from: &str, to: &str) {
        let (Some(&from), Some(&to)) = (self.index.get(from), self.index.get(to)) else {
            return;
        };
        if !self.edges[from].contains(&to) {
            self.edges[from].push(to);
        }
    }

    /// Dependency-first order over all nodes.
    ///
    /// Iterative DFS with an explicit frame stack; the path doubles as
    /// the cycle report, so a detected cycle names every member once in
    /// traversal order.
    fn expansion_order(&self) -> Result<Vec<usize>, CompositionError> {
        let mut state = vec![UNVISITED; self.names.len()];
        let mut order: Vec<usize> = Vec::with_capacity(self.names.len());
        let mut path: Vec<usize> = Vec::new();
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for start in 0..self.names.len() {
            if state[start] != UNVISITED {
                continue;
            }
            state[start] = ON_PATH;
            path.push(start);
            stack.push((start, 0));

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let edge_pos = frame.1;
                if edge_pos < self.edges[node].len() {
                    frame.1 += 1;
                    let next = self.edges[node][edge_pos];
                    match state[next] {
                        ON_PATH => {
                            let from = path.iter().position(|&n| n == next).unwrap_or(0);
                            let cycle = path[from..]
                                .iter()
                                .map(|&n| self.names[n].clone())
                                .collect();
                            return Err(CompositionError::Cycle(cycle));
                        }
                        UNVISITED => {
                            state[next] = ON_PATH;
                            path.push(next);
                            stack.push((next, 0));
                        }
                        _ => {}
                    }
                } else {
                    state[node] = DONE;
                    order.push(node);
                    path.pop();
                    stack.pop();
                }
            }
        }

        Ok(order)
    }
}

/// Expand root references into a dependency-first snippet list.
///
/// A name that is not stored, or that also names a live catalog table,
/// is skipped without error: the catalog wins collisions silently, at
/// the root level and below, and a skipped root's subtree is never
/// expanded.
pub fn resolve<'a>(
    roots: &[String],
    store: &'a SnippetStore,
    catalog: &dyn Catalog,
) -> Result<Vec<&'a Snippet>, CompositionError> {
    let graph = build_graph(roots, store, catalog);
    let order = graph.expansion_order()?;

    let mut snippets = Vec::with_capacity(order.len());
    for index in order {
        if let Some(snippet) = store.get(&graph.names[index]) {
            snippets.push(snippet);
        }
    }
    tracing::debug!("resolved {} snippet(s) for expansion", snippets.len());
    Ok(snippets)
}

/// Breadth-first discovery of every snippet reachable from the roots.
fn build_graph(roots: &[String], store: &SnippetStore, catalog: &dyn Catalog) -> SnippetGraph {
    let mut graph = SnippetGraph::default();
    let mut queue: VecDeque<String> = VecDeque::new();

    for name in roots {
        if !store.contains(name) || catalog.table_exists(name) {
            continue;
        }
        if graph.intern(name) {
            queue.push_back(name.clone());
        }
    }

    while let Some(current) = queue.pop_front() {
        let dependencies = match store.get(&current) {
            Some(snippet) => snippet.dependencies.clone(),
            None => continue,
        };
        for dependency in dependencies {
            if !store.contains(&dependency) || catalog.table_exists(&dependency) {
                continue;
            }
            if graph.intern(&dependency) {
                queue.push_back(dependency.clone());
            }
            graph.add_edge(&current, &dependency);
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlstitch_catalog::MemoryCatalog;

    fn names(snippets: &[&Snippet]) -> Vec<String> {
        snippets.iter().map(|s| s.name.clone()).collect()
    }

    fn roots(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn chain_resolves_dependencies_first() {
        let mut store = SnippetStore::new();
        store.save("c", "SELECT * FROM base_c", None).unwrap();
        store.save("b", "SELECT * FROM c", None).unwrap();
        store.save("a", "SELECT * FROM b", None).unwrap();

        let resolved = resolve(&roots(&["a"]), &store, &MemoryCatalog::new()).unwrap();
        assert_eq!(names(&resolved), vec!["c", "b", "a"]);
    }

    #[test]
    fn diamond_expands_each_node_once() {
        let mut store = SnippetStore::new();
        store.save("d", "SELECT 1", None).unwrap();
        store.save("b", "SELECT * FROM d", None).unwrap();
        store.save("c", "SELECT * FROM d", None).unwrap();
        store
            .save("a", "SELECT * FROM b JOIN c ON true", None)
            .unwrap();

        let resolved = resolve(&roots(&["a"]), &store, &MemoryCatalog::new()).unwrap();
        assert_eq!(names(&resolved), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn multiple_roots_keep_first_discovery_order() {
        let mut store = SnippetStore::new();
        store.save("dep_x", "SELECT 1", None).unwrap();
        store.save("x", "SELECT * FROM dep_x", None).unwrap();
        store.save("y", "SELECT 2", None).unwrap();

        let resolved = resolve(&roots(&["x", "y"]), &store, &MemoryCatalog::new()).unwrap();
        assert_eq!(names(&resolved), vec!["dep_x", "x", "y"]);
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut store = SnippetStore::new();
        store.save("d", "SELECT 1", None).unwrap();
        store.save("b", "SELECT * FROM d", None).unwrap();
        store.save("c", "SELECT * FROM d", None).unwrap();
        store
            .save("a", "SELECT * FROM b JOIN c ON true", None)
            .unwrap();

        let catalog = MemoryCatalog::new();
        let first = names(&resolve(&roots(&["a"]), &store, &catalog).unwrap());
        let second = names(&resolve(&roots(&["a"]), &store, &catalog).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn mutual_cycle_names_both_members() {
        let mut store = SnippetStore::new();
        store.save("a", "SELECT * FROM b", None).unwrap();
        store.save("b", "SELECT * FROM a", None).unwrap();
        // re-save a now that b exists, so both edges are recorded
        store.save("a", "SELECT * FROM b", None).unwrap();

        let err = resolve(&roots(&["a"]), &store, &MemoryCatalog::new()).unwrap_err();
        assert_eq!(
            err,
            CompositionError::Cycle(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn self_reference_is_a_cycle_of_length_one() {
        let mut store = SnippetStore::new();
        store.save("me", "SELECT * FROM me", None).unwrap();

        let err = resolve(&roots(&["me"]), &store, &MemoryCatalog::new()).unwrap_err();
        assert_eq!(err, CompositionError::Cycle(vec!["me".to_string()]));
    }

    #[test]
    fn three_member_cycle_lists_traversal_order() {
        let mut store = SnippetStore::new();
        store.save("c", "SELECT 1", None).unwrap();
        store.save("b", "SELECT * FROM c", None).unwrap();
        store.save("a", "SELECT * FROM b", None).unwrap();
        // close the loop: c -> a
        store.save("c", "SELECT * FROM a", None).unwrap();

        let err = resolve(&roots(&["a"]), &store, &MemoryCatalog::new()).unwrap_err();
        assert_eq!(
            err,
            CompositionError::Cycle(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn cycle_entered_mid_path_reports_only_its_members() {
        let mut store = SnippetStore::new();
        store.save("a", "SELECT 1", None).unwrap();
        store.save("b", "SELECT * FROM a", None).unwrap();
        store.save("a", "SELECT * FROM b", None).unwrap();
        store.save("entry", "SELECT * FROM a", None).unwrap();

        let err = resolve(&roots(&["entry"]), &store, &MemoryCatalog::new()).unwrap_err();
        assert_eq!(
            err,
            CompositionError::Cycle(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn catalog_shadowed_dependency_is_left_unexpanded() {
        let mut store = SnippetStore::new();
        store.save("t", "SELECT 1", None).unwrap();
        store.save("b", "SELECT * FROM t", None).unwrap();

        // t is also a live table, so b keeps referring to the table
        let catalog = MemoryCatalog::with_tables(["t"]);
        let resolved = resolve(&roots(&["b"]), &store, &catalog).unwrap();
        assert_eq!(names(&resolved), vec!["b"]);
    }

    #[test]
    fn catalog_shadowed_root_is_not_expanded() {
        let mut store = SnippetStore::new();
        store.save("t", "SELECT 1", None).unwrap();

        let catalog = MemoryCatalog::with_tables(["t"]);
        let resolved = resolve(&roots(&["t"]), &store, &catalog).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn unknown_roots_are_skipped() {
        let store = SnippetStore::new();
        let resolved = resolve(&roots(&["ghost"]), &store, &MemoryCatalog::new()).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn deep_chain_resolves_without_recursion() {
        let mut store = SnippetStore::new();
        store.save("s0", "SELECT 1", None).unwrap();
        for i in 1..500 {
            let body = format!("SELECT * FROM s{}", i - 1);
            store.save(&format!("s{}", i), &body, None).unwrap();
        }

        let resolved = resolve(&roots(&["s499"]), &store, &MemoryCatalog::new()).unwrap();
        assert_eq!(resolved.len(), 500);
        assert_eq!(resolved[0].name, "s0");
        assert_eq!(resolved[499].name, "s499");
    }
}
