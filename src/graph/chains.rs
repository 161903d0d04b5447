//! Breadth-first dependency-chain search over the inverse adjacency map.
//!
//! Walks "who references me" edges upward from a start identifier and
//! returns a [`Chain`] for every reached node whose path matches.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use super::types::{Chain, Guid, PathIndex};

/// Identifier <-> path resolution used to evaluate chain predicates.
pub trait PathResolver {
    fn resolve_path(&self, guid: &Guid) -> Option<PathBuf>;
    fn resolve_guid(&self, path: &Path) -> Option<Guid>;
}

impl PathResolver for PathIndex {
    fn resolve_path(&self, guid: &Guid) -> Option<PathBuf> {
        self.path_of(guid.as_str()).map(Path::to_path_buf)
    }

    fn resolve_guid(&self, path: &Path) -> Option<Guid> {
        self.guid_of(path).cloned()
    }
}

/// Predicate matching paths with the given extension (without the dot).
pub fn has_extension(ext: &str) -> impl Fn(&Path) -> bool + '_ {
    move |path: &Path| path.extension().is_some_and(|e| e == ext)
}

/// Find every ancestor of `start` (including `start` itself) whose resolved
/// path satisfies `predicate`, with the chain that reaches it.
///
/// First discovery wins, so each chain is a shortest one. Parents at the
/// same depth are visited in identifier order, making the result stable
/// across runs. Nodes without a resolvable path are traversed but never match.
/// O(V+E) over the reachable subgraph, and nothing is cached.
pub fn find_chains<R, P>(
    parents_of: &HashMap<Guid, HashSet<Guid>>,
    start: &Guid,
    resolver: &R,
    mut predicate: P,
) -> Vec<Chain>
where
    R: PathResolver + ?Sized,
    P: FnMut(&Path) -> bool,
{
    // node -> the child it was discovered from (None for the start).
    let mut visited: HashMap<Guid, Option<Guid>> = HashMap::new();
    let mut queue: VecDeque<(Guid, Option<Guid>)> = VecDeque::new();
    let mut chains = Vec::new();

    queue.push_back((start.clone(), None));

    while let Some((current, discovered_from)) = queue.pop_front() {
        if visited.contains_key(&current) {
            continue;
        }
        visited.insert(current.clone(), discovered_from);

        if let Some(path) = resolver.resolve_path(&current) {
            if predicate(&path) {
                chains.push(reconstruct(&visited, &current));
            }
        }

        if let Some(parents) = parents_of.get(&current) {
            let mut next: Vec<&Guid> = parents
                .iter()
                .filter(|p| !visited.contains_key(*p))
                .collect();
            next.sort();
            for parent in next {
                queue.push_back((parent.clone(), Some(current.clone())));
            }
        }
    }

    chains
}

fn reconstruct(visited: &HashMap<Guid, Option<Guid>>, found: &Guid) -> Chain {
    let mut nodes = vec![found.clone()];
    let mut node = found;
    while let Some(Some(child)) = visited.get(node) {
        nodes.push(child.clone());
        node = child;
    }
    Chain::from_nodes(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(s: &str) -> Guid {
        Guid::from(s)
    }

    /// Build `parents_of` from `(child, [parents])` pairs.
    fn parents(items: &[(&str, &[&str])]) -> HashMap<Guid, HashSet<Guid>> {
        items
            .iter()
            .map(|(c, ps)| (g(c), ps.iter().map(|p| g(p)).collect()))
            .collect()
    }

    fn index(items: &[(&str, &str)]) -> PathIndex {
        let mut index = PathIndex::new();
        for (guid, path) in items {
            index.insert(PathBuf::from(path), g(guid));
        }
        index
    }

    fn as_strs(chain: &Chain) -> Vec<&str> {
        chain.iter().map(Guid::as_str).collect()
    }

    #[test]
    fn test_linear_chain() {
        // X is referenced by Y, Y by Z.
        let graph = parents(&[("x", &["y"]), ("y", &["z"])]);
        let paths = index(&[("x", "x.mat"), ("y", "y.prefab"), ("z", "z.unity")]);

        let chains = find_chains(&graph, &g("x"), &paths, has_extension("unity"));

        assert_eq!(chains.len(), 1);
        assert_eq!(as_strs(&chains[0]), vec!["z", "y", "x"]);
        assert_eq!(chains[0].head(), &g("z"));
        assert_eq!(chains[0].tail(), &g("x"));
    }

    #[test]
    fn test_unreachable_returns_empty() {
        let graph = parents(&[]);
        let paths = index(&[("x", "x.mat")]);
        assert!(find_chains(&graph, &g("x"), &paths, |_| false).is_empty());
        assert!(find_chains(&graph, &g("unknown"), &paths, |_| true).is_empty());
    }

    #[test]
    fn test_start_node_can_match() {
        let graph = parents(&[]);
        let paths = index(&[("x", "x.unity")]);
        let chains = find_chains(&graph, &g("x"), &paths, has_extension("unity"));
        assert_eq!(chains.len(), 1);
        assert_eq!(as_strs(&chains[0]), vec!["x"]);
    }

    #[test]
    fn test_multiple_matches_and_shortest_chain() {
        // x <- a <- s1 ; x <- s1 directly too ; x <- b <- s2
        let graph = parents(&[("x", &["a", "b", "s1"]), ("a", &["s1"]), ("b", &["s2"])]);
        let paths = index(&[
            ("a", "a.prefab"),
            ("b", "b.prefab"),
            ("s1", "s1.unity"),
            ("s2", "s2.unity"),
        ]);

        let chains = find_chains(&graph, &g("x"), &paths, has_extension("unity"));

        assert_eq!(chains.len(), 2);
        assert_eq!(as_strs(&chains[0]), vec!["s1", "x"]);
        assert_eq!(as_strs(&chains[1]), vec!["s2", "b", "x"]);
    }

    #[test]
    fn test_tie_break_is_by_identifier() {
        // Two equal-length routes to s: via m or via n. "m" sorts first.
        let graph = parents(&[("x", &["n", "m"]), ("m", &["s"]), ("n", &["s"])]);
        let paths = index(&[("s", "s.unity")]);

        for _ in 0..10 {
            let chains = find_chains(&graph, &g("x"), &paths, has_extension("unity"));
            assert_eq!(chains.len(), 1);
            assert_eq!(as_strs(&chains[0]), vec!["s", "m", "x"]);
        }
    }

    #[test]
    fn test_cycles_terminate() {
        let graph = parents(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let paths = index(&[("a", "a.prefab"), ("b", "b.prefab"), ("c", "c.prefab")]);

        let chains = find_chains(&graph, &g("a"), &paths, has_extension("prefab"));

        assert_eq!(chains.len(), 3);
        assert_eq!(as_strs(&chains[2]), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_unresolved_nodes_are_traversed() {
        let graph = parents(&[("x", &["hidden"]), ("hidden", &["s"])]);
        let paths = index(&[("s", "s.unity")]);

        let chains = find_chains(&graph, &g("x"), &paths, |_| true);

        assert_eq!(chains.len(), 1);
        assert_eq!(as_strs(&chains[0]), vec!["s", "hidden", "x"]);
    }

    #[test]
    fn test_path_index_resolver() {
        let paths = index(&[("x", "Assets/x.mat")]);
        assert_eq!(paths.resolve_path(&g("x")), Some(PathBuf::from("Assets/x.mat")));
        assert_eq!(paths.resolve_guid(Path::new("Assets/x.mat")), Some(g("x")));
        assert_eq!(paths.resolve_guid(Path::new("Assets/y.mat")), None);
    }
}
