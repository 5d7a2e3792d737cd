use crate::model::ArchSpec;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Directed dependency graph over a spec's components.
///
/// `forward[a]` lists the targets of `a`'s connections: the components
/// that depend on `a`. `reverse[b]` lists `b`'s upstream providers.
/// Connections with an unknown endpoint are left out.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    ids: Vec<String>,
    forward: HashMap<String, Vec<String>>,
    reverse: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn build(spec: &ArchSpec) -> Self {
        let ids: Vec<String> = spec.components.iter().map(|c| c.id.clone()).collect();
        let mut forward: HashMap<String, Vec<String>> =
            ids.iter().map(|id| (id.clone(), Vec::new())).collect();
        let mut reverse = forward.clone();

        for conn in &spec.connections {
            if !forward.contains_key(&conn.source) || !forward.contains_key(&conn.target) {
                continue;
            }
            if let Some(targets) = forward.get_mut(&conn.source) {
                targets.push(conn.target.clone());
            }
            if let Some(sources) = reverse.get_mut(&conn.target) {
                sources.push(conn.source.clone());
            }
        }

        Self {
            ids,
            forward,
            reverse,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.forward.contains_key(id)
    }

    /// Component ids in spec order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Components that directly depend on `id`.
    pub fn direct_dependents(&self, id: &str) -> &[String] {
        self.forward.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Components `id` directly depends on.
    pub fn upstream(&self, id: &str) -> &[String] {
        self.reverse.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Everything reachable from `id` over forward edges, excluding `id`
    /// itself, in BFS discovery order.
    pub fn transitive_dependents(&self, id: &str) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = self
            .direct_dependents(id)
            .iter()
            .map(String::as_str)
            .collect();

        while let Some(node) = queue.pop_front() {
            if node == id || !visited.insert(node) {
                continue;
            }
            order.push(node.to_string());
            queue.extend(self.direct_dependents(node).iter().map(String::as_str));
        }

        order
    }

    /// True when `id` is the only upstream of at least one of its dependents.
    pub fn is_spof(&self, id: &str) -> bool {
        self.direct_dependents(id)
            .iter()
            .any(|dep| matches!(self.upstream(dep), [only] if only == id))
    }

    /// Components with no inbound edge, in spec order.
    pub fn roots(&self) -> Vec<&str> {
        self.ids
            .iter()
            .filter(|id| self.upstream(id).is_empty())
            .map(String::as_str)
            .collect()
    }

    /// Strongly connected components that form a cycle (two or more
    /// members, or a self-loop). Members are listed in spec order.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let mut indices: HashMap<&str, NodeIndex> = HashMap::new();
        for (pos, id) in self.ids.iter().enumerate() {
            indices.insert(id.as_str(), graph.add_node(pos));
        }
        for id in &self.ids {
            for target in self.direct_dependents(id) {
                if let (Some(&from), Some(&to)) =
                    (indices.get(id.as_str()), indices.get(target.as_str()))
                {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let mut cycles: Vec<Vec<usize>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| match scc.as_slice() {
                [single] => graph.contains_edge(*single, *single),
                _ => true,
            })
            .map(|scc| {
                let mut members: Vec<usize> = scc.iter().map(|idx| graph[*idx]).collect();
                members.sort_unstable();
                members
            })
            .collect();
        cycles.sort();

        cycles
            .into_iter()
            .map(|members| members.into_iter().map(|pos| self.ids[pos].clone()).collect())
            .collect()
    }

    /// Forward adjacency keyed by id, for serialized output.
    pub fn forward_map(&self) -> BTreeMap<String, Vec<String>> {
        self.forward
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn reverse_map(&self) -> BTreeMap<String, Vec<String>> {
        self.reverse
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, Connection, Provider};

    fn spec(ids: &[&str], edges: &[(&str, &str)]) -> ArchSpec {
        let mut spec = ArchSpec::new("graph");
        for id in ids {
            spec = spec.with_component(Component::new(*id, "ec2", Provider::Aws, *id).unwrap());
        }
        for (from, to) in edges {
            spec = spec.with_connection(Connection::new(*from, *to));
        }
        spec
    }

    #[test]
    fn test_dangling_edges_excluded() {
        let graph = DependencyGraph::build(&spec(&["a", "b"], &[("a", "b"), ("a", "ghost")]));
        assert_eq!(graph.direct_dependents("a"), ["b".to_string()]);
        assert!(graph.direct_dependents("ghost").is_empty());
        assert!(!graph.contains("ghost"));
    }

    #[test]
    fn test_transitive_bfs_order() {
        let graph = DependencyGraph::build(&spec(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        ));
        assert_eq!(graph.transitive_dependents("a"), vec!["b", "c", "d"]);
        assert!(graph.transitive_dependents("d").is_empty());
    }

    #[test]
    fn test_transitive_terminates_on_cycle() {
        let graph = DependencyGraph::build(&spec(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]));
        assert_eq!(graph.transitive_dependents("a"), vec!["b", "c"]);
        assert_eq!(graph.cycles(), vec![vec!["a", "b", "c"]]);
        assert!(graph.roots().is_empty());
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let graph = DependencyGraph::build(&spec(&["a", "b"], &[("a", "a"), ("a", "b")]));
        assert_eq!(graph.cycles(), vec![vec!["a"]]);
        assert_eq!(graph.transitive_dependents("a"), vec!["b"]);
    }

    #[test]
    fn test_spof_flips_with_second_upstream() {
        let single = DependencyGraph::build(&spec(&["lb", "web"], &[("lb", "web")]));
        assert!(single.is_spof("lb"));

        let redundant = DependencyGraph::build(&spec(
            &["lb", "lb2", "web"],
            &[("lb", "web"), ("lb2", "web")],
        ));
        assert!(!redundant.is_spof("lb"));
        assert!(!redundant.is_spof("lb2"));
    }

    #[test]
    fn test_roots_in_spec_order() {
        let graph = DependencyGraph::build(&spec(&["db", "web", "cdn"], &[("cdn", "web"), ("web", "db")]));
        assert_eq!(graph.roots(), vec!["cdn"]);
    }
}
