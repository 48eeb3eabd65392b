use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::error::{NeedleError, Result};
use crate::naming::node_to_package_name;

/// Internal package dependencies and their partition into independent
/// packages and dependency levels. Keys are folder keys (`/`, `/sub`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    /// Package => packages it imports. Sorted, deduplicated.
    pub outbound: BTreeMap<String, Vec<String>>,
    /// Package => packages importing it. Sorted, deduplicated.
    pub inbound: BTreeMap<String, Vec<String>>,
    /// Packages with no inbound and no outbound edges, sorted.
    pub independent: Vec<String>,
    /// Level => packages at that level, each list sorted.
    pub levels: BTreeMap<usize, Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph over `packages` from each package's internal imports.
    ///
    /// Self edges are ignored. Edges to folders that are not packages are
    /// dropped with a warning since they can never be leveled.
    pub fn build<'a>(
        packages: impl IntoIterator<Item = &'a str>,
        imports: &BTreeMap<String, BTreeSet<String>>,
    ) -> Result<Self> {
        let packages: BTreeSet<&str> = packages.into_iter().collect();

        let mut outbound: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut inbound: BTreeMap<String, Vec<String>> = packages
            .iter()
            .map(|p| (p.to_string(), Vec::new()))
            .collect();

        for &package in &packages {
            let mut targets = Vec::new();
            for target in imports.get(package).into_iter().flatten() {
                if target == package {
                    continue;
                }
                if !packages.contains(target.as_str()) {
                    tracing::warn!(
                        from = %package,
                        to = %target,
                        "dropping import of a folder without source files"
                    );
                    continue;
                }
                targets.push(target.clone());
                if let Some(users) = inbound.get_mut(target) {
                    users.push(package.to_string());
                }
            }
            outbound.insert(package.to_string(), targets);
        }

        let independent: Vec<String> = packages
            .iter()
            .filter(|p| outbound[**p].is_empty() && inbound[**p].is_empty())
            .map(|p| p.to_string())
            .collect();

        let levels = assign_levels(&outbound, &independent)?;

        tracing::info!(
            packages = packages.len(),
            independent = independent.len(),
            levels = levels.len(),
            "leveled dependency graph"
        );

        Ok(Self {
            outbound,
            inbound,
            independent,
            levels,
        })
    }

    pub fn dependencies_of(&self, package: &str) -> &[String] {
        self.outbound.get(package).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn users_of(&self, package: &str) -> &[String] {
        self.inbound.get(package).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn level_of(&self, package: &str) -> Option<usize> {
        self.levels
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == package))
            .map(|(level, _)| *level)
    }

    /// Level 0 packages.
    pub fn sinks(&self) -> &[String] {
        self.levels.get(&0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.outbound.values().map(Vec::len).sum()
    }
}

/// Longest path to a sink, by repeated relaxation over a work queue.
///
/// A package is re-queued until all of its dependencies have a level. A full
/// pass over the queue without assigning anything means the rest of the queue
/// sits on or behind an import cycle.
fn assign_levels(
    outbound: &BTreeMap<String, Vec<String>>,
    independent: &[String],
) -> Result<BTreeMap<usize, Vec<String>>> {
    let mut queue: VecDeque<&str> = outbound
        .keys()
        .map(String::as_str)
        .filter(|p| !independent.iter().any(|i| i.as_str() == *p))
        .collect();
    let mut level: HashMap<&str, usize> = HashMap::with_capacity(queue.len());
    let mut deferred = 0;

    while let Some(package) = queue.pop_front() {
        let deps = &outbound[package];
        let resolved: Option<Vec<usize>> = deps
            .iter()
            .map(|d| level.get(d.as_str()).copied())
            .collect();
        match resolved {
            Some(dep_levels) => {
                let value = dep_levels.into_iter().max().map_or(0, |max| max + 1);
                level.insert(package, value);
                deferred = 0;
            }
            None => {
                queue.push_back(package);
                deferred += 1;
                if deferred >= queue.len() {
                    let remaining: Vec<&str> = queue.iter().copied().collect();
                    return Err(NeedleError::DependencyCycle {
                        packages: find_cycles(outbound, &remaining),
                    });
                }
            }
        }
    }

    let mut levels: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (package, value) in level {
        levels.entry(value).or_default().push(package.to_string());
    }
    for members in levels.values_mut() {
        members.sort();
    }
    Ok(levels)
}

/// Package names on a cycle among `remaining`, found as strongly connected
/// components with more than one member.
fn find_cycles(outbound: &BTreeMap<String, Vec<String>>, remaining: &[&str]) -> Vec<String> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let index: HashMap<&str, NodeIndex> = remaining
        .iter()
        .map(|&p| (p, graph.add_node(p)))
        .collect();
    for &package in remaining {
        for dep in &outbound[package] {
            if let Some(&to) = index.get(dep.as_str()) {
                graph.add_edge(index[package], to, ());
            }
        }
    }

    let mut members: Vec<String> = petgraph::algo::kosaraju_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .flatten()
        .map(|idx| node_to_package_name(graph[idx]))
        .collect();
    if members.is_empty() {
        members = remaining.iter().map(|p| node_to_package_name(p)).collect();
    }
    members.sort();
    members.dedup();
    members
}
