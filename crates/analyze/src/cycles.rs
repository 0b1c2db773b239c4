//! Type dependency cycles.
//!
//! Builds a directed graph over the classes selected for type flattening:
//! one edge per distinct (source, target) pair, labelled with every
//! navigable property of the source whose value type is the target.
//! Self-references are kept apart as reflexive references. Simple cycles
//! are then enumerated, each reported once, starting at its smallest
//! vertex.
//!
//! The analysis only reads the graph.

use schemaflat_model::{Id, SchemaGraph};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Cycle enumeration stops after this many cycles.
const MAX_CYCLES: usize = 1_000;

/// The derived dependency graph.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub vertices: BTreeSet<Id>,
    /// (source, target) → contributing property names.
    pub edges: BTreeMap<(Id, Id), BTreeSet<String>>,
    /// class → names of its properties typed by itself.
    pub reflexive: BTreeMap<Id, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn build(graph: &SchemaGraph, selection: &BTreeSet<Id>) -> Self {
        let mut dg = DependencyGraph {
            vertices: selection.clone(),
            ..Default::default()
        };
        for source in selection {
            for p in graph.properties_of(source) {
                if !p.navigable {
                    continue;
                }
                let Some(target) = p.type_ref.id.as_ref().filter(|t| selection.contains(*t)) else {
                    continue;
                };
                if target == source {
                    dg.reflexive
                        .entry(source.clone())
                        .or_default()
                        .insert(p.name.clone());
                } else {
                    dg.edges
                        .entry((source.clone(), target.clone()))
                        .or_default()
                        .insert(p.name.clone());
                }
            }
        }
        dg
    }

    /// Every simple cycle as a vertex list (first vertex not repeated at
    /// the end). The flag is set when enumeration was cut short.
    ///
    /// Johnson's algorithm: for each start vertex in order, search only the
    /// strongly connected component holding it within the vertices ordered
    /// at or after it. Vertices are blocked while on a failed path and
    /// released once a cycle through them is found.
    pub fn simple_cycles(&self) -> (Vec<Vec<Id>>, bool) {
        let order: Vec<&Id> = self.vertices.iter().collect();
        let index: BTreeMap<&Id, usize> = order.iter().enumerate().map(|(i, v)| (*v, i)).collect();
        let mut adj = vec![Vec::new(); order.len()];
        let mut rev = vec![Vec::new(); order.len()];
        for (s, t) in self.edges.keys() {
            if let (Some(&si), Some(&ti)) = (index.get(s), index.get(t)) {
                adj[si].push(ti);
                rev[ti].push(si);
            }
        }

        let mut search = Circuits::new(&adj);
        for start in 0..order.len() {
            let component = component_from(&adj, &rev, start);
            if component.iter().filter(|&&c| c).count() < 2 {
                continue;
            }
            search.reset(start, component);
            search.circuit(start);
            if search.full {
                break;
            }
        }

        let truncated = search.full;
        let cycles = search
            .cycles
            .into_iter()
            .map(|c| c.into_iter().map(|i| order[i].clone()).collect())
            .collect();
        (cycles, truncated)
    }
}

/// Vertices `>= start` that lie on a cycle with `start`: reachable from it
/// and reaching it without leaving that range.
fn component_from(adj: &[Vec<usize>], rev: &[Vec<usize>], start: usize) -> Vec<bool> {
    let reach = |edges: &[Vec<usize>]| {
        let mut seen = vec![false; edges.len()];
        seen[start] = true;
        let mut pending = vec![start];
        while let Some(v) = pending.pop() {
            for &w in &edges[v] {
                if w >= start && !seen[w] {
                    seen[w] = true;
                    pending.push(w);
                }
            }
        }
        seen
    };
    let forward = reach(adj);
    let backward = reach(rev);
    forward.iter().zip(&backward).map(|(f, b)| *f && *b).collect()
}

/// Search state for one start vertex at a time.
struct Circuits<'a> {
    adj: &'a [Vec<usize>],
    start: usize,
    allowed: Vec<bool>,
    blocked: Vec<bool>,
    blocked_by: Vec<BTreeSet<usize>>,
    stack: Vec<usize>,
    cycles: Vec<Vec<usize>>,
    full: bool,
}

impl<'a> Circuits<'a> {
    fn new(adj: &'a [Vec<usize>]) -> Self {
        Circuits {
            adj,
            start: 0,
            allowed: vec![false; adj.len()],
            blocked: vec![false; adj.len()],
            blocked_by: vec![BTreeSet::new(); adj.len()],
            stack: Vec::new(),
            cycles: Vec::new(),
            full: false,
        }
    }

    fn reset(&mut self, start: usize, allowed: Vec<bool>) {
        self.start = start;
        self.allowed = allowed;
        self.blocked.iter_mut().for_each(|b| *b = false);
        self.blocked_by.iter_mut().for_each(BTreeSet::clear);
        self.stack.clear();
    }

    /// Returns true if some cycle through `start` continues from `v`.
    fn circuit(&mut self, v: usize) -> bool {
        let adj = self.adj;
        let mut found = false;
        self.stack.push(v);
        self.blocked[v] = true;
        for &w in &adj[v] {
            if self.full {
                break;
            }
            if !self.allowed[w] {
                continue;
            }
            if w == self.start {
                self.cycles.push(self.stack.clone());
                self.full = self.cycles.len() >= MAX_CYCLES;
                found = true;
            } else if !self.blocked[w] && self.circuit(w) {
                found = true;
            }
        }
        if found {
            self.unblock(v);
        } else {
            for &w in &adj[v] {
                if self.allowed[w] {
                    self.blocked_by[w].insert(v);
                }
            }
        }
        self.stack.pop();
        found
    }

    fn unblock(&mut self, v: usize) {
        self.blocked[v] = false;
        let mut pending = vec![v];
        while let Some(u) = pending.pop() {
            for w in std::mem::take(&mut self.blocked_by[u]) {
                if self.blocked[w] {
                    self.blocked[w] = false;
                    pending.push(w);
                }
            }
        }
    }
}

/// One step of a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Hop {
    pub from: Id,
    pub from_name: String,
    pub to: Id,
    pub to_name: String,
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cycle {
    pub hops: Vec<Hop>,
}

impl Cycle {
    /// `A -[p]-> B -[q,r]-> A`
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, hop) in self.hops.iter().enumerate() {
            if i == 0 {
                out.push_str(&hop.from_name);
            }
            out.push_str(&format!(" -[{}]-> {}", hop.properties.join(","), hop.to_name));
        }
        out
    }

    pub fn classes(&self) -> impl Iterator<Item = &Id> {
        self.hops.iter().map(|h| &h.from)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReflexiveReference {
    pub class: Id,
    pub class_name: String,
    pub properties: Vec<String>,
}

/// Result of the cycle analysis.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub vertex_count: usize,
    pub edge_count: usize,
    pub cycles: Vec<Cycle>,
    pub reflexive: Vec<ReflexiveReference>,
    /// True if enumeration stopped at the cycle cap.
    pub truncated: bool,
}

impl CycleReport {
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

/// Analyze dependency cycles among `selection`.
pub fn analyze_cycles(graph: &SchemaGraph, selection: &BTreeSet<Id>) -> CycleReport {
    let dg = DependencyGraph::build(graph, selection);
    let (raw, truncated) = dg.simple_cycles();
    let name = |id: &Id| {
        graph
            .class(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    let cycles = raw
        .into_iter()
        .map(|vertices| {
            let hops = vertices
                .iter()
                .enumerate()
                .map(|(i, from)| {
                    let to = &vertices[(i + 1) % vertices.len()];
                    let properties = dg
                        .edges
                        .get(&(from.clone(), to.clone()))
                        .map(|s| s.iter().cloned().collect())
                        .unwrap_or_default();
                    Hop {
                        from: from.clone(),
                        from_name: name(from),
                        to: to.clone(),
                        to_name: name(to),
                        properties,
                    }
                })
                .collect();
            Cycle { hops }
        })
        .collect::<Vec<_>>();

    let reflexive = dg
        .reflexive
        .iter()
        .map(|(class, props)| ReflexiveReference {
            class: class.clone(),
            class_name: name(class),
            properties: props.iter().cloned().collect(),
        })
        .collect();

    tracing::debug!(
        vertices = dg.vertices.len(),
        edges = dg.edges.len(),
        cycles = cycles.len(),
        "type dependency analysis"
    );

    CycleReport {
        vertex_count: dg.vertices.len(),
        edge_count: dg.edges.len(),
        cycles,
        reflexive,
        truncated,
    }
}
