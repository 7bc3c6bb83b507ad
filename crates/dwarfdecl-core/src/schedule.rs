//! # Scheduler
//!
//! Discovers every declaration the requested items need and emits them in an
//! order a compiler accepts.
//!
//! ## Closure
//!
//! Work items (`DECL x` or `DEF x`) are processed from a FIFO worklist. Each
//! item's text is generated with a [`DependencyTracker`] as the referencer:
//! every name the generator asks for becomes an ordering edge from the
//! current item, and every item reached that way for the first time is
//! appended to the worklist. Generation and discovery are the same pass.
//!
//! ## Emission
//!
//! Rounds of "emit everything whose dependencies are already out". Progress
//! is monotone, so the loop ends with all fragments emitted, or with a round
//! that emits nothing; the latter is a genuine dependency cycle and fails
//! with a [`StuckReport`].

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, error, trace, warn};

use crate::config::GeneratorConfig;
use crate::declgen::DeclGen;
use crate::dedup::{summary_code, TypeSet};
use crate::error::{DeclError, Result};
use crate::graph::{DieGraph, DieId, Tag};
use crate::interface::Interface;
use crate::naming::{Namer, RefKind, Referencer};

/// Whether a forward declaration or a full definition is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmitKind
{
    Decl,
    Def,
}

/// One fragment the scheduler must produce.
///
/// `die` is always a canonical representative, so structurally equal nodes
/// share their work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkItem
{
    pub kind: EmitKind,
    pub die: DieId,
}

impl WorkItem
{
    #[must_use]
    pub fn decl(die: DieId) -> Self
    {
        Self { kind: EmitKind::Decl, die }
    }

    #[must_use]
    pub fn def(die: DieId) -> Self
    {
        Self { kind: EmitKind::Def, die }
    }

    /// Stable offset-based label, e.g. `decl_of_0x2d`.
    #[must_use]
    pub fn label(&self, graph: &DieGraph) -> String
    {
        let kind = match self.kind {
            EmitKind::Decl => "decl",
            EmitKind::Def => "def",
        };
        format!("{kind}_of_0x{:x}", graph.offset(self.die))
    }
}

/// The unsatisfiable remainder of a failed emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StuckReport
{
    /// Labels of the items that could not be emitted
    pub pending: Vec<String>,
    /// `(from, to)`: `from` waits for `to`, which was never emitted
    pub edges: Vec<(String, String)>,
}

impl StuckReport
{
    /// The remaining constraints as a Graphviz digraph.
    #[must_use]
    pub fn to_dot(&self) -> String
    {
        let mut out = String::from("digraph stuck_with_order_constraints {\n");
        for (from, to) in &self.edges {
            out.push_str(&format!("    {from} -> {to};\n"));
        }
        out.push('}');
        out
    }
}

impl fmt::Display for StuckReport
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.to_dot())
    }
}

/// A [`Referencer`] that records what the current item depends on.
///
/// Names come from the wrapped [`Namer`], always for the canonical
/// representative of the node. Successful references add edges:
///
/// - `Normal`: to `DECL x`
/// - `TypeMustBeComplete`: to `DECL x` and, when the concrete type of `x` is
///   a struct, union, class or enum, to its `DEF`
/// - `Defining`: none
///
/// Builtin types (void, base types) have no fragment and get no edge.
pub struct DependencyTracker<'s, 'g>
{
    graph: &'g DieGraph,
    namer: &'s mut Namer<'g>,
    types: &'s mut TypeSet,
    current: WorkItem,
    dependencies: IndexSet<WorkItem>,
}

impl<'s, 'g> DependencyTracker<'s, 'g>
{
    pub fn new(namer: &'s mut Namer<'g>, types: &'s mut TypeSet, current: WorkItem) -> Self
    {
        Self {
            graph: namer.graph(),
            namer,
            types,
            current,
            dependencies: IndexSet::new(),
        }
    }

    fn depend(&mut self, item: WorkItem)
    {
        if item != self.current {
            self.dependencies.insert(item);
        }
    }

    /// The items the current one depends on, in discovery order.
    #[must_use]
    pub fn into_dependencies(self) -> IndexSet<WorkItem>
    {
        self.dependencies
    }
}

impl Referencer for DependencyTracker<'_, '_>
{
    fn name_for(&mut self, t: Option<DieId>, kind: RefKind) -> Option<String>
    {
        let graph = self.graph;
        let Some(id) = t else {
            return self.namer.name(None, kind);
        };
        let canonical = self.types.canonical(graph, id);
        let name = self.namer.name(Some(canonical), kind)?;

        let builtin = matches!(graph.tag(canonical), Tag::BaseType | Tag::UnspecifiedType);
        if builtin || kind == RefKind::Defining {
            return Some(name);
        }

        self.depend(WorkItem::decl(canonical));
        if kind == RefKind::TypeMustBeComplete {
            if let Some(concrete) = graph.concrete_type(Some(canonical)) {
                if graph.tag(concrete).is_tagged() {
                    let concrete = self.types.canonical(graph, concrete);
                    self.depend(WorkItem::def(concrete));
                }
            }
        }
        Some(name)
    }
}

/// One emitted fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFragment
{
    pub item: WorkItem,
    pub text: String,
    /// Emission round; fragments of one round do not depend on each other
    pub round: usize,
}

/// The ordered output of a successful run.
#[derive(Debug, Clone, Default)]
pub struct Emission
{
    pub fragments: Vec<EmittedFragment>,
    pub group_comments: bool,
}

impl Emission
{
    /// Position of `item` in emission order.
    #[must_use]
    pub fn position(&self, item: WorkItem) -> Option<usize>
    {
        self.fragments.iter().position(|fragment| fragment.item == item)
    }

    /// Non-empty fragment texts in emission order.
    pub fn texts(&self) -> impl Iterator<Item = &str>
    {
        self.fragments
            .iter()
            .map(|fragment| fragment.text.as_str())
            .filter(|text| !text.is_empty())
    }

    /// Concatenate the fragments into a header body.
    #[must_use]
    pub fn render(&self) -> String
    {
        let mut out = String::new();
        let mut current_round = None;
        for fragment in self.fragments.iter().filter(|fragment| !fragment.text.is_empty()) {
            if current_round != Some(fragment.round) {
                if self.group_comments {
                    if let Some(round) = current_round {
                        out.push_str(&format!("// end group {round}\n\n"));
                    }
                    out.push_str(&format!("// begin group {}\n", fragment.round));
                }
                current_round = Some(fragment.round);
            }
            out.push_str(&fragment.text);
            out.push('\n');
        }
        if self.group_comments {
            if let Some(round) = current_round {
                out.push_str(&format!("// end group {round}\n"));
            }
        }
        out
    }
}

/// Closure-and-emit driver for one run over one graph.
pub struct Scheduler<'g>
{
    graph: &'g DieGraph,
    config: &'g GeneratorConfig,
    namer: Namer<'g>,
    types: TypeSet,
    worklist: VecDeque<WorkItem>,
    seen: HashSet<WorkItem>,
    fragments: IndexMap<WorkItem, String>,
    edges: IndexMap<WorkItem, IndexSet<WorkItem>>,
    owners: HashMap<(EmitKind, String), WorkItem>,
}

impl<'g> Scheduler<'g>
{
    #[must_use]
    pub fn new(graph: &'g DieGraph, config: &'g GeneratorConfig) -> Self
    {
        Self::with_types(graph, config, TypeSet::new())
    }

    /// Start from an existing dedup set so that canonical representatives
    /// agree with an earlier gathering pass.
    #[must_use]
    pub fn with_types(graph: &'g DieGraph, config: &'g GeneratorConfig, types: TypeSet) -> Self
    {
        Self {
            graph,
            config,
            namer: Namer::new(graph, config),
            types,
            worklist: VecDeque::new(),
            seen: HashSet::new(),
            fragments: IndexMap::new(),
            edges: IndexMap::new(),
            owners: HashMap::new(),
        }
    }

    /// A scheduler seeded from a gathered [`Interface`].
    ///
    /// Aggregates and enumerations are seeded as definitions, typedefs,
    /// subprograms and variables as declarations. Composed types (pointers,
    /// arrays, qualifiers, function types) and base types are never seeded.
    #[must_use]
    pub fn from_interface(graph: &'g DieGraph, config: &'g GeneratorConfig, interface: Interface) -> Self
    {
        let Interface { roots, types } = interface;
        let candidates: Vec<DieId> = roots.iter().copied().chain(types.iter()).collect();
        let mut scheduler = Self::with_types(graph, config, types);
        for id in candidates {
            if let Some(item) = scheduler.seed_for(id) {
                scheduler.seed(item);
            }
        }
        scheduler
    }

    fn seed_for(&mut self, id: DieId) -> Option<WorkItem>
    {
        let graph = self.graph;
        match graph.tag(id) {
            tag if tag.is_tagged() => {
                self.namer.name(Some(id), RefKind::Defining)?;
                if graph[id].declaration {
                    Some(WorkItem::decl(id))
                } else {
                    Some(WorkItem::def(id))
                }
            }
            Tag::Typedef | Tag::Subprogram | Tag::Variable => Some(WorkItem::decl(id)),
            _ => None,
        }
    }

    /// Add a root item; its node is canonicalized first.
    pub fn seed(&mut self, item: WorkItem)
    {
        let die = self.types.canonical(self.graph, item.die);
        let item = WorkItem { kind: item.kind, die };
        if self.seen.insert(item) {
            trace!("Seeded {}", item.label(self.graph));
            self.worklist.push_back(item);
        }
    }

    /// Run the closure phase until the worklist drains.
    ///
    /// ## Errors
    ///
    /// [`DeclError::Unnameable`] from the generator, or
    /// [`DeclError::MissingFragment`] if an edge target ends up without text.
    pub fn close(&mut self) -> Result<()>
    {
        let graph = self.graph;
        let gen = DeclGen::new(graph, self.config);

        while let Some(item) = self.worklist.pop_front() {
            if self.fragments.contains_key(&item) {
                continue;
            }
            if self.suppress_duplicate(item) {
                continue;
            }

            let mut tracker = DependencyTracker::new(&mut self.namer, &mut self.types, item);
            let text = match item.kind {
                EmitKind::Decl => gen.decl_of_die(item.die, &mut tracker)?,
                EmitKind::Def => gen.defn_of_die(item.die, &mut tracker)?,
            };
            let dependencies = tracker.into_dependencies();

            trace!("{} depends on {} item(s)", item.label(graph), dependencies.len());
            for dep in &dependencies {
                if self.seen.insert(*dep) {
                    self.worklist.push_back(*dep);
                }
            }
            self.edges.entry(item).or_default().extend(dependencies);
            self.fragments.insert(item, text);
        }

        for (from, targets) in &self.edges {
            if let Some(missing) = targets.iter().find(|to| !self.fragments.contains_key(*to)) {
                return Err(DeclError::MissingFragment(format!(
                    "{} (needed by {})",
                    missing.label(graph),
                    from.label(graph)
                )));
            }
        }

        debug!(
            "Closure complete: {} fragment(s), {} edge(s)",
            self.fragments.len(),
            self.edges.values().map(IndexSet::len).sum::<usize>()
        );
        Ok(())
    }

    /// First-seen wins when two different items would define the same name.
    ///
    /// The later item gets no text and waits for the winner, so anything
    /// depending on it still comes after the surviving definition.
    fn suppress_duplicate(&mut self, item: WorkItem) -> bool
    {
        let graph = self.graph;
        let Some(name) = self.namer.name(Some(item.die), RefKind::Defining) else {
            return false;
        };
        match self.owners.entry((item.kind, name)) {
            Entry::Vacant(entry) => {
                entry.insert(item);
                false
            }
            Entry::Occupied(entry) => {
                let owner = *entry.get();
                if owner == item {
                    return false;
                }
                if summary_code(graph, owner.die) == summary_code(graph, item.die) {
                    debug!("{} duplicates {}", item.label(graph), owner.label(graph));
                } else {
                    warn!(
                        "Conflicting definitions of '{}': keeping {} ({}), dropping {} ({})",
                        entry.key().1,
                        owner.label(graph),
                        graph.summary(owner.die),
                        item.label(graph),
                        graph.summary(item.die)
                    );
                }
                self.edges.entry(item).or_default().insert(owner);
                self.fragments.insert(item, String::new());
                true
            }
        }
    }

    /// Order the generated fragments.
    ///
    /// ## Errors
    ///
    /// [`DeclError::Stuck`] when a round emits nothing while fragments remain.
    pub fn emit(&self) -> Result<Emission>
    {
        let graph = self.graph;
        let no_deps = IndexSet::new();
        let mut emitted: HashSet<WorkItem> = HashSet::new();
        let mut pending: Vec<WorkItem> = self.fragments.keys().copied().collect();
        let mut emission = Emission {
            fragments: Vec::with_capacity(pending.len()),
            group_comments: self.config.group_comments,
        };
        let mut round = 0;

        while !pending.is_empty() {
            let deps_of = |item: WorkItem| self.edges.get(&item).unwrap_or(&no_deps);
            let (ready, blocked): (Vec<WorkItem>, Vec<WorkItem>) = pending
                .into_iter()
                .partition(|item| deps_of(*item).iter().all(|dep| emitted.contains(dep)));

            if ready.is_empty() {
                let mut report = StuckReport {
                    pending: blocked.iter().map(|item| item.label(graph)).collect(),
                    edges: Vec::new(),
                };
                for item in &blocked {
                    for dep in deps_of(*item).iter().filter(|dep| !emitted.contains(*dep)) {
                        report.edges.push((item.label(graph), dep.label(graph)));
                    }
                }
                error!("Emission stuck with {} pending fragment(s)\n{}", report.pending.len(), report);
                return Err(DeclError::Stuck(report));
            }

            trace!("Round {round}: emitting {} fragment(s)", ready.len());
            for item in ready {
                emitted.insert(item);
                emission.fragments.push(EmittedFragment {
                    item,
                    text: self.fragments.get(&item).cloned().unwrap_or_default(),
                    round,
                });
            }
            pending = blocked;
            round += 1;
        }

        debug!("Emitted {} fragment(s) in {round} round(s)", emission.fragments.len());
        Ok(emission)
    }

    /// Closure followed by emission.
    ///
    /// ## Errors
    ///
    /// See [`Scheduler::close`] and [`Scheduler::emit`].
    pub fn run(mut self) -> Result<Emission>
    {
        self.close()?;
        self.emit()
    }

    /// Generated text of an item, after [`Scheduler::close`].
    #[must_use]
    pub fn fragment(&self, item: WorkItem) -> Option<&str>
    {
        self.fragments.get(&item).map(String::as_str)
    }

    /// All generated items, in generation order.
    pub fn items(&self) -> impl Iterator<Item = WorkItem> + '_
    {
        self.fragments.keys().copied()
    }

    /// Every recorded edge `(from, to)`: `to` must be emitted before `from`.
    pub fn edges(&self) -> impl Iterator<Item = (WorkItem, WorkItem)> + '_
    {
        self.edges
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (*from, *to)))
    }

    /// Canonical representative of a node, as used in work items.
    pub fn canonical(&mut self, id: DieId) -> DieId
    {
        self.types.canonical(self.graph, id)
    }

    /// Record an extra ordering edge between two items.
    ///
    /// Both items are seeded. Used to force constraints the generator would
    /// not discover by itself.
    pub fn add_edge(&mut self, from: WorkItem, to: WorkItem)
    {
        let from = WorkItem { kind: from.kind, die: self.canonical(from.die) };
        let to = WorkItem { kind: to.kind, die: self.canonical(to.die) };
        self.seed(from);
        self.seed(to);
        self.edges.entry(from).or_default().insert(to);
    }
}
