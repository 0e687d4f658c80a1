//! # Module registry and dependency graph.
//!
//! Owns every module the engine has heard of, its definition, its value and the
//! reverse edges (`dependents`) used to propagate resolution.
//!
//! ## Module states
//! ```text
//!             define()                deps resolved            callback Ok
//! Requested ───────────► Waiting ─────────────────► Evaluating ───────────► Resolved
//!     │                                                   │
//!     │ settle() (remote resources)                       └── callback Err ──► Failed
//!     └──────────────────────────────────────────────────────────────────────► Resolved
//! ```
//!
//! A selector that cannot be applied to a dependency value also moves the
//! dependent module to `Failed`.
//!
//! ## Rules
//! - A module is defined at most once; later definitions are reported and ignored.
//! - A definition runs exactly once, and only when every dependency is `Resolved`.
//! - Propagation is an iterative worklist: resolving a module enqueues its dependents.
//! - Callbacks never run while the graph lock is held, so they may re-enter the engine.
//! - A definition that would close a cycle is rejected at `define` time.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::error::{BoxError, ResolveError};
use crate::events::{Bus, Event, EventKind};
use crate::selector::select;

/// Definition callback: receives the selected dependency values in declaration order.
pub type Definition = Box<dyn FnOnce(Vec<Value>) -> Result<Value, BoxError> + Send + 'static>;

/// Public view of a module's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    /// Named as a dependency; waiting for a loader to define or settle it.
    Requested,
    /// Defined; waiting for its dependencies.
    Waiting,
    /// Definition callback is running.
    Evaluating,
    /// Has a value.
    Resolved,
    /// Definition callback returned an error.
    Failed,
}

enum ModuleState {
    Requested,
    Waiting(Definition),
    Evaluating,
    Resolved(Value),
    Failed,
}

impl ModuleState {
    fn status(&self) -> ModuleStatus {
        match self {
            ModuleState::Requested => ModuleStatus::Requested,
            ModuleState::Waiting(_) => ModuleStatus::Waiting,
            ModuleState::Evaluating => ModuleStatus::Evaluating,
            ModuleState::Resolved(_) => ModuleStatus::Resolved,
            ModuleState::Failed => ModuleStatus::Failed,
        }
    }
}

struct ModuleEntry {
    deps: Vec<String>,
    selectors: Vec<Vec<String>>,
    state: ModuleState,
}

impl ModuleEntry {
    fn requested() -> Self {
        Self {
            deps: Vec::new(),
            selectors: Vec::new(),
            state: ModuleState::Requested,
        }
    }

    fn value(&self) -> Option<&Value> {
        match &self.state {
            ModuleState::Resolved(value) => Some(value),
            _ => None,
        }
    }
}

/// A module whose dependencies are all resolved, taken out of the graph for evaluation.
struct Ready {
    definition: Definition,
    args: Vec<Value>,
}

#[derive(Default)]
struct Graph {
    modules: HashMap<String, ModuleEntry>,
    /// dependency name → modules whose definition lists it.
    dependents: HashMap<String, Vec<String>>,
}

impl Graph {
    /// Selected values for `deps`, or `None` while any of them is unresolved.
    fn collect_args(
        &self,
        deps: &[String],
        selectors: &[Vec<String>],
    ) -> Result<Option<Vec<Value>>, ResolveError> {
        let mut values = Vec::with_capacity(deps.len());
        for dep in deps {
            match self.modules.get(dep).and_then(ModuleEntry::value) {
                Some(value) => values.push(value),
                None => return Ok(None),
            }
        }

        deps.iter()
            .zip(values)
            .enumerate()
            .map(|(i, (dep, value))| {
                let chain = selectors.get(i).map(Vec::as_slice).unwrap_or_default();
                select(dep, value, chain)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// Returns the cycle `name → … → name` that defining `name` with `deps` would close.
    fn find_cycle(&self, name: &str, deps: &[String]) -> Option<Vec<String>> {
        let mut explored: HashSet<&str> = HashSet::new();

        for start in deps {
            // (node, index of the next dependency to visit)
            let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            while let Some(&(node, idx)) = stack.last() {
                if node == name {
                    let mut chain = vec![name.to_string()];
                    chain.extend(stack.iter().map(|(n, _)| n.to_string()));
                    return Some(chain);
                }
                if idx == 0 && !explored.insert(node) {
                    stack.pop();
                    continue;
                }
                match self.modules.get(node).and_then(|e| e.deps.get(idx)) {
                    Some(dep) => {
                        if let Some(top) = stack.last_mut() {
                            top.1 += 1;
                        }
                        stack.push((dep.as_str(), 0));
                    }
                    None => {
                        stack.pop();
                    }
                }
            }
        }
        None
    }

    fn dependents_of(&self, name: &str) -> Vec<String> {
        self.dependents.get(name).cloned().unwrap_or_default()
    }
}

/// Registry of modules and their dependency graph.
pub struct Registry {
    graph: Mutex<Graph>,
    bus: Bus,
}

impl Registry {
    /// Creates an empty registry publishing to `bus`.
    pub fn new(bus: Bus) -> Self {
        Self {
            graph: Mutex::new(Graph::default()),
            bus,
        }
    }

    fn graph(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True if `name` was ever requested, defined or settled.
    pub fn contains(&self, name: &str) -> bool {
        self.graph().modules.contains_key(name)
    }

    /// Registers `name` as a dependency-only module.
    ///
    /// Returns `true` if the module was unknown (the caller should trigger its load).
    pub fn register(&self, name: &str) -> bool {
        let mut graph = self.graph();
        if graph.modules.contains_key(name) {
            return false;
        }
        graph
            .modules
            .insert(name.to_string(), ModuleEntry::requested());
        true
    }

    /// Current state of `name`, if known.
    pub fn status(&self, name: &str) -> Option<ModuleStatus> {
        self.graph().modules.get(name).map(|e| e.state.status())
    }

    /// True if `name` has a definition or a value.
    pub fn is_defined(&self, name: &str) -> bool {
        self.status(name)
            .is_some_and(|status| status != ModuleStatus::Requested)
    }

    /// Resolved value of `name` (cloned).
    pub fn value(&self, name: &str) -> Option<Value> {
        self.graph()
            .modules
            .get(name)
            .and_then(ModuleEntry::value)
            .cloned()
    }

    /// Sorted names of modules that do not have a value yet.
    pub fn unresolved(&self) -> Vec<String> {
        let graph = self.graph();
        let mut names: Vec<String> = graph
            .modules
            .iter()
            .filter(|(_, entry)| entry.value().is_none())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }

    /// Selected values for `deps` in declaration order, or `None` while any is unresolved.
    pub fn collect_args(
        &self,
        deps: &[String],
        selectors: &[Vec<String>],
    ) -> Result<Option<Vec<Value>>, ResolveError> {
        self.graph().collect_args(deps, selectors)
    }

    /// Stores a definition for `name` and attempts to resolve it.
    ///
    /// Returns `Ok(false)` (and publishes `DuplicateDefinition`) if `name` already
    /// has a definition or a value. Errors raised while resolving `name` or its
    /// dependents are returned after the stored definition is kept.
    pub fn define(
        &self,
        name: &str,
        deps: Vec<String>,
        selectors: Vec<Vec<String>>,
        definition: Definition,
    ) -> Result<bool, ResolveError> {
        {
            let mut graph = self.graph();
            let duplicate = graph
                .modules
                .get(name)
                .is_some_and(|e| !matches!(e.state, ModuleState::Requested));
            if duplicate {
                drop(graph);
                self.bus.publish(
                    Event::new(EventKind::DuplicateDefinition)
                        .with_module(name)
                        .with_reason("module is already defined"),
                );
                return Ok(false);
            }

            if let Some(chain) = graph.find_cycle(name, &deps) {
                drop(graph);
                let err = ResolveError::Cycle { chain };
                self.bus.publish(
                    Event::new(EventKind::CycleDetected)
                        .with_module(name)
                        .with_reason(err.to_string()),
                );
                return Err(err);
            }

            for dep in &deps {
                let back = graph.dependents.entry(dep.clone()).or_default();
                if !back.iter().any(|d| d == name) {
                    back.push(name.to_string());
                }
            }

            let entry = graph
                .modules
                .entry(name.to_string())
                .or_insert_with(ModuleEntry::requested);
            entry.deps = deps;
            entry.selectors = selectors;
            entry.state = ModuleState::Waiting(definition);
        }

        self.bus
            .publish(Event::new(EventKind::ModuleDefined).with_module(name));
        self.resolve(name)?;
        Ok(true)
    }

    /// Resolves a requested module from outside (remote resources) and propagates.
    ///
    /// Returns `Ok(false)` if the module already has a definition or a value.
    pub fn settle(&self, name: &str, value: Value) -> Result<bool, ResolveError> {
        let dependents = {
            let mut graph = self.graph();
            let entry = graph
                .modules
                .entry(name.to_string())
                .or_insert_with(ModuleEntry::requested);
            if !matches!(entry.state, ModuleState::Requested) {
                return Ok(false);
            }
            entry.state = ModuleState::Resolved(value);
            graph.dependents_of(name)
        };

        self.bus
            .publish(Event::new(EventKind::ModuleResolved).with_module(name));
        self.propagate(dependents.into())?;
        Ok(true)
    }

    /// Attempts to resolve `name`, then everything that became ready because of it.
    ///
    /// Returns how many modules were resolved. Every ready module in the pass is
    /// evaluated even if an earlier one fails; the first error is returned.
    pub fn resolve(&self, name: &str) -> Result<usize, ResolveError> {
        self.propagate(VecDeque::from([name.to_string()]))
    }

    fn propagate(&self, mut queue: VecDeque<String>) -> Result<usize, ResolveError> {
        let mut resolved = 0;
        let mut first_err: Option<ResolveError> = None;

        while let Some(name) = queue.pop_front() {
            let step = self.take_ready(&name).and_then(|ready| match ready {
                Some(Ready { definition, args }) => {
                    let result = definition(args);
                    self.complete(&name, result).map(Some)
                }
                None => Ok(None),
            });
            match step {
                Ok(Some(dependents)) => {
                    resolved += 1;
                    queue.extend(dependents);
                }
                Ok(None) => {}
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(resolved),
        }
    }

    /// Moves a ready module from `Waiting` to `Evaluating` and hands out its definition.
    ///
    /// A selector error fails the module for good.
    fn take_ready(&self, name: &str) -> Result<Option<Ready>, ResolveError> {
        let mut graph = self.graph();
        let Some(entry) = graph.modules.get(name) else {
            return Ok(None);
        };
        if !matches!(entry.state, ModuleState::Waiting(_)) {
            return Ok(None);
        }
        let args = match graph.collect_args(&entry.deps, &entry.selectors) {
            Ok(Some(args)) => args,
            Ok(None) => return Ok(None),
            Err(err) => {
                if let Some(entry) = graph.modules.get_mut(name) {
                    entry.state = ModuleState::Failed;
                }
                drop(graph);
                self.bus.publish(
                    Event::new(EventKind::DefinitionFailed)
                        .with_module(name)
                        .with_reason(err.to_string()),
                );
                return Err(err);
            }
        };

        let Some(entry) = graph.modules.get_mut(name) else {
            return Ok(None);
        };
        match std::mem::replace(&mut entry.state, ModuleState::Evaluating) {
            ModuleState::Waiting(definition) => Ok(Some(Ready { definition, args })),
            other => {
                entry.state = other;
                Ok(None)
            }
        }
    }

    /// Stores the outcome of a definition and returns the dependents to re-check.
    fn complete(
        &self,
        name: &str,
        result: Result<Value, BoxError>,
    ) -> Result<Vec<String>, ResolveError> {
        match result {
            Ok(value) => {
                let empty = value.is_null();
                let dependents = {
                    let mut graph = self.graph();
                    if let Some(entry) = graph.modules.get_mut(name) {
                        entry.state = ModuleState::Resolved(value);
                    }
                    graph.dependents_of(name)
                };
                if empty {
                    self.bus.publish(
                        Event::new(EventKind::EmptyResult)
                            .with_module(name)
                            .with_reason("module returned nothing"),
                    );
                }
                self.bus
                    .publish(Event::new(EventKind::ModuleResolved).with_module(name));
                Ok(dependents)
            }
            Err(source) => {
                if let Some(entry) = self.graph().modules.get_mut(name) {
                    entry.state = ModuleState::Failed;
                }
                self.bus.publish(
                    Event::new(EventKind::DefinitionFailed)
                        .with_module(name)
                        .with_reason(source.to_string()),
                );
                Err(ResolveError::Definition {
                    module: name.to_string(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Registry {
        Registry::new(Bus::new(64))
    }

    fn constant(value: Value) -> Definition {
        Box::new(move |_| Ok(value))
    }

    fn names(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    fn no_selectors(n: usize) -> Vec<Vec<String>> {
        vec![Vec::new(); n]
    }

    #[test]
    fn zero_dependency_definition_runs_once_synchronously() {
        let reg = registry();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);

        let defined = reg
            .define(
                "a",
                Vec::new(),
                Vec::new(),
                Box::new(move |args| {
                    assert!(args.is_empty());
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("A"))
                }),
            )
            .unwrap();

        assert!(defined);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(reg.value("a"), Some(json!("A")));
        assert_eq!(reg.status("a"), Some(ModuleStatus::Resolved));
    }

    #[test]
    fn redefinition_is_ignored_and_reported() {
        let reg = registry();
        let mut rx = reg.bus.subscribe();
        reg.define("a", Vec::new(), Vec::new(), constant(json!(1)))
            .unwrap();

        let second = reg
            .define(
                "a",
                Vec::new(),
                Vec::new(),
                Box::new(|_| panic!("second definition must not run")),
            )
            .unwrap();

        assert!(!second);
        assert_eq!(reg.value("a"), Some(json!(1)));
        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert!(kinds.contains(&EventKind::DuplicateDefinition));
    }

    #[test]
    fn chain_resolves_in_one_pass() {
        let reg = registry();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        reg.define(
            "c",
            names(&["b"]),
            no_selectors(1),
            Box::new(move |args| {
                o.lock().unwrap().push("c");
                Ok(json!({"c": args[0]}))
            }),
        )
        .unwrap();
        let o = Arc::clone(&order);
        reg.define(
            "b",
            names(&["a"]),
            no_selectors(1),
            Box::new(move |args| {
                o.lock().unwrap().push("b");
                Ok(json!({"b": args[0]}))
            }),
        )
        .unwrap();
        assert_eq!(reg.status("c"), Some(ModuleStatus::Waiting));

        let o = Arc::clone(&order);
        reg.define(
            "a",
            Vec::new(),
            Vec::new(),
            Box::new(move |_| {
                o.lock().unwrap().push("a");
                Ok(json!(1))
            }),
        )
        .unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(reg.value("c"), Some(json!({"c": {"b": 1}})));
    }

    #[test]
    fn arguments_follow_declaration_order() {
        let reg = registry();
        reg.define(
            "pair",
            names(&["m1", "m2"]),
            no_selectors(2),
            Box::new(|args| Ok(Value::Array(args))),
        )
        .unwrap();

        reg.define("m2", Vec::new(), Vec::new(), constant(json!("two")))
            .unwrap();
        assert_eq!(reg.status("pair"), Some(ModuleStatus::Waiting));
        reg.define("m1", Vec::new(), Vec::new(), constant(json!("one")))
            .unwrap();

        assert_eq!(reg.value("pair"), Some(json!(["one", "two"])));
    }

    #[test]
    fn falsy_values_count_as_resolved() {
        let reg = registry();
        reg.define("zero", Vec::new(), Vec::new(), constant(json!(0)))
            .unwrap();
        reg.define("nothing", Vec::new(), Vec::new(), constant(Value::Null))
            .unwrap();
        reg.define(
            "sum",
            names(&["zero", "nothing"]),
            no_selectors(2),
            Box::new(|args| Ok(json!([args[0], args[1]]))),
        )
        .unwrap();

        assert_eq!(reg.value("sum"), Some(json!([0, null])));
    }

    #[test]
    fn null_result_publishes_empty_result() {
        let reg = registry();
        let mut rx = reg.bus.subscribe();
        reg.define("void", Vec::new(), Vec::new(), constant(Value::Null))
            .unwrap();

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert!(kinds.contains(&EventKind::EmptyResult));
        assert_eq!(reg.status("void"), Some(ModuleStatus::Resolved));
    }

    #[test]
    fn selectors_apply_to_dependency_values() {
        let reg = registry();
        reg.define(
            "bar",
            names(&["cfg"]),
            vec![names(&["foo", "bar"])],
            Box::new(|args| Ok(args[0].clone())),
        )
        .unwrap();
        reg.define(
            "cfg",
            Vec::new(),
            Vec::new(),
            constant(json!({"foo": {"bar": 42}})),
        )
        .unwrap();

        assert_eq!(reg.value("bar"), Some(json!(42)));
    }

    #[test]
    fn failing_definition_marks_failed_and_propagates() {
        let reg = registry();
        let err = reg
            .define(
                "broken",
                Vec::new(),
                Vec::new(),
                Box::new(|_| Err("boom".into())),
            )
            .unwrap_err();

        assert!(matches!(err, ResolveError::Definition { ref module, .. } if module == "broken"));
        assert_eq!(reg.status("broken"), Some(ModuleStatus::Failed));
        assert!(reg.is_defined("broken"));
    }

    #[test]
    fn one_failing_dependent_does_not_starve_the_others() {
        let reg = registry();
        reg.define(
            "bad",
            names(&["root"]),
            vec![names(&["missing", "deeper"])],
            Box::new(|args| Ok(args[0].clone())),
        )
        .unwrap();
        reg.define(
            "good",
            names(&["root"]),
            no_selectors(1),
            Box::new(|args| Ok(args[0].clone())),
        )
        .unwrap();

        let err = reg
            .define("root", Vec::new(), Vec::new(), constant(json!({})))
            .unwrap_err();

        assert!(matches!(err, ResolveError::Shape { .. }));
        assert_eq!(reg.value("good"), Some(json!({})));
        assert_eq!(reg.status("bad"), Some(ModuleStatus::Failed));
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let reg = registry();
        let err = reg
            .define("loop", names(&["loop"]), no_selectors(1), constant(json!(1)))
            .unwrap_err();

        match err {
            ResolveError::Cycle { chain } => assert_eq!(chain, names(&["loop", "loop"])),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!reg.is_defined("loop"));
    }

    #[test]
    fn indirect_cycle_is_rejected_with_its_path() {
        let reg = registry();
        reg.define("a", names(&["b"]), no_selectors(1), constant(json!(1)))
            .unwrap();
        reg.define("b", names(&["c"]), no_selectors(1), constant(json!(1)))
            .unwrap();

        let err = reg
            .define("c", names(&["a"]), no_selectors(1), constant(json!(1)))
            .unwrap_err();

        match err {
            ResolveError::Cycle { chain } => assert_eq!(chain, names(&["c", "a", "b", "c"])),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(reg.status("c"), None);
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let reg = registry();
        reg.define("b", names(&["a"]), no_selectors(1), constant(json!("b")))
            .unwrap();
        reg.define("c", names(&["a"]), no_selectors(1), constant(json!("c")))
            .unwrap();
        reg.define(
            "d",
            names(&["b", "c"]),
            no_selectors(2),
            Box::new(|args| Ok(Value::Array(args))),
        )
        .unwrap();
        reg.define("a", Vec::new(), Vec::new(), constant(json!("a")))
            .unwrap();

        assert_eq!(reg.value("d"), Some(json!(["b", "c"])));
    }

    #[test]
    fn settle_resolves_requested_module_once() {
        let reg = registry();
        assert!(reg.register("ajax:data.json"));
        assert!(!reg.register("ajax:data.json"));
        reg.define(
            "uses",
            names(&["ajax:data.json"]),
            vec![names(&["status"])],
            Box::new(|args| Ok(args[0].clone())),
        )
        .unwrap();

        assert!(reg.settle("ajax:data.json", json!({"status": 200})).unwrap());
        assert!(!reg.settle("ajax:data.json", json!({"status": 500})).unwrap());

        assert_eq!(reg.value("uses"), Some(json!(200)));
        assert_eq!(reg.value("ajax:data.json"), Some(json!({"status": 200})));
    }

    #[test]
    fn collect_args_waits_for_every_dependency() {
        let reg = registry();
        reg.define("a", Vec::new(), Vec::new(), constant(json!(1)))
            .unwrap();
        reg.register("b");

        let deps = names(&["a", "b"]);
        assert_eq!(reg.collect_args(&deps, &no_selectors(2)).unwrap(), None);
        assert_eq!(reg.unresolved(), names(&["b"]));
        assert_eq!(
            reg.collect_args(&[], &[]).unwrap(),
            Some(Vec::new()),
            "no dependencies are always ready"
        );
    }
}
