//! Per-graph lowering scratch state.

use std::collections::HashSet;

use indexmap::IndexMap;
use qtjir_core::{BuiltinRegistry, ExternRegistry, Graph, GraphBuilder, NodeId};

use crate::ast::{AstId, UnitId};

/// What kind of scope a lexical block corresponds to -- `Loop` is what
/// break/continue patching and defer-above-loop rules key off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Block,
    Loop,
    Function,
}

/// A captured `defer <call>` action, replayed in LIFO order when its
/// scope pops.
#[derive(Debug, Clone)]
pub struct DeferredCall {
    pub runtime_name: String,
    pub captured_args: Vec<NodeId>,
}

/// A single lexical scope layer.
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub bindings: IndexMap<String, NodeId>,
    pub defers: Vec<DeferredCall>,
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Scope {
            kind,
            bindings: IndexMap::new(),
            defers: Vec::new(),
        }
    }
}

/// A not-yet-resolved jump target: the branch/jump node and the input
/// slot within it that needs patching once the target `Label` exists.
#[derive(Debug, Clone, Copy)]
pub struct PendingPatch {
    pub node: NodeId,
    pub input_index: usize,
}

/// Per-function lowering scratch: AST handle, unit id, builder, `node_map`,
/// scope stack, defer discipline, loop depth, break/continue patch lists
/// keyed by loop depth, and the three side-sets marking slice/optional/
/// error-union-typed values.
pub struct LoweringContext {
    pub unit_id: UnitId,
    pub builder: GraphBuilder,
    pub node_map: IndexMap<AstId, NodeId>,
    pub scopes: Vec<Scope>,
    pub loop_depth: usize,
    pending_breaks: IndexMap<usize, Vec<PendingPatch>>,
    pending_continues: IndexMap<usize, Vec<PendingPatch>>,
    pub slice_values: HashSet<NodeId>,
    pub optional_values: HashSet<NodeId>,
    pub error_union_values: HashSet<NodeId>,
    /// Graphs completed so far within the enclosing unit lowering -- a
    /// `func_decl`/`test_decl` may in principle lower nested closures into
    /// additional graphs, so this accumulates rather than holding one.
    pub finished_graphs: Vec<Graph>,
    /// Shared call-resolution tables. `externs` is built
    /// once per unit by the extern-ingestion pass and handed to every
    /// per-function context before lowering begins.
    pub builtins: BuiltinRegistry,
    pub externs: ExternRegistry,
}

impl LoweringContext {
    pub fn new(unit_id: UnitId, function_name: impl Into<String>) -> Self {
        LoweringContext {
            unit_id,
            builder: GraphBuilder::new(function_name),
            node_map: IndexMap::new(),
            scopes: Vec::new(),
            loop_depth: 0,
            pending_breaks: IndexMap::new(),
            pending_continues: IndexMap::new(),
            slice_values: HashSet::new(),
            optional_values: HashSet::new(),
            error_union_values: HashSet::new(),
            finished_graphs: Vec::new(),
            builtins: BuiltinRegistry::standard(),
            externs: ExternRegistry::new(),
        }
    }

    /// Installs the unit's extern registry, built once by the extern-
    /// ingestion pass before any function is lowered.
    pub fn with_externs(mut self, externs: ExternRegistry) -> Self {
        self.externs = externs;
        self
    }

    pub fn push_scope(&mut self, kind: ScopeKind) {
        if kind == ScopeKind::Loop {
            self.loop_depth += 1;
        }
        self.scopes.push(Scope::new(kind));
    }

    pub fn pop_scope(&mut self) -> Scope {
        let scope = self.scopes.pop().expect("scope push/pop must be paired");
        if scope.kind == ScopeKind::Loop {
            self.loop_depth -= 1;
        }
        scope
    }

    pub fn bind(&mut self, name: impl Into<String>, node: NodeId) {
        self.scopes
            .last_mut()
            .expect("a scope must be active before binding")
            .bindings
            .insert(name.into(), node);
    }

    /// Looks up `name` from the innermost scope outward.
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(name).copied())
    }

    /// Scopes from the top of the stack down to (but not including) the
    /// nearest enclosing `Loop`, in pop order -- used by break/continue
    /// and the inner Function-root walk for `return`/`fail`.
    pub fn scopes_above_nearest_loop(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if scope.kind == ScopeKind::Loop {
                break;
            }
            indices.push(i);
        }
        indices
    }

    pub fn register_pending_break(&mut self, patch: PendingPatch) {
        let depth = self.loop_depth.saturating_sub(1);
        self.pending_breaks.entry(depth).or_default().push(patch);
    }

    pub fn register_pending_continue(&mut self, patch: PendingPatch) {
        let depth = self.loop_depth.saturating_sub(1);
        self.pending_continues.entry(depth).or_default().push(patch);
    }

    pub fn take_pending_breaks(&mut self, depth: usize) -> Vec<PendingPatch> {
        self.pending_breaks.shift_remove(&depth).unwrap_or_default()
    }

    pub fn take_pending_continues(&mut self, depth: usize) -> Vec<PendingPatch> {
        self.pending_continues.shift_remove(&depth).unwrap_or_default()
    }

    pub fn apply_patch(&mut self, patch: PendingPatch, target: NodeId) {
        self.builder.patch_input(patch.node, patch.input_index, target);
    }

    /// Inspects the most recently appended node's opcode to decide whether
    /// a fall-through jump is needed.
    pub fn last_node_is_terminator(&self) -> bool {
        let count = self.builder.node_count();
        if count == 0 {
            return false;
        }
        self.builder
            .graph()
            .node(NodeId((count - 1) as u32))
            .map(|n| n.op.is_terminator())
            .unwrap_or(false)
    }
}
