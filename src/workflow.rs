//! Workflow graph model: stored wire format, runtime definition, and
//! execution-ready compilation.
//!
//! A workflow is a trigger plus an ordered list of action nodes and a set of
//! directed edges. Two representations exist:
//!
//! - [`StoredWorkflow`]: what the graph editor persists. Action nodes carry
//!   editor-assigned ids and canvas positions; edges may reference either
//!   those ids or action kinds, and the trigger root appears as `"trigger"`
//!   or [`SOURCE`]. Editors regenerate node ids freely, which is why edges
//!   are normalized to kinds before execution.
//! - [`WorkflowDefinition`]: the engine-facing shape. Edges use action kinds
//!   with `$source` marking the trigger; actions keep declaration order.
//!
//! Compilation does *not* topologically sort. The engine executes actions in
//! declared array order; edges are consulted only to decide whether an action
//! is the final step before approval (and therefore persists its revision
//! rather than forwarding it). Fan-out or disconnected edges never panic;
//! they just feed the same final-step rule.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ActionKind, EventName};

/// Edge-from marker for the trigger root.
pub const SOURCE: &str = "$source";

/// Editor alias for the trigger root found in stored documents.
const TRIGGER_NODE_ID: &str = "trigger";

/// One action node as the engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionNode {
    /// Node identifier; after normalization this equals `kind`.
    pub id: String,
    /// Registry key. Kept as a string so corrupt documents degrade to a
    /// skipped action rather than a deserialization failure.
    pub kind: String,
    pub name: String,
    /// Editor-supplied input values, keyed by input name. Values may be
    /// strings, numbers, or booleans; booleans are often serialized as the
    /// strings `"true"`/`"false"` by the editor.
    #[serde(default)]
    pub input_values: FxHashMap<String, Value>,
}

impl ActionNode {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            id: kind.as_str().to_string(),
            kind: kind.as_str().to_string(),
            name: crate::registry::descriptor(kind).name.to_string(),
            input_values: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input_values.insert(key.into(), value.into());
        self
    }

    /// The parsed registry kind, if this node resolves to one.
    pub fn action_kind(&self) -> Option<ActionKind> {
        ActionKind::parse(&self.kind)
    }
}

/// A directed edge between action kinds (or from [`SOURCE`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn from_source(to: ActionKind) -> Self {
        Self::new(SOURCE, to.as_str())
    }

    pub fn between(from: ActionKind, to: ActionKind) -> Self {
        Self::new(from.as_str(), to.as_str())
    }
}

/// The persisted, declarative graph the engine executes.
///
/// Created and mutated only by the editor; the engine reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    /// Event that activates this definition.
    pub trigger: EventName,
    /// Only enabled definitions are loaded for execution.
    pub enabled: bool,
    /// Actions in declared execution order.
    pub actions: Vec<ActionNode>,
    /// Edges over action kinds, with exactly one `from = "$source"` edge in
    /// well-formed documents. The engine tolerates violations.
    pub edges: Vec<Edge>,
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>, trigger: EventName) -> Self {
        Self {
            id: id.into(),
            trigger,
            enabled: true,
            actions: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Convenience builder for a linear chain: `$source -> a1 -> .. -> an`.
    pub fn linear(id: impl Into<String>, trigger: EventName, kinds: &[ActionKind]) -> Self {
        let mut def = Self::new(id, trigger);
        for kind in kinds {
            def.actions.push(ActionNode::new(*kind));
        }
        if let Some(first) = kinds.first() {
            def.edges.push(Edge::from_source(*first));
        }
        for pair in kinds.windows(2) {
            def.edges.push(Edge::between(pair[0], pair[1]));
        }
        def
    }

    /// Compile into an execution-ready view.
    pub fn compile(&self) -> CompiledWorkflow<'_> {
        CompiledWorkflow::new(self)
    }
}

/// Canvas coordinates, persisted for the editor only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

/// An action node as the graph editor stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAction {
    /// Editor-assigned node id (regenerated across edits).
    pub id: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<NodePosition>,
    #[serde(default)]
    pub input_values: FxHashMap<String, Value>,
}

/// The wire-format workflow document produced by the graph editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredWorkflow {
    pub actions: Vec<StoredAction>,
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_position: Option<NodePosition>,
}

impl StoredWorkflow {
    /// Normalize into the engine-facing definition.
    ///
    /// Editor node ids in edges are translated to action kinds; the trigger
    /// root (stored as `"trigger"` or already as `$source`) becomes
    /// [`SOURCE`]. Edges whose endpoints are already kinds pass through
    /// unchanged, so documents saved by newer editors (which serialize kinds
    /// directly) normalize to themselves.
    pub fn into_definition(self, id: impl Into<String>, trigger: EventName) -> WorkflowDefinition {
        let id_to_kind: FxHashMap<&str, &str> = self
            .actions
            .iter()
            .map(|action| (action.id.as_str(), action.kind.as_str()))
            .collect();

        let resolve = |endpoint: &str| -> String {
            if endpoint == TRIGGER_NODE_ID || endpoint == SOURCE {
                return SOURCE.to_string();
            }
            id_to_kind
                .get(endpoint)
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| endpoint.to_string())
        };

        let edges = self
            .edges
            .iter()
            .map(|edge| Edge::new(resolve(&edge.from), resolve(&edge.to)))
            .collect();

        let actions = self
            .actions
            .into_iter()
            .map(|action| ActionNode {
                id: action.kind.clone(),
                kind: action.kind,
                name: action.name,
                input_values: action.input_values,
            })
            .collect();

        WorkflowDefinition {
            id: id.into(),
            trigger,
            enabled: true,
            actions,
            edges,
        }
    }
}

/// Execution-ready view over a [`WorkflowDefinition`].
///
/// Holds the declaration-ordered action list and an outgoing-edge map keyed
/// by kind. Edge declaration order is preserved inside each entry.
#[derive(Debug)]
pub struct CompiledWorkflow<'a> {
    definition: &'a WorkflowDefinition,
    outgoing: FxHashMap<&'a str, Vec<&'a str>>,
}

impl<'a> CompiledWorkflow<'a> {
    fn new(definition: &'a WorkflowDefinition) -> Self {
        let mut outgoing: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
        for edge in &definition.edges {
            outgoing
                .entry(edge.from.as_str())
                .or_default()
                .push(edge.to.as_str());
        }
        Self {
            definition,
            outgoing,
        }
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        self.definition
    }

    /// Actions in declared execution order.
    pub fn actions(&self) -> &[ActionNode] {
        &self.definition.actions
    }

    /// Outgoing edge targets of a kind, in edge declaration order.
    pub fn outgoing(&self, kind: &str) -> &[&'a str] {
        self.outgoing
            .get(kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether an action is the final step before approval/completion: no
    /// outgoing edges, or a single outgoing edge into `wait_for_approval`.
    ///
    /// A final step persists its revision to the pending-AI-revision field;
    /// a non-final step forwards it to the next action in memory.
    pub fn is_final_step(&self, kind: &str) -> bool {
        let targets = self.outgoing(kind);
        targets.is_empty()
            || (targets.len() == 1 && targets[0] == ActionKind::WaitForApproval.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_builder_wires_source_and_chain() {
        let def = WorkflowDefinition::linear(
            "wf",
            EventName::ContentUpdated,
            &[ActionKind::GrammarReview, ActionKind::WaitForApproval],
        );
        assert_eq!(def.actions.len(), 2);
        assert_eq!(def.edges[0], Edge::new(SOURCE, "grammar_review"));
        assert_eq!(def.edges[1], Edge::new("grammar_review", "wait_for_approval"));
    }

    #[test]
    fn final_step_rule() {
        let def = WorkflowDefinition::linear(
            "wf",
            EventName::ContentUpdated,
            &[
                ActionKind::GrammarReview,
                ActionKind::AddToc,
                ActionKind::WaitForApproval,
            ],
        );
        let compiled = def.compile();
        assert!(!compiled.is_final_step("grammar_review"));
        assert!(compiled.is_final_step("add_toc"));
        // wait_for_approval itself has no outgoing edges.
        assert!(compiled.is_final_step("wait_for_approval"));
    }

    #[test]
    fn fan_out_is_not_final() {
        let mut def = WorkflowDefinition::linear(
            "wf",
            EventName::ContentUpdated,
            &[ActionKind::GrammarReview, ActionKind::WaitForApproval],
        );
        def.edges.push(Edge::between(
            ActionKind::GrammarReview,
            ActionKind::AddToc,
        ));
        let compiled = def.compile();
        // Two outgoing edges: the approval shortcut no longer applies.
        assert!(!compiled.is_final_step("grammar_review"));
    }

    #[test]
    fn stored_edges_normalize_ui_ids_to_kinds() {
        let stored = StoredWorkflow {
            actions: vec![
                StoredAction {
                    id: "n_8f2k".into(),
                    kind: "grammar_review".into(),
                    name: "Perform a grammar review".into(),
                    description: String::new(),
                    position: Some(NodePosition { x: 0.0, y: 150.0 }),
                    input_values: FxHashMap::default(),
                },
                StoredAction {
                    id: "n_1q9z".into(),
                    kind: "wait_for_approval".into(),
                    name: "Apply changes after approval".into(),
                    description: String::new(),
                    position: None,
                    input_values: FxHashMap::default(),
                },
            ],
            edges: vec![Edge::new("trigger", "n_8f2k"), Edge::new("n_8f2k", "n_1q9z")],
            trigger_position: None,
        };

        let def = stored.into_definition("wf", EventName::ContentUpdated);
        assert_eq!(def.edges[0], Edge::new(SOURCE, "grammar_review"));
        assert_eq!(def.edges[1], Edge::new("grammar_review", "wait_for_approval"));
        assert_eq!(def.actions[0].id, "grammar_review");
    }

    #[test]
    fn already_normalized_edges_pass_through() {
        let stored = StoredWorkflow {
            actions: vec![StoredAction {
                id: "grammar_review".into(),
                kind: "grammar_review".into(),
                name: "Perform a grammar review".into(),
                description: String::new(),
                position: None,
                input_values: FxHashMap::default(),
            }],
            edges: vec![Edge::new(SOURCE, "grammar_review")],
            trigger_position: None,
        };
        let def = stored.into_definition("wf", EventName::ContentUpdated);
        assert_eq!(def.edges[0], Edge::new(SOURCE, "grammar_review"));
    }
}
