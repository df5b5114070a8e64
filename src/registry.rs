//! Static action catalogue: descriptors, input schemas, and value resolution.
//!
//! Every [`ActionKind`] has exactly one [`ActionDescriptor`] describing what
//! the graph editor should render: display name, description, and a typed
//! input schema with defaults. Descriptors are immutable at runtime and
//! produced by an exhaustive match, so adding a kind without a descriptor is
//! a compile error.
//!
//! [`InputValues`] resolves a node's editor-supplied values against the
//! schema: missing keys fall back to declared defaults, and booleans are
//! accepted both as JSON booleans and as the `"true"`/`"false"` strings the
//! editor serializes.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::ActionKind;
use crate::workflow::ActionNode;

/// Scalar type of a declared input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    String,
    Number,
    Boolean,
}

/// Declarative schema for one handler input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSpec {
    /// Display name for editor controls.
    pub name: &'static str,
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    /// Collapsed behind an "advanced" toggle in the editor.
    #[serde(default)]
    pub is_advanced: bool,
}

impl InputSpec {
    fn new(name: &'static str, input_type: InputType, description: &'static str) -> Self {
        Self {
            name,
            input_type,
            description,
            default: None,
            required: false,
            is_advanced: false,
        }
    }

    fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    fn advanced(mut self) -> Self {
        self.is_advanced = true;
        self
    }
}

/// Static descriptor for one action kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDescriptor {
    pub kind: ActionKind,
    pub name: &'static str,
    pub description: &'static str,
    /// Input schema keyed by input key (the key the editor stores values
    /// under, which may differ from the display name).
    pub inputs: Vec<(&'static str, InputSpec)>,
}

impl ActionDescriptor {
    fn new(kind: ActionKind, name: &'static str, description: &'static str) -> Self {
        Self {
            kind,
            name,
            description,
            inputs: Vec::new(),
        }
    }

    fn input(mut self, key: &'static str, spec: InputSpec) -> Self {
        self.inputs.push((key, spec));
        self
    }

    pub fn input_spec(&self, key: &str) -> Option<&InputSpec> {
        self.inputs
            .iter()
            .find(|(input_key, _)| *input_key == key)
            .map(|(_, spec)| spec)
    }
}

/// Descriptor for an action kind. Exhaustive by construction.
pub fn descriptor(kind: ActionKind) -> ActionDescriptor {
    match kind {
        ActionKind::AddToc => {
            ActionDescriptor::new(kind, "Add a Table of Contents", "Add an AI-generated ToC")
                .input(
                    "maxDepth",
                    InputSpec::new("maxDepth", InputType::Number, "Maximum heading depth to include")
                        .default_value(json!(3)),
                )
                .input(
                    "includeIntroduction",
                    InputSpec::new(
                        "includeIntroduction",
                        InputType::Boolean,
                        "Include an introduction section",
                    )
                    .default_value(json!(true)),
                )
        }
        ActionKind::GrammarReview => ActionDescriptor::new(
            kind,
            "Perform a grammar review",
            "Use AI for grammar fixes",
        )
        .input(
            "style",
            InputSpec::new("style", InputType::String, "Writing style to enforce")
                .default_value(json!("professional")),
        )
        .input(
            "strictness",
            InputSpec::new(
                "strictness",
                InputType::Number,
                "How strict the grammar check should be (1-5)",
            )
            .default_value(json!(3)),
        ),
        ActionKind::WaitForApproval => ActionDescriptor::new(
            kind,
            "Apply changes after approval",
            "Request approval for changes",
        ),
        ActionKind::ApplyChanges => {
            ActionDescriptor::new(kind, "Apply changes", "Save the AI revisions")
        }
        ActionKind::GenerateLinkedinPost => {
            ActionDescriptor::new(kind, "Generate LinkedIn posts", "Generate LinkedIn posts")
                .input(
                    "tone",
                    InputSpec::new("tone", InputType::String, "Tone of the post")
                        .default_value(json!("professional")),
                )
                .input(
                    "numberOfVariants",
                    InputSpec::new(
                        "numberOfVariants",
                        InputType::Number,
                        "Number of post variants to generate",
                    )
                    .default_value(json!(3)),
                )
        }
        ActionKind::GenerateTweetPost => {
            ActionDescriptor::new(kind, "Generate Twitter posts", "Generate Twitter posts")
                .input(
                    "tone",
                    InputSpec::new("tone", InputType::String, "Tone of the tweets")
                        .default_value(json!("casual")),
                )
                .input(
                    "numberOfVariants",
                    InputSpec::new(
                        "numberOfVariants",
                        InputType::Number,
                        "Number of tweet variants to generate",
                    )
                    .default_value(json!(3)),
                )
        }
        ActionKind::SeoOptimization => ActionDescriptor::new(
            kind,
            "SEO Optimization",
            "Optimize content for search engines",
        )
        .input(
            "targetKeywords",
            InputSpec::new(
                "targetKeywords",
                InputType::String,
                "Comma-separated target keywords",
            )
            .default_value(json!("")),
        )
        .input(
            "seoStrictness",
            InputSpec::new(
                "seoStrictness",
                InputType::Number,
                "How strict the SEO optimization should be (1-5)",
            )
            .default_value(json!(3)),
        )
        .input(
            "optimizeMeta",
            InputSpec::new(
                "optimizeMeta",
                InputType::Boolean,
                "Whether to optimize meta description",
            )
            .default_value(json!(true)),
        )
        .input(
            "suggestInternalLinks",
            InputSpec::new(
                "suggestInternalLinks",
                InputType::Boolean,
                "Suggest internal linking opportunities",
            )
            .default_value(json!(true)),
        ),
        ActionKind::CodeBlockEnhancement => ActionDescriptor::new(
            kind,
            "Code Block Enhancement",
            "Improve code examples in technical content",
        )
        .input(
            "languages",
            InputSpec::new(
                "languages",
                InputType::String,
                "Comma-separated programming languages to focus on",
            )
            .default_value(json!("javascript,typescript")),
        )
        .input(
            "docStyle",
            InputSpec::new(
                "docStyle",
                InputType::String,
                "Documentation style (inline/block)",
            )
            .default_value(json!("block")),
        )
        .input(
            "addErrorHandling",
            InputSpec::new(
                "addErrorHandling",
                InputType::Boolean,
                "Add error handling to code examples",
            )
            .default_value(json!(true)),
        )
        .input(
            "addExampleOutput",
            InputSpec::new(
                "addExampleOutput",
                InputType::Boolean,
                "Add example outputs as comments",
            )
            .default_value(json!(true)),
        ),
        ActionKind::AiRewrite => ActionDescriptor::new(
            kind,
            "AI Rewrite",
            "Rewrite content using AI with custom style and tone",
        )
        .input(
            "style",
            InputSpec::new(
                "Writing Style",
                InputType::String,
                "The writing style to use (e.g., academic, casual, professional)",
            )
            .default_value(json!("professional")),
        )
        .input(
            "tone",
            InputSpec::new(
                "Tone",
                InputType::String,
                "The tone of the writing (e.g., formal, friendly, authoritative)",
            )
            .default_value(json!("friendly")),
        )
        .input(
            "rewriteLevel",
            InputSpec::new(
                "Rewrite Level",
                InputType::Number,
                "How extensive the rewrite should be (1-5)",
            )
            .default_value(json!(3)),
        )
        .input(
            "preserveKeywords",
            InputSpec::new(
                "Preserve Keywords",
                InputType::Boolean,
                "Whether to preserve important keywords and phrases",
            )
            .default_value(json!(true)),
        )
        .input(
            "systemPrompt",
            InputSpec::new(
                "System Prompt",
                InputType::String,
                "Custom system prompt for the AI",
            )
            .default_value(json!(
                "You are an expert content writer who excels at maintaining the original meaning while improving clarity and engagement."
            ))
            .advanced(),
        )
        .input(
            "temperature",
            InputSpec::new(
                "Temperature",
                InputType::Number,
                "AI temperature (0.0-2.0). Lower values are more focused, higher more creative.",
            )
            .default_value(json!(0.7))
            .advanced(),
        )
        .input(
            "maxTokens",
            InputSpec::new(
                "Max Tokens",
                InputType::Number,
                "Maximum number of tokens in the response",
            )
            .default_value(json!(2000))
            .advanced(),
        ),
    }
}

/// All descriptors in catalogue order, for editor palettes.
pub fn descriptors() -> Vec<ActionDescriptor> {
    ActionKind::ALL.iter().copied().map(descriptor).collect()
}

/// A node's input values resolved against its descriptor's schema.
///
/// Lookups fall back to the declared default when the editor supplied no
/// value (or a JSON null).
#[derive(Debug)]
pub struct InputValues<'a> {
    values: &'a FxHashMap<String, Value>,
    descriptor: ActionDescriptor,
}

impl<'a> InputValues<'a> {
    pub fn resolve(node: &'a ActionNode, kind: ActionKind) -> Self {
        Self {
            values: &node.input_values,
            descriptor: descriptor(kind),
        }
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        match self.values.get(key) {
            Some(Value::Null) | None => self
                .descriptor
                .input_spec(key)
                .and_then(|spec| spec.default.clone()),
            Some(value) => Some(value.clone()),
        }
    }

    pub fn string(&self, key: &str) -> String {
        match self.lookup(key) {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    pub fn integer(&self, key: &str) -> i64 {
        match self.lookup(key) {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn float(&self, key: &str) -> f64 {
        match self.lookup(key) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Booleans arrive either as JSON booleans or as the editor's
    /// stringified `"true"`/`"false"`.
    pub fn boolean(&self, key: &str) -> bool {
        match self.lookup(key) {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_descriptor() {
        for kind in ActionKind::ALL {
            let desc = descriptor(kind);
            assert_eq!(desc.kind, kind);
            assert!(!desc.name.is_empty());
        }
    }

    #[test]
    fn catalogue_enumerates_all_kinds_once() {
        let all = descriptors();
        assert_eq!(all.len(), ActionKind::ALL.len());
        for (descriptor, kind) in all.iter().zip(ActionKind::ALL) {
            assert_eq!(descriptor.kind, kind);
        }
    }

    #[test]
    fn defaults_fill_missing_values() {
        let node = ActionNode::new(ActionKind::GrammarReview);
        let inputs = InputValues::resolve(&node, ActionKind::GrammarReview);
        assert_eq!(inputs.string("style"), "professional");
        assert_eq!(inputs.integer("strictness"), 3);
    }

    #[test]
    fn supplied_values_override_defaults() {
        let node = ActionNode::new(ActionKind::GrammarReview)
            .with_input("style", "academic")
            .with_input("strictness", 5);
        let inputs = InputValues::resolve(&node, ActionKind::GrammarReview);
        assert_eq!(inputs.string("style"), "academic");
        assert_eq!(inputs.integer("strictness"), 5);
    }

    #[test]
    fn stringly_booleans_are_accepted() {
        let node = ActionNode::new(ActionKind::AddToc).with_input("includeIntroduction", "false");
        let inputs = InputValues::resolve(&node, ActionKind::AddToc);
        assert!(!inputs.boolean("includeIntroduction"));

        let node = ActionNode::new(ActionKind::AddToc).with_input("includeIntroduction", "true");
        let inputs = InputValues::resolve(&node, ActionKind::AddToc);
        assert!(inputs.boolean("includeIntroduction"));
    }

    #[test]
    fn advanced_inputs_flagged() {
        let desc = descriptor(ActionKind::AiRewrite);
        assert!(desc.input_spec("temperature").unwrap().is_advanced);
        assert!(!desc.input_spec("style").unwrap().is_advanced);
    }
}
