//! Review-composing actions: each produces a full revision of the working
//! copy via one completion call.
//!
//! All five share the execution shape in [`run_editorial`]; only the prompt
//! differs. Prompts instruct the model to return the complete updated
//! article so the output can replace the working copy wholesale.

use async_trait::async_trait;

use super::{run_editorial, ActionHandler, EditorialAction, Flow, Prompt, RunContext};
use crate::completions::CompletionOptions;
use crate::content::ContentItem;
use crate::engine::EngineError;
use crate::registry::InputValues;

fn fenced(text: &str) -> String {
    format!("```\n{text}\n```")
}

/// Insert an AI-generated table of contents under the title.
pub struct AddToc;

impl EditorialAction for AddToc {
    const STEP: &'static str = "add-toc-to-article";

    fn prompt(&self, _item: &ContentItem, working_copy: &str, inputs: &InputValues<'_>) -> Prompt {
        let max_depth = inputs.integer("maxDepth");
        let include_introduction = inputs.boolean("includeIntroduction");
        Prompt::editing(format!(
            "Please update the below markdown article by adding a Table of Contents under the h1 title.\n\
             Maximum heading depth: {max_depth}\n\
             Include introduction: {include_introduction}\n\
             Return only the complete updated article in markdown without the wrapping \"```\".\n\n\
             Here is the text wrapped with \"```\":\n{body}",
            body = fenced(working_copy),
        ))
    }
}

#[async_trait]
impl ActionHandler for AddToc {
    async fn execute(&self, ctx: &mut RunContext<'_>) -> Result<Flow, EngineError> {
        run_editorial(self, ctx).await
    }
}

/// Grammar and style pass.
pub struct GrammarReview;

impl EditorialAction for GrammarReview {
    const STEP: &'static str = "get-ai-grammar-fixes";

    fn prompt(&self, _item: &ContentItem, working_copy: &str, inputs: &InputValues<'_>) -> Prompt {
        let style = inputs.string("style");
        let strictness = inputs.integer("strictness");
        Prompt::editing(format!(
            "You are my \"Hemingway editor\" AI. Please update the below article with grammar fixes.\n\
             Writing style: {style}\n\
             Strictness level (1-5): {strictness}\n\
             Return only the complete updated article in markdown without the wrapping \"```\".\n\n\
             Here is the text wrapped with \"```\":\n{body}",
            body = fenced(working_copy),
        ))
    }
}

#[async_trait]
impl ActionHandler for GrammarReview {
    async fn execute(&self, ctx: &mut RunContext<'_>) -> Result<Flow, EngineError> {
        run_editorial(self, ctx).await
    }
}

/// Search-engine optimization pass.
pub struct SeoOptimization;

impl EditorialAction for SeoOptimization {
    const STEP: &'static str = "optimize-seo";

    fn prompt(&self, item: &ContentItem, working_copy: &str, inputs: &InputValues<'_>) -> Prompt {
        let target_keywords = inputs.string("targetKeywords");
        let strictness = inputs.integer("seoStrictness");
        let optimize_meta = inputs.boolean("optimizeMeta");
        let suggest_internal_links = inputs.boolean("suggestInternalLinks");

        let mut prompt = format!(
            "You are an SEO expert. Please optimize this blog post for search engines.\n\
             Target keywords: {target_keywords}\n\
             SEO strictness level (1-5): {strictness}\n"
        );
        if optimize_meta {
            prompt.push_str("Please suggest an optimized meta description.\n");
        }
        if suggest_internal_links {
            prompt.push_str("Please suggest internal linking opportunities.\n");
        }
        prompt.push_str(&format!(
            "\nGuidelines:\n\
             1. Optimize heading structure (H1, H2, H3)\n\
             2. Ensure proper keyword density without keyword stuffing\n\
             3. Suggest image alt text improvements\n\
             4. Check content length and structure\n\
             5. Verify meta description length (150-160 characters)\n\n\
             Return the optimized article in markdown format, followed by SEO recommendations.\n\n\
             Here is the blog post:\n\
             Title: {title}\n\
             Subtitle: {subtitle}\n\
             Content:\n{body}",
            title = item.title,
            subtitle = item.subtitle.as_deref().unwrap_or(""),
            body = working_copy,
        ));

        Prompt::with_system(
            "You are an SEO expert that optimizes technical blog content.",
            prompt,
        )
    }
}

#[async_trait]
impl ActionHandler for SeoOptimization {
    async fn execute(&self, ctx: &mut RunContext<'_>) -> Result<Flow, EngineError> {
        run_editorial(self, ctx).await
    }
}

/// Improve code examples embedded in the content.
pub struct CodeBlockEnhancement;

impl EditorialAction for CodeBlockEnhancement {
    const STEP: &'static str = "enhance-code-blocks";

    fn prompt(&self, item: &ContentItem, working_copy: &str, inputs: &InputValues<'_>) -> Prompt {
        let languages = inputs.string("languages");
        let doc_style = inputs.string("docStyle");
        let add_error_handling = inputs.boolean("addErrorHandling");
        let add_example_output = inputs.boolean("addExampleOutput");

        let mut prompt = format!(
            "You are a technical documentation expert. Please enhance the code blocks in this blog post.\n\
             Focus on these languages: {languages}\n\
             Documentation style: {doc_style}\n"
        );
        if add_error_handling {
            prompt.push_str("Add appropriate error handling to code examples.\n");
        }
        if add_example_output {
            prompt.push_str("Add example outputs as comments where relevant.\n");
        }
        prompt.push_str(&format!(
            "\nGuidelines:\n\
             1. Ensure proper syntax highlighting markers\n\
             2. Add comprehensive {doc_style} style comments\n\
             3. Follow language-specific best practices\n\
             4. Maintain consistent code style\n\
             5. Add error handling where appropriate\n\
             6. Include example outputs as comments\n\n\
             Return the enhanced article in markdown format.\n\n\
             Here is the blog post:\n\
             Title: {title}\n\
             Subtitle: {subtitle}\n\
             Content:\n{body}",
            title = item.title,
            subtitle = item.subtitle.as_deref().unwrap_or(""),
            body = working_copy,
        ));

        Prompt::with_system(
            "You are a technical documentation expert that improves code examples.",
            prompt,
        )
    }
}

#[async_trait]
impl ActionHandler for CodeBlockEnhancement {
    async fn execute(&self, ctx: &mut RunContext<'_>) -> Result<Flow, EngineError> {
        run_editorial(self, ctx).await
    }
}

/// Full rewrite with configurable style, tone, and intensity. The only
/// action exposing advanced model knobs (system prompt, temperature, max
/// tokens) to the editor.
pub struct AiRewrite;

impl EditorialAction for AiRewrite {
    const STEP: &'static str = "rewrite-content";

    fn prompt(&self, item: &ContentItem, working_copy: &str, inputs: &InputValues<'_>) -> Prompt {
        let style = inputs.string("style");
        let tone = inputs.string("tone");
        let rewrite_level = inputs.integer("rewriteLevel");
        let preserve_keywords = inputs.boolean("preserveKeywords");
        let system_prompt = inputs.string("systemPrompt");
        let temperature = inputs.float("temperature");
        let max_tokens = inputs.integer("maxTokens").max(1) as u32;

        let mut prompt = format!(
            "Please rewrite the following article while:\n\
             1. Using a {style} writing style\n\
             2. Maintaining a {tone} tone\n\
             3. Applying a rewrite level of {rewrite_level} (1=light editing, 5=complete rewrite)\n"
        );
        if preserve_keywords {
            prompt.push_str("4. Preserving important keywords and technical terms\n");
        }
        prompt.push_str(&format!(
            "\nReturn only the rewritten article in markdown format.\n\n\
             Here is the article to rewrite:\n\
             Title: {title}\n\
             Subtitle: {subtitle}\n\
             Content:\n{body}",
            title = item.title,
            subtitle = item.subtitle.as_deref().unwrap_or(""),
            body = working_copy,
        ));

        Prompt::with_system(system_prompt, prompt).options(
            CompletionOptions::default()
                .with_temperature(temperature)
                .with_max_tokens(max_tokens),
        )
    }
}

#[async_trait]
impl ActionHandler for AiRewrite {
    async fn execute(&self, ctx: &mut RunContext<'_>) -> Result<Flow, EngineError> {
        run_editorial(self, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionKind;
    use crate::workflow::ActionNode;

    #[test]
    fn grammar_prompt_uses_working_copy_and_inputs() {
        let node = ActionNode::new(ActionKind::GrammarReview).with_input("style", "academic");
        let inputs = InputValues::resolve(&node, ActionKind::GrammarReview);
        let item = ContentItem::draft("1", "T", "original body");

        let prompt = GrammarReview.prompt(&item, "chained working copy", &inputs);
        assert!(prompt.user.contains("Writing style: academic"));
        assert!(prompt.user.contains("Strictness level (1-5): 3"));
        assert!(prompt.user.contains("chained working copy"));
        assert!(!prompt.user.contains("original body"));
    }

    #[test]
    fn rewrite_advanced_inputs_reach_options() {
        let node = ActionNode::new(ActionKind::AiRewrite)
            .with_input("temperature", 0.2)
            .with_input("maxTokens", 512);
        let inputs = InputValues::resolve(&node, ActionKind::AiRewrite);
        let item = ContentItem::draft("1", "T", "body");

        let prompt = AiRewrite.prompt(&item, "body", &inputs);
        assert_eq!(prompt.options.temperature, Some(0.2));
        assert_eq!(prompt.options.max_tokens, Some(512));
        assert!(prompt.system.contains("expert content writer"));
    }

    #[test]
    fn conditional_prompt_lines_respect_flags() {
        let node = ActionNode::new(ActionKind::SeoOptimization)
            .with_input("optimizeMeta", "false")
            .with_input("suggestInternalLinks", true);
        let inputs = InputValues::resolve(&node, ActionKind::SeoOptimization);
        let item = ContentItem::draft("1", "T", "body");

        let prompt = SeoOptimization.prompt(&item, "body", &inputs);
        assert!(!prompt.user.contains("optimized meta description"));
        assert!(prompt.user.contains("internal linking opportunities"));
    }
}
