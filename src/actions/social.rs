//! Social-copy generators.
//!
//! These read the working copy but never replace it: their output lands in
//! `ai_publishing_recommendations`, appended so earlier blocks survive. They
//! run on publish triggers too, which is why they skip the publish guard the
//! editorial actions share.

use async_trait::async_trait;

use super::{ActionHandler, Flow, Prompt, RunContext};
use crate::engine::EngineError;

/// Generate tweet variants promoting the content.
pub struct GenerateTweetPost;

#[async_trait]
impl ActionHandler for GenerateTweetPost {
    async fn execute(&self, ctx: &mut RunContext<'_>) -> Result<Flow, EngineError> {
        let item = ctx.load_content().await?;
        let working_copy = ctx.working_copy(&item);
        let inputs = ctx.inputs();
        let tone = inputs.string("tone");
        let number_of_variants = inputs.integer("numberOfVariants");

        let prompt = Prompt::with_system(
            "You are a Developer Marketing expert specializing in Twitter content.",
            format!(
                "Generate {number_of_variants} engaging tweets to promote this blog post. For each tweet:\n\
                 1. Be {tone} and impactful\n\
                 2. Include emojis where appropriate\n\
                 3. Use bullet points for key takeaways if relevant\n\
                 4. Include a hook that makes people want to read more\n\
                 5. Leave room for the URL (about 30 characters)\n\n\
                 Format each tweet as:\n\
                 Tweet:\n\
                 Hook: [Attention-grabbing opening]\n\
                 Content: [Main message]\n\
                 Emojis: [Suggested emojis to use]\n\n\
                 Here is the blog post text:\n\
                 Title: {title}\n\
                 Subtitle: {subtitle}\n\
                 Content:\n{body}",
                title = item.title,
                subtitle = item.subtitle.as_deref().unwrap_or(""),
                body = working_copy,
            ),
        );

        let text = ctx.complete("generate-tweets", prompt).await?;
        ctx.append_recommendation(&item, "## Twitter Thread", &text)
            .await?;
        ctx.emit("recommendation", "tweet variants appended");
        Ok(Flow::Continue)
    }
}

/// Generate LinkedIn post variants promoting the content.
pub struct GenerateLinkedinPost;

#[async_trait]
impl ActionHandler for GenerateLinkedinPost {
    async fn execute(&self, ctx: &mut RunContext<'_>) -> Result<Flow, EngineError> {
        let item = ctx.load_content().await?;
        let working_copy = ctx.working_copy(&item);
        let inputs = ctx.inputs();
        let tone = inputs.string("tone");
        let number_of_variants = inputs.integer("numberOfVariants");

        let prompt = Prompt::with_system(
            "You are a Developer Marketing expert specializing in LinkedIn content.",
            format!(
                "Generate {number_of_variants} comprehensive LinkedIn posts to promote this blog post. The posts should:\n\
                 1. Be {tone} and engaging\n\
                 2. Highlight key takeaways or insights\n\
                 3. Include relevant hashtags\n\
                 4. Be between 150-200 words\n\
                 5. End with a clear call-to-action\n\n\
                 Format the response as:\n\
                 Title: [Post Title]\n\
                 Content: [Post Content]\n\
                 Hashtags: [Relevant hashtags]\n\n\
                 Here is the blog post text:\n\
                 Title: {title}\n\
                 Subtitle: {subtitle}\n\
                 Content:\n{body}",
                title = item.title,
                subtitle = item.subtitle.as_deref().unwrap_or(""),
                body = working_copy,
            ),
        );

        let text = ctx.complete("generate-linkedin-posts", prompt).await?;
        ctx.append_recommendation(&item, "## LinkedIn Post", &text)
            .await?;
        ctx.emit("recommendation", "linkedin variants appended");
        Ok(Flow::Continue)
    }
}
