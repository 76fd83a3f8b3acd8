//! Prompt construction
//!
//! Platform-idiomatic prompt templates. Wording here shapes output quality
//! but is not contractual; generators only guarantee non-emptiness and
//! provider-attempt ordering.

use recast_core::models::{ContentType, GenerationRequest};

use crate::provider::TextRequest;

const IMAGE_PROMPT_MAX_TOKENS: u32 = 300;

const TWITTER_SYSTEM: &str = "You are an expert at repurposing blog content into engaging Twitter threads. \
Create a thread that captures the key points of the blog while maintaining the original voice and style. \
Format the thread with each tweet numbered and separated by a line break. \
Keep each tweet under 280 characters. \
Include relevant hashtags at the end of the thread.";

const INSTAGRAM_SYSTEM: &str = "You are an expert at repurposing blog content into engaging Instagram captions. \
Create a caption that captures the essence of the blog while being visually appealing and engaging. \
Include line breaks for readability and relevant hashtags at the end. \
The caption should be between 150-300 words.";

const LINKEDIN_SYSTEM: &str = "You are an expert at repurposing blog content into professional LinkedIn posts. \
Create a post that presents the key insights from the blog in a professional, thoughtful manner. \
Format the post with clear paragraphs, bullet points where appropriate, and a call to action. \
The post should be between 200-500 words.";

const FACEBOOK_SYSTEM: &str = "You are an expert at repurposing blog content into engaging Facebook posts. \
Create a post that captures the key points of the blog while encouraging engagement. \
Format the post with clear paragraphs and include a question or call to action to encourage comments. \
The post should be between 150-400 words.";

const THUMBNAIL_SYSTEM: &str = "You are an expert at creating prompts for AI image generation. \
Create a detailed, vivid prompt that will result in a high-quality, engaging thumbnail image for a blog post. \
The prompt should be descriptive and specific, focusing on the main theme of the blog post. \
Do not include any text in the image prompt, as text will be added separately.";

/// Deterministic cap on source text: a fixed cut at the last char boundary
/// at or below `max_chars`. Same input, same truncation, every run.
pub fn truncate_source(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn platform_instruction(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Twitter => {
            "Please convert this blog post into an engaging Twitter thread that captures the key points \
             while maintaining the original voice and style. Format as a numbered thread with each tweet \
             under 280 characters."
        }
        ContentType::Instagram => {
            "Please convert this blog post into an engaging Instagram caption that captures the essence \
             of the content. Include line breaks for readability and relevant hashtags at the end."
        }
        ContentType::Linkedin => {
            "Please convert this blog post into a professional LinkedIn post that presents the key insights \
             in a thoughtful manner. Format with clear paragraphs, bullet points where appropriate, and \
             include a call to action."
        }
        ContentType::Facebook => {
            "Please convert this blog post into an engaging Facebook post that captures the key points \
             while encouraging engagement. Include a question or call to action to encourage comments."
        }
        _ => "",
    }
}

fn system_prompt(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Twitter => TWITTER_SYSTEM,
        ContentType::Instagram => INSTAGRAM_SYSTEM,
        ContentType::Linkedin => LINKEDIN_SYSTEM,
        ContentType::Facebook => FACEBOOK_SYSTEM,
        _ => "",
    }
}

/// Build the provider request for a text kind.
pub fn text_request(request: &GenerationRequest, max_source_chars: usize) -> TextRequest {
    let source = truncate_source(&request.source_text, max_source_chars);

    let mut prompt = format!(
        "Blog Title: {}\n\nBlog Content:\n{}\n\n{}",
        request.title,
        source,
        platform_instruction(request.content_type)
    );

    if let Some(tone) = &request.options.tone {
        prompt.push_str(&format!("\n\nUse a {} tone.", tone));
    }
    if !request.options.hashtags.is_empty() {
        prompt.push_str(&format!(
            "\n\nInclude these hashtags: {}",
            request.options.hashtags.join(", ")
        ));
    }

    TextRequest::new(system_prompt(request.content_type), prompt)
}

/// Build the prompt-derivation request for an image kind.
///
/// The text chain turns the source content into an image prompt; that prompt
/// then goes to the image chain.
pub fn image_prompt_request(request: &GenerationRequest, max_source_chars: usize) -> TextRequest {
    let source = truncate_source(&request.source_text, max_source_chars);

    let (system, mut prompt) = match request.content_type.platform() {
        Some(platform) => (
            format!(
                "You are an expert at creating prompts for AI image generation. \
                 Create a detailed, vivid prompt that will result in a high-quality, engaging image \
                 for a {platform} post. The prompt should be descriptive and specific, focusing on \
                 the main theme of the content, optimized for the {platform} audience and format."
            ),
            format!(
                "Platform: {platform}\nBlog Title: {}\n\nBlog Content:\n{}\n\n\
                 Please create a detailed, vivid prompt for generating an image for this {platform} post. \
                 The prompt should be descriptive and specific, focusing on the main theme of the post.",
                request.title, source
            ),
        ),
        None => (
            THUMBNAIL_SYSTEM.to_string(),
            format!(
                "Blog Title: {}\n\nBlog Content:\n{}\n\n\
                 Please create a detailed, vivid prompt for generating a thumbnail image for this blog post. \
                 The prompt should be descriptive and specific, focusing on the main theme of the blog post. \
                 Do not include any text in the image prompt, as text will be added separately.",
                request.title, source
            ),
        ),
    };

    if let Some(style) = &request.options.visual_style {
        prompt.push_str(&format!("\n\nThe image should be in a {} style.", style));
    }
    if let Some(tone) = &request.options.tone {
        prompt.push_str(&format!("\n\nThe image should match a {} tone.", tone));
    }

    TextRequest::new(system, prompt).with_max_tokens(IMAGE_PROMPT_MAX_TOKENS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recast_core::models::GenerationOptions;
    use uuid::Uuid;

    fn request(content_type: ContentType, options: GenerationOptions) -> GenerationRequest {
        GenerationRequest {
            job_id: Uuid::new_v4(),
            title: "Why Rust".to_string(),
            source_text: "Rust is a systems language.".to_string(),
            content_type,
            options,
        }
    }

    #[test]
    fn test_truncate_source_is_deterministic_and_char_safe() {
        assert_eq!(truncate_source("hello", 10), "hello");
        assert_eq!(truncate_source("hello", 3), "hel");
        // Multi-byte chars cut on a char boundary, not mid-codepoint.
        assert_eq!(truncate_source("héllo", 2), "hé");
        assert_eq!(truncate_source("héllo", 2), truncate_source("héllo", 2));
    }

    #[test]
    fn test_text_request_includes_title_and_source() {
        let req = text_request(&request(ContentType::Twitter, GenerationOptions::default()), 100);
        assert!(req.prompt.contains("Why Rust"));
        assert!(req.prompt.contains("Rust is a systems language."));
        assert!(req.system.as_deref().unwrap().contains("Twitter threads"));
    }

    #[test]
    fn test_text_request_appends_tone_and_hashtags() {
        let options = GenerationOptions {
            tone: Some("playful".to_string()),
            visual_style: None,
            hashtags: vec!["#rustlang".to_string(), "#systems".to_string()],
        };
        let req = text_request(&request(ContentType::Linkedin, options), 100);
        assert!(req.prompt.contains("Use a playful tone."));
        assert!(req.prompt.contains("#rustlang, #systems"));
    }

    #[test]
    fn test_image_prompt_request_for_thumbnail() {
        let req =
            image_prompt_request(&request(ContentType::Thumbnail, GenerationOptions::default()), 100);
        assert!(req.system.as_deref().unwrap().contains("thumbnail image"));
        assert!(req.prompt.contains("Why Rust"));
        assert_eq!(req.max_tokens, IMAGE_PROMPT_MAX_TOKENS);
    }

    #[test]
    fn test_image_prompt_request_for_platform_variant() {
        let options = GenerationOptions {
            tone: None,
            visual_style: Some("watercolor".to_string()),
            hashtags: vec![],
        };
        let req = image_prompt_request(&request(ContentType::InstagramImage, options), 100);
        assert!(req.system.as_deref().unwrap().contains("instagram"));
        assert!(req.prompt.contains("watercolor"));
    }

    #[test]
    fn test_source_is_truncated_in_prompts() {
        let mut req = request(ContentType::Twitter, GenerationOptions::default());
        req.source_text = "x".repeat(500);
        let built = text_request(&req, 100);
        assert!(!built.prompt.contains(&"x".repeat(101)));
        assert!(built.prompt.contains(&"x".repeat(100)));
    }
}
