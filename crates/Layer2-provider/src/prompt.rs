//! Prompt construction and response cleanup
//!
//! 모든 어댑터가 같은 프롬프트를 쓰고, 같은 방식으로 응답을 정리한다.

use crate::r#trait::GenerationRequest;
use fillo_foundation::{temperature_label, PageContext};
use std::fmt::Write;

/// System instruction sent alongside every prompt
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates realistic form field content. Always respond with just the requested content, no additional text or formatting.";

/// Completion budget for field content
pub const MAX_TOKENS: u32 = 150;

/// Completion budget for connection tests
pub const PING_MAX_TOKENS: u32 = 5;

/// Prefixes models add despite instructions (matched case-insensitively)
const BOILERPLATE_PREFIXES: [&str; 5] = [
    "Content: ",
    "Field content: ",
    "Response: ",
    "Answer: ",
    "Generated content: ",
];

/// Human description of well-known field types
pub fn field_hint(field_type: &str) -> &'static str {
    match field_type {
        "name" => "person name (first and last)",
        "email" => "valid email address",
        "phone" => "phone number in appropriate format",
        "address" => "street address",
        "city" => "city name",
        "zip" => "postal/zip code",
        "country" => "country name",
        "company" => "company or organization name",
        "title" => "job title or position",
        "description" => "descriptive text paragraph",
        "bio" => "personal or professional biography",
        "url" => "website URL",
        "date" => "date in appropriate format",
        "age" => "age number",
        "textarea" => "longer form text content",
        "text" => "general text input",
        _ => "appropriate text content",
    }
}

/// `"<band> - <guidance>"`, band from [`temperature_label`]
pub fn creativity_description(level: f64) -> String {
    let label = temperature_label(level);
    let guidance = match label {
        "Very Predictable" => "Use common, standard responses",
        "Predictable" => "Use typical responses with minimal variation",
        "Balanced" => "Mix standard responses with some variation",
        "Creative" => "Use varied, interesting responses",
        "Very Creative" => "Use unique, diverse responses",
        _ => "Use highly creative, unexpected responses",
    };
    format!("{} - {}", label, guidance)
}

fn creativity_requirement(level: f64) -> &'static str {
    if level < 0.5 {
        "Be conservative and predictable"
    } else if level < 1.0 {
        "Balance realism with some variation"
    } else {
        "Be creative while maintaining appropriateness"
    }
}

/// User prompt for one field
pub fn build_prompt(request: &GenerationRequest) -> String {
    let field = &request.field_info;
    let level = request.creativity_level;
    let form_context = if field.context.trim().is_empty() {
        "general form"
    } else {
        field.context.as_str()
    };

    let mut prompt = String::from(
        "Generate appropriate content for a form field with the following details:\n\n",
    );
    let _ = writeln!(
        prompt,
        "Field Type: {} ({})",
        field.field_type,
        field_hint(&field.field_type)
    );
    let _ = writeln!(prompt, "Field Label: {}", field.label);
    let _ = writeln!(prompt, "Context: {}", form_context);
    if let Some(context) = &request.context {
        let _ = writeln!(prompt, "Additional Context: {}", context);
    }

    if let Some(page) = &request.page_context {
        prompt.push('\n');
        write_page_context(&mut prompt, page);
    }

    let _ = write!(
        prompt,
        "\nCreativity Level: {}\n",
        creativity_description(level)
    );

    if !request.previous_generations.is_empty() {
        prompt.push_str("\nPreviously generated values (do not repeat these):\n");
        for previous in &request.previous_generations {
            let _ = writeln!(prompt, "- {}", previous);
        }
    }

    prompt.push_str("\nRequirements:\n");
    prompt.push_str("- Generate realistic, appropriate content for this field\n");
    prompt.push_str("- Content should match the field type and context\n");
    let _ = writeln!(prompt, "- {}", creativity_requirement(level));
    if !request.previous_generations.is_empty() {
        prompt.push_str("- Make it clearly different from the previous values\n");
    }
    prompt.push_str("- Return ONLY the content for the field, no explanations or quotes\n");
    prompt.push_str("- Keep it concise and relevant\n\n");
    prompt.push_str("Content:");
    prompt
}

fn write_page_context(prompt: &mut String, page: &PageContext) {
    prompt.push_str("Page Information:\n");
    if !page.title.is_empty() {
        let _ = writeln!(prompt, "- Title: {}", page.title);
    }
    if !page.url.is_empty() {
        let _ = writeln!(prompt, "- URL: {}", page.url);
    }
    if let Some(description) = &page.description {
        let _ = writeln!(prompt, "- Description: {}", description);
    }
    if let Some(purpose) = &page.form_purpose {
        let _ = writeln!(prompt, "- Form Purpose: {}", purpose);
    }
    if let Some(nearby) = &page.nearby_text {
        let _ = writeln!(prompt, "- Nearby Text: {}", nearby);
    }

    let filled: Vec<_> = page
        .form_fields
        .iter()
        .filter(|f| !f.value.trim().is_empty())
        .collect();
    if !filled.is_empty() {
        prompt.push_str("- Other fields already filled:\n");
        for f in filled {
            let label = f.label.as_deref().unwrap_or(&f.name);
            let _ = writeln!(prompt, "  - {}: {}", label, f.value);
        }
    }
}

/// Strip wrapping quotes, then one boilerplate prefix, then whitespace
pub fn clean_response(raw: &str) -> String {
    let mut content = raw.trim();

    if content.len() >= 2
        && ((content.starts_with('"') && content.ends_with('"'))
            || (content.starts_with('\'') && content.ends_with('\'')))
    {
        content = &content[1..content.len() - 1];
    }

    for prefix in BOILERPLATE_PREFIXES {
        if let Some(head) = content.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                content = &content[prefix.len()..];
                break;
            }
        }
    }

    content.trim().to_string()
}
