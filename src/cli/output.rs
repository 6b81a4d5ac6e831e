//! CLI output formatting utilities.

use crate::contract::{MediaKind, ToolResult, ToolSpec};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print a success message.
    pub fn success(msg: &str) {
        eprintln!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a catalogue entry.
    pub fn tool_spec(spec: &ToolSpec) {
        let scope = if spec.bot_scoped { " (bot only)" } else { "" };
        println!(
            "  {} {}{}",
            style("*").cyan(),
            style(&spec.name).bold(),
            style(scope).dim()
        );
        println!("    {}", content_preview(&spec.description, 100));
        for field in &spec.schema.fields {
            let marker = if field.required { "required" } else { "optional" };
            println!(
                "    {} {} ({:?}, {})",
                style("-").dim(),
                field.name,
                field.kind,
                marker
            );
        }
    }

    /// Print a tool result.
    pub fn tool_result(result: &ToolResult) {
        println!("{}", result.content);
        println!();
        Output::kv("source", &result.source_name);
        if let Some(link) = &result.source_link {
            Output::kv("link", link);
        }
        if result.media_kind != MediaKind::None {
            Output::kv("media", &format!("{:?}", result.media_kind).to_lowercase());
        }
        if let Some(payload) = &result.inline_payload {
            Output::kv("inline", &format!("{} bytes", payload.len()));
        }
        for (i, source) in result.sources.iter().enumerate() {
            Output::kv(&format!("[{}]", i + 1), &source.source_link);
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(template) =
            ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")
        {
            pb.set_style(template);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Flatten and truncate text for a one-line preview.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        format!("{}...", content.chars().take(max_chars).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("a\nb", 10), "a b");
        assert_eq!(content_preview("héllo wörld", 5), "héllo...");
    }
}
