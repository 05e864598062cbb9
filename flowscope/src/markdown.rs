//! Markdown rendering for the clean display mode.
//!
//! Uses pulldown-cmark to parse CommonMark (plus GitHub-flavored tables,
//! strikethrough and task lists) and renders to readable terminal text:
//! emphasis markers are stripped, list items get bullets, code blocks are
//! indented.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// Configuration for markdown rendering
#[derive(Debug, Clone)]
pub struct MarkdownConfig {
    /// Enable GitHub-flavored markdown (tables, strikethrough, task lists)
    pub gfm: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self { gfm: true }
    }
}

fn build_options(config: &MarkdownConfig) -> Options {
    let mut options = Options::empty();
    if config.gfm {
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
    }
    options
}

/// Render markdown to terminal text with a specific configuration.
pub fn render_markdown(input: &str, config: &MarkdownConfig) -> String {
    let parser = Parser::new_ext(input, build_options(config));

    let mut out = String::with_capacity(input.len());
    let mut in_code_block = false;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str("  - ");
            }
            Event::Text(text) => {
                if in_code_block {
                    for line in text.lines() {
                        out.push_str("    ");
                        out.push_str(line);
                        out.push('\n');
                    }
                } else {
                    out.push_str(&text);
                }
            }
            Event::Code(code) => {
                out.push('`');
                out.push_str(&code);
                out.push('`');
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_)) => out.push_str("\n\n"),
            Event::End(TagEnd::Item) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::Rule => out.push_str("----\n"),
            _ => {}
        }
    }

    out.trim_end().to_string()
}

/// Render markdown with default options (simple interface).
pub fn render_to_text(input: &str) -> String {
    render_markdown(input, &MarkdownConfig::default())
}
