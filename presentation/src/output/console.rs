//! Console output for one-shot commands

use colored::Colorize;
use voice_domain::{ConversationId, ToolsetSnapshot};

/// Formats command output for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// The merged toolset, grouped by provider in registration order.
    pub fn format_toolset(toolset: &ToolsetSnapshot) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("Registered Tools"));
        output.push('\n');

        if toolset.is_empty() {
            output.push_str(&format!("\n{}\n", "No tools available.".yellow()));
            output.push_str(&Self::footer());
            return output;
        }

        let mut current: Option<&str> = None;
        for entry in toolset.entries() {
            if current != Some(entry.provider.as_str()) {
                output.push_str(&Self::section_header(&entry.provider));
                current = Some(entry.provider.as_str());
            }
            output.push_str(&format!("  {}\n", entry.descriptor.name.green().bold()));
            if !entry.descriptor.description.is_empty() {
                output.push_str(&Self::indent(&entry.descriptor.description, "      "));
                output.push('\n');
            }
        }

        output.push_str(&format!(
            "\n{} {} tools from {} providers\n",
            "Total:".cyan().bold(),
            toolset.len(),
            toolset.provider_count()
        ));
        output.push_str(&Self::footer());
        output
    }

    /// Config locations as `(label, location, found)`, highest priority first.
    pub fn format_config_sources<'a>(
        sources: impl IntoIterator<Item = (&'a str, &'a str, bool)>,
    ) -> String {
        let mut output = format!("{}\n", "Configuration sources (in priority order):".bold());
        for (label, location, found) in sources {
            let marker = if found {
                "[FOUND]".green().to_string()
            } else {
                "[     ]".dimmed().to_string()
            };
            output.push_str(&format!("  {} {:<9}{}\n", marker, format!("{label}:"), location));
        }
        output
    }

    /// One line reported after a session completes.
    pub fn format_session_end(conversation_id: &ConversationId, tools_count: usize) -> String {
        format!(
            "{} conversation {} ({} tools)",
            "Session ended:".cyan().bold(),
            conversation_id,
            tools_count
        )
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
