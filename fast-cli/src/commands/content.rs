//! Print the fasting devotional.

use anyhow::Result;
use fast_client::{FastingController, FastingStore};
use fast_types::FastingContent;
use std::fmt::Write;

/// Run the content command.
pub async fn run<S: FastingStore + 'static>(controller: &FastingController<S>) -> Result<()> {
    let content = controller.content().await?;
    print!("{}", render(content));
    Ok(())
}

/// The full devotional: description, scripture, hourly messages and prompt.
pub fn render(content: &FastingContent) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", content.description);

    if !content.scripture_references.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Scripture:");
        for reference in &content.scripture_references {
            let _ = writeln!(out, "  {reference}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Hour by hour:");
    for (hour, message) in content.hourly_encouragement.iter().enumerate() {
        let _ = writeln!(out, "  {hour:>2}h  {message}");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "When you finish: {}", content.reflection_prompt);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_builtin_content() {
        let content = FastingContent::builtin();
        let text = render(&content);

        assert!(text.starts_with(&content.description));
        assert!(text.contains("  Isaiah 58:6-9"));
        assert!(text.contains(" 5h  "));
        assert!(text.contains(&content.reflection_prompt));
    }
}
