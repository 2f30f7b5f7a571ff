//! Shareable document rendering
//!
//! Renders a structured summary into markdown: one heading per category,
//! prose fields as a paragraph, list fields as bullets. The result ships as
//! an email attachment.

use crate::summarize::{MeetingSummary, SummaryValue};

pub fn render_markdown(title: &str, summary: &MeetingSummary) -> String {
    let mut doc = String::new();

    doc.push_str("# ");
    doc.push_str(title);
    doc.push_str("\n\n");

    for (category, value) in summary.fields() {
        doc.push_str("## ");
        doc.push_str(category);
        doc.push_str("\n\n");

        match value {
            SummaryValue::Text(text) => {
                doc.push_str(text);
                doc.push_str("\n\n");
            }
            SummaryValue::Items(items) => {
                for item in items {
                    doc.push_str("- ");
                    doc.push_str(item);
                    doc.push('\n');
                }
                doc.push('\n');
            }
        }
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_paragraphs_and_bullets() {
        let summary = MeetingSummary::new(vec![
            (
                "Tone".to_string(),
                SummaryValue::Text("Collaborative and focused.".to_string()),
            ),
            (
                "Action Items".to_string(),
                SummaryValue::Items(vec!["Ship the release".to_string(), "Book a retro".to_string()]),
            ),
        ]);

        let doc = render_markdown("Weekly sync - 2025-01-10", &summary);

        assert!(doc.starts_with("# Weekly sync - 2025-01-10\n"));
        assert!(doc.contains("## Tone\n\nCollaborative and focused.\n"));
        assert!(doc.contains("## Action Items\n\n- Ship the release\n- Book a retro\n"));
    }
}
