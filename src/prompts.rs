//! Instruction sent alongside every image to the extraction service.
//!
//! Kept in one place so the directive can be tuned without touching the
//! retry logic in [`crate::pipeline::llm`], and so tests can inspect it.
//! Callers may override it through [`crate::config::BatchConfig::prompt`].

/// Line used by the service to fence the organised content.
pub const SENTINEL: &str = "'''";

/// Default extraction directive.
pub const EXTRACTION_PROMPT: &str = r#"Please extract and organize the content in a clean, readable format with proper line breaks and organization:

1. Keep essential information:
   - Title and Subtitle if any
   - Main content (like poetry or text)
   - Page Number and Book Name in Top Right if any
   - Author information if any
   - Source attributions if any
   - Section titles or headers if any
   - Table-like structures if any

2. Remove common distracting elements:
   - Annotation marks
   - Commentary
   - Reference numbers
   - Editorial notes

Start your response with ''' on a new line, then provide the organized content, then end with ''' on a new line."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_requests_sentinel_fencing() {
        assert!(EXTRACTION_PROMPT.contains(&format!("Start your response with {SENTINEL}")));
        assert!(EXTRACTION_PROMPT.contains(&format!("end with {SENTINEL}")));
    }

    #[test]
    fn prompt_lists_kept_and_removed_elements() {
        for needle in [
            "Title and Subtitle",
            "Author",
            "Table-like",
            "Annotation marks",
            "Editorial notes",
        ] {
            assert!(EXTRACTION_PROMPT.contains(needle), "missing {needle}");
        }
    }
}
