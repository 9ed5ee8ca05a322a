//! Text format filter pipeline for category descriptions.
//!
//! Descriptions are filtered once, when they are saved:
//! - plain_text: HTML-escapes all content, newlines become `<br>`
//! - filtered_html: sanitized through an allowlist
//! - full_html: no filtering

use std::collections::HashSet;

/// Trait for text filters in the pipeline.
pub trait TextFilter: Send + Sync {
    /// Filter name for debugging.
    fn name(&self) -> &str;

    /// Process the input text and return filtered output.
    fn process(&self, input: &str) -> String;
}

/// Pipeline of text filters applied in sequence.
pub struct FilterPipeline {
    format: &'static str,
    filters: Vec<Box<dyn TextFilter>>,
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.filters.iter().map(|filter| filter.name()).collect();
        f.debug_struct("FilterPipeline")
            .field("format", &self.format)
            .field("filters", &names)
            .finish()
    }
}

impl FilterPipeline {
    fn empty(format: &'static str) -> Self {
        Self {
            format,
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline.
    pub fn add<F: TextFilter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Create pipeline for a specific format.
    pub fn for_format(format: &str) -> Self {
        match format {
            "filtered_html" => Self::filtered_html(),
            "full_html" => Self::full_html(),
            _ => Self::plain_text(),
        }
    }

    /// Escapes all HTML.
    pub fn plain_text() -> Self {
        Self::empty("plain_text")
            .add(HtmlEscapeFilter)
            .add(NewlineFilter)
    }

    /// Allows a safe subset of HTML.
    pub fn filtered_html() -> Self {
        Self::empty("filtered_html").add(SanitizeFilter::default())
    }

    /// No filtering.
    pub fn full_html() -> Self {
        Self::empty("full_html")
    }

    /// Name of the format this pipeline implements.
    pub fn format(&self) -> &'static str {
        self.format
    }

    /// Process text through all filters in the pipeline.
    pub fn process(&self, input: &str) -> String {
        self.filters
            .iter()
            .fold(input.to_string(), |acc, filter| filter.process(&acc))
    }

    /// Filter an optional description. Blank input is stored as no description.
    pub fn description(&self, input: Option<&str>) -> Option<String> {
        let text = input.map(str::trim).filter(|s| !s.is_empty())?;
        let out = self.process(text);
        if out.trim().is_empty() { None } else { Some(out) }
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::plain_text()
    }
}

/// Filter that escapes all HTML characters.
pub struct HtmlEscapeFilter;

impl TextFilter for HtmlEscapeFilter {
    fn name(&self) -> &str {
        "html_escape"
    }

    fn process(&self, input: &str) -> String {
        input
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#x27;")
    }
}

/// Filter that converts newlines to <br> tags.
pub struct NewlineFilter;

impl TextFilter for NewlineFilter {
    fn name(&self) -> &str {
        "newline"
    }

    fn process(&self, input: &str) -> String {
        input.replace('\n', "<br>\n")
    }
}

/// Allowlist HTML sanitizer backed by ammonia.
pub struct SanitizeFilter {
    tags: HashSet<&'static str>,
}

impl SanitizeFilter {
    /// Tags a category description may use.
    pub const ALLOWED_TAGS: &'static [&'static str] = &[
        "a",
        "abbr",
        "b",
        "blockquote",
        "br",
        "code",
        "em",
        "i",
        "li",
        "ol",
        "p",
        "strong",
        "ul",
    ];
}

impl Default for SanitizeFilter {
    fn default() -> Self {
        Self {
            tags: Self::ALLOWED_TAGS.iter().copied().collect(),
        }
    }
}

impl TextFilter for SanitizeFilter {
    fn name(&self) -> &str {
        "sanitize"
    }

    fn process(&self, input: &str) -> String {
        ammonia::Builder::default()
            .tags(self.tags.clone())
            .clean(input)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_escape_all_chars() {
        assert_eq!(HtmlEscapeFilter.process("<>&\"'"), "&lt;&gt;&amp;&quot;&#x27;");
    }

    #[test]
    fn newline_filter() {
        assert_eq!(NewlineFilter.process("line1\nline2"), "line1<br>\nline2");
    }

    #[test]
    fn sanitize_keeps_allowed_tags() {
        let output = SanitizeFilter::default().process("<p>Sport <em>news</em></p>");
        assert_eq!(output, "<p>Sport <em>news</em></p>");
    }

    #[test]
    fn sanitize_drops_scripts_and_handlers() {
        let output = SanitizeFilter::default()
            .process(r#"<p onclick="x()">Hi</p><script>alert('xss')</script>"#);
        assert!(!output.contains("script"));
        assert!(!output.contains("onclick"));
        assert!(output.contains("<p>Hi</p>"));
    }

    #[test]
    fn sanitize_drops_tags_outside_allowlist() {
        let output = SanitizeFilter::default().process("<h1>Title</h1>");
        assert_eq!(output, "Title");
    }

    #[test]
    fn for_format_selects_pipeline() {
        assert_eq!(FilterPipeline::for_format("filtered_html").format(), "filtered_html");
        assert_eq!(FilterPipeline::for_format("full_html").format(), "full_html");
        assert_eq!(FilterPipeline::for_format("plain_text").format(), "plain_text");
        assert_eq!(FilterPipeline::for_format("nonexistent").format(), "plain_text");
    }

    #[test]
    fn plain_text_pipeline() {
        let output = FilterPipeline::plain_text().process("<b>x</b>\ny");
        assert_eq!(output, "&lt;b&gt;x&lt;/b&gt;<br>\ny");
    }

    #[test]
    fn full_html_pipeline_no_filtering() {
        let input = "<script>alert('test')</script>";
        assert_eq!(FilterPipeline::full_html().process(input), input);
    }

    #[test]
    fn description_blank_is_none() {
        let pipeline = FilterPipeline::default();
        assert_eq!(pipeline.description(None), None);
        assert_eq!(pipeline.description(Some("   ")), None);
        assert_eq!(
            FilterPipeline::filtered_html().description(Some("<script>x</script>")),
            None
        );
    }

    #[test]
    fn description_is_trimmed_and_filtered() {
        let pipeline = FilterPipeline::plain_text();
        assert_eq!(
            pipeline.description(Some("  a < b  ")),
            Some("a &lt; b".to_string())
        );
    }
}
