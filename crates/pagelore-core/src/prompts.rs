//! Prompt templates sent to the model.

/// Per-page extraction prompt. Asks for a JSON object with `has_content`
/// and a `knowledge` list of strings.
pub fn page_analysis(page_text: &str) -> String {
    format!(
        r#"Analyze this page as if you're studying from a book.

SKIP content if the page contains:
- Table of contents
- Chapter listings
- Index pages
- Blank pages
- Copyright information
- Publishing details
- References or bibliography
- Acknowledgments

DO extract knowledge if the page contains:
- Preface content that explains important concepts
- Actual educational content
- Key definitions and concepts
- Important arguments or theories
- Examples and case studies
- Significant findings or conclusions
- Methodologies or frameworks
- Critical analyses or interpretations

For valid content:
- Set has_content to true
- Extract detailed, learnable knowledge points
- Include important quotes or key statements
- Capture examples with their context
- Preserve technical terms and definitions

For pages to skip:
- Set has_content to false
- Return empty knowledge list

Page text: {page_text}

Return a valid JSON object with the following keys:
- has_content (boolean): true if the page contains relevant content, false otherwise.
- knowledge (list of strings): knowledge points extracted from the page. The list must be empty if has_content is false.
Return only the JSON object, with no surrounding text or code fences."#
    )
}

/// Summary prompt over accumulated knowledge points, one point per line.
pub fn summary(points: &[String]) -> String {
    format!(
        r#"Create a comprehensive summary of the provided content in a concise but detailed way, using markdown format.

Use markdown formatting:
- ## for main sections
- ### for subsections
- Bullet points for lists
- `code blocks` for any code or formulas
- **bold** for emphasis
- *italic* for terminology
- > blockquotes for important notes

Return only the markdown summary, nothing else. Do not say 'here is the summary' or anything like that before or after.

Analyze this content:
{}

Return only the markdown summary, nothing else. Do not include any JSON."#,
        points.join("\n")
    )
}

/// Merge prompt over per-chunk section summaries of one book.
pub fn merge(sections: &[String]) -> String {
    format!(
        r#"Combine the following section summaries of one book into a single coherent markdown document.

Keep the same markdown conventions (## sections, ### subsections, bullet lists, `code blocks`, **bold**, *italic*, > blockquotes). Merge overlapping sections and remove repetition, but do not drop topics.

Return only the merged markdown document, nothing else.

Section summaries, in book order, separated by lines of equals signs:

{}"#,
        sections.join("\n\n========\n\n")
    )
}
