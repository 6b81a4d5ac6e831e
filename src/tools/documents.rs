//! Spreadsheet, document and slide-deck generators.
//!
//! The tools own naming and upload; turning arguments into file bytes is the
//! job of a [`DocumentRenderer`]. The built-in renderers write CSV and Markdown.

use crate::artifact::{sanitize_filename, ArtifactStore};
use crate::contract::{
    CallerContext, FieldKind, FieldSpec, MediaKind, Tool, ToolResult, ToolSchema,
};
use crate::error::{Result, ToolError};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Category under which generated documents are stored.
pub const DOCUMENT_CATEGORY: &str = "generated_documents";

/// A rendered file ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
    pub content_type: &'static str,
}

/// Turns validated tool arguments into file bytes.
pub trait DocumentRenderer<A>: Send + Sync {
    fn render(&self, args: &A) -> Result<Rendered>;
}

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_slide_title() -> String {
    "Slide".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpreadsheetArgs {
    pub title: String,
    pub data: Vec<Value>,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    #[serde(default = "default_true")]
    pub include_header: bool,
    /// Explicit column order.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

impl SpreadsheetArgs {
    /// Rows as objects; anything else is an argument error.
    pub fn rows(&self) -> Result<Vec<&Map<String, Value>>> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.as_object().ok_or_else(|| {
                    ToolError::invalid("data", format!("row {} is not an object", i + 1))
                })
            })
            .collect()
    }

    /// Column order: the explicit list if given, otherwise keys in first-seen order.
    pub fn column_names(&self) -> Result<Vec<String>> {
        if let Some(columns) = &self.columns {
            return Ok(columns.clone());
        }
        let mut names: Vec<String> = Vec::new();
        for row in self.rows()? {
            for key in row.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }
        Ok(names)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentArgs {
    pub title: String,
    pub content: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlideSpec {
    #[serde(default = "default_slide_title")]
    pub title: String,
    #[serde(default)]
    pub content: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresentationArgs {
    pub title: String,
    pub slides: Vec<SlideSpec>,
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn generated_on() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// RFC 4180 style CSV.
pub struct CsvRenderer;

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) || text.starts_with(' ') || text.ends_with(' ') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

fn csv_line(fields: impl IntoIterator<Item = String>) -> String {
    let mut line = fields
        .into_iter()
        .map(|f| csv_field(&f))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

impl DocumentRenderer<SpreadsheetArgs> for CsvRenderer {
    fn render(&self, args: &SpreadsheetArgs) -> Result<Rendered> {
        let columns = args.column_names()?;
        let mut out = String::new();

        if args.include_header && !columns.is_empty() {
            out.push_str(&csv_line(columns.iter().cloned()));
        }
        for row in args.rows()? {
            out.push_str(&csv_line(
                columns
                    .iter()
                    .map(|c| row.get(c).map(cell_text).unwrap_or_default()),
            ));
        }

        Ok(Rendered {
            bytes: out.into_bytes(),
            extension: "csv",
            content_type: "text/csv",
        })
    }
}

/// CommonMark output for documents and slide decks.
pub struct MarkdownRenderer;

fn table_cell(value: &Value) -> String {
    cell_text(value).replace('|', "\\|").replace('\n', " ")
}

fn push_table(out: &mut String, rows: &[Value]) {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| match row {
            Value::Array(cells) => cells.iter().map(table_cell).collect(),
            other => vec![table_cell(other)],
        })
        .collect();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);

    for (i, row) in rows.iter().enumerate() {
        let mut cells = row.clone();
        cells.resize(width, String::new());
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
        if i == 0 {
            out.push_str(&format!("|{}\n", " --- |".repeat(width)));
        }
    }
    out.push('\n');
}

fn push_section(out: &mut String, section: &Value) {
    let Some(obj) = section.as_object() else {
        let text = cell_text(section);
        if !text.is_empty() {
            out.push_str(&format!("{}\n\n", text));
        }
        return;
    };

    let text = obj.get("text").map(cell_text).unwrap_or_default();
    match obj.get("type").and_then(Value::as_str).unwrap_or("paragraph") {
        "heading" => {
            let level = obj.get("level").and_then(Value::as_u64).unwrap_or(2).clamp(1, 6);
            if !text.is_empty() {
                out.push_str(&format!("{} {}\n\n", "#".repeat(level as usize), text));
            }
        }
        "paragraph" => {
            if !text.is_empty() {
                out.push_str(&format!("{}\n\n", text));
            }
        }
        "list" => {
            let items = obj.get("items").and_then(Value::as_array);
            if let Some(items) = items.filter(|i| !i.is_empty()) {
                for item in items {
                    out.push_str(&format!("- {}\n", cell_text(item)));
                }
                out.push('\n');
            }
        }
        "table" => {
            let rows = obj.get("data").and_then(Value::as_array);
            if let Some(rows) = rows.filter(|r| !r.is_empty()) {
                push_table(out, rows);
            }
        }
        other => {
            debug!("Unknown section type '{}', rendering as paragraph", other);
            let text = if text.is_empty() { section.to_string() } else { text };
            out.push_str(&format!("{}\n\n", text));
        }
    }
}

impl DocumentRenderer<DocumentArgs> for MarkdownRenderer {
    fn render(&self, args: &DocumentArgs) -> Result<Rendered> {
        let mut out = format!("# {}\n\n_Generated on: {}_\n\n", args.title, generated_on());
        for section in &args.content {
            push_section(&mut out, section);
        }

        Ok(Rendered {
            bytes: out.trim_end().to_string().into_bytes(),
            extension: "md",
            content_type: "text/markdown",
        })
    }
}

impl DocumentRenderer<PresentationArgs> for MarkdownRenderer {
    fn render(&self, args: &PresentationArgs) -> Result<Rendered> {
        let mut out = format!("# {}\n\nGenerated on {}\n", args.title, generated_on());
        for slide in &args.slides {
            out.push_str(&format!("\n---\n\n## {}\n\n", slide.title));
            for item in &slide.content {
                out.push_str(&format!("- {}\n", cell_text(item)));
            }
        }

        Ok(Rendered {
            bytes: out.into_bytes(),
            extension: "md",
            content_type: "text/markdown",
        })
    }
}

/// Upload a rendered document named after its sanitized title.
async fn publish(
    store: &dyn ArtifactStore,
    title: &str,
    rendered: &Rendered,
) -> Result<(String, String, String)> {
    let stem = sanitize_filename(title);
    let filename = format!("{}.{}", stem, rendered.extension);
    let link = store
        .put(DOCUMENT_CATEGORY, &rendered.bytes, &filename, rendered.content_type)
        .await?;
    info!("Stored document {} ({} bytes)", filename, rendered.bytes.len());
    Ok((stem, filename, link))
}

fn title_field(kind: &str) -> FieldSpec {
    FieldSpec::required("title", FieldKind::String, &format!("Title for the {}", kind)).non_empty()
}

pub struct SpreadsheetGeneratorTool {
    renderer: Arc<dyn DocumentRenderer<SpreadsheetArgs>>,
    store: Arc<dyn ArtifactStore>,
}

impl SpreadsheetGeneratorTool {
    pub fn new(
        renderer: Arc<dyn DocumentRenderer<SpreadsheetArgs>>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self { renderer, store }
    }
}

#[async_trait]
impl Tool for SpreadsheetGeneratorTool {
    type Args = SpreadsheetArgs;

    fn name(&self) -> &'static str {
        "spreadsheet_generator"
    }

    fn description(&self) -> &'static str {
        "Generate a spreadsheet from tabular data. Each row is an object keyed by column name."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            title_field("spreadsheet"),
            FieldSpec::required(
                "data",
                FieldKind::Array,
                "Rows of the sheet. Each object represents a row with column names as keys.",
            )
            .items(FieldKind::Object),
            FieldSpec::optional("sheet_name", FieldKind::String, "Name of the sheet")
                .with_default(json!("Sheet1")),
            FieldSpec::optional(
                "include_header",
                FieldKind::Boolean,
                "Whether to include column headers",
            )
            .with_default(json!(true)),
            FieldSpec::optional(
                "columns",
                FieldKind::Array,
                "Column order. Defaults to the order keys first appear in the rows.",
            )
            .items(FieldKind::String),
        ])
    }

    async fn run(&self, args: SpreadsheetArgs, _caller: &CallerContext) -> Result<ToolResult> {
        info!("Generating spreadsheet: {}", args.title);
        let columns = args.column_names()?;
        let rendered = self.renderer.render(&args)?;
        let (stem, filename, link) = publish(self.store.as_ref(), &args.title, &rendered).await?;

        let listed = if columns.is_empty() {
            "No data".to_string()
        } else {
            columns.join(", ")
        };
        let content = format!(
            "Spreadsheet '{}' has been generated successfully with {} rows of data in sheet '{}'. \
             The file contains columns: {}. Download URL: {}",
            stem,
            args.data.len(),
            args.sheet_name,
            listed,
            link
        );
        Ok(ToolResult::artifact(content, filename, link, MediaKind::None))
    }
}

pub struct DocumentGeneratorTool {
    renderer: Arc<dyn DocumentRenderer<DocumentArgs>>,
    store: Arc<dyn ArtifactStore>,
}

impl DocumentGeneratorTool {
    pub fn new(
        renderer: Arc<dyn DocumentRenderer<DocumentArgs>>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self { renderer, store }
    }
}

#[async_trait]
impl Tool for DocumentGeneratorTool {
    type Args = DocumentArgs;

    fn name(&self) -> &'static str {
        "document_generator"
    }

    fn description(&self) -> &'static str {
        "Generate a text document from headings, paragraphs, lists and tables."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            title_field("document"),
            FieldSpec::required(
                "content",
                FieldKind::Array,
                "Content sections. Each object has a 'type' (heading, paragraph, list, table) \
                 and 'text', 'items' or 'data'. Headings accept a 'level'.",
            ),
        ])
    }

    async fn run(&self, args: DocumentArgs, _caller: &CallerContext) -> Result<ToolResult> {
        info!("Generating document: {}", args.title);
        let rendered = self.renderer.render(&args)?;
        let (stem, filename, link) = publish(self.store.as_ref(), &args.title, &rendered).await?;

        let content = format!(
            "Document '{}' has been generated successfully with {} content sections. Download URL: {}",
            stem,
            args.content.len(),
            link
        );
        Ok(ToolResult::artifact(content, filename, link, MediaKind::None))
    }
}

pub struct PresentationGeneratorTool {
    renderer: Arc<dyn DocumentRenderer<PresentationArgs>>,
    store: Arc<dyn ArtifactStore>,
}

impl PresentationGeneratorTool {
    pub fn new(
        renderer: Arc<dyn DocumentRenderer<PresentationArgs>>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self { renderer, store }
    }
}

#[async_trait]
impl Tool for PresentationGeneratorTool {
    type Args = PresentationArgs;

    fn name(&self) -> &'static str {
        "presentation_generator"
    }

    fn description(&self) -> &'static str {
        "Generate a slide deck. Each slide has a title and a list of bullet points."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            title_field("presentation"),
            FieldSpec::required(
                "slides",
                FieldKind::Array,
                "Slides. Each object has a 'title' and 'content' (a list of bullet points).",
            )
            .items(FieldKind::Object),
        ])
    }

    async fn run(&self, args: PresentationArgs, _caller: &CallerContext) -> Result<ToolResult> {
        info!("Generating presentation: {}", args.title);
        if args.slides.is_empty() {
            warn!("Presentation '{}' has no content slides", args.title);
        }
        let rendered = self.renderer.render(&args)?;
        let (stem, filename, link) = publish(self.store.as_ref(), &args.title, &rendered).await?;

        let content = format!(
            "Presentation '{}' has been generated successfully with {} slides (including title slide). \
             Download URL: {}",
            stem,
            args.slides.len() + 1,
            link
        );
        Ok(ToolResult::artifact(content, filename, link, MediaKind::None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ToolRequest;
    use crate::tools::tests::harness;

    fn sheet(data: Value) -> SpreadsheetArgs {
        serde_json::from_value(json!({"title": "Q3", "data": data})).unwrap()
    }

    fn text(rendered: Rendered) -> String {
        String::from_utf8(rendered.bytes).unwrap()
    }

    #[test]
    fn test_csv_quoting_and_missing_cells() {
        let args = sheet(json!([
            {"name": "Widget, large", "price": 12.5},
            {"name": "Say \"hi\"", "note": null},
            {"price": 3}
        ]));
        let csv = text(CsvRenderer.render(&args).unwrap());
        let lines: Vec<&str> = csv.split("\r\n").collect();

        assert_eq!(lines[0], "name,price,note");
        assert_eq!(lines[1], "\"Widget, large\",12.5,");
        assert_eq!(lines[2], "\"Say \"\"hi\"\"\",,");
        assert_eq!(lines[3], ",3,");
    }

    #[test]
    fn test_csv_explicit_columns_and_no_header() {
        let mut args = sheet(json!([{"a": 1, "b": 2}]));
        args.columns = Some(vec!["b".to_string(), "a".to_string()]);
        args.include_header = false;
        assert_eq!(text(CsvRenderer.render(&args).unwrap()), "2,1\r\n");
    }

    #[test]
    fn test_non_object_row_is_invalid() {
        let args = sheet(json!([{"a": 1}, [1, 2]]));
        let err = CsvRenderer.render(&args).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { ref field, .. } if field == "data"));
    }

    #[test]
    fn test_markdown_document_sections() {
        let args: DocumentArgs = serde_json::from_value(json!({
            "title": "Report",
            "content": [
                {"type": "heading", "text": "Intro", "level": 1},
                "Loose paragraph",
                {"type": "list", "items": ["one", 2]},
                {"type": "table", "data": [["k", "v"], ["a|b", 1, "extra"], "solo"]},
                {"type": "quote", "text": "Odd type"},
                {"type": "paragraph", "text": ""}
            ]
        }))
        .unwrap();
        let md = text(MarkdownRenderer.render(&args).unwrap());

        assert!(md.starts_with("# Report\n\n_Generated on: "));
        assert!(md.contains("\n# Intro\n"));
        assert!(md.contains("Loose paragraph\n"));
        assert!(md.contains("- one\n- 2\n"));
        assert!(md.contains("| k | v |  |\n| --- | --- | --- |\n| a\\|b | 1 | extra |\n| solo |  |  |"));
        assert!(md.contains("Odd type"));
    }

    #[test]
    fn test_markdown_slides() {
        let args: PresentationArgs = serde_json::from_value(json!({
            "title": "Roadmap",
            "slides": [{"title": "Now", "content": ["ship it"]}, {"content": []}]
        }))
        .unwrap();
        let md = text(MarkdownRenderer.render(&args).unwrap());
        assert!(md.contains("---\n\n## Now\n\n- ship it\n"));
        assert!(md.contains("## Slide\n"));
    }

    #[tokio::test]
    async fn test_spreadsheet_tool_uploads_under_sanitized_title() {
        let h = harness();
        let result = h
            .registry
            .invoke(ToolRequest::new(
                "spreadsheet_generator",
                json!({"title": "Sales: Q3/2024!", "data": [{"region": "EU", "total": 10}]}),
            ))
            .await
            .unwrap();

        assert_eq!(result.source_name, "Sales Q32024.csv");
        assert_eq!(result.media_kind, MediaKind::None);
        assert!(result.content.contains("with 1 rows of data in sheet 'Sheet1'"));
        assert!(result.content.contains("columns: region, total"));

        let link = result.source_link.unwrap();
        assert!(link.contains("/generated_documents/"));
        let bytes = h.store.fetch(&link).await.unwrap();
        assert_eq!(bytes, b"region,total\r\nEU,10\r\n");
    }

    #[tokio::test]
    async fn test_document_and_presentation_tools() {
        let h = harness();
        let doc = h
            .registry
            .invoke(ToolRequest::new(
                "document_generator",
                json!({"title": "***", "content": [{"type": "paragraph", "text": "hi"}]}),
            ))
            .await
            .unwrap();
        assert_eq!(doc.source_name, "document.md");
        assert!(doc.content.contains("with 1 content sections"));

        let deck = h
            .registry
            .invoke(ToolRequest::new(
                "presentation_generator",
                json!({"title": "Plan", "slides": [{"title": "A", "content": ["x"]}]}),
            ))
            .await
            .unwrap();
        assert!(deck.content.contains("with 2 slides"));
        assert_eq!(h.store.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_data_never_uploads() {
        let h = harness();
        let err = h
            .registry
            .invoke(ToolRequest::new("spreadsheet_generator", json!({"title": "Empty"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { ref field, .. } if field == "data"));
        assert_eq!(h.store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_wrongly_typed_elements_name_their_field() {
        let h = harness();
        let cases = [
            (
                "spreadsheet_generator",
                json!({"title": "T", "data": [{"a": 1}], "columns": [1, 2]}),
                "columns",
            ),
            (
                "spreadsheet_generator",
                json!({"title": "T", "data": [{"a": 1}, "b"]}),
                "data",
            ),
            (
                "presentation_generator",
                json!({"title": "T", "slides": [1]}),
                "slides",
            ),
        ];
        for (tool, args, expected) in cases {
            let err = h
                .registry
                .invoke(ToolRequest::new(tool, args))
                .await
                .unwrap_err();
            match err {
                ToolError::InvalidArgument { field, .. } => assert_eq!(field, expected),
                other => panic!("Expected InvalidArgument, got {:?}", other),
            }
        }
        assert_eq!(h.store.put_count(), 0);
    }
}
