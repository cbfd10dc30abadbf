//! Print Exporter
//!
//! Builds a standalone HTML page from the same [`FormattedSection`] values the
//! interactive display uses. Styles are inline so the page prints the same
//! wherever it is opened.

use crate::formatter::{FormattedResults, FormattedSection};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;

/// Shown in place of an empty section.
pub const PRINT_PLACEHOLDER: &str = "No information available";

pub const PRINT_TITLE: &str = "Grant Analysis Results";

const PRINT_STYLES: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; color: #111; }
h1 { font-size: 24px; margin-bottom: 24px; }
.section { margin-bottom: 30px; page-break-inside: avoid; }
.section-title { font-size: 18px; font-weight: bold; margin-bottom: 10px; border-bottom: 2px solid #ccc; padding-bottom: 5px; }
.item { margin-bottom: 8px; padding-left: 20px; }
.item .glyph { display: inline-block; width: 1.5em; }
.highlight { font-weight: bold; color: #059669; }
.placeholder { font-style: italic; color: #666; }
.footer { margin-top: 40px; font-size: 12px; color: #666; }
@media print { body { margin: 0; } }";

fn render_section(section: &FormattedSection) -> String {
    let body = if section.is_empty() {
        format!("<div class=\"item placeholder\">{}</div>", PRINT_PLACEHOLDER)
    } else {
        section.markup()
    };
    format!(
        "<div class=\"section\">\n<div class=\"section-title\">{}</div>\n{}\n</div>\n",
        section.kind.title(),
        body
    )
}

/// Complete print page for one set of results.
pub fn render_print_document(results: &FormattedResults, generated_on: NaiveDate) -> String {
    let sections: String = results.sections().into_iter().map(render_section).collect();

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>\n{styles}\n</style>\n</head>\n<body>\n<h1>{title}</h1>\n{sections}<p class=\"footer\">Generated by Grant Analyzer on {date}</p>\n</body>\n</html>\n",
        title = PRINT_TITLE,
        styles = PRINT_STYLES,
        sections = sections,
        date = generated_on.format("%m/%d/%Y"),
    )
}

/// Render and write the print page to `path`.
pub fn write_print_document(
    path: &Path,
    results: &FormattedResults,
    generated_on: NaiveDate,
) -> Result<()> {
    let document = render_print_document(results, generated_on);
    std::fs::write(path, document)
        .with_context(|| format!("Failed to write print document: {}", path.display()))
}
