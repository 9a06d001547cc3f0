//! Output formatting for exported history rows.
//!
//! Projects rows onto the selected fields and renders CSV, JSON,
//! or a standalone HTML table. Pure functions, no I/O.

use std::borrow::Cow;
use std::fmt::Write;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::domain::{AppError, ExportFormat, Field, FieldMask, OutputRow, Result};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue<'a> {
    Number(i64),
    Text(&'a str),
    Bool(bool),
    Missing,
}

impl CellValue<'_> {
    /// Text form used by CSV and HTML; missing values are empty.
    #[must_use]
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
            Self::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Self::Missing => Cow::Borrowed(""),
        }
    }
}

impl Serialize for CellValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => serializer.serialize_i64(*n),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Missing => serializer.serialize_none(),
        }
    }
}

/// Reads one field of a row.
#[must_use]
pub fn cell(row: &OutputRow, field: Field) -> CellValue<'_> {
    match field {
        Field::Order => CellValue::Number(i64::try_from(row.order).unwrap_or(i64::MAX)),
        Field::Id => CellValue::Text(&row.id),
        Field::VisitTime => CellValue::Number(row.visit_time),
        Field::VisitTimeFormatted => CellValue::Text(&row.visit_time_formatted),
        Field::LastVisitTime => CellValue::Number(row.last_visit_time),
        Field::LastVisitTimeFormatted => CellValue::Text(&row.last_visit_time_formatted),
        Field::Title => CellValue::Text(&row.title),
        Field::Url => CellValue::Text(&row.url),
        Field::VisitCount => CellValue::Number(row.visit_count),
        Field::TypedCount => CellValue::Number(row.typed_count),
        Field::Transition => CellValue::Text(row.transition.code()),
        Field::TransitionLabel => CellValue::Text(row.transition_label),
        Field::IsWebUrl => CellValue::Bool(row.is_web_url),
        Field::ReferringVisitId => row
            .referring_visit_id
            .as_deref()
            .map_or(CellValue::Missing, CellValue::Text),
        Field::VisitId => CellValue::Text(&row.visit_id),
    }
}

/// A row restricted to the selected fields, in canonical order.
#[derive(Debug, Clone, Copy)]
pub struct ProjectedRow<'a> {
    row: &'a OutputRow,
    mask: FieldMask,
}

impl<'a> ProjectedRow<'a> {
    pub fn cells(&self) -> impl Iterator<Item = (Field, CellValue<'a>)> + '_ {
        let row = self.row;
        self.mask.selected().map(move |field| (field, cell(row, field)))
    }
}

impl Serialize for ProjectedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (field, value) in self.cells() {
            map.serialize_entry(field.key(), &value)?;
        }
        map.end()
    }
}

/// Restricts every row to the fields included in `mask`.
#[must_use]
pub fn project(rows: &[OutputRow], mask: FieldMask) -> Vec<ProjectedRow<'_>> {
    rows.iter().map(|row| ProjectedRow { row, mask }).collect()
}

/// Renders rows in `format`, keeping only the fields in `mask`.
///
/// # Errors
/// Returns error if CSV or JSON encoding fails.
pub fn serialize(rows: &[OutputRow], format: ExportFormat, mask: FieldMask) -> Result<String> {
    let projected = project(rows, mask);
    match format {
        ExportFormat::Csv => format_csv(&projected, mask),
        ExportFormat::Json => format_json(&projected),
        ExportFormat::Html => Ok(format_html(&projected, mask)),
    }
}

fn format_csv(rows: &[ProjectedRow<'_>], mask: FieldMask) -> Result<String> {
    let mut builder = WriterBuilder::new();
    builder
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'));

    let header: Vec<String> = mask.selected().map(|f| f.label().to_string()).collect();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(csv_line(&builder, &header)?);

    for row in rows {
        let values: Vec<String> = row
            .cells()
            .map(|(_, value)| value.to_text().into_owned())
            .collect();
        lines.push(csv_line(&builder, &values)?);
    }

    Ok(lines.join("\n"))
}

/// Encodes one record without its terminator.
///
/// A record of a single empty value stays blank rather than `""`.
fn csv_line(builder: &WriterBuilder, values: &[String]) -> Result<String> {
    if values.len() <= 1 && values.iter().all(String::is_empty) {
        return Ok(String::new());
    }

    let mut writer = builder.from_writer(Vec::new());
    writer.write_record(values).map_err(AppError::csv)?;

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::io("Failed to flush CSV output", e.into_error()))?;
    let mut line = String::from_utf8(bytes).map_err(|e| {
        AppError::io(
            "CSV output is not valid UTF-8",
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })?;

    if line.ends_with('\n') {
        line.pop();
    }
    Ok(line)
}

fn format_json(rows: &[ProjectedRow<'_>]) -> Result<String> {
    serde_json::to_string_pretty(rows).map_err(AppError::json_parse)
}

/// HTML-escape a string for text content and attribute values.
#[must_use]
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>Browsing History</title>
<style>
body {
  margin: 0;
  padding: 16px;
  max-width: 100%;
  font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
}
table {
  border-collapse: collapse;
  width: 100%;
  max-width: 100%;
  table-layout: fixed;
}
th, td {
  padding: 8px;
  text-align: left;
  border: 1px solid #ddd;
  word-wrap: break-word;
  overflow-wrap: break-word;
  min-width: 0;
}
th { background-color: #f2f2f2; }
td a { word-break: break-all; }
</style>
</head>
<body>
<table>
"#;

const HTML_TAIL: &str = "</tbody>
</table>
</body>
</html>
";

fn format_html(rows: &[ProjectedRow<'_>], mask: FieldMask) -> String {
    let columns = mask.selected().count().max(1);
    let width = 100.0 / columns as f64;

    let mut out = String::from(HTML_HEAD);
    out.push_str("<thead>\n<tr>");
    for field in mask.selected() {
        let _ = write!(
            out,
            "<th style=\"width: {width:.4}%\">{}</th>",
            html_escape(field.label())
        );
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in rows {
        out.push_str("<tr>");
        for (field, value) in row.cells() {
            let text = html_escape(&value.to_text());
            if field == Field::Url {
                let _ = write!(
                    out,
                    "<td><a href=\"{text}\" target=\"_blank\" rel=\"noopener noreferrer\">{text}</a></td>"
                );
            } else {
                let _ = write!(out, "<td>{text}</td>");
            }
        }
        out.push_str("</tr>\n");
    }

    out.push_str(HTML_TAIL);
    out
}
