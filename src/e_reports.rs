use comfy_table::{Cell, ContentArrangement, Row, Table};
use nu_ansi_term::{Color, Style};

use crate::e_collection::CollectionSnapshot;
use crate::e_diagnostic::{classify_severity, DiagnosticSeverity};
use crate::e_resolver::ResolvedDiagnostic;

fn severity_style(severity: &str) -> Style {
    match classify_severity(severity) {
        Some(DiagnosticSeverity::Error) => Color::Red.bold(),
        Some(DiagnosticSeverity::Warning) => Color::Yellow.bold(),
        Some(DiagnosticSeverity::Information) => Color::Blue.normal(),
        None => Color::Purple.normal(),
    }
}

fn paint(style: Style, text: &str, color: bool) -> String {
    if color && cfg!(feature = "color") {
        style.paint(text).to_string()
    } else {
        text.to_string()
    }
}

/// `path:line:col: severity: [source] message`, one-based, followed by one
/// indented line per related location.
pub fn format_diagnostic(resolved: &ResolvedDiagnostic, color: bool) -> String {
    let diag = &resolved.diagnostic;
    let lineref = format!(
        "{}:{}:{}",
        resolved.path.display(),
        resolved.location.start.line + 1,
        resolved.location.start.character + 1
    );
    let mut severity = diag.severity.clone();
    if let Some(code) = &diag.code {
        severity.push(' ');
        severity.push_str(code);
    }
    let mut out = format!(
        "{}: {}: [{}] {}",
        paint(Style::new().bold(), &lineref, color),
        paint(severity_style(&diag.severity), &severity, color),
        diag.source,
        diag.message
    );
    for related in &resolved.related {
        out.push_str(&format!(
            "\n    {}: {}:{}:{}: {}",
            paint(Color::Blue.normal(), "note", color),
            related.path.display(),
            related.location.start.line + 1,
            related.location.start.character + 1,
            related.message
        ));
    }
    out
}

/// Per-file counts, errors first, with a totals row.
pub fn generate_summary(snapshot: &CollectionSnapshot) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_width(100);
    table.set_header(Row::from(vec![
        Cell::new("File"),
        Cell::new("Errors"),
        Cell::new("Warnings"),
        Cell::new("Info"),
        Cell::new("Total"),
    ]));

    for (path, items) in snapshot.files() {
        let count = |sev: DiagnosticSeverity| {
            items
                .iter()
                .filter(|d| d.diagnostic.classification() == Some(sev))
                .count()
        };
        table.add_row(Row::from(vec![
            Cell::new(path.display().to_string()),
            Cell::new(count(DiagnosticSeverity::Error)),
            Cell::new(count(DiagnosticSeverity::Warning)),
            Cell::new(count(DiagnosticSeverity::Information)),
            Cell::new(items.len()),
        ]));
    }
    table.add_row(Row::from(vec![
        Cell::new("Total"),
        Cell::new(snapshot.error_count()),
        Cell::new(snapshot.warning_count()),
        Cell::new(snapshot.info_count()),
        Cell::new(snapshot.total()),
    ]));
    table.to_string()
}

/// One row per diagnostic: level, lineref, code, first message line.
pub fn generate_diagnostics_table(resolved: &[ResolvedDiagnostic]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_width(100);
    table.set_header(Row::from(vec![
        Cell::new("Level"),
        Cell::new("Lineref"),
        Cell::new("Code"),
        Cell::new("Source"),
        Cell::new("Message"),
    ]));
    for r in resolved {
        let d = &r.diagnostic;
        table.add_row(Row::from(vec![
            Cell::new(&d.severity),
            Cell::new(format!(
                "{}:{}",
                r.path.display(),
                r.location.start.line + 1
            )),
            Cell::new(d.code.clone().unwrap_or_else(|| "-".to_string())),
            Cell::new(&d.source),
            Cell::new(d.message.lines().next().unwrap_or("")),
        ]));
    }
    table.to_string()
}
