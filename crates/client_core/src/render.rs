//! Text rendering of the reports table.

use shared::domain::ReportRow;

pub const NO_REPORTS_PLACEHOLDER: &str = "No production reports have been submitted yet.";

/// Renders `rows` as an aligned text table.
///
/// Columns are the first row's keys in service order. Output depends only on
/// `rows`, so re-rendering an unchanged snapshot yields identical text.
pub fn render_reports_table(rows: &[ReportRow]) -> String {
    let Some(first) = rows.first() else {
        return NO_REPORTS_PLACEHOLDER.to_string();
    };
    let headers: Vec<&str> = first.columns().collect();
    if headers.is_empty() {
        return NO_REPORTS_PLACEHOLDER.to_string();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| headers.iter().map(|header| row.cell(header)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_line(headers.iter().copied(), &widths));
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        lines.push(format_line(row.iter().map(String::as_str), &widths));
    }
    lines.join("\n")
}

fn format_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths.iter().copied())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}
