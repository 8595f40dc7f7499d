use crate::formats::{Cell, Table};

/// Renders a table entry as a markdown table, with a `#####` caption line when captioned.
pub fn render_table(table: &Table) -> String {
    let mut lines = Vec::with_capacity(table.rows.len() + 3);
    if let Some(caption) = &table.caption {
        lines.push(format!("##### {caption}"));
    }
    if !table.col_labels.is_empty() {
        lines.push(row(table.col_labels.iter().cloned()));
        let divider = table
            .col_styles
            .iter()
            .map(|style| column_alignment(style))
            .collect::<Vec<_>>()
            .join("|");
        lines.push(format!("|{divider}|"));
    }
    for cells in &table.rows {
        lines.push(row(cells.iter().map(cell_text)));
    }
    lines.join("\n")
}

fn row(cells: impl Iterator<Item = String>) -> String {
    format!("| {} |", cells.collect::<Vec<_>>().join(" | "))
}

fn column_alignment(style: &str) -> &'static str {
    if style.contains("text-align-center") || style.contains("text-center") {
        ":----:"
    } else if style.contains("text-align-right") || style.contains("text-right") {
        "----:"
    } else {
        ":----"
    }
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Text(text) => text.clone(),
        Cell::Roll { roll } => match (roll.exact, roll.min, roll.max) {
            (Some(exact), _, _) => exact.to_string(),
            (None, Some(min), Some(max)) => format!("{}\u{2013}{}", pad(min), pad(max)),
            (None, Some(bound), None) | (None, None, Some(bound)) => pad(bound),
            (None, None, None) => String::new(),
        },
        Cell::Other(serde_json::Value::String(text)) => text.clone(),
        Cell::Other(serde_json::Value::Number(number)) => number.to_string(),
        Cell::Other(_) => String::new(),
    }
}

fn pad(value: i64) -> String {
    if (0..10).contains(&value) {
        format!("0{value}")
    } else {
        value.to_string()
    }
}
