use terminal_size::{terminal_size, Height, Width};

use crate::gallery::{Gallery, MediaKind};

const HEADERS: [&str; 5] = ["#", "kind", "name", "uploaded", "description"];

/// Gallery as ASCII table lines, each fitted to `maxw` visible columns.
pub fn render_gallery(gallery: &Gallery, maxw: usize) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", gallery.category.title(), gallery.category)];
    if gallery.is_empty() {
        lines.push("  (no uploads)".to_string());
        return lines;
    }

    let cols: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    let rows: Vec<Vec<String>> = gallery
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            vec![
                (i + 1).to_string(),
                kind_label(item.kind).to_string(),
                item.name.clone(),
                item.uploaded_at.clone().unwrap_or_default(),
                item.description.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = cols.iter().map(|s| visible_len(s).min(maxw)).collect();
    for r in &rows {
        for (i, cell) in r.iter().enumerate() {
            let w = visible_len(cell);
            if w > widths[i] { widths[i] = w.min(maxw); }
        }
    }

    let sep = build_separator(&widths);
    lines.push(fit_line_to_width(&sep, maxw));
    lines.push(fit_line_to_width(&build_row(&cols, &widths), maxw));
    lines.push(fit_line_to_width(&sep, maxw));
    for r in &rows {
        lines.push(fit_line_to_width(&build_row(r, &widths), maxw));
    }
    lines.push(fit_line_to_width(&sep, maxw));
    lines.push(format!("items: {}", rows.len()));
    lines
}

fn kind_label(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Video => "video",
        MediaKind::Image => "image",
        MediaKind::Link => "file",
    }
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let text = truncate(&cell, *w);
        let pad = w.saturating_sub(visible_len(&text));
        s.push(' ');
        // index column right-aligned
        if i == 0 {
            s.push_str(&" ".repeat(pad));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&" ".repeat(pad));
        }
        s.push(' ');
        s.push('|');
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

pub fn terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), Height(_))) if w > 4 => (w - 4) as usize,
        _ => 80,
    }
}

fn fit_line_to_width(s: &str, maxw: usize) -> String {
    if visible_len(s) <= maxw { s.to_string() } else { truncate(s, maxw) }
}

fn visible_len(s: &str) -> usize {
    s.chars().count()
}
