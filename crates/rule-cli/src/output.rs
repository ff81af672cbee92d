use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One compact JSON document per line, for streaming output.
pub fn print_json_line<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn width(s: &str) -> usize {
    s.chars().count()
}

fn pad(cell: &str, w: usize) -> String {
    let fill = w.saturating_sub(width(cell));
    format!("{cell}{}", " ".repeat(fill))
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| width(h)).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(width(cell));
        }
    }

    let line = |cells: Vec<String>| {
        let joined = cells.join("  ");
        println!("{}", joined.trim_end());
    };

    line(headers.iter().zip(&widths).map(|(h, &w)| pad(h, w)).collect());
    line(widths.iter().map(|&w| "-".repeat(w)).collect());
    for row in &rows {
        line(
            row.iter()
                .enumerate()
                .map(|(i, cell)| pad(cell, widths.get(i).copied().unwrap_or(0)))
                .collect(),
        );
    }
}

/// Ten-cell bar for a 0..=100 percentage.
pub fn bar(percent: u32) -> String {
    let filled = (percent.min(100) as usize + 5) / 10;
    format!("{}{}", "#".repeat(filled), ".".repeat(10 - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_rounds_to_nearest_cell() {
        assert_eq!(bar(0), "..........");
        assert_eq!(bar(34), "###.......");
        assert_eq!(bar(35), "####......");
        assert_eq!(bar(100), "##########");
        assert_eq!(bar(250), "##########");
    }

    #[test]
    fn pad_counts_characters_not_bytes() {
        assert_eq!(pad("é", 3), "é  ");
        assert_eq!(pad("long", 2), "long");
    }
}
