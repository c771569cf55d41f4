//! Aligned plain-text tables for `--format table`.

const MIN_COLUMN_WIDTH: usize = 6;
const SEPARATOR: &str = "  ";

#[derive(Clone, Copy, Debug, Default)]
pub struct TableOptions {
    /// Terminal width to fit into; `None` never truncates.
    pub max_width: Option<usize>,
    pub color: bool,
}

/// Render `rows` under `headers`, right-aligning numeric cells.
#[must_use]
pub fn render(headers: &[&str], rows: &[Vec<String>], options: TableOptions) -> String {
    let mut widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain([header.chars().count(), MIN_COLUMN_WIDTH])
                .max()
                .unwrap_or(MIN_COLUMN_WIDTH)
        })
        .collect();
    if let Some(max) = options.max_width {
        shrink_to_fit(&mut widths, max);
    }

    let header = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(&truncate(h, *w), *w, false))
        .collect::<Vec<_>>()
        .join(SEPARATOR);
    let rule = "-".repeat(header.chars().count());

    let mut lines = vec![header, rule];
    for row in rows {
        let line = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let cell = truncate(row.get(i).map_or("-", String::as_str), *w);
                let padded = pad(&cell, *w, is_numeric(&cell));
                if options.color {
                    colorize(&cell, padded)
                } else {
                    padded
                }
            })
            .collect::<Vec<_>>()
            .join(SEPARATOR);
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

/// Narrow the widest column one character at a time until the table fits.
fn shrink_to_fit(widths: &mut [usize], max: usize) {
    let separators = widths.len().saturating_sub(1) * SEPARATOR.len();
    while widths.iter().sum::<usize>() + separators > max {
        let Some((widest, width)) = widths
            .iter()
            .copied()
            .enumerate()
            .max_by_key(|(_, w)| *w)
        else {
            return;
        };
        if width <= MIN_COLUMN_WIDTH {
            return;
        }
        widths[widest] -= 1;
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn pad(value: &str, width: usize, right_align: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(value.chars().count()));
    if right_align {
        format!("{fill}{value}")
    } else {
        format!("{value}{fill}")
    }
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty()
        && value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | ',' | '%'))
}

/// Green for settled states, yellow for work in progress, red for dead ends.
fn colorize(cell: &str, padded: String) -> String {
    let code = match cell {
        "active" | "approved" | "paid" | "ok" => "32",
        "pending" | "paused" | "not_submitted" => "33",
        "rejected" | "closed" | "archived" => "31",
        _ => return padded,
    };
    format!("\u{1b}[{code}m{padded}\u{1b}[0m")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn rows() -> Vec<Vec<String>> {
        vec![
            vec!["idx-1".into(), "active".into(), "1,000.00".into()],
            vec!["idx-200".into(), "paused".into(), "25.50".into()],
        ]
    }

    #[test]
    fn aligns_columns_and_right_aligns_numbers() {
        let out = render(&["id", "status", "amount"], &rows(), TableOptions::default());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].split_whitespace().collect::<Vec<_>>(), ["id", "status", "amount"]);
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(lines[3].ends_with("   25.50"));
    }

    #[test]
    fn truncates_to_terminal_width() {
        let rows = vec![vec!["a".repeat(40), "b".repeat(40)]];
        let out = render(
            &["left", "right"],
            &rows,
            TableOptions {
                max_width: Some(40),
                color: false,
            },
        );
        assert!(out.lines().all(|line| line.chars().count() <= 40));
        assert!(out.contains('…'));
    }

    #[test]
    fn colors_known_statuses_only() {
        let out = render(
            &["status"],
            &[vec!["rejected".into()], vec!["other".into()]],
            TableOptions {
                max_width: None,
                color: true,
            },
        );
        assert!(out.contains("\u{1b}[31mrejected"));
        assert!(!out.contains("\u{1b}[31mother"));
    }
}
