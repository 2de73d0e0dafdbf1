//! Plain-text aligned tables for terminal output.

use itertools::Itertools;

const MIN_WIDTH: usize = 3;

pub fn render_table<H: AsRef<str>>(headers: &[H], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| display_width(header.as_ref()).max(MIN_WIDTH))
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }

    let mut output = String::new();
    push_line(&mut output, headers.iter().map(|header| header.as_ref()), &widths);
    let rule = widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>();
    push_line(&mut output, rule.iter().map(String::as_str), &widths);
    for row in rows {
        push_line(&mut output, row.iter().map(String::as_str), &widths);
    }
    output
}

pub fn print_table<H: AsRef<str>>(headers: &[H], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn push_line<'a>(output: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| {
            let cell = sanitize(cell);
            let padding = width.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .join("  ");
    output.push_str(line.trim_end());
    output.push('\n');
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_align_to_widest_cell() {
        let rows = vec![
            vec!["pos".to_string(), "scalar".to_string()],
            vec!["counts".to_string(), "pivot".to_string()],
        ];
        let rendered = render_table(&["field", "kind"], &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "field   kind");
        assert_eq!(lines[1], "------  ------");
        assert_eq!(lines[2], "pos     scalar");
        assert_eq!(lines[3], "counts  pivot");
    }

    #[test]
    fn control_characters_become_spaces() {
        let rows = vec![vec!["a\tb".to_string()]];
        let rendered = render_table(&["x"], &rows);
        assert!(rendered.ends_with("a b\n"));
    }
}
