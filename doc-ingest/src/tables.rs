//! Best-effort table detection on extracted page text.
//!
//! PDF text extraction keeps column gaps as runs of spaces or tabs. A table is
//! a run of consecutive lines that all split into the same number (≥ 2) of
//! cells on such gaps; the first line is the header. Runs without at least one
//! data row below the header are ignored.

const TABLE_PREFIX: &str = "Table from PDF:\n";

/// A header plus data rows, every row as wide as the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Pipe-table markdown, prefixed with `Table from PDF:`.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from(TABLE_PREFIX);
        out.push_str(&md_row(&self.header));
        out.push('\n');
        out.push_str(&md_row(
            &self.header.iter().map(|_| ":---".to_string()).collect::<Vec<_>>(),
        ));
        for row in &self.rows {
            out.push('\n');
            out.push_str(&md_row(row));
        }
        out
    }
}

fn md_row(cells: &[String]) -> String {
    let escaped: Vec<String> = cells.iter().map(|c| c.replace('|', "\\|")).collect();
    format!("| {} |", escaped.join(" | "))
}

/// Splits a line on tabs or runs of two or more spaces.
fn cells(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut spaces = 0usize;

    for ch in line.trim().chars() {
        match ch {
            '\t' => {
                push_cell(&mut out, &mut current);
                spaces = 0;
            }
            ' ' => spaces += 1,
            _ => {
                if spaces >= 2 {
                    push_cell(&mut out, &mut current);
                } else if spaces == 1 {
                    current.push(' ');
                }
                spaces = 0;
                current.push(ch);
            }
        }
    }
    push_cell(&mut out, &mut current);
    out
}

fn push_cell(out: &mut Vec<String>, current: &mut String) {
    let cell = current.trim();
    if !cell.is_empty() {
        out.push(cell.to_string());
    }
    current.clear();
}

/// Finds every table in a page of text.
pub fn detect_tables(page_text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut run: Vec<Vec<String>> = Vec::new();

    let mut flush = |run: &mut Vec<Vec<String>>| {
        if run.len() >= 2 {
            let mut rows = std::mem::take(run);
            let header = rows.remove(0);
            tables.push(Table { header, rows });
        }
        run.clear();
    };

    for line in page_text.lines() {
        let row = cells(line);
        let continues = row.len() >= 2 && run.first().is_none_or(|h| h.len() == row.len());
        if continues {
            run.push(row);
        } else {
            flush(&mut run);
            if row.len() >= 2 {
                run.push(row);
            }
        }
    }
    flush(&mut run);
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_aligned_columns() {
        let page = "Quarterly summary\n\
                    Region    Revenue   Growth\n\
                    North     1200      4%\n\
                    South     900       -2%\n\
                    Totals are unaudited.";
        let tables = detect_tables(page);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, vec!["Region", "Revenue", "Growth"]);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[1], vec!["South", "900", "-2%"]);
    }

    #[test]
    fn header_alone_is_not_a_table() {
        assert!(detect_tables("Name    Value\nplain prose follows here").is_empty());
    }

    #[test]
    fn width_change_starts_a_new_run() {
        let page = "a  b\nc  d\nx  y  z\n1  2  3";
        let tables = detect_tables(page);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].header, vec!["x", "y", "z"]);
    }

    #[test]
    fn single_spaces_stay_inside_cells() {
        assert_eq!(cells("New York   8.3 million"), vec!["New York", "8.3 million"]);
        assert_eq!(cells("tab\tseparated"), vec!["tab", "separated"]);
    }

    #[test]
    fn markdown_has_prefix_and_separator() {
        let t = Table {
            header: vec!["A".into(), "B".into()],
            rows: vec![vec!["1".into(), "x|y".into()]],
        };
        assert_eq!(
            t.to_markdown(),
            "Table from PDF:\n| A | B |\n| :--- | :--- |\n| 1 | x\\|y |"
        );
    }
}
