//! Plain-text renderings of a [`Table`] for logs, tickets and reports.

use std::fmt::{self, Write as _};

use crate::table::Table;
use crate::value::Value;

/// Tab-separated header line, then one line per row. Values are written verbatim.
pub fn to_tsv(table: &Table) -> String {
    table.to_string()
}

/// Jira wiki markup: `||a||b||` header, `|1|2|` rows.
pub fn to_jira(table: &Table) -> String {
    let mut out = String::new();
    out.push_str("||");
    for field in table.fields() {
        out.push_str(field);
        out.push_str("||");
    }
    out.push('\n');
    for row in table {
        out.push('|');
        for value in row.values() {
            // Writing to a `String` cannot fail.
            let _ = write!(out, "{value}|");
        }
        out.push('\n');
    }
    out
}

/// An HTML `<table>` with a header row. Field names and values are escaped.
pub fn to_html(table: &Table) -> String {
    let mut out = String::from("<table>\n<thead><tr>");
    for field in table.fields() {
        out.push_str("<th>");
        push_escaped(&mut out, field);
        out.push_str("</th>");
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for row in table {
        out.push_str("<tr>");
        for value in row.values() {
            out.push_str("<td>");
            push_value_escaped(&mut out, value);
            out.push_str("</td>");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
    out
}

fn push_value_escaped(out: &mut String, value: &Value) {
    match value {
        Value::Text(s) => push_escaped(out, s),
        other => {
            let _ = write!(out, "{other}");
        }
    }
}

fn push_escaped(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.fields().join("\t"))?;
        for row in self {
            for (idx, value) in row.values().iter().enumerate() {
                if idx > 0 {
                    f.write_str("\t")?;
                }
                write!(f, "{value}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_pairs([
            ("name", vec![Value::from("a<b"), Value::from("c")]),
            ("n", vec![Value::from(1), Value::Null]),
        ])
        .unwrap()
    }

    #[test]
    fn display_is_tab_separated() {
        assert_eq!(sample().to_string(), "name\tn\na<b\t1\nc\t\n");
        assert_eq!(to_tsv(&sample()), sample().to_string());
    }

    #[test]
    fn jira_markup() {
        assert_eq!(to_jira(&sample()), "||name||n||\n|a<b|1|\n|c||\n");
    }

    #[test]
    fn html_escapes_text() {
        let html = to_html(&sample());
        assert!(html.contains("<th>name</th><th>n</th>"));
        assert!(html.contains("<tr><td>a&lt;b</td><td>1</td></tr>"));
        assert!(html.contains("<tr><td>c</td><td></td></tr>"));
    }

    #[test]
    fn empty_table_renders_header_only() {
        let table = Table::with_fields(["x", "y"]).unwrap();
        assert_eq!(table.to_string(), "x\ty\n");
    }
}
