//! Terminal rendering of answers and conversation history.

use console::style;
use serde_json::Value;
use shared::Conversation;

/// Answer text for display. A JSON array of objects is laid out as a table,
/// anything else is returned unchanged.
pub fn format_answer(answer: &str) -> String {
    match serde_json::from_str::<Value>(answer) {
        Ok(Value::Array(rows)) if !rows.is_empty() && rows.iter().all(Value::is_object) => table(&rows),
        _ => answer.to_string(),
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn table(rows: &[Value]) -> String {
    let mut headers: Vec<&str> = Vec::new();
    for row in rows.iter().filter_map(Value::as_object) {
        for key in row.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key);
            }
        }
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| headers.iter().map(|h| cell(row.get(*h))).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            cells
                .iter()
                .map(|row| row[idx].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![
        line(headers.clone()),
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"),
    ];
    for row in &cells {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

pub fn print_answer(answer: &str) {
    println!("\n{}\n", format_answer(answer));
}

/// Print the conversation newest first.
pub fn print_history(conversation: &Conversation) {
    println!("\n{}", style("Conversation History").bold());
    if conversation.is_empty() {
        println!("{}\n", style("(empty)").dim());
        return;
    }
    for turn in conversation.newest_first() {
        println!("{} {}", style("Q:").cyan().bold(), turn.question);
        println!("{} {}\n", style("A:").green().bold(), format_answer(&turn.answer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_answer_unchanged() {
        assert_eq!(format_answer("There are 3 customers."), "There are 3 customers.");
        assert_eq!(format_answer("[1, 2]"), "[1, 2]");
        assert_eq!(format_answer("[]"), "[]");
    }

    #[test]
    fn test_rows_become_table() {
        let rendered = format_answer(r#"[{"customer":"Ana","balance":320},{"customer":"Bartholomew","vip":null}]"#);
        assert_eq!(
            rendered,
            "customer    | balance | vip\n\
             ------------+---------+----\n\
             Ana         | 320     |\n\
             Bartholomew |         |"
        );
    }
}
