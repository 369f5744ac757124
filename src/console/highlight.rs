use crossterm::style::Stylize;

const KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "JOIN", "INNER", "LEFT", "RIGHT", "OUTER",
    "ON", "GROUP", "BY", "HAVING", "ORDER", "ASC", "DESC", "LIMIT", "OFFSET", "AS", "DISTINCT",
    "COUNT", "SUM", "AVG", "MIN", "MAX", "NULL", "IS", "IN", "LIKE", "BETWEEN", "CASE", "WHEN",
    "THEN", "ELSE", "END", "TRUE", "FALSE", "CROSS", "WITH", "UNION", "ALL", "INTERSECT",
    "EXCEPT", "EXISTS", "ONLY", "PRAGMA", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE",
    "ECSQLOPTIONS", "RECURSIVE",
];

/// Colors one line of ECSql for the terminal.
pub fn highlight_sql_line(line: &str) -> String {
    let mut out = String::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut string_char = ' ';

    for c in line.chars() {
        if in_string {
            current.push(c);
            if c == string_char {
                out.push_str(&current.as_str().green().to_string());
                current.clear();
                in_string = false;
            }
        } else if c == '\'' || c == '"' {
            flush_word(&mut out, &mut current);
            current.push(c);
            in_string = true;
            string_char = c;
        } else if c.is_alphanumeric() || c == '_' || c == '.' {
            current.push(c);
        } else {
            flush_word(&mut out, &mut current);
            let s = c.to_string();
            let styled = match c {
                '(' | ')' | ',' | ';' => s.yellow().to_string(),
                '=' | '<' | '>' | '!' | '+' | '-' | '*' | '/' | '%' => s.magenta().to_string(),
                _ => s,
            };
            out.push_str(&styled);
        }
    }

    if in_string {
        out.push_str(&current.as_str().green().to_string());
    } else {
        flush_word(&mut out, &mut current);
    }
    out
}

fn flush_word(out: &mut String, word: &mut String) {
    if word.is_empty() {
        return;
    }
    let upper = word.to_uppercase();
    let styled = if KEYWORDS.contains(&upper.as_str()) {
        word.as_str().blue().bold().to_string()
    } else if word.chars().all(|c| c.is_ascii_digit() || c == '.') {
        word.as_str().cyan().to_string()
    } else {
        word.clone()
    };
    out.push_str(&styled);
    word.clear();
}

/// Colors one line of pretty-printed JSON. Works on clipped fragments too.
pub fn highlight_json_line(line: &str) -> String {
    let mut out = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                let mut literal = String::from('"');
                let mut escaped = false;
                for n in chars.by_ref() {
                    literal.push(n);
                    if escaped {
                        escaped = false;
                    } else if n == '\\' {
                        escaped = true;
                    } else if n == '"' {
                        break;
                    }
                }
                let is_key = chars.peek() == Some(&':');
                let styled = if is_key {
                    literal.as_str().cyan().to_string()
                } else {
                    literal.as_str().green().to_string()
                };
                out.push_str(&styled);
            }
            c if c == '-' || c.is_ascii_digit() => {
                let mut number = String::from(c);
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_digit() || matches!(n, '.' | 'e' | 'E' | '+' | '-') {
                        number.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(&number.as_str().yellow().to_string());
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphabetic() {
                        word.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(&word.as_str().magenta().to_string());
            }
            other => out.push(other),
        }
    }
    out
}

/// Removes ANSI escape sequences, leaving the visible text.
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            for n in chars.by_ref() {
                if n.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_highlight_keeps_text() {
        let line = "SELECT e.ECInstanceId, 'it''s' FROM bis.Element e WHERE e.Id > 10;";
        let out = highlight_sql_line(line);
        assert_ne!(out, line);
        assert_eq!(strip_ansi(&out), line);
    }

    #[test]
    fn test_keywords_are_styled() {
        let out = highlight_sql_line("select 1");
        assert!(out.contains('\u{1b}'));
        assert!(strip_ansi(&out).starts_with("select"));
    }

    #[test]
    fn test_json_highlight_keeps_text() {
        for line in ["{", "  \"name\": \"a \\\"quoted\\\" value\",", "  \"n\": -1.5e3,", "  \"ok\": true", "}"] {
            assert_eq!(strip_ansi(&highlight_json_line(line)), line);
        }
    }

    #[test]
    fn test_json_highlight_on_clipped_fragment() {
        let fragment = "  \"unterminated";
        assert_eq!(strip_ansi(&highlight_json_line(fragment)), fragment);
    }

    #[test]
    fn test_strip_ansi_plain_text() {
        assert_eq!(strip_ansi("plain"), "plain");
    }
}
