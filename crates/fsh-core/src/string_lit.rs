//! Literal-string post-processing: escape handling and multiline dedent
//! (spec §4.6).

/// Unescape a single-line quoted string's inner text: `\\` -> `\`, `\"` -> `"`.
/// Any other backslash sequence is passed through verbatim.
#[must_use]
pub fn unescape_single_line(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('\\') => {
                    out.push('\\');
                    chars.next();
                }
                Some('"') => {
                    out.push('"');
                    chars.next();
                }
                _ => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Strip the `"""`-delimited multiline string's surrounding quotes and
/// common leading indentation (spec §4.6):
///
/// 1. Strip the leading and trailing `"""`.
/// 2. Drop a single leading `\n` immediately after the opening quotes.
/// 3. Split into lines; drop a trailing whitespace-only line.
/// 4. Find the minimum indentation `K` among non-blank lines.
/// 5. Strip `K` leading spaces from every line and rejoin with `\n`.
#[must_use]
pub fn dedent_multiline(raw: &str) -> String {
    let inner = raw.strip_prefix("\"\"\"").unwrap_or(raw);
    let inner = inner.strip_suffix("\"\"\"").unwrap_or(inner);
    let inner = inner.strip_prefix('\n').unwrap_or(inner);

    let mut lines: Vec<&str> = inner.split('\n').collect();
    if let Some(last) = lines.last() {
        if last.trim().is_empty() {
            lines.pop();
        }
    }

    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);

    lines
        .into_iter()
        .map(|l| {
            if l.len() >= min_indent {
                &l[min_indent..]
            } else {
                l.trim_start_matches(' ')
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescapes_quotes_and_backslashes() {
        assert_eq!(unescape_single_line(r#"a\"b\\c"#), "a\"b\\c");
    }

    #[test]
    fn unknown_escape_passes_through() {
        assert_eq!(unescape_single_line(r"a\nb"), r"a\nb");
    }

    #[test]
    fn dedents_common_indentation() {
        let raw = "\"\"\"\n  line one\n  line two\n  \"\"\"";
        assert_eq!(dedent_multiline(raw), "line one\nline two");
    }

    #[test]
    fn preserves_relative_indentation() {
        let raw = "\"\"\"\n  outer\n    inner\n  \"\"\"";
        assert_eq!(dedent_multiline(raw), "outer\n  inner");
    }

    #[test]
    fn handles_no_leading_newline() {
        let raw = "\"\"\"single line\"\"\"";
        assert_eq!(dedent_multiline(raw), "single line");
    }
}
