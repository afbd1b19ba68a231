//! Pre-execution script validation.
//!
//! Cheap line-level checks that catch the common authoring mistakes before
//! translation runs. All checks work on a copy of the line with string
//! literals and trailing comments blanked out, so text inside quotes never
//! trips a structural rule.

use regex::Regex;

use crate::diagnostics::Diagnostic;

/// Identifiers that are keywords or drawing namespaces in Pine and cannot
/// be bound on the left-hand side of an assignment.
const RESERVED: [&str; 13] = [
    "catch", "class", "do", "ellipse", "in", "is", "polygon", "range", "return", "struct",
    "text", "throw", "try",
];

/// Validate a script. Deterministic: equal input yields equal diagnostics.
pub fn validate_script(source: &str) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    if !source.lines().any(|l| l.trim_start().starts_with("//@version")) {
        diags.push(Diagnostic::validation_warning(
            1,
            "Missing version declaration",
            Some("Add '//@version=6' as the first line".to_string()),
        ));
    }

    let assign_re = Regex::new(r"^\s*(?:var\s+|varip\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*:?=[^=]")
        .expect("assignment regex");
    let member_re = Regex::new(r"\b(ta|math|array|str)\.([A-Za-z_][A-Za-z0-9_]*)")
        .expect("member regex");

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_strings_and_comments(raw_line);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        check_brackets(&line, line_no, &mut diags);

        if let Some(caps) = assign_re.captures(&line) {
            let name = &caps[1];
            if RESERVED.contains(&name) {
                diags.push(Diagnostic::validation_error(
                    line_no,
                    format!("'{name}' is a reserved word and cannot be used as a variable name"),
                    Some(format!("Rename the variable, e.g. '{name}Value'")),
                ));
            }
        }

        for caps in member_re.captures_iter(&line) {
            let whole = caps.get(0).expect("whole match");
            let after = line[whole.end()..].trim_start();
            if !after.starts_with('(') {
                let ns = &caps[1];
                let member = &caps[2];
                diags.push(Diagnostic::validation_warning(
                    line_no,
                    format!("'{ns}.{member}' is referenced without being called"),
                    Some(format!("Did you mean '{ns}.{member}(...)'?")),
                ));
            }
        }
    }

    diags
}

/// Blank out string literals (preserving length) and drop `//` comments.
fn strip_strings_and_comments(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                    out.push(' ');
                } else {
                    out.push(' ');
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                    out.push(' ');
                } else if c == '/' && chars.get(i + 1) == Some(&'/') {
                    break;
                } else {
                    out.push(c);
                }
            }
        }
        i += 1;
    }
    out
}

fn check_brackets(line: &str, line_no: usize, diags: &mut Vec<Diagnostic>) {
    for (open, close) in [('(', ')'), ('[', ']')] {
        let opens = line.chars().filter(|c| *c == open).count() as i64;
        let closes = line.chars().filter(|c| *c == close).count() as i64;
        if opens > closes {
            diags.push(Diagnostic::validation_error(
                line_no,
                format!("Unbalanced '{open}': missing closing '{close}'"),
                Some(format!("Add '{close}'")),
            ));
        } else if closes > opens {
            diags.push(Diagnostic::validation_error(
                line_no,
                format!("Unbalanced '{close}': missing opening '{open}'"),
                Some(format!("Add '{open}'")),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;

    #[test]
    fn clean_script_only_passes() {
        let diags = validate_script("//@version=6\nindicator(\"ok\")\nplot(close)\n");
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    }

    #[test]
    fn missing_version_is_a_warning_on_line_one() {
        let diags = validate_script("plot(close)");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].line, 1);
    }

    #[test]
    fn unbalanced_paren_is_an_error_with_suggestion() {
        let diags = validate_script("//@version=6\nplot(ta.sma(close, 14)\n");
        let err = diags
            .iter()
            .find(|d| d.severity == Severity::Error)
            .expect("expected error");
        assert_eq!(err.line, 2);
        assert_eq!(err.suggestion.as_deref(), Some("Add ')'"));
    }

    #[test]
    fn reserved_word_assignment_is_rejected() {
        let diags = validate_script("//@version=6\nrange = high - low\n");
        assert!(diags
            .iter()
            .any(|d| d.severity == Severity::Error && d.message.contains("reserved")));
    }

    #[test]
    fn reserved_word_with_var_prefix_is_rejected() {
        let diags = validate_script("//@version=6\nvar text = close\n");
        assert!(diags.iter().any(|d| d.message.contains("'text'")));
    }

    #[test]
    fn uncalled_namespace_member_warns() {
        let diags = validate_script("//@version=6\nx = ta.sma\n");
        assert!(diags
            .iter()
            .any(|d| d.severity == Severity::Warning && d.message.contains("ta.sma")));
    }

    #[test]
    fn strings_do_not_trip_structural_checks() {
        let diags = validate_script("//@version=6\nplot(close, \"(unbalanced [text\")\n");
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    }

    #[test]
    fn validation_is_deterministic() {
        let src = "plot(ta.sma(close, 14)\nrange = 1\n";
        assert_eq!(validate_script(src), validate_script(src));
    }
}
