//! Shell-like argument splitting.
//!
//! Double quotes group words, backslash escapes the next character. Escapes
//! only mean something for whitespace and `"` outside quotes, and for `"` and
//! `\` inside quotes; any other escaped character is kept together with its
//! backslash. Malformed input never fails: an unterminated quote runs to the
//! end of the line and a trailing backslash is kept literally.

/// Split a command remainder into arguments.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for c in input.chars() {
        if escape {
            escape = false;
            let literal = if in_quotes {
                c == '"' || c == '\\'
            } else {
                c == '"' || c.is_whitespace()
            };
            if !literal {
                current.push('\\');
            }
            current.push(c);
            continue;
        }

        match c {
            '\\' => escape = true,
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if escape {
        current.push('\\');
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}
