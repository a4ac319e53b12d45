//! Parenthesis-aware splitting of expression lists and expression chains.

/// Split a list of search expressions on commas and whitespace.
///
/// Separators inside parentheses never split, and whitespace directly in
/// front of an opening parenthesis keeps an argument list attached to the
/// token before it. Pieces are trimmed and empty pieces are dropped.
///
/// ```
/// use searchgrid_core::expression::split_expressions;
///
/// assert_eq!(split_expressions("a,b (c,d)"), vec!["a", "b (c,d)"]);
/// ```
pub fn split_expressions(expressions: &str) -> Vec<String> {
    let chars: Vec<char> = expressions.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => flush(&mut current, &mut parts),
            c if c.is_whitespace() && depth == 0 => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if next == Some(&'(') && !current.trim().is_empty() {
                    current.push(c);
                } else {
                    flush(&mut current, &mut parts);
                }
            }
            _ => current.push(c),
        }
    }
    flush(&mut current, &mut parts);

    parts
}

fn flush(current: &mut String, parts: &mut Vec<String>) {
    let piece = current.trim();
    if !piece.is_empty() {
        parts.push(piece.to_string());
    }
    current.clear();
}

/// Split one expression into its separator-joined segments.
///
/// Separators inside parentheses are kept. Segments are neither trimmed nor
/// filtered, so `"a::b"` yields an empty middle segment.
pub fn split_segments(expression: &str, separator: char) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in expression.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                segments.push(&expression[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    segments.push(&expression[start..]);

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_on_comma_and_whitespace() {
        assert_eq!(split_expressions("a,b c\td"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_split_keeps_parenthesized_arguments() {
        assert_eq!(split_expressions("a,b (c,d)"), vec!["a", "b (c,d)"]);
        assert_eq!(
            split_expressions("@widgetVar(dlg) @(.ui-panel, .ui-dialog)"),
            vec!["@widgetVar(dlg)", "@(.ui-panel, .ui-dialog)"]
        );
    }

    #[test]
    fn test_split_drops_empty_pieces() {
        assert_eq!(split_expressions(" a ,, b ,"), vec!["a", "b"]);
        assert!(split_expressions("").is_empty());
        assert!(split_expressions("  , ").is_empty());
    }

    #[test]
    fn test_split_leading_argument_list_stands_alone() {
        assert_eq!(split_expressions("a, (b c)"), vec!["a", "(b c)"]);
    }

    #[test]
    fn test_split_is_idempotent_on_tokens() {
        let input = "form:name, @parent:@child(0) @widgetVar(x)  b (c,d) ,@(.a .b)";
        for token in split_expressions(input) {
            assert_eq!(split_expressions(&token), vec![token.clone()]);
        }
    }

    #[test]
    fn test_split_unbalanced_parentheses() {
        assert_eq!(split_expressions("a) b"), vec!["a)", "b"]);
        assert_eq!(split_expressions("(a b"), vec!["(a b"]);
    }

    #[test]
    fn test_segments() {
        assert_eq!(split_segments("@parent:@parent", ':'), vec!["@parent", "@parent"]);
        assert_eq!(split_segments("a", ':'), vec!["a"]);
        assert_eq!(split_segments("a::b", ':'), vec!["a", "", "b"]);
        assert_eq!(split_segments(":a", ':'), vec!["", "a"]);
    }

    #[test]
    fn test_segments_ignore_separator_in_parentheses() {
        assert_eq!(
            split_segments("@form:@(form:btn):@child(1)", ':'),
            vec!["@form", "@(form:btn)", "@child(1)"]
        );
    }
}
