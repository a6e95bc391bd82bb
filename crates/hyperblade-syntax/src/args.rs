//! Argument lists and bracket balancing.
//!
//! Arguments are opaque host-language text. The only structure we care
//! about is bracket nesting and quoted strings, so that commas and closing
//! parentheses inside them are not mistaken for list punctuation.

/// Given the byte offset of an opening `(`, `[` or `{`, return the offset
/// just past its matching closer, or `None` when the group never closes.
pub fn find_group_end(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in source[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `args` on commas that are not nested in brackets or quotes.
pub fn split_top_level(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&args[start..]);
    parts
}

/// Number of arguments a call site passes: 0 for an empty list.
pub fn count_arguments(args: &str) -> usize {
    if args.trim().is_empty() {
        0
    } else {
        split_top_level(args).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_group_end() {
        let source = "@@a.b(f(1, 2), ')') rest";
        assert_eq!(find_group_end(source, 5), Some(19));
        assert_eq!(&source[5..19], "(f(1, 2), ')')");
        assert_eq!(find_group_end("(unclosed", 0), None);
        assert_eq!(find_group_end("(\"a\\\")\")", 0), Some(8));
    }

    #[test]
    fn test_count_arguments() {
        assert_eq!(count_arguments(""), 0);
        assert_eq!(count_arguments("  "), 0);
        assert_eq!(count_arguments("name"), 1);
        assert_eq!(count_arguments("$a, f($b, $c), ['x', 'y']"), 3);
        assert_eq!(count_arguments("'a,b', \"c,d\""), 2);
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a, [b, c]"), vec!["a", " [b, c]"]);
    }
}
