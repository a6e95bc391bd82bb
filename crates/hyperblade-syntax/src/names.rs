//! Identifier helpers: character classes, case conversions, alias keys
//! and handler paths.

/// A word character (`\w`).
#[inline]
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A character allowed in dash-case names (`[\w-]`).
#[inline]
pub fn is_name_char(c: char) -> bool {
    is_word_char(c) || c == '-'
}

/// Convert a dash/underscore separated name to UpperCamel case.
///
/// `super-field` becomes `SuperField`; letters already upper-case inside a
/// word are kept.
pub fn studly(name: &str) -> String {
    name.split(|c: char| matches!(c, '-' | '_' | ' '))
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Convert a dash/underscore separated name to lowerCamel case.
pub fn camel(name: &str) -> String {
    let studly = studly(name);
    let mut chars = studly.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Upper-case the first character.
pub fn ucfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Registry key for an alias: case-insensitive and dash-insensitive.
pub fn alias_key(alias: &str) -> String {
    alias.chars().filter(|&c| c != '-').flat_map(char::to_lowercase).collect()
}

/// Canonical separator of handler paths.
pub const PATH_SEPARATOR: char = '\\';

/// Validate a handler path and canonicalize its separators.
///
/// Segments are word characters separated by `\`, `.` or `/`; the result
/// always uses `\` and never starts with a separator. Returns `None` when
/// the grammar is not met.
pub fn canonical_path(path: &str) -> Option<String> {
    let trimmed = path.trim().trim_start_matches(PATH_SEPARATOR);
    if trimmed.is_empty() {
        return None;
    }
    let mut segments = Vec::new();
    for segment in trimmed.split(|c: char| matches!(c, '\\' | '.' | '/')) {
        if segment.is_empty() || !segment.chars().all(is_word_char) {
            return None;
        }
        segments.push(segment);
    }
    Some(segments.join("\\"))
}

/// The last segment of a canonical handler path.
pub fn terminal_segment(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_conversions() {
        assert_eq!(studly("super-field"), "SuperField");
        assert_eq!(studly("field"), "Field");
        assert_eq!(studly("html"), "Html");
        assert_eq!(camel("greet-user"), "greetUser");
        assert_eq!(camel("greetUser"), "greetUser");
        assert_eq!(camel("my_util"), "myUtil");
        assert_eq!(ucfirst("util"), "Util");
    }

    #[test]
    fn test_alias_key_ignores_case_and_dashes() {
        assert_eq!(alias_key("My-Form"), "myform");
        assert_eq!(alias_key("myform"), alias_key("MY-FORM"));
        assert_eq!(alias_key(""), "");
        assert_eq!(alias_key("_h"), "_h");
    }

    #[test]
    fn test_canonical_path() {
        assert_eq!(canonical_path("my\\neat\\Util").as_deref(), Some("my\\neat\\Util"));
        assert_eq!(canonical_path("\\app\\Forms").as_deref(), Some("app\\Forms"));
        assert_eq!(canonical_path("N.Field").as_deref(), Some("N\\Field"));
        assert_eq!(canonical_path("app/forms").as_deref(), Some("app\\forms"));
        assert_eq!(canonical_path("bad-name"), None);
        assert_eq!(canonical_path("a\\\\b"), None);
        assert_eq!(canonical_path(""), None);
        assert_eq!(terminal_segment("my\\neat\\Util"), "Util");
        assert_eq!(terminal_segment("Util"), "Util");
    }
}
