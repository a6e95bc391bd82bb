//! Marker configuration shared by scanners and code generation.

/// The markers that delimit hyperblade constructs and host-engine code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct Syntax {
    /// Marker that begins a macro (`@@`).
    pub macro_prefix: String,
    /// Characters that may separate a macro alias from its method.
    pub alias_delimiters: Vec<char>,
    /// Marker that opens a block macro body.
    pub body_start: char,
    /// Keyword that follows the macro prefix on a block macro's closing tag.
    pub end_keyword: String,
    /// Host engine echo delimiters.
    pub content_tags: (String, String),
    /// Host engine raw echo delimiters.
    pub raw_tags: (String, String),
    /// Opening marker of generated host-language code.
    pub code_open: String,
}

impl Default for Syntax {
    fn default() -> Self {
        Self {
            macro_prefix: "@@".into(),
            alias_delimiters: vec![':', '.'],
            body_start: ':',
            end_keyword: "end".into(),
            content_tags: ("{{".into(), "}}".into()),
            raw_tags: ("{!!".into(), "!!}".into()),
            code_open: "<?".into(),
        }
    }
}

impl Syntax {
    pub fn is_alias_delimiter(&self, c: char) -> bool {
        self.alias_delimiters.contains(&c)
    }

    /// Whether `text` carries code the host engine must execute: either
    /// already-generated code or echo delimiters still to be compiled.
    pub fn is_dynamic(&self, text: &str) -> bool {
        text.contains(self.code_open.as_str())
            || text.contains(self.content_tags.0.as_str())
            || text.contains(self.raw_tags.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_dynamic() {
        let syntax = Syntax::default();
        assert!(!syntax.is_dynamic("<b>plain</b>"));
        assert!(syntax.is_dynamic("hello {{ $name }}"));
        assert!(syntax.is_dynamic("{!! $html !!}"));
        assert!(syntax.is_dynamic("<?php echo 1 ?>"));
    }
}
