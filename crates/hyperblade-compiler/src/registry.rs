//! Handler metadata.
//!
//! Macros call static methods and tags construct components, and both are
//! checked against declared signatures before any code is generated. The
//! registry is the table of those declarations: handler path, constructor
//! parameters, method parameters.

use crate::error::{CompileError, CompileResult};
use hyperblade_syntax::names::{canonical_path, is_word_char};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;

/// Namespace of the runtime shipped with hyperblade.
pub const RUNTIME_NAMESPACE: &str = "hyperblade";

/// The generic markup component that promoted tags compile to.
pub const HTML_HANDLER: &str = "hyperblade\\Html";

/// Parameters every component constructor takes: attribute map, content
/// and the calling scope.
pub const COMPONENT_PARAMS: [&str; 3] = ["attrs", "content", "scope"];

/// A declared parameter. Written as `name`, or `name?` when optional.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Param {
    pub name: SmolStr,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid parameter declaration `{0}`")]
pub struct InvalidParam(pub String);

impl FromStr for Param {
    type Err = InvalidParam;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (name, optional) = match trimmed.strip_suffix('?') {
            Some(name) => (name, true),
            None => (trimmed, false),
        };
        let name = name.strip_prefix('$').unwrap_or(name);
        if name.is_empty() || !name.chars().all(is_word_char) {
            return Err(InvalidParam(s.to_string()));
        }
        Ok(Self {
            name: name.into(),
            optional,
        })
    }
}

impl TryFrom<String> for Param {
    type Error = InvalidParam;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Param> for String {
    fn from(param: Param) -> Self {
        param.to_string()
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, if self.optional { "?" } else { "" })
    }
}

/// An ordered parameter list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Signature(pub Vec<Param>);

impl Signature {
    /// Build a signature from declarations like `["name", "greeting?"]`.
    ///
    /// Invalid declarations are a programming error in the caller's static
    /// table, so they are reported rather than skipped.
    pub fn parse<'a>(params: impl IntoIterator<Item = &'a str>) -> Result<Self, InvalidParam> {
        params
            .into_iter()
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Total number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of parameters a call must supply.
    pub fn required(&self) -> usize {
        self.0.iter().filter(|p| !p.optional).count()
    }

    /// Whether a call passing `count` arguments can bind every parameter.
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.required() && count <= self.len()
    }
}

/// Declarations for one handler type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct HandlerInfo {
    /// Canonical path, `\` separated. Filled from the manifest key.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub path: String,
    /// Constructor parameters; `None` for handlers that are never
    /// instantiated.
    pub constructor: Option<Signature>,
    /// Static methods callable as macros.
    pub methods: IndexMap<SmolStr, Signature>,
}

impl HandlerInfo {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Declare a component constructor with the canonical three parameters.
    pub fn component(path: impl Into<String>) -> Self {
        Self::new(path).with_constructor(Signature(
            COMPONENT_PARAMS
                .iter()
                .map(|name| Param {
                    name: SmolStr::new_static(name),
                    optional: false,
                })
                .collect(),
        ))
    }

    pub fn with_constructor(mut self, signature: Signature) -> Self {
        self.constructor = Some(signature);
        self
    }

    pub fn with_method(mut self, name: impl Into<SmolStr>, signature: Signature) -> Self {
        self.methods.insert(name.into(), signature);
        self
    }

    /// Look up a method. Method names are matched case-insensitively.
    pub fn method(&self, name: &str) -> Option<&Signature> {
        self.methods
            .get(name)
            .or_else(|| {
                self.methods
                    .iter()
                    .find(|(declared, _)| declared.eq_ignore_ascii_case(name))
                    .map(|(_, signature)| signature)
            })
    }
}

/// The table of known handlers, keyed by case-folded canonical path.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: FxHashMap<String, HandlerInfo>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the runtime's own handlers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.insert(HandlerInfo::component(HTML_HANDLER));
        registry
    }

    /// Register a handler, replacing an earlier declaration of the same
    /// path. Fails when the path is not a valid handler path.
    pub fn register(&mut self, mut info: HandlerInfo) -> CompileResult<()> {
        info.path = canonical_path(&info.path).ok_or_else(|| CompileError::invalid_target(&info.path))?;
        self.insert(info);
        Ok(())
    }

    /// Register every entry of a `path -> declarations` manifest.
    pub fn extend_from_manifest(
        &mut self,
        manifest: impl IntoIterator<Item = (String, HandlerInfo)>,
    ) -> CompileResult<()> {
        for (path, mut info) in manifest {
            info.path = path;
            self.register(info)?;
        }
        Ok(())
    }

    fn insert(&mut self, info: HandlerInfo) {
        self.handlers.insert(info.path.to_lowercase(), info);
    }

    /// Find a handler by path; any accepted separator works.
    pub fn get(&self, path: &str) -> Option<&HandlerInfo> {
        let canonical = canonical_path(path)?;
        self.handlers.get(&canonical.to_lowercase())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandlerInfo> {
        self.handlers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_param_declarations() {
        let signature = Signature::parse(["name", "$greeting?", "suffix?"]).unwrap();
        assert_eq!(signature.len(), 3);
        assert_eq!(signature.required(), 1);
        assert!(signature.accepts(1));
        assert!(signature.accepts(3));
        assert!(!signature.accepts(0));
        assert!(!signature.accepts(4));
        assert_eq!(signature.0[1].to_string(), "greeting?");
        assert!(Signature::parse(["bad name"]).is_err());
        assert!(Signature::parse(["?"]).is_err());
    }

    #[test]
    fn test_builtins() {
        let registry = HandlerRegistry::with_builtins();
        let html = registry.get("\\hyperblade\\Html").unwrap();
        assert_eq!(html.path, HTML_HANDLER);
        assert_eq!(html.constructor.as_ref().map(Signature::len), Some(3));
    }

    #[test]
    fn test_lookup_is_separator_and_case_insensitive() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(
                HandlerInfo::new("my/neat/Util")
                    .with_method("greetUser", Signature::parse(["name"]).unwrap()),
            )
            .unwrap();
        let util = registry.get("My\\Neat\\util").unwrap();
        assert_eq!(util.path, "my\\neat\\Util");
        assert_eq!(util.method("greetuser").map(Signature::required), Some(1));
        assert!(util.method("missing").is_none());
        assert!(registry.contains("my.neat.Util"));
        assert!(!registry.contains("my\\neat"));
    }

    #[test]
    fn test_register_rejects_invalid_paths() {
        let mut registry = HandlerRegistry::new();
        let err = registry.register(HandlerInfo::new("not a path")).unwrap_err();
        assert_eq!(err.kind, crate::CompileErrorKind::InvalidTarget);
        assert!(registry.is_empty());
    }
}
