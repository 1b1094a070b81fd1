//! Declarative function metadata
//!
//! A [`FunctionDescriptor`] is the single source for arity checking, usage
//! text and generated documentation.

use crate::dialect::Dialect;
use std::fmt;

/// Module every function belongs to unless it names another one
pub const CORE_MODULE: &str = "core";

/// Documentation grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Math,
    Conversion,
    Logic,
    String,
    Collection,
    Scripting,
    Security,
    System,
    Cache,
    Database,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Math,
        Category::Conversion,
        Category::Logic,
        Category::String,
        Category::Collection,
        Category::Scripting,
        Category::Security,
        Category::System,
        Category::Cache,
        Category::Database,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Math => "math",
            Category::Conversion => "conversion",
            Category::Logic => "logic",
            Category::String => "string",
            Category::Collection => "collection",
            Category::Scripting => "scripting",
            Category::Security => "security",
            Category::System => "system",
            Category::Cache => "cache",
            Category::Database => "database",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted argument count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` means unbounded
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exact(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub const fn any() -> Self {
        Self::at_least(0)
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", max),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// What the dispatcher returns when a required argument is null
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPolicy {
    /// Quietly return `Value::Null`
    #[default]
    ReturnNull,
    /// Quietly return an empty string
    ReturnEmpty,
    /// Log a parameter error and return usage text
    Usage,
}

/// Documented parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub description: String,
    pub optional: bool,
}

/// Immutable metadata of one scripting function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    name: String,
    aliases: Vec<String>,
    category: Category,
    arity: Arity,
    signature: String,
    script_signature: Option<String>,
    summary: String,
    description: Option<String>,
    params: Vec<Param>,
    examples: Vec<String>,
    hidden: bool,
    module: String,
    null_policy: NullPolicy,
}

impl FunctionDescriptor {
    /// Descriptor in the `core` module taking no arguments
    ///
    /// Declare any other arity with [`FunctionDescriptor::arity`].
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            category,
            arity: Arity::exact(0),
            signature: String::new(),
            script_signature: None,
            summary: String::new(),
            description: None,
            params: Vec::new(),
            examples: Vec::new(),
            hidden: false,
            module: CORE_MODULE.to_string(),
            null_policy: NullPolicy::default(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    /// Argument list shown in usage text, e.g. `value, decimals`
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Script-dialect argument list when it differs from the template one
    pub fn script_signature(mut self, signature: impl Into<String>) -> Self {
        self.script_signature = Some(signature.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            description: description.into(),
            optional: false,
        });
        self
    }

    pub fn optional_param(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.params.push(Param {
            name: name.into(),
            description: description.into(),
            optional: true,
        });
        self
    }

    /// Example argument list; the first one is used in usage text
    pub fn example(mut self, args: impl Into<String>) -> Self {
        self.examples.push(args.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Canonical name followed by aliases
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn declared_arity(&self) -> Arity {
        self.arity
    }

    pub fn signature_for(&self, dialect: Dialect) -> &str {
        match (dialect, &self.script_signature) {
            (Dialect::Script, Some(signature)) => signature,
            _ => &self.signature,
        }
    }

    pub fn short_description(&self) -> &str {
        &self.summary
    }

    /// Long description, falling back to the summary
    pub fn long_description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.summary)
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn required_module(&self) -> &str {
        &self.module
    }

    pub fn null_handling(&self) -> NullPolicy {
        self.null_policy
    }

    /// Copy describing the unlicensed stand-in for this function
    pub(crate) fn as_placeholder(&self) -> Self {
        let mut placeholder = self.clone();
        placeholder.hidden = true;
        placeholder.arity = Arity::any();
        placeholder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_accepts() {
        assert!(Arity::exact(2).accepts(2));
        assert!(!Arity::exact(2).accepts(1));
        assert!(!Arity::exact(2).accepts(3));
        assert!(Arity::range(1, 3).accepts(3));
        assert!(Arity::at_least(1).accepts(100));
        assert!(!Arity::at_least(1).accepts(0));
        assert!(Arity::any().accepts(0));
    }

    #[test]
    fn test_arity_display() {
        assert_eq!(Arity::exact(2).to_string(), "2");
        assert_eq!(Arity::range(1, 2).to_string(), "1 to 2");
        assert_eq!(Arity::at_least(1).to_string(), "at least 1");
    }

    #[test]
    fn test_descriptor_defaults() {
        let d = FunctionDescriptor::new("upper", Category::String);
        assert_eq!(d.declared_arity(), Arity::exact(0));
        assert_eq!(d.required_module(), CORE_MODULE);
        assert_eq!(d.null_handling(), NullPolicy::ReturnNull);
        assert!(!d.is_hidden());
        assert_eq!(d.long_description(), "");
    }

    #[test]
    fn test_script_signature_fallback() {
        let d = FunctionDescriptor::new("find", Category::Database)
            .signature("type, key, value")
            .script_signature("type, predicate");
        assert_eq!(d.signature_for(Dialect::Template), "type, key, value");
        assert_eq!(d.signature_for(Dialect::Script), "type, predicate");

        let plain = FunctionDescriptor::new("size", Category::Collection).signature("collection");
        assert_eq!(plain.signature_for(Dialect::Script), "collection");
    }

    #[test]
    fn test_names_include_aliases() {
        let d = FunctionDescriptor::new("mod", Category::Math).alias("modulo");
        assert_eq!(d.names().collect::<Vec<_>>(), vec!["mod", "modulo"]);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("Math"), Some(Category::Math));
        assert_eq!(Category::parse("nope"), None);
    }
}
