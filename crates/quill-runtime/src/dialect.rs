//! Calling dialects
//!
//! Functions behave identically in both dialects; only the rendering of usage
//! text differs.

use std::fmt;
use std::str::FromStr;

/// Expression syntax the current evaluation was called from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// Single-brace template expressions: `${upper(name)}`
    #[default]
    Template,
    /// Double-brace script blocks: `${{$.upper(name)}}`
    Script,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Template => "template",
            Dialect::Script => "script",
        }
    }

    /// Wrap a call expression in this dialect's delimiters
    pub fn render_call(self, name: &str, args: &str) -> String {
        match self {
            Dialect::Template => format!("${{{}({})}}", name, args),
            Dialect::Script => format!("${{{{$.{}({})}}}}", name, args),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "template" => Ok(Dialect::Template),
            "script" => Ok(Dialect::Script),
            other => Err(format!("unknown dialect '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_call() {
        assert_eq!(Dialect::Template.render_call("add", "1, 2"), "${add(1, 2)}");
        assert_eq!(Dialect::Script.render_call("add", "1, 2"), "${{$.add(1, 2)}}");
    }

    #[test]
    fn test_parse() {
        assert_eq!("Script".parse::<Dialect>().unwrap(), Dialect::Script);
        assert!("lisp".parse::<Dialect>().is_err());
    }
}
