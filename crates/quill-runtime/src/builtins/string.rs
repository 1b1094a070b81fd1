//! String manipulation, encoding and hashing
//!
//! Positions and lengths count Unicode scalar values, not bytes. Functions
//! that produce text return an empty string for a null input.

use super::{arg, integer, native, optional};
use crate::context::ActionContext;
use crate::convert::{self, CoercionError};
use crate::error::{ArgumentError, RegistryError, RuntimeError};
use crate::function::validate::{require_kinds, require_non_null, require_non_null_at};
use crate::function::{Arity, Category, FunctionDescriptor, Kind, NativeFunction, NullPolicy};
use crate::value::Value;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngExt;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Upper bound for `random()`
const MAX_RANDOM_LENGTH: i64 = 4096;

const RANDOM_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Descriptor for a text function returning `""` on null input
fn text_fn(name: &str, signature: &str, summary: &str, example: &str) -> FunctionDescriptor {
    FunctionDescriptor::new(name, Category::String)
        .arity(Arity::exact(1))
        .signature(signature)
        .summary(summary)
        .example(example)
        .null_policy(NullPolicy::ReturnEmpty)
}

/// Exact-arity text-to-text function
fn map_text(
    descriptor: FunctionDescriptor,
    op: fn(&str) -> String,
) -> Result<NativeFunction, RegistryError> {
    native(descriptor, move |_: &mut ActionContext, _: &Value, args: &[Value]| {
        require_non_null(args)?;
        Ok(Value::string(op(&args[0].to_string())))
    })
}

pub fn functions() -> Result<Vec<NativeFunction>, RegistryError> {
    Ok(vec![
        map_text(
            text_fn("upper", "string", "Converts a string to upper case", "\"hello\""),
            |s| s.to_uppercase(),
        )?,
        map_text(
            text_fn("lower", "string", "Converts a string to lower case", "\"HELLO\""),
            |s| s.to_lowercase(),
        )?,
        map_text(
            text_fn("trim", "string", "Removes leading and trailing whitespace", "\"  hello  \""),
            |s| s.trim().to_string(),
        )?,
        native(
            FunctionDescriptor::new("concat", Category::String)
                .arity(Arity::at_least(1))
                .signature("values...")
                .summary("Concatenates values into one string")
                .description("Null values are skipped and collections contribute their elements.")
                .example("\"Hello\", \" \", \"World\""),
            |_, _, args| Ok(Value::string(concat(args))),
        )?,
        native(
            FunctionDescriptor::new("split", Category::String)
                .arity(Arity::range(1, 2))
                .signature("string [, separator ]")
                .summary("Splits a string into a list")
                .description(
                    "Without a separator the string is split on commas, semicolons and \
                     whitespace. An empty separator splits into characters.",
                )
                .param("string", "Text to split")
                .optional_param("separator", "Literal separator")
                .example("\"a,b,c\""),
            split,
        )?,
        native(
            FunctionDescriptor::new("join", Category::String)
                .arity(Arity::exact(2))
                .signature("collection, separator")
                .summary("Joins the elements of a collection into a string")
                .param("collection", "Elements to join; nulls are skipped")
                .param("separator", "Inserted between elements")
                .example("merge(\"a\", \"b\"), \", \"")
                .null_policy(NullPolicy::ReturnEmpty),
            join,
        )?,
        native(
            FunctionDescriptor::new("substring", Category::String)
                .arity(Arity::range(2, 3))
                .signature("string, start [, length ]")
                .summary("Returns part of a string")
                .param("string", "Source text")
                .param("start", "Zero-based start position")
                .optional_param("length", "Number of characters, default to the end")
                .example("\"Hello World\", 6, 5")
                .null_policy(NullPolicy::ReturnEmpty),
            substring,
        )?,
        native(
            FunctionDescriptor::new("length", Category::String)
                .arity(Arity::exact(1))
                .signature("string")
                .summary("Returns the number of characters in a string")
                .example("\"hello\""),
            |_, _, args| {
                require_non_null(args)?;
                Ok(Value::Integer(args[0].to_string().chars().count() as i64))
            },
        )?,
        native(
            FunctionDescriptor::new("starts_with", Category::String)
                .arity(Arity::exact(2))
                .signature("string, prefix")
                .summary("Returns true if the string starts with the prefix")
                .example("\"Hello\", \"He\""),
            |_, _, args| {
                require_non_null(args)?;
                Ok(Value::Bool(args[0].to_string().starts_with(&args[1].to_string())))
            },
        )?,
        native(
            FunctionDescriptor::new("ends_with", Category::String)
                .arity(Arity::exact(2))
                .signature("string, suffix")
                .summary("Returns true if the string ends with the suffix")
                .example("\"Hello\", \"lo\""),
            |_, _, args| {
                require_non_null(args)?;
                Ok(Value::Bool(args[0].to_string().ends_with(&args[1].to_string())))
            },
        )?,
        native(
            FunctionDescriptor::new("contains", Category::String)
                .arity(Arity::exact(2))
                .signature("stringOrCollection, value")
                .summary("Returns true if a string contains a substring or a collection an element")
                .example("\"Hello\", \"ell\""),
            contains,
        )?,
        native(
            FunctionDescriptor::new("index_of", Category::String)
                .arity(Arity::exact(2))
                .signature("string, substring")
                .summary("Returns the position of the first occurrence, or -1")
                .example("\"Hello\", \"l\""),
            index_of,
        )?,
        native(
            FunctionDescriptor::new("abbr", Category::String)
                .arity(Arity::exact(2))
                .signature("string, maxLength")
                .summary("Abbreviates a string to at most maxLength characters plus an ellipsis")
                .description("The cut is moved back to the last word boundary when there is one.")
                .example("\"A rather long sentence\", 10")
                .null_policy(NullPolicy::ReturnEmpty),
            abbr,
        )?,
        map_text(
            text_fn("capitalize", "string", "Upper-cases the first character", "\"hello\""),
            capitalize,
        )?,
        native(
            FunctionDescriptor::new("titleize", Category::String)
                .arity(Arity::range(1, 2))
                .signature("string [, separator ]")
                .summary("Capitalizes every word")
                .optional_param("separator", "Word separator, default a space")
                .example("\"hello big world\"")
                .null_policy(NullPolicy::ReturnEmpty),
            titleize,
        )?,
        native(
            FunctionDescriptor::new("replace_all", Category::String)
                .arity(Arity::exact(3))
                .signature("string, search, replacement")
                .summary("Replaces every literal occurrence of search")
                .example("\"a-b-c\", \"-\", \"+\"")
                .null_policy(NullPolicy::ReturnEmpty),
            |_, _, args| {
                require_non_null_at(args, 0)?;
                require_non_null_at(args, 1)?;
                let replacement = optional(args, 2).map(Value::to_string).unwrap_or_default();
                Ok(Value::string(
                    args[0].to_string().replace(&args[1].to_string(), &replacement),
                ))
            },
        )?,
        native(
            FunctionDescriptor::new("regex_replace", Category::String)
                .arity(Arity::exact(3))
                .signature("string, pattern, replacement")
                .summary("Replaces every match of a regular expression")
                .description("The replacement may refer to groups as $1 or ${name}.")
                .example("\"a1b22\", \"[0-9]+\", \"#\"")
                .null_policy(NullPolicy::ReturnEmpty),
            regex_replace,
        )?,
        native(
            FunctionDescriptor::new("matches", Category::String)
                .arity(Arity::exact(2))
                .signature("string, pattern")
                .summary("Returns true if the whole string matches the regular expression")
                .example("\"abc123\", \"[a-z]+[0-9]+\""),
            |_, _, args| {
                require_non_null(args)?;
                let regex = compile(&format!("^(?:{})$", args[1]), &args[1].to_string())?;
                Ok(Value::Bool(regex.is_match(&args[0].to_string())))
            },
        )?,
        native(
            FunctionDescriptor::new("random", Category::String)
                .arity(Arity::exact(1))
                .signature("length")
                .summary("Returns a random alphanumeric string")
                .example("8"),
            random,
        )?,
        map_text(
            text_fn("urlencode", "string", "Percent-encodes a string for use in a URL", "\"a b&c\""),
            |s| urlencoding::encode(s).into_owned(),
        )?,
        map_text(
            text_fn("base64encode", "string", "Encodes a string as base64", "\"hello\""),
            |s| STANDARD.encode(s.as_bytes()),
        )?,
        native(
            text_fn("base64decode", "base64", "Decodes base64 into a UTF-8 string", "\"aGVsbG8=\""),
            base64decode,
        )?,
        map_text(
            text_fn("md5", "string", "Returns the hex MD5 digest of a string", "\"hello\""),
            |s| format!("{:x}", md5::compute(s.as_bytes())),
        )?,
        map_text(
            text_fn("sha256", "string", "Returns the hex SHA-256 digest of a string", "\"hello\""),
            |s| format!("{:x}", Sha256::digest(s.as_bytes())),
        )?,
    ])
}

// ============================================================================
// Implementations
// ============================================================================

fn concat(args: &[Value]) -> String {
    let mut out = String::new();
    for value in args {
        match convert::to_sequence(value) {
            Some(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    out.push_str(&item.to_string());
                }
            }
            None if value.is_null() => {}
            None => out.push_str(&value.to_string()),
        }
    }
    out
}

fn split(_ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    let text = args[0].to_string();
    let parts: Vec<Value> = match optional(args, 1) {
        Some(separator) => {
            let separator = separator.to_string();
            if separator.is_empty() {
                text.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                text.split(separator.as_str()).map(Value::from).collect()
            }
        }
        None => text
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(Value::from)
            .collect(),
    };
    Ok(Value::list(parts))
}

fn join(_ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_kinds(args, &[Kind::Collection])?;
    let separator = optional(args, 1).map(Value::to_string).unwrap_or_default();
    let items = convert::to_sequence(&args[0]).unwrap_or_default();
    let parts: Vec<String> = items
        .iter()
        .filter(|v| !v.is_null())
        .map(Value::to_string)
        .collect();
    Ok(Value::string(parts.join(&separator)))
}

fn substring(
    ctx: &mut ActionContext,
    _caller: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    require_non_null_at(args, 1)?;
    let text = args[0].to_string();
    let total = text.chars().count();
    let start = integer(ctx, &args[1])?.clamp(0, total as i64) as usize;
    let length = match optional(args, 2) {
        Some(value) => integer(ctx, value)?.max(0) as usize,
        None => total - start,
    };
    Ok(Value::string(text.chars().skip(start).take(length).collect::<String>()))
}

fn contains(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    let found = match convert::to_sequence(&args[0]) {
        Some(items) => items
            .iter()
            .any(|item| super::logic::values_equal(item, &args[1], ctx.locale())),
        None => {
            require_non_null_at(args, 1)?;
            args[0].to_string().contains(&args[1].to_string())
        }
    };
    Ok(Value::Bool(found))
}

fn index_of(_ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let text = args[0].to_string();
    let needle = args[1].to_string();
    let position = text
        .find(&needle)
        .map(|byte| text[..byte].chars().count() as i64)
        .unwrap_or(-1);
    Ok(Value::Integer(position))
}

fn abbr(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let text = args[0].to_string();
    let max = integer(ctx, &args[1])?.max(0) as usize;
    if text.chars().count() <= max {
        return Ok(Value::string(text));
    }
    let head: String = text.chars().take(max).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(boundary) if boundary > 0 => head[..boundary].trim_end().to_string(),
        _ => head,
    };
    Ok(Value::string(format!("{}…", cut)))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn titleize(_ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    let separator = optional(args, 1)
        .map(Value::to_string)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| " ".to_string());
    let words: Vec<String> = args[0]
        .to_string()
        .split(separator.as_str())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect();
    Ok(Value::string(words.join(" ")))
}

fn compile(pattern: &str, shown: &str) -> Result<Regex, CoercionError> {
    Regex::new(pattern).map_err(|e| CoercionError::InvalidPattern {
        pattern: shown.to_string(),
        reason: e.to_string(),
    })
}

fn regex_replace(
    _ctx: &mut ActionContext,
    _caller: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    require_non_null_at(args, 1)?;
    let pattern = args[1].to_string();
    let regex = compile(&pattern, &pattern)?;
    let replacement = optional(args, 2).map(Value::to_string).unwrap_or_default();
    Ok(Value::string(
        regex
            .replace_all(&args[0].to_string(), replacement.as_str())
            .into_owned(),
    ))
}

fn random(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let length = integer(ctx, &args[0])?;
    if !(0..=MAX_RANDOM_LENGTH).contains(&length) {
        return Err(ArgumentError::Type {
            index: 0,
            expected: format!("length 0..={}", MAX_RANDOM_LENGTH),
            actual: length.to_string(),
        }
        .into());
    }
    let mut rng = rand::rng();
    let text: String = (0..length)
        .map(|_| RANDOM_CHARSET[rng.random_range(0..RANDOM_CHARSET.len())] as char)
        .collect();
    Ok(Value::string(text))
}

fn base64decode(
    _ctx: &mut ActionContext,
    _caller: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let bytes = STANDARD
        .decode(arg(args, 0).to_string().trim())
        .map_err(|e| CoercionError::Encoding(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|e| CoercionError::Encoding(e.to_string()))?;
    Ok(Value::string(text))
}

#[cfg(test)]
mod tests {
    use crate::builtins::test_support::{context, eval};
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("upper", "Hello", "HELLO")]
    #[case("lower", "Hello", "hello")]
    #[case("trim", "  x  ", "x")]
    #[case("capitalize", "élan vital", "Élan vital")]
    #[case("urlencode", "a b&c", "a%20b%26c")]
    #[case("base64encode", "hello", "aGVsbG8=")]
    #[case("base64decode", "aGVsbG8=", "hello")]
    #[case("md5", "hello", "5d41402abc4b2a76b9719d911017c592")]
    #[case(
        "sha256",
        "hello",
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    )]
    fn test_text_functions(#[case] name: &str, #[case] input: &str, #[case] expected: &str) {
        let mut ctx = context();
        assert_eq!(eval(&mut ctx, name, &[Value::from(input)]), Value::from(expected));
    }

    #[rstest]
    #[case("upper")]
    #[case("trim")]
    #[case("md5")]
    fn test_null_input_returns_empty(#[case] name: &str) {
        let mut ctx = context();
        assert_eq!(eval(&mut ctx, name, &[Value::Null]), Value::from(""));
    }

    #[test]
    fn test_concat_flattens_and_skips_nulls() {
        let mut ctx = context();
        let args = [
            Value::from("a"),
            Value::Null,
            Value::list(vec![Value::Integer(1), Value::Null, Value::Number(2.5)]),
        ];
        assert_eq!(eval(&mut ctx, "concat", &args), Value::from("a12.5"));
    }

    #[test]
    fn test_split_and_join() {
        let mut ctx = context();
        let parts = eval(&mut ctx, "split", &[Value::from("a, b;c  d")]);
        assert_eq!(
            parts,
            Value::list(vec!["a".into(), "b".into(), "c".into(), "d".into()])
        );
        assert_eq!(
            eval(&mut ctx, "split", &[Value::from("a--b"), Value::from("--")]),
            Value::list(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            eval(&mut ctx, "join", &[parts, Value::from("-")]),
            Value::from("a-b-c-d")
        );
        let wrong = eval(&mut ctx, "join", &[Value::from("abc"), Value::from("-")]);
        assert!(wrong.as_str().unwrap().starts_with("Usage: ${join("));
    }

    #[test]
    fn test_substring_counts_characters() {
        let mut ctx = context();
        assert_eq!(
            eval(&mut ctx, "substring", &[Value::from("Hello World"), Value::Integer(6), Value::Integer(5)]),
            Value::from("World")
        );
        assert_eq!(
            eval(&mut ctx, "substring", &[Value::from("naïve"), Value::Integer(2)]),
            Value::from("ïve")
        );
        assert_eq!(
            eval(&mut ctx, "substring", &[Value::from("abc"), Value::Integer(10)]),
            Value::from("")
        );
    }

    #[test]
    fn test_search_functions() {
        let mut ctx = context();
        let hello = Value::from("Hello");
        assert_eq!(
            eval(&mut ctx, "index_of", &[hello.clone(), Value::from("l")]),
            Value::Integer(2)
        );
        assert_eq!(
            eval(&mut ctx, "index_of", &[hello.clone(), Value::from("z")]),
            Value::Integer(-1)
        );
        assert_eq!(
            eval(&mut ctx, "contains", &[hello.clone(), Value::from("ell")]),
            Value::Bool(true)
        );
        let list = Value::list(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(
            eval(&mut ctx, "contains", &[list, Value::from("2")]),
            Value::Bool(true)
        );
        assert_eq!(
            eval(&mut ctx, "starts_with", &[hello.clone(), Value::from("He")]),
            Value::Bool(true)
        );
        assert_eq!(
            eval(&mut ctx, "ends_with", &[hello, Value::from("x")]),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_abbr_and_titleize() {
        let mut ctx = context();
        assert_eq!(
            eval(&mut ctx, "abbr", &[Value::from("A rather long sentence"), Value::Integer(10)]),
            Value::from("A rather…")
        );
        assert_eq!(
            eval(&mut ctx, "abbr", &[Value::from("short"), Value::Integer(10)]),
            Value::from("short")
        );
        assert_eq!(
            eval(&mut ctx, "titleize", &[Value::from("hello big world")]),
            Value::from("Hello Big World")
        );
        assert_eq!(
            eval(&mut ctx, "titleize", &[Value::from("snake_case_name"), Value::from("_")]),
            Value::from("Snake Case Name")
        );
    }

    #[test]
    fn test_regex_functions() {
        let mut ctx = context();
        assert_eq!(
            eval(&mut ctx, "regex_replace", &[Value::from("a1b22"), Value::from("[0-9]+"), Value::from("#")]),
            Value::from("a#b#")
        );
        assert_eq!(
            eval(&mut ctx, "matches", &[Value::from("abc123"), Value::from("[a-z]+[0-9]+")]),
            Value::Bool(true)
        );
        assert_eq!(
            eval(&mut ctx, "matches", &[Value::from("abc123x"), Value::from("[a-z]+[0-9]+")]),
            Value::Bool(false)
        );
        let invalid = eval(&mut ctx, "matches", &[Value::from("x"), Value::from("(")]);
        assert!(invalid.as_str().unwrap().starts_with("Invalid pattern '('"));
    }

    #[test]
    fn test_random_length_and_charset() {
        let mut ctx = context();
        let text = eval(&mut ctx, "random", &[Value::Integer(16)]).to_string();
        assert_eq!(text.len(), 16);
        assert!(text.chars().all(|c| c.is_ascii_alphanumeric()));
        let too_long = eval(&mut ctx, "random", &[Value::Integer(1_000_000)]);
        assert!(too_long.as_str().unwrap().starts_with("Usage: "));
    }

    #[test]
    fn test_base64decode_rejects_garbage() {
        let mut ctx = context();
        let result = eval(&mut ctx, "base64decode", &[Value::from("***")]);
        assert!(result.as_str().unwrap().starts_with("Invalid encoding"));
    }
}
