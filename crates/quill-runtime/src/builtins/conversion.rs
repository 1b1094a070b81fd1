//! Number, date and JSON conversions

use super::{arg, integer, locale, native, number, optional};
use crate::context::ActionContext;
use crate::convert::{self, CoercionError};
use crate::error::{RegistryError, RuntimeError};
use crate::function::validate::{require_non_null, require_non_null_at};
use crate::function::{Arity, Category, FunctionDescriptor, NativeFunction};
use crate::locale::Locale;
use crate::value::Value;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub fn functions() -> Result<Vec<NativeFunction>, RegistryError> {
    Ok(vec![
        native(
            FunctionDescriptor::new("num", Category::Conversion)
                .arity(Arity::exact(1))
                .signature("value")
                .summary("Converts a value to a number, or null if it is not numeric")
                .param("value", "Number, numeric string or date")
                .example("\"5.8\""),
            num,
        )?,
        native(
            FunctionDescriptor::new("int", Category::Conversion)
                .arity(Arity::exact(1))
                .signature("value")
                .summary("Converts a value to an integer, or null if it is not numeric")
                .description("Fractional parts are truncated. Dates convert to epoch milliseconds.")
                .param("value", "Number, numeric string or date")
                .example("\"42\""),
            int,
        )?,
        native(
            FunctionDescriptor::new("parse_number", Category::Conversion)
                .arity(Arity::range(1, 2))
                .signature("text [, locale ]")
                .summary("Parses a number using the separators of a locale")
                .param("text", "Numeric text")
                .optional_param("locale", "Locale tag, defaults to the current locale")
                .example("\"1.234,5\", \"de_DE\""),
            parse_number,
        )?,
        native(
            FunctionDescriptor::new("number_format", Category::Conversion)
                .arity(Arity::range(2, 3))
                .signature("value, decimals [, locale ]")
                .summary("Formats a number with grouping and a fixed number of decimals")
                .param("value", "Number to format")
                .param("decimals", "Decimal places")
                .optional_param("locale", "Locale tag, defaults to the current locale")
                .example("1234.5, 2"),
            number_format,
        )?,
        native(
            FunctionDescriptor::new("to_date", Category::Conversion)
                .arity(Arity::exact(1))
                .signature("millis")
                .summary("Converts epoch milliseconds to a date")
                .param("millis", "Milliseconds since 1970-01-01T00:00:00Z")
                .example("1700000000000"),
            to_date,
        )?,
        native(
            FunctionDescriptor::new("date_format", Category::Conversion)
                .arity(Arity::exact(2))
                .signature("date, pattern")
                .summary("Formats a date with a strftime pattern")
                .param("date", "Date, epoch milliseconds or RFC 3339 text")
                .param("pattern", "strftime pattern such as %Y-%m-%d")
                .example("now(), \"%Y-%m-%d\""),
            date_format,
        )?,
        native(
            FunctionDescriptor::new("parse_date", Category::Conversion)
                .arity(Arity::exact(2))
                .signature("text, pattern")
                .summary("Parses text into a date using a strftime pattern")
                .description(
                    "Patterns without a time component yield midnight UTC. Patterns with \
                     an offset are converted to UTC.",
                )
                .param("text", "Date text")
                .param("pattern", "strftime pattern")
                .example("\"2024-03-01\", \"%Y-%m-%d\""),
            parse_date,
        )?,
        native(
            FunctionDescriptor::new("now", Category::Conversion)
                .arity(Arity::exact(0))
                .signature("")
                .summary("Returns the current date and time"),
            |_, _, _| Ok(Value::Date(Utc::now())),
        )?,
        native(
            FunctionDescriptor::new("to_json", Category::Conversion)
                .arity(Arity::exact(1))
                .signature("value")
                .summary("Serializes a value to JSON text")
                .param("value", "Any value")
                .example("retrieve(\"user\")"),
            |_, _, args| Ok(Value::string(convert::to_json(&args[0]).to_string())),
        )?,
        native(
            FunctionDescriptor::new("from_json", Category::Conversion)
                .arity(Arity::exact(1))
                .signature("text")
                .summary("Parses JSON text into a value")
                .param("text", "JSON document")
                .example("\"{\\\"a\\\": 1}\""),
            from_json,
        )?,
    ])
}

// ============================================================================
// Numbers
// ============================================================================

fn num(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    Ok(match number(ctx, &args[0]) {
        Ok(n) => Value::Number(n),
        Err(error) => {
            tracing::debug!(error = %error, "num() degraded to null");
            Value::Null
        }
    })
}

fn int(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    Ok(match integer(ctx, &args[0]) {
        Ok(i) => Value::Integer(i),
        Err(error) => {
            tracing::debug!(error = %error, "int() degraded to null");
            Value::Null
        }
    })
}

fn locale_or_current(ctx: &ActionContext, args: &[Value], index: usize) -> Result<Locale, RuntimeError> {
    match optional(args, index) {
        Some(_) => Ok(locale(args, index)?),
        None => Ok(ctx.locale().clone()),
    }
}

fn parse_number(
    ctx: &mut ActionContext,
    _caller: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    let locale = locale_or_current(ctx, args, 1)?;
    let text = args[0].to_string();
    Ok(Value::Number(convert::parse_number_text(&text, &locale)?))
}

/// Format `value` with `decimals` fixed places and locale separators
pub fn format_number(value: f64, decimals: usize, locale: &Locale) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3 + decimals + 2);
    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    if negative {
        grouped.push('-');
    }
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(locale.grouping_separator());
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push(locale.decimal_separator());
        grouped.push_str(fraction);
    }
    grouped
}

fn number_format(
    ctx: &mut ActionContext,
    _caller: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    require_non_null_at(args, 1)?;
    let value = number(ctx, &args[0])?;
    let decimals = integer(ctx, &args[1])?.clamp(0, 20) as usize;
    let locale = locale_or_current(ctx, args, 2)?;
    Ok(Value::string(format_number(value, decimals, &locale)))
}

// ============================================================================
// Dates
// ============================================================================

fn to_date(_ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    Ok(Value::Date(convert::to_date(&args[0])?))
}

fn strftime_items(pattern: &str) -> Result<StrftimeItems<'_>, CoercionError> {
    let items = StrftimeItems::new(pattern);
    if items.clone().any(|item| matches!(item, Item::Error)) {
        return Err(CoercionError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "unsupported format specifier".to_string(),
        });
    }
    Ok(items)
}

fn date_format(
    _ctx: &mut ActionContext,
    _caller: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let date = convert::to_date(&args[0])?;
    let pattern = args[1].to_string();
    let items = strftime_items(&pattern)?;
    Ok(Value::string(date.format_with_items(items).to_string()))
}

fn parse_date(
    _ctx: &mut ActionContext,
    _caller: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let text = args[0].to_string();
    let pattern = arg(args, 1).to_string();
    strftime_items(&pattern)?;

    let parsed = DateTime::parse_from_str(&text, &pattern)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(&text, &pattern)
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
        .or_else(|| {
            NaiveDate::parse_from_str(&text, &pattern)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
        .ok_or_else(|| CoercionError::InvalidDate { input: text.clone() })?;
    Ok(Value::Date(parsed))
}

// ============================================================================
// JSON
// ============================================================================

fn from_json(
    _ctx: &mut ActionContext,
    _caller: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let text = args[0].to_string();
    let json: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| CoercionError::Json(e.to_string()))?;
    Ok(convert::from_json(&json))
}
