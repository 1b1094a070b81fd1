//! Locale handling for number parsing and formatting

use std::fmt;

/// Languages that write decimals with a comma and group digits with a dot
const COMMA_DECIMAL_LANGUAGES: &[&str] = &[
    "de", "fr", "es", "it", "nl", "pt", "ru", "pl", "cs", "da", "sv", "nb", "fi", "tr", "id",
];

/// A language/country pair such as `en_US` or `de`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    language: String,
    country: Option<String>,
}

impl Locale {
    /// Parse `en`, `en_US` or `en-US`; returns `None` for anything else
    pub fn parse(tag: &str) -> Option<Self> {
        let mut parts = tag.trim().split(['_', '-']);
        let language = parts.next()?;
        if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic())
        {
            return None;
        }
        let country = match parts.next() {
            Some(c) if c.len() == 2 && c.chars().all(|ch| ch.is_ascii_alphabetic()) => {
                Some(c.to_ascii_uppercase())
            }
            Some(_) => return None,
            None => None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            language: language.to_ascii_lowercase(),
            country,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn decimal_separator(&self) -> char {
        if COMMA_DECIMAL_LANGUAGES.contains(&self.language.as_str()) {
            ','
        } else {
            '.'
        }
    }

    pub fn grouping_separator(&self) -> char {
        if self.decimal_separator() == ',' {
            '.'
        } else {
            ','
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            country: Some("US".to_string()),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.country {
            Some(country) => write!(f, "{}_{}", self.language, country),
            None => write!(f, "{}", self.language),
        }
    }
}
