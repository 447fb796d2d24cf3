//! Key transformers.
//!
//! A transformer rewrites event names and property keys into the format a
//! platform expects. Transformers are pure and deterministic; callers apply
//! them exactly once per property set, since a transform is not idempotent in
//! general.

use regex::Regex;
use std::collections::HashMap;

/// A pure string-key rewrite.
pub trait KeyTransformer: Send + Sync {
    fn transform_key(&self, key: &str) -> String;
}

/// Applies `transformer` to every key of `properties`, preserving values.
pub fn transform_properties<V: Clone>(
    transformer: &dyn KeyTransformer,
    properties: &HashMap<String, V>,
) -> HashMap<String, V> {
    properties
        .iter()
        .map(|(key, value)| (transformer.transform_key(key), value.clone()))
        .collect()
}

/// Leaves keys untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl KeyTransformer for IdentityTransformer {
    fn transform_key(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Lower-cases the whole key.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowerCaseTransformer;

impl KeyTransformer for LowerCaseTransformer {
    fn transform_key(&self, key: &str) -> String {
        key.to_lowercase()
    }
}

/// Capitalizes the first letter of each space-delimited token.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleCaseTransformer;

impl KeyTransformer for TitleCaseTransformer {
    fn transform_key(&self, key: &str) -> String {
        key.split(' ')
            .map(|token| {
                let mut chars = token.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

/// One find/replace step of a [`PatternTransformer`].
#[derive(Debug, Clone)]
pub struct PatternRule {
    pattern: Regex,
    replacement: String,
}

impl PatternRule {
    pub fn new(pattern: Regex, replacement: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: replacement.into(),
        }
    }
}

/// Applies an ordered list of regex replacements; each rule fully replaces
/// all matches before the next one runs.
#[derive(Debug, Clone)]
pub struct PatternTransformer {
    rules: Vec<PatternRule>,
}

impl PatternTransformer {
    pub fn new(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }
}

impl KeyTransformer for PatternTransformer {
    fn transform_key(&self, key: &str) -> String {
        self.rules.iter().fold(key.to_string(), |key, rule| {
            rule.pattern
                .replace_all(&key, rule.replacement.as_str())
                .into_owned()
        })
    }
}

/// Prepends a fixed prefix.
#[derive(Debug, Clone)]
pub struct PrefixTransformer {
    prefix: String,
}

impl PrefixTransformer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl KeyTransformer for PrefixTransformer {
    fn transform_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

/// Exact-match remapping from a fixed dictionary; keys absent from the
/// dictionary pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct ReservedKeyTransformer {
    reserved: HashMap<String, String>,
}

impl ReservedKeyTransformer {
    pub fn new(reserved: HashMap<String, String>) -> Self {
        Self { reserved }
    }
}

impl KeyTransformer for ReservedKeyTransformer {
    fn transform_key(&self, key: &str) -> String {
        self.reserved
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

/// Applies a sequence of transformers in order, output of one feeding the
/// next.
pub struct ChainTransformer {
    transformers: Vec<Box<dyn KeyTransformer>>,
}

impl ChainTransformer {
    pub fn new(transformers: Vec<Box<dyn KeyTransformer>>) -> Self {
        Self { transformers }
    }
}

impl KeyTransformer for ChainTransformer {
    fn transform_key(&self, key: &str) -> String {
        self.transformers
            .iter()
            .fold(key.to_string(), |key, transformer| {
                transformer.transform_key(&key)
            })
    }
}

/// `"Button Clicked"` -> `"button_clicked"`.
pub fn title_case_to_snake_case() -> ChainTransformer {
    ChainTransformer::new(vec![
        Box::new(LowerCaseTransformer),
        Box::new(PatternTransformer::new(vec![PatternRule::new(
            Regex::new(r"\s+").expect("static pattern"),
            "_",
        )])),
    ])
}

/// `"app_started"` -> `"App Started"`.
pub fn snake_case_to_title_case() -> ChainTransformer {
    ChainTransformer::new(vec![
        Box::new(PatternTransformer::new(vec![PatternRule::new(
            Regex::new(r"_+").expect("static pattern"),
            " ",
        )])),
        Box::new(TitleCaseTransformer),
    ])
}
