//! Static allow-list analysis of markup creatives.
//!
//! Deny-list-plus-allow-list hybrid: the creative is operator-authored
//! but ultimately rendered to every visitor, so a compromised or careless
//! operator input must not become a cross-site-scripting vector. Pure
//! analysis, no side effects, safe on attacker-controlled input. Rules
//! run in a fixed order and the first violation determines the reported
//! reason.

use crate::markup::{scan_tag_attributes, segment_markup, Segment};
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Marker token the allow-listed provider stamps on its creatives.
const PROVIDER_MARKER: &str = "adsbygoogle";

/// Dangerous substrings that must never appear outside an approved
/// provider script. Matched ASCII case-insensitively.
const DANGEROUS_PATTERNS: &[&str] = &[
    // url schemes that smuggle script
    "javascript:",
    "data:",
    // embedding and input surfaces
    "<iframe",
    "<object",
    "<embed",
    "<form",
    "<input",
    // script-capable globals and apis
    "document.",
    "window.",
    "eval(",
    "new function",
    "function(",
    "localstorage",
    "sessionstorage",
    "cookie",
    "fetch(",
    "xmlhttprequest",
];

/// Attributes an approved provider script may carry. Anything else
/// (event handlers in particular) is rejected outright.
const ALLOWED_SCRIPT_ATTRS: &[&str] = &[
    "src",
    "async",
    "defer",
    "type",
    "crossorigin",
    "charset",
    "data-ad-client",
];

static DENY_AUTOMATON: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .match_kind(MatchKind::LeftmostFirst)
        .ascii_case_insensitive(true)
        .build(DANGEROUS_PATTERNS)
        .expect("deny patterns build a valid automaton")
});

/// Inline event handler attributes: onload=, onclick=, onerror=, ...
static EVENT_HANDLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bon[a-z]+\s*=").expect("valid event handler pattern"));

/// The provider's loader script src.
static LOADER_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?:)?//pagead2\.googlesyndication\.com/pagead/js/adsbygoogle\.js(?:\?[^\s]*)?$")
        .expect("valid loader src pattern")
});

/// The provider's init push form: `(adsbygoogle = window.adsbygoogle || []).push({...});`
static PUSH_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^\s*\(\s*adsbygoogle\s*=\s*window\.adsbygoogle\s*\|\|\s*\[\s*\]\s*\)\s*\.push\s*\(\s*\{[^{}]*\}\s*\)\s*;?\s*$",
    )
    .expect("valid push form pattern")
});

/// Client identifier shape: numeric-prefixed publisher id.
static CLIENT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ca-pub-\d+$").expect("valid client id pattern"));

/// Slot identifier shape: digits only.
static SLOT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid slot id pattern"));

/// Outcome of creative validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Gate for markup creatives. Validation runs before every render and
/// again at the persistence boundary; outcomes are never cached.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentValidator;

impl ContentValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, raw_html: &str) -> ValidationResult {
        // 1. Nothing to render is nothing to reject
        if raw_html.trim().is_empty() {
            return ValidationResult::ok();
        }

        let segments = segment_markup(raw_html);

        // 2. Every script must be scoped to the allow-listed provider
        for segment in &segments {
            if let Segment::Script(descriptor) = segment {
                if let Err(reason) = check_provider_script(descriptor) {
                    return ValidationResult::rejected(reason);
                }
            }
        }

        // 3. Deny scan over the markup with approved scripts excised
        for segment in &segments {
            if let Segment::Html(html) = segment {
                if let Some(m) = EVENT_HANDLER.find(html) {
                    return ValidationResult::rejected(format!(
                        "dangerous pattern: inline event handler '{}'",
                        m.as_str().trim()
                    ));
                }
                if let Some(m) = DENY_AUTOMATON.find(html) {
                    return ValidationResult::rejected(format!(
                        "dangerous pattern: '{}'",
                        DANGEROUS_PATTERNS[m.pattern().as_usize()]
                    ));
                }
            }
        }

        // 4. The markup must reference the provider at all
        if !raw_html.to_lowercase().contains(PROVIDER_MARKER) {
            return ValidationResult::rejected(format!(
                "markup does not reference the {} provider marker",
                PROVIDER_MARKER
            ));
        }

        // 5. The provider-mandated structural shape
        self.check_slot_shape(raw_html)
    }

    fn check_slot_shape(&self, raw_html: &str) -> ValidationResult {
        let elements = scan_tag_attributes(raw_html, "ins");
        let marked: Vec<_> = elements
            .iter()
            .filter(|attrs| {
                attr_value(attrs, "class")
                    .map(|c| c.split_whitespace().any(|t| t == PROVIDER_MARKER))
                    .unwrap_or(false)
            })
            .collect();

        if marked.is_empty() {
            return ValidationResult::rejected(format!(
                "no element carrying the {} class marker",
                PROVIDER_MARKER
            ));
        }

        let with_client: Vec<_> = marked
            .iter()
            .filter(|attrs| {
                attr_value(attrs, "data-ad-client")
                    .map(|v| CLIENT_ID.is_match(v))
                    .unwrap_or(false)
            })
            .collect();

        if with_client.is_empty() {
            return ValidationResult::rejected(
                "client identifier missing or malformed (expected ca-pub-<digits>)",
            );
        }

        let complete = with_client.iter().any(|attrs| {
            attr_value(attrs, "data-ad-slot")
                .map(|v| SLOT_ID.is_match(v))
                .unwrap_or(false)
        });

        if !complete {
            return ValidationResult::rejected(
                "slot identifier missing or malformed (expected digits)",
            );
        }

        ValidationResult::ok()
    }
}

fn attr_value<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

fn check_provider_script(
    descriptor: &crate::markup::ScriptDescriptor,
) -> Result<(), String> {
    for (name, _) in &descriptor.attributes {
        if !ALLOWED_SCRIPT_ATTRS.contains(&name.as_str()) {
            return Err(format!(
                "dangerous pattern: disallowed attribute '{}' on a <script> element",
                name
            ));
        }
    }

    if let Some(src) = descriptor.src() {
        if !LOADER_SRC.is_match(src.trim()) {
            return Err(format!(
                "dangerous pattern: <script> src outside the approved provider loader ('{}')",
                src
            ));
        }
        if !descriptor.text_content.trim().is_empty() {
            return Err(
                "dangerous pattern: provider loader <script> must not carry an inline body"
                    .to_string(),
            );
        }
        return Ok(());
    }

    if PUSH_FORM.is_match(&descriptor.text_content) {
        Ok(())
    } else {
        Err(
            "dangerous pattern: <script> body is not the approved provider init push"
                .to_string(),
        )
    }
}
