//! User settings for polynotes
//!
//! This module defines the `Settings` struct that holds every user-configurable
//! option of the rendering core, with serde support for JSON persistence.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ─────────────────────────────────────────────────────────────────────────────
// Render Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Which constructs the live renderer replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Master switch; when off every pass clears all decorations
    pub enabled: bool,
    /// Render pipe tables
    pub tables: bool,
    /// Render `#` heading lines
    pub headings: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tables: true,
            headings: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auto-Pair Settings
// ─────────────────────────────────────────────────────────────────────────────

/// One opener/closer pair recognized by the auto-pair handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingRule {
    pub opener: String,
    pub closer: String,
    /// Pair only once the opener has been typed twice (`~~`)
    #[serde(default)]
    pub double_only: bool,
}

impl PairingRule {
    pub fn new(opener: char, closer: char) -> Self {
        Self {
            opener: opener.to_string(),
            closer: closer.to_string(),
            double_only: false,
        }
    }

    pub fn double_only(mut self) -> Self {
        self.double_only = true;
        self
    }

    /// The opener as a single character, or `None` if the rule is malformed.
    pub fn opener_char(&self) -> Option<char> {
        single_char(&self.opener)
    }

    /// The closer as a single character, or `None` if the rule is malformed.
    pub fn closer_char(&self) -> Option<char> {
        single_char(&self.closer)
    }

    pub fn is_valid(&self) -> bool {
        self.opener_char().is_some() && self.closer_char().is_some()
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// The built-in rules: emphasis, strong emphasis, strikethrough, code.
pub fn default_pairing_rules() -> Vec<PairingRule> {
    vec![
        PairingRule::new('*', '*'),
        PairingRule::new('_', '_'),
        PairingRule::new('~', '~').double_only(),
        PairingRule::new('`', '`'),
    ]
}

/// Auto-pair behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoPairSettings {
    pub enabled: bool,
    /// Delay before a deferred closer is inserted, in milliseconds
    pub defer_ms: u64,
    pub rules: Vec<PairingRule>,
}

impl Default for AutoPairSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            defer_ms: 1,
            rules: default_pairing_rules(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// User preferences.
///
/// This struct is serialized to JSON and persisted to the user's config directory.
/// All fields have defaults via the `Default` trait and `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub render: RenderSettings,
    pub auto_pair: AutoPairSettings,
}

impl Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation Constants and Sanitization
    // ─────────────────────────────────────────────────────────────────────────

    /// Maximum auto-pair deferral.
    pub const MAX_DEFER_MS: u64 = 1000;

    /// Sanitize settings by clamping values to valid ranges.
    ///
    /// This is useful after loading settings from a file that might have
    /// been manually edited with invalid values.
    pub fn sanitize(&mut self) {
        self.auto_pair.defer_ms = self.auto_pair.defer_ms.min(Self::MAX_DEFER_MS);

        // Malformed rules and repeated openers are dropped; the first wins
        let mut seen = HashSet::new();
        self.auto_pair.rules.retain(|rule| {
            if !rule.is_valid() {
                log::warn!("Ignoring invalid pairing rule {:?}", rule);
                return false;
            }
            seen.insert(rule.opener.clone())
        });
    }

    /// Load settings and sanitize them to ensure validity.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
