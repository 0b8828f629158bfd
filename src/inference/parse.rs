// Model reply parsing
//
// Models wrap their JSON in prose or markdown fences often enough that a
// single `serde_json::from_str` is not sufficient. Strategies run in a fixed
// order and the first one producing a usable score wins.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Risk score produced by the model, 0 (safe) to 100 (dangerous)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskScore {
    pub score: u8,
    pub reason: String,
}

/// Outcome of parsing a model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReply {
    Score(RiskScore),
    /// No strategy produced a score
    ParseError { raw: String },
}

impl ParsedReply {
    pub fn score(&self) -> Option<&RiskScore> {
        match self {
            Self::Score(score) => Some(score),
            Self::ParseError { .. } => None,
        }
    }
}

/// Extraction strategy, tried in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// The whole reply is JSON
    Direct,
    /// JSON inside a markdown code fence, with or without a language tag
    FencedBlock,
    /// Outermost `{ ... }` span
    BraceSpan,
}

pub const STRATEGIES: [ParseStrategy; 3] = [
    ParseStrategy::Direct,
    ParseStrategy::FencedBlock,
    ParseStrategy::BraceSpan,
];

impl ParseStrategy {
    /// Candidate JSON text for this strategy
    pub fn extract<'a>(&self, text: &'a str) -> Option<&'a str> {
        match self {
            Self::Direct => Some(text.trim()),
            Self::FencedBlock => fenced_block(text),
            Self::BraceSpan => {
                let start = text.find('{')?;
                let end = text.rfind('}')?;
                (end > start).then(|| &text[start..=end])
            }
        }
    }

    pub fn apply(&self, text: &str) -> Option<RiskScore> {
        self.extract(text).and_then(interpret)
    }
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_ticks = &text[open + 3..];
    // Language tag runs to the end of the opening line
    let body_start = match after_ticks.find('\n') {
        Some(newline) if !after_ticks[..newline].contains('{') => newline + 1,
        _ => 0,
    };
    let body = &after_ticks[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// Parse a model reply. Never fails; unusable replies become
/// [`ParsedReply::ParseError`].
pub fn parse_reply(text: &str) -> ParsedReply {
    for strategy in STRATEGIES {
        if let Some(score) = strategy.apply(text) {
            debug!("Parsed model reply with {:?} strategy", strategy);
            return ParsedReply::Score(score);
        }
    }

    ParsedReply::ParseError { raw: text.to_string() }
}

fn interpret(candidate: &str) -> Option<RiskScore> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    let object = value.as_object()?;

    let raw_score = match object.get("score")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    let reason = ["reason", "explanation", "rationale"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    Some(RiskScore {
        score: normalize_score(raw_score)?,
        reason,
    })
}

/// Map a reply score onto 0..=100.
///
/// Values in (100, 1000] are read as the 0-1000 scale and divided by ten.
pub fn normalize_score(raw: f64) -> Option<u8> {
    if !raw.is_finite() {
        return None;
    }
    let scaled = if raw > 100.0 && raw <= 1000.0 { raw / 10.0 } else { raw };
    Some(scaled.round().clamp(0.0, 100.0) as u8)
}
