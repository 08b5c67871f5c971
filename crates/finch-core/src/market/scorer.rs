//! Composite recommendation score
//!
//! Pure functions: no I/O, so the rules are easy to test in isolation.

use serde::{Deserialize, Serialize};

use super::watchlist::Sector;

/// Risk tolerance used when the input is not a number
pub const DEFAULT_RISK_TOLERANCE: f64 = 0.5;

/// Below this, high-beta sectors are penalized
const CONSERVATIVE_BELOW: f64 = 0.35;
/// Above this, high-beta sectors get a bonus
const AGGRESSIVE_ABOVE: f64 = 0.7;

/// Market fields the score is computed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInput {
    pub rsi: f64,
    pub change_percent: f64,
    pub sector: Sector,
}

/// Volatility bucket shown next to a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named risk profiles accepted by the recommendations endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskCategory {
    pub fn tolerance(&self) -> f64 {
        match self {
            Self::Conservative => 0.2,
            Self::Moderate => 0.5,
            Self::Aggressive => 0.8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        }
    }
}

impl std::str::FromStr for RiskCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "moderate" => Ok(Self::Moderate),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(format!(
                "Unknown risk category '{}' (expected conservative, moderate or aggressive)",
                s
            )),
        }
    }
}

/// Clamp a risk tolerance into [0, 1], treating NaN as neutral
pub fn normalize_risk(risk_tolerance: f64) -> f64 {
    if risk_tolerance.is_nan() {
        DEFAULT_RISK_TOLERANCE
    } else {
        risk_tolerance.clamp(0.0, 1.0)
    }
}

/// Score a stock from 0 to 100 for a given risk tolerance and news sentiment
///
/// Starts at 50 and adjusts for RSI band, daily direction, sentiment and
/// whether a high-beta sector matches the risk profile.
pub fn calculate_ai_score(stock: &ScoreInput, risk_tolerance: f64, sentiment: f64) -> u8 {
    let risk = normalize_risk(risk_tolerance);
    let sentiment = if sentiment.is_finite() {
        sentiment.clamp(-1.0, 1.0)
    } else {
        0.0
    };

    let mut score = 50.0;

    if stock.rsi < 30.0 {
        score += 15.0;
    } else if stock.rsi > 70.0 {
        score -= 10.0;
    } else if (40.0..=60.0).contains(&stock.rsi) {
        score += 5.0;
    }

    if stock.change_percent > 0.0 {
        score += 10.0;
    } else if stock.change_percent < 0.0 {
        score -= 5.0;
    }

    score += sentiment * 20.0;

    if stock.sector.is_high_beta() {
        if risk < CONSERVATIVE_BELOW {
            score -= 10.0;
        } else if risk > AGGRESSIVE_ABOVE {
            score += 10.0;
        }
    }

    score.round().clamp(0.0, 100.0) as u8
}

/// Bucket a stock by sector and today's move
pub fn risk_level(sector: Sector, change_percent: f64) -> RiskLevel {
    let swing = change_percent.abs();
    if sector.is_high_beta() || swing > 3.0 {
        RiskLevel::High
    } else if sector.is_defensive() && swing < 1.5 {
        RiskLevel::Low
    } else {
        RiskLevel::Medium
    }
}

fn rsi_phrase(rsi: f64) -> &'static str {
    if rsi < 30.0 {
        "oversold"
    } else if rsi > 70.0 {
        "overbought"
    } else if (40.0..=60.0).contains(&rsi) {
        "neutral momentum"
    } else {
        "moderate momentum"
    }
}

fn sentiment_phrase(sentiment: f64) -> &'static str {
    if sentiment > 0.15 {
        "positive"
    } else if sentiment < -0.15 {
        "negative"
    } else {
        "mixed"
    }
}

/// One-line explanation of the factors behind a score
pub fn build_reasoning(
    stock: &ScoreInput,
    sentiment: f64,
    risk_tolerance: f64,
    level: RiskLevel,
) -> String {
    let direction = if stock.change_percent > 0.0 {
        format!("up {:.2}% today", stock.change_percent)
    } else if stock.change_percent < 0.0 {
        format!("down {:.2}% today", stock.change_percent.abs())
    } else {
        "flat today".to_string()
    };

    let mut reasoning = format!(
        "RSI {:.1} ({}), {}, {} news sentiment ({:+.2}).",
        stock.rsi,
        rsi_phrase(stock.rsi),
        direction,
        sentiment_phrase(sentiment),
        sentiment
    );

    let risk = normalize_risk(risk_tolerance);
    if stock.sector.is_high_beta() {
        if risk < CONSERVATIVE_BELOW {
            reasoning.push_str(&format!(
                " {} is volatile for a conservative profile.",
                stock.sector
            ));
        } else if risk > AGGRESSIVE_ABOVE {
            reasoning.push_str(&format!(
                " {} growth fits an aggressive profile.",
                stock.sector
            ));
        }
    } else if level == RiskLevel::Low {
        reasoning.push_str(&format!(" Defensive {} holding.", stock.sector));
    }

    reasoning
}
