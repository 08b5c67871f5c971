//! Market watchlist configuration
//!
//! The watchlist is loaded with a two-layer resolution:
//! 1. Check for an override in the data dir (~/.local/share/finch/config/watchlist.toml)
//! 2. Fall back to the embedded default (compiled into the binary)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default watchlist (compiled into binary)
const DEFAULT_WATCHLIST: &str = include_str!("../../config/watchlist.toml");

/// Recommendations never list more than this many symbols
pub const MAX_TOP_N: usize = 5;

const DEFAULT_TOP_N: usize = MAX_TOP_N;

/// GICS-style sector of a watched symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Technology,
    ConsumerDiscretionary,
    CommunicationServices,
    Financials,
    Healthcare,
    ConsumerStaples,
    Energy,
    Industrials,
    Utilities,
    RealEstate,
    Materials,
    /// Symbol not on the watchlist
    Other,
}

impl Sector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technology => "Technology",
            Self::ConsumerDiscretionary => "Consumer Discretionary",
            Self::CommunicationServices => "Communication Services",
            Self::Financials => "Financials",
            Self::Healthcare => "Healthcare",
            Self::ConsumerStaples => "Consumer Staples",
            Self::Energy => "Energy",
            Self::Industrials => "Industrials",
            Self::Utilities => "Utilities",
            Self::RealEstate => "Real Estate",
            Self::Materials => "Materials",
            Self::Other => "Other",
        }
    }

    /// Sectors that swing harder than the market
    pub fn is_high_beta(&self) -> bool {
        matches!(
            self,
            Self::Technology | Self::ConsumerDiscretionary | Self::CommunicationServices
        )
    }

    /// Sectors that hold up in downturns
    pub fn is_defensive(&self) -> bool {
        matches!(
            self,
            Self::ConsumerStaples | Self::Utilities | Self::Healthcare
        )
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One symbol on the watchlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub name: String,
    pub sector: Sector,
}

#[derive(Debug, Default, Deserialize)]
struct WatchlistDefaults {
    top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct WatchlistFile {
    #[serde(default)]
    defaults: WatchlistDefaults,
    symbols: Vec<WatchlistEntry>,
}

/// The symbols scored for recommendations, in configured order
#[derive(Debug, Clone)]
pub struct Watchlist {
    entries: Vec<WatchlistEntry>,
    top_n: usize,
}

impl Watchlist {
    /// Load the override file if present, otherwise the embedded default
    pub fn load() -> Result<Self> {
        match default_watchlist_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Self::parse(DEFAULT_WATCHLIST),
        }
    }

    /// Load from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read watchlist: {}", e)))?;
        debug!(path = %path.display(), "Loaded watchlist override");
        Self::parse(&content)
    }

    /// The compiled-in watchlist
    pub fn embedded() -> Self {
        // The embedded file is covered by tests, so parsing can't fail at runtime
        Self::parse(DEFAULT_WATCHLIST).unwrap_or_else(|_| Self {
            entries: Vec::new(),
            top_n: DEFAULT_TOP_N,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: WatchlistFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid watchlist: {}", e)))?;

        let mut entries: Vec<WatchlistEntry> = Vec::with_capacity(file.symbols.len());
        for mut entry in file.symbols {
            entry.symbol = entry.symbol.trim().to_uppercase();
            if entry.symbol.is_empty() {
                return Err(Error::Config("Watchlist symbol cannot be empty".into()));
            }
            if entries.iter().any(|e| e.symbol == entry.symbol) {
                return Err(Error::Config(format!(
                    "Duplicate watchlist symbol: {}",
                    entry.symbol
                )));
            }
            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(Error::Config("Watchlist has no symbols".into()));
        }

        Ok(Self {
            entries,
            top_n: file.defaults.top_n.unwrap_or(DEFAULT_TOP_N).clamp(1, MAX_TOP_N),
        })
    }

    /// Build a watchlist directly (for testing)
    pub fn from_entries(entries: Vec<WatchlistEntry>, top_n: usize) -> Self {
        Self {
            entries,
            top_n: top_n.clamp(1, MAX_TOP_N),
        }
    }

    pub fn entries(&self) -> &[WatchlistEntry] {
        &self.entries
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a symbol (case-insensitive)
    pub fn get(&self, symbol: &str) -> Option<&WatchlistEntry> {
        self.entries
            .iter()
            .find(|e| e.symbol.eq_ignore_ascii_case(symbol.trim()))
    }
}

impl Default for Watchlist {
    fn default() -> Self {
        Self::embedded()
    }
}

/// Default watchlist override path
pub fn default_watchlist_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("finch").join("config").join("watchlist.toml"))
}
