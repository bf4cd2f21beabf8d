use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Cherry,
    Lemon,
    Bell,
    Diamond,
    Seven,
}

/// Reel symbol table. The order is part of the fairness protocol.
pub const SYMBOLS: [Symbol; 5] = [
    Symbol::Cherry,
    Symbol::Lemon,
    Symbol::Bell,
    Symbol::Diamond,
    Symbol::Seven,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown symbol: {0:?}")]
pub struct SymbolParseError(pub String);

impl Symbol {
    /// Out-of-range indices clamp to the last symbol.
    pub fn from_index(i: usize) -> Self {
        SYMBOLS[i.min(SYMBOLS.len() - 1)]
    }

    pub fn to_index(self) -> usize {
        match self {
            Symbol::Cherry => 0,
            Symbol::Lemon => 1,
            Symbol::Bell => 2,
            Symbol::Diamond => 3,
            Symbol::Seven => 4,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Symbol::Cherry => "🍒",
            Symbol::Lemon => "🍋",
            Symbol::Bell => "🔔",
            Symbol::Diamond => "💎",
            Symbol::Seven => "7️⃣",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Symbol::Cherry => "Cherry",
            Symbol::Lemon => "Lemon",
            Symbol::Bell => "Bell",
            Symbol::Diamond => "Diamond",
            Symbol::Seven => "Lucky Seven",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Accepts the glyph (with or without the emoji variation selector) or the
/// display name, case-insensitively.
impl FromStr for Symbol {
    type Err = SymbolParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let bare = t.replace('\u{fe0f}', "");
        for sym in SYMBOLS {
            if bare == sym.glyph().replace('\u{fe0f}', "")
                || t.eq_ignore_ascii_case(sym.name())
                || t.eq_ignore_ascii_case(&format!("{sym:?}"))
            {
                return Ok(sym);
            }
        }
        Err(SymbolParseError(s.to_string()))
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.glyph())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The three symbols of one spin, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReelOutcome(pub [Symbol; 3]);

impl ReelOutcome {
    pub fn symbols(&self) -> &[Symbol; 3] {
        &self.0
    }
}

impl fmt::Display for ReelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a} {b} {c}")
    }
}
