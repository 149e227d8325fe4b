//! Asset registry for the single BASE/QUOTE market.
//!
//! `Gas` is the chain's native token. It never trades, but deposits and
//! withdrawals of it still go through the ledger.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CallmatchError, Result};

/// An asset held in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Base,
    Quote,
    Gas,
}

impl Asset {
    pub const ALL: [Self; 3] = [Self::Base, Self::Quote, Self::Gas];

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Base => "BASE",
            Self::Quote => "QUOTE",
            Self::Gas => "BNB",
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Base => "BaseCoin",
            Self::Quote => "QuoteCoin",
            Self::Gas => "Binance Coin",
        }
    }

    /// On-chain decimals of the token.
    #[must_use]
    pub fn decimals(self) -> u32 {
        match self {
            Self::Base | Self::Quote => 6,
            Self::Gas => 18,
        }
    }

    /// Resolve a token symbol, name or legacy alias (case-insensitive).
    ///
    /// # Errors
    /// Returns [`CallmatchError::UnknownAsset`] for anything else.
    pub fn from_token(token: &str) -> Result<Self> {
        let token = token.trim().to_ascii_lowercase();
        for asset in Self::ALL {
            if token == asset.symbol().to_ascii_lowercase()
                || token == asset.name().to_ascii_lowercase()
            {
                return Ok(asset);
            }
        }
        match token.as_str() {
            "base" | "basecoin" => Ok(Self::Base),
            "quote" | "quotecoin" => Ok(Self::Quote),
            "gas" | "bnb" => Ok(Self::Gas),
            _ => Err(CallmatchError::UnknownAsset(token)),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The traded pair. Prices are quoted in `quote` per unit of `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub base: Asset,
    pub quote: Asset,
}

impl Instrument {
    /// The BASE/QUOTE pair every auction clears.
    #[must_use]
    pub fn main() -> Self {
        Self {
            base: Asset::Base,
            quote: Asset::Quote,
        }
    }

    #[must_use]
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}

impl Default for Instrument {
    fn default() -> Self {
        Self::main()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}
