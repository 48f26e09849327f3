use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A distance in pips. Converted to raw price units with the symbol's pip size.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Pips(pub f64);

impl Pips {
    pub fn to_price(self, pip_size: f64) -> f64 {
        self.0 * pip_size
    }

    pub fn from_price(distance: f64, pip_size: f64) -> Pips {
        if pip_size > 0.0 {
            Pips(distance / pip_size)
        } else {
            Pips(0.0)
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Pips {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} pips", self.0)
    }
}

/// Smallest conventional price increment for `symbol`.
///
/// Explicit overrides win; otherwise JPY crosses use 0.01, gold 0.1,
/// BTC/ETH 1.0 and everything else the standard 0.0001.
pub fn pip_size(symbol: &str, overrides: &HashMap<String, f64>) -> f64 {
    if let Some(&size) = overrides.get(symbol) {
        return size;
    }
    let upper = symbol.to_uppercase();
    if upper.contains("JPY") {
        0.01
    } else if upper.contains("XAU") {
        0.1
    } else if upper.contains("BTC") || upper.contains("ETH") {
        1.0
    } else {
        0.0001
    }
}
