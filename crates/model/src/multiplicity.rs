//! Cardinality ranges and the arithmetic used when one property is folded
//! through another.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Upper bound of a cardinality range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Max {
    Bounded(u32),
    Unbounded,
}

impl Max {
    pub fn is_unbounded(self) -> bool {
        matches!(self, Max::Unbounded)
    }

    pub fn bounded(self) -> Option<u32> {
        match self {
            Max::Bounded(n) => Some(n),
            Max::Unbounded => None,
        }
    }

    /// True for an upper bound that admits more than one value.
    pub fn is_multi(self) -> bool {
        match self {
            Max::Bounded(n) => n > 1,
            Max::Unbounded => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Multiplicity {
    pub min: u32,
    pub max: Max,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid multiplicity '{0}'")]
pub struct ParseMultiplicityError(pub String);

impl Multiplicity {
    pub const ONE: Multiplicity = Multiplicity {
        min: 1,
        max: Max::Bounded(1),
    };
    pub const OPTIONAL: Multiplicity = Multiplicity {
        min: 0,
        max: Max::Bounded(1),
    };
    pub const MANY: Multiplicity = Multiplicity {
        min: 0,
        max: Max::Unbounded,
    };

    pub fn new(min: u32, max: Max) -> Self {
        Multiplicity { min, max }
    }

    pub fn bounded(min: u32, max: u32) -> Self {
        Multiplicity {
            min,
            max: Max::Bounded(max),
        }
    }

    pub fn is_single(&self) -> bool {
        self.max == Max::Bounded(1)
    }

    /// Cardinality of a property reached by going through `self` and then
    /// through `inner`.
    ///
    /// `min = outer.min * inner.min`; `max` is unbounded if either side is,
    /// otherwise `outer.max * inner.max`. Products saturate at `u32::MAX`.
    pub fn compose(&self, inner: &Multiplicity) -> Multiplicity {
        let min = self.min.saturating_mul(inner.min);
        let max = match (self.max, inner.max) {
            (Max::Bounded(a), Max::Bounded(b)) => Max::Bounded(a.saturating_mul(b)),
            _ => Max::Unbounded,
        };
        Multiplicity { min, max }
    }

    /// Same range with the lower bound dropped to zero.
    pub fn optional(&self) -> Multiplicity {
        Multiplicity {
            min: 0,
            max: self.max,
        }
    }
}

/// Free-function form of [`Multiplicity::compose`].
pub fn compose(outer: &Multiplicity, inner: &Multiplicity) -> Multiplicity {
    outer.compose(inner)
}

impl Default for Multiplicity {
    fn default() -> Self {
        Multiplicity::ONE
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Max::Bounded(max) => write!(f, "{}..{}", self.min, max),
            Max::Unbounded => write!(f, "{}..*", self.min),
        }
    }
}

impl FromStr for Multiplicity {
    type Err = ParseMultiplicityError;

    /// Accepts `n`, `*`, `n..m` and `n..*`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMultiplicityError(s.to_owned());
        let trimmed = s.trim();
        let parse_max = |raw: &str| -> Result<Max, ParseMultiplicityError> {
            match raw.trim() {
                "*" | "n" => Ok(Max::Unbounded),
                n => n.parse::<u32>().map(Max::Bounded).map_err(|_| err()),
            }
        };
        match trimmed.split_once("..") {
            Some((lo, hi)) => {
                let min = lo.trim().parse::<u32>().map_err(|_| err())?;
                let max = parse_max(hi)?;
                if let Max::Bounded(m) = max {
                    if m < min {
                        return Err(err());
                    }
                }
                Ok(Multiplicity { min, max })
            }
            None => match parse_max(trimmed)? {
                Max::Unbounded => Ok(Multiplicity::MANY),
                Max::Bounded(n) => Ok(Multiplicity::bounded(n, n)),
            },
        }
    }
}

impl Serialize for Multiplicity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Multiplicity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
