//! Slider zone table and gate classification.
//!
//! The slider is divided into half-open position ranges, each bound to a
//! boolean combinator applied to the two buttons. Positions that fall between
//! zones classify as [`Classification::NoOp`] and leave the output untouched.

use core::fmt;

use crate::error::ZoneTableError;

/// Exclusive upper limit of slider positions reported by the touch driver.
pub const MAX_POSITION: u16 = 300;

/// Boolean operator selected by a zone.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Combinator {
    Or,
    And,
    Xor,
}

impl Combinator {
    /// Applies the operator to a pair of button states.
    pub const fn apply(self, a: bool, b: bool) -> bool {
        match self {
            Combinator::Or => a || b,
            Combinator::And => a && b,
            Combinator::Xor => a ^ b,
        }
    }

    /// Short uppercase label used by diagnostics.
    pub const fn label(self) -> &'static str {
        match self {
            Combinator::Or => "OR",
            Combinator::And => "AND",
            Combinator::Xor => "XOR",
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of classifying a slider position.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Classification {
    Gate(Combinator),
    NoOp,
}

impl Classification {
    const NOOP_CODE: u8 = 0;
    const OR_CODE: u8 = 1;
    const AND_CODE: u8 = 2;
    const XOR_CODE: u8 = 3;

    /// Returns the combinator, if any.
    pub const fn combinator(self) -> Option<Combinator> {
        match self {
            Classification::Gate(combinator) => Some(combinator),
            Classification::NoOp => None,
        }
    }

    /// Encodes the classification for the tuner frame.
    pub const fn to_raw(self) -> u8 {
        match self {
            Classification::NoOp => Self::NOOP_CODE,
            Classification::Gate(Combinator::Or) => Self::OR_CODE,
            Classification::Gate(Combinator::And) => Self::AND_CODE,
            Classification::Gate(Combinator::Xor) => Self::XOR_CODE,
        }
    }

    /// Decodes a tuner frame classification code.
    pub const fn from_raw(code: u8) -> Option<Self> {
        match code {
            Self::NOOP_CODE => Some(Classification::NoOp),
            Self::OR_CODE => Some(Classification::Gate(Combinator::Or)),
            Self::AND_CODE => Some(Classification::Gate(Combinator::And)),
            Self::XOR_CODE => Some(Classification::Gate(Combinator::Xor)),
            _ => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Gate(combinator) => combinator.fmt(f),
            Classification::NoOp => f.write_str("no-op"),
        }
    }
}

/// Half-open slider range `[lower_bound, upper_bound)` bound to a combinator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Zone {
    pub lower_bound: u16,
    pub upper_bound: u16,
    pub combinator: Combinator,
}

impl Zone {
    pub const fn new(lower_bound: u16, upper_bound: u16, combinator: Combinator) -> Self {
        Self {
            lower_bound,
            upper_bound,
            combinator,
        }
    }

    /// Returns `true` when `position` lies inside the zone.
    pub const fn contains(&self, position: u16) -> bool {
        self.lower_bound <= position && position < self.upper_bound
    }
}

/// Gate layout of the reference board: OR, AND, XOR from left to right.
pub const DEFAULT_ZONES: [Zone; 3] = [
    Zone::new(0, 100, Combinator::Or),
    Zone::new(100, 200, Combinator::And),
    Zone::new(200, 300, Combinator::Xor),
];

/// Validated, read-only view over a zone table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ZoneTable<'a> {
    zones: &'a [Zone],
}

impl<'a> ZoneTable<'a> {
    /// Validates `zones` against the slider range `[0, max_position)`.
    pub fn new(zones: &'a [Zone], max_position: u16) -> Result<Self, ZoneTableError> {
        if zones.is_empty() {
            return Err(ZoneTableError::Empty);
        }

        let mut previous: Option<&Zone> = None;
        for (index, zone) in zones.iter().enumerate() {
            if zone.lower_bound >= zone.upper_bound {
                return Err(ZoneTableError::EmptyZone { index });
            }
            if zone.upper_bound > max_position {
                return Err(ZoneTableError::OutOfRange { index });
            }
            if let Some(prev) = previous {
                if zone.lower_bound < prev.lower_bound {
                    return Err(ZoneTableError::Unordered { index });
                }
                if zone.lower_bound < prev.upper_bound {
                    return Err(ZoneTableError::Overlapping { index });
                }
            }
            previous = Some(zone);
        }

        Ok(Self { zones })
    }

    /// Returns the zones in ascending order.
    pub const fn zones(&self) -> &'a [Zone] {
        self.zones
    }

    /// Returns the zone containing `position`, if any.
    pub fn zone_for(&self, position: u16) -> Option<&'a Zone> {
        // Zones are sorted and disjoint, so every zone before the split point
        // ends at or below `position`.
        let index = self
            .zones
            .partition_point(|zone| zone.upper_bound <= position);
        self.zones.get(index).filter(|zone| zone.contains(position))
    }

    /// Maps a slider position to the combinator of its zone.
    pub fn classify(&self, position: u16) -> Classification {
        self.zone_for(position)
            .map_or(Classification::NoOp, |zone| {
                Classification::Gate(zone.combinator)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinators_follow_truth_tables() {
        let pairs = [(false, false), (false, true), (true, false), (true, true)];
        for (a, b) in pairs {
            assert_eq!(Combinator::Or.apply(a, b), a || b);
            assert_eq!(Combinator::And.apply(a, b), a && b);
            assert_eq!(Combinator::Xor.apply(a, b), a != b);
        }
    }

    #[test]
    fn default_table_is_valid() {
        let table = ZoneTable::new(&DEFAULT_ZONES, MAX_POSITION).expect("default zones");
        assert_eq!(table.zones().len(), 3);
        assert_eq!(table.classify(0), Classification::Gate(Combinator::Or));
        assert_eq!(table.classify(299), Classification::Gate(Combinator::Xor));
    }

    #[test]
    fn rejects_overlap_and_disorder() {
        let overlapping = [
            Zone::new(0, 120, Combinator::Or),
            Zone::new(100, 200, Combinator::And),
        ];
        assert_eq!(
            ZoneTable::new(&overlapping, MAX_POSITION),
            Err(ZoneTableError::Overlapping { index: 1 })
        );

        let unordered = [
            Zone::new(100, 200, Combinator::And),
            Zone::new(0, 100, Combinator::Or),
        ];
        assert_eq!(
            ZoneTable::new(&unordered, MAX_POSITION),
            Err(ZoneTableError::Unordered { index: 1 })
        );
    }

    #[test]
    fn rejects_empty_and_out_of_range_zones() {
        assert_eq!(ZoneTable::new(&[], MAX_POSITION), Err(ZoneTableError::Empty));
        assert_eq!(
            ZoneTable::new(&[Zone::new(50, 50, Combinator::Or)], MAX_POSITION),
            Err(ZoneTableError::EmptyZone { index: 0 })
        );
        assert_eq!(
            ZoneTable::new(&[Zone::new(250, 400, Combinator::Xor)], MAX_POSITION),
            Err(ZoneTableError::OutOfRange { index: 0 })
        );
    }

    #[test]
    fn gaps_classify_as_noop() {
        let zones = [
            Zone::new(10, 50, Combinator::Or),
            Zone::new(60, 90, Combinator::Xor),
        ];
        let table = ZoneTable::new(&zones, MAX_POSITION).expect("valid table");
        assert_eq!(table.classify(5), Classification::NoOp);
        assert_eq!(table.classify(50), Classification::NoOp);
        assert_eq!(table.classify(59), Classification::NoOp);
        assert_eq!(table.classify(60), Classification::Gate(Combinator::Xor));
        assert_eq!(table.classify(90), Classification::NoOp);
    }

    #[test]
    fn classification_codes_are_stable() {
        for classification in [
            Classification::NoOp,
            Classification::Gate(Combinator::Or),
            Classification::Gate(Combinator::And),
            Classification::Gate(Combinator::Xor),
        ] {
            assert_eq!(
                Classification::from_raw(classification.to_raw()),
                Some(classification)
            );
        }
        assert_eq!(Classification::from_raw(9), None);
    }
}
