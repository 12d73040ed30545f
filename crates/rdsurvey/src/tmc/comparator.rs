//! Ordering of locations along a route

use std::cmp::Ordering;

use super::location::{Location, LocationKind};

/// Orders locations by their position along a road
///
/// Coordinates are not used. Locations are ordered by
/// following offset chains, so the order is only defined for
/// locations which are related:
///
/// 1. A location equals itself.
/// 2. An enclosing location sorts before its children.
/// 3. Two points, or two segments, sort by their position
///    along the offset chain. With `negative_direction`,
///    locations further in the negative direction sort first;
///    otherwise those further in the positive direction do.
/// 4. Segments which are not on the same chain are compared
///    through their enclosing segments.
///
/// Everything else is [`Ordering::Equal`]. This is not a
/// total order, so it is not suitable for `sort_by` on
/// arbitrary sets of locations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocationComparator {
    negative_direction: bool,
}

impl LocationComparator {
    /// New comparator for the given direction of travel
    pub fn new(negative_direction: bool) -> Self {
        Self { negative_direction }
    }

    /// True if ordering in the negative direction
    pub fn negative_direction(&self) -> bool {
        self.negative_direction
    }

    /// Compare two locations
    pub fn compare(&self, lhs: &Location<'_>, rhs: &Location<'_>) -> Ordering {
        if lhs == rhs {
            return Ordering::Equal;
        }

        if rhs.is_child_of(lhs) {
            return Ordering::Less;
        }
        if lhs.is_child_of(rhs) {
            return Ordering::Greater;
        }

        match (lhs.kind(), rhs.kind()) {
            (LocationKind::Point { .. }, LocationKind::Point { .. }) => {
                self.walk(lhs, rhs).unwrap_or(Ordering::Equal)
            }
            (LocationKind::Segment { .. }, LocationKind::Segment { .. }) => {
                if let Some(ord) = self.walk(lhs, rhs) {
                    return ord;
                }
                let mut out = Ordering::Equal;
                if let Some(parent) = lhs.segment() {
                    out = self.compare(&parent, rhs);
                }
                if out == Ordering::Equal {
                    if let Some(parent) = rhs.segment() {
                        out = self.compare(lhs, &parent);
                    }
                }
                out
            }
            _ => Ordering::Equal,
        }
    }

    // walk both offset chains from lhs, looking for rhs
    fn walk(&self, lhs: &Location<'_>, rhs: &Location<'_>) -> Option<Ordering> {
        let mut neg = lhs.neg_offset();
        let mut pos = lhs.pos_offset();

        // bounds the walk if the chain data contains a cycle
        let mut steps = 0usize;
        let limit = u16::MAX as usize;

        while neg.is_some() || pos.is_some() {
            if neg.as_ref() == Some(rhs) {
                return Some(if self.negative_direction {
                    Ordering::Less
                } else {
                    Ordering::Greater
                });
            }
            if pos.as_ref() == Some(rhs) {
                return Some(if self.negative_direction {
                    Ordering::Greater
                } else {
                    Ordering::Less
                });
            }

            steps += 1;
            if steps > limit {
                break;
            }
            neg = neg.and_then(|l| l.neg_offset());
            pos = pos.and_then(|l| l.pos_offset());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tmc::location::tests::sample_table;

    #[test]
    fn test_points() {
        let lt = sample_table();
        let p301 = lt.get(58, 1, 301).expect("point");
        let p303 = lt.get(58, 1, 303).expect("point");
        let p304 = lt.get(58, 1, 304).expect("point");

        let pos = LocationComparator::new(false);
        assert_eq!(Ordering::Equal, pos.compare(&p301, &p301));
        assert_eq!(Ordering::Less, pos.compare(&p301, &p304));
        assert_eq!(Ordering::Greater, pos.compare(&p304, &p301));

        let neg = LocationComparator::new(true);
        assert_eq!(Ordering::Greater, neg.compare(&p301, &p303));
        assert_eq!(Ordering::Less, neg.compare(&p303, &p301));
    }

    #[test]
    fn test_parents_first() {
        let lt = sample_table();
        let road = lt.get(58, 1, 100).expect("road");
        let s201 = lt.get(58, 1, 201).expect("segment");
        let p302 = lt.get(58, 1, 302).expect("point");

        let cmp = LocationComparator::new(false);
        assert_eq!(Ordering::Less, cmp.compare(&road, &p302));
        assert_eq!(Ordering::Greater, cmp.compare(&p302, &s201));
    }

    #[test]
    fn test_segments() {
        let lt = sample_table();
        let s201 = lt.get(58, 1, 201).expect("segment");
        let s202 = lt.get(58, 1, 202).expect("segment");
        let s203 = lt.get(58, 1, 203).expect("segment");

        let cmp = LocationComparator::new(false);
        assert_eq!(Ordering::Less, cmp.compare(&s201, &s202));
        assert_eq!(Ordering::Greater, cmp.compare(&s202, &s201));

        // no chain and no common parent segment
        assert_eq!(Ordering::Equal, cmp.compare(&s201, &s203));
    }

    #[test]
    fn test_unrelated() {
        let lt = sample_table();
        let land = lt.get(58, 1, 1).expect("area");
        let s203 = lt.get(58, 1, 203).expect("segment");
        let p301 = lt.get(58, 1, 301).expect("point");

        let cmp = LocationComparator::new(false);
        assert_eq!(Ordering::Less, cmp.compare(&land, &p301));
        assert_eq!(Ordering::Equal, cmp.compare(&s203, &p301));
    }
}
