//   1   mm =   20 SU
//   1   in =  508 SU
//   8.5 in = 4318 SU
//  11   in = 5588 SU

/// Silhouette units per millimeter. One SU is 0.05 mm.
pub const SU_PER_MM: f64 = 20.0;

/// Silhouette units per inch.
pub const SU_PER_INCH: f64 = 508.0;

/// Converts millimeters to Silhouette units.
///
/// Halfway values round to the even neighbour, so 0.125 mm (2.5 SU) becomes 2.
pub fn mm_to_units(mm: f64) -> i32 {
    (mm * SU_PER_MM).round_ties_even() as i32
}

/// Converts inches to Silhouette units, rounding like [`mm_to_units`].
pub fn inch_to_units(inch: f64) -> i32 {
    (inch * SU_PER_INCH).round_ties_even() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn converts_known_lengths() {
        assert_eq!(mm_to_units(1.0), 20);
        assert_eq!(mm_to_units(4.5), 90);
        assert_eq!(mm_to_units(0.9), 18);
        assert_eq!(inch_to_units(8.5), 4318);
        assert_eq!(inch_to_units(11.0), 5588);
        assert_eq!(inch_to_units(12.0), 6096);
    }

    #[test]
    fn halfway_rounds_to_even() {
        assert_eq!(mm_to_units(0.125), 2);
        assert_eq!(mm_to_units(0.375), 8);
        assert_eq!(mm_to_units(-0.125), -2);
        assert_eq!(inch_to_units(0.5), 254);
    }

    proptest! {
        #[test]
        fn mm_matches_rounded_product(v in -5000.0f64..5000.0) {
            prop_assert_eq!(mm_to_units(v), (v * 20.0).round_ties_even() as i32);
        }

        #[test]
        fn inch_matches_rounded_product(v in -200.0f64..200.0) {
            prop_assert_eq!(inch_to_units(v), (v * 508.0).round_ties_even() as i32);
        }

        #[test]
        fn never_off_by_more_than_half_a_unit(v in -5000.0f64..5000.0) {
            let units = mm_to_units(v) as f64;
            prop_assert!((units - v * 20.0).abs() <= 0.5);
        }
    }
}
