use crate::data::model::{MaskGeometry, PingRecord, Region};
use crate::error::{MaskError, Result};

use super::calibration::Calibration;

/// Turn one region's mask into LSSS ping records.
pub fn transform_region(region: &Region, calibration: &Calibration) -> Result<Vec<PingRecord>> {
    transform_mask(region.id, &region.mask, calibration)
}

/// Convert a ragged mask into one [`PingRecord`] per timestamp.
///
/// Records keep the order of `mask.times`; ping numbers are neither sorted
/// nor de-duplicated. Each flattened depth list is split into consecutive
/// `(start, stop)` pairs and shifted by the calibration's depth offsets.
///
/// Fails on the first ping whose depth list has an odd length.
pub fn transform_mask(
    region_id: i64,
    mask: &MaskGeometry,
    calibration: &Calibration,
) -> Result<Vec<PingRecord>> {
    if mask.times.len() != mask.depths.len() {
        return Err(MaskError::MisalignedMask {
            region_id,
            times: mask.times.len(),
            depths: mask.depths.len(),
        });
    }

    mask.times
        .iter()
        .zip(&mask.depths)
        .enumerate()
        .map(|(ping_index, (&time, depths))| {
            if depths.len() % 2 != 0 {
                return Err(MaskError::MalformedMask {
                    region_id,
                    ping_index,
                    len: depths.len(),
                });
            }

            let depth_ranges = depths
                .chunks_exact(2)
                .map(|pair| calibration.depth.apply(pair[0], pair[1]))
                .collect();

            Ok(PingRecord {
                ping_number: calibration.clock.ping_number(time)?,
                depth_ranges,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::data::model::DepthRange;
    use crate::mask::calibration::{DepthCorrection, LinearPingClock, PingClock};

    fn mask(times: Vec<f64>, depths: Vec<Vec<f64>>) -> MaskGeometry {
        MaskGeometry { times, depths }
    }

    #[test]
    fn two_ping_region_produces_offset_ranges() {
        let cal = Calibration::default();
        let m = mask(
            vec![100_000.0, 200_000.0],
            vec![vec![10.0, 20.0], vec![15.0, 60.0, 70.0, 90.0]],
        );

        let records = transform_mask(1, &m, &cal).unwrap();

        assert_eq!(
            records,
            vec![
                PingRecord {
                    ping_number: -13_189_163_900,
                    depth_ranges: vec![DepthRange { min: 60.0, max: 77.0 }],
                },
                PingRecord {
                    ping_number: -13_189_163_800,
                    depth_ranges: vec![
                        DepthRange { min: 65.0, max: 117.0 },
                        DepthRange { min: 120.0, max: 147.0 },
                    ],
                },
            ]
        );
    }

    #[test]
    fn empty_mask_yields_no_records() {
        let records = transform_mask(1, &MaskGeometry::default(), &Calibration::default()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn odd_depth_list_is_malformed() {
        let m = mask(vec![1.0, 2.0], vec![vec![1.0, 2.0], vec![1.0, 2.0, 3.0]]);
        let err = transform_mask(9, &m, &Calibration::default()).unwrap_err();
        assert!(matches!(
            err,
            MaskError::MalformedMask {
                region_id: 9,
                ping_index: 1,
                len: 3
            }
        ));
    }

    #[test]
    fn misaligned_mask_is_rejected() {
        let m = mask(vec![1.0, 2.0], vec![vec![1.0, 2.0]]);
        let err = transform_mask(4, &m, &Calibration::default()).unwrap_err();
        assert!(matches!(err, MaskError::MisalignedMask { times: 2, depths: 1, .. }));
    }

    #[test]
    fn duplicate_ping_numbers_are_kept_in_order() {
        let m = mask(vec![5_000.0, 5_500.0], vec![vec![], vec![]]);
        let records = transform_mask(1, &m, &Calibration::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ping_number, records[1].ping_number);
        assert!(records[0].depth_ranges.is_empty());
    }

    #[test]
    fn injected_calibration_replaces_constants() {
        let cal = Calibration::new(
            LinearPingClock {
                scale: 10_000,
                epoch: 100,
            },
            DepthCorrection {
                min_offset: 0.0,
                max_offset: 0.0,
            },
        );
        let m = mask(vec![2_000_000.0], vec![vec![30.5, 34.0]]);
        let records = transform_mask(1, &m, &cal).unwrap();
        assert_eq!(records[0].ping_number, 100);
        assert_eq!(records[0].depth_ranges, vec![DepthRange { min: 30.5, max: 34.0 }]);
    }

    #[test]
    fn unrepresentable_time_stops_the_region() {
        let cal = Calibration::new(
            LinearPingClock { scale: 1, epoch: -1 },
            DepthCorrection::default(),
        );
        let m = mask(vec![1.0, f64::MAX], vec![vec![], vec![]]);
        let err = transform_mask(3, &m, &cal).unwrap_err();
        assert!(matches!(err, MaskError::Decode(_)));
    }

    fn even_depths() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec((0.0f64..500.0, 0.0f64..500.0), 0..4)
            .prop_map(|pairs| pairs.into_iter().flat_map(|(a, b)| [a, b]).collect())
    }

    proptest! {
        #[test]
        fn offsets_apply_to_every_pair(depths in prop::collection::vec(even_depths(), 1..20)) {
            let times: Vec<f64> = (0..depths.len()).map(|i| i as f64 * 1000.0).collect();
            let records = transform_mask(1, &mask(times, depths.clone()), &Calibration::default()).unwrap();

            prop_assert_eq!(records.len(), depths.len());
            for (rec, raw) in records.iter().zip(&depths) {
                prop_assert_eq!(rec.depth_ranges.len(), raw.len() / 2);
                for (range, pair) in rec.depth_ranges.iter().zip(raw.chunks_exact(2)) {
                    prop_assert_eq!(range.min, pair[0] + 50.0);
                    prop_assert_eq!(range.max, pair[1] + 57.0);
                }
            }
        }

        #[test]
        fn ping_numbers_follow_monotonic_times(mut times in prop::collection::vec(0u64..10_000_000_000, 0..50)) {
            times.sort_unstable();
            let times: Vec<f64> = times.into_iter().map(|t| t as f64).collect();
            let depths = vec![Vec::new(); times.len()];
            let records = transform_mask(1, &mask(times.clone(), depths), &Calibration::default()).unwrap();

            let clock = LinearPingClock::default();
            for (rec, &t) in records.iter().zip(&times) {
                prop_assert_eq!(rec.ping_number, clock.ping_number(t).unwrap());
            }
            for w in records.windows(2) {
                prop_assert!(w[0].ping_number <= w[1].ping_number);
            }
        }
    }
}
