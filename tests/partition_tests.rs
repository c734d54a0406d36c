//! Coverage properties of the price partition
use listing_harvester::domain::{PriceBand, PriceSchedule};
use proptest::prelude::*;

fn schedule_strategy() -> impl Strategy<Value = (u32, Vec<PriceBand>)> {
    (0u32..1_000, prop::collection::vec((1u32..2_000, 1u32..400), 1..6)).prop_map(|(floor, segments)| {
        let mut upper = floor;
        let bands = segments
            .into_iter()
            .map(|(span, step)| {
                upper += span;
                PriceBand::new(upper, step)
            })
            .collect();
        (floor, bands)
    })
}

proptest! {
    #[test]
    fn ranges_tile_floor_to_ceiling((floor, bands) in schedule_strategy()) {
        let schedule = PriceSchedule::new(floor, bands).unwrap();
        let ranges = schedule.partition();

        prop_assert!(!ranges.is_empty());
        prop_assert_eq!(ranges[0].min(), floor);
        prop_assert_eq!(ranges[ranges.len() - 1].max(), schedule.ceiling());
        for pair in ranges.windows(2) {
            prop_assert_eq!(pair[0].max(), pair[1].min());
        }
        for range in &ranges {
            prop_assert!(range.min() < range.max());
        }
    }

    #[test]
    fn no_window_is_wider_than_its_band((floor, bands) in schedule_strategy()) {
        let schedule = PriceSchedule::new(floor, bands.clone()).unwrap();
        let widest = bands.iter().map(|band| band.step).max().unwrap();

        for range in schedule.partition() {
            prop_assert!(range.width() <= widest);
        }
    }
}

#[test]
fn default_schedule_narrows_where_density_is_high() {
    let ranges = PriceSchedule::default().partition();

    assert_eq!(ranges.len(), 113);
    assert_eq!(ranges[0].query_label(), "0-49");
    assert_eq!(ranges[49].query_label(), "2450-2499");
    assert_eq!(ranges[50].query_label(), "2500-2599");
    assert_eq!(ranges[84].query_label(), "5900-5999");
    assert_eq!(ranges[85].query_label(), "6000-6499");
    assert_eq!(ranges[112].query_label(), "19500-19999");
}
