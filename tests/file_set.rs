use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rstest::rstest;
use rstest_reuse::{apply, template};
use traceseries::file_set::Error;
use traceseries::{FileCount, FileSpacing, FilenameTemplate, RegularFileSet, Timestamp};
use traceseries_test_support::t;

fn name_template() -> Arc<FilenameTemplate> {
    Arc::new(
        FilenameTemplate::from_pattern(
            "{YYYY}/{MM}/{DD}/cbt_processed_{YYYY}{MM}{DD}_{HH}{mm}{SS}.{mmm}+0000.sgy",
        )
        .unwrap(),
    )
}

fn set(start: Timestamp, spacing_ms: i64, count: u64) -> RegularFileSet {
    RegularFileSet::new(
        name_template(),
        start,
        FileSpacing::from_millis(spacing_ms).unwrap(),
        FileCount::Bounded(count),
    )
    .unwrap()
}

fn ms(n: i64) -> Duration {
    Duration::milliseconds(n)
}

#[template]
#[rstest]
#[case(t(0, 0, 0), 30_000, 120)]
#[case(t(23, 59, 0), 60_000, 3)]
#[case(t(0, 0, 0) + Duration::milliseconds(250), 1_500, 7)]
#[case(t(12, 0, 0), 10_001, 1)]
fn file_sets(#[case] start: Timestamp, #[case] spacing_ms: i64, #[case] count: u64) {}

#[apply(file_sets)]
fn name_at_start_is_first_file(#[case] start: Timestamp, #[case] spacing_ms: i64, #[case] count: u64) {
    let set = set(start, spacing_ms, count);
    let name = set.file_name_at(start).unwrap();
    assert_eq!(set.file_name_at(start).unwrap(), name);
    assert_eq!(name, name_template().render(start));
}

#[apply(file_sets)]
fn end_is_exclusive(#[case] start: Timestamp, #[case] spacing_ms: i64, #[case] count: u64) {
    let set = set(start, spacing_ms, count);
    let end = set.end_time();
    assert_eq!(end, start + ms(spacing_ms * count as i64));

    let last_start = start + ms(spacing_ms * (count as i64 - 1));
    assert_eq!(set.file_start_at(end - ms(1)).unwrap(), last_start);
    assert_eq!(set.last_file_name(), Some(name_template().render(last_start)));
    assert!(matches!(
        set.file_name_at(end),
        Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(
        set.file_name_at(start - ms(1)),
        Err(Error::OutOfRange { .. })
    ));
}

#[apply(file_sets)]
fn whole_set_lists_every_file(#[case] start: Timestamp, #[case] spacing_ms: i64, #[case] count: u64) {
    let set = set(start, spacing_ms, count);
    let names = set
        .file_names_in_range(start - Duration::days(1), set.end_time() + Duration::days(1))
        .unwrap();
    assert_eq!(names.len() as u64, count);
    assert_eq!(names.last().cloned(), set.last_file_name());
}

#[test]
fn random_ranges_list_the_covered_files() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5eed);

    for _ in 0..500 {
        let spacing_ms = rng.random_range(1..120_000);
        let count = rng.random_range(1..500);
        let start = t(0, 0, 0) + ms(rng.random_range(0..86_400_000));
        let set = set(start, spacing_ms, count);

        let span = spacing_ms * count as i64;
        let a = start + ms(rng.random_range(-span..span));
        let b = a + ms(rng.random_range(0..span));

        let starts = set.file_starts_in_range(a, b).unwrap();
        if a == b {
            assert!(starts.is_empty(), "empty range {a} listed files");
        }
        assert!(starts.windows(2).all(|w| w[0] < w[1]), "not ascending");

        let from = a.max(start);
        let till = b.min(set.end_time());
        let expected = if from < till {
            let first = (from - start).num_milliseconds() / spacing_ms;
            let stop = ((till - start).num_milliseconds() + spacing_ms - 1) / spacing_ms;
            (stop - first) as usize
        } else {
            0
        };
        assert_eq!(starts.len(), expected, "range {a}..{b} of {set}");

        if let Some(first) = starts.first() {
            assert_eq!(*first, set.file_start_at(from).unwrap());
        }
        for file_start in &starts {
            assert!(*file_start < b && *file_start + ms(spacing_ms) > a);
        }
    }
}

#[test]
fn range_in_one_file() {
    let set = set(t(0, 0, 0), 30_000, 120);
    let names = set.file_names_in_range(t(0, 0, 31), t(0, 0, 32)).unwrap();
    assert_eq!(names, vec![name_template().render(t(0, 0, 30))]);
}

#[test]
fn range_must_be_ordered() {
    let set = set(t(0, 0, 0), 30_000, 120);
    assert!(matches!(
        set.file_names_in_range(t(0, 1, 0), t(0, 0, 0)),
        Err(Error::InvalidRange { .. })
    ));
    assert!(set
        .file_names_in_range(t(0, 1, 0), t(0, 1, 0))
        .unwrap()
        .is_empty());
    assert!(set
        .file_names_in_range(t(0, 0, 45), t(0, 0, 45))
        .unwrap()
        .is_empty());
}

#[test]
fn range_outside_set_is_empty() {
    let set = set(t(1, 0, 0), 30_000, 10);
    assert!(set.file_names_in_range(t(0, 0, 0), t(1, 0, 0)).unwrap().is_empty());
    assert!(set.file_names_in_range(t(1, 5, 0), t(2, 0, 0)).unwrap().is_empty());
}

#[rstest]
#[case(t(0, 0, 0), 10, t(0, 5, 0), 10)]
#[case(t(0, 0, 0), 10, t(0, 2, 0), 10)]
#[case(t(0, 0, 0), 10, t(0, 1, 0), 2)]
#[case(t(0, 0, 0), 20, t(0, 1, 0), 2)]
fn union_commutes(
    #[case] a_start: Timestamp,
    #[case] a_count: u64,
    #[case] b_start: Timestamp,
    #[case] b_count: u64,
) {
    let a = set(a_start, 30_000, a_count);
    let b = set(b_start, 30_000, b_count);
    let ab = a.union(&b).unwrap();
    let ba = b.union(&a).unwrap();
    assert_eq!(ab, ba);
    assert_eq!(ab.start_time(), a.start_time().min(b.start_time()));
    assert_eq!(ab.end_time(), a.end_time().max(b.end_time()));
}

#[test]
fn union_needs_same_spacing() {
    let a = set(t(0, 0, 0), 30_000, 10);
    let b = set(t(0, 1, 0), 60_000, 10);
    assert_eq!(a.union(&b), None);
    assert_eq!(b.union(&a), None);
}

#[test]
fn union_needs_aligned_files() {
    let a = set(t(0, 0, 0), 30_000, 4);
    let b = set(t(0, 1, 10), 30_000, 4);
    assert_eq!(a.union(&b), None);
    assert_eq!(b.union(&a), None);
}

#[test]
fn union_needs_contact() {
    let a = set(t(0, 0, 0), 30_000, 2);
    let b = set(t(0, 1, 30), 30_000, 2);
    assert_eq!(a.union(&b), None);
    assert_eq!(b.union(&a), None);
}

#[test]
fn union_with_open_ended_set_is_open_ended() {
    let bounded = set(t(0, 0, 0), 30_000, 2);
    let open = RegularFileSet::new(
        name_template(),
        t(0, 1, 0),
        FileSpacing::from_millis(30_000).unwrap(),
        FileCount::OpenEnded,
    )
    .unwrap();
    let merged = bounded.union(&open).unwrap();
    assert_eq!(merged.file_count(), FileCount::OpenEnded);
    assert_eq!(merged.start_time(), t(0, 0, 0));
    assert_eq!(open.union(&bounded), Some(merged));
}

#[test]
fn open_ended_set_ends_now() {
    let open = RegularFileSet::new(
        name_template(),
        t(0, 0, 0),
        FileSpacing::from_millis(30_000).unwrap(),
        FileCount::OpenEnded,
    )
    .unwrap();
    let now = t(5, 0, 0);
    assert_eq!(open.end_time_at(now), now);
    assert!(open.end_time() > Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
}

#[test]
fn first_and_last_file_of_day() {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 23, 0, 0).unwrap();
    // two hours of 15 minute files, crossing midnight
    let set = set(start, 15 * 60_000, 8);
    let jan_1 = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let jan_2 = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let jan_3 = NaiveDate::from_ymd_opt(2020, 1, 3).unwrap();

    let template = name_template();
    assert_eq!(set.first_file_of_day(jan_1), Some(template.render(start)));
    assert_eq!(
        set.last_file_of_day(jan_1),
        Some(template.render(start + Duration::minutes(45)))
    );
    assert_eq!(
        set.first_file_of_day(jan_2),
        Some(template.render(start + Duration::hours(1)))
    );
    assert_eq!(
        set.last_file_of_day(jan_2),
        Some(template.render(start + Duration::minutes(105)))
    );
    assert_eq!(set.first_file_of_day(jan_3), None);
    assert_eq!(set.last_file_of_day(jan_3), None);
}

#[test]
fn adding_files() {
    let mut set = set(t(1, 0, 0), 30_000, 10);
    set.add_files_to_end(2).unwrap();
    assert_eq!(set.file_count(), FileCount::Bounded(12));
    assert_eq!(set.end_time(), t(1, 6, 0));

    set.add_files_to_start(4).unwrap();
    assert_eq!(set.file_count(), FileCount::Bounded(16));
    assert_eq!(set.start_time(), t(0, 58, 0));
    assert_eq!(set.end_time(), t(1, 6, 0));
}

#[test]
fn adding_too_many_files_leaves_set_unchanged() {
    let mut set = set(t(1, 0, 0), 30_000, 10);
    let before = set.clone();
    assert_eq!(set.add_files_to_end(u64::MAX), Err(Error::Overflow));
    assert_eq!(set.add_files_to_start(u64::MAX), Err(Error::Overflow));
    assert_eq!(set, before);
}
