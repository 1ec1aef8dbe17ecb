use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rstest::rstest;
use traceseries::template::ParseError;
use traceseries::FilenameTemplate;

const CANONICAL: &str =
    "/data/{YYYY}/{MM}/{DD}/cbt_processed_{YYYY}{MM}{DD}_{HH}{mm}{SS}.{mmm}+0000.sgy";

#[test]
fn renders_canonical_name() {
    let template = FilenameTemplate::from_pattern(CANONICAL).unwrap();
    let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 30).unwrap() + Duration::milliseconds(7);
    assert_eq!(
        template.render(ts).to_str().unwrap(),
        "/data/2020/01/01/cbt_processed_20200101_000030.007+0000.sgy"
    );
}

#[test]
fn random_times_survive_render_then_parse() {
    let template = FilenameTemplate::from_pattern(CANONICAL).unwrap();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    let base = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();

    for _ in 0..1_000 {
        // roughly 60 years in milliseconds
        let offset = rng.random_range(0..1_900_000_000_000i64);
        let ts = base + Duration::milliseconds(offset);
        let name = template.render(ts);
        assert_eq!(template.parse(&name).unwrap(), ts, "name: {}", name.display());
    }
}

#[rstest]
#[case("{YYYY}{MM}{DD}T{HH}{mm}{SS}.sgy", "20200101T000030.sgy", "2020-01-01T00:00:30Z")]
#[case("{YYYY}-{MM}-{DD}_{HH}.dat", "2016-12-31_23.dat", "2016-12-31T23:00:00Z")]
#[case("x{DD}{MM}{YYYY}{mmm}", "x29022020199", "2020-02-29T00:00:00.199Z")]
fn parses_other_layouts(#[case] pattern: &str, #[case] name: &str, #[case] expected: &str) {
    let template = FilenameTemplate::from_pattern(pattern).unwrap();
    let expected: traceseries::Timestamp = expected.parse().unwrap();
    assert_eq!(template.parse(name).unwrap(), expected);
}

#[rstest]
#[case("/data/2020/01/01/cbt_processed_20200101_000030.007+0000.sgy.bak")]
#[case("/data/2020/01/02/cbt_processed_20200101_000030.007+0000.sgy")]
#[case("/elsewhere/2020/01/01/cbt_processed_20200101_000030.007+0000.sgy")]
#[case("/data/2020/13/01/cbt_processed_20201301_000030.007+0000.sgy")]
fn rejects_names_not_made_by_template(#[case] name: &str) {
    let template = FilenameTemplate::from_pattern(CANONICAL).unwrap();
    assert!(template.parse(name).is_err(), "parsed {name}");
}

#[test]
fn date_is_needed_to_parse() {
    let template = FilenameTemplate::from_pattern("{HH}{mm}{SS}.sgy").unwrap();
    assert!(matches!(
        template.parse("000030.sgy"),
        Err(ParseError::MissingDate)
    ));
}

#[test]
fn serializes_as_pattern() {
    let template = FilenameTemplate::from_pattern(CANONICAL).unwrap();
    let ron = ron::to_string(&template).unwrap();
    assert_eq!(ron, format!("{CANONICAL:?}"));
    let back: FilenameTemplate = ron::from_str(&ron).unwrap();
    assert_eq!(back, template);
}
