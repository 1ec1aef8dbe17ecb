use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use temp_dir::TempDir;
use traceseries::config::Error;
use traceseries::{ByteOrder, Config, LeapSecond, MemoryIndex, TraceLayout};
use traceseries_test_support::{seconds, setup_tracing, t, Archive};

#[test]
fn optional_fields_default() {
    let config = Config::from_ron_str(
        r#"(
            template: "/data/{YYYY}{MM}{DD}_{HH}{mm}{SS}.{mmm}.sgy",
            channels: [14, 15, 16],
            sampling_rate: 50.0,
        )"#,
    )
    .unwrap();

    assert_eq!(config.channels, vec![14, 15, 16]);
    assert_eq!(config.layout, TraceLayout::default());
    assert_eq!(config.byte_order, ByteOrder::Big);
    assert_eq!(config.leap_second, None);
    assert_eq!(config.catalog, None);
    assert!(matches!(config.open_catalog(), Err(Error::NoCatalog)));
}

#[test]
fn all_fields() {
    let config = Config::from_ron_str(
        r#"(
            template: "{YYYY}{MM}{DD}_{HH}{mm}{SS}.sgy",
            channels: [1],
            sampling_rate: 1000.0,
            layout: (trace_header_bytes: 0),
            byte_order: Little,
            leap_second: Some((instant: "2016-12-31T23:59:59Z")),
            catalog: Some("/var/lib/catalog.ron"),
        )"#,
    )
    .unwrap();

    assert_eq!(
        config.layout,
        TraceLayout {
            trace_header_bytes: 0,
            ..TraceLayout::default()
        }
    );
    assert_eq!(config.byte_order, ByteOrder::Little);
    assert_eq!(config.leap_second, Some(LeapSecond::end_of_2016()));

    let again = Config::from_ron_str(&config.to_ron_string().unwrap()).unwrap();
    assert_eq!(again, config);
}

#[test]
fn bad_template_is_rejected() {
    let err = Config::from_ron_str(
        r#"(template: "{YYYY}{QQ}", channels: [1], sampling_rate: 50.0)"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Deserialize(_)), "{err}");
}

#[test]
fn invalid_settings_fail_to_open() {
    setup_tracing();
    let test_dir = TempDir::new().unwrap();
    let catalog = test_dir.child("catalog.ron");
    fs::write(&catalog, "[]").unwrap();

    let config = Config::from_ron_str(&format!(
        r#"(
            template: "{{YYYY}}{{MM}}{{DD}}.sgy",
            channels: [],
            sampling_rate: 50.0,
            catalog: Some({catalog:?}),
        )"#
    ))
    .unwrap();
    assert!(matches!(config.open_reader(), Err(Error::Reader(_))));
}

#[test]
fn reader_from_config_file() {
    setup_tracing();
    let test_dir = TempDir::new().unwrap();
    let archive = Archive::new(&test_dir.path().join("archive"));
    let set = archive.write_set(t(0, 0, 0), 30, 4);

    let mut index = MemoryIndex::new(Arc::clone(&archive.template));
    index.insert(set);
    index.save_ron(&test_dir.child("file_sets.ron")).unwrap();

    let config = Config {
        template: (*archive.template).clone(),
        channels: vec![2, 8],
        sampling_rate: archive.sampling_rate,
        layout: archive.layout,
        byte_order: archive.byte_order,
        leap_second: None,
        catalog: Some("file_sets.ron".into()),
    };
    let config_path = test_dir.child("reader.ron");
    fs::write(&config_path, config.to_ron_string().unwrap()).unwrap();

    let loaded = Config::load(&config_path).unwrap();
    assert_eq!(loaded.catalog, Some(test_dir.child("file_sets.ron")));

    let reader = loaded.open_reader().unwrap();
    let start = t(0, 0, 40);
    let buffer = reader.read(start, seconds(30)).unwrap().data().unwrap();
    let n = buffer.sample_count();
    assert_eq!(buffer.channels(), &[2, 8]);
    assert_eq!(buffer.channel(8).unwrap(), archive.expected(8, start, n).as_slice());
}
