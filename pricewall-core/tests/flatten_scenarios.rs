//! End-to-end scenarios: records → classifier → flatten → virtualizer.

use std::sync::Arc;

use pricewall_core::domain::{AssetRecord, ClassifiedAsset};
use pricewall_core::{flatten, Catalog, Classifier, Filters, OffsetTable, SizeModel, VirtualRow};

fn record(source: &str, id: &str, name: &str, cap: Option<&str>) -> Arc<AssetRecord> {
    Arc::new(AssetRecord {
        source: source.into(),
        asset_id: id.into(),
        symbol: id.to_uppercase(),
        name: name.into(),
        value: "1".into(),
        change_pct: None,
        market_cap: cap.map(String::from),
    })
}

fn classify(records: &[Arc<AssetRecord>]) -> Vec<ClassifiedAsset> {
    Classifier::new(&Catalog::default_catalog())
        .unwrap()
        .classify_all(records)
}

fn caps(row: &VirtualRow) -> Vec<String> {
    match row {
        VirtualRow::Tiles { prices, .. } => prices
            .iter()
            .map(|p| p.record.market_cap.clone().unwrap_or_default())
            .collect(),
        other => panic!("expected tiles, got {other:?}"),
    }
}

#[test]
fn alpha_market_caps_two_columns() {
    let records = vec![
        record("alpha", "a1", "One", Some("500")),
        record("alpha", "a2", "Two", Some("100")),
        record("alpha", "a3", "Three", Some("9999")),
    ];
    let out = flatten(&classify(&records), &Filters::default(), 2, &Catalog::default_catalog());

    assert_eq!(out.rows.len(), 3);
    assert_eq!(
        out.rows[0],
        VirtualRow::Header {
            source: "alpha".into(),
            count: 3
        }
    );
    assert_eq!(caps(&out.rows[1]), vec!["9999", "500"]);
    assert_eq!(caps(&out.rows[2]), vec!["100"]);
    assert_eq!(out.total_matched, 3);
}

#[test]
fn single_asset_source_is_one_header_one_tile_row() {
    let records = vec![record("npm", "react", "React", None)];
    let out = flatten(&classify(&records), &Filters::default(), 4, &Catalog::default_catalog());
    assert_eq!(out.rows.len(), 2);
    assert!(matches!(out.rows[0], VirtualRow::Header { count: 1, .. }));
    assert_eq!(out.rows[1].tile_count(), 1);
}

#[test]
fn prediction_markets_group_by_first_matching_rule() {
    let records = vec![
        record("polymarket", "m1", "Will the Lakers win the NBA Finals?", Some("10")),
        record("polymarket", "m2", "Crypto.com Arena to host NBA Finals?", Some("20")),
        record("polymarket", "m3", "Will Bitcoin hit $200k?", Some("30")),
        record("polymarket", "m4", "Will it rain frogs?", Some("40")),
    ];
    let out = flatten(&classify(&records), &Filters::default(), 4, &Catalog::default_catalog());

    let groups: Vec<(String, usize)> = out
        .rows
        .iter()
        .filter_map(|r| match r {
            VirtualRow::Subheader { label, count, .. } => Some((label.clone(), *count)),
            _ => None,
        })
        .collect();
    assert_eq!(
        groups,
        vec![
            ("Sports".to_string(), 2),
            ("Crypto".to_string(), 1),
            ("Other".to_string(), 1),
        ]
    );
}

#[test]
fn weather_unknown_feed_type_is_grouped_not_dropped() {
    let records = vec![
        record("weather", "KNYC:temp", "New York", None),
        record("weather", "KNYC:uv", "New York", None),
    ];
    let out = flatten(&classify(&records), &Filters::default(), 4, &Catalog::default_catalog());
    assert_eq!(out.total_matched, 2);
    assert!(out
        .rows
        .iter()
        .any(|r| matches!(r, VirtualRow::Subheader { label, .. } if label == "uv")));
}

#[test]
fn filters_narrow_in_order() {
    let records = vec![
        record("coingecko", "bitcoin", "Bitcoin", Some("100")),
        record("coinbase", "btc-usd", "Bitcoin", Some("90")),
        record("npm", "bitcoinjs", "bitcoinjs-lib", None),
    ];
    let assets = classify(&records);
    let catalog = Catalog::default_catalog();

    let by_category = flatten(&assets, &Filters::default().category("crypto"), 4, &catalog);
    assert_eq!(by_category.total_matched, 2);

    let by_source = flatten(
        &assets,
        &Filters::default().category("crypto").source("coinbase"),
        4,
        &catalog,
    );
    assert_eq!(by_source.total_matched, 1);

    let contradictory = flatten(
        &assets,
        &Filters::default().category("crypto").source("npm"),
        4,
        &catalog,
    );
    assert!(contradictory.is_empty());

    let search = flatten(&assets, &Filters::default().search("BITCOIN"), 4, &catalog);
    assert_eq!(search.total_matched, 3);
}

#[test]
fn flattened_rows_feed_the_virtualizer() {
    let records: Vec<_> = (0..50)
        .map(|i| record("npm", &format!("pkg{i:02}"), "pkg", Some(&i.to_string())))
        .collect();
    let out = flatten(&classify(&records), &Filters::default(), 5, &Catalog::default_catalog());
    // 1 header + 10 tile rows.
    assert_eq!(out.rows.len(), 11);

    let sizes = SizeModel::new(2, 1, 3);
    let table = OffsetTable::for_rows(&out.rows, &sizes);
    assert_eq!(table.total_extent(), 2 + 10 * 3);

    let window = table.window(0, 8, 1);
    assert_eq!(window.visible, 0..3);
    assert_eq!(window.rendered, 0..4);
}
