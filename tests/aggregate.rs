use geostats::algo::great_circle_distance;
use geostats::{
    BoundingBox, Feature, GeoStats, Geometry, Position, StatsError, StatsOptions, TileId,
};
use geo_types::Coord;

fn pos(x: f64, y: f64) -> Position {
    Position::new(x, y)
}

fn feature(json: &str) -> Feature {
    Feature::from_json(json).expect("feature")
}

#[test]
fn single_point_with_tiles() {
    let mut stats = GeoStats::new(StatsOptions::with_max_zoom(2)).expect("stats");
    let input = Feature::new(Geometry::Point(pos(0.0, 0.0)));
    let output = stats.process(input.clone()).expect("process");
    assert_eq!(output, input);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.features, 1);
    assert_eq!(snapshot.coordinates.count, 1);
    assert_eq!(snapshot.coordinates.mean, Some(1.0));
    assert_eq!(snapshot.density.count, 0);
    assert_eq!(snapshot.density.mean, None);
    assert_eq!(snapshot.duplicates.count, 1);
    assert_eq!(snapshot.duplicates.mean, Some(0.0));
    assert_eq!(snapshot.bbox, Some(BoundingBox::new(0.0, 0.0, 0.0, 0.0)));

    let tiles = snapshot.tiles.expect("tiles enabled");
    assert!(tiles.contains(&TileId::new(0, 0, 0)));
    assert!(tiles.contains(&TileId::new(1, 1, 1)));
    assert!(tiles.contains(&TileId::new(2, 2, 2)));
    assert_eq!(tiles.iter().filter(|tile| tile.zoom == 0).count(), 1);
    assert_eq!(tiles.len(), 9);
}

#[test]
fn linestring_with_duplicate_pair() {
    let mut stats = GeoStats::new(StatsOptions::default()).expect("stats");
    stats
        .process(Feature::new(Geometry::LineString(vec![
            pos(0.0, 0.0),
            pos(0.0, 0.0),
            pos(1.0, 1.0),
        ])))
        .expect("process");

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.coordinates.count, 1);
    assert_eq!(snapshot.coordinates.mean, Some(3.0));
    assert_eq!(snapshot.duplicates.count, 1);
    assert_eq!(snapshot.duplicates.mean, Some(1.0));
    assert_eq!(snapshot.density.count, 1);
    let expected = great_circle_distance(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
    assert_eq!(snapshot.density.mean, Some(expected));
    assert!((expected - 157_249.0).abs() < 100.0, "{expected}");
    assert!(snapshot.tiles.is_none());
}

#[test]
fn empty_stream_snapshot() {
    for options in [StatsOptions::default(), StatsOptions::with_max_zoom(5)] {
        let stats = GeoStats::new(options).expect("stats");
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.features, 0);
        assert_eq!(snapshot.bbox, None);
        assert!(snapshot.density.is_empty());
        assert!(snapshot.duplicates.is_empty());
        assert!(snapshot.coordinates.is_empty());
        match options.max_zoom {
            Some(_) => assert_eq!(snapshot.tiles, Some(vec![])),
            None => assert_eq!(snapshot.tiles, None),
        }
    }
}

#[test]
fn empty_stream_json_omits_tiles_when_disabled() {
    let stats = GeoStats::new(StatsOptions::default()).expect("stats");
    let value = serde_json::to_value(stats.snapshot()).expect("json");
    assert!(value.get("tiles").is_none());
    assert!(value["bbox"].is_null());
    assert_eq!(value["features"], 0);
    assert!(value["density"]["mean"].is_null());
}

#[test]
fn multipolygon_with_disjoint_parts() {
    let mut stats = GeoStats::new(StatsOptions::default()).expect("stats");
    stats
        .process(feature(
            r#"{"type":"Feature","properties":{"name":"islands"},"geometry":{"type":"MultiPolygon","coordinates":[
                [[[0,0],[1,0],[1,1],[0,0]]],
                [[[10,10],[12,10],[12,13],[10,10]]]
            ]}}"#,
        ))
        .expect("process");

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.coordinates.mean, Some(8.0));
    assert_eq!(snapshot.bbox, Some(BoundingBox::new(0.0, 0.0, 12.0, 13.0)));
    assert_eq!(snapshot.duplicates.mean, Some(0.0));
    // Seven consecutive pairs including the jump between the two polygons.
    assert_eq!(snapshot.density.count, 7);
}

#[test]
fn feature_count_matches_successful_records() {
    let mut stats = GeoStats::new(StatsOptions::with_max_zoom(1)).expect("stats");
    let records = [
        r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[5,5]}}"#,
        r#"{"type":"Feature","geometry":{"type":"LineString","coordinates":[]}}"#,
        r#"{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[2,0],[2,2],[0,0]]]}}"#,
        r#"{"type":"Feature","geometry":null}"#,
        r#"{"type":"Feature","geometry":{"type":"MultiLineString","coordinates":[[[1,1],[1,1]],[[3,3]]]}}"#,
    ];
    let mut ok = 0;
    for record in records {
        let result = Feature::from_json(record).and_then(|feature| stats.process(feature));
        match result {
            Ok(_) => ok += 1,
            Err(err) => assert!(matches!(err, StatsError::InvalidGeometry(_))),
        }
    }
    assert_eq!(ok, 3);
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.features, 3);
    assert_eq!(snapshot.coordinates.count, 3);
    assert_eq!(snapshot.duplicates.sum, 1.0);
    assert_eq!(snapshot.bbox, Some(BoundingBox::new(0.0, 0.0, 5.0, 5.0)));
}

#[test]
fn bbox_never_shrinks() {
    let mut stats = GeoStats::new(StatsOptions::default()).expect("stats");
    let features = [
        Geometry::Point(pos(3.0, 3.0)),
        Geometry::LineString(vec![pos(-1.0, 2.0), pos(0.0, 4.0)]),
        Geometry::Point(pos(1.0, 1.0)),
        Geometry::MultiPoint(vec![pos(50.0, -20.0)]),
    ];
    let mut previous: Option<BoundingBox> = None;
    for geometry in features {
        stats.process(Feature::new(geometry)).expect("process");
        let current = stats.snapshot().bbox.expect("bbox");
        if let Some(previous) = previous {
            assert!(current.contains(&previous));
        }
        previous = Some(current);
    }
    assert_eq!(previous, Some(BoundingBox::new(-1.0, -20.0, 50.0, 4.0)));
}

#[test]
fn tiles_have_no_duplicates_across_features() {
    let mut stats = GeoStats::new(StatsOptions::with_max_zoom(6)).expect("stats");
    for _ in 0..3 {
        stats
            .process(Feature::new(Geometry::LineString(vec![
                pos(-10.0, -10.0),
                pos(10.0, 10.0),
            ])))
            .expect("process");
    }
    let tiles = stats.snapshot().tiles.expect("tiles");
    let mut sorted = tiles.clone();
    sorted.dedup();
    assert_eq!(sorted, tiles);
    assert!(tiles.iter().all(|tile| tile.zoom <= 6));
    assert_eq!(tiles.iter().filter(|tile| tile.zoom == 0).count(), 1);
}

#[test]
fn snapshot_is_repeatable_and_processing_continues() {
    let mut stats = GeoStats::new(StatsOptions::default()).expect("stats");
    stats
        .process(Feature::new(Geometry::Point(pos(1.0, 1.0))))
        .expect("process");
    let first = stats.snapshot();
    assert_eq!(first, stats.snapshot());
    stats
        .process(Feature::new(Geometry::Point(pos(2.0, 2.0))))
        .expect("process");
    assert_eq!(stats.snapshot().features, 2);
    assert_eq!(first.features, 1);
}

#[test]
fn passthrough_keeps_members() {
    let mut stats = GeoStats::new(StatsOptions::default()).expect("stats");
    let input = feature(
        r#"{"type":"Feature","id":"abc","properties":{"height":12.5},"geometry":{"type":"Point","coordinates":[1,2]}}"#,
    );
    let output: Vec<Feature> = stats
        .stream(vec![input.clone()])
        .collect::<geostats::Result<_>>()
        .expect("stream");
    assert_eq!(output, vec![input]);
    let value = serde_json::to_value(&output[0]).expect("json");
    assert_eq!(value["id"], "abc");
    assert_eq!(value["properties"]["height"], 12.5);
}
