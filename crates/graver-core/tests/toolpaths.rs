use graver_core::{Error, Path, PathGroup, Point, SortPredicate, Surface};

fn square(side: f64, x0: f64, y0: f64) -> Path {
    Path::from_components(
        &[x0, x0 + side, x0 + side, x0, x0],
        &[y0, y0, y0 + side, y0 + side, y0],
        &[0.0; 5],
        &[0.0; 5],
    )
}

#[test]
fn test_pocket_milling_pipeline() {
    let surface = Surface::from_contour(square(20.0, 0.0, 0.0));
    let paths = surface.get_milling_paths(4.0, 4.0).unwrap();
    assert!(paths.len() >= 3);
    // innermost pass comes first and collapses to the pocket centre
    assert_eq!(paths[0].len(), 1);
    let centre = paths[0][0];
    assert!((centre.x - 10.0).abs() < 1e-6);
    assert!((centre.y - 10.0).abs() < 1e-6);
    // all offset loops stay inside the pocket with tool clearance
    for path in paths.iter().skip(1) {
        for pt in path.iter() {
            assert!(pt.x > 1.9 && pt.x < 18.1);
            assert!(pt.y > 1.9 && pt.y < 18.1);
        }
    }
    // the milled surface covers most of the pocket
    let milled = surface.get_milled_surface(4.0, 4.0).unwrap();
    assert!(!milled.is_empty());
    assert!(milled[0].contains(&Point::xy(10.0, 10.0)));
}

#[test]
fn test_boolean_algebra_on_overlapping_pockets() {
    let a = Surface::from_contour(square(10.0, 0.0, 0.0));
    let b = Surface::from_contour(square(10.0, 5.0, 0.0));
    let union = a.union(&b);
    assert_eq!(union.len(), 1);
    assert!(union[0].contains(&Point::xy(12.0, 5.0)));
    let inter = a.intersection(&b);
    assert_eq!(inter.len(), 1);
    assert!(inter[0].contains(&Point::xy(7.0, 5.0)));
    assert!(!inter[0].contains(&Point::xy(2.0, 5.0)));
    let diff = a.difference(&b);
    assert_eq!(diff.len(), 1);
    assert!(diff[0].contains(&Point::xy(2.0, 5.0)));
    assert!(!diff[0].contains(&Point::xy(7.0, 5.0)));
}

#[test]
fn test_height_masking_over_fixture() {
    // fixture occupies the left half of the work area
    let fixture = Surface::from_contour(square(10.0, 0.0, 0.0));
    let pass = Path::from_components(
        &[-5.0, 5.0, 15.0],
        &[5.0, 5.0, 5.0],
        &[-1.0, -1.0, -1.0],
        &[0.0; 3],
    );
    let corrected = fixture.correct_height(&[pass], 0.0, 3.0, false, false);
    assert_eq!(corrected.len(), 1);
    // the point over the fixture is lifted, the rest keeps cutting depth
    assert!((corrected[0][0].z + 1.0).abs() < 1e-12);
    assert!((corrected[0][1].z - 3.0).abs() < 1e-12);
    assert!((corrected[0][2].z + 1.0).abs() < 1e-12);
}

#[test]
fn test_group_sorting_follows_tool_position() {
    let far = square(2.0, 50.0, 0.0);
    let near = square(2.0, 1.0, 1.0);
    let mid = square(2.0, 20.0, 5.0);
    let group = PathGroup::from(vec![far, near, mid]);
    let sorted = group.sort_paths(&Point::xy(0.0, 0.0), SortPredicate::StartToStart);
    assert_eq!(sorted.len(), 3);
    assert!((sorted[0][0].x - 1.0).abs() < 1e-12);
    assert!((sorted[1][0].x - 20.0).abs() < 1e-12);
    assert!((sorted[2][0].x - 50.0).abs() < 1e-12);
}

#[test]
fn test_group_reorder_rejects_bad_index() {
    let group = PathGroup::from(vec![square(1.0, 0.0, 0.0)]);
    assert!(matches!(
        group.reorder(&[1]),
        Err(Error::OutOfRange { index: 1, len: 1 })
    ));
    let same = group.reorder(&[0]).unwrap();
    assert_eq!(same.len(), 1);
}

#[test]
fn test_toolpaths_persist_as_json() {
    let group = PathGroup::from(vec![square(2.0, 0.0, 0.0)]);
    let json = serde_json::to_string(&group).unwrap();
    let restored: PathGroup = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, group);
}

#[test]
fn test_envelope_of_disjoint_contours() {
    let group = PathGroup::from(vec![square(4.0, 0.0, 0.0), square(4.0, 10.0, 0.0)]);
    let envelope = group.get_envelope();
    assert_eq!(envelope.len(), 2);
}
