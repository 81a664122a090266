//! End-to-end repair of TOML scenes

use layout_repair::scene::loss::overlap_area;
use layout_repair::{
    repair, repair_scene, CleanupConfig, Point, RepairConfig, RepairError, Scene, SceneError,
};
use pretty_assertions::assert_eq;

const BEDROOM: &str = r#"
[room]
boundary = [[0, 0], [5, 0], [5, 4], [0, 4]]

[[asset]]
id = "bed"
size = [1, 1]
position = [2.0, 2.0]

[[asset]]
id = "desk"
size = [1, 1]
position = [2.5, 2.0]

[[asset]]
id = "window"
size = [1.0, 0.2]
position = [2.5, 4.0]
fixture = true

[[asset]]
id = "closet"
size = [1, 0.6]
position = [4.2, 0.5]

[[asset]]
id = "rug"
size = [1, 1]
position = [0.6, 0.6]
optimize = false

[[constraints.existing]]
kind = "inside_boundary"
asset = "bed"

[[constraints.new]]
kind = "inside_boundary"
asset = "desk"
"#;

#[test]
fn test_repair_reduces_overlap() {
    let scene = Scene::from_str(BEDROOM).unwrap();
    let before = overlap_area(&scene, scene.assets());
    assert!((before - 0.5).abs() < 1e-6);

    let outcome = repair_scene(scene, &RepairConfig::new()).unwrap();
    let after = overlap_area(&outcome.scene, outcome.scene.assets());

    assert!(after < before, "overlap went from {before} to {after}");
    assert_eq!(outcome.report.steps, 40);
    assert_eq!(outcome.report.projections, 4);
}

#[test]
fn test_uninvolved_assets_keep_pose_and_flags() {
    let outcome = repair(BEDROOM).unwrap();
    let assets = outcome.scene.assets();

    assert_eq!(assets["window"].center(), Point::new(2.5, 4.0));
    assert_eq!(assets["closet"].center(), Point::new(4.2, 0.5));
    assert_eq!(assets["rug"].center(), Point::new(0.6, 0.6));

    assert!(assets["closet"].optimize);
    assert!(assets["closet"].position.requires_grad());
    assert!(!assets["rug"].optimize);
    assert!(!assets["rug"].rotation.requires_grad());
    assert!(!assets["window"].optimize);
}

#[test]
fn test_repaired_assets_stay_inside_room() {
    let outcome = repair(BEDROOM).unwrap();
    for id in ["bed", "desk"] {
        for p in outcome.scene.assets()[id].footprint_points() {
            assert!((-1e-6..=5.0 + 1e-6).contains(&p.x), "{id} left the room: {p:?}");
            assert!((-1e-6..=4.0 + 1e-6).contains(&p.y), "{id} left the room: {p:?}");
        }
    }
}

#[test]
fn test_clean_scene_is_untouched() {
    let source = BEDROOM.replace("position = [2.5, 2.0]", "position = [3.5, 2.0]");
    let scene = Scene::from_str(&source).unwrap();
    let before = scene.assets().clone();

    let outcome = repair_scene(scene, &RepairConfig::new()).unwrap();

    assert!(outcome.report.is_noop());
    assert_eq!(outcome.scene.assets(), &before);
}

#[test]
fn test_cleanup_table_drives_the_loop() {
    let source = format!("{BEDROOM}\n[cleanup]\niterations = 5\nprojection_interval = 0\n");
    let outcome = repair(&source).unwrap();
    assert_eq!((outcome.report.steps, outcome.report.projections), (5, 0));

    let config = RepairConfig::new().with_cleanup(CleanupConfig::default().with_iterations(2));
    let outcome = repair_scene(Scene::from_str(&source).unwrap(), &config).unwrap();
    assert_eq!(outcome.report.steps, 2);
}

#[test]
fn test_repaired_scene_round_trips() {
    let outcome = repair(BEDROOM).unwrap();
    let text = outcome.scene.to_toml().unwrap();
    let reloaded = Scene::from_str(&text).unwrap();

    assert_eq!(reloaded.assets().len(), 5);
    let (a, b) = (reloaded.assets()["desk"].center(), outcome.scene.assets()["desk"].center());
    assert!(a.distance(&b) < 1e-9);
}

#[test]
fn test_frames_written_to_diagnostics_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = RepairConfig::new().with_cleanup(
        CleanupConfig::default()
            .with_iterations(3)
            .with_diagnostics_dir(dir.path()),
    );

    let outcome = repair_scene(Scene::from_str(BEDROOM).unwrap(), &config).unwrap();

    assert_eq!(outcome.report.frames.len(), 2);
    let first = std::fs::read_to_string(dir.path().join("frame_cleanup_0000.svg")).unwrap();
    assert!(first.contains(r#"id="room""#));
    assert!(dir.path().join("frame_cleanup_0002.svg").exists());
    assert!(dir.path().join("loss_curves_cleanup.svg").exists());
}

#[test]
fn test_syntax_error_reports_location() {
    let source = "[room\nboundary = [[0, 0], [1, 0], [1, 1]]\n";
    let err = Scene::from_str(source).unwrap_err();

    assert!(matches!(err, SceneError::Syntax { .. }));
    assert!(err.span().is_some());
    let report = err.format(source, "bedroom.toml");
    assert!(report.contains("bedroom.toml"));
    assert!(report.contains("invalid scene file"));
}

#[test]
fn test_misspelled_reference_suggests_name() {
    let source = BEDROOM.replace("asset = \"desk\"", "asset = \"dsk\"");
    let err = repair(&source).unwrap_err();

    let RepairError::Scene(SceneError::UnknownAsset { name, suggestions, .. }) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(name, "dsk");
    assert_eq!(suggestions, &vec!["desk".to_string()]);
    assert!(err.to_string().contains("did you mean: desk?"));
}
