//! Validator end-to-end tests over fixture files.

use pinnacle_lint::{Severity, ValidationCategory, ValidationOptions, Validator, ValidatorState};
use pinnacle_scene::{CancellationToken, FileModelLoader, MaterialRecord, ModelFormat, TextureChannel};
use pinnacle_tests::{quad, single_mesh_scene, textured_scene, write_file, write_model, TRIANGLE_OBJ};
use pinnacle_tools::report::write_validation_report;
use pretty_assertions::assert_eq;

fn assert_counts_match(result: &pinnacle_lint::ModelValidationResult) {
    for severity in [Severity::Info, Severity::Warning, Severity::Error, Severity::Critical] {
        let expected = result.issues.iter().filter(|i| i.severity == severity).count();
        let counted = match severity {
            Severity::Info => result.counts.info,
            Severity::Warning => result.counts.warning,
            Severity::Error => result.counts.error,
            Severity::Critical => result.counts.critical,
        };
        assert_eq!(counted, expected, "{severity} count");
    }
    assert_eq!(result.counts.total(), result.issues.len());
}

#[test]
fn obj_file_validates_and_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "tri.obj", TRIANGLE_OBJ.as_bytes());

    let mut validator = Validator::new();
    let result = validator
        .validate_file(&FileModelLoader, &path, &ValidationOptions::default())
        .unwrap();

    assert_eq!(validator.state(), ValidatorState::Completed);
    assert_eq!(result.model_format, ModelFormat::Obj);
    assert_eq!(result.mesh_results.len(), 1);
    assert!(result.has_rule("mesh/missing-normals"));
    assert_counts_match(&result);
}

#[test]
fn broken_textures_make_the_model_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let scene = textured_scene(dir.path());
    std::fs::remove_file(dir.path().join("stone.png")).unwrap();

    let result = Validator::new().validate(&scene, &ValidationOptions::default()).unwrap();
    assert!(!result.is_valid);
    assert!(result.has_rule("texture/missing-file"));
    assert!(result.has_rule("texture/unused"));
    assert!(result
        .issues_for_rule("texture/missing-file")
        .all(|i| i.texture_index == Some(2)));
    assert_counts_match(&result);

    let report = dir.path().join("validation.txt");
    write_validation_report(&result, &report).unwrap();
    let text = std::fs::read_to_string(report).unwrap();
    assert!(text.contains("texture/missing-file"));
    assert!(text
        .lines()
        .any(|line| line.starts_with("Valid:") && line.trim_end().ends_with("false")));
}

#[test]
fn disabled_categories_do_not_run() {
    let mut scene = single_mesh_scene(quad());
    scene.materials[0] = MaterialRecord::new("paint").with_texture(TextureChannel::BaseColor, 5);

    let options = ValidationOptions {
        validate_materials: false,
        ..Default::default()
    };
    let result = Validator::new().validate(&scene, &options).unwrap();
    assert!(result
        .issues
        .iter()
        .all(|i| i.category != ValidationCategory::Material));

    let result = Validator::new().validate(&scene, &ValidationOptions::default()).unwrap();
    assert!(result.has_rule("material/dangling-reference"));
    assert!(!result.is_valid);
}

#[test]
fn cancelled_validation_fails() {
    let scene = single_mesh_scene(quad());
    let token = CancellationToken::new();
    token.cancel();

    let mut validator = Validator::new();
    let result = validator.validate_with_cancel(&scene, &ValidationOptions::default(), &token);
    assert!(result.is_err());
    assert_eq!(validator.state(), ValidatorState::Failed);
}

#[test]
fn written_gltf_is_compliant() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(&single_mesh_scene(quad()), ModelFormat::Glb, &dir.path().join("quad.glb"));

    let result = Validator::new()
        .validate_file(&FileModelLoader, &path, &ValidationOptions::default())
        .unwrap();
    assert!(result.is_gltf_compliant);
    assert_eq!(result.counts.critical, 0);
    assert_counts_match(&result);
}
