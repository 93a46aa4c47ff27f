//! Batch conversion end-to-end tests.

use pinnacle_scene::{CancellationToken, FileModelLoader, ModelFormat, ModelLoader};
use pinnacle_tests::{quad, single_mesh_scene, write_file, write_model, TRIANGLE_OBJ};
use pinnacle_tools::convert::{discover_files, supported_input_extensions};
use pinnacle_tools::{BatchConversionOptions, BatchConverter, ConversionFormat, ConversionStatus, ConvertError};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

/// Three convertible models and one FBX the loader recognises but cannot read.
fn mixed_directory(dir: &Path) -> Vec<PathBuf> {
    let scene = single_mesh_scene(quad());
    write_file(dir, "a_triangle.obj", TRIANGLE_OBJ.as_bytes());
    write_model(&scene, ModelFormat::Gltf, &dir.join("b_quad.gltf"));
    write_model(&scene, ModelFormat::Glb, &dir.join("c_quad.glb"));
    write_file(dir, "d_legacy.fbx", b"Kaydara FBX Binary  \x00");
    discover_files(dir, false, &["obj", "gltf", "glb", "fbx"])
}

fn usdz_options(out: &Path) -> BatchConversionOptions {
    BatchConversionOptions {
        target_format: ConversionFormat::Usdz,
        output_directory: Some(out.to_path_buf()),
        ..Default::default()
    }
}

#[test]
fn three_convertible_and_one_unsupported_to_usdz() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = mixed_directory(dir.path());
    assert_eq!(inputs.len(), 4);

    let out = dir.path().join("out");
    let mut progress = Vec::new();
    let result = BatchConverter::new()
        .convert_files(&inputs, &usdz_options(&out), |i, total, name| {
            progress.push((i, total, name.to_string()));
        })
        .unwrap();

    assert_eq!(result.total_files, 4);
    assert_eq!(result.success_count, 3, "{:#?}", result.results);
    assert_eq!(result.failure_count, 1);
    assert_eq!(
        result.success_count + result.warning_count + result.failure_count + result.skipped_count,
        4
    );

    let failed = &result.results[3];
    assert_eq!(failed.status, ConversionStatus::Failed);
    assert!(failed.error_message.is_some());
    assert!(failed.output_path.is_none());

    for converted in &result.results[..3] {
        let output = converted.output_path.as_ref().unwrap();
        assert!(output.exists());
        assert_eq!(output.extension().unwrap(), "usdz");
        assert!(output.starts_with(&out));
    }

    let indices: Vec<(usize, usize)> = progress.iter().map(|(i, t, _)| (*i, *t)).collect();
    assert_eq!(indices, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    assert_eq!(progress[3].2, "d_legacy.fbx");
}

#[test]
fn rerun_without_overwrite_skips_existing_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = mixed_directory(dir.path());
    let options = usdz_options(&dir.path().join("out"));
    let converter = BatchConverter::new();

    converter.convert_files(&inputs, &options, |_, _, _| {}).unwrap();
    let second = converter.convert_files(&inputs, &options, |_, _, _| {}).unwrap();
    assert_eq!(second.skipped_count, 3);
    assert_eq!(second.failure_count, 1);

    let overwrite = BatchConversionOptions {
        overwrite_existing: true,
        ..options
    };
    let third = converter.convert_files(&inputs, &overwrite, |_, _, _| {}).unwrap();
    assert_eq!(third.success_count, 3);
}

#[test]
fn converted_gltf_round_trips_through_loader() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "tri.obj", TRIANGLE_OBJ.as_bytes());
    let options = BatchConversionOptions {
        target_format: ConversionFormat::Gltf,
        filename_suffix: "_out".to_string(),
        ..Default::default()
    };

    let result = BatchConverter::new().convert_file(&input, &options);
    assert_eq!(result.status, ConversionStatus::Success);
    let output = result.output_path.unwrap();
    assert_eq!(output, dir.path().join("tri_out.gltf"));

    let reloaded = FileModelLoader.load(&output).unwrap();
    assert_eq!(reloaded.total_triangles(), 1);
    assert_eq!(reloaded.total_vertices(), 3);
}

#[test]
fn cancellation_skips_the_remainder() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = mixed_directory(dir.path());
    let token = CancellationToken::new();
    token.cancel();

    let mut calls = 0;
    let result = BatchConverter::new()
        .convert_files_with_cancel(&inputs, &usdz_options(&dir.path().join("out")), |_, _, _| calls += 1, &token)
        .unwrap();

    assert!(result.cancelled);
    assert_eq!(calls, 4);
    assert_eq!(result.skipped_count, 4);
    assert!(result
        .results
        .iter()
        .all(|r| r.error_message.as_deref() == Some("cancelled")));
}

#[test]
fn batch_that_cannot_start_is_an_error() {
    let converter = BatchConverter::new();
    assert!(matches!(
        converter.convert_files(&[], &BatchConversionOptions::default(), |_, _, _| {}),
        Err(ConvertError::EmptyInput)
    ));
}

#[test]
fn discovery_respects_supported_extensions() {
    let dir = tempfile::tempdir().unwrap();
    mixed_directory(dir.path());
    write_file(dir.path(), "nested/e.OBJ", TRIANGLE_OBJ.as_bytes());

    let flat = discover_files(dir.path(), false, &supported_input_extensions());
    assert_eq!(flat.len(), 3);
    let deep = discover_files(dir.path(), true, &supported_input_extensions());
    assert_eq!(deep.len(), 4);
}
