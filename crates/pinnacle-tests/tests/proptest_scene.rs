//! Property tests over randomly bound scenes.

use pinnacle_lint::{Severity, ValidationOptions, Validator};
use pinnacle_scene::{MaterialRecord, TextureChannel, TextureRecord};
use pinnacle_tests::{quad, single_mesh_scene, write_file, TRIANGLE_OBJ};
use pinnacle_tools::textures::{analyze, remove_unused_textures};
use pinnacle_tools::{BatchConversionOptions, BatchConverter, RemovalPolicy};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Texture count plus, per material, a list of (channel, texture) bindings.
fn bindings() -> impl Strategy<Value = (usize, Vec<Vec<(usize, usize)>>)> {
    (1usize..6).prop_flat_map(|textures| {
        let binding = (0..TextureChannel::ALL.len(), 0..textures);
        (
            Just(textures),
            prop::collection::vec(prop::collection::vec(binding, 0..4), 0..5),
        )
    })
}

fn scene_from((textures, materials): &(usize, Vec<Vec<(usize, usize)>>)) -> pinnacle_scene::SceneModel {
    let mut scene = single_mesh_scene(quad());
    for i in 0..*textures {
        let bytes = format!("texture payload {i}").into_bytes();
        scene
            .textures
            .push(TextureRecord::embedded(format!("tex{i}.png"), bytes, "image/png"));
    }
    for (m, slots) in materials.iter().enumerate() {
        let mut material = MaterialRecord::new(format!("mat{m}"));
        for &(channel, texture) in slots {
            material = material.with_texture(TextureChannel::ALL[channel], texture);
        }
        scene.materials.push(material);
    }
    scene
}

proptest! {
    #[test]
    fn reference_count_is_distinct_binding_materials(input in bindings()) {
        let scene = scene_from(&input);
        let analysis = analyze(&scene);

        for info in &analysis.textures {
            let expected = scene
                .materials
                .iter()
                .filter(|m| {
                    TextureChannel::ALL
                        .iter()
                        .filter_map(|c| m.texture(*c))
                        .collect::<BTreeSet<_>>()
                        .contains(&info.index)
                })
                .count();
            prop_assert_eq!(info.reference_count, expected);
        }
    }

    #[test]
    fn remove_unused_is_idempotent(input in bindings()) {
        let mut scene = scene_from(&input);
        remove_unused_textures(&mut scene, RemovalPolicy::RecordsOnly);
        prop_assert!(scene.check_invariants().is_ok());
        prop_assert!(scene.reference_counts().iter().all(|&count| count > 0));

        let snapshot = scene.clone();
        let again = remove_unused_textures(&mut scene, RemovalPolicy::RecordsOnly);
        prop_assert_eq!(again.affected, 0);
        prop_assert_eq!(scene, snapshot);
    }

    #[test]
    fn severity_counts_match_issues(input in bindings()) {
        let scene = scene_from(&input);
        let result = Validator::new().validate(&scene, &ValidationOptions::default()).unwrap();

        prop_assert_eq!(result.counts.total(), result.issues.len());
        prop_assert_eq!(result.counts.critical, result.issues_with_severity(Severity::Critical).count());
        prop_assert_eq!(result.counts.error, result.issues_with_severity(Severity::Error).count());
        prop_assert_eq!(result.counts.warning, result.issues_with_severity(Severity::Warning).count());
        prop_assert_eq!(result.counts.info, result.issues_with_severity(Severity::Info).count());
        prop_assert_eq!(
            result.is_valid,
            result.issues.iter().all(|i| !i.severity.is_blocking())
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn batch_counts_cover_every_input(good in 0usize..4, bad in 0usize..3) {
        prop_assume!(good + bad > 0);
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = Vec::new();
        for i in 0..good {
            inputs.push(write_file(dir.path(), &format!("good{i}.obj"), TRIANGLE_OBJ.as_bytes()));
        }
        for i in 0..bad {
            inputs.push(dir.path().join(format!("missing{i}.obj")));
        }

        let options = BatchConversionOptions {
            output_directory: Some(dir.path().join("out")),
            ..Default::default()
        };
        let result = BatchConverter::new().convert_files(&inputs, &options, |_, _, _| {}).unwrap();

        prop_assert_eq!(result.total_files, good + bad);
        prop_assert_eq!(
            result.success_count + result.warning_count + result.failure_count + result.skipped_count,
            good + bad
        );
        prop_assert_eq!(result.failure_count, bad);
        prop_assert_eq!(result.results.len(), good + bad);
    }
}
