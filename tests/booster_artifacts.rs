//! Booster models persisted through a local artifact store

mod common;

use std::sync::Arc;

use pipeline_integrations_core::{ArtifactStore, LocalArtifactStore, Materializer};
use pipeline_integrations_xgboost::{Booster, RegTree, XgboostBoosterMaterializer, DEFAULT_FILENAME};

fn trained_booster() -> Booster {
    let mut booster = Booster::new("reg:squarederror", 2.5, 4);
    booster.push_tree(RegTree::stump(0, 1.5, -0.4, 0.6, false));
    booster.push_tree(RegTree::stump(3, -2.0, 0.05, 0.15, true));
    booster.push_tree(RegTree::leaf(0.01));
    booster
}

#[test]
fn test_roundtrip_through_file_uri() {
    common::init_tracing();

    let store_root = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalArtifactStore::new(store_root.path()));
    let materializer = XgboostBoosterMaterializer::new(store.clone());

    let artifact_dir = store_root.path().join("runs/42/model");
    let uri = format!("file://{}", artifact_dir.display());

    let booster = trained_booster();
    materializer.save(&booster, &uri).unwrap();
    assert!(artifact_dir.join(DEFAULT_FILENAME).is_file());
    assert!(store.exists(&format!("{}/{}", uri, DEFAULT_FILENAME)).unwrap());

    let restored = materializer.load(&uri).unwrap();
    let rows = vec![
        vec![0.0, 0.0, 0.0, 0.0],
        vec![2.0, 1.0, 1.0, -3.0],
        vec![f32::NAN, 1.0, 1.0, f32::NAN],
    ];
    assert_eq!(restored.predict(&rows).unwrap(), booster.predict(&rows).unwrap());
}

#[test]
fn test_model_file_is_xgboost_json() {
    let store_root = tempfile::tempdir().unwrap();
    let materializer =
        XgboostBoosterMaterializer::new(Arc::new(LocalArtifactStore::new(store_root.path())));

    materializer.save(&trained_booster(), "model").unwrap();

    let bytes = std::fs::read(store_root.path().join("model").join(DEFAULT_FILENAME)).unwrap();
    let document: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(document["learner"]["objective"]["name"], "reg:squarederror");
    assert_eq!(document["learner"]["gradient_booster"]["name"], "gbtree");
    assert_eq!(
        document["learner"]["gradient_booster"]["model"]["trees"]
            .as_array()
            .unwrap()
            .len(),
        3
    );
}
