//! Directory datasource copying record files into a pipeline output path

mod common;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pipeline_integrations_core::Datasource;
use pipeline_integrations_datasources::DirectoryDatasource;

fn files(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            (
                entry.path().strip_prefix(root).unwrap().to_path_buf(),
                std::fs::read(entry.path()).unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_every_record_is_copied() {
    common::init_tracing();

    let source = tempfile::tempdir().unwrap();
    for shard in 0..4 {
        let dir = source.path().join(format!("split-{}", shard % 2));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(format!("data-{:05}.tfrecord", shard)),
            vec![shard as u8; 64 * (shard + 1)],
        )
        .unwrap();
    }

    let pipeline = tempfile::tempdir().unwrap();
    let output = pipeline.path().join("steps/importer/output");

    let datasource = DirectoryDatasource::new("tfrecords", source.path()).unwrap();
    assert_eq!(datasource.name(), "tfrecords");
    datasource.process(&output).unwrap();

    let copied = files(&output);
    assert_eq!(copied.len(), 4);
    assert_eq!(copied, files(source.path()));
}

#[test]
fn test_process_overwrites_previous_output() {
    let source = tempfile::tempdir().unwrap();
    std::fs::write(source.path().join("a.tfrecord"), b"new").unwrap();

    let output = tempfile::tempdir().unwrap();
    std::fs::write(output.path().join("a.tfrecord"), b"old contents").unwrap();

    DirectoryDatasource::new("tfrecords", source.path())
        .unwrap()
        .process(output.path())
        .unwrap();

    assert_eq!(std::fs::read(output.path().join("a.tfrecord")).unwrap(), b"new");
}
