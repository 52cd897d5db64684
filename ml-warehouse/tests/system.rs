//! End-to-end tests: ingest CSV folders, preprocess, learn, snapshot

use std::fs;
use std::path::Path;

use ml_warehouse::{
    logging, MetaFilter, MetaValue, Options, PipelineSettings, PreprocessRequest, Registries, RowFilter,
    SystemConfig, SystemManager, Tag, MIN_MAX, RUNNING_MEAN, SORT, STANDARDIZE,
};
use tempfile::TempDir;

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|k| (*k).to_string()).collect()
}

/// Two subject folders with three recordings each, plus a sidecar per file
fn data_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (subject, offset) in [("subject_01", 0), ("subject_02", 100)] {
        let folder = dir.path().join(subject);
        fs::create_dir(&folder).unwrap();
        for trial in 1..=3 {
            let base = offset + trial * 10;
            let csv = format!("time,value,label\n0,{base},a\n1,{},b\n2,{},a\n", base + 1, base + 2);
            fs::write(folder.join(format!("trial_{trial}.csv")), csv).unwrap();
            let sidecar = format!(r#"{{"subject": "{subject}", "trial": {trial}}}"#);
            fs::write(folder.join(format!("trial_{trial}.meta.json")), sidecar).unwrap();
        }
        fs::write(folder.join("notes.txt"), "ignored").unwrap();
    }
    dir
}

fn system(root: &Path) -> (SystemManager, String) {
    logging::init("warn").unwrap();
    let mut system = SystemManager::with_config("test", SystemConfig::default(), Registries::builtin().unwrap());
    let session = system
        .create_session(Some(RUNNING_MEAN), &Options::new(), root)
        .unwrap();
    let ids = system
        .load_data(&session, &["subject_01", "subject_02"], &keys(&["subject", "trial", "file_name"]))
        .unwrap();
    assert_eq!(ids.len(), 6);
    (system, session)
}

#[test]
fn test_ingest_and_query_by_metadata() {
    let root = data_root();
    let (system, session) = system(root.path());

    let all = system
        .get_complete_data::<&str>(&session, &MetaFilter::all(), None, None)
        .unwrap();
    assert_eq!(all.len(), 6);
    for sample in &all {
        assert_eq!(sample.metadata.keys(), keys(&["subject", "trial", "file_name"]));
        assert_eq!(sample.frame.column_names(), vec!["time", "value", "label"]);
    }

    let filter = MetaFilter::all().include("subject", "subject_02").exclude("trial", 2);
    let frames = system
        .get_data(&session, None, Some(&filter), Some(&["value"][..]), None)
        .unwrap();
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f.column_names() == vec!["value"]));

    assert!(system
        .get_data::<&str>(&session, None, Some(&MetaFilter::all().include("x", 1)), None, None)
        .unwrap()
        .is_empty());

    let rows = RowFilter::new().with("label", |cell| cell.as_str() == Some("a"));
    let filtered = system
        .get_data::<&str>(&session, None, Some(&filter), None, Some(&rows))
        .unwrap();
    assert!(filtered.iter().all(|f| f.row_count() == 2));
}

#[test]
fn test_preprocessing_preserves_lineage() {
    let root = data_root();
    let (mut system, session) = system(root.path());
    let subject = MetaFilter::all().include("subject", "subject_01");

    let pipeline = PipelineSettings::new(keys(&["value"]), Tag::new("standardized", true))
        .with_mark_old(Tag::new("superseded", true))
        .with_batch_mode(true);
    let request = PreprocessRequest::new(STANDARDIZE, pipeline).with_filter(subject.clone());
    let new_ids = system.preprocess(&session, &request).unwrap();
    assert_eq!(new_ids.len(), 3);

    let warehouse = system.warehouse(&session).unwrap();
    assert_eq!(warehouse.store().len(), 9);
    for id in &new_ids {
        let table = warehouse.store().get_by_id(id).unwrap();
        assert_eq!(table.metadata().get("standardized"), Some(&MetaValue::Bool(true)));
        assert_eq!(table.metadata().get("superseded"), Some(&MetaValue::Bool(true)));
        assert_eq!(table.frame().column_names(), vec!["value"]);
        assert_eq!(warehouse.store().source(id), Some(""));
    }

    let originals = warehouse
        .get_complete_data_by_filter::<&str>(&subject.clone().exclude_key("standardized"), None, None)
        .unwrap();
    assert_eq!(originals.len(), 3);
    assert!(originals
        .iter()
        .all(|s| s.metadata.get("superseded") == Some(&MetaValue::Bool(true)) && s.frame.column_count() == 3));

    // Batch mode fits over all three recordings: the mean of all nine values is zero
    let derived = warehouse
        .get_data_by_filter::<&str>(&MetaFilter::all().include("standardized", true), None, None)
        .unwrap();
    let total: f64 = derived
        .iter()
        .flat_map(|f| f.column("value").unwrap().to_f64().unwrap())
        .flatten()
        .sum();
    assert!(total.abs() < 1e-9);

    let both = PreprocessRequest::new(MIN_MAX, PipelineSettings::new(Vec::new(), Tag::new("scaled", 1)))
        .with_filter(MetaFilter::all())
        .with_table_ids(new_ids);
    assert!(system.preprocess(&session, &both).unwrap().is_empty());
    assert_eq!(system.warehouse(&session).unwrap().store().len(), 9);
}

#[test]
fn test_learning_run_batches_lazily() {
    let root = data_root();
    let (mut system, session) = system(root.path());

    let request = system
        .learning_request(MetaFilter::all().exclude("trial", 3))
        .with_columns(keys(&["value"]))
        .with_granularity(3);
    let statistics: Vec<_> = system
        .learn_data(&session, request)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    // Four matching tables in batches of three
    assert_eq!(statistics.len(), 2);
    assert_eq!(statistics[0].get("samples"), Some(&MetaValue::Int(3)));
    assert_eq!(statistics[1].get("samples"), Some(&MetaValue::Int(1)));

    let ordered: Options = [("order_keys".to_string(), MetaValue::from(vec!["subject", "trial"]))]
        .into_iter()
        .collect();
    let request = system
        .learning_request(MetaFilter::all())
        .with_ordering(SORT, ordered)
        .with_granularity(2);
    let mut run = system.learn_data(&session, request).unwrap();
    run.next().unwrap().unwrap();
    assert_eq!(run.dispatched(), 1);
    drop(run);

    let learner = system.learner(&session).unwrap().unwrap();
    assert_eq!(learner.settings().get("batches"), Some(&MetaValue::Int(3)));
}

#[test]
fn test_system_snapshot_round_trip() {
    let root = data_root();
    let (mut system, session) = system(root.path());
    let config_path = root.path().join("config.json");
    SystemConfig {
        granularity: 2,
        ..SystemConfig::default()
    }
    .save(&config_path)
    .unwrap();

    let pipeline = PipelineSettings::new(keys(&["value"]), Tag::new("scaled", true));
    let high: Options = [("high".to_string(), MetaValue::Float(10.0))].into_iter().collect();
    let request = PreprocessRequest::new(MIN_MAX, pipeline)
        .with_settings(high)
        .with_table_ids(
            system
                .warehouse(&session)
                .unwrap()
                .store()
                .ids()
                .to_vec(),
        );
    system.preprocess(&session, &request).unwrap();
    for result in system.learn_data(&session, system_request()).unwrap() {
        result.unwrap();
    }

    let path = root.path().join("system.bin");
    system.save(&path).unwrap();
    let restored = SystemManager::load(&path, Registries::builtin().unwrap()).unwrap();

    assert_eq!(restored.name(), "test");
    assert_eq!(restored.sessions(), vec![session.as_str()]);
    let before = system.warehouse(&session).unwrap();
    let after = restored.warehouse(&session).unwrap();
    assert_eq!(after.snapshot(), before.snapshot());
    assert_eq!(after.store().len(), 12);
    assert_eq!(
        after.preprocessor_settings(MIN_MAX).unwrap().get("high"),
        Some(&MetaValue::Float(10.0))
    );
    assert_eq!(
        restored.learner(&session).unwrap().unwrap().settings(),
        system.learner(&session).unwrap().unwrap().settings()
    );

    // A system created from a config file reads it again on load
    let mut from_file = SystemManager::new("file", &config_path, Registries::builtin().unwrap()).unwrap();
    from_file.create_session(None, &Options::new(), root.path()).unwrap();
    from_file.save(&path).unwrap();
    SystemConfig::default().save(&config_path).unwrap();
    let reloaded = SystemManager::load(&path, Registries::builtin().unwrap()).unwrap();
    assert_eq!(reloaded.config().granularity, 1);
}

fn system_request() -> ml_warehouse::LearningRequest {
    ml_warehouse::LearningRequest::new(MetaFilter::all().include("scaled", true))
}

#[test]
fn test_non_csv_file_is_rejected() {
    let root = data_root();
    let (mut system, session) = system(root.path());
    let err = system
        .warehouse_mut(&session)
        .unwrap()
        .load_data_file(&root.path().join("subject_01").join("notes.txt"), &[])
        .unwrap_err();
    assert!(matches!(
        err,
        ml_warehouse::Error::Core(ml_warehouse_core::Error::InvalidInput(_))
    ));
}
