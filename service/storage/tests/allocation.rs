use std::collections::BTreeSet;

use domain_storage::{
    exception::FileRequestException,
    model::{
        entity::StorageLocation,
        vo::{FileToAllocate, StorageTarget},
    },
    service::AllocationStrategy,
};
use serde_json::json;
use service_storage::allocation::{
    AllocationStrategyRegistry, DefaultAllocationStrategy, MetadataAllocationStrategy,
    ReplicateAllocationStrategy,
};

fn locations() -> Vec<StorageLocation> {
    let mut disabled = StorageLocation::new("offline-disk", 0, true);
    disabled.enabled = false;
    vec![
        disabled,
        StorageLocation::new("tape", 1, false),
        StorageLocation::new("s3", 2, true),
        StorageLocation::new("disk", 3, true),
    ]
}

fn file() -> FileToAllocate {
    FileToAllocate {
        checksum: "abc123".to_owned(),
        algorithm: "MD5".to_owned(),
        file_name: "image.fits".to_owned(),
        size: 42,
        r#type: "RAWDATA".to_owned(),
        origin_url: "file:///data/image.fits".to_owned(),
        ..Default::default()
    }
}

fn storages(targets: &BTreeSet<StorageTarget>) -> Vec<&str> {
    targets.iter().map(|t| t.storage.as_str()).collect()
}

#[test]
fn test_default_picks_best_enabled_location() {
    let strategy = DefaultAllocationStrategy;
    let targets = strategy.allocate(&file(), &locations()).unwrap();
    assert_eq!(storages(&targets), vec!["tape"]);
}

#[test]
fn test_default_appends_online_location_when_mandatory() {
    let strategy = DefaultAllocationStrategy;
    let mut file = file();
    file.online_mandatory = true;
    let targets = strategy.allocate(&file, &locations()).unwrap();
    assert_eq!(storages(&targets), vec!["s3", "tape"]);
}

#[test]
fn test_default_sends_quicklooks_online_only() {
    let strategy = DefaultAllocationStrategy;
    let mut file = file();
    file.quicklook = true;
    let targets = strategy.allocate(&file, &locations()).unwrap();
    assert_eq!(storages(&targets), vec!["s3"]);
}

#[test]
fn test_online_mandatory_without_online_location_fails() {
    let strategy = DefaultAllocationStrategy;
    let mut file = file();
    file.online_mandatory = true;
    let only_tape = vec![StorageLocation::new("tape", 1, false)];
    assert!(matches!(
        strategy.allocate(&file, &only_tape),
        Err(FileRequestException::OnlineUnsatisfiable { .. })
    ));
}

#[test]
fn test_metadata_annotation_gives_destinations() {
    let strategy = MetadataAllocationStrategy::new("storage");
    let mut file = file();
    file.metadata = json!({
        "storage": [
            { "pluginId": "disk", "directory": "/raw" },
            { "storage": "tape" }
        ]
    });
    let targets = strategy.allocate(&file, &locations()).unwrap();
    assert_eq!(
        targets,
        BTreeSet::from([
            StorageTarget::with_sub_directory("disk", Some("/raw".to_owned())),
            StorageTarget::new("tape"),
        ])
    );
}

#[test]
fn test_metadata_annotation_errors() {
    let strategy = MetadataAllocationStrategy::new("storage");
    let mut file = file();
    assert!(matches!(
        strategy.allocate(&file, &locations()),
        Err(FileRequestException::MalformedAnnotation { .. })
    ));

    file.metadata = json!({ "storage": "disk" });
    assert!(matches!(
        strategy.allocate(&file, &locations()),
        Err(FileRequestException::MalformedAnnotation { .. })
    ));

    file.metadata = json!({ "storage": [{ "storage": "offline-disk" }] });
    assert!(matches!(
        strategy.allocate(&file, &locations()),
        Err(FileRequestException::NoStorageResolved { .. })
    ));
}

#[test]
fn test_replicate_skips_disabled_locations() {
    let strategy = ReplicateAllocationStrategy::new(vec![
        "offline-disk".to_owned(),
        "disk".to_owned(),
        "tape".to_owned(),
    ]);
    let targets = strategy.allocate(&file(), &locations()).unwrap();
    assert_eq!(storages(&targets), vec!["disk", "tape"]);
}

#[test]
fn test_registry_builds_configured_strategies() {
    let registry = AllocationStrategyRegistry::default();
    assert_eq!(
        registry.ids(),
        vec!["default", "metadata", "property-mapping", "protocol", "replicate"]
    );

    let protocol = registry
        .build(
            "protocol",
            &json!({ "schemes": { "file": "disk", "https": "s3" }, "default": "tape" }),
        )
        .unwrap();
    let mut file = file();
    assert_eq!(storages(&protocol.allocate(&file, &locations()).unwrap()), vec!["disk"]);
    file.origin_url = "ftp://host/image.fits".to_owned();
    assert_eq!(storages(&protocol.allocate(&file, &locations()).unwrap()), vec!["tape"]);

    let mapping = registry
        .build(
            "property-mapping",
            &json!({ "pointer": "/level", "mapping": { "1": "s3" } }),
        )
        .unwrap();
    file.metadata = json!({ "level": 1 });
    assert_eq!(storages(&mapping.allocate(&file, &locations()).unwrap()), vec!["s3"]);
    file.metadata = json!({ "level": 2 });
    assert!(mapping.allocate(&file, &locations()).is_err());
}

#[test]
fn test_registry_rejects_unknown_or_misconfigured() {
    let registry = AllocationStrategyRegistry::default();
    assert!(matches!(
        registry.build("round-robin", &json!({})),
        Err(FileRequestException::UnknownStrategy { .. })
    ));
    assert!(matches!(
        registry.build("replicate", &json!({ "storages": "disk" })),
        Err(FileRequestException::InternalError { .. })
    ));
}
