use cognition_model::{Entity, LogRecord, RecordKind, RowRecord};
use cognition_storage::{Registration, StorageError, TypeRegistry};

#[test]
fn builtin_registers_both_variants() {
    let registry = TypeRegistry::builtin();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.tags(), vec!["entity", "log_record"]);
    assert_eq!(registry.tag_for(RecordKind::Entity), Some("entity"));
    assert_eq!(registry.tag_for(RecordKind::LogRecord), Some("log_record"));
    assert_eq!(
        registry.lookup("entity").map(Registration::kind),
        Some(RecordKind::Entity)
    );
}

#[test]
fn empty_registry_knows_nothing() {
    let registry = TypeRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.lookup("entity").is_none());
    assert!(registry.primary(RecordKind::Entity).is_none());
}

#[test]
fn duplicate_tag_is_rejected() {
    let mut registry = TypeRegistry::builtin();
    let err = registry
        .register("entity", Registration::of::<LogRecord>())
        .unwrap_err();
    assert!(matches!(err, StorageError::DuplicateTag(tag) if tag == "entity"));
    // The original registration is untouched.
    assert_eq!(
        registry.lookup("entity").map(Registration::kind),
        Some(RecordKind::Entity)
    );
}

#[test]
fn empty_tag_is_rejected() {
    let mut registry = TypeRegistry::new();
    assert!(matches!(
        registry.register("", Registration::of::<Entity>()),
        Err(StorageError::Config(_))
    ));
}

#[test]
fn first_tag_is_primary_later_tags_are_aliases() {
    let mut registry = TypeRegistry::new();
    registry.register("v2.entity", Registration::of::<Entity>()).unwrap();
    registry.register("legacy.Entity", Registration::of::<Entity>()).unwrap();

    assert_eq!(registry.tag_for(RecordKind::Entity), Some("v2.entity"));
    assert!(registry.lookup("legacy.Entity").is_some());
    let (tag, registration) = registry.primary(RecordKind::Entity).unwrap();
    assert_eq!(tag, "v2.entity");
    assert_eq!(registration.kind(), RecordKind::Entity);
}

#[test]
fn register_variant_uses_default_tag() {
    let mut registry = TypeRegistry::new();
    registry.register_variant::<LogRecord>().unwrap();
    assert_eq!(registry.tags(), vec![LogRecord::DEFAULT_TAG]);
    assert!(matches!(
        registry.register_variant::<LogRecord>(),
        Err(StorageError::DuplicateTag(_))
    ));
}
