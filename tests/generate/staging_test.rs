use propsql::generate::apply_staging;
use propsql::prelude::*;
use propsql::spec::{SpecError, StagedColumn, TableSpec};

fn encounter() -> EntitySpec {
    EntitySpec::builder(
        "Encounter",
        EntityKind::Event,
        ColumnSpec::new(None, "encounter", "patient_id"),
    )
    .prop_ids(["Encounter"])
    .unique_id(ColumnSpec::new(None, "encounter", "id"))
    .start(ColumnSpec::new(None, "encounter", "start_time"))
    .property(PropertySpec::new(
        "provider",
        ColumnSpec::table(None, "encounter").with_join(JoinSpec::inner(
            "provider_id",
            "id",
            ColumnSpec::new(None, "provider", "name"),
        )),
        ValueType::Nominal,
    ))
    .build()
    .unwrap()
}

fn staging(entities: &[&str]) -> StagingSpec {
    StagingSpec::new(
        TableSpec::new(None, "encounter"),
        TableSpec::new(Some("stage"), "encounter_tmp"),
        vec![StagedColumn::new("patient_id").with_substitute("pat_key", &[])],
        entities.iter().map(|s| s.to_string()).collect(),
        "id",
        None,
    )
    .unwrap()
}

#[test]
fn test_staged_entity_reads_staging_table() {
    let generator = SqlGenerator::new(Dialect::Default).with_staging(vec![staging(&["Encounter"])]).unwrap();
    let sql = generator
        .generate(&encounter(), &QueryRequest::new(["Encounter"]))
        .unwrap()
        .sql;

    assert!(sql.contains("\nFROM stage.encounter_tmp AS a1\n"));
    assert!(sql.contains("  a1.pat_key,\n"));
    assert!(sql.contains("JOIN provider AS a2 ON (a1.provider_id = a2.id)"));
    assert!(!sql.contains(" encounter AS"));
}

#[test]
fn test_entity_outside_staging_set_is_untouched() {
    let generator = SqlGenerator::new(Dialect::Default).with_staging(vec![staging(&["Lab"])]).unwrap();
    let sql = generator
        .generate(&encounter(), &QueryRequest::new(["Encounter"]))
        .unwrap()
        .sql;

    assert!(sql.contains("\nFROM encounter AS a1\n"));
    assert!(!sql.contains("encounter_tmp"));
}

#[test]
fn test_staging_is_idempotent_on_every_chain() {
    let spec = encounter();
    let staging = vec![staging(&["Encounter"])];

    for (_, chain) in spec.chains() {
        let once = apply_staging(chain, "Encounter", &staging);
        let twice = apply_staging(&once, "Encounter", &staging);
        assert_eq!(once, twice);
    }
}

#[test]
fn test_substitute_scoped_to_entity() {
    let scoped = StagingSpec::new(
        TableSpec::new(None, "encounter"),
        TableSpec::new(None, "encounter_tmp"),
        vec![StagedColumn::new("patient_id").with_substitute("pat_key", &["Visit"])],
        vec!["Encounter".to_string(), "Visit".to_string()],
        "id",
        None,
    )
    .unwrap();
    let chain = ColumnSpec::new(None, "encounter", "patient_id");

    let for_encounter = apply_staging(&chain, "Encounter", std::slice::from_ref(&scoped));
    let for_visit = apply_staging(&chain, "Visit", std::slice::from_ref(&scoped));

    assert_eq!(for_encounter.table_name(), "encounter_tmp");
    assert_eq!(for_encounter.column(), Some("patient_id"));
    assert_eq!(for_visit.column(), Some("pat_key"));
}

#[test]
fn test_overlapping_staging_specs_rejected_by_backend() {
    let result = BackendSpec::new(
        vec![encounter()],
        vec![staging(&["Encounter"]), staging(&["Encounter"])],
    );
    assert!(result.is_err());
}

#[test]
fn test_overlapping_staging_specs_rejected_by_generator() {
    let result = SqlGenerator::new(Dialect::Default)
        .with_staging(vec![staging(&["Encounter"]), staging(&["Encounter", "Lab"])]);
    assert!(matches!(result, Err(SpecError::InvalidBackend(_))));

    let disjoint = SqlGenerator::new(Dialect::Default)
        .with_staging(vec![staging(&["Encounter"]), staging(&["Lab"])]);
    assert!(disjoint.is_ok());
}
