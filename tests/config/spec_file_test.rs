use propsql::config::{load_backend_spec, parse_backend_spec, ConfigError};
use propsql::prelude::*;
use propsql::spec::{DirMappingLoader, InMemoryMappingLoader, SpecError};
use std::fs;

const BACKEND: &str = r#"
[[entity]]
name = "Patient"
description = "Demographics of one patient"
kind = "constant"
prop_ids = ["Patient"]
base = { table = "patient", column = "id" }
unique_ids = [{ table = "patient", column = "id" }]
constraints = [{ table = "patient", column = "deleted", constraint = { comparator = "equal_to", values = [0] } }]

[[entity.property]]
name = "gender"
column = { table = "patient", column = "gender_code" }
mappings = "gender.txt"

[[entity.property]]
name = "age"
type = "number"
column = { table = "patient", column = "age" }

[[entity]]
name = "Diagnosis"
kind = "event"
prop_ids = ["Diabetes", "Hypertension"]
base = { table = "patient", column = "id" }
unique_ids = [{ table = "patient", join = { from = "id", to = "patient_id", next = { table = "dx", column = "dx_id" } } }]
start = { table = "patient", join = { from = "id", to = "patient_id", next = { table = "dx", column = "dx_date" } } }
granularity = "day"
prop_id = { source = "case", mappings = "icd9.txt", column = { table = "patient", join = { from = "id", to = "patient_id", next = { table = "dx", column = "code" } } } }

[[staging]]
replaced = { table = "dx" }
staging_area = { schema = "stage", table = "dx_tmp" }
entities = ["Diagnosis"]
unique_column = "row_id"
index_tablespace = "idx_ts"

[[staging.column]]
name = "code"
substitute = "dx_code"
"#;

fn loader() -> InMemoryMappingLoader {
    InMemoryMappingLoader::new()
        .with_resource("gender.txt", "M\tMale\nF\tFemale\n")
        .with_resource("icd9.txt", "# ICD-9 codes\n250.00\tDiabetes\n401.9\tHypertension\n")
}

#[test]
fn test_parse_full_backend() {
    let spec = parse_backend_spec(BACKEND, &loader()).unwrap();
    assert_eq!(spec.entities().len(), 2);

    let patient = spec.entity("Patient").unwrap();
    assert_eq!(patient.description(), "Demographics of one patient");
    assert_eq!(patient.properties().len(), 2);
    assert!(patient.property("gender").unwrap().mappings.is_some());
    assert_eq!(patient.property("age").unwrap().value_type, ValueType::Number);
    assert_eq!(patient.constraints().len(), 1);

    let diagnosis = spec.entity("Diagnosis").unwrap();
    assert_eq!(diagnosis.kind(), EntityKind::Event);
    assert_eq!(diagnosis.granularity(), Some(Granularity::Day));
    assert!(matches!(
        diagnosis.prop_id_source(),
        PropositionIdSource::CaseMapped { .. }
    ));

    let staging = &spec.staging()[0];
    assert_eq!(staging.staging_area().to_string(), "stage.dx_tmp");
    assert_eq!(staging.unique_column(), "row_id");
    assert_eq!(staging.index_tablespace(), Some("idx_ts"));
    assert_eq!(staging.column_name("code", "Diagnosis"), "dx_code");
}

#[test]
fn test_loaded_spec_generates_staged_sql() {
    let spec = parse_backend_spec(BACKEND, &loader()).unwrap();
    let generator = SqlGenerator::new(Dialect::Default)
        .with_staging(spec.staging().to_vec())
        .unwrap();

    let diagnosis = generator
        .generate(spec.entity("Diagnosis").unwrap(), &QueryRequest::new(["Diabetes"]))
        .unwrap();
    assert!(diagnosis.sql.contains("JOIN stage.dx_tmp AS a2 ON (a1.id = a2.patient_id)"));
    assert!(diagnosis.sql.contains("CASE WHEN a2.dx_code LIKE '250.00' THEN 'Diabetes' END"));
    assert!(diagnosis.sql.contains("a2.dx_code IN ('250.00')"));

    let patient = generator
        .generate(spec.entity("Patient").unwrap(), &QueryRequest::new(["Patient"]))
        .unwrap();
    assert!(patient.sql.contains("WHERE a1.deleted = 0\n"));
}

#[test]
fn test_load_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backend.toml");
    fs::write(&path, BACKEND).unwrap();
    fs::write(dir.path().join("gender.txt"), "M\tMale\nF\tFemale\n").unwrap();
    fs::write(dir.path().join("icd9.txt"), "250.00\tDiabetes\n401.9\tHypertension\n").unwrap();

    let spec = load_backend_spec(&path, &DirMappingLoader::new(dir.path())).unwrap();
    assert!(spec.entity("Diagnosis").is_some());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_backend_spec(dir.path().join("nope.toml"), &loader()).unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { .. }));
}

#[test]
fn test_missing_mapping_resource() {
    let loader = InMemoryMappingLoader::new().with_resource("gender.txt", "M\tMale\n");
    let err = parse_backend_spec(BACKEND, &loader).unwrap_err();
    assert!(matches!(err, ConfigError::Spec(SpecError::MappingNotFound { .. })));
    assert!(err.to_string().contains("icd9.txt"));
}

#[test]
fn test_ambiguous_mapping_rejected() {
    let loader = loader().with_resource("icd9.txt", "250.00\tDiabetes\n250.00\tHypertension\n");
    let err = parse_backend_spec(BACKEND, &loader).unwrap_err();
    assert!(err.to_string().contains("250.00"));
}

#[test]
fn test_mapping_target_outside_prop_ids() {
    let loader = loader().with_resource("icd9.txt", "250.00\tDiabetes\n493.90\tAsthma\n");
    let err = parse_backend_spec(BACKEND, &loader).unwrap_err();
    assert!(matches!(err, ConfigError::Spec(SpecError::InvalidEntity { .. })));
}

#[test]
fn test_staging_for_unknown_entity() {
    let text = BACKEND.replace(r#"entities = ["Diagnosis"]"#, r#"entities = ["Lab"]"#);
    let err = parse_backend_spec(&text, &loader()).unwrap_err();
    assert!(matches!(err, ConfigError::Spec(SpecError::InvalidBackend(_))));
}
