use propsql::prelude::*;
use propsql::spec::{Mappings, PositionFormat, ReferenceSpec};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const SCHEMA: &str = "
    CREATE TABLE patient (id TEXT PRIMARY KEY, status TEXT, age INTEGER, born TEXT);
    CREATE TABLE encounter (
        id TEXT PRIMARY KEY,
        patient_id TEXT,
        start_pos INTEGER,
        finish_pos INTEGER,
        code TEXT
    );
    CREATE TABLE encounter_provider (encounter_id TEXT, provider_id TEXT);
    CREATE TABLE provider (id TEXT PRIMARY KEY, specialty TEXT);
    CREATE TABLE visit_provider (patient_id TEXT, visit_id TEXT, provider_id TEXT);

    INSERT INTO patient VALUES
        ('P1', 'active', 42, '1980-05-06 07:08:09.000'),
        ('P2', 'inactive', 37, '1990-01-02 03:04:05.000'),
        ('P3', 'active', NULL, NULL);
    INSERT INTO encounter VALUES
        ('E1', 'P1', 10, 20, 'IN'),
        ('E2', 'P1', 30, 35, 'OUT'),
        ('E3', 'P2', 5, NULL, 'IN'),
        ('E4', 'P2', 50, 60, 'ER');
    INSERT INTO encounter_provider VALUES
        ('E1', 'DR1'), ('E1', 'DR2'), ('E2', 'DR1'), ('E4', 'DR3');
    INSERT INTO provider VALUES ('DR1', 'cardiology'), ('DR2', 'oncology'), ('DR3', 'cardiology');
    INSERT INTO visit_provider VALUES ('P1', 'V1', 'DR1'), ('P1', 'V2', 'DR1'), ('P1', 'V1', 'DR2');
";

fn database() -> (TempDir, Arc<SqliteProvider>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warehouse.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    (dir, Arc::new(SqliteProvider::new(path)))
}

fn patient() -> EntitySpec {
    EntitySpec::builder("Patient", EntityKind::Constant, ColumnSpec::new(None, "patient", "id"))
        .prop_ids(["Patient"])
        .unique_id(ColumnSpec::new(None, "patient", "id"))
        .property(PropertySpec::new(
            "status",
            ColumnSpec::new(None, "patient", "status"),
            ValueType::Nominal,
        ))
        .property(PropertySpec::new(
            "age",
            ColumnSpec::new(None, "patient", "age"),
            ValueType::Number,
        ))
        .property(PropertySpec::new(
            "born",
            ColumnSpec::new(None, "patient", "born"),
            ValueType::Date,
        ))
        .build()
        .unwrap()
}

fn encounter() -> EntitySpec {
    let mappings =
        Mappings::parse("encounter_types", "IN\tInpatient\nOUT\tOutpatient\n*\tOther\n").unwrap();
    EntitySpec::builder(
        "Encounter",
        EntityKind::Event,
        ColumnSpec::new(None, "encounter", "patient_id"),
    )
    .prop_ids(["Inpatient", "Outpatient", "Other"])
    .unique_id(ColumnSpec::new(None, "encounter", "id"))
    .prop_id_source(PropositionIdSource::CaseMapped {
        column: ColumnSpec::new(None, "encounter", "code"),
        mappings,
    })
    .start(ColumnSpec::new(None, "encounter", "start_pos"))
    .finish(ColumnSpec::new(None, "encounter", "finish_pos"))
    .position_format(PositionFormat::Numeric)
    .reference(ReferenceSpec::new(
        "provider",
        "Provider",
        vec![ColumnSpec::table(None, "encounter").with_join(JoinSpec::left_outer(
            "id",
            "encounter_id",
            ColumnSpec::table(None, "encounter_provider").with_join(JoinSpec::left_outer(
                "provider_id",
                "id",
                ColumnSpec::new(None, "provider", "id"),
            )),
        ))],
    ))
    .build()
    .unwrap()
}

fn provider() -> EntitySpec {
    EntitySpec::builder("Provider", EntityKind::Constant, ColumnSpec::new(None, "provider", "id"))
        .prop_ids(["Provider"])
        .unique_id(ColumnSpec::new(None, "provider", "id"))
        .property(PropertySpec::new(
            "specialty",
            ColumnSpec::new(None, "provider", "specialty"),
            ValueType::Nominal,
        ))
        .build()
        .unwrap()
}

// One row per visit and provider, so a visit spans several rows.
fn visit() -> EntitySpec {
    EntitySpec::builder(
        "Visit",
        EntityKind::Constant,
        ColumnSpec::new(None, "visit_provider", "patient_id"),
    )
    .prop_ids(["Visit"])
    .unique_id(ColumnSpec::new(None, "visit_provider", "visit_id"))
    .reference(ReferenceSpec::new(
        "provider",
        "Provider",
        vec![ColumnSpec::new(None, "visit_provider", "provider_id")],
    ))
    .build()
    .unwrap()
}

fn backend(provider: Arc<SqliteProvider>) -> RelationalBackend {
    let spec = BackendSpec::new(vec![patient(), encounter(), self::provider(), visit()], vec![]).unwrap();
    RelationalBackend::new(spec, Dialect::Sqlite, provider).with_backoff(Duration::ZERO)
}

fn patient_filter(property: &str, comparator: Comparator, value: Value) -> QueryRequest {
    let filter = PropertyValueFilter::new(vec!["Patient".into()], property, comparator, vec![value]).unwrap();
    QueryRequest::new(["Patient"]).with_filter(filter)
}

fn key_ids(props: &[Proposition]) -> Vec<&str> {
    props.iter().map(|p| p.key_id()).collect()
}

fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> chrono::NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

fn collect(backend: &RelationalBackend, entity: &str, request: &QueryRequest) -> Vec<Proposition> {
    backend
        .generate_and_execute(entity, request, ExecOptions::default())
        .unwrap()
        .map(|p| p.unwrap())
        .collect()
}

#[test]
fn test_constants_end_to_end() {
    let (_dir, provider) = database();
    let backend = backend(provider);

    let filter = PropertyValueFilter::new(
        vec!["Patient".into()],
        "status",
        Comparator::EqualTo,
        vec![Value::nominal("active")],
    )
    .unwrap();
    let request = QueryRequest::new(["Patient"])
        .with_key_ids(["P1", "P2", "P3"])
        .with_filter(filter);

    let props = collect(&backend, "Patient", &request);
    assert_eq!(props.len(), 2);

    assert_eq!(props[0].key_id(), "P1");
    assert_eq!(props[0].id(), "Patient");
    assert_eq!(props[0].property("status"), Some(&Value::nominal("active")));
    assert_eq!(props[0].property("age"), Some(&Value::Number(42.0)));

    assert_eq!(props[1].key_id(), "P3");
    assert_eq!(props[1].property("age"), None);
    assert_eq!(props[1].property("born"), None);
}

#[test]
fn test_number_filter_and_value_through_sqlite() {
    let (_dir, provider) = database();
    let backend = backend(provider);
    let request = patient_filter("age", Comparator::GreaterThan, Value::Number(40.0));

    let props = collect(&backend, "Patient", &request);
    assert_eq!(key_ids(&props), vec!["P1"]);
    assert_eq!(props[0].property("age"), Some(&Value::Number(42.0)));
}

#[test]
fn test_date_filter_and_value_through_sqlite() {
    let (_dir, provider) = database();
    let backend = backend(provider);
    let born = datetime(1990, 1, 2, 3, 4, 5);
    let request = patient_filter("born", Comparator::EqualTo, Value::Date(born));

    let sql = backend.generate_sql("Patient", &request).unwrap();
    assert!(sql.contains("a1.born = '1990-01-02 03:04:05.000'"));

    let props = collect(&backend, "Patient", &request);
    assert_eq!(key_ids(&props), vec!["P2"]);
    assert_eq!(props[0].property("born"), Some(&Value::Date(born)));

    let request = patient_filter(
        "born",
        Comparator::LessThan,
        Value::Date(datetime(1985, 1, 1, 0, 0, 0)),
    );
    let props = collect(&backend, "Patient", &request);
    assert_eq!(key_ids(&props), vec!["P1"]);
    assert_eq!(
        props[0].property("born"),
        Some(&Value::Date(datetime(1980, 5, 6, 7, 8, 9)))
    );
}

#[test]
fn test_string_filter_and_value_through_sqlite() {
    let (_dir, provider) = database();
    let backend = backend(provider);
    let request = patient_filter("status", Comparator::EqualTo, Value::nominal("inactive"));

    let props = collect(&backend, "Patient", &request);
    assert_eq!(key_ids(&props), vec!["P2"]);
    assert_eq!(props[0].property("status"), Some(&Value::nominal("inactive")));
}

#[test]
fn test_rows_of_one_object_stored_apart_are_merged() {
    let (_dir, provider) = database();
    let backend = backend(provider);
    let request = QueryRequest::new(["Visit"]);

    let sql = backend.generate_sql("Visit", &request).unwrap();
    assert!(sql.ends_with("ORDER BY a1.patient_id ASC, a1.visit_id ASC"));

    let props = collect(&backend, "Visit", &request);
    let summary: Vec<(String, Vec<String>)> = props
        .iter()
        .map(|p| {
            let mut providers: Vec<String> =
                p.references("provider").iter().map(|u| u.to_string()).collect();
            providers.sort();
            (p.unique_id().to_string(), providers)
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (
                "Visit[V1]".to_string(),
                vec!["Provider[DR1]".to_string(), "Provider[DR2]".to_string()],
            ),
            ("Visit[V2]".to_string(), vec!["Provider[DR1]".to_string()]),
        ]
    );
}

#[test]
fn test_filter_on_referenced_provider_property() {
    let (_dir, provider) = database();
    let backend = backend(provider);
    let filter = PropertyValueFilter::new(
        vec!["Provider".into()],
        "specialty",
        Comparator::EqualTo,
        vec![Value::nominal("cardiology")],
    )
    .unwrap();
    let request = QueryRequest::new(["Inpatient", "Outpatient", "Other"])
        .with_filter(filter)
        .with_order(SortDir::Asc);

    let props = collect(&backend, "Encounter", &request);
    let summary: Vec<(String, Vec<String>)> = props
        .iter()
        .map(|p| {
            let providers: Vec<String> =
                p.references("provider").iter().map(|u| u.to_string()).collect();
            (p.unique_id().to_string(), providers)
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Encounter[E1]".to_string(), vec!["Provider[DR1]".to_string()]),
            ("Encounter[E2]".to_string(), vec!["Provider[DR1]".to_string()]),
            ("Encounter[E4]".to_string(), vec!["Provider[DR3]".to_string()]),
        ]
    );
}

#[test]
fn test_events_merge_references_across_join_rows() {
    let (_dir, provider) = database();
    let backend = backend(provider);
    let request = QueryRequest::new(["Inpatient", "Outpatient", "Other"]).with_order(SortDir::Asc);

    let props = collect(&backend, "Encounter", &request);
    let summary: Vec<(String, String, Vec<String>)> = props
        .iter()
        .map(|p| {
            let mut providers: Vec<String> =
                p.references("provider").iter().map(|u| u.to_string()).collect();
            providers.sort();
            (p.unique_id().to_string(), p.id().to_string(), providers)
        })
        .collect();

    assert_eq!(
        summary,
        vec![
            (
                "Encounter[E1]".to_string(),
                "Inpatient".to_string(),
                vec!["Provider[DR1]".to_string(), "Provider[DR2]".to_string()],
            ),
            (
                "Encounter[E2]".to_string(),
                "Outpatient".to_string(),
                vec!["Provider[DR1]".to_string()],
            ),
            ("Encounter[E3]".to_string(), "Inpatient".to_string(), vec![]),
            (
                "Encounter[E4]".to_string(),
                "Other".to_string(),
                vec!["Provider[DR3]".to_string()],
            ),
        ]
    );

    match &props[2] {
        Proposition::Event(event) => {
            assert_eq!(event.start, 5);
            assert_eq!(event.finish, None);
        }
        other => panic!("expected an event, got {:?}", other.kind()),
    }
}

#[test]
fn test_numeric_position_filter_and_prop_id_restriction() {
    let (_dir, provider) = database();
    let backend = backend(provider);

    let window = PositionFilter::new(
        vec!["Inpatient".into()],
        Some(Bound::new(8, None, Side::Start)),
        Some(Bound::new(40, None, Side::Finish)),
    )
    .unwrap();
    let request = QueryRequest::new(["Inpatient", "Outpatient"])
        .with_filter(window)
        .with_order(SortDir::Asc);

    let sql = backend.generate_sql("Encounter", &request).unwrap();
    assert!(sql.contains("a1.start_pos >= 8 AND a1.finish_pos <= 40"));

    let ids: Vec<String> = collect(&backend, "Encounter", &request)
        .iter()
        .map(|p| p.unique_id().to_string())
        .collect();
    assert_eq!(ids, vec!["Encounter[E1]", "Encounter[E2]"]);
}

#[test]
fn test_bad_sql_surfaces_as_read_error() {
    let (_dir, provider) = database();
    let spec = BackendSpec::new(
        vec![EntitySpec::builder(
            "Ghost",
            EntityKind::Constant,
            ColumnSpec::new(None, "no_such_table", "id"),
        )
        .prop_ids(["Ghost"])
        .unique_id(ColumnSpec::new(None, "no_such_table", "id"))
        .build()
        .unwrap()],
        vec![],
    )
    .unwrap();
    let backend = RelationalBackend::new(spec, Dialect::Sqlite, provider).with_backoff(Duration::ZERO);
    let options = ExecOptions {
        fetch_size: 10,
        retries: 1,
    };

    let err = backend
        .generate_and_execute("Ghost", &QueryRequest::new(["Ghost"]), options)
        .unwrap_err();
    match err {
        Error::Read(read) => {
            assert_eq!(read.errors.len(), 2);
            assert!(read.to_string().contains("no_such_table"));
        }
        other => panic!("expected a read error, got {}", other),
    }
}

#[test]
fn test_unknown_entity_is_configuration_error() {
    let (_dir, provider) = database();
    let backend = backend(provider);
    let err = backend
        .generate_and_execute("Nope", &QueryRequest::new(["Nope"]), ExecOptions::default())
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_provider_path() {
    let (dir, provider) = database();
    assert!(provider.path().starts_with(dir.path()));
    assert!(provider.path().exists());
}
