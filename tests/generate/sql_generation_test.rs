use chrono::NaiveDate;
use propsql::prelude::*;
use propsql::spec::{datetime_to_position, Mappings, ReferenceSpec, SpecError};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::sync::Arc;

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
        .build()
        .unwrap()
}

fn dx_chain(column: &str) -> ColumnSpec {
    ColumnSpec::table(None, "patient").with_join(JoinSpec::inner(
        "id",
        "patient_id",
        ColumnSpec::new(None, "dx", column),
    ))
}

fn diagnosis() -> EntitySpec {
    let mappings =
        Mappings::parse("dx_codes", "250.00\tDiabetes\n401.9\tHypertension\n*\tOtherDx\n").unwrap();
    EntitySpec::builder("Diagnosis", EntityKind::Event, ColumnSpec::new(None, "patient", "id"))
        .prop_ids(["Diabetes", "Hypertension", "OtherDx"])
        .unique_id(dx_chain("dx_id"))
        .prop_id_source(PropositionIdSource::CaseMapped {
            column: dx_chain("code"),
            mappings,
        })
        .start(dx_chain("dx_date"))
        .build()
        .unwrap()
}

fn position(y: i32, m: u32, d: u32) -> i64 {
    let dt = NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    datetime_to_position(&dt)
}

fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn assert_parses(sql: &str) {
    if let Err(e) = Parser::parse_sql(&GenericDialect {}, sql) {
        panic!("generated SQL does not parse: {}\n{}", e, sql);
    }
}

#[test]
fn test_constant_with_key_ids_and_property_filter() {
    let spec = patient();
    let filter = PropertyValueFilter::new(
        ids(&["Patient"]),
        "status",
        Comparator::EqualTo,
        vec![Value::nominal("active")],
    )
    .unwrap();
    let request = QueryRequest::new(["Patient"])
        .with_key_ids(ids(&["P1", "P2"]))
        .with_filter(filter);

    let query = SqlGenerator::new(Dialect::Default)
        .generate(&spec, &request)
        .unwrap();

    assert_eq!(
        query.sql,
        "SELECT\n  a1.id,\n  a1.id,\n  a1.status,\n  a1.age\n\
         FROM patient AS a1\n\
         WHERE a1.id IN ('P1', 'P2') AND a1.status = 'active'\n\
         ORDER BY a1.id ASC"
    );
    assert_eq!(query.layout.key, 0);
    assert_eq!(query.layout.unique_ids, vec![1]);
    assert_eq!(
        query.layout.properties,
        vec![("status".to_string(), 2), ("age".to_string(), 3)]
    );
    assert_parses(&query.sql);
}

#[test]
fn test_oracle_drops_table_alias_keyword() {
    let query = SqlGenerator::new(Dialect::Oracle)
        .generate(&patient(), &QueryRequest::new(["Patient"]))
        .unwrap();
    assert!(query.sql.contains("\nFROM patient a1"));
    assert!(!query.sql.contains(" AS "));
}

#[test]
fn test_filter_for_other_entity_is_ignored() {
    let filter = PropertyValueFilter::new(
        ids(&["Encounter"]),
        "status",
        Comparator::EqualTo,
        vec![Value::nominal("active")],
    )
    .unwrap();
    let request = QueryRequest::new(["Patient"]).with_filter(filter);
    let sql = SqlGenerator::default().generate(&patient(), &request).unwrap().sql;
    assert!(!sql.contains("WHERE"));
}

#[test]
fn test_unknown_property_filter_is_rejected() {
    let filter = PropertyValueFilter::new(
        ids(&["Patient"]),
        "weight",
        Comparator::EqualTo,
        vec![Value::Number(70.0)],
    )
    .unwrap();
    let request = QueryRequest::new(["Patient"]).with_filter(filter);
    let err = SqlGenerator::default().generate(&patient(), &request).unwrap_err();
    assert!(matches!(err, SpecError::InvalidRequest { .. }));
    assert!(err.to_string().contains("weight"));
}

#[test]
fn test_event_with_join_case_and_position_filter() {
    let spec = diagnosis();
    let window = PositionFilter::new(
        ids(&["Diabetes"]),
        Some(Bound::new(position(2020, 1, 1), Some(Granularity::Day), Side::Start)),
        Some(Bound::new(position(2020, 1, 31), Some(Granularity::Day), Side::Start)),
    )
    .unwrap();
    let request = QueryRequest::new(["Diabetes", "Hypertension"]).with_filter(window);

    let query = SqlGenerator::new(Dialect::Default)
        .generate(&spec, &request)
        .unwrap();

    assert_eq!(
        query.sql,
        "SELECT\n  a1.id,\n  a2.dx_id,\n  \
         CASE WHEN a2.code LIKE '250.00' THEN 'Diabetes' \
         WHEN a2.code LIKE '401.9' THEN 'Hypertension' END,\n  \
         a2.dx_date\n\
         FROM patient AS a1\n\
         JOIN dx AS a2 ON (a1.id = a2.patient_id)\n\
         WHERE a2.dx_date >= TIMESTAMP '2020-01-01 00:00:00.000' \
         AND a2.dx_date <= TIMESTAMP '2020-01-31 23:59:59.999' \
         AND a2.code IN ('250.00', '401.9')\n\
         ORDER BY a1.id ASC, a2.dx_id ASC"
    );
    assert_eq!(query.layout.prop_id, Some(2));
    assert_eq!(query.layout.start, Some(3));
    assert_eq!(query.prop_ids, ids(&["Diabetes", "Hypertension"]));
    assert_parses(&query.sql);
}

#[test]
fn test_wildcard_target_requested_excludes_other_codes() {
    let request = QueryRequest::new(["Diabetes", "OtherDx"]);
    let sql = SqlGenerator::default().generate(&diagnosis(), &request).unwrap().sql;

    assert!(sql.contains(
        "CASE WHEN a2.code LIKE '250.00' THEN 'Diabetes' ELSE 'OtherDx' END"
    ));
    assert!(sql.contains("WHERE a2.code NOT IN ('401.9')"));
}

#[test]
fn test_all_prop_ids_requested_has_no_restriction() {
    let request = QueryRequest::new(["Diabetes", "Hypertension", "OtherDx"]);
    let sql = SqlGenerator::default().generate(&diagnosis(), &request).unwrap().sql;
    assert!(!sql.contains("WHERE"));
}

#[test]
fn test_oracle_chunks_large_key_lists() {
    let keys: Vec<String> = (0..2001).map(|i| format!("K{}", i)).collect();
    let request = QueryRequest::new(["Patient"]).with_key_ids(keys);
    let spec = patient();

    let oracle = SqlGenerator::new(Dialect::Oracle).generate(&spec, &request).unwrap().sql;
    let default = SqlGenerator::new(Dialect::Default).generate(&spec, &request).unwrap().sql;

    assert_eq!(oracle.matches("a1.id IN (").count(), 3);
    assert_eq!(oracle.matches(" OR a1.id IN (").count(), 2);
    assert!(oracle.contains("WHERE (a1.id IN ('K0', "));
    assert!(oracle.contains("a1.id IN ('K2000'))"));
    assert_eq!(default.matches("a1.id IN (").count(), 1);
    assert_parses(&default);
}

#[test]
fn test_exactly_one_thousand_keys_is_one_group() {
    let keys: Vec<String> = (0..1000).map(|i| format!("K{}", i)).collect();
    let request = QueryRequest::new(["Patient"]).with_key_ids(keys);
    let sql = SqlGenerator::new(Dialect::Oracle)
        .generate(&patient(), &request)
        .unwrap()
        .sql;
    assert_eq!(sql.matches("a1.id IN (").count(), 1);
    assert!(sql.contains("WHERE a1.id IN ('K0', "));
}

#[test]
fn test_generation_is_deterministic() {
    let spec = Arc::new(diagnosis());
    let request = QueryRequest::new(["Hypertension", "Diabetes"])
        .with_key_ids(ids(&["P2", "P1"]))
        .with_order(SortDir::Desc);
    let generator = SqlGenerator::new(Dialect::Oracle);

    let first = generator.generate(&spec, &request).unwrap();
    for _ in 0..5 {
        let again = generator.generate(&spec, &request).unwrap();
        assert_eq!(again.sql, first.sql);
        assert_eq!(again.layout, first.layout);
    }
}

#[test]
fn test_left_outer_property_join() {
    let spec = EntitySpec::builder(
        "Patient",
        EntityKind::Constant,
        ColumnSpec::new(None, "patient", "id"),
    )
    .prop_ids(["Patient"])
    .unique_id(ColumnSpec::new(None, "patient", "id"))
    .property(PropertySpec::new(
        "city",
        ColumnSpec::table(None, "patient").with_join(JoinSpec::left_outer(
            "address_id",
            "id",
            ColumnSpec::new(Some("geo"), "address", "city"),
        )),
        ValueType::Nominal,
    ))
    .build()
    .unwrap();

    let sql = SqlGenerator::default()
        .generate(&spec, &QueryRequest::new(["Patient"]))
        .unwrap()
        .sql;
    assert!(sql.contains("\nLEFT OUTER JOIN geo.address AS a2 ON (a1.address_id = a2.id)\n"));
    assert_parses(&sql);
}

fn coded_patient() -> EntitySpec {
    let mappings = Mappings::parse("patient_states", "A\tActive\nI\tInactive\n*\tOther\n").unwrap();
    EntitySpec::builder("Patient", EntityKind::Constant, ColumnSpec::new(None, "patient", "id"))
        .prop_ids(["Patient"])
        .unique_id(ColumnSpec::new(None, "patient", "id"))
        .property(
            PropertySpec::new(
                "state",
                ColumnSpec::new(None, "patient", "state"),
                ValueType::Nominal,
            )
            .with_mappings(mappings),
        )
        .build()
        .unwrap()
}

fn state_filter(comparator: Comparator, targets: &[&str]) -> std::result::Result<String, SpecError> {
    let filter = PropertyValueFilter::new(
        ids(&["Patient"]),
        "state",
        comparator,
        targets.iter().map(|t| Value::nominal(*t)).collect(),
    )
    .unwrap();
    let request = QueryRequest::new(["Patient"]).with_filter(filter);
    SqlGenerator::default()
        .generate(&coded_patient(), &request)
        .map(|q| q.sql)
}

#[test]
fn test_coded_property_filter_on_wildcard_target() {
    let sql = state_filter(Comparator::EqualTo, &["Other"]).unwrap();
    assert!(sql.contains("WHERE a1.state NOT IN ('A', 'I')\n"));
    assert_parses(&sql);

    let sql = state_filter(Comparator::NotEqualTo, &["Other"]).unwrap();
    assert!(sql.contains("WHERE a1.state IN ('A', 'I')\n"));

    let sql = state_filter(Comparator::In, &["Active", "Other"]).unwrap();
    assert!(sql.contains("WHERE a1.state <> 'I'\n"));

    let sql = state_filter(Comparator::NotIn, &["Active", "Other"]).unwrap();
    assert!(sql.contains("WHERE a1.state = 'I'\n"));
}

#[test]
fn test_coded_property_filter_on_listed_target() {
    let sql = state_filter(Comparator::EqualTo, &["Active"]).unwrap();
    assert!(sql.contains("WHERE a1.state = 'A'\n"));

    let sql = state_filter(Comparator::NotIn, &["Active", "Inactive"]).unwrap();
    assert!(sql.contains("WHERE a1.state NOT IN ('A', 'I')\n"));

    let err = state_filter(Comparator::GreaterThan, &["Other"]).unwrap_err();
    assert!(matches!(err, SpecError::InvalidRequest { .. }));
}

fn visit_chain(column: &str) -> ColumnSpec {
    ColumnSpec::table(None, "patient").with_join(JoinSpec::inner(
        "id",
        "patient_id",
        ColumnSpec::new(None, "visit", column),
    ))
}

fn visit() -> EntitySpec {
    visit_with(ColumnSpec::table(None, "patient").with_join(JoinSpec::inner(
        "id",
        "patient_id",
        ColumnSpec::table(None, "visit").with_join(JoinSpec::inner(
            "provider_id",
            "id",
            ColumnSpec::new(None, "provider", "id"),
        )),
    )))
}

fn visit_with(to_provider: ColumnSpec) -> EntitySpec {
    EntitySpec::builder("Visit", EntityKind::Event, ColumnSpec::new(None, "patient", "id"))
        .prop_ids(["Visit"])
        .unique_id(visit_chain("id"))
        .start(visit_chain("visit_date"))
        .reference(ReferenceSpec::new("provider", "Provider", vec![to_provider]))
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

fn provider_filter(property: &str) -> QueryRequest {
    let filter = PropertyValueFilter::new(
        ids(&["Provider"]),
        property,
        Comparator::EqualTo,
        vec![Value::nominal("cardiology")],
    )
    .unwrap();
    QueryRequest::new(["Visit"]).with_filter(filter)
}

#[test]
fn test_filter_on_referenced_entity_property() {
    let (visit, provider) = (visit(), provider());
    let query = SqlGenerator::default()
        .generate_with(&visit, &[&provider], &provider_filter("specialty"))
        .unwrap();

    assert_eq!(query.sql.matches("JOIN provider AS").count(), 1);
    assert!(query
        .sql
        .contains("JOIN visit AS a2 ON (a1.id = a2.patient_id)\nJOIN provider AS a3 ON (a2.provider_id = a3.id)\n"));
    assert!(query.sql.contains("WHERE a3.specialty = 'cardiology'\n"));
    assert!(query.layout.properties.is_empty());
    assert_parses(&query.sql);
}

#[test]
fn test_referenced_entity_filter_needs_the_referenced_spec() {
    let (visit, provider) = (visit(), provider());

    let sql = SqlGenerator::default()
        .generate(&visit, &provider_filter("specialty"))
        .unwrap()
        .sql;
    assert!(!sql.contains("WHERE"));
    assert!(!sql.contains("specialty"));

    let err = SqlGenerator::default()
        .generate_with(&visit, &[&provider], &provider_filter("npi"))
        .unwrap_err();
    assert!(matches!(err, SpecError::InvalidRequest { .. }));

    // The reference stops at the visit row's provider_id column.
    let shallow = visit_with(visit_chain("provider_id"));
    let err = SqlGenerator::default()
        .generate_with(&shallow, &[&provider], &provider_filter("specialty"))
        .unwrap_err();
    assert!(err.to_string().contains("not reachable"));
}
