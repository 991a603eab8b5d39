use propsql::generate::TableAliaser;
use propsql::prelude::*;

fn to_demographics(column: &str) -> ColumnSpec {
    ColumnSpec::table(None, "patient").with_join(JoinSpec::inner(
        "id",
        "patient_id",
        ColumnSpec::new(None, "demographics", column),
    ))
}

/// Flatten chains the way the generator does: every link of every chain, in order.
fn flatten(chains: &[ColumnSpec]) -> Vec<&ColumnSpec> {
    chains.iter().flat_map(|c| c.links()).collect()
}

#[test]
fn test_root_links_share_first_alias() {
    let chains = vec![
        ColumnSpec::new(None, "patient", "id"),
        ColumnSpec::new(None, "patient", "status"),
    ];
    let links = flatten(&chains);
    let aliaser = TableAliaser::new(&links);

    assert_eq!(aliaser.alias(0).as_deref(), Some("a1"));
    assert_eq!(aliaser.alias(1).as_deref(), Some("a1"));
    assert!(aliaser.is_first_use(0));
    assert!(!aliaser.is_first_use(1));
}

#[test]
fn test_same_join_reuses_alias() {
    let chains = vec![
        ColumnSpec::new(None, "patient", "id"),
        to_demographics("gender"),
        to_demographics("race"),
    ];
    let links = flatten(&chains);
    let aliaser = TableAliaser::new(&links);

    // patient.id, patient ->, demographics.gender, patient ->, demographics.race
    assert_eq!(links.len(), 5);
    let aliases: Vec<String> = (0..links.len()).filter_map(|i| aliaser.alias(i)).collect();
    assert_eq!(aliases, vec!["a1", "a1", "a2", "a1", "a2"]);
    assert_eq!(aliaser.alias_count(), 2);
    assert!(aliaser.is_first_use(2));
    assert!(!aliaser.is_first_use(4));
}

#[test]
fn test_different_join_keys_get_fresh_alias() {
    let by_mother = ColumnSpec::table(None, "patient").with_join(JoinSpec::inner(
        "mother_id",
        "id",
        ColumnSpec::new(None, "person", "name"),
    ));
    let by_father = ColumnSpec::table(None, "patient").with_join(JoinSpec::inner(
        "father_id",
        "id",
        ColumnSpec::new(None, "person", "name"),
    ));
    let chains = vec![ColumnSpec::new(None, "patient", "id"), by_mother, by_father];
    let links = flatten(&chains);
    let aliaser = TableAliaser::new(&links);

    assert_eq!(aliaser.alias(2).as_deref(), Some("a2"));
    assert_eq!(aliaser.alias(4).as_deref(), Some("a3"));
    assert_eq!(aliaser.alias_count(), 3);
}

#[test]
fn test_join_type_distinguishes_aliases() {
    let inner = to_demographics("gender");
    let outer = ColumnSpec::table(None, "patient").with_join(JoinSpec::left_outer(
        "id",
        "patient_id",
        ColumnSpec::new(None, "demographics", "gender"),
    ));
    let chains = vec![ColumnSpec::new(None, "patient", "id"), inner, outer];
    let links = flatten(&chains);
    let aliaser = TableAliaser::new(&links);

    assert_ne!(aliaser.alias(2), aliaser.alias(4));
}

#[test]
fn test_schema_distinguishes_tables() {
    let chains = vec![
        ColumnSpec::new(None, "patient", "id"),
        ColumnSpec::table(None, "patient").with_join(JoinSpec::inner(
            "id",
            "patient_id",
            ColumnSpec::new(Some("archive"), "demographics", "gender"),
        )),
        to_demographics("gender"),
    ];
    let links = flatten(&chains);
    let aliaser = TableAliaser::new(&links);

    assert_eq!(aliaser.alias(2).as_deref(), Some("a2"));
    assert_eq!(aliaser.alias(4).as_deref(), Some("a3"));
}

#[test]
fn test_aliases_follow_first_appearance() {
    let chains = vec![
        ColumnSpec::new(None, "patient", "id"),
        to_demographics("gender"),
        ColumnSpec::table(None, "patient").with_join(JoinSpec::inner(
            "id",
            "patient_id",
            ColumnSpec::new(None, "encounter", "id"),
        )),
    ];
    let links = flatten(&chains);
    let aliaser = TableAliaser::new(&links);

    assert_eq!(aliaser.alias(2).as_deref(), Some("a2"));
    assert_eq!(aliaser.alias(4).as_deref(), Some("a3"));
    assert_eq!(aliaser.len(), links.len());
}
