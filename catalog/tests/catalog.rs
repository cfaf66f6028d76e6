use branch_hop_catalog::{Catalog, ConfigError};

#[test]
fn toml_catalog_keeps_declaration_order_and_defaults() {
    let catalog = Catalog::from_toml_str(
        r#"
        [[pattern]]
        name = "hop"
        offsets = [[0.0, 0.0, 4.0]]
        weight = 2.0

        [[pattern]]
        offsets = [[1.0, 0.0, 4.0], [-1.0, 0.5, 8.0]]
        difficulty = 2
        "#,
    )
    .expect("catalog parses");

    let names: Vec<&str> = catalog.templates().iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["hop", "pattern-1"]);
    assert_eq!(catalog.templates()[1].weight(), 1.0);
    assert_eq!(catalog.templates()[1].difficulty(), 2);
    assert!((catalog.total_weight() - 3.0).abs() < 1e-9);
}

#[test]
fn malformed_patterns_are_skipped() {
    let catalog = Catalog::from_toml_str(
        r#"
        [[pattern]]
        name = "empty"
        offsets = []

        [[pattern]]
        name = "backwards"
        offsets = [[0.0, 0.0, 8.0], [0.0, 0.0, 4.0]]

        [[pattern]]
        name = "negative"
        offsets = [[0.0, 0.0, 4.0]]
        weight = -1.0

        [[pattern]]
        name = "survivor"
        offsets = [[0.0, 0.0, 4.0]]
        "#,
    )
    .expect("document parses");

    assert_eq!(catalog.templates().len(), 1);
    assert_eq!(catalog.templates()[0].name(), "survivor");
}

#[test]
fn catalog_without_valid_patterns_falls_back_to_straight() {
    let catalog = Catalog::from_toml_str("").expect("empty document parses");
    assert_eq!(catalog.templates().len(), 1);
    assert_eq!(catalog.templates()[0].name(), "straight");
}

#[test]
fn syntax_errors_surface_as_parse_errors() {
    let error = Catalog::from_toml_str("[[pattern]\noffsets = 3").unwrap_err();
    assert!(matches!(error, ConfigError::Parse(_)));
    assert!(error.to_string().starts_with("failed to parse pattern catalog"));
}

#[test]
fn selection_walks_cumulative_weights() {
    let catalog = Catalog::from_toml_str(
        r#"
        [[pattern]]
        name = "a"
        offsets = [[0.0, 0.0, 4.0]]
        weight = 1.0

        [[pattern]]
        name = "b"
        offsets = [[0.0, 0.0, 4.0]]
        weight = 3.0
        "#,
    )
    .expect("catalog parses");

    assert_eq!(catalog.select(0.0).name(), "a");
    assert_eq!(catalog.select(0.25).name(), "a");
    assert_eq!(catalog.select(0.26).name(), "b");
    assert_eq!(catalog.select(1.0).name(), "b");
}
