//! Integration tests for the selection-projection workflow.

use relscan::{
    AttrDef, CompareOp, Database, DatabaseConfig, RelationSchema, RelscanError, SelectRequest,
    Value,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn employees() -> Vec<(&'static str, i32, f32)> {
    vec![
        ("alice", 10, 3000.0),
        ("bob", 100, 4200.5),
        ("carol", 2, 3.5),
        ("dave", 10, 1500.25),
        ("erin", -7, 99.0),
    ]
}

/// `emp(name: STRING(8), id: INTEGER, salary: FLOAT)` loaded with [`employees`]
/// and an empty `out(id: INTEGER, name: STRING(8))`.
fn setup_db() -> Database {
    init_tracing();
    let mut db = Database::new(DatabaseConfig::new()).expect("create database");
    db.create_relation(
        RelationSchema::new(
            "emp",
            vec![
                AttrDef::string("name", 8),
                AttrDef::integer("id"),
                AttrDef::float("salary"),
            ],
        )
        .expect("emp schema"),
    )
    .expect("create emp");
    db.create_relation(
        RelationSchema::new("out", vec![AttrDef::integer("id"), AttrDef::string("name", 8)])
            .expect("out schema"),
    )
    .expect("create out");

    for (name, id, salary) in employees() {
        db.insert_values(
            "emp",
            &[
                Value::String(name.into()),
                Value::Integer(id),
                Value::Float(salary),
            ],
        )
        .expect("insert employee");
    }
    db
}

fn id_name_request() -> SelectRequest {
    SelectRequest::new("out").project("emp", "id").project("emp", "name")
}

fn out_ids(db: &Database) -> Vec<i32> {
    db.scan_values("out")
        .expect("scan out")
        .iter()
        .filter_map(|row| row[0].as_integer())
        .collect()
}

// =============================================================================
// Operator Behaviour
// =============================================================================

mod select_tests {
    use super::*;

    #[test]
    fn test_select_without_filter_copies_every_record() {
        let mut db = setup_db();
        let summary = db.select(&id_name_request()).unwrap();

        assert_eq!(summary.records_inserted, 5);
        assert_eq!(summary.source_relation, "emp");
        assert_eq!(summary.output_record_length, 12);
        assert_eq!(db.record_count("out").unwrap(), 5);
        assert_eq!(out_ids(&db), vec![10, 100, 2, 10, -7]);
    }

    #[test]
    fn test_output_record_is_concatenation_in_projection_order() {
        let mut db = setup_db();
        db.select(&id_name_request()).unwrap();

        let sources = db.store().records("emp").unwrap();
        let outputs = db.store().records("out").unwrap();
        assert_eq!(sources.len(), outputs.len());
        for (src, out) in sources.iter().zip(&outputs) {
            let mut expected = src.data()[8..12].to_vec();
            expected.extend_from_slice(&src.data()[0..8]);
            assert_eq!(out.data(), expected.as_slice());
        }
    }

    #[test]
    fn test_integer_equality_is_numeric() {
        let mut db = setup_db();
        // "010" would never match "10" as bytes.
        let request = id_name_request().filter("emp", "id", CompareOp::Eq, "010");
        let summary = db.select(&request).unwrap();

        assert_eq!(summary.records_inserted, 2);
        assert_eq!(
            db.scan_values("out").unwrap(),
            vec![
                vec![Value::Integer(10), Value::String("alice".into())],
                vec![Value::Integer(10), Value::String("dave".into())],
            ]
        );
    }

    #[test]
    fn test_integer_ordering_is_numeric() {
        let mut db = setup_db();
        let request = id_name_request().filter("emp", "id", CompareOp::Gt, "9");
        db.select(&request).unwrap();
        // Lexically "100" < "9"; numerically it is greater.
        assert_eq!(out_ids(&db), vec![10, 100, 10]);
    }

    #[test]
    fn test_float_filter() {
        let mut db = setup_db();
        let request = id_name_request().filter("emp", "salary", CompareOp::Lte, "3.5");
        db.select(&request).unwrap();
        assert_eq!(out_ids(&db), vec![2]);

        let request = id_name_request().filter("emp", "salary", CompareOp::Ne, "3.5");
        db.select(&request).unwrap();
        assert_eq!(db.record_count("out").unwrap(), 5);
    }

    #[test]
    fn test_string_filter_is_lexical() {
        let mut db = setup_db();
        let request = id_name_request().filter("emp", "name", CompareOp::Lt, "c");
        db.select(&request).unwrap();
        assert_eq!(out_ids(&db), vec![10, 100]);
    }

    #[test]
    fn test_string_equality_ignores_padding() {
        let mut db = setup_db();
        let request = id_name_request().filter("emp", "name", CompareOp::Eq, "bob");
        assert_eq!(db.select(&request).unwrap().records_inserted, 1);
        assert_eq!(out_ids(&db), vec![100]);
    }

    #[test]
    fn test_filter_attribute_need_not_be_projected() {
        let mut db = setup_db();
        db.create_relation(RelationSchema::new("names", vec![AttrDef::string("n", 8)]).unwrap())
            .unwrap();
        let request = SelectRequest::new("names").project("emp", "name").filter(
            "emp",
            "salary",
            CompareOp::Gte,
            "3000",
        );
        db.select(&request).unwrap();
        assert_eq!(
            db.scan_values("names").unwrap(),
            vec![
                vec![Value::String("alice".into())],
                vec![Value::String("bob".into())],
            ]
        );
    }

    #[test]
    fn test_empty_source_succeeds_with_zero_records() {
        let mut db = setup_db();
        db.create_relation(RelationSchema::new("empty", vec![AttrDef::integer("id")]).unwrap())
            .unwrap();
        let request = SelectRequest::new("out").project("empty", "id");
        let summary = db.select(&request).unwrap();
        assert_eq!(summary.records_inserted, 0);
        assert_eq!(db.record_count("out").unwrap(), 0);
    }

    #[test]
    fn test_no_match_succeeds_with_zero_records() {
        let mut db = setup_db();
        let request = id_name_request().filter("emp", "id", CompareOp::Gt, "1000");
        assert_eq!(db.select(&request).unwrap().records_inserted, 0);
    }

    #[test]
    fn test_select_appends_to_existing_rows() {
        let mut db = setup_db();
        db.select(&id_name_request()).unwrap();
        db.select(&id_name_request().filter("emp", "id", CompareOp::Lt, "0"))
            .unwrap();
        assert_eq!(db.record_count("out").unwrap(), 6);
        assert_eq!(out_ids(&db).last(), Some(&-7));
    }

    #[test]
    fn test_unknown_projection_attribute_leaves_destination_untouched() {
        let mut db = setup_db();
        let request = id_name_request().project("emp", "age");
        let err = db.select(&request).unwrap_err();

        assert!(matches!(
            err,
            RelscanError::AttributeNotFound { ref relation, ref attribute }
                if relation == "emp" && attribute == "age"
        ));
        assert!(!err.is_pipeline_failure());
        assert_eq!(db.record_count("out").unwrap(), 0);
    }

    #[test]
    fn test_unknown_filter_attribute() {
        let mut db = setup_db();
        let request = id_name_request().filter("emp", "dept", CompareOp::Eq, "x");
        assert!(matches!(
            db.select(&request),
            Err(RelscanError::AttributeNotFound { .. })
        ));
        assert_eq!(db.record_count("out").unwrap(), 0);
    }

    #[test]
    fn test_malformed_literal_is_rejected() {
        let mut db = setup_db();
        for (attr, literal) in [("id", "ten"), ("id", ""), ("salary", "3.5.1"), ("salary", "NaN")] {
            let request = id_name_request().filter("emp", attr, CompareOp::Eq, literal);
            let err = db.select(&request).unwrap_err();
            assert!(
                matches!(err, RelscanError::LiteralParseFailed { .. }),
                "{attr} = {literal:?} gave {err}"
            );
        }
        assert_eq!(db.record_count("out").unwrap(), 0);
    }

    #[test]
    fn test_request_shape_errors() {
        let mut db = setup_db();

        let empty = SelectRequest::new("out");
        assert!(matches!(db.select(&empty), Err(RelscanError::SchemaError(_))));

        let into_itself = SelectRequest::new("emp").project("emp", "id");
        assert!(matches!(
            db.select(&into_itself),
            Err(RelscanError::SchemaError(_))
        ));

        let cross_relation = SelectRequest::new("out")
            .project("emp", "id")
            .filter("out", "id", CompareOp::Eq, "1");
        assert!(matches!(
            db.select(&cross_relation),
            Err(RelscanError::SchemaError(_))
        ));

        let join = SelectRequest::new("out").project("emp", "id").project("out", "name");
        assert!(matches!(db.select(&join), Err(RelscanError::SchemaError(_))));

        assert_eq!(db.record_count("out").unwrap(), 0);
    }

    #[test]
    fn test_missing_destination_is_output_open_failure() {
        let mut db = setup_db();
        let request = SelectRequest::new("nowhere").project("emp", "id");
        let err = db.select(&request).unwrap_err();

        assert!(err.is_pipeline_failure());
        match err {
            RelscanError::OutputOpenFailed { relation, source } => {
                assert_eq!(relation, "nowhere");
                assert!(matches!(*source, RelscanError::RelationNotFound(_)));
            }
            other => panic!("expected OutputOpenFailed, got {other}"),
        }
    }

    #[test]
    fn test_record_width_mismatch_is_insert_failure() {
        let mut db = setup_db();
        // out expects 12-byte records; projecting only `id` produces 4 bytes.
        let request = SelectRequest::new("out").project("emp", "id");
        let err = db.select(&request).unwrap_err();
        assert!(matches!(err, RelscanError::InsertFailed { .. }));
        assert_eq!(db.record_count("out").unwrap(), 0);
    }
}

// =============================================================================
// Snapshot Persistence
// =============================================================================

mod persistence_tests {
    use super::*;
    use relscan::StorageConfig;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn setup_test_env() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("create temp dir");
        let db_path = temp_dir.path().join("emp.relscan");
        (temp_dir, db_path)
    }

    #[test]
    fn test_save_and_reopen() {
        let (_temp, path) = setup_test_env();
        let mut db = setup_db();
        db.select(&id_name_request().filter("emp", "id", CompareOp::Eq, "10"))
            .unwrap();
        db.save(&path).unwrap();

        let reopened = Database::open(&path, DatabaseConfig::new()).unwrap();
        assert_eq!(reopened.catalog().relation_names(), vec!["emp", "out"]);
        assert_eq!(reopened.scan_values("emp").unwrap(), db.scan_values("emp").unwrap());
        assert_eq!(out_ids(&reopened), vec![10, 10]);
    }

    #[test]
    fn test_select_after_reopen() {
        let (_temp, path) = setup_test_env();
        setup_db().save(&path).unwrap();

        let mut db = Database::open(&path, DatabaseConfig::new()).unwrap();
        let summary = db
            .select(&id_name_request().filter("emp", "salary", CompareOp::Gt, "100"))
            .unwrap();
        assert_eq!(summary.records_inserted, 3);
    }

    #[test]
    fn test_read_only_database() {
        let (_temp, path) = setup_test_env();
        setup_db().save(&path).unwrap();

        let config = DatabaseConfig::new().with_read_only(true);
        let mut db = Database::open(&path, config).unwrap();
        assert_eq!(db.scan_values("emp").unwrap().len(), 5);
        assert!(matches!(db.select(&id_name_request()), Err(RelscanError::ReadOnly)));
        assert!(matches!(
            db.insert_values("out", &[Value::Integer(1), Value::String("x".into())]),
            Err(RelscanError::ReadOnly)
        ));
        assert!(matches!(db.save(&path), Err(RelscanError::ReadOnly)));
    }

    #[test]
    fn test_corrupted_snapshot_is_detected() {
        let (_temp, path) = setup_test_env();
        setup_db().save(&path).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            Database::open(&path, DatabaseConfig::new()),
            Err(RelscanError::ChecksumError(_))
        ));
    }

    #[test]
    fn test_bad_magic_and_truncation() {
        let (_temp, path) = setup_test_env();
        fs::write(&path, b"NOTASNAPSHOT-NOTASNAPSHOT").unwrap();
        assert!(matches!(
            Database::open(&path, DatabaseConfig::new()),
            Err(RelscanError::InvalidSnapshot(_))
        ));

        setup_db().save(&path).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(matches!(
            Database::open(&path, DatabaseConfig::new()),
            Err(RelscanError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let (_temp, path) = setup_test_env();
        assert!(matches!(
            Database::open(&path, DatabaseConfig::new()),
            Err(RelscanError::Io(_))
        ));
    }

    #[test]
    fn test_small_pages_span_many_pages() {
        let (_temp, path) = setup_test_env();
        let config =
            DatabaseConfig::new().with_storage(StorageConfig::new().with_page_size(64));
        let mut db = Database::new(config.clone()).unwrap();
        db.create_relation(RelationSchema::new("n", vec![AttrDef::integer("v")]).unwrap())
            .unwrap();
        db.create_relation(RelationSchema::new("m", vec![AttrDef::integer("v")]).unwrap())
            .unwrap();
        for v in 0..200 {
            db.insert_values("n", &[Value::Integer(v)]).unwrap();
        }
        db.save(&path).unwrap();

        let mut db = Database::open(&path, config).unwrap();
        let summary = db
            .select(&SelectRequest::new("m").project("n", "v").filter(
                "n",
                "v",
                CompareOp::Gte,
                "150",
            ))
            .unwrap();
        assert_eq!(summary.records_inserted, 50);
        let values = db.scan_values("m").unwrap();
        assert_eq!(values.first(), Some(&vec![Value::Integer(150)]));
        assert_eq!(values.last(), Some(&vec![Value::Integer(199)]));
    }
}

// =============================================================================
// Property Tests
// =============================================================================

mod proptest_select {
    use super::*;
    use proptest::prelude::*;

    fn op_strategy() -> impl Strategy<Value = CompareOp> {
        prop_oneof![
            Just(CompareOp::Eq),
            Just(CompareOp::Ne),
            Just(CompareOp::Lt),
            Just(CompareOp::Lte),
            Just(CompareOp::Gt),
            Just(CompareOp::Gte),
        ]
    }

    fn holds(op: CompareOp, value: i32, literal: i32) -> bool {
        match op {
            CompareOp::Eq => value == literal,
            CompareOp::Ne => value != literal,
            CompareOp::Lt => value < literal,
            CompareOp::Lte => value <= literal,
            CompareOp::Gt => value > literal,
            CompareOp::Gte => value >= literal,
        }
    }

    fn load(values: &[i32]) -> Database {
        let mut db = Database::new(DatabaseConfig::new()).unwrap();
        db.create_relation(
            RelationSchema::new("src", vec![AttrDef::integer("k"), AttrDef::string("tag", 3)])
                .unwrap(),
        )
        .unwrap();
        db.create_relation(
            RelationSchema::new("dst", vec![AttrDef::string("tag", 3), AttrDef::integer("k")])
                .unwrap(),
        )
        .unwrap();
        for (i, v) in values.iter().enumerate() {
            db.insert_values("src", &[Value::Integer(*v), Value::String(format!("{}", i % 100))])
                .unwrap();
        }
        db
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn test_filtered_count_matches_predicate(
            values in proptest::collection::vec(-50i32..50, 0..120),
            literal in -60i32..60,
            op in op_strategy(),
        ) {
            let mut db = load(&values);
            let request = SelectRequest::new("dst")
                .project("src", "tag")
                .project("src", "k")
                .filter("src", "k", op, literal.to_string());
            let summary = db.select(&request).unwrap();

            let expected: Vec<i32> =
                values.iter().copied().filter(|v| holds(op, *v, literal)).collect();
            prop_assert_eq!(summary.records_inserted, expected.len());

            let got: Vec<i32> = db
                .scan_values("dst")
                .unwrap()
                .iter()
                .filter_map(|row| row[1].as_integer())
                .collect();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn test_unfiltered_count_equals_source_count(
            values in proptest::collection::vec(any::<i32>(), 0..200),
        ) {
            let mut db = load(&values);
            let request = SelectRequest::new("dst").project("src", "tag").project("src", "k");
            let summary = db.select(&request).unwrap();
            prop_assert_eq!(summary.records_inserted, values.len());
            prop_assert_eq!(db.record_count("dst").unwrap(), values.len());
        }
    }
}
