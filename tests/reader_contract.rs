// Contract tests for the public row reading and serialization API.
use std::io::Cursor;

use rowline::api::{
    ColumnSerializer, Error, ErrorKind, JsonTable, LineValidatorAggregator, MaxLength, NotBlank,
    ReaderConfig, RowIterator, RowReader, SerializerConfig,
};

fn reader(input: &str, config: ReaderConfig) -> RowReader<impl rowline::api::LineSource> {
    RowReader::from_reader(Cursor::new(input.as_bytes().to_vec()), config)
}

#[test]
fn iterator_yields_every_row_then_stays_exhausted() {
    let input = "a,1\nb,2\nc,3\n";
    let mut rows = RowIterator::new(reader(input, ReaderConfig::default())).expect("iterator");

    let mut seen = Vec::new();
    while rows.has_next() {
        seen.push(rows.next_row().expect("row"));
    }
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2], vec!["c", "3"]);

    for _ in 0..3 {
        assert!(!rows.has_next());
        assert!(rows.failure().is_none());
    }
    assert!(rows.next().is_none());
    assert_eq!(rows.remove().unwrap_err().kind(), ErrorKind::Usage);
}

#[test]
fn empty_input_has_no_rows() {
    let rows = RowIterator::new(reader("", ReaderConfig::default())).expect("iterator");
    assert!(!rows.has_next());
    assert_eq!(rows.count(), 0);
}

#[test]
fn aggregated_line_failures_surface_through_the_iterator() {
    let mut validators = LineValidatorAggregator::new();
    validators.add_validator(NotBlank);
    validators.add_validator(MaxLength(5));

    let input = "ok\nhello world\n";
    let source = reader(input, ReaderConfig::default()).with_line_validators(validators);
    let mut rows = RowIterator::new(source).expect("iterator");

    assert_eq!(rows.next_row().expect("first row"), vec!["ok"]);
    assert!(rows.has_next());
    let parked = rows.failure().expect("parked failure");
    assert_eq!(parked.kind(), ErrorKind::Validation);
    assert_eq!(parked.row(), Some(2));
    assert!(parked.message().unwrap().contains("too long"));
    assert!(!parked.message().unwrap().contains("blank"));

    let err = rows.next_row().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Exhausted);
    assert_eq!(err.root_cause().kind(), ErrorKind::Validation);
    assert!(!rows.has_next());
}

#[test]
fn has_next_loop_reports_the_failure_that_ended_iteration() {
    let input = "a\n\"open\nb\nc\nd\n";
    let config = ReaderConfig::new().with_multiline_limit(2);
    let mut rows = RowIterator::new(reader(input, config)).expect("iterator");

    let mut seen = Vec::new();
    let mut errors = Vec::new();
    while rows.has_next() {
        match rows.next_row() {
            Ok(row) => seen.push(row),
            Err(err) => errors.push(err),
        }
    }
    assert_eq!(seen, vec![vec!["a".to_string()]]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::Exhausted);
    let cause = errors[0].root_cause();
    assert_eq!(cause.kind(), ErrorKind::MultilineLimit);
    assert_eq!(cause.row(), Some(2));
}

#[test]
fn multiline_limit_boundaries() {
    let input = "\"a\nb\nc\"\n";
    for (limit, ok) in [(0, true), (-1, true), (3, true), (4, true), (2, false), (1, false)] {
        let config = ReaderConfig::new().with_multiline_limit(limit);
        let result = reader(input, config).read_next();
        match (ok, result) {
            (true, Ok(Some(row))) => assert_eq!(row, vec!["a\nb\nc"]),
            (false, Err(err)) => {
                assert_eq!(err.kind(), ErrorKind::MultilineLimit, "limit {limit}");
                assert_eq!(err.row(), Some(1));
            }
            (expected, other) => panic!("limit {limit}: expected ok={expected}, got {other:?}"),
        }
    }
}

#[test]
fn multiline_failure_names_the_record_being_assembled() {
    let input = "x\ny\n\"p\nq\nr\"\n";
    let config = ReaderConfig::new().with_multiline_limit(2);
    let mut source = reader(input, config);
    assert_eq!(source.read_next().unwrap(), Some(vec!["x".to_string()]));
    assert_eq!(source.read_next().unwrap(), Some(vec!["y".to_string()]));
    let err: Error = source.read_next().unwrap_err();
    assert_eq!(err.row(), Some(3));
    assert_eq!(err.context(), Some("\"p\nq\nr\""));
}

#[test]
fn json_table_rows_serialize_with_null_substitute() {
    let doc = r#"{
        "columns": [
            {"label": "ID", "type": "int"},
            {"label": "NAME", "type": "text"},
            {"label": "CREATED", "type": "date"}
        ],
        "rows": [[42, "Bob", null]]
    }"#;
    let table: JsonTable = doc.parse().expect("table");
    let serializer = ColumnSerializer::new(SerializerConfig::default()).expect("serializer");

    let mut rows = table.rows();
    let mut row = rows.next().expect("row");
    assert_eq!(serializer.column_names(&row).unwrap(), vec!["ID", "NAME", "CREATED"]);
    assert_eq!(
        serializer.column_values_default(&mut row).unwrap(),
        vec!["42", "Bob", ""]
    );
    assert!(rows.next().is_none());
}
