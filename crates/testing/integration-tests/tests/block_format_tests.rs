//! Export/import of lowered programs through the TAC block format

use el_driver::{ElcConfig, import_tac};
use el_tac::{Instr, PartialRead, TacFormatError, deserialize, serialize};
use expect_test::expect;
use integration_tests::TestFixture;
use tempfile::TempDir;

#[test]
fn test_exported_file_layout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("straight_line.tac");

    let session = TestFixture::load("valid/straight_line.json")
        .unwrap()
        .compile()
        .unwrap();
    session.export_tac(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let head: String = text.lines().take(14).map(|line| format!("{line}\n")).collect();
    expect![[r#"
        TYPE: LABEL
        ARG1: NULL
        ARG2: NULL
        RESULT: main

        TYPE: LOAD
        ARG1: a.g
        ARG2: NULL
        RESULT: t0

        TYPE: LOAD
        ARG1: b.g
        ARG2: NULL
        RESULT: t1
    "#]]
    .assert_eq(&head);
}

#[test]
fn test_every_fixture_survives_export_and_import() {
    let dir = TempDir::new().unwrap();
    let fixtures = TestFixture::from_dir(integration_tests::fixtures_dir().join("valid")).unwrap();

    for fixture in &fixtures {
        let session = fixture.compile().unwrap();
        let path = dir.path().join(format!("{}.tac", fixture.name));
        session.export_tac(&path).unwrap();

        let imported = import_tac(&path, session.config()).unwrap();
        let original: Vec<Instr> = session.tac().cloned().collect();
        assert_eq!(imported, original, "{}", fixture.name);
    }
}

#[test]
fn test_in_memory_round_trip() {
    let session = TestFixture::load("valid/while_loop.json")
        .unwrap()
        .compile()
        .unwrap();

    let mut buffer = Vec::new();
    serialize(session.tac(), &mut buffer).unwrap();
    let parsed = deserialize(buffer.as_slice()).unwrap();

    assert_eq!(el_tac::render(&parsed), session.render_tac());
}

#[test]
fn test_corrupt_block_keeps_recovered_prefix() {
    let text = "\
TYPE: LABEL
ARG1: NULL
ARG2: NULL
RESULT: main

TYPE: LOAD
ARG1: 8
ARG2: NULL
RESULT: t0

TYPE: JUMP
ARG1: L0
ARG2: NULL
RESULT: NULL
";
    let PartialRead { parsed, error } = deserialize(text.as_bytes()).unwrap_err();

    assert_eq!(parsed, vec![Instr::label("main"), Instr::load("8", "t0")]);
    assert!(matches!(
        error,
        TacFormatError::UnknownOpcode { line: 11, ref mnemonic } if mnemonic == "JUMP"
    ));
}

#[test]
fn test_configured_field_limit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("long.tac");

    let session = TestFixture::load("valid/nested_procedures.json")
        .unwrap()
        .compile_with(ElcConfig {
            max_field_len: 8,
            ..ElcConfig::default()
        })
        .unwrap();

    // `outer.i.l` is nine bytes long.
    let err = session.export_tac(&path).unwrap_err();
    assert!(matches!(
        err,
        TacFormatError::FieldTooLong { len: 9, limit: 8, ref value, .. } if value == "outer.i.l"
    ));

    let relaxed = ElcConfig::default();
    std::fs::write(&path, "TYPE: LOAD\nARG1: outer.i.l\nARG2: NULL\nRESULT: t5\n").unwrap();
    assert_eq!(
        import_tac(&path, &relaxed).unwrap(),
        vec![Instr::load("outer.i.l", "t5")]
    );
    assert!(import_tac(&path, session.config()).is_err());
}
