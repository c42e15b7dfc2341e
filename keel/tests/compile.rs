//! End-to-end tests driving the public [`keel::Driver`] interface.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use codespan_reporting::term::termcolor::{Buffer, ColorSpec, WriteColor};

/// A clonable sink so tests can read back what the driver wrote.
#[derive(Clone)]
struct SharedBuffer(Arc<Mutex<Buffer>>);

impl SharedBuffer {
    fn new() -> SharedBuffer {
        SharedBuffer(Arc::new(Mutex::new(Buffer::no_color())))
    }

    fn contents(&self) -> String {
        let buffer = self.0.lock().unwrap();
        String::from_utf8_lossy(buffer.as_slice()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

impl WriteColor for SharedBuffer {
    fn supports_color(&self) -> bool {
        false
    }

    fn set_color(&mut self, _spec: &ColorSpec) -> io::Result<()> {
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn driver() -> (keel::Driver, SharedBuffer, SharedBuffer) {
    let mut driver = keel::Driver::new();
    let diagnostics = SharedBuffer::new();
    let output = SharedBuffer::new();
    driver.set_diagnostic_writer(diagnostics.clone());
    driver.set_emit_writer(output.clone());
    (driver, diagnostics, output)
}

#[test]
fn checking_a_valid_schema_succeeds() {
    let (mut driver, diagnostics, _) = driver();
    let file_id = driver.load_source_string(
        "demo.keel".to_owned(),
        "module Demo {
            enum Color { Red; Green; Blue; }
            record Point { int X; int Y; }
            service Calc { c->s Add(int A, int B) returns (int Sum); }
        }"
        .to_owned(),
    );

    let status = driver.check_modules(&[file_id]);

    assert_eq!(status.exit_code(), 0);
    assert_eq!(diagnostics.contents(), "");
}

#[test]
fn syntax_errors_set_the_exit_code() {
    let (mut driver, diagnostics, _) = driver();
    let file_id = driver.load_source_string(
        "demo.keel".to_owned(),
        "module Demo { record Point { int X } }".to_owned(),
    );

    let status = driver.check_modules(&[file_id]);

    assert_eq!(status.exit_code(), 1);
    assert!(diagnostics.contents().contains("ESyntax"));
}

#[test]
fn unknown_types_come_with_a_suggestion() {
    let (mut driver, diagnostics, _) = driver();
    let file_id = driver.load_source_string(
        "demo.keel".to_owned(),
        "module Demo {
            record Point { int X; }
            record Line { Poin Start; Poin End; }
        }"
        .to_owned(),
    );

    let status = driver.check_modules(&[file_id]);

    assert_eq!(status.exit_code(), 1);
    let rendered = diagnostics.contents();
    assert!(rendered.contains("EUnknownType"), "{rendered}");
    assert!(rendered.contains("did you mean `Point`?"), "{rendered}");
}

#[test]
fn modules_resolve_across_files_through_using() {
    let (mut driver, diagnostics, _) = driver();
    let common = driver.load_source_string(
        "common.keel".to_owned(),
        "module Common { record Id { long Value; } }".to_owned(),
    );
    let demo = driver.load_source_string(
        "demo.keel".to_owned(),
        "module Demo {
            using Common;
            record Item { Id Key; string Name; }
        }"
        .to_owned(),
    );

    let status = driver.check_modules(&[common, demo]);

    assert_eq!(status.exit_code(), 0);
    assert_eq!(diagnostics.contents(), "");
}

#[test]
fn generate_emits_to_the_writer_without_an_out_dir() {
    let (mut driver, diagnostics, output) = driver();
    let file_id = driver.load_source_string(
        "demo.keel".to_owned(),
        "module Demo { record Point { int X; int Y; } }".to_owned(),
    );

    let status = driver.generate_modules(&[file_id], "schema", None);

    assert_eq!(status.exit_code(), 0, "{}", diagnostics.contents());
    let rendered = output.contents();
    assert!(rendered.contains("module Demo {"), "{rendered}");
    assert!(rendered.contains("int X;"), "{rendered}");
}

#[test]
fn generate_writes_files_into_the_out_dir() {
    let (mut driver, diagnostics, output) = driver();
    let file_id = driver.load_source_string(
        "demo.keel".to_owned(),
        "module Demo { record Point { int X; int Y; } }".to_owned(),
    );

    let out_dir = tempfile::tempdir().unwrap();
    let status = driver.generate_modules(&[file_id], "schema", Some(out_dir.path()));

    assert_eq!(status.exit_code(), 0, "{}", diagnostics.contents());
    assert_eq!(output.contents(), "");
    let written = std::fs::read_to_string(out_dir.path().join("Demo.keel")).unwrap();
    assert!(written.contains("record Point {"), "{written}");
}

#[test]
fn unknown_targets_are_an_error() {
    let (mut driver, diagnostics, _) = driver();
    let file_id = driver.load_source_string(
        "demo.keel".to_owned(),
        "module Demo {}".to_owned(),
    );

    let status = driver.generate_modules(&[file_id], "cobol", None);

    assert_eq!(status.exit_code(), 1);
    let rendered = diagnostics.contents();
    assert!(rendered.contains("unknown target `cobol`"), "{rendered}");
    assert!(rendered.contains("available targets: schema"), "{rendered}");
}

#[test]
fn generate_stops_on_errors_by_default() {
    let (mut driver, _, output) = driver();
    let file_id = driver.load_source_string(
        "demo.keel".to_owned(),
        "module Demo { record Line { Poin Start; } }".to_owned(),
    );

    let status = driver.generate_modules(&[file_id], "schema", None);

    assert_eq!(status.exit_code(), 1);
    assert_eq!(output.contents(), "");
}

#[test]
fn allow_errors_produces_best_effort_output() {
    let (mut driver, _, output) = driver();
    driver.set_allow_errors(true);
    let file_id = driver.load_source_string(
        "demo.keel".to_owned(),
        "module Demo { record Line { Poin Start; } }".to_owned(),
    );

    let status = driver.generate_modules(&[file_id], "schema", None);

    assert_eq!(status.exit_code(), 1);
    assert!(output.contents().contains("module Demo {"));
}

#[test]
fn missing_files_report_a_read_error() {
    let (mut driver, diagnostics, _) = driver();
    let file_id = driver.load_source_path(std::path::Path::new("no/such/file.keel"));

    assert!(file_id.is_none());
    assert!(diagnostics.contents().contains("couldn't read"));
}
