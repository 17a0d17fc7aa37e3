//! End-to-end scenarios (§8): compile a program string, feed it
//! literal input, and assert on captured output — exercising the full
//! pipeline (lexer -> preprocessor -> parser -> interpreter -> I/O)
//! rather than one module in isolation, the way `src/*/*.rs`'s inline
//! `#[cfg(test)]` suites exercise individual stages.

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use rawk::environment::Environment;
use rawk::preprocessor::FsLoader;
use rawk::value::Value;
use rawk::Interpreter;

struct Sink(Rc<RefCell<Vec<u8>>>);

impl Write for Sink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Build an interpreter for `src`, feed it `input` directly via
/// `Interpreter::feed_input` instead of an ARGV file, run it to
/// completion, and return (captured stdout, exit code).
fn run(src: &str, input: &str) -> (String, i32) {
    let loader = FsLoader;
    let program = rawk::compile(src, Path::new("."), &loader).expect("compile");
    let mut env = Environment::new();
    env.set("ARGC", Value::Number(1.0));
    let mut interp = Interpreter::new(program, env);
    let buf: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    interp.set_output(Box::new(Sink(buf.clone())));
    interp.feed_input(input);
    let code = interp.run().expect("run");
    let out = String::from_utf8(buf.borrow().clone()).unwrap();
    (out, code)
}

#[test]
fn hello_world() {
    let (out, code) = run(r#"BEGIN { print "Hello, World!" }"#, "");
    assert_eq!(out, "Hello, World!\n");
    assert_eq!(code, 0);
}

#[test]
fn sums_second_field() {
    let (out, code) = run("{ s += $2 } END { print s }", "a 1\nb 2\nc 3\n");
    assert_eq!(out, "6\n");
    assert_eq!(code, 0);
}

#[test]
fn csv_average_by_category() {
    let src = r#"BEGIN { FS="," } NR>1 { t[$1]+=$2; n[$1]++ } END { for (k in t) printf "%s %.2f\n", k, t[k]/n[k] }"#;
    let (out, _) = run(src, "cat,amt\nA,100\nB,200\nA,150\n");
    let mut lines: Vec<&str> = out.lines().collect();
    lines.sort();
    assert_eq!(lines, vec!["A 125.00", "B 200.00"]);
}

#[test]
fn dedupes_preserving_first_occurrence_order() {
    let (out, _) = run("!seen[$0]++", "x\ny\nx\nz\ny\n");
    assert_eq!(out, "x\ny\nz\n");
}

#[test]
fn gsub_is_case_sensitive_by_default() {
    let (out, _) = run("{ gsub(/o/, \"0\"); print }", "foo bar\nOoops\n");
    assert_eq!(out, "f00 bar\nO0ps\n");
}

#[test]
fn recursive_factorial() {
    let (out, _) = run(
        "function f(n){ return n<=1 ? 1 : n*f(n-1) } BEGIN { print f(6) }",
        "",
    );
    assert_eq!(out, "720\n");
}

#[test]
fn range_pattern_matches_inclusive_span() {
    let (out, _) = run("/START/,/END/ { print }", "before\nSTART\nmiddle\nEND\nafter\n");
    assert_eq!(out, "START\nmiddle\nEND\n");
}

#[test]
fn field_index_past_nf_reads_empty_without_changing_nf() {
    let (out, _) = run(r#"{ print $5; print NF }"#, "a b c\n");
    assert_eq!(out, "\n3\n");
}

#[test]
fn assigning_past_nf_extends_the_record() {
    let (out, _) = run(r#"{ $5 = "x"; print; print NF }"#, "a b c\n");
    assert_eq!(out, "a b c  x\n5\n");
}

#[test]
fn split_of_empty_string_yields_zero_fields() {
    let (out, _) = run(r#"BEGIN { n = split("", a); print n }"#, "");
    assert_eq!(out, "0\n");
}

#[test]
fn match_sets_rstart_rlength_on_success_and_failure() {
    let (out, _) = run(
        r#"BEGIN {
            match("hello world", /wor/); print RSTART, RLENGTH
            match("hello world", /zzz/); print RSTART, RLENGTH
        }"#,
        "",
    );
    assert_eq!(out, "7 3\n0 -1\n");
}

#[test]
fn include_directive_splices_function_definitions() {
    // No filesystem dependency: compile() is exercised through an
    // in-memory SourceLoader the same way the preprocessor's own
    // unit tests do, proving @include works end-to-end through the
    // crate's public `compile` entry point, not just internally.
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct MemLoader(RefCell<HashMap<PathBuf, String>>);
    impl rawk::preprocessor::SourceLoader for MemLoader {
        fn read(&self, path: &Path) -> Result<String, String> {
            self.0.borrow().get(path).cloned().ok_or_else(|| "missing".to_string())
        }
        fn canonicalize(&self, path: &Path) -> PathBuf {
            path.to_path_buf()
        }
    }

    let mut files = HashMap::new();
    files.insert(PathBuf::from("/base/square.awk"), "function square(x) { return x*x }".to_string());
    let loader = MemLoader(RefCell::new(files));
    let program = rawk::compile(
        "@include \"square.awk\"\nBEGIN { print square(7) }",
        Path::new("/base"),
        &loader,
    )
    .expect("compile with include");

    let mut env = Environment::new();
    env.set("ARGC", Value::Number(1.0));
    let mut interp = Interpreter::new(program, env);
    let buf: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    interp.set_output(Box::new(Sink(buf.clone())));
    interp.feed_input("");
    interp.run().expect("run");
    assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "49\n");
}

#[test]
fn switch_does_not_fall_through_cases() {
    let (out, _) = run(r#"BEGIN { switch (1) { case 1: print "a"; case 2: print "b" } }"#, "");
    assert_eq!(out, "a\n");
}

#[test]
fn switch_default_runs_only_when_nothing_matches() {
    let src = r#"BEGIN {
        switch ("z") {
            case "x": print "x"
            case "y": print "y"
            default: print "other"
        }
    }"#;
    let (out, _) = run(src, "");
    assert_eq!(out, "other\n");
}

#[test]
fn switch_case_break_ends_body_early_without_reaching_next_case() {
    let src = r#"BEGIN {
        switch (1) {
            case 1: print "a"; break; print "unreached"
            case 2: print "b"
        }
    }"#;
    let (out, _) = run(src, "");
    assert_eq!(out, "a\n");
}

/// `nextfile` must close the current ARGV entry (running ENDFILE
/// early) and resume reading from the *next* file, rather than just
/// skipping to the next record of the same file like `next` does
/// (§4.8, §9 Cancellation).
#[test]
fn nextfile_advances_to_the_next_argv_entry() {
    let dir = std::env::temp_dir().join(format!("rawk_nextfile_test_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("mkdir");
    let file_a = dir.join("a.txt");
    let file_b = dir.join("b.txt");
    std::fs::write(&file_a, "a1\na2\na3\n").expect("write a");
    std::fs::write(&file_b, "b1\nb2\n").expect("write b");

    let src = r#"
        ENDFILE { print "END:" FILENAME }
        FNR==2 { nextfile }
        { print FILENAME, $0 }
    "#;
    let loader = FsLoader;
    let program = rawk::compile(src, Path::new("."), &loader).expect("compile");
    let mut env = Environment::new();
    let argv = env.get("ARGV");
    let arr = argv.as_array().expect("ARGV is an array");
    arr.borrow_mut().insert("0".to_string(), Value::from_str("awk"));
    arr.borrow_mut().insert("1".to_string(), Value::from_str(file_a.to_str().unwrap()));
    arr.borrow_mut().insert("2".to_string(), Value::from_str(file_b.to_str().unwrap()));
    env.set("ARGC", Value::Number(3.0));

    let mut interp = Interpreter::new(program, env);
    let buf: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    interp.set_output(Box::new(Sink(buf.clone())));
    interp.run().expect("run");
    let out = String::from_utf8(buf.borrow().clone()).unwrap();

    std::fs::remove_dir_all(&dir).ok();

    let a_path = file_a.to_str().unwrap();
    let b_path = file_b.to_str().unwrap();
    assert_eq!(
        out,
        format!(
            "{a_path} a1\nEND:{a_path}\n{b_path} b1\nEND:{b_path}\n"
        )
    );
}
