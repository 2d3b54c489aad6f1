//! End-to-end pipeline tests
//!
//! Full translation units through tokenize, preprocess and refine,
//! including the disk-backed file set.

use std::fs;

use minicpp::{translate, DirFileSet, MemoryFileSet, Result};

fn run_single(src: &str) -> Result<Vec<String>> {
    let files = MemoryFileSet::from([("main.c", src)]);
    let (tokens, interner) = translate(&files, "main.c")?;
    Ok(tokens.iter().map(|t| t.format(&interner)).collect())
}

#[test]
fn simple_expression() {
    assert_eq!(
        run_single("1+1=2").unwrap(),
        [
            "integer: 1 (int)",
            "+",
            "integer: 1 (int)",
            "=",
            "integer: 2 (int)",
        ]
    );
}

#[test]
fn hello_world() {
    let src = "int main() { printf(\"Hello, World!\\n\"); return 0; }";
    assert_eq!(
        run_single(src).unwrap(),
        [
            "int",
            "ident: main",
            "(",
            ")",
            "{",
            "ident: printf",
            "(",
            "string: \"Hello, World!\\n\"",
            ")",
            ";",
            "return",
            "integer: 0 (int)",
            ";",
            "}",
        ]
    );
}

#[test]
fn integer_promotion_at_type_boundaries() {
    assert_eq!(
        run_single("0xffffffff").unwrap(),
        ["integer: 4294967295 (long long)"]
    );
    assert_eq!(
        run_single("0x80000000ull").unwrap(),
        ["integer: 2147483648 (unsigned long long)"]
    );
    assert_eq!(run_single("2147483647").unwrap(), ["integer: 2147483647 (int)"]);
    assert_eq!(
        run_single("2147483648").unwrap(),
        ["integer: 2147483648 (long long)"]
    );

    let err = run_single("08").unwrap_err();
    assert_eq!(err.to_string(), "lex: malformed octal constant");
}

#[test]
fn char_constants_become_int_literals() {
    assert_eq!(run_single("'a'").unwrap(), ["integer: 97 (int)"]);
    assert_eq!(run_single("'\\n'").unwrap(), ["integer: 10 (int)"]);
}

#[test]
fn keywords_and_identifiers() {
    assert_eq!(
        run_single("typedef unsigned long size; typeof x").unwrap(),
        [
            "typedef",
            "unsigned",
            "long",
            "ident: size",
            ";",
            "ident: typeof",
            "ident: x",
        ]
    );
}

#[test]
fn stray_bytes_fail_in_the_refiner() {
    let err = run_single("int @@ x;").unwrap_err();
    assert_eq!(err.to_string(), "token: invalid token: \"@@\"");
}

#[test]
fn macro_heavy_translation_unit() {
    let src = "#define SQUARE(x) ((x)*(x))\n\
               #define TWICE(x) (2*(x))\n\
               int y = SQUARE(TWICE(3));\n";
    assert_eq!(
        run_single(src).unwrap(),
        [
            "int", "ident: y", "=",
            "(", "(", "(", "integer: 2 (int)", "*", "(", "integer: 3 (int)", ")", ")", ")",
            "*",
            "(", "(", "integer: 2 (int)", "*", "(", "integer: 3 (int)", ")", ")", ")",
            ")",
            ";",
        ]
    );
}

#[test]
fn disk_backed_file_set() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.c"), "#include <lib.h>\nint x = VALUE;").unwrap();
    fs::write(dir.path().join("lib.h"), "#define VALUE 7").unwrap();

    let files = DirFileSet::new(dir.path());
    let (tokens, interner) = translate(&files, "main.c").unwrap();
    let formatted: Vec<_> = tokens.iter().map(|t| t.format(&interner)).collect();
    assert_eq!(
        formatted,
        ["int", "ident: x", "=", "integer: 7 (int)", ";"]
    );
}

#[test]
fn include_chain_three_deep() {
    let mut files = MemoryFileSet::new();
    files.insert("a.c", "#include <b.h>\na");
    files.insert("b.h", "#include <c.h>\nb");
    files.insert("c.h", "c");

    let (tokens, interner) = translate(&files, "a.c").unwrap();
    let formatted: Vec<_> = tokens.iter().map(|t| t.format(&interner)).collect();
    assert_eq!(formatted, ["ident: c", "ident: b", "ident: a"]);
}

#[test]
fn token_pasting_is_lexed_but_not_evaluated() {
    // ## は区切り子としてそのまま通る
    assert_eq!(run_single("a ## b").unwrap(), ["ident: a", "##", "ident: b"]);
}

#[test]
fn errors_abort_the_unit() {
    let files = MemoryFileSet::from([
        ("main.c", "before\n#include <bad.h>\nafter"),
        ("bad.h", "#error broken header"),
    ]);
    let err = translate(&files, "main.c").unwrap_err();
    assert_eq!(err.to_string(), "preprocess: #error broken header");
}
