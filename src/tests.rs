/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Crate unit tests.

use super::*;

/// Runs the pipeline over one in-memory unit named `main.c`.
fn convert_one(source: &str) -> Conversion {
    convert_sources(&[("main.c", source)]).expect("conversion should succeed")
}

/// Returns the solved kinds of the named pointer declaration, searching the
/// variable map in location order.
fn kinds_of(conversion: &Conversion, name: &str) -> Vec<Kind> {
    kinds_of_nth(conversion, name, 0)
}

fn kinds_of_nth(conversion: &Conversion, name: &str, nth: usize) -> Vec<Kind> {
    let mut seen = 0;
    for (_, ids) in conversion.info.iter_variables() {
        for id in ids {
            if let Some(pv) = conversion.info.var(*id).as_pointer() {
                if pv.name == name {
                    if seen == nth {
                        return pv
                            .vars
                            .iter()
                            .map(|v| conversion.solution.get(*v))
                            .collect();
                    }
                    seen += 1;
                }
            }
        }
    }
    panic!("no pointer variable named '{name}' (index {nth})");
}

#[test]
fn parses_declarations_statements_and_expressions() {
    let source = r#"
        #include <stdio.h>
        struct node { int value; struct node *next; };
        static int limit = 10;
        int *lookup(struct node *n, int key);
        int *lookup(struct node *n, int key) {
            int idx;
            for (idx = 0; idx < limit; idx = idx + 1) {
                if (n->value == key) {
                    return &n->value;
                }
                n = n->next;
            }
            return 0;
        }
    "#;
    let unit = parse_translation_unit(source, "main.c").expect("parse");
    assert_eq!(unit.items.len(), 4);
}

#[test]
fn parse_errors_carry_line_and_caret() {
    let source = "int *p;\nint q = ;\n";
    let err = parse_translation_unit(source, "bad.c").expect_err("parse should fail");
    assert_eq!(err.file, "bad.c");
    assert_eq!(err.line, 2);
    assert!(err.column > 0);
    assert_eq!(err.snippet(), "int q = ;");
    assert!(err.caret().contains('^'));
    assert!(err.to_string().starts_with("bad.c:2:"));
}

#[test]
fn null_assignment_keeps_single_object_pointer() {
    let conversion = convert_one("void f(void) { int *p; p = 0; }");
    assert_eq!(kinds_of(&conversion, "p"), vec![Kind::Ptr]);
    // Nothing changed, so the output is byte-identical.
    assert_eq!(
        conversion.output_for("main.c").unwrap(),
        "void f(void) { int *p; p = 0; }"
    );
}

#[test]
fn non_null_constant_forces_wild() {
    let source = "void f(void) { int *p; p = (int*)7; }";
    let conversion = convert_one(source);
    assert_eq!(kinds_of(&conversion, "p"), vec![Kind::Wild]);
    // Already the raw spelling; the declaration text stays as written.
    assert_eq!(conversion.output_for("main.c").unwrap(), source);
}

#[test]
fn subscript_promotes_to_array_pointer() {
    let conversion = convert_one("void f(void) { int *p; p[0] = 1; }");
    assert_eq!(kinds_of(&conversion, "p"), vec![Kind::Arr]);
    let output = conversion.output_for("main.c").unwrap();
    assert!(
        output.contains("array_ptr<int> p;"),
        "expected rewritten declaration in: {output}"
    );
}

#[test]
fn pointer_arithmetic_promotes_to_array_pointer() {
    let conversion = convert_one("void f(void) { int *p; p = p + 1; }");
    assert_eq!(kinds_of(&conversion, "p"), vec![Kind::Arr]);
}

#[test]
fn increment_promotes_to_array_pointer() {
    let conversion = convert_one("void f(void) { int *p; p++; }");
    assert_eq!(kinds_of(&conversion, "p"), vec![Kind::Arr]);
}

#[test]
fn definition_view_earns_bounds_safe_interface() {
    let source = "void f(int *q);\nvoid f(int *q) { q[0] = 0; }\n";
    let conversion = convert_one(source);
    // Declaration view stays at the bottom; definition view is promoted.
    assert_eq!(kinds_of_nth(&conversion, "q", 0), vec![Kind::Ptr]);
    assert_eq!(kinds_of_nth(&conversion, "q", 1), vec![Kind::Arr]);

    let output = conversion.output_for("main.c").unwrap();
    assert!(
        output.contains("void f(int *q : itype(array_ptr<int>));"),
        "expected interface clause in: {output}"
    );
    // The definition keeps its written parameter type.
    assert!(
        output.contains("void f(int *q) { q[0] = 0; }"),
        "expected unchanged definition in: {output}"
    );
}

#[test]
fn malloc_through_extern_stays_single_object() {
    let header = "extern int *g;\n";
    let body = "extern int *g;\nvoid init(void) { g = malloc(sizeof(int)); }\n";
    let conversion =
        convert_sources(&[("a.c", header), ("b.c", body)]).expect("conversion should succeed");
    assert_eq!(kinds_of_nth(&conversion, "g", 0), vec![Kind::Ptr]);
    assert_eq!(kinds_of_nth(&conversion, "g", 1), vec![Kind::Ptr]);
    // No rewrite and no cast on either unit.
    assert_eq!(conversion.output_for("a.c").unwrap(), header);
    assert_eq!(conversion.output_for("b.c").unwrap(), body);
}

#[test]
fn malloc_sizeof_cast_is_trusted() {
    let source = "void f(void) { int *p; p = (int*)malloc(sizeof(int)); }";
    let conversion = convert_one(source);
    assert_eq!(kinds_of(&conversion, "p"), vec![Kind::Ptr]);
}

#[test]
fn incompatible_cast_degrades_both_sides() {
    let source = "char *s = \"hi\";\nint *p = (int*)s;\n";
    let conversion = convert_one(source);
    assert_eq!(kinds_of(&conversion, "s"), vec![Kind::Wild]);
    assert_eq!(kinds_of(&conversion, "p"), vec![Kind::Wild]);
}

#[test]
fn compatible_cast_propagates_equality() {
    let source = "void f(void) { int *p; int *q; p[0] = 1; q = (int*)p; }";
    let conversion = convert_one(source);
    assert_eq!(kinds_of(&conversion, "p"), vec![Kind::Arr]);
    assert_eq!(kinds_of(&conversion, "q"), vec![Kind::Arr]);
}

#[test]
fn void_pointer_is_always_wild() {
    let conversion = convert_one("void f(void) { void *v; v = 0; }");
    assert_eq!(kinds_of(&conversion, "v"), vec![Kind::Wild]);
}

#[test]
fn va_list_declarations_go_wild() {
    let conversion = convert_one("void f(void) { va_list args; int *p; }");
    // The va_list variable allocates no levels but must not disturb others.
    assert_eq!(kinds_of(&conversion, "p"), vec![Kind::Ptr]);
}

#[test]
fn variadic_overflow_arguments_go_wild() {
    let source = "void sink(int *a, ...) {}\nvoid g(void) { int *x; int *y; sink(x, y); }\n";
    let conversion = convert_one(source);
    assert_eq!(kinds_of(&conversion, "x"), vec![Kind::Ptr]);
    assert_eq!(kinds_of(&conversion, "y"), vec![Kind::Wild]);
}

#[test]
fn undefined_extern_function_poisons_parameters() {
    let source = "void use(int *p);\nvoid g(void) { int *x; use(x); }\n";
    let conversion = convert_one(source);
    // `use` has no body anywhere, so its parameter and the argument tied to
    // it are forced wild at link time.
    assert_eq!(kinds_of(&conversion, "x"), vec![Kind::Wild]);
}

#[test]
fn double_pointer_levels_solve_independently() {
    let source = "void f(void) { int **p; (*p)[0] = 1; }";
    let conversion = convert_one(source);
    // Subscripting `*p` constrains the declaration's outer level.
    let kinds = kinds_of(&conversion, "p");
    assert_eq!(kinds.len(), 2);
    assert_eq!(kinds[0], Kind::Arr);
}

#[test]
fn declared_arrays_stay_arrays() {
    let source = "int buf[8];\nvoid f(void) { buf[0] = 1; }\n";
    let conversion = convert_one(source);
    assert_eq!(kinds_of(&conversion, "buf"), vec![Kind::Arr]);
    // Array syntax is already the right shape; no text change.
    assert_eq!(conversion.output_for("main.c").unwrap(), source);
}

#[test]
fn struct_fields_participate_in_assignments() {
    let source = "struct box { int *item; };\nvoid f(struct box *b) { b->item[0] = 1; }\n";
    let conversion = convert_one(source);
    assert_eq!(kinds_of(&conversion, "item"), vec![Kind::Arr]);
    let output = conversion.output_for("main.c").unwrap();
    assert!(
        output.contains("array_ptr<int> item;"),
        "expected rewritten field in: {output}"
    );
}

#[test]
fn multi_declarator_lines_are_rebuilt() {
    let source = "void f(void) { int *a, b, *c; a[0] = 1; }";
    let conversion = convert_one(source);
    assert_eq!(kinds_of(&conversion, "a"), vec![Kind::Arr]);
    let output = conversion.output_for("main.c").unwrap();
    assert!(
        output.contains("array_ptr<int> a;"),
        "expected rewritten declarator in: {output}"
    );
    assert!(
        output.contains("int b;"),
        "expected preserved declarator in: {output}"
    );
    assert!(
        output.contains("int *c;"),
        "expected preserved declarator in: {output}"
    );
}

#[test]
fn initializers_survive_declaration_rewrites() {
    let source = "void f(void) { int *p = 0; p[0] = 1; }";
    let conversion = convert_one(source);
    let output = conversion.output_for("main.c").unwrap();
    assert!(
        output.contains("array_ptr<int> p = 0;"),
        "expected initializer kept in: {output}"
    );
}

#[test]
fn assignment_equalizes_pointer_kinds() {
    let source = "void f(void) { int *p; int *w; w = (int*)3; p[0] = 1; p = w; }";
    let conversion = convert_one(source);
    // Flow-insensitive equality: the wild right side poisons the left, and
    // two equal sides never need a cast.
    assert_eq!(kinds_of(&conversion, "p"), vec![Kind::Wild]);
    assert_eq!(kinds_of(&conversion, "w"), vec![Kind::Wild]);
    let casts = conversion
        .plan
        .stats
        .get("main.c")
        .map_or(0, |stats| stats.casts_inserted);
    assert_eq!(casts, 0);
}

#[test]
fn call_site_casts_narrow_to_the_definition_view() {
    let caller = "void f(int *q);\nvoid g(void) { int *arr; arr[0] = 1; f(arr); }\n";
    let callee = "void f(int *q) { q = 0; }\n";
    let conversion =
        convert_sources(&[("a.c", caller), ("b.c", callee)]).expect("conversion should succeed");
    // The caller proves an array; the definition only needs a single
    // object, and wildness never flowed either way.
    assert_eq!(kinds_of_nth(&conversion, "q", 0), vec![Kind::Arr]);
    assert_eq!(kinds_of_nth(&conversion, "q", 1), vec![Kind::Ptr]);

    let output = conversion.output_for("a.c").unwrap();
    assert!(
        output.contains("f(_Assume_bounds_cast<ptr<int>>(arr));"),
        "expected call-site cast in: {output}"
    );
    let stats = conversion.plan.stats.get("a.c").expect("stats for a.c");
    assert_eq!(stats.casts_inserted, 1);
}

#[test]
fn annotated_parameters_suppress_call_casts() {
    let caller =
        "void f(int *q : itype(ptr<int>));\nvoid g(void) { int *arr; arr[0] = 1; f(arr); }\n";
    let callee = "void f(int *q) { q = 0; }\n";
    let conversion =
        convert_sources(&[("a.c", caller), ("b.c", callee)]).expect("conversion should succeed");
    let output = conversion.output_for("a.c").unwrap();
    assert!(
        !output.contains("_Assume_bounds_cast"),
        "expected no call-site cast in: {output}"
    );
}

#[test]
fn pointer_free_programs_round_trip_byte_identically() {
    let source = "int add(int a, int b) {\n    return a + b;\n}\nint total = 0;\n";
    let conversion = convert_one(source);
    assert!(conversion.plan.edits.is_empty());
    assert_eq!(conversion.output_for("main.c").unwrap(), source);
}

#[test]
fn assignment_is_total_over_all_variables() {
    let source = "void f(int *a, char **b) { a[0] = 0; b = 0; }";
    let conversion = convert_one(source);
    assert_eq!(
        conversion.solution.len(),
        conversion.info.constraints().var_count()
    );
}

#[test]
fn link_order_does_not_change_the_solution() {
    let decl = "void f(int *q);\nvoid g(void) { int *x; x = (int*)5; f(x); }\n";
    let def = "void f(int *q) { q[0] = 0; }\n";

    let forward = convert_sources(&[("a.c", decl), ("b.c", def)]).expect("convert");
    let backward = convert_sources(&[("b.c", def), ("a.c", decl)]).expect("convert");

    for name in ["x", "q"] {
        assert_eq!(
            kinds_of(&forward, name),
            kinds_of(&backward, name),
            "solution for '{name}' depends on unit order"
        );
    }
}

#[test]
fn reanalyzing_the_output_reaches_the_same_solution() {
    let source = "void f(int *q);\nvoid f(int *q) { q[0] = 0; }\nvoid g(void) { int *p; p[0] = 1; }\n";
    let first = convert_one(source);
    let rewritten = first.output_for("main.c").unwrap().to_string();

    let second = convert_one(&rewritten);
    assert_eq!(kinds_of(&first, "p"), kinds_of(&second, "p"));
    assert_eq!(
        kinds_of_nth(&first, "q", 1),
        kinds_of_nth(&second, "q", 1)
    );
}

#[test]
fn solver_is_idempotent_across_runs() {
    let source = "void f(void) { int *p; p[0] = 1; }";
    let conversion = convert_one(source);
    let again = conversion.info.solve();
    assert_eq!(conversion.solution, again);
}

#[test]
fn stats_count_declaration_rewrites() {
    let source = "void f(void) { int *p; p[0] = 1; }";
    let conversion = convert_one(source);
    let stats = conversion.plan.stats.get("main.c").expect("stats for main.c");
    assert_eq!(stats.decl_rewrites, 1);
    assert_eq!(stats.casts_inserted, 0);
}

mod emit {
    use super::*;
    use std::path::PathBuf;

    fn write_source(dir: &std::path::Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).expect("write test source");
        path
    }

    #[test]
    fn files_under_base_dir_are_written_with_postfix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = write_source(dir.path(), "a.c", "void f(void) { int *p; p[0] = 1; }\n");

        let unit = SourceUnit::from_path(&input).expect("load");
        let conversion = convert_units(vec![unit]).expect("convert");

        let options = EmitOptions {
            base_dir: dir.path().to_path_buf(),
            output_postfix: "checked".to_string(),
            explicit: Vec::new(),
        };
        let mut sink = Vec::new();
        let written =
            emit_files(&conversion.units, &conversion.plan, &options, &mut sink).expect("emit");

        assert_eq!(written, vec![dir.path().join("a.checked.c")]);
        let text = std::fs::read_to_string(&written[0]).expect("read output");
        assert!(text.contains("array_ptr<int> p;"));
        assert!(sink.is_empty());
    }

    #[test]
    fn files_outside_base_dir_are_skipped() {
        let source_dir = tempfile::tempdir().expect("tempdir");
        let other_dir = tempfile::tempdir().expect("tempdir");
        let input = write_source(source_dir.path(), "a.c", "int *p;\n");

        let unit = SourceUnit::from_path(&input).expect("load");
        let conversion = convert_units(vec![unit]).expect("convert");

        let options = EmitOptions {
            base_dir: other_dir.path().to_path_buf(),
            output_postfix: "checked".to_string(),
            explicit: Vec::new(),
        };
        let mut sink = Vec::new();
        let written =
            emit_files(&conversion.units, &conversion.plan, &options, &mut sink).expect("emit");
        assert!(written.is_empty());
    }

    #[test]
    fn explicit_paths_are_always_writable() {
        let source_dir = tempfile::tempdir().expect("tempdir");
        let other_dir = tempfile::tempdir().expect("tempdir");
        let input = write_source(source_dir.path(), "a.c", "int *p;\n");

        let unit = SourceUnit::from_path(&input).expect("load");
        let conversion = convert_units(vec![unit]).expect("convert");

        let options = EmitOptions {
            base_dir: other_dir.path().to_path_buf(),
            output_postfix: "checked".to_string(),
            explicit: vec![std::fs::canonicalize(&input).expect("canonicalize")],
        };
        let mut sink = Vec::new();
        let written =
            emit_files(&conversion.units, &conversion.plan, &options, &mut sink).expect("emit");
        assert_eq!(written.len(), 1);
    }

    #[test]
    fn dash_postfix_streams_the_main_unit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = write_source(dir.path(), "a.c", "void f(void) { int *p; p[0] = 1; }\n");

        let unit = SourceUnit::from_path(&input).expect("load");
        let conversion = convert_units(vec![unit]).expect("convert");

        let options = EmitOptions {
            base_dir: dir.path().to_path_buf(),
            output_postfix: "-".to_string(),
            explicit: Vec::new(),
        };
        let mut sink = Vec::new();
        let written =
            emit_files(&conversion.units, &conversion.plan, &options, &mut sink).expect("emit");
        assert!(written.is_empty());
        let text = String::from_utf8(sink).expect("utf8");
        assert!(text.contains("array_ptr<int> p;"));
    }
}
