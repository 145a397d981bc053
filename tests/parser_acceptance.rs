use smt_jit::smtlib;

/// The literal parser-acceptance scenario: two assignment comments followed
/// by one array declaration, no assertions.
#[test]
fn two_assignments_and_one_array_declaration() {
    let source = r#"; Assignments
; { "a": [1,2,3], "b": [4,5] }
; { "c": [6,7], "b": [8] }
(declare-fun arg00 () (Array (_ BitVec 32) (_ BitVec 8)))
"#;

    let parsed = smtlib::parse(source).unwrap();

    assert_eq!(parsed.array_decls.len(), 1);
    let decl = &parsed.array_decls[0];
    assert_eq!(decl.name, "arg00");
    assert_eq!(decl.element_width, 8);
    assert!(decl.is_bitvector);

    assert_eq!(parsed.assignments.len(), 2);
    assert_eq!(parsed.assignments[0].get("a"), Some(&vec![1, 2, 3]));
    assert_eq!(parsed.assignments[0].get("b"), Some(&vec![4, 5]));
    assert_eq!(parsed.assignments[1].get("c"), Some(&vec![6, 7]));
    assert_eq!(parsed.assignments[1].get("b"), Some(&vec![8]));

    assert!(parsed.assertions.is_empty());
}
