//! The SMT-LIB2 shim (C3): walks the `sexp::Sexp` forms produced by the
//! `sexp` crate and extracts array declarations and assertions.
//!
//! `sexp::parse` parses exactly one expression at a time, so this module
//! first splits the source into top-level, paren-balanced forms (stripping
//! `;`-comment lines, which is also where the assignment grammar lives —
//! see [`super::assignments`], which rescans the same source independently)
//! before handing each form to `sexp::parse`.

use sexp::{Atom, Sexp};

use super::error::SmtlibError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDecl {
    pub name: String,
    pub element_width: u32,
    pub is_bitvector: bool,
}

#[derive(Debug, Clone)]
pub struct ParsedSmt {
    pub array_decls: Vec<ArrayDecl>,
    pub assertions: Vec<Sexp>,
}

pub fn parse(source: &str) -> Result<ParsedSmt, SmtlibError> {
    let mut array_decls = Vec::new();
    let mut assertions = Vec::new();

    for form_text in split_top_level_forms(source) {
        let form = sexp::parse(&form_text).map_err(|e| SmtlibError::Syntax(e.to_string()))?;
        let Sexp::List(items) = &form else {
            return Err(SmtlibError::TopLevelAtom(form.to_string()));
        };
        let Some(Sexp::Atom(Atom::S(head))) = items.first() else {
            return Err(SmtlibError::TopLevelAtom(form.to_string()));
        };

        match head.as_str() {
            "declare-fun" => array_decls.push(parse_declare_fun(items, &form)?),
            "assert" => {
                let body = items.get(1).ok_or_else(|| SmtlibError::MalformedAssert(form.to_string()))?;
                assertions.push(body.clone());
            }
            // set-logic / set-info / check-sat / exit and similar SMT-LIB2
            // scaffolding carry no semantics for this fragment.
            _ => {}
        }
    }

    Ok(ParsedSmt { array_decls, assertions })
}

fn parse_declare_fun(items: &[Sexp], whole: &Sexp) -> Result<ArrayDecl, SmtlibError> {
    // (declare-fun NAME () (Array (_ BitVec 32) (_ BitVec K)))
    let name = match items.get(1) {
        Some(Sexp::Atom(Atom::S(s))) => s.clone(),
        _ => return Err(SmtlibError::MalformedDeclareFun(whole.to_string())),
    };
    let sort = items.get(3).ok_or_else(|| SmtlibError::MalformedDeclareFun(whole.to_string()))?;
    let Sexp::List(sort_items) = sort else {
        return Err(SmtlibError::MalformedDeclareFun(whole.to_string()));
    };
    let is_array = matches!(sort_items.first(), Some(Sexp::Atom(Atom::S(s))) if s == "Array");
    if !is_array {
        return Err(SmtlibError::MalformedDeclareFun(whole.to_string()));
    }

    let index_sort = sort_items.get(1).ok_or_else(|| SmtlibError::MalformedDeclareFun(whole.to_string()))?;
    let index_width = bitvec_sort_width(index_sort);
    if index_width != Some(32) {
        return Err(SmtlibError::UnsupportedIndexSort(index_sort.to_string()));
    }

    let element_sort = sort_items.get(2).ok_or_else(|| SmtlibError::MalformedDeclareFun(whole.to_string()))?;
    let element_width =
        bitvec_sort_width(element_sort).ok_or_else(|| SmtlibError::MalformedDeclareFun(whole.to_string()))?;

    Ok(ArrayDecl { name, element_width, is_bitvector: true })
}

/// Matches `(_ BitVec K)`, returning `K`.
fn bitvec_sort_width(sort: &Sexp) -> Option<u32> {
    let Sexp::List(items) = sort else { return None };
    let is_underscore = matches!(items.first(), Some(Sexp::Atom(Atom::S(s))) if s == "_");
    let is_bitvec = matches!(items.get(1), Some(Sexp::Atom(Atom::S(s))) if s == "BitVec");
    if !is_underscore || !is_bitvec {
        return None;
    }
    match items.get(2) {
        Some(Sexp::Atom(Atom::I(n))) => u32::try_from(*n).ok(),
        _ => None,
    }
}

/// Splits `source` into top-level, paren-balanced forms, dropping `;`
/// end-of-line comments (including the assignment-comment lines, which
/// [`super::assignments::scan`] reads separately from the raw source).
fn split_top_level_forms(source: &str) -> Vec<String> {
    let mut forms = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    for line in source.lines() {
        let code = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        for ch in code.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            current.push(ch);
        }
        current.push(' ');

        if depth == 0 && !current.trim().is_empty() {
            forms.push(std::mem::take(&mut current));
        }
    }

    if !current.trim().is_empty() {
        forms.push(current);
    }

    forms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_declaration_and_assertion() {
        let source = "(declare-fun arr () (Array (_ BitVec 32) (_ BitVec 8)))\n\
                       (assert (= (select arr (_ bv5 32)) (_ bv115 8)))\n";
        let parsed = parse(source).unwrap();
        assert_eq!(parsed.array_decls.len(), 1);
        assert_eq!(parsed.array_decls[0], ArrayDecl { name: "arr".into(), element_width: 8, is_bitvector: true });
        assert_eq!(parsed.assertions.len(), 1);
    }

    #[test]
    fn rejects_unsupported_index_sort() {
        let source = "(declare-fun arr () (Array (_ BitVec 16) (_ BitVec 8)))\n";
        let err = parse(source).unwrap_err();
        assert!(matches!(err, SmtlibError::UnsupportedIndexSort(_)));
    }

    #[test]
    fn ignores_set_logic_and_check_sat_scaffolding() {
        let source = "(set-logic QF_AUFBV)\n(check-sat)\n(exit)\n";
        let parsed = parse(source).unwrap();
        assert!(parsed.array_decls.is_empty());
        assert!(parsed.assertions.is_empty());
    }
}
