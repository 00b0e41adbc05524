//! Erasing original text from a page
//!
//! Each erased text-showing operator is replaced by a `TJ` holding a single
//! number, which moves the text position as far as the original strings did
//! but draws nothing. Text that follows in the same text object stays in
//! place and the old strings are gone from the file. Images and vector
//! graphics are never touched.
//!
//! Text inside a Form XObject is erased in a copy of the form made for this
//! page; other pages drawing the same form keep their text.
//!
//! The page's rewritten operations are wrapped in `q … Q` so that any
//! unbalanced transformation left by the original content does not leak into
//! content appended after it.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::error::Result;
use super::extract::{FormText, PageText};
use super::page::{redirect_page_xobjects, redirect_xobjects, replace_page_content};

/// Erasures by operation index: the `TJ` number standing in for each operator
pub type Erasures = BTreeMap<usize, f32>;

/// Replace the operators in `erased` with text-free `TJ` spacers
pub fn erase_operations(operations: Vec<Operation>, erased: &Erasures) -> Vec<Operation> {
    let mut result = Vec::with_capacity(operations.len() + erased.len() * 3);

    for (index, op) in operations.into_iter().enumerate() {
        match erased.get(&index) {
            Some(&adjustment) => result.extend(blank_operation(op, adjustment)),
            None => result.push(op),
        }
    }

    result
}

/// `TJ` number as written; whole numbers are written as integers
fn spacer_number(adjustment: f32) -> Object {
    if !adjustment.is_finite() {
        Object::Integer(0)
    } else if adjustment.fract() == 0.0 && adjustment.abs() < i64::MAX as f32 {
        Object::Integer(adjustment as i64)
    } else {
        Object::Real(adjustment)
    }
}

/// The operations that move like `op` without showing anything
fn blank_operation(op: Operation, adjustment: f32) -> Vec<Operation> {
    let spacer = Operation::new("TJ", vec![Object::Array(vec![spacer_number(adjustment)])]);

    match op.operator.as_str() {
        "'" => vec![Operation::new("T*", vec![]), spacer],
        "\"" => {
            let mut operands = op.operands.into_iter();
            let mut ops = Vec::with_capacity(4);
            if let (Some(aw), Some(ac)) = (operands.next(), operands.next()) {
                ops.push(Operation::new("Tw", vec![aw]));
                ops.push(Operation::new("Tc", vec![ac]));
            }
            ops.push(Operation::new("T*", vec![]));
            ops.push(spacer);
            ops
        }
        _ => vec![spacer],
    }
}

/// Wrap operations in `q … Q`, closing any `q` they leave open
pub fn isolate(operations: Vec<Operation>) -> Vec<Operation> {
    let mut result = Vec::with_capacity(operations.len() + 2);
    let mut depth = 0usize;

    result.push(Operation::new("q", vec![]));
    for op in operations {
        match op.operator.as_str() {
            "q" => depth += 1,
            "Q" => depth = depth.saturating_sub(1),
            _ => {}
        }
        result.push(op);
    }

    // Close any q the original content left open, then our own
    for _ in 0..=depth {
        result.push(Operation::new("Q", vec![]));
    }

    result
}

/// Copies made on this page, seen from the form (or page) at `parent`
fn child_redirects(parent: &[ObjectId], clones: &BTreeMap<Vec<ObjectId>, ObjectId>) -> BTreeMap<ObjectId, ObjectId> {
    clones
        .iter()
        .filter(|(path, _)| path.len() == parent.len() + 1 && path.starts_with(parent))
        .filter_map(|(path, &clone)| path.last().map(|&original| (original, clone)))
        .collect()
}

/// Store an erased copy of a form and return its id
fn clone_form(
    doc: &mut Document,
    form_id: ObjectId,
    form: FormText,
    erased: &Erasures,
    redirects: &BTreeMap<ObjectId, ObjectId>,
) -> Result<ObjectId> {
    let mut dict = doc.get_object(form_id)?.as_stream()?.dict.clone();
    dict.remove(b"Filter");
    dict.remove(b"DecodeParms");

    if !redirects.is_empty() {
        let resources = form.resources.unwrap_or_else(Dictionary::new);
        dict.set("Resources", Object::Dictionary(redirect_xobjects(doc, &resources, redirects)));
    }

    let content = Content {
        operations: erase_operations(form.operations, erased),
    };
    Ok(doc.add_object(Stream::new(dict, content.encode()?)))
}

/// Erase the text shows at `erased` (indices into [`PageText::shows`])
///
/// The page always gets a new content stream. Forms holding erased text, and
/// the forms leading to them, are copied and the page is pointed at the
/// copies.
pub fn erase_text(doc: &mut Document, page_id: ObjectId, page_text: PageText, erased: &BTreeSet<usize>) -> Result<()> {
    let PageText {
        operations,
        mut forms,
        shows,
        ..
    } = page_text;

    let mut by_stream: BTreeMap<Vec<ObjectId>, Erasures> = BTreeMap::new();
    for show in erased.iter().filter_map(|&i| shows.get(i)) {
        by_stream
            .entry(show.form.clone())
            .or_default()
            .insert(show.op_index, show.adjustment);
    }

    // Every form on the way to an erased operator is copied, innermost first
    let mut dirty: BTreeSet<Vec<ObjectId>> = BTreeSet::new();
    for path in by_stream.keys() {
        for len in 1..=path.len() {
            dirty.insert(path[..len].to_vec());
        }
    }
    let mut dirty: Vec<Vec<ObjectId>> = dirty.into_iter().collect();
    dirty.sort_by_key(|path| Reverse(path.len()));

    let no_erasures = Erasures::new();
    let mut clones: BTreeMap<Vec<ObjectId>, ObjectId> = BTreeMap::new();
    for path in dirty {
        let (Some(&form_id), Some(form)) = (path.last(), forms.remove(&path)) else {
            continue;
        };
        let redirects = child_redirects(&path, &clones);
        let form_erasures = by_stream.get(&path).unwrap_or(&no_erasures);
        let clone_id = clone_form(doc, form_id, form, form_erasures, &redirects)?;
        debug!(
            "Form {:?} copied to {:?} with {} operators erased",
            form_id,
            clone_id,
            form_erasures.len()
        );
        clones.insert(path, clone_id);
    }

    let page_erasures = by_stream.get(&Vec::new()).unwrap_or(&no_erasures);
    debug!("Erasing {} text operators on page {:?}", page_erasures.len(), page_id);

    let content = Content {
        operations: isolate(erase_operations(operations, page_erasures)),
    };
    replace_page_content(doc, page_id, content.encode()?)?;

    let redirects = child_redirects(&[], &clones);
    if !redirects.is_empty() {
        redirect_page_xobjects(doc, page_id, &redirects)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use crate::pdf::extract::extract_page_text;

    fn ops(names: &[&str]) -> Vec<Operation> {
        names.iter().map(|n| Operation::new(n, vec![])).collect()
    }

    fn shows_text(operations: &[Operation]) -> bool {
        operations.iter().any(|op| {
            op.operands.iter().any(|operand| match operand {
                Object::String(..) => true,
                Object::Array(items) => items.iter().any(|item| matches!(item, Object::String(..))),
                _ => false,
            })
        })
    }

    #[test]
    fn test_erased_operator_becomes_spacer() {
        let mut operations = ops(&["BT", "Tj", "Tj", "ET"]);
        operations[1] = Operation::new("Tj", vec![Object::string_literal("gone")]);
        operations[2] = Operation::new("Tj", vec![Object::string_literal("kept")]);

        let result = erase_operations(operations, &Erasures::from([(1, -3000.0)]));
        let operators: Vec<&str> = result.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(operators, vec!["BT", "TJ", "Tj", "ET"]);
        assert_eq!(result[1].operands, vec![Object::Array(vec![Object::Integer(-3000)])]);
        assert_eq!(result[2].operands, vec![Object::string_literal("kept")]);
    }

    #[test]
    fn test_spacer_numbers() {
        assert_eq!(spacer_number(-1234.5), Object::Real(-1234.5));
        assert_eq!(spacer_number(-3e18), Object::Integer(-3e18f32 as i64));
        assert_eq!(spacer_number(f32::NEG_INFINITY), Object::Integer(0));
    }

    #[test]
    fn test_quote_operators_keep_line_moves() {
        let operations = vec![
            Operation::new("'", vec![Object::string_literal("one")]),
            Operation::new("\"", vec![1.into(), 2.into(), Object::string_literal("two")]),
        ];

        let result = erase_operations(operations, &Erasures::from([(0, -100.0), (1, -200.0)]));
        let operators: Vec<&str> = result.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(operators, vec!["T*", "TJ", "Tw", "Tc", "T*", "TJ"]);
        assert_eq!(result[2].operands, vec![Object::Integer(1)]);
        assert_eq!(result[3].operands, vec![Object::Integer(2)]);
        assert!(!shows_text(&result));
    }

    #[test]
    fn test_unbalanced_save_is_closed() {
        let result = isolate(ops(&["q", "q", "cm", "Q"]));

        let saves = result.iter().filter(|op| op.operator == "q").count();
        let restores = result.iter().filter(|op| op.operator == "Q").count();
        assert_eq!(saves, restores);
        assert_eq!(result.first().map(|op| op.operator.as_str()), Some("q"));
    }

    /// Two pages drawing the same form, which shows one string
    fn shared_form_document() -> (Document, ObjectId, [ObjectId; 2]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });

        let form = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Inside")]),
                Operation::new("ET", vec![]),
            ],
        };
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            },
            form.encode().unwrap(),
        ));

        let draw = Content {
            operations: vec![Operation::new("Do", vec!["Fm1".into()])],
        };
        let mut page_ids = [(0, 0); 2];
        for page_id in page_ids.iter_mut() {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), draw.encode().unwrap()));
            *page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
                "Count" => 2,
                "MediaBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                    "XObject" => dictionary! { "Fm1" => form_id },
                },
            }),
        );

        (doc, form_id, page_ids)
    }

    fn page_form(doc: &Document, page_id: ObjectId) -> ObjectId {
        crate::pdf::page::page_resources(doc, page_id).unwrap()
            .get(b"XObject").unwrap()
            .as_dict().unwrap()
            .get(b"Fm1").unwrap()
            .as_reference().unwrap()
    }

    #[test]
    fn test_erase_text_copies_shared_form() {
        let (mut doc, form_id, [first, second]) = shared_form_document();

        let page_text = extract_page_text(&doc, first).unwrap();
        assert_eq!(page_text.spans.len(), 1);
        let erased: BTreeSet<usize> = page_text.spans.iter().map(|s| s.show).collect();
        erase_text(&mut doc, first, page_text, &erased).unwrap();

        // The first page draws an erased copy
        let copy_id = page_form(&doc, first);
        assert_ne!(copy_id, form_id);
        let copy = doc.get_object(copy_id).unwrap().as_stream().unwrap();
        let operations = Content::decode(&copy.content).unwrap().operations;
        assert!(!shows_text(&operations));
        assert!(operations.iter().any(|op| op.operator == "TJ"));
        assert_eq!(copy.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Form");

        // The original form and the second page are untouched
        assert_eq!(page_form(&doc, second), form_id);
        let original = doc.get_object(form_id).unwrap().as_stream().unwrap();
        assert!(shows_text(&Content::decode(&original.content).unwrap().operations));
        assert_eq!(extract_page_text(&doc, second).unwrap().spans.len(), 1);
        assert!(extract_page_text(&doc, first).unwrap().spans.is_empty());
    }
}
