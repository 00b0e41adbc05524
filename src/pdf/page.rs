//! Page dictionary helpers shared by extraction and insertion

use std::collections::BTreeMap;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::error::Result;
use crate::geometry::PageFrame;

/// Page tree attributes are inherited through at most this many parents
const MAX_INHERIT_DEPTH: usize = 32;

/// Follow a reference to the object it points at
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Helper to get f32 from Object
pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Look up a page attribute, walking up the page tree for inheritable keys
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }

    None
}

/// The page's MediaBox as a frame, defaulting to US Letter
pub fn page_frame(doc: &Document, page_id: ObjectId) -> PageFrame {
    let values: Option<Vec<f32>> = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .map(|arr| arr.iter().filter_map(|o| number(resolve(doc, o))).collect());

    match values.as_deref() {
        Some(&[x0, y0, x1, y1]) => PageFrame::from_media_box([x0, y0, x1, y1]),
        _ => PageFrame::default(),
    }
}

/// The page's Resources dictionary, possibly inherited from the page tree
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    inherited(doc, page_id, b"Resources").and_then(|obj| obj.as_dict().ok())
}

/// Decompressed data of a stream
pub(crate) fn stream_content(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

/// Concatenated content streams of a page
///
/// Unlike `Document::get_page_content`, a dangling or non-stream entry in
/// `Contents` is an error rather than being skipped.
pub fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let page = doc.get_dictionary(page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(contents) => resolve(doc, contents),
        Err(_) => return Ok(Vec::new()),
    };

    let streams: Vec<&Object> = match contents {
        Object::Array(items) => items.iter().map(|item| resolve(doc, item)).collect(),
        other => vec![other],
    };

    let mut content = Vec::new();
    for stream in streams {
        content.extend(stream_content(stream.as_stream()?)?);
        content.push(b'\n');
    }

    Ok(content)
}

/// Copy of `resources` whose XObject entries point at replacement objects
pub(crate) fn redirect_xobjects(
    doc: &Document,
    resources: &Dictionary,
    redirects: &BTreeMap<ObjectId, ObjectId>,
) -> Dictionary {
    let Ok(Object::Dictionary(xobjects)) = resources.get(b"XObject").map(|x| resolve(doc, x)) else {
        return resources.clone();
    };

    let mut redirected = Dictionary::new();
    for (name, value) in xobjects.iter() {
        let value = match value {
            Object::Reference(id) => Object::Reference(*redirects.get(id).unwrap_or(id)),
            other => other.clone(),
        };
        redirected.set(name.clone(), value);
    }

    let mut resources = resources.clone();
    resources.set("XObject", Object::Dictionary(redirected));
    resources
}

/// Point the page's XObject resources at replacement objects
///
/// Like fonts, inherited resources are copied onto the page first.
pub fn redirect_page_xobjects(
    doc: &mut Document,
    page_id: ObjectId,
    redirects: &BTreeMap<ObjectId, ObjectId>,
) -> Result<()> {
    let Some(resources) = page_resources(doc, page_id) else {
        return Ok(());
    };
    let resources = redirect_xobjects(doc, resources, redirects);

    doc.get_dictionary_mut(page_id)?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Add a font reference to the page's Resources dictionary under `name`
///
/// Resources that are indirect or inherited from the page tree are copied
/// onto the page first, so other pages sharing them are left untouched.
pub fn add_font_to_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    font_id: ObjectId,
) -> Result<()> {
    let mut resources = match inherited(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };

    let mut fonts = match resources.get(b"Font").map(|f| resolve(doc, f)) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };

    fonts.set(name, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let page_dict = doc.get_dictionary_mut(page_id)?;
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(())
}

/// Replace the page's Contents with a single new stream
pub fn replace_page_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<ObjectId> {
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let page_dict = doc.get_dictionary_mut(page_id)?;
    page_dict.set("Contents", Object::Reference(stream_id));
    Ok(stream_id)
}

/// Append a content stream to a page's Contents
///
/// Appended content is drawn on top of the original page content.
pub fn append_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let page_dict = doc.get_dictionary_mut(page_id)?;
    let existing_content = page_dict.get(b"Contents").ok().cloned();

    match existing_content {
        Some(Object::Reference(content_id)) => {
            page_dict.set(
                "Contents",
                Object::Array(vec![
                    Object::Reference(content_id),
                    Object::Reference(new_content_id),
                ]),
            );
        }
        Some(Object::Array(mut content_array)) => {
            content_array.push(Object::Reference(new_content_id));
            page_dict.set("Contents", Object::Array(content_array));
        }
        _ => {
            page_dict.set("Contents", Object::Array(vec![Object::Reference(new_content_id)]));
        }
    }

    Ok(())
}
