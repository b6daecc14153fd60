//! Pull-parser for single and concatenated CoT event documents.

use crate::event::{CotEvent, Element};
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed event markup: {0}")]
    Malformed(#[from] quick_xml::Error),

    #[error("unbalanced element markup")]
    Unbalanced,

    #[error("no element found in input")]
    Empty,

    #[error("trailing content after event document")]
    TrailingContent,

    #[error("document root is <{0}>, expected <event>")]
    NotAnEvent(String),
}

/// Parse exactly one well-formed CoT event document.
///
/// A leading XML declaration is tolerated. The caller is expected to drop
/// the unit on error rather than tear down the receive loop.
pub fn decode_single(input: &str) -> Result<CotEvent, CodecError> {
    let mut forest = parse_forest(input)?;
    let root = match forest.len() {
        0 => return Err(CodecError::Empty),
        1 => forest.remove(0),
        // Sibling documents are not valid for single decode.
        _ => return Err(CodecError::TrailingContent),
    };
    if root.name != "event" {
        return Err(CodecError::NotAnEvent(root.name));
    }
    Ok(CotEvent::new(root))
}

/// Parse zero or more sibling CoT event documents from one network read.
///
/// Handles the case where several events arrive in a single datagram with no
/// individual framing. Elements other than `<event>` at the top level are
/// ignored. Empty input yields an empty vec.
pub fn decode_concatenated(input: &str) -> Result<Vec<CotEvent>, CodecError> {
    let forest = parse_forest(input)?;
    Ok(forest
        .into_iter()
        .filter(|el| el.name == "event")
        .map(CotEvent::new)
        .collect())
}

/// Parse a sequence of sibling element trees. XML declarations, comments,
/// processing instructions, and doctype nodes are skipped wherever they
/// appear, so concatenated documents that each carry their own declaration
/// parse cleanly.
fn parse_forest(input: &str) -> Result<Vec<Element>, CodecError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut roots: Vec<Element> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();

    loop {
        match reader.read_event()? {
            XmlEvent::Start(e) => {
                stack.push(element_from(&e)?);
            }
            XmlEvent::Empty(e) => {
                let element = element_from(&e)?;
                attach(&mut stack, &mut roots, element);
            }
            XmlEvent::End(_) => {
                let element = stack.pop().ok_or(CodecError::Unbalanced)?;
                attach(&mut stack, &mut roots, element);
            }
            XmlEvent::Text(t) => {
                if let Some(open) = stack.last_mut() {
                    open.push_text(&t.unescape()?);
                }
            }
            XmlEvent::CData(t) => {
                if let Some(open) = stack.last_mut() {
                    open.push_text(&String::from_utf8_lossy(t.as_ref()));
                }
            }
            XmlEvent::Decl(_) | XmlEvent::PI(_) | XmlEvent::Comment(_) | XmlEvent::DocType(_) => {}
            XmlEvent::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(CodecError::Unbalanced);
    }
    Ok(roots)
}

fn attach(stack: &mut Vec<Element>, roots: &mut Vec<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.append(element),
        None => roots.push(element),
    }
}

fn element_from(e: &BytesStart) -> Result<Element, CodecError> {
    let mut element = Element::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr.map_err(|e| CodecError::Malformed(quick_xml::Error::InvalidAttr(e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}
