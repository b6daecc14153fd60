//! XML serialization back to wire form.

use crate::event::{CotEvent, Element};
use quick_xml::escape::escape;

/// Serialize an event to its wire form.
///
/// Round-trips all attributes and children in document order, including
/// children appended downstream by the transform engine. No XML declaration
/// is emitted; TAK endpoints accept bare `<event>` documents.
pub fn encode(event: &CotEvent) -> String {
    let mut xml = String::new();
    write_element(&mut xml, &event.root);
    xml
}

fn write_element(xml: &mut String, element: &Element) {
    xml.push('<');
    xml.push_str(&element.name);
    for (key, value) in &element.attrs {
        xml.push(' ');
        xml.push_str(key);
        xml.push_str("=\"");
        xml.push_str(&escape(value.as_str()));
        xml.push('"');
    }

    if element.children.is_empty() && element.text.is_none() {
        xml.push_str("/>");
        return;
    }

    xml.push('>');
    if let Some(text) = &element.text {
        xml.push_str(&escape(text.as_str()));
    }
    for child in &element.children {
        write_element(xml, child);
    }
    xml.push_str("</");
    xml.push_str(&element.name);
    xml.push('>');
}
