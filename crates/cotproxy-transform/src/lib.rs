//! Transform engine: applies a resolved rule's field-level edits to an
//! event in place and stamps provenance.

use cotproxy_core::TransformRule;
use cotproxy_cot::{CotEvent, Element};
use tracing::debug;

/// Name of the provenance element appended after an active transform.
pub const PROVENANCE_ELEMENT: &str = "_cotproxy_";

/// Apply a transform rule to an event.
///
/// An inactive rule returns the event untouched, with no provenance stamp;
/// the result is indistinguishable from the no-transform pass-through path.
/// An active rule applies each set field independently, then appends one
/// `<_cotproxy_ tfd="True|False" node="..."/>` child recording whether
/// anything actually changed and which node processed it.
///
/// The rule's `icon` field is expected to already be a resolved iconset
/// path; icon lookup happens upstream in the resolver.
///
/// Guarantees: `uid` is never modified, existing children are never
/// reordered. The engine only overwrites specific attributes and appends
/// new children.
pub fn apply(mut event: CotEvent, rule: &TransformRule, node: &str) -> CotEvent {
    if !rule.active {
        return event;
    }

    let mut tfd = false;

    if let Some(callsign) = &rule.callsign {
        tfd = true;
        let detail = event.detail_mut();
        detail.set_attr("callsign", callsign);
        match detail.child_mut("contact") {
            Some(contact) => contact.set_attr("callsign", callsign),
            None => {
                let mut contact = Element::new("contact");
                contact.set_attr("callsign", callsign);
                detail.append(contact);
            }
        }
    }

    if let Some(cot_type) = &rule.cot_type {
        tfd = true;
        event.set_event_type(cot_type);
    }

    if let Some(remark) = &rule.remark {
        tfd = true;
        event.root.set_attr("remark", remark);
    }

    // <usericon iconsetpath="66f14976-4b62-4023-8edb-d8d2ebeaa336/Public
    //  Safety Air/CIV_FIXED_ISR.png"/>
    if let Some(icon_path) = &rule.icon {
        tfd = true;
        let mut usericon = Element::new("usericon");
        usericon.set_attr("iconsetpath", icon_path);
        event.detail_mut().append(usericon);
    }

    if let Some(video) = &rule.video {
        tfd = true;
        let mut video_el = Element::new("__video");
        video_el.set_attr("url", &video.url);
        event.root.append(video_el);
    }

    debug!(uid = ?event.uid(), tfd, "applied transform");

    let mut provenance = Element::new(PROVENANCE_ELEMENT);
    provenance.set_attr("tfd", if tfd { "True" } else { "False" });
    provenance.set_attr("node", node);
    event.root.append(provenance);

    event
}
