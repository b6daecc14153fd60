//! Mutable element-tree model for CoT events.

/// One XML element: name, attributes in document order, child elements in
/// document order, and optional text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: Option<String>,
}

impl Element {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Look up an attribute value.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Overwrite an attribute in place, or append it if absent. Existing
    /// attribute order is preserved.
    pub fn set_attr(&mut self, key: &str, value: &str) {
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value.to_string();
        } else {
            self.attrs.push((key.to_string(), value.to_string()));
        }
    }

    /// First child with the given element name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Mutable access to the first child with the given element name.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Append a child element after all existing children.
    pub fn append(&mut self, child: Element) {
        self.children.push(child);
    }

    pub(crate) fn push_text(&mut self, fragment: &str) {
        match &mut self.text {
            Some(text) => text.push_str(fragment),
            None => self.text = Some(fragment.to_string()),
        }
    }
}

/// A single CoT event: an element tree rooted at `<event>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CotEvent {
    pub root: Element,
}

impl CotEvent {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// The event's identity. Absence makes the event un-routable.
    pub fn uid(&self) -> Option<&str> {
        self.root.attr("uid")
    }

    /// The CoT type/category code (e.g. "a-f-G").
    pub fn event_type(&self) -> Option<&str> {
        self.root.attr("type")
    }

    pub fn set_event_type(&mut self, cot_type: &str) {
        self.root.set_attr("type", cot_type);
    }

    /// The `<detail>` sub-element, if present.
    pub fn detail(&self) -> Option<&Element> {
        self.root.child("detail")
    }

    /// Mutable `<detail>`, created on first use so overrides always have a
    /// place to land.
    pub fn detail_mut(&mut self) -> &mut Element {
        if self.root.child("detail").is_none() {
            self.root.append(Element::new("detail"));
        }
        self.root.child_mut("detail").unwrap()
    }

    /// Callsign from the `detail` attribute, falling back to the
    /// `detail/contact` attribute.
    pub fn callsign(&self) -> Option<&str> {
        let detail = self.detail()?;
        detail
            .attr("callsign")
            .or_else(|| detail.child("contact").and_then(|c| c.attr("callsign")))
    }

    /// Text content of `detail/remarks`, if present.
    pub fn remarks(&self) -> Option<&str> {
        self.detail()?
            .child("remarks")
            .and_then(|r| r.text.as_deref())
    }
}
