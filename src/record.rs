// Record Model - Immutable element tree for one reporting unit
//
// The external parser hands the engine an already-parsed tree. The engine
// never mutates it; every accessor borrows. Navigation mirrors what the
// statistic functions actually need: child lookup by tag, attribute lookup,
// and a small slash-path helper for `tag/tag/@attr` style paths.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// ELEMENT TREE
// ============================================================================

/// One typed node: tag, attributes, optional text, ordered children.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter, used heavily in tests.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn text_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// First direct child with the given tag.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All direct children with the given tag.
    pub fn findall<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Resolve a slash path of tags, optionally ending in `@attr`, and return
    /// every matching attribute or text value.
    ///
    /// `path_values("transaction/value/@currency")` returns each currency
    /// attribute across all transactions; `path_values("@humanitarian")`
    /// reads an attribute of this element itself.
    pub fn path_values(&self, path: &str) -> Vec<&str> {
        let segments: Vec<&str> = path.split('/').collect();
        let mut current: Vec<&Element> = vec![self];
        let mut out = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            if let Some(attr_name) = segment.strip_prefix('@') {
                // An attribute segment must be last; collect and stop.
                debug_assert_eq!(i, segments.len() - 1);
                for el in &current {
                    if let Some(v) = el.attr(attr_name) {
                        if !v.is_empty() {
                            out.push(v);
                        }
                    }
                }
                return out;
            }
            current = current
                .iter()
                .flat_map(|el| el.children.iter().filter(move |c| c.tag == *segment))
                .collect();
        }
        // Pure element path: return the text of each match.
        current.iter().filter_map(|el| el.text_str()).collect()
    }

    /// All elements matching a slash path of tags (no attribute segment).
    pub fn path_elements(&self, path: &str) -> Vec<&Element> {
        let mut current: Vec<&Element> = vec![self];
        for segment in path.split('/') {
            current = current
                .iter()
                .flat_map(|el| el.children.iter().filter(move |c| c.tag == segment))
                .collect();
        }
        current
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// Whether a record reports an activity or an organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Activity,
    Organisation,
}

impl RecordKind {
    pub fn root_tag(self) -> &'static str {
        match self {
            RecordKind::Activity => "iati-activity",
            RecordKind::Organisation => "iati-organisation",
        }
    }
}

/// One reporting unit plus the version its enclosing document declared.
///
/// The document version lives on the file root, outside the record element,
/// so the parser passes it alongside rather than grafting it into the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub root: Element,
    pub kind: RecordKind,
    /// `@version` of the enclosing `iati-activities`/`iati-organisations`
    /// document root, verbatim. `None` when the file did not declare one.
    pub file_version: Option<String>,
}

impl Record {
    pub fn activity(root: Element, file_version: Option<String>) -> Self {
        Record {
            root,
            kind: RecordKind::Activity,
            file_version,
        }
    }

    pub fn organisation(root: Element, file_version: Option<String>) -> Self {
        Record {
            root,
            kind: RecordKind::Organisation,
            file_version,
        }
    }

    pub fn iati_identifier(&self) -> Option<&str> {
        self.root.find("iati-identifier").and_then(Element::text_str)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new("iati-activity")
            .with_attr("default-currency", "EUR")
            .with_child(Element::new("iati-identifier").with_text("XM-DAC-1"))
            .with_child(
                Element::new("transaction")
                    .with_child(Element::new("value").with_attr("currency", "GBP")),
            )
            .with_child(Element::new("transaction").with_child(Element::new("value")))
    }

    #[test]
    fn test_find_and_findall() {
        let el = sample();
        assert!(el.find("iati-identifier").is_some());
        assert_eq!(el.findall("transaction").count(), 2);
        assert!(el.find("budget").is_none());
    }

    #[test]
    fn test_path_values_attribute() {
        let el = sample();
        assert_eq!(el.path_values("transaction/value/@currency"), vec!["GBP"]);
        assert_eq!(el.path_values("@default-currency"), vec!["EUR"]);
        assert!(el.path_values("transaction/@humanitarian").is_empty());
    }

    #[test]
    fn test_path_values_text() {
        let el = sample();
        assert_eq!(el.path_values("iati-identifier"), vec!["XM-DAC-1"]);
    }

    #[test]
    fn test_path_elements() {
        let el = sample();
        assert_eq!(el.path_elements("transaction/value").len(), 2);
    }

    #[test]
    fn test_record_identifier() {
        let record = Record::activity(sample(), Some("2.03".to_string()));
        assert_eq!(record.iati_identifier(), Some("XM-DAC-1"));
        assert_eq!(record.kind.root_tag(), "iati-activity");
    }
}
