//! Atom/OpenSearch feed parsing.
//!
//! One catalog page is loaded into a small element tree and then read two
//! ways: list mode flattens each online entry through a field
//! [`Mapping`](super::mappings::Mapping) into a [`ProductRecord`], and
//! dictionary mode walks the whole entry into a nested [`XmlValue`] tree
//! keyed by the entry id. Tag names are kept fully qualified in the tree
//! (`DIAS:onlineStatus`), matching the mapping tables; dictionary mode
//! strips the namespace prefixes on output.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;

use super::error::QueryError;
use super::mappings::Mapping;

/// One normalized list-mode result.
///
/// Always carries the enclosure download link (when the entry has one)
/// plus one field per mapping pair; mapped fields missing from the entry
/// are `None`, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    /// Download URL from the entry's `enclosure` link relation.
    pub link: Option<String>,
    /// Mapped metadata fields.
    pub fields: BTreeMap<String, Option<String>>,
}

impl ProductRecord {
    /// Returns a mapped field value, if present and non-null.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Option::as_deref)
    }
}

/// A dictionary-mode value: the recursive flattening of one XML element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum XmlValue {
    /// A leaf element's text content.
    Text(String),
    /// A leaf element with no text: its attribute map.
    Attributes(BTreeMap<String, String>),
    /// An element with children, keyed by prefix-stripped tag name.
    Map(BTreeMap<String, XmlValue>),
}

/// One parsed catalog page.
#[derive(Debug)]
pub struct Feed {
    root: Element,
}

/// A parsed XML element. Tag names keep their namespace prefix.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<Element>,
}

impl Feed {
    /// Parses one page of feed XML.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Xml`] when the document is not well-formed.
    pub fn parse(xml: &str) -> Result<Self, QueryError> {
        let root = parse_tree(xml)?;
        Ok(Self { root })
    }

    /// Returns the next-page URL, or `None` when pagination is exhausted.
    ///
    /// When several `next` links exist the last one in document order
    /// wins; the feed gives no stronger ordering guarantee.
    #[must_use]
    pub fn next_link(&self) -> Option<String> {
        link_with_rel(&self.root, "next")
    }

    /// Returns the number of pages implied by the feed counters, used
    /// only to size progress reporting.
    #[must_use]
    pub fn page_count(&self) -> Option<u64> {
        let total: u64 = child_text(&self.root, "os:totalResults")?.parse().ok()?;
        let per_page: u64 = child_text(&self.root, "os:itemsPerPage")?.parse().ok()?;
        if per_page == 0 {
            return None;
        }
        Some(total / per_page + 1)
    }

    /// Parses the online entries through `mapping` into records.
    ///
    /// Offline entries (status other than `ONLINE`, or absent) are
    /// silently dropped.
    #[must_use]
    pub fn records(&self, mapping: Mapping) -> Vec<ProductRecord> {
        self.online_entries()
            .map(|entry| parse_entry(entry, mapping))
            .collect()
    }

    /// Parses the online entries into `(id, tree)` pairs for
    /// dictionary-mode aggregation.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MissingId`] when an online entry carries no
    /// `id` element.
    pub fn indexed_entries(&self) -> Result<Vec<(String, XmlValue)>, QueryError> {
        self.online_entries()
            .map(|entry| {
                let id = child_text(entry, "id").ok_or(QueryError::MissingId)?;
                Ok((id, entry_tree(entry)))
            })
            .collect()
    }

    fn online_entries(&self) -> impl Iterator<Item = &Element> {
        self.root
            .children
            .iter()
            .filter(|child| child.name == "entry")
            .filter(|entry| is_online(entry))
    }
}

/// Builds the element tree for a whole document.
fn parse_tree(xml: &str) -> Result<Element, QueryError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(QueryError::xml)? {
            Event::Start(start) => {
                let element = open_element(&start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(text.unescape().map_err(QueryError::xml)?.as_ref());
                }
            }
            Event::CData(cdata) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Event::Eof => break,
            // Declarations, comments and processing instructions carry
            // nothing we need.
            _ => {}
        }
    }

    root.ok_or_else(|| {
        QueryError::xml(quick_xml::Error::Io(std::sync::Arc::new(
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "empty feed document"),
        )))
    })
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, QueryError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = BTreeMap::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| QueryError::xml(quick_xml::Error::from(e)))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(QueryError::xml)?
            .into_owned();
        attributes.insert(key, value);
    }
    Ok(Element {
        name,
        attributes,
        ..Element::default()
    })
}

/// Hands a completed element to its parent, or makes it the root.
fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    }
}

/// Scans `parent`'s direct `link` children for the given relation.
/// Last match in document order wins.
fn link_with_rel(parent: &Element, rel: &str) -> Option<String> {
    let mut found = None;
    for child in parent.children.iter().filter(|c| c.name == "link") {
        if child.attributes.get("rel").map(String::as_str) == Some(rel) {
            found = child.attributes.get("href").cloned();
        }
    }
    found
}

fn child_text(parent: &Element, name: &str) -> Option<String> {
    parent
        .children
        .iter()
        .find(|child| child.name == name)
        .map(|child| child.text.clone())
        .filter(|text| !text.is_empty())
}

/// An entry is online iff its status field equals the literal `ONLINE`.
fn is_online(entry: &Element) -> bool {
    child_text(entry, "DIAS:onlineStatus").as_deref() == Some("ONLINE")
}

fn parse_entry(entry: &Element, mapping: Mapping) -> ProductRecord {
    let fields = mapping
        .iter()
        .map(|&(source, output)| (output.to_string(), child_text(entry, source)))
        .collect();
    ProductRecord {
        link: link_with_rel(entry, "enclosure"),
        fields,
    }
}

/// Strips the namespace prefix from a qualified tag name.
fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Recursively flattens an entry into an [`XmlValue`] tree.
fn entry_tree(element: &Element) -> XmlValue {
    if element.children.is_empty() {
        if element.text.is_empty() {
            XmlValue::Attributes(element.attributes.clone())
        } else {
            XmlValue::Text(element.text.clone())
        }
    } else {
        XmlValue::Map(
            element
                .children
                .iter()
                .map(|child| (local_name(&child.name).to_string(), entry_tree(child)))
                .collect(),
        )
    }
}
