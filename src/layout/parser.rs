// SPDX-License-Identifier: GPL-3.0-only

//! XML theme parser.
//!
//! Reads a theme document into an element tree with `quick-xml` and then
//! extracts the hint tables and parts from it.
//!
//! # Document shape
//!
//! ```xml
//! <theme>
//!   <buttonWidth width="25">
//!     <item name="wide" width="50"/>
//!   </buttonWidth>
//!   <buttonHeight>
//!     <item name="tall" height="50"/>
//!   </buttonHeight>
//!   <spacingHints>
//!     <item name="gap" width="10"/>
//!   </spacingHints>
//!   <part name="main">
//!     <row height="tall">
//!       <key code="24" width="wide"/>
//!       <spacing width="gap"/>
//!     </row>
//!     <extension>
//!       <row>...</row>
//!     </extension>
//!   </part>
//! </theme>
//! ```
//!
//! Only the first `buttonWidth`, `buttonHeight`, `spacingHints` and `part`
//! elements are read. Only the first `extension` child of the part is
//! loaded; later ones are ignored.

use super::types::{
    CellDefinition, HintTables, KeySpec, PartDefinition, PartKind, RowDefinition, SpacingSpec,
    ThemeDocument, ThemeLoadError,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::Path;

// ============================================================================
// Element Tree
// ============================================================================

/// Minimal DOM node built from the event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| format!("attribute error in <{}>: {}", name, e))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| format!("bad value for attribute '{}': {}", key, e))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    /// Returns a non-empty attribute value.
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    fn attr_owned(&self, name: &str) -> Option<String> {
        self.attr(name).map(str::to_string)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Depth-first search over descendants (not including `self`).
    fn find_descendant(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(name) {
                return Some(found);
            }
        }
        None
    }

    /// Collects all descendants with the given name in document order.
    fn descendants_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.descendants_named(name, out);
        }
    }
}

fn read_tree(xml: &str, theme: &str) -> Result<Element, ThemeLoadError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let element = Element::from_start(e)
                    .map_err(|msg| ThemeLoadError::parse_at(theme, msg, position))?;
                stack.push(element);
            }
            Ok(Event::Empty(ref e)) => {
                let element = Element::from_start(e)
                    .map_err(|msg| ThemeLoadError::parse_at(theme, msg, position))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None if root.is_none() => root = Some(element),
                    None => {}
                }
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| {
                    ThemeLoadError::parse_at(theme, "unexpected closing tag", position)
                })?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None if root.is_none() => root = Some(element),
                    None => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ThemeLoadError::parse_at(
                    theme,
                    e.to_string(),
                    reader.buffer_position(),
                ));
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ThemeLoadError::parse_at(
            theme,
            format!("unexpected end of document inside <{}>", open.name),
            reader.buffer_position(),
        ));
    }

    root.ok_or_else(|| ThemeLoadError::parse(theme, "document has no root element"))
}

// ============================================================================
// Extraction
// ============================================================================

fn parse_int(value: Option<&str>) -> Option<i32> {
    value.and_then(|v| v.trim().parse::<i32>().ok())
}

/// Reads `item` descendants of a hint container into a name -> pixels map.
fn read_hint_items(container: Option<&Element>, dimension: &str) -> HashMap<String, i32> {
    let mut table = HashMap::new();
    let Some(container) = container else {
        return table;
    };

    let mut items = Vec::new();
    container.descendants_named("item", &mut items);
    for item in items {
        let Some(name) = item.attr("name") else {
            tracing::debug!("Skipping {} hint item without a name", container.name);
            continue;
        };
        // A missing or non-numeric dimension is stored as 0 px.
        let pixels = parse_int(item.attr(dimension)).unwrap_or_else(|| {
            tracing::warn!(
                "Hint '{}' in <{}> has no numeric {} attribute; using 0",
                name,
                container.name,
                dimension
            );
            0
        });
        table.insert(name.to_string(), pixels);
    }
    table
}

fn read_key(element: &Element) -> KeySpec {
    KeySpec {
        name: element.attr_owned("name"),
        width: element.attr_owned("width"),
        height: element.attr_owned("height"),
        label: element.attr_owned("label"),
        tooltip: element.attr_owned("tooltip"),
        action: element.attr_owned("action"),
        group_name: element.attr_owned("group_name"),
        group_label: element.attr_owned("group_label"),
        group_toggle: element.attr_owned("group_toggle"),
        color_group: element.attr_owned("colorGroup"),
        modifier: element.attr_owned("modifier"),
        checkable: element.attr_owned("checkable"),
        code: element.attr_owned("code"),
    }
}

fn read_row(element: &Element) -> RowDefinition {
    let cells = element
        .children
        .iter()
        .filter_map(|child| match child.name.as_str() {
            "key" => Some(CellDefinition::Key(read_key(child))),
            "spacing" => Some(CellDefinition::Spacing(SpacingSpec {
                width: child.attr_owned("width"),
                height: child.attr_owned("height"),
            })),
            _ => None,
        })
        .collect();

    RowDefinition {
        height: element.attr_owned("height"),
        cells,
    }
}

fn read_part(element: &Element, kind: PartKind) -> PartDefinition {
    PartDefinition {
        kind,
        name: element.attr_owned("name"),
        rows: element.children_named("row").map(read_row).collect(),
    }
}

fn build_document(root: &Element, theme: &str) -> Result<ThemeDocument, ThemeLoadError> {
    let width_node = root.find_descendant("buttonWidth");
    let height_node = root.find_descendant("buttonHeight");
    let spacing_node = root.find_descendant("spacingHints");

    let mut hints = HintTables {
        width: read_hint_items(width_node, "width"),
        height: read_hint_items(height_node, "height"),
        spacing: read_hint_items(spacing_node, "width"),
        ..HintTables::default()
    };

    // The container's own width attribute overrides the default key width.
    if let Some(width) = parse_int(width_node.and_then(|node| node.attr("width"))).filter(|w| *w > 0)
    {
        hints.default_width = width;
    }

    let part_node = if root.name == "part" {
        Some(root)
    } else {
        root.find_descendant("part")
    };
    let part_node =
        part_node.ok_or_else(|| ThemeLoadError::parse(theme, "theme has no <part> element"))?;

    let main = read_part(part_node, PartKind::Main);
    let extension = part_node
        .children_named("extension")
        .next()
        .map(|node| read_part(node, PartKind::Extension));

    let extra = part_node.children_named("extension").count().saturating_sub(1);
    if extra > 0 {
        tracing::debug!(
            "Theme '{}' declares {} additional extension part(s); only the first is loaded",
            theme,
            extra
        );
    }

    Ok(ThemeDocument {
        name: theme.to_string(),
        hints,
        main,
        extension,
    })
}

// ============================================================================
// Public API
// ============================================================================

/// Parses a theme document from a string.
///
/// # Arguments
///
/// * `xml` - The theme document
/// * `theme` - Name recorded in the document and in error messages
///
/// # Errors
///
/// Returns [`ThemeLoadError::ParseError`] if the XML is malformed or has no
/// `part` element.
pub fn parse_theme_from_string(xml: &str, theme: &str) -> Result<ThemeDocument, ThemeLoadError> {
    let root = read_tree(xml, theme)?;
    build_document(&root, theme)
}

/// Parses a theme document from a file.
///
/// The theme name is taken from the file stem.
///
/// # Errors
///
/// Returns [`ThemeLoadError::NotFound`] if the file cannot be read, or
/// [`ThemeLoadError::ParseError`] if its contents are not a valid theme.
pub fn parse_theme_file(path: impl AsRef<Path>) -> Result<ThemeDocument, ThemeLoadError> {
    let path = path.as_ref();
    let theme = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let xml = std::fs::read_to_string(path).map_err(|e| {
        tracing::debug!("Failed to read theme file {}: {}", path.display(), e);
        ThemeLoadError::not_found(theme.clone(), vec![path.display().to_string()])
    })?;

    parse_theme_from_string(&xml, &theme)
}

// ============================================================================
// Tests
// ============================================================================
