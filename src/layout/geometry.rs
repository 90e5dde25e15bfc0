// SPDX-License-Identifier: GPL-3.0-only

//! Geometry calculations for theme parts.
//!
//! Walks a part's rows top to bottom and each row's cells left to right,
//! placing one [`ButtonModel`] per key at a running cursor. Key sizes come
//! from the hint tables; spacing cells only move the cursor (and may raise
//! the row height). The bounding size of the part is the widest row by the
//! sum of row heights, and is the part's fixed minimum size.

use super::button::{ButtonModel, Rect, Size};
use super::types::{CellDefinition, HintTables, PartDefinition, PartKind};
use crate::app_settings::{ROW_MARGIN_LEFT, ROW_SPACING_X, ROW_SPACING_Y};

/// Bounding size and grid counts of a laid-out part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutGeometry {
    /// Widest row by cumulative row height
    pub size: Size,
    /// Number of rows processed
    pub total_rows: usize,
    /// Largest number of keys in a single row
    pub total_cols: usize,
}

/// A fully positioned part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartLayout {
    pub kind: PartKind,
    /// Buttons in document order (row-major, left to right)
    pub buttons: Vec<ButtonModel>,
    pub geometry: LayoutGeometry,
}

/// Computes button geometry for one part.
///
/// # Arguments
///
/// * `part` - The parsed part
/// * `hints` - Hint tables of the owning theme
///
/// # Returns
///
/// The placed buttons in document order plus the part's bounding geometry.
#[must_use]
pub fn layout_part(part: &PartDefinition, hints: &HintTables) -> PartLayout {
    let mut buttons = Vec::new();

    let mut max_sx = 0;
    let mut sx = ROW_MARGIN_LEFT;
    let mut sy = 0;
    let mut total_cols = 0;

    for row in &part.rows {
        let mut row_height = hints.key_height(row.height.as_deref());
        let mut row_buttons = 0;

        for cell in &row.cells {
            match cell {
                CellDefinition::Key(key) => {
                    let width = hints.key_width(key.width.as_deref());
                    let height = hints.key_height(key.height.as_deref());

                    buttons.push(ButtonModel::from_key_spec(
                        key,
                        Rect::new(sx, sy, width, height),
                    ));
                    row_buttons += 1;
                    sx += width + ROW_SPACING_X;
                }
                CellDefinition::Spacing(spacing) => {
                    if let Some(width) = hints.spacing_width(spacing.width.as_deref()) {
                        sx += width;
                    }
                    if let Some(height) = hints.row_height(spacing.height.as_deref()) {
                        row_height = row_height.max(height);
                    }
                }
            }
        }

        max_sx = max_sx.max(sx);
        sy += row_height + ROW_SPACING_Y;
        sx = ROW_MARGIN_LEFT;
        total_cols = total_cols.max(row_buttons);
    }

    let geometry = LayoutGeometry {
        size: Size::new(max_sx, sy),
        total_rows: part.rows.len(),
        total_cols,
    };

    tracing::debug!(
        "Laid out {} part: {} buttons, {}x{} px, {} rows, {} cols",
        part.kind,
        buttons.len(),
        geometry.size.width,
        geometry.size.height,
        geometry.total_rows,
        geometry.total_cols
    );

    PartLayout {
        kind: part.kind,
        buttons,
        geometry,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_settings::{DEFAULT_BUTTON_HEIGHT, DEFAULT_BUTTON_WIDTH};
    use crate::layout::parser::parse_theme_from_string;

    fn layout(xml: &str) -> PartLayout {
        let doc = parse_theme_from_string(xml, "test").unwrap();
        layout_part(&doc.main, &doc.hints)
    }

    /// Test 1: A narrow key with no height hint gets the default height
    #[test]
    fn test_narrow_key_default_height() {
        let part = layout(
            r#"<theme>
                <buttonWidth><item name="narrow" width="20"/></buttonWidth>
                <part><row><key width="narrow" code="24"/></row></part>
            </theme>"#,
        );

        assert_eq!(part.buttons.len(), 1);
        assert_eq!(part.buttons[0].rect, Rect::new(0, 0, 20, DEFAULT_BUTTON_HEIGHT));
    }

    /// Test 2: Unknown hints resolve to the default constants
    #[test]
    fn test_unknown_hints_use_defaults() {
        let part = layout(
            r#"<theme><part><row><key width="nope" height="nope"/></row></part></theme>"#,
        );
        assert_eq!(
            part.buttons[0].rect,
            Rect::new(0, 0, DEFAULT_BUTTON_WIDTH, DEFAULT_BUTTON_HEIGHT)
        );
    }

    /// Test 3: Spacing advances the cursor, is not counted as a column,
    /// and can raise the row height
    #[test]
    fn test_spacing_cells() {
        let part = layout(
            r#"<theme>
                <buttonHeight><item name="tall" height="40"/></buttonHeight>
                <spacingHints><item name="gap" width="10"/></spacingHints>
                <part>
                    <row>
                        <key code="9"/>
                        <spacing width="gap" height="tall"/>
                        <key code="67"/>
                        <spacing width="gap"/>
                    </row>
                    <row><key code="49"/></row>
                </part>
            </theme>"#,
        );

        assert_eq!(part.buttons[0].rect, Rect::new(0, 0, 25, 25));
        assert_eq!(part.buttons[1].rect, Rect::new(35, 0, 25, 25));
        assert_eq!(part.buttons[2].rect, Rect::new(0, 40, 25, 25), "row 1 raised to 40");

        assert_eq!(part.geometry.total_rows, 2);
        assert_eq!(part.geometry.total_cols, 2, "spacing cells are not columns");
        assert_eq!(part.geometry.size, Size::new(70, 65));
    }

    /// Test 4: Row height hint applies and spacings never lower it
    #[test]
    fn test_row_height_is_max() {
        let part = layout(
            r#"<theme>
                <buttonHeight>
                    <item name="tall" height="50"/>
                    <item name="short" height="10"/>
                </buttonHeight>
                <part>
                    <row height="tall"><key/><spacing height="short"/></row>
                    <row><key/></row>
                </part>
            </theme>"#,
        );
        assert_eq!(part.buttons[1].rect.y, 50);
        assert_eq!(part.geometry.size.height, 75);
    }

    /// Test 5: Buttons are emitted in document order
    #[test]
    fn test_document_order() {
        let part = layout(
            r#"<theme><part>
                <row><key name="a"/><key name="b"/><key name="c"/></row>
                <row><key name="d"/></row>
                <row><key name="e"/><key name="f"/></row>
            </part></theme>"#,
        );

        let names: Vec<&str> = part
            .buttons
            .iter()
            .map(|b| b.name.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e", "f"]);

        assert_eq!(part.buttons[2].rect.x, 50);
        assert_eq!(part.buttons[3].rect, Rect::new(0, 25, 25, 25));
        assert_eq!(part.buttons[5].rect, Rect::new(25, 50, 25, 25));
        assert_eq!(part.geometry.total_cols, 3);
        assert_eq!(part.geometry.total_rows, 3);
        assert_eq!(part.geometry.size, Size::new(75, 75));
    }

    /// Test 6: Laying out a re-parsed document gives identical geometry
    #[test]
    fn test_layout_idempotent() {
        let xml = r#"<theme>
            <buttonWidth width="30"><item name="w" width="45"/></buttonWidth>
            <part><row><key width="w"/><key/></row></part>
        </theme>"#;
        assert_eq!(layout(xml), layout(xml));
        assert_eq!(layout(xml).buttons[1].rect, Rect::new(45, 0, 30, 25));
    }

    #[test]
    fn test_empty_part() {
        let part = layout_part(&PartDefinition::new(PartKind::Extension), &HintTables::default());
        assert!(part.buttons.is_empty());
        assert_eq!(part.geometry, LayoutGeometry::default());
        assert_eq!(part.kind, PartKind::Extension);
    }
}
