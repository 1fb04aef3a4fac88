//! Which side of a table an edge attaches to.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// Sides for an edge from A to B given their current absolute x positions.
/// Edges leave A toward B: right-to-left when A is further left, otherwise
/// left-to-right. Equal x counts as "not left of".
pub fn attachment_sides(a_x: f64, b_x: f64) -> (Side, Side) {
    if a_x < b_x {
        (Side::Right, Side::Left)
    } else {
        (Side::Left, Side::Right)
    }
}
