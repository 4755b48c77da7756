//! Coordinate extraction from WKT geometry attributes.

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::error::{CatalogError, Result};


pub type Point = [f64; 2];

const GEOMETRY_TYPES: [&str; 7] = [
    "POINT",
    "LINESTRING",
    "POLYGON",
    "MULTIPOINT",
    "MULTILINESTRING",
    "MULTIPOLYGON",
    "GEOMETRYCOLLECTION",
];

lazy_static! {
    static ref ORDINATE: Regex = Regex::new(r"^[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?$").unwrap();
}

fn is_keyword(token: &str) -> bool {
    let upper = token.to_ascii_uppercase();
    GEOMETRY_TYPES.contains(&upper.as_str()) || matches!(upper.as_str(), "EMPTY" | "Z" | "M" | "ZM")
}


/// Every `[x, y]` position in a WKT geometry, in text order. Z and M ordinates are dropped.
pub fn wkt_points(wkt: &str) -> Result<Vec<Point>> {
    let trimmed = wkt.trim();
    let kind: String = trimmed.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if !GEOMETRY_TYPES.contains(&kind.to_ascii_uppercase().as_str()) {
        return Err(CatalogError::Geometry(format!("unknown geometry type in {trimmed:?}")));
    }

    let mut depth = 0i32;
    for c in trimmed.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            break;
        }
    }
    if depth != 0 {
        return Err(CatalogError::Geometry(format!("unbalanced parentheses in {trimmed:?}")));
    }

    let flattened = trimmed.replace(['(', ')'], " ");
    let mut points = Vec::new();
    for position in flattened.split(',') {
        let mut ordinates = Vec::with_capacity(4);
        for token in position.split_whitespace() {
            if ORDINATE.is_match(token) {
                let value = token
                    .parse::<f64>()
                    .map_err(|e| CatalogError::Geometry(format!("bad ordinate {token:?}: {e}")))?;
                ordinates.push(value);
            } else if !is_keyword(token) {
                return Err(CatalogError::Geometry(format!("unexpected token {token:?}")));
            }
        }

        match ordinates.len() {
            0 => {}
            2..=4 => points.push([ordinates[0], ordinates[1]]),
            n => {
                return Err(CatalogError::Geometry(format!(
                    "position with {n} ordinates in {trimmed:?}"
                )));
            }
        }
    }

    Ok(points)
}
