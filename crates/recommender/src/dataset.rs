//! Rating dataset parsing
//!
//! Reads the MovieLens `u.data` layout (`user_id<TAB>item_id<TAB>rating<TAB>timestamp`).
//! Comma-separated exports of the same columns are accepted too. A header row
//! is tolerated on the first non-blank line only.

use crate::error::LoadError;
use crate::types::{ItemId, UserId};
use std::path::Path;

/// One observed rating
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRecord {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: f64,
    pub timestamp: Option<i64>,
}

impl RatingRecord {
    pub fn as_triple(&self) -> (UserId, ItemId, f64) {
        (self.user_id, self.item_id, self.rating)
    }
}

pub fn read_ratings(path: &Path) -> Result<Vec<RatingRecord>, LoadError> {
    let contents = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    let records = parse_ratings(&contents)?;
    tracing::info!(path = %path.display(), count = records.len(), "Loaded ratings");
    Ok(records)
}

pub fn parse_ratings(contents: &str) -> Result<Vec<RatingRecord>, LoadError> {
    let mut records = Vec::new();
    let mut seen_data = false;

    for (idx, raw) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c| c == '\t' || c == ',')
            .map(str::trim)
            .collect();

        // only a non-numeric label counts as a header; "-1" is a bad id
        if !seen_data && fields[0].parse::<f64>().is_err() {
            seen_data = true;
            continue;
        }
        seen_data = true;

        if fields.len() < 3 {
            return Err(dataset_error(
                line_no,
                format!("expected at least 3 fields, found {}", fields.len()),
            ));
        }

        let user_id = fields[0]
            .parse::<UserId>()
            .map_err(|_| dataset_error(line_no, format!("invalid user id '{}'", fields[0])))?;
        let item_id = fields[1]
            .parse::<ItemId>()
            .map_err(|_| dataset_error(line_no, format!("invalid item id '{}'", fields[1])))?;
        let rating = fields[2]
            .parse::<f64>()
            .ok()
            .filter(|r| r.is_finite())
            .ok_or_else(|| dataset_error(line_no, format!("invalid rating '{}'", fields[2])))?;
        let timestamp = match fields.get(3) {
            Some(ts) if !ts.is_empty() => Some(ts.parse::<i64>().map_err(|_| {
                dataset_error(line_no, format!("invalid timestamp '{}'", ts))
            })?),
            _ => None,
        };

        records.push(RatingRecord {
            user_id,
            item_id,
            rating,
            timestamp,
        });
    }

    Ok(records)
}

fn dataset_error(line: usize, message: String) -> LoadError {
    LoadError::Dataset { line, message }
}
