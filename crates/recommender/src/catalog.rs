//! Item catalog collaborator
//!
//! The engine scores by id only; titles and genres come from a catalog owned
//! elsewhere. `MovieCatalog` is the in-memory implementation backed by the
//! MovieLens `u.item` file.

use crate::error::LoadError;
use crate::types::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// MovieLens genre flag order in `u.item`
pub const MOVIELENS_GENRES: [&str; 19] = [
    "unknown",
    "Action",
    "Adventure",
    "Animation",
    "Children's",
    "Comedy",
    "Crime",
    "Documentary",
    "Drama",
    "Fantasy",
    "Film-Noir",
    "Horror",
    "Musical",
    "Mystery",
    "Romance",
    "Sci-Fi",
    "Thriller",
    "War",
    "Western",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub item_id: ItemId,
    pub title: String,
    pub year: Option<u16>,
    pub genres: BTreeSet<String>,
}

/// Read-only item metadata lookup
pub trait Catalog: Send + Sync {
    fn movie(&self, item_id: ItemId) -> Option<&Movie>;

    fn title(&self, item_id: ItemId) -> Option<&str> {
        self.movie(item_id).map(|m| m.title.as_str())
    }

    fn genres(&self, item_id: ItemId) -> Option<&BTreeSet<String>> {
        self.movie(item_id).map(|m| &m.genres)
    }
}

/// In-memory catalog
#[derive(Debug, Clone, Default)]
pub struct MovieCatalog {
    movies: HashMap<ItemId, Movie>,
}

impl MovieCatalog {
    pub fn new(movies: impl IntoIterator<Item = Movie>) -> Self {
        Self {
            movies: movies.into_iter().map(|m| (m.item_id, m)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
        // u.item is Latin-1; anything outside ASCII is decoded lossily
        let contents = String::from_utf8_lossy(&bytes);
        let catalog = Self::parse(&contents)?;
        tracing::info!(path = %path.display(), movies = catalog.len(), "Loaded catalog");
        Ok(catalog)
    }

    /// Parse `id|title|release_date|video_release_date|imdb_url|<19 genre flags>`
    pub fn parse(contents: &str) -> Result<Self, LoadError> {
        let mut movies = Vec::new();

        for (idx, raw) in contents.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('|').collect();
            if fields.len() < 2 {
                return Err(LoadError::Catalog {
                    line: line_no,
                    message: "expected at least id and title".to_string(),
                });
            }

            let item_id = fields[0].trim().parse::<ItemId>().map_err(|_| LoadError::Catalog {
                line: line_no,
                message: format!("invalid item id '{}'", fields[0]),
            })?;

            let year = fields.get(2).and_then(|d| parse_year(d));

            let genres = fields
                .iter()
                .skip(5)
                .zip(MOVIELENS_GENRES.iter())
                .filter(|(flag, _)| flag.trim() == "1")
                .map(|(_, name)| name.to_string())
                .collect();

            movies.push(Movie {
                item_id,
                title: fields[1].trim().to_string(),
                year,
                genres,
            });
        }

        Ok(Self::new(movies))
    }
}

impl Catalog for MovieCatalog {
    fn movie(&self, item_id: ItemId) -> Option<&Movie> {
        self.movies.get(&item_id)
    }
}

/// Trailing four digits of a date such as `01-Jan-1995`
fn parse_year(date: &str) -> Option<u16> {
    let date = date.trim();
    if date.len() < 4 {
        return None;
    }
    date.get(date.len() - 4..)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1|Toy Story (1995)|01-Jan-1995||http://us.imdb.com/M/title-exact?Toy%20Story%20(1995)|0|0|0|1|1|1|0|0|0|0|0|0|0|0|0|0|0|0|0\n\
2|GoldenEye (1995)|01-Jan-1995||http://us.imdb.com/M/title-exact?GoldenEye%20(1995)|0|1|1|0|0|0|0|0|0|0|0|0|0|0|0|0|1|0|0\n\
267|unknown||||1|0|0|0|0|0|0|0|0|0|0|0|0|0|0|0|0|0|0\n";

    #[test]
    fn test_parse_movielens_items() {
        let catalog = MovieCatalog::parse(SAMPLE).unwrap();

        assert_eq!(catalog.len(), 3);
        let toy_story = catalog.movie(1).unwrap();
        assert_eq!(toy_story.title, "Toy Story (1995)");
        assert_eq!(toy_story.year, Some(1995));
        assert_eq!(
            toy_story.genres,
            BTreeSet::from([
                "Animation".to_string(),
                "Children's".to_string(),
                "Comedy".to_string()
            ])
        );

        let goldeneye = catalog.genres(2).unwrap();
        assert!(goldeneye.contains("Action"));
        assert!(goldeneye.contains("Thriller"));

        assert_eq!(catalog.movie(267).unwrap().year, None);
    }

    #[test]
    fn test_invalid_id_rejected() {
        let err = MovieCatalog::parse("x|Broken|||").unwrap_err();
        assert!(matches!(err, LoadError::Catalog { line: 1, .. }));
    }

    #[test]
    fn test_title_lookup() {
        let catalog = MovieCatalog::parse(SAMPLE).unwrap();
        assert_eq!(catalog.title(2), Some("GoldenEye (1995)"));
        assert_eq!(catalog.title(999), None);
    }
}
