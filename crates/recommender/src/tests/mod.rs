//! Module tests over a shared MovieLens-style fixture

mod explanation_test;
mod snapshot_test;

use crate::catalog::{Movie, MovieCatalog};
use crate::model::{FactorModel, FactorModelBuilder};
use crate::types::ItemId;

/// Six items, three users with factors, one user with history only (4).
///
/// Popularity: 10 -> 3, 11 -> 1, 12 -> 1, 13 -> 3, 14 -> 2, 15 -> 0
pub(crate) fn fixture_model() -> FactorModel {
    FactorModelBuilder::new(2)
        .global_mean(3.0)
        .user(1, 0.2, vec![1.0, 0.0])
        .user(2, -0.3, vec![0.5, 0.5])
        .user(3, 0.0, vec![0.0, 1.0])
        .item(10, -0.1, vec![0.5, 2.0])
        .item(11, 0.3, vec![1.0, -0.5])
        .item(12, 0.1, vec![0.2, 0.4])
        .item(13, -0.4, vec![1.5, 0.0])
        .item(14, 0.0, vec![-1.0, 1.0])
        .item(15, 0.5, vec![0.0, 0.0])
        .ratings([
            (1, 10, 4.0),
            (1, 11, 5.0),
            (2, 10, 3.0),
            (2, 12, 4.0),
            (2, 13, 2.0),
            (2, 14, 4.5),
            (3, 10, 5.0),
            (3, 13, 3.5),
            (3, 14, 1.0),
            (4, 13, 4.0),
        ])
        .convergence_delta(Some(0.0004))
        .build()
        .unwrap()
}

pub(crate) fn fixture_catalog() -> MovieCatalog {
    let movie = |item_id: ItemId, title: &str, year: u16, genres: &[&str]| Movie {
        item_id,
        title: title.to_string(),
        year: Some(year),
        genres: genres.iter().map(|g| g.to_string()).collect(),
    };
    MovieCatalog::new(vec![
        movie(10, "Star Wars (1977)", 1977, &["Action", "Adventure", "Sci-Fi"]),
        movie(11, "Contact (1997)", 1997, &["Drama", "Sci-Fi"]),
        movie(12, "Fargo (1996)", 1996, &["Crime", "Drama", "Thriller"]),
        movie(13, "Return of the Jedi (1983)", 1983, &["Action", "Adventure", "Sci-Fi", "War"]),
        movie(14, "Liar Liar (1997)", 1997, &["Comedy"]),
        movie(15, "Kolya (1996)", 1996, &["Comedy"]),
    ])
}
