//! Deterministic demo places for local development without a SerpAPI key.

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::{Place, PlacePage, PlaceSource};

const STREETS: &[&str] = &[
    "Rua das Flores",
    "Av. Brasil",
    "Rua São Paulo",
    "Av. Paulista",
    "Rua Augusta",
];

const PLACES_PER_PAGE: u32 = 20;
const PAGES: u32 = 3;

/// Serves `PAGES` pages of synthetic places. The same query and page always
/// produce the same places, so repeated demo searches exercise dedup.
#[derive(Debug, Clone, Default)]
pub struct DemoSource;

impl DemoSource {
    fn place(query: &str, n: u32) -> Place {
        // Multiplicative hash of the index; stable across runs.
        let seed = n.wrapping_mul(2_654_435_761) ^ query.len() as u32;
        let pick = |salt: u32, modulo: u32| (seed.wrapping_add(salt.wrapping_mul(40_503)) >> 7) % modulo;

        let category = match pick(1, 3) {
            0 => query.to_string(),
            1 => format!("{query} Premium"),
            _ => format!("{query} Express"),
        };

        Place {
            title: Some(format!("{query} #{}", n + 1)),
            address: Some(format!(
                "{}, {}",
                STREETS[pick(2, STREETS.len() as u32) as usize],
                100 + pick(3, 1900)
            )),
            phone: Some(format!("(11) 9{:04}-{:04}", 1000 + pick(4, 9000), 1000 + pick(5, 9000))),
            website: (pick(6, 2) == 0).then(|| format!("https://www.empresa{}.com.br", n + 1)),
            email: (pick(7, 5) < 3).then(|| format!("contato{}@empresa.com.br", n + 1)),
            rating: Some(3.0 + f64::from(pick(8, 21)) / 10.0),
            reviews: Some(i64::from(10 + pick(9, 490))),
            place_type: Some(category),
        }
    }
}

#[async_trait]
impl PlaceSource for DemoSource {
    async fn search(&self, query: &str, page: u32) -> Result<PlacePage> {
        if page >= PAGES {
            return Ok(PlacePage::default());
        }
        let start = page * PLACES_PER_PAGE;
        Ok(PlacePage {
            places: (start..start + PLACES_PER_PAGE)
                .map(|n| Self::place(query, n))
                .collect(),
            has_more: page + 1 < PAGES,
        })
    }

    fn is_live(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pages_are_stable_and_finite() {
        let demo = DemoSource;
        let a = demo.search("Pizzarias em São Paulo", 0).await.unwrap();
        let b = demo.search("Pizzarias em São Paulo", 0).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.places.len(), 20);
        assert!(a.has_more);

        let last = demo.search("Pizzarias em São Paulo", PAGES - 1).await.unwrap();
        assert!(!last.has_more);
        assert!(demo.search("Pizzarias em São Paulo", PAGES).await.unwrap().places.is_empty());
    }

    #[tokio::test]
    async fn ratings_stay_in_range() {
        let page = DemoSource.search("Padarias", 1).await.unwrap();
        assert!(page
            .places
            .iter()
            .filter_map(|p| p.rating)
            .all(|r| (3.0..=5.0).contains(&r)));
    }
}
