//! Pagination: split the grid into fixed-capacity pages.

use crate::pipeline::render::GridItem;

/// One page worth of grid items.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    /// 0-based page index.
    pub index: usize,
    pub items: &'a [GridItem],
}

impl Page<'_> {
    /// 1-based page number as shown to the user.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Number of pages needed for `items` at `capacity` per page (`ceil(items / capacity)`).
pub fn page_count(items: usize, capacity: usize) -> usize {
    items.div_ceil(capacity.max(1))
}

/// Iterate the pages of `items`: page `i` holds `items[i*capacity .. i*capacity + capacity]`.
pub fn paginate(items: &[GridItem], capacity: usize) -> impl Iterator<Item = Page<'_>> {
    items
        .chunks(capacity.max(1))
        .enumerate()
        .map(|(index, items)| Page { index, items })
}

/// Progress percentage after `done` of `total` pages, rounded to the nearest integer.
pub fn percent_complete(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncoderStyle;
    use crate::pipeline::encode::Symbol;
    use std::sync::Arc;

    fn items(n: usize) -> Vec<GridItem> {
        let symbol = Arc::new(Symbol::from_modules(1, vec![true], EncoderStyle::grid()).unwrap());
        (1..=n)
            .map(|index| GridItem {
                index,
                label: index.to_string(),
                symbol: Arc::clone(&symbol),
            })
            .collect()
    }

    #[test]
    fn page_count_boundaries() {
        assert_eq!(page_count(0, 50), 0);
        assert_eq!(page_count(1, 50), 1);
        assert_eq!(page_count(50, 50), 1);
        assert_eq!(page_count(51, 50), 2);
        assert_eq!(page_count(120, 50), 3);
    }

    #[test]
    fn pages_of_120_items() {
        let grid = items(120);
        let sizes: Vec<usize> = paginate(&grid, 50).map(|p| p.len()).collect();
        assert_eq!(sizes, [50, 50, 20]);
    }

    #[test]
    fn every_item_lands_once_in_order() {
        for n in [0, 1, 49, 50, 51, 99, 100, 101, 257] {
            let grid = items(n);
            let pages: Vec<Page<'_>> = paginate(&grid, 50).collect();
            assert_eq!(pages.len(), page_count(n, 50), "n = {n}");

            let flattened: Vec<usize> = pages
                .iter()
                .flat_map(|p| p.items.iter().map(|i| i.index))
                .collect();
            assert_eq!(flattened, (1..=n).collect::<Vec<_>>(), "n = {n}");
            assert!(pages.iter().all(|p| !p.is_empty() && p.len() <= 50));
        }
    }

    #[test]
    fn page_numbers_are_one_based() {
        let grid = items(51);
        let numbers: Vec<usize> = paginate(&grid, 50).map(|p| p.number()).collect();
        assert_eq!(numbers, [1, 2]);
    }

    #[test]
    fn zero_capacity_is_treated_as_one() {
        let grid = items(3);
        assert_eq!(paginate(&grid, 0).count(), 3);
        assert_eq!(page_count(3, 0), 3);
    }

    #[test]
    fn percent_rounding() {
        assert_eq!(percent_complete(1, 3), 33);
        assert_eq!(percent_complete(2, 3), 67);
        assert_eq!(percent_complete(3, 3), 100);
        assert_eq!(percent_complete(0, 0), 100);
    }
}
