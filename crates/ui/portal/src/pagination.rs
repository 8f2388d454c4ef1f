use pki_api::Paged;

/// Page sizes offered by the admin request list.
pub const PAGE_SIZES: [u32; 3] = [5, 10, 25];

/// Zero-based paging state that never points outside `[0, total_pages - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: u32,
    size: u32,
    total: u64,
}

impl Pager {
    pub fn new(size: u32) -> Self {
        Self {
            page: 0,
            size: size.max(1),
            total: 0,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn total_pages(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.size));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    /// Moves forward. Returns whether the page changed.
    pub fn next(&mut self) -> bool {
        if self.page + 1 < self.total_pages() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Changing the size always goes back to the first page.
    pub fn set_size(&mut self, size: u32) {
        self.size = size.max(1);
        self.page = 0;
    }

    /// Steps through [`PAGE_SIZES`], wrapping around.
    pub fn cycle_size(&mut self) {
        let next = PAGE_SIZES
            .iter()
            .position(|s| *s == self.size)
            .map(|i| PAGE_SIZES[(i + 1) % PAGE_SIZES.len()])
            .unwrap_or(PAGE_SIZES[0]);
        self.set_size(next);
    }

    pub fn reset(&mut self) {
        self.page = 0;
    }

    /// Takes the total from a fetched page and clamps the current index.
    /// Returns `true` when the index had to move, meaning the caller should
    /// fetch again.
    pub fn absorb<T>(&mut self, paged: &Paged<T>) -> bool {
        self.total = paged.total;
        let last = self.total_pages() - 1;
        if self.page > last {
            self.page = last;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paged(total: u64) -> Paged<()> {
        Paged {
            items: Vec::new(),
            total,
            page: 0,
            size: 10,
            total_pages: 0,
        }
    }

    #[test]
    fn empty_list_has_one_page() {
        let pager = Pager::new(10);
        assert_eq!(pager.total_pages(), 1);
    }

    #[test]
    fn navigation_stays_in_range() {
        let mut pager = Pager::new(10);
        pager.absorb(&paged(25));
        assert_eq!(pager.total_pages(), 3);
        assert!(!pager.prev());
        assert!(pager.next());
        assert!(pager.next());
        assert!(!pager.next());
        assert_eq!(pager.page(), 2);
    }

    #[test]
    fn size_change_resets_to_first_page() {
        let mut pager = Pager::new(5);
        pager.absorb(&paged(30));
        pager.next();
        pager.next();
        pager.set_size(25);
        assert_eq!(pager.page(), 0);
        assert_eq!(pager.size(), 25);
    }

    #[test]
    fn shrinking_total_clamps_page() {
        let mut pager = Pager::new(10);
        pager.absorb(&paged(41));
        for _ in 0..4 {
            pager.next();
        }
        assert_eq!(pager.page(), 4);
        assert!(pager.absorb(&paged(11)));
        assert_eq!(pager.page(), 1);
        assert!(!pager.absorb(&paged(11)));
    }

    #[test]
    fn sizes_cycle() {
        let mut pager = Pager::new(10);
        pager.cycle_size();
        assert_eq!(pager.size(), 25);
        pager.cycle_size();
        assert_eq!(pager.size(), 5);
        let mut odd = Pager::new(20);
        odd.cycle_size();
        assert_eq!(odd.size(), 5);
    }
}
