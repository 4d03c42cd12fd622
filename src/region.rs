use crate::extract::CropRect;

pub type RegionId = u64;

/// A committed rectangular clip of the source page: its natural-space
/// coordinates, the page dimensions they were taken against, and the encoded
/// artifact itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: RegionId,
    pub crop: CropRect,
    pub original_width: u32,
    pub original_height: u32,
    /// Self-describing `data:image/jpeg;base64,...` payload. Stays decodable
    /// after the source page is dropped or replaced.
    pub image_data: String,
}

/// Ordered regions for one page session. Insertion order is display order:
/// a region's user-facing ordinal is its current position plus one, so
/// deleting an entry renumbers everything after it while ids stay put.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionStore {
    regions: Vec<Region>,
    next_id: RegionId,
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a freshly extracted region and returns its id. Ids come from
    /// a monotonic counter and are never reused, even across removals.
    pub fn append(
        &mut self,
        crop: CropRect,
        original: (u32, u32),
        image_data: String,
    ) -> RegionId {
        self.next_id += 1;
        let id = self.next_id;
        self.regions.push(Region {
            id,
            crop,
            original_width: original.0,
            original_height: original.1,
            image_data,
        });
        id
    }

    /// Removes the region with `id`, if present. Later regions keep their
    /// ids but shift down one ordinal.
    pub fn remove(&mut self, id: RegionId) -> bool {
        let before = self.regions.len();
        self.regions.retain(|r| r.id != id);
        self.regions.len() != before
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Hands the full contents to the collaborator. Returns `false` without
    /// invoking the callback when the store is empty, so the caller can warn
    /// the user instead.
    pub fn commit<F: FnOnce(&[Region])>(&self, callback: F) -> bool {
        if self.regions.is_empty() {
            return false;
        }
        callback(&self.regions);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crop(x: u32, y: u32) -> CropRect {
        CropRect {
            x,
            y,
            width: 50,
            height: 40,
        }
    }

    fn store_with(n: usize) -> RegionStore {
        let mut store = RegionStore::new();
        for i in 0..n {
            store.append(
                crop(i as u32 * 10, 0),
                (1000, 1500),
                format!("data:image/jpeg;base64,QUJD{i}"),
            );
        }
        store
    }

    #[test]
    fn append_assigns_sequential_unique_ids() {
        let store = store_with(3);
        let ids: Vec<_> = store.regions().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn remove_shifts_later_positions_but_not_ids() {
        let mut store = store_with(3);
        assert!(store.remove(2));
        assert_eq!(store.len(), 2);
        let ids: Vec<_> = store.regions().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
        // The old third region now sits at position 1 (ordinal 2).
        assert_eq!(store.regions()[1].crop, crop(20, 0));
    }

    #[test]
    fn remove_unknown_id_is_a_noop() {
        let mut store = store_with(2);
        assert!(!store.remove(99));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut store = store_with(2);
        store.remove(2);
        let id = store.append(crop(70, 0), (1000, 1500), "data:image/jpeg;base64,QQ==".into());
        assert_eq!(id, 3);
    }

    #[test]
    fn clear_empties_the_store() {
        let mut store = store_with(3);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn commit_on_empty_store_never_invokes_callback() {
        let store = RegionStore::new();
        let mut called = false;
        assert!(!store.commit(|_| called = true));
        assert!(!called);
    }

    #[test]
    fn commit_hands_over_every_region_exactly_once() {
        let store = store_with(4);
        let mut calls = 0;
        let committed = store.commit(|regions| {
            calls += 1;
            assert_eq!(regions.len(), 4);
            for region in regions {
                assert!(region.crop.width > 0 && region.crop.height > 0);
                assert!(region.crop.x + region.crop.width <= region.original_width);
                assert!(region.crop.y + region.crop.height <= region.original_height);
                assert!(region.image_data.starts_with("data:image/jpeg;base64,"));
            }
        });
        assert!(committed);
        assert_eq!(calls, 1);
    }
}
