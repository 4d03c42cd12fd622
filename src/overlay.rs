use druid::{Color, Point, Rect, Size};

use crate::layout::LayoutSnapshot;
use crate::region::{Region, RegionId};

/// Cyclic overlay palette, one visually distinct hue per ordinal.
pub const PALETTE: &[(u8, u8, u8)] = &[
    (255, 200, 100), // orange
    (100, 150, 255), // blue
    (100, 255, 150), // green
    (255, 100, 200), // pink
    (200, 100, 255), // purple
    (100, 255, 255), // cyan
];

/// Side of the square delete affordance, in display pixels.
pub const DELETE_BOX: f64 = 14.0;

pub fn color_index(position: usize) -> usize {
    position % PALETTE.len()
}

pub fn fill_color(index: usize) -> Color {
    let (r, g, b) = PALETTE[index % PALETTE.len()];
    Color::rgba8(r, g, b, 0x30)
}

pub fn border_color(index: usize) -> Color {
    let (r, g, b) = PALETTE[index % PALETTE.len()];
    Color::rgba8(r, g, b, 0xe6)
}

/// Everything the painter and the hit-tester need to know about one stored
/// region, re-derived from the live layout on every use.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlacement {
    pub id: RegionId,
    /// 1-based label shown to the user; always position + 1, so labels
    /// renumber when an earlier region is deleted.
    pub ordinal: usize,
    /// Palette index, also derived from position.
    pub color: usize,
    pub frame: Rect,
    pub delete: Rect,
}

/// Projects every stored region into display space. Each region goes
/// through the snapshot re-based on its own recorded page dimensions, which
/// keeps overlays registered even if the viewport changed after capture.
pub fn placements(regions: &[Region], layout: &LayoutSnapshot) -> Vec<OverlayPlacement> {
    regions
        .iter()
        .enumerate()
        .filter_map(|(i, region)| {
            let reference = Size::new(
                region.original_width as f64,
                region.original_height as f64,
            );
            let natural = Rect::new(
                region.crop.x as f64,
                region.crop.y as f64,
                (region.crop.x + region.crop.width) as f64,
                (region.crop.y + region.crop.height) as f64,
            );
            let frame = layout.rebase(reference)?.to_display(natural)?;
            Some(OverlayPlacement {
                id: region.id,
                ordinal: i + 1,
                color: color_index(i),
                frame,
                delete: delete_box(frame),
            })
        })
        .collect()
}

fn delete_box(frame: Rect) -> Rect {
    let x1 = frame.x1 - 2.0;
    let x0 = (x1 - DELETE_BOX).max(frame.x0);
    Rect::new(x0, frame.y0 + 2.0, x1, frame.y0 + 2.0 + DELETE_BOX)
}

/// Delete-affordance hit test. Overlays paint in store order, so the last
/// intersecting placement is the topmost; scanning in reverse makes it win
/// the click when two delete boxes overlap. Overlay bodies are
/// click-through: anywhere outside a delete box is free for a new gesture.
pub fn delete_target(placements: &[OverlayPlacement], pos: Point) -> Option<RegionId> {
    placements
        .iter()
        .rev()
        .find(|p| p.delete.contains(pos))
        .map(|p| p.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::CropRect;
    use crate::region::RegionStore;

    fn layout_half_scale() -> LayoutSnapshot {
        LayoutSnapshot::compute(Size::new(1000.0, 1500.0), Size::new(500.0, 750.0)).unwrap()
    }

    fn store_with_crops(crops: &[CropRect]) -> RegionStore {
        let mut store = RegionStore::new();
        for crop in crops {
            store.append(*crop, (1000, 1500), "data:image/jpeg;base64,QQ==".into());
        }
        store
    }

    #[test]
    fn placements_scale_stored_crops_into_display_space() {
        let store = store_with_crops(&[CropRect {
            x: 200,
            y: 200,
            width: 200,
            height: 200,
        }]);
        let placements = placements(store.regions(), &layout_half_scale());
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].ordinal, 1);
        assert_eq!(
            placements[0].frame,
            Rect::new(100.0, 100.0, 200.0, 200.0)
        );
    }

    #[test]
    fn ordinals_and_colors_shift_after_a_removal() {
        let crops: Vec<CropRect> = (0..3)
            .map(|i| CropRect {
                x: i * 100,
                y: 0,
                width: 80,
                height: 80,
            })
            .collect();
        let mut store = store_with_crops(&crops);
        let layout = layout_half_scale();

        let before = placements(store.regions(), &layout);
        assert_eq!(
            before.iter().map(|p| p.ordinal).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        // Delete the first region: the old second becomes ordinal 1 and
        // takes the first palette color.
        let first = before[0].id;
        assert!(store.remove(first));
        let after = placements(store.regions(), &layout);
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].ordinal, 1);
        assert_eq!(after[0].color, 0);
        assert_eq!(after[0].id, before[1].id);
    }

    #[test]
    fn colors_cycle_through_the_palette() {
        let crops: Vec<CropRect> = (0..PALETTE.len() as u32 + 2)
            .map(|i| CropRect {
                x: i,
                y: 0,
                width: 10,
                height: 10,
            })
            .collect();
        let store = store_with_crops(&crops);
        let placements = placements(store.regions(), &layout_half_scale());
        assert_eq!(placements[PALETTE.len()].color, 0);
        assert_eq!(placements[PALETTE.len() + 1].color, 1);
    }

    #[test]
    fn topmost_delete_box_wins_overlapping_clicks() {
        // Two overlapping crops whose delete boxes coincide.
        let shared = CropRect {
            x: 100,
            y: 100,
            width: 200,
            height: 200,
        };
        let store = store_with_crops(&[shared, shared]);
        let all = placements(store.regions(), &layout_half_scale());
        let hit = Point::new(
            all[1].delete.center().x,
            all[1].delete.center().y,
        );
        assert_eq!(delete_target(&all, hit), Some(all[1].id));
    }

    #[test]
    fn clicks_outside_delete_boxes_hit_nothing() {
        let store = store_with_crops(&[CropRect {
            x: 100,
            y: 100,
            width: 200,
            height: 200,
        }]);
        let all = placements(store.regions(), &layout_half_scale());
        // Center of the overlay body: click-through.
        assert_eq!(delete_target(&all, all[0].frame.center()), None);
    }

    #[test]
    fn delete_box_hugs_the_frame_top_right() {
        let store = store_with_crops(&[CropRect {
            x: 0,
            y: 0,
            width: 400,
            height: 400,
        }]);
        let all = placements(store.regions(), &layout_half_scale());
        let frame = all[0].frame;
        let delete = all[0].delete;
        assert!(delete.x1 <= frame.x1);
        assert!(delete.y0 >= frame.y0);
        assert!((delete.width() - DELETE_BOX).abs() < 1e-9);
    }
}
