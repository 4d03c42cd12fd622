use std::sync::Arc;

use anyhow::{Context, Result};
use arboard::{Clipboard, ImageData};
use druid::kurbo::Line;
use druid::menu::MenuEventCtx;
use druid::piet::{FontFamily, PietImage, Text, TextLayout, TextLayoutBuilder};
use druid::{
    BoxConstraints, Color, Env, Event, EventCtx, KbKey, LayoutCtx, LifeCycle, LifeCycleCtx, Menu,
    MenuItem, PaintCtx, Point, Rect, RenderContext, Selector, Size, UpdateCtx, Widget,
};
use image::GenericImageView;
use rfd::MessageDialog;

use crate::extract::{self, CropRect};
use crate::gesture::Gesture;
use crate::layout::LayoutSnapshot;
use crate::overlay::{self, OverlayPlacement};
use crate::region::{Region, RegionStore};
use crate::AppState;

/// Commit the current store to the collaborator. The context menu and the
/// Enter key both land here.
pub const SAVE_REGIONS: Selector = Selector::new("pagesnip.save-regions");

// Widget implementation
pub struct RegionSelector {
    cached_image: Option<PietImage>,
    previous_rect: Option<Rect>,
    gesture: Gesture,
    on_commit: Box<dyn Fn(&[Region])>,
}

impl RegionSelector {
    pub fn new(on_commit: impl Fn(&[Region]) + 'static) -> Self {
        RegionSelector {
            cached_image: None,
            previous_rect: None,
            gesture: Gesture::Idle,
            on_commit: Box::new(on_commit),
        }
    }

    fn snapshot(&self, data: &AppState, container: Size) -> Option<LayoutSnapshot> {
        let page = data.page.as_ref()?;
        let (w, h) = page.dimensions();
        LayoutSnapshot::compute(Size::new(w as f64, h as f64), container)
    }

    fn placements(&self, data: &AppState, container: Size) -> Vec<OverlayPlacement> {
        match self.snapshot(data, container) {
            Some(layout) => overlay::placements(data.store.regions(), &layout),
            None => Vec::new(),
        }
    }

    /// Pointer-up: map the finished display rectangle into the page, extract
    /// the artifact, and append it. An extraction failure leaves the store
    /// as it was; the user just redraws the gesture.
    fn finish_gesture(&mut self, ctx: &mut EventCtx, data: &mut AppState) {
        self.previous_rect = None;
        let Some(display) = self.gesture.finish() else {
            ctx.request_paint();
            return;
        };
        let Some(page) = data.page.clone() else {
            log::debug!("selection finished before a page was loaded");
            return;
        };
        let Some(layout) = self.snapshot(data, ctx.size()) else {
            log::debug!("selection finished without a usable layout");
            return;
        };
        let (page_width, page_height) = page.dimensions();
        let crop = layout
            .to_natural(display)
            .and_then(|r| CropRect::from_natural(r, page_width, page_height));
        let Some(crop) = crop else {
            log::debug!("selection fell outside the page");
            ctx.request_paint();
            return;
        };
        match extract::extract(&page, &crop) {
            Ok(artifact) => {
                let id = Arc::make_mut(&mut data.store).append(
                    crop,
                    (page_width, page_height),
                    artifact,
                );
                log::debug!("region {id} appended: {crop:?}");
            }
            Err(e) => log::warn!("region extraction failed: {e:#}"),
        }
        ctx.request_paint();
    }

    fn commit(&self, data: &AppState) {
        let committed = data.store.commit(|regions| (self.on_commit)(regions));
        if !committed {
            MessageDialog::new()
                .set_title("pagesnip")
                .set_description("No regions selected yet. Drag a rectangle over the page first.")
                .show();
        }
    }
}

impl Widget<AppState> for RegionSelector {
    fn event(&mut self, ctx: &mut EventCtx, event: &Event, data: &mut AppState, _env: &Env) {
        match event {
            Event::WindowConnected => ctx.request_focus(),

            Event::MouseDown(e) if e.button.is_left() => {
                ctx.request_focus();
                let placements = self.placements(data, ctx.size());
                if let Some(id) = overlay::delete_target(&placements, e.pos) {
                    if Arc::make_mut(&mut data.store).remove(id) {
                        log::debug!("region {id} removed");
                    }
                    return;
                }
                if !data.select_mode {
                    return;
                }
                let Some(layout) = self.snapshot(data, ctx.size()) else {
                    log::debug!("pointer-down ignored: no page loaded");
                    return;
                };
                if layout.dest.contains(e.pos) {
                    self.gesture.begin(e.pos);
                    self.previous_rect = self.gesture.frame();
                    ctx.set_active(true);
                    ctx.request_paint();
                }
            }

            Event::MouseMove(e) if self.gesture.is_active() => {
                let old = self.previous_rect.or_else(|| self.gesture.frame());
                self.gesture.update(e.pos, ctx.size());
                let new = self.gesture.frame();
                self.previous_rect = new;
                if let (Some(old), Some(new)) = (old, new) {
                    ctx.request_paint_rect(old.union(new).inset(2.0));
                }
            }

            Event::MouseUp(e) if e.button.is_left() => {
                ctx.set_active(false);
                if self.gesture.is_active() {
                    self.finish_gesture(ctx, data);
                }
            }

            Event::MouseDown(e) if e.button.is_right() => {
                ctx.show_context_menu(make_context_menu(), e.pos);
            }

            Event::KeyDown(k) => match &k.key {
                KbKey::Escape => {
                    if self.gesture.is_active() {
                        self.gesture.cancel();
                        self.previous_rect = None;
                        ctx.set_active(false);
                        ctx.request_paint();
                    } else {
                        ctx.submit_command(druid::commands::CLOSE_WINDOW);
                    }
                }
                KbKey::Enter => self.commit(data),
                KbKey::Character(c) if c == "s" || c == "S" => {
                    data.select_mode = !data.select_mode;
                    log::debug!(
                        "selection mode {}",
                        if data.select_mode { "on" } else { "off" }
                    );
                }
                _ => {}
            },

            Event::Command(cmd) if cmd.is(SAVE_REGIONS) => self.commit(data),

            _ => {}
        }
    }

    fn lifecycle(
        &mut self,
        ctx: &mut LifeCycleCtx,
        event: &LifeCycle,
        _data: &AppState,
        _env: &Env,
    ) {
        if let LifeCycle::BuildFocusChain = event {
            ctx.register_for_focus();
        }
    }

    fn update(&mut self, ctx: &mut UpdateCtx, old: &AppState, data: &AppState, _env: &Env) {
        let page_changed = match (&old.page, &data.page) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        };
        if page_changed {
            // New page, new session: drop the raster cache and any drag in
            // flight. The store itself is reset by whoever loaded the page.
            self.cached_image = None;
            self.gesture.cancel();
            self.previous_rect = None;
            ctx.request_paint();
        } else if old.store != data.store || old.select_mode != data.select_mode {
            ctx.request_paint();
        }
    }

    fn layout(
        &mut self,
        _ctx: &mut LayoutCtx,
        bc: &BoxConstraints,
        data: &AppState,
        _env: &Env,
    ) -> Size {
        if bc.is_width_bounded() && bc.is_height_bounded() {
            bc.max()
        } else {
            let fallback = data
                .page
                .as_ref()
                .map(|p| {
                    let (w, h) = p.dimensions();
                    Size::new(w as f64, h as f64)
                })
                .unwrap_or_else(|| Size::new(800.0, 600.0));
            bc.constrain(fallback)
        }
    }

    fn paint(&mut self, ctx: &mut PaintCtx, data: &AppState, _env: &Env) {
        let size = ctx.size();
        ctx.fill(size.to_rect(), &Color::rgb8(0x24, 0x24, 0x28));

        let Some(page) = data.page.as_ref() else {
            paint_hint(
                ctx,
                "No page loaded. Right-click to open one.",
                Point::new(size.width / 2.0, size.height / 2.0),
            );
            return;
        };
        let Some(layout) = self.snapshot(data, size) else {
            return;
        };

        if self.cached_image.is_none() {
            let (w, h) = page.dimensions();
            let buf = page.to_rgba8();
            self.cached_image = ctx
                .make_image(
                    w as usize,
                    h as usize,
                    buf.as_raw(),
                    druid::piet::ImageFormat::RgbaSeparate,
                )
                .ok();
        }
        if let Some(img) = &self.cached_image {
            ctx.draw_image(img, layout.dest, druid::piet::InterpolationMode::Bilinear);
        }

        for placement in self.placements(data, size) {
            paint_overlay(ctx, &placement);
        }

        if let Some(frame) = self.gesture.frame() {
            ctx.fill(frame, &Color::rgba8(0xff, 0xff, 0xff, 0x28));
            ctx.stroke(frame, &Color::WHITE, 1.0);
        }

        if !data.select_mode {
            paint_hint(
                ctx,
                "selection off (press S)",
                Point::new(size.width / 2.0, size.height - 24.0),
            );
        }
    }
}

fn paint_overlay(ctx: &mut PaintCtx, placement: &OverlayPlacement) {
    ctx.fill(placement.frame, &overlay::fill_color(placement.color));
    ctx.stroke(placement.frame, &overlay::border_color(placement.color), 2.0);

    // Ordinal tag, top-left.
    if let Ok(label) = ctx
        .text()
        .new_text_layout(placement.ordinal.to_string())
        .font(FontFamily::SYSTEM_UI, 12.0)
        .text_color(Color::WHITE)
        .build()
    {
        let pad = 3.0;
        let tag = Rect::from_origin_size(
            Point::new(placement.frame.x0 + 2.0, placement.frame.y0 + 2.0),
            Size::new(label.size().width + pad * 2.0, label.size().height + pad),
        );
        ctx.fill(tag, &overlay::border_color(placement.color));
        ctx.draw_text(&label, Point::new(tag.x0 + pad, tag.y0 + pad / 2.0));
    }

    // Delete affordance, top-right.
    let del = placement.delete;
    ctx.fill(del, &Color::rgba8(0, 0, 0, 0xa0));
    ctx.stroke(del, &Color::WHITE, 1.0);
    let cross = del.inset(-4.0);
    ctx.stroke(
        Line::new((cross.x0, cross.y0), (cross.x1, cross.y1)),
        &Color::WHITE,
        1.5,
    );
    ctx.stroke(
        Line::new((cross.x0, cross.y1), (cross.x1, cross.y0)),
        &Color::WHITE,
        1.5,
    );
}

fn paint_hint(ctx: &mut PaintCtx, text: &str, center: Point) {
    if let Ok(layout) = ctx
        .text()
        .new_text_layout(text.to_string())
        .font(FontFamily::SYSTEM_UI, 14.0)
        .text_color(Color::rgb8(0x9a, 0x9a, 0xa0))
        .build()
    {
        let text_size = layout.size();
        ctx.draw_text(
            &layout,
            Point::new(
                center.x - text_size.width / 2.0,
                center.y - text_size.height / 2.0,
            ),
        );
    }
}

fn make_context_menu() -> Menu<AppState> {
    Menu::empty()
        .entry(
            MenuItem::new("Save regions").on_activate(
                |ctx: &mut MenuEventCtx, _data: &mut AppState, _| {
                    ctx.submit_command(SAVE_REGIONS);
                },
            ),
        )
        .entry(
            MenuItem::new("Copy last region").on_activate(|_ctx, data: &mut AppState, _| {
                let Some(region) = data.store.regions().last() else {
                    MessageDialog::new()
                        .set_title("pagesnip")
                        .set_description("No regions to copy.")
                        .show();
                    return;
                };
                match copy_region_to_clipboard(region) {
                    Ok(()) => log::info!("region {} copied to clipboard", region.id),
                    Err(e) => {
                        MessageDialog::new()
                            .set_title("pagesnip")
                            .set_description(format!("Copy failed: {e:#}"))
                            .show();
                    }
                }
            }),
        )
        .entry(
            MenuItem::new("Clear regions").on_activate(|_ctx, data: &mut AppState, _| {
                Arc::make_mut(&mut data.store).clear();
            }),
        )
        .entry(
            MenuItem::new("Open page…").on_activate(|_ctx, data: &mut AppState, _| {
                open_page(data);
            }),
        )
        .entry(
            MenuItem::new("Quit")
                .on_activate(|ctx, _, _| ctx.submit_command(druid::commands::QUIT_APP)),
        )
}

/// Replaces the current page and resets the region session for it.
fn open_page(data: &mut AppState) {
    let Some(path) = rfd::FileDialog::new()
        .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "webp"])
        .pick_file()
    else {
        return;
    };
    match image::open(&path) {
        Ok(img) => {
            log::info!(
                "opened page {} ({}x{})",
                path.display(),
                img.width(),
                img.height()
            );
            data.page = Some(Arc::new(img));
            data.store = Arc::new(RegionStore::new());
        }
        Err(e) => {
            MessageDialog::new()
                .set_title("pagesnip")
                .set_description(format!("Could not open {}: {e}", path.display()))
                .show();
        }
    }
}

/// Decodes a region's artifact and puts the raw pixels on the clipboard.
fn copy_region_to_clipboard(region: &Region) -> Result<()> {
    let bytes = extract::decode_artifact(&region.image_data)?;
    let decoded = image::load_from_memory(&bytes)
        .context("artifact did not decode")?
        .to_rgba8();
    let mut clipboard = Clipboard::new()?;
    clipboard.set_image(ImageData {
        width: decoded.width() as usize,
        height: decoded.height() as usize,
        bytes: decoded.as_raw().into(),
    })?;
    Ok(())
}
