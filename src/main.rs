#![windows_subsystem = "windows"]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use druid::{AppLauncher, Data, WindowDesc};
use image::{DynamicImage, GenericImageView};
use rfd::MessageDialog;

mod extract;
mod gesture;
mod layout;
mod overlay;
mod region;
mod selector;

use region::{Region, RegionStore};
use selector::RegionSelector;

/// Shared application state: the loaded page, the committed regions for the
/// current session, and whether pointer gestures start selections.
#[derive(Clone, Data)]
pub struct AppState {
    #[data(same_fn = "PartialEq::eq")]
    pub page: Option<Arc<DynamicImage>>,
    #[data(same_fn = "PartialEq::eq")]
    pub store: Arc<RegionStore>,
    pub select_mode: bool,
}

/// The collaborator end of the commit callback: decodes each artifact from
/// its data URI and writes it into a user-picked folder.
fn save_regions(regions: &[Region]) {
    let Some(dir) = rfd::FileDialog::new()
        .set_title("Folder for region images")
        .pick_folder()
    else {
        log::info!("save cancelled");
        return;
    };
    let mut saved = 0usize;
    for (i, region) in regions.iter().enumerate() {
        let path = dir.join(format!("region-{:02}.jpg", i + 1));
        let written = extract::decode_artifact(&region.image_data)
            .and_then(|bytes| std::fs::write(&path, bytes).map_err(Into::into));
        match written {
            Ok(()) => saved += 1,
            Err(e) => log::warn!("could not write {}: {e:#}", path.display()),
        }
    }
    MessageDialog::new()
        .set_title("pagesnip")
        .set_description(format!("Saved {saved} of {} region images", regions.len()))
        .show();
}

fn load_initial_page() -> Option<DynamicImage> {
    let path = std::env::args_os().nth(1).map(PathBuf::from).or_else(|| {
        rfd::FileDialog::new()
            .set_title("Pick a page image")
            .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "webp"])
            .pick_file()
    })?;
    match image::open(&path) {
        Ok(img) => {
            log::info!(
                "loaded page {} ({}x{})",
                path.display(),
                img.width(),
                img.height()
            );
            Some(img)
        }
        Err(e) => {
            MessageDialog::new()
                .set_title("pagesnip")
                .set_description(format!("Could not open {}: {e}", path.display()))
                .show();
            None
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let page = load_initial_page().map(Arc::new);

    // Size the window so large pages come up scaled down; the selector maps
    // display coordinates back to full-resolution pixels either way.
    let window_size = page
        .as_ref()
        .map(|p| {
            let (w, h) = p.dimensions();
            let scale = (1100.0 / w as f64).min(800.0 / h as f64).min(1.0);
            (w as f64 * scale, h as f64 * scale)
        })
        .unwrap_or((900.0, 700.0));

    let state = AppState {
        page,
        store: Arc::new(RegionStore::new()),
        select_mode: true,
    };

    let window = WindowDesc::new(RegionSelector::new(save_regions))
        .title("pagesnip")
        .window_size(window_size);
    AppLauncher::with_window(window).launch(state)?;
    Ok(())
}
