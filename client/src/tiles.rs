#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use js_sys::Reflect;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

use crate::viewport::{MAX_ZOOM, TILE_SIZE, Viewport};

pub const TILE_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const ATTRIBUTION: &str = "© OpenStreetMap contributors";

const MAX_CONCURRENCY: usize = 6;
/// Loaded tiles kept around for coarser-zoom fallback while panning.
const MAX_CACHED_TILES: usize = 384;
const ONLOAD_HANDLE_KEY: &str = "__opportunityTileOnload";
const ONERROR_HANDLE_KEY: &str = "__opportunityTileOnerror";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub fn url(&self) -> String {
        TILE_URL_TEMPLATE
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }

    /// World-coordinate rectangle `(x, y, size)` covered by this tile.
    pub fn world_rect(&self) -> (f64, f64, f64) {
        let size = TILE_SIZE / 2f64.powi(self.z as i32);
        (self.x as f64 * size, self.y as f64 * size, size)
    }
}

/// A decoded tile image.
#[derive(Clone)]
pub struct LoadedTile {
    pub id: TileId,
    pub image: HtmlImageElement,
}

/// Integer tile zoom for a viewport.
pub fn tile_zoom(vp: &Viewport) -> u8 {
    vp.zoom().round().clamp(0.0, MAX_ZOOM) as u8
}

/// Tiles covering the visible area, nearest to the view center first.
pub fn visible_tiles(vp: &Viewport, canvas_w: f64, canvas_h: f64) -> Vec<TileId> {
    if canvas_w <= 0.0 || canvas_h <= 0.0 {
        return Vec::new();
    }
    let z = tile_zoom(vp);
    let n = 1u32 << z;
    let size = TILE_SIZE / n as f64;

    let (wx0, wy0) = vp.screen_to_world(0.0, 0.0);
    let (wx1, wy1) = vp.screen_to_world(canvas_w, canvas_h);
    let clamp = |v: f64| (v / size).floor().clamp(0.0, (n - 1) as f64) as u32;
    let (x0, x1) = (clamp(wx0), clamp(wx1));
    let (y0, y1) = (clamp(wy0), clamp(wy1));

    let (cx, cy) = vp.screen_to_world(canvas_w / 2.0, canvas_h / 2.0);
    let mut tiles: Vec<TileId> = (y0..=y1)
        .flat_map(|y| (x0..=x1).map(move |x| TileId { z, x, y }))
        .collect();
    tiles.sort_by(|a, b| {
        distance_sq(a, cx, cy)
            .total_cmp(&distance_sq(b, cx, cy))
            .then_with(|| (a.y, a.x).cmp(&(b.y, b.x)))
    });
    tiles
}

fn distance_sq(tile: &TileId, cx: f64, cy: f64) -> f64 {
    let (x, y, size) = tile.world_rect();
    let dx = x + size / 2.0 - cx;
    let dy = y + size / 2.0 - cy;
    dx * dx + dy * dy
}

/// Concurrency-limited OSM tile loader feeding `tiles_signal`.
#[derive(Clone)]
pub struct TileLoader {
    tiles_signal: RwSignal<Vec<LoadedTile>>,
    queue: Rc<RefCell<VecDeque<TileId>>>,
    requested: Rc<RefCell<HashSet<TileId>>>,
    in_flight: Rc<Cell<usize>>,
}

impl TileLoader {
    pub fn new(tiles_signal: RwSignal<Vec<LoadedTile>>) -> Self {
        Self {
            tiles_signal,
            queue: Rc::new(RefCell::new(VecDeque::new())),
            requested: Rc::new(RefCell::new(HashSet::new())),
            in_flight: Rc::new(Cell::new(0)),
        }
    }

    /// Replace the pending queue with the tiles needed for the current view.
    /// Tiles already loaded or in flight are skipped.
    pub fn request(&self, wanted: Vec<TileId>) {
        {
            let requested = self.requested.borrow();
            let mut queue = self.queue.borrow_mut();
            queue.clear();
            queue.extend(wanted.into_iter().filter(|id| !requested.contains(id)));
        }
        self.pump();
    }

    fn pump(&self) {
        while self.in_flight.get() < MAX_CONCURRENCY {
            let Some(id) = self.queue.borrow_mut().pop_front() else {
                break;
            };
            if !self.requested.borrow_mut().insert(id) {
                continue;
            }
            self.in_flight.set(self.in_flight.get() + 1);
            self.load(id);
        }
    }

    fn finish(&self, id: TileId, image: Option<HtmlImageElement>) {
        self.in_flight.set(self.in_flight.get().saturating_sub(1));
        match image {
            Some(image) => self.insert(LoadedTile { id, image }),
            // Allow a retry the next time the tile becomes visible
            None => {
                self.requested.borrow_mut().remove(&id);
            }
        }
        self.pump();
    }

    fn insert(&self, tile: LoadedTile) {
        let mut evicted = Vec::new();
        self.tiles_signal.update(|loaded| {
            loaded.retain(|existing| existing.id != tile.id);
            loaded.push(tile);
            if loaded.len() > MAX_CACHED_TILES {
                let excess = loaded.len() - MAX_CACHED_TILES;
                evicted.extend(loaded.drain(..excess).map(|t| t.id));
            }
        });
        let mut requested = self.requested.borrow_mut();
        for id in evicted {
            requested.remove(&id);
        }
    }

    fn load(&self, id: TileId) {
        let img = match HtmlImageElement::new() {
            Ok(img) => img,
            Err(_) => {
                self.finish(id, None);
                return;
            }
        };
        img.set_cross_origin(Some("anonymous"));

        let loader = self.clone();
        let img_for_load = img.clone();
        let onload = Closure::<dyn FnMut()>::new(move || {
            clear_image_handlers(&img_for_load);
            let img_for_decode = img_for_load.clone();
            let loader = loader.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let _ = JsFuture::from(img_for_decode.decode()).await;
                loader.finish(id, Some(img_for_decode));
            });
        });

        let loader = self.clone();
        let img_for_error = img.clone();
        let onerror = Closure::<dyn FnMut()>::new(move || {
            clear_image_handlers(&img_for_error);
            loader.finish(id, None);
        });

        let onload_js = onload.into_js_value();
        let onerror_js = onerror.into_js_value();
        img.set_onload(Some(onload_js.unchecked_ref()));
        img.set_onerror(Some(onerror_js.unchecked_ref()));
        let _ = Reflect::set(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY), &onload_js);
        let _ = Reflect::set(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY), &onerror_js);
        img.set_src(&id.url());
    }
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_url_follows_template() {
        let id = TileId { z: 11, x: 1614, y: 1015 };
        assert_eq!(id.url(), "https://tile.openstreetmap.org/11/1614/1015.png");
    }

    #[test]
    fn visible_tiles_cover_singapore_at_initial_zoom() {
        let mut vp = Viewport::default();
        vp.center_on(103.8198, 1.3521, 11.0, 512.0, 512.0);
        let tiles = visible_tiles(&vp, 512.0, 512.0);

        assert!(tiles.iter().all(|t| t.z == 11));
        // 512px view at 256px tiles spans 2-3 tiles per axis
        assert!((4..=9).contains(&tiles.len()));
        // Nearest tile first contains the center
        let (cx, cy) = crate::viewport::project(103.8198, 1.3521);
        let (x, y, size) = tiles[0].world_rect();
        assert!(cx >= x && cx <= x + size && cy >= y && cy <= y + size);
    }

    #[test]
    fn visible_tiles_clamp_to_world() {
        let vp = Viewport {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 4.0,
        };
        let tiles = visible_tiles(&vp, 4000.0, 4000.0);
        assert_eq!(tiles.len(), 16);
        assert!(tiles.iter().all(|t| t.x < 4 && t.y < 4));
        assert!(visible_tiles(&vp, 0.0, 100.0).is_empty());
    }
}
