use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use geo::LineString;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, CanvasWindingRule, HtmlCanvasElement, MouseEvent, PointerEvent,
    WheelEvent,
};

use opportunity_shared::format::tooltip_lines;
use opportunity_shared::{RegionKey, RegionRef};

use crate::colors::score_fill_css;
use crate::render_loop::RenderScheduler;
use crate::spatial::SpatialGrid;
use crate::tiles::{LoadedTile, TileLoader, tile_zoom, visible_tiles};
use crate::viewport::Viewport;

const BACKGROUND: &str = "#e8e6df";
const FILL_ALPHA: f64 = 0.6;
/// Coarser tile levels still drawn underneath while finer tiles load.
const TILE_FALLBACK_LEVELS: u8 = 3;
/// Pointer travel (CSS px) below which a press counts as a click rather than a drag.
const CLICK_SLOP_PX: f64 = 5.0;

/// Stroke applied to a region outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub weight: f64,
    pub color: &'static str,
}

pub const BASE_STYLE: StrokeStyle = StrokeStyle {
    weight: 1.2,
    color: "#333",
};
pub const SELECTED_STYLE: StrokeStyle = StrokeStyle {
    weight: 3.0,
    color: "#000",
};
pub const HOVER_STYLE: StrokeStyle = StrokeStyle {
    weight: 2.0,
    color: "#000",
};

/// Style for a region given the current selection. Hover wins over selection.
pub fn style_for(region: &RegionRef, selected: Option<&RegionKey>, hovered: bool) -> StrokeStyle {
    if hovered {
        return HOVER_STYLE;
    }
    match (region.key(), selected) {
        (Some(key), Some(selected)) if &key == selected => SELECTED_STYLE,
        _ => BASE_STYLE,
    }
}

fn is_same(a: &RegionRef, b: &RegionRef) -> bool {
    Arc::ptr_eq(a, b)
}

struct Frame<'a> {
    ctx: &'a CanvasRenderingContext2d,
    vp: &'a Viewport,
    width: f64,
    height: f64,
}

impl Frame<'_> {
    fn clear(&self) {
        self.ctx.set_fill_style_str(BACKGROUND);
        self.ctx.fill_rect(0.0, 0.0, self.width, self.height);
    }

    fn draw_tiles(&self, tiles: &[LoadedTile]) {
        let zoom = tile_zoom(self.vp);
        let mut drawable: Vec<&LoadedTile> = tiles
            .iter()
            .filter(|tile| tile.id.z <= zoom && tile.id.z + TILE_FALLBACK_LEVELS >= zoom)
            .collect();
        // Coarse levels first so finer tiles paint over them
        drawable.sort_by_key(|tile| tile.id.z);

        for tile in drawable {
            let (wx, wy, size) = tile.id.world_rect();
            let (sx, sy) = self.vp.world_to_screen(wx, wy);
            let side = size * self.vp.scale;
            if sx + side < 0.0 || sy + side < 0.0 || sx > self.width || sy > self.height {
                continue;
            }
            self.ctx
                .draw_image_with_html_image_element_and_dw_and_dh(&tile.image, sx, sy, side, side)
                .ok();
        }
    }

    fn trace_ring(&self, ring: &LineString<f64>) {
        let mut coords = ring.coords();
        let Some(first) = coords.next() else {
            return;
        };
        let (x, y) = self.vp.lonlat_to_screen(first.x, first.y);
        self.ctx.move_to(x, y);
        for c in coords {
            let (x, y) = self.vp.lonlat_to_screen(c.x, c.y);
            self.ctx.line_to(x, y);
        }
        self.ctx.close_path();
    }

    fn draw_region(&self, region: &RegionRef, style: StrokeStyle, shade: bool) {
        if region.geometry.0.is_empty() {
            return;
        }
        self.ctx.begin_path();
        for polygon in &region.geometry.0 {
            self.trace_ring(polygon.exterior());
            for hole in polygon.interiors() {
                self.trace_ring(hole);
            }
        }
        if shade {
            self.ctx
                .set_fill_style_str(&score_fill_css(region.score(), FILL_ALPHA));
            self.ctx.fill_with_canvas_winding_rule(CanvasWindingRule::Evenodd);
        }
        self.ctx.set_stroke_style_str(style.color);
        self.ctx.set_line_width(style.weight);
        self.ctx.stroke();
    }
}

/// Canvas overlay: OSM tiles underneath, region outlines on top. Hovering shows a
/// tooltip and raises the region; clicking emits it through `on_click`.
#[component]
pub fn RegionOverlay(
    regions: Signal<Vec<RegionRef>>,
    viewport: RwSignal<Viewport>,
    canvas_size: RwSignal<(f64, f64)>,
    selected: Signal<Option<RegionKey>>,
    shade_by_score: RwSignal<bool>,
    on_click: Callback<RegionRef>,
) -> impl IntoView {
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let hovered: RwSignal<Option<RegionRef>> = RwSignal::new(None);
    let mouse_pos: RwSignal<(f64, f64)> = RwSignal::new((0.0, 0.0));
    let loaded_tiles: RwSignal<Vec<LoadedTile>> = RwSignal::new(Vec::new());
    let tile_loader = TileLoader::new(loaded_tiles);

    let grid = Rc::new(RefCell::new(SpatialGrid::empty()));
    let grid_for_move = grid.clone();
    let grid_for_click = grid.clone();

    // Drag state
    let is_dragging = Rc::new(Cell::new(false));
    let drag_start = Rc::new(Cell::new((0.0f64, 0.0f64)));
    let last_pos = Rc::new(Cell::new((0.0f64, 0.0f64)));

    // Rebuild hit-testing grid whenever the drawn set changes
    Effect::new({
        let grid = grid.clone();
        move || {
            regions.with(|r| *grid.borrow_mut() = SpatialGrid::build(r));
            hovered.set(None);
        }
    });

    Effect::new(move || {
        let vp = viewport.get();
        let (w, h) = canvas_size.get();
        tile_loader.request(visible_tiles(&vp, w, h));
    });

    let scheduler = Rc::new(RenderScheduler::new(move || {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas;
        let Some(parent) = canvas.parent_element() else {
            return;
        };
        let w = parent.client_width() as f64;
        let h = parent.client_height() as f64;
        if w <= 0.0 || h <= 0.0 {
            return;
        }

        let dpr = web_sys::window()
            .map(|win| win.device_pixel_ratio())
            .unwrap_or(1.0);
        let pw = (w * dpr).round().max(1.0) as u32;
        let ph = (h * dpr).round().max(1.0) as u32;
        if canvas.width() != pw || canvas.height() != ph {
            canvas.set_width(pw);
            canvas.set_height(ph);
        }
        if canvas_size.get_untracked() != (w, h) {
            canvas_size.set((w, h));
        }

        let Some(ctx) = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
        else {
            return;
        };
        // All drawing stays in CSS pixel coords
        ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();
        ctx.set_line_join("round");
        ctx.set_line_cap("round");

        let vp = viewport.get_untracked();
        let frame = Frame {
            ctx: &ctx,
            vp: &vp,
            width: w,
            height: h,
        };
        frame.clear();
        loaded_tiles.with_untracked(|tiles| frame.draw_tiles(tiles));

        let selected_key = selected.get_untracked();
        let shade = shade_by_score.get_untracked();
        let hov = hovered.get_untracked();
        regions.with_untracked(|regions| {
            for region in regions {
                if hov.as_ref().is_some_and(|h| is_same(h, region)) {
                    continue;
                }
                frame.draw_region(region, style_for(region, selected_key.as_ref(), false), shade);
            }
        });
        // Hovered region is raised above its siblings
        if let Some(region) = hov.as_ref() {
            frame.draw_region(region, style_for(region, selected_key.as_ref(), true), shade);
        }
    }));

    Effect::new({
        let scheduler = scheduler.clone();
        move || {
            regions.track();
            viewport.track();
            loaded_tiles.track();
            selected.track();
            shade_by_score.track();
            hovered.track();
            scheduler.mark_dirty();
        }
    });

    bind_window_resize(scheduler);

    // --- Input handlers ---

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let delta = e.delta_y();
        let x = e.offset_x() as f64;
        let y = e.offset_y() as f64;
        viewport.update(|vp| vp.zoom_at(delta, x, y));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start = drag_start.clone();
        let last_pos = last_pos.clone();
        move |e: PointerEvent| {
            let pos = (e.client_x() as f64, e.client_y() as f64);
            is_dragging.set(true);
            drag_start.set(pos);
            last_pos.set(pos);
            hovered.set(None);

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_pos = last_pos.clone();
        move |e: PointerEvent| {
            let pos = (e.client_x() as f64, e.client_y() as f64);
            if is_dragging.get() {
                let (lx, ly) = last_pos.get();
                last_pos.set(pos);
                viewport.update(|vp| vp.pan(pos.0 - lx, pos.1 - ly));
                return;
            }
            let (wx, wy) = viewport
                .get_untracked()
                .screen_to_world(e.offset_x() as f64, e.offset_y() as f64);
            let hit = grid_for_move.borrow().find_at(wx, wy);
            let changed = match (&hit, &hovered.get_untracked()) {
                (Some(a), Some(b)) => !is_same(a, b),
                (None, None) => false,
                _ => true,
            };
            if changed {
                hovered.set(hit);
            }
            if hovered.with_untracked(Option::is_some) {
                mouse_pos.set(pos);
            }
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    let on_pointer_leave = move |_: PointerEvent| {
        if hovered.with_untracked(Option::is_some) {
            hovered.set(None);
        }
    };

    let on_canvas_click = {
        let drag_start = drag_start.clone();
        move |e: MouseEvent| {
            let (sx, sy) = drag_start.get();
            let dx = (e.client_x() as f64 - sx).abs();
            let dy = (e.client_y() as f64 - sy).abs();
            if dx >= CLICK_SLOP_PX || dy >= CLICK_SLOP_PX {
                return;
            }
            let (wx, wy) = viewport
                .get_untracked()
                .screen_to_world(e.offset_x() as f64, e.offset_y() as f64);
            if let Some(region) = grid_for_click.borrow().find_at(wx, wy) {
                on_click.run(region);
            }
        }
    };

    view! {
        <canvas
            node_ref=canvas_ref
            style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_canvas_click
        />
        <RegionTooltip hovered=hovered mouse_pos=mouse_pos />
    }
}

struct ResizeBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn()>,
}

thread_local! {
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

fn bind_window_resize(scheduler: Rc<RenderScheduler>) {
    let Some(window) = web_sys::window() else {
        return;
    };

    RESIZE_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old
                .window
                .remove_event_listener_with_callback("resize", old._handler.as_ref().unchecked_ref());
        }
    });

    let handler = wasm_bindgen::closure::Closure::<dyn Fn()>::new(move || scheduler.mark_dirty());
    if window
        .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
        .is_ok()
    {
        RESIZE_BINDING.with(|slot| {
            *slot.borrow_mut() = Some(ResizeBinding {
                window: window.clone(),
                _handler: handler,
            });
        });
    }
}

/// Tooltip that follows the cursor while a region is hovered.
#[component]
fn RegionTooltip(
    hovered: RwSignal<Option<RegionRef>>,
    mouse_pos: RwSignal<(f64, f64)>,
) -> impl IntoView {
    view! {
        {move || {
            let Some(region) = hovered.get() else {
                return ().into_any();
            };
            let (x, y) = mouse_pos.get();
            let (name, score) = tooltip_lines(region.name(), region.score());
            view! {
                <div
                    style:left=format!("{}px", x + 14.0)
                    style:top=format!("{}px", y - 10.0)
                    style="position: fixed; pointer-events: none; z-index: 100; background: #fff; border: 1px solid #bbb; border-radius: 4px; padding: 6px 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.2); font-family: 'Inter', system-ui, sans-serif; font-size: 0.78rem; color: #222; line-height: 1.35;"
                >
                    <div style="font-weight: 600;">{name}</div>
                    <div style="font-family: 'JetBrains Mono', monospace;">{score}</div>
                </div>
            }
            .into_any()
        }}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use geo::MultiPolygon;
    use opportunity_shared::{Region, RegionAttributes};

    use super::*;

    fn named(name: Option<&str>) -> RegionRef {
        let attributes = RegionAttributes {
            subzone_n: name.map(str::to_string),
            ..RegionAttributes::default()
        };
        Arc::new(Region::new(None, attributes, MultiPolygon::new(Vec::new())))
    }

    #[test]
    fn selected_identity_gets_selected_style() {
        let region = named(Some("Bishan East"));
        let key = region.key();
        assert_eq!(style_for(&region, key.as_ref(), false), SELECTED_STYLE);
        assert_eq!(style_for(&named(Some("Toa Payoh")), key.as_ref(), false), BASE_STYLE);
        assert_eq!(style_for(&region, None, false), BASE_STYLE);
    }

    #[test]
    fn hover_overrides_selection() {
        let region = named(Some("Bishan East"));
        let key = region.key();
        assert_eq!(style_for(&region, key.as_ref(), true), HOVER_STYLE);
    }

    #[test]
    fn unidentified_region_is_never_selected() {
        let ghost = named(None);
        let other = named(Some("Bishan East")).key();
        assert_eq!(style_for(&ghost, other.as_ref(), false), BASE_STYLE);
    }

    #[test]
    fn base_style_is_thin_and_dark() {
        assert!(BASE_STYLE.weight < HOVER_STYLE.weight);
        assert!(HOVER_STYLE.weight < SELECTED_STYLE.weight);
    }
}
