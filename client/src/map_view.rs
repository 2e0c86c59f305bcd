use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use opportunity_shared::{
    Bounds, FetchError, MapError, NameIndex, QuantileFilter, RegionCollection, RegionKey,
    RegionRef, bounds_of, build_name_index, sorted_names, top_quantile,
};

use crate::api;
use crate::overlay::RegionOverlay;
use crate::tiles::ATTRIBUTION;
use crate::toolbar::Toolbar;
use crate::viewport::Viewport;

/// Initial view: central Singapore.
pub const INITIAL_CENTER_LON: f64 = 103.8198;
pub const INITIAL_CENTER_LAT: f64 = 1.3521;
pub const INITIAL_ZOOM: f64 = 11.0;
/// Padding on every side when fitting the view to regions.
pub const FIT_PADDING_PX: f64 = 16.0;

/// Dataset state owned by the map view: the raw collection and everything derived
/// from it. Free of any UI types.
#[derive(Debug, Clone, Default)]
pub struct MapData {
    raw: Option<RegionCollection>,
    filtered: Vec<RegionRef>,
    names: Vec<String>,
    index: NameIndex,
}

impl MapData {
    pub fn is_loaded(&self) -> bool {
        self.raw.is_some()
    }

    pub fn filtered(&self) -> &[RegionRef] {
        &self.filtered
    }

    /// All region names, sorted, for autocomplete.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Replace the dataset; the filtered view resets to the whole collection.
    pub fn load(&mut self, collection: RegionCollection) {
        self.filtered = collection.regions().to_vec();
        self.names = sorted_names(collection.regions());
        self.index = build_name_index(collection.regions());
        self.raw = Some(collection);
    }

    /// Apply the outcome of a fetch. Failures leave existing state untouched.
    pub fn apply_load(
        &mut self,
        result: Result<RegionCollection, FetchError>,
    ) -> Result<usize, MapError> {
        let collection = result?;
        let count = collection.len();
        self.load(collection);
        Ok(count)
    }

    /// Recompute the filtered view. Returns the bounds to fit when a fractional
    /// filter matched at least one region with geometry.
    pub fn apply_filter(&mut self, filter: QuantileFilter) -> Option<Bounds> {
        let raw = self.raw.as_ref()?;
        match filter.fraction() {
            None => {
                self.filtered = raw.regions().to_vec();
                None
            }
            Some(fraction) => {
                self.filtered = top_quantile(raw.regions(), fraction);
                bounds_of(&self.filtered)
            }
        }
    }

    /// Exact, case-insensitive name lookup over the full collection.
    pub fn search(&self, text: &str) -> Result<RegionRef, MapError> {
        let not_found = || MapError::NotFound {
            query: text.to_string(),
        };
        let raw = self.raw.as_ref().ok_or_else(not_found)?;
        let query = text.trim();
        if query.is_empty() {
            return Err(not_found());
        }
        let canonical = self.index.resolve(query).ok_or_else(not_found)?;
        raw.iter()
            .find(|region| region.name() == Some(canonical))
            .cloned()
            .ok_or_else(not_found)
    }
}

/// Ties an in-flight fetch to the lifetime of the view that issued it.
#[derive(Debug, Clone)]
pub struct LoadGuard {
    live: Arc<AtomicBool>,
}

impl Default for LoadGuard {
    fn default() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl LoadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.live.store(false, Ordering::Relaxed);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }

    /// Run `apply` only while the view is still mounted. Returns whether it ran.
    pub fn deliver<T>(&self, value: T, apply: impl FnOnce(T)) -> bool {
        if !self.is_live() {
            return false;
        }
        apply(value);
        true
    }
}

/// Map view: fetches the dataset once, derives the filtered view and name list,
/// and wires toolbar intents to filtering, search and viewport fitting.
#[component]
pub fn MapView(
    selected: Signal<Option<RegionKey>>,
    filter: RwSignal<QuantileFilter>,
    shade_by_score: RwSignal<bool>,
    on_select: Callback<RegionRef>,
    on_load_error: Callback<MapError>,
) -> impl IntoView {
    let data: RwSignal<MapData> = RwSignal::new(MapData::default());
    let viewport: RwSignal<Viewport> = RwSignal::new(Viewport::default());
    let canvas_size: RwSignal<(f64, f64)> = RwSignal::new((0.0, 0.0));
    // Bumped on every successful load so the filter effect re-applies.
    let data_revision: RwSignal<u64> = RwSignal::new(0);

    let fit_to = move |bounds: Bounds| {
        let (w, h) = canvas_size.get_untracked();
        viewport.update(|vp| vp.fit_bounds(&bounds, w, h, FIT_PADDING_PX));
    };

    // Initial view once the canvas has a size
    let centered = Rc::new(Cell::new(false));
    Effect::new(move || {
        let (w, h) = canvas_size.get();
        if centered.get() || w <= 0.0 || h <= 0.0 {
            return;
        }
        centered.set(true);
        viewport.update(|vp| {
            vp.center_on(INITIAL_CENTER_LON, INITIAL_CENTER_LAT, INITIAL_ZOOM, w, h)
        });
    });

    Effect::new(move || {
        let selector = filter.get();
        data_revision.track();
        if let Some(bounds) = data.try_update(|d| d.apply_filter(selector)).flatten() {
            fit_to(bounds);
        }
    });

    let guard = LoadGuard::new();
    on_cleanup({
        let guard = guard.clone();
        move || guard.cancel()
    });
    spawn_local(async move {
        let result = api::fetch_opportunity_geojson().await;
        guard.deliver(result, |result| {
            match data.try_update(|d| d.apply_load(result)) {
                Some(Ok(count)) => {
                    web_sys::console::info_1(&format!("Loaded {count} regions").into());
                    data_revision.update(|rev| *rev = rev.wrapping_add(1));
                }
                Some(Err(err)) => {
                    web_sys::console::warn_1(&format!("Region data fetch failed: {err}").into());
                    on_load_error.run(err);
                }
                None => {}
            }
        });
    });

    let on_search = Callback::new(move |text: String| {
        let Ok(region) = data.with_untracked(|d| d.search(&text)) else {
            return;
        };
        if let Some(bounds) = region.bounds() {
            fit_to(bounds);
        }
        on_select.run(region);
    });
    let on_filter = Callback::new(move |selector: QuantileFilter| filter.set(selector));

    let regions = Signal::derive(move || data.with(|d| d.filtered().to_vec()));
    let names = Signal::derive(move || data.with(|d| d.names().to_vec()));

    view! {
        <div style="position: relative; flex: 1; min-width: 0; height: 100%; overflow: hidden;">
            <RegionOverlay
                regions=regions
                viewport=viewport
                canvas_size=canvas_size
                selected=selected
                shade_by_score=shade_by_score
                on_click=on_select
            />
            <Toolbar
                names=names
                filter=filter
                shade_by_score=shade_by_score
                on_search=on_search
                on_filter=on_filter
            />
            <div style="position: absolute; right: 0; bottom: 0; z-index: 5; padding: 2px 6px; background: rgba(255,255,255,0.8); font-family: 'Inter', system-ui, sans-serif; font-size: 0.68rem; color: #333;">
                {ATTRIBUTION}
            </div>
        </div>
    }
}
