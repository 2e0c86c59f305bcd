use std::cell::RefCell;

use gloo_storage::Storage;
use leptos::prelude::*;
use wasm_bindgen::JsCast;

use opportunity_shared::{MapError, QuantileFilter, RegionRef, SelectionState};

use crate::map_view::MapView;
use crate::panels::{ComparePanel, DetailPanel, FetchNotice, Legend};

const SETTINGS_KEY: &str = "opportunity_settings";

struct KeydownBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
}

/// UI preferences persisted in local storage. Selection and comparison are not.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct Settings {
    filter: QuantileFilter,
    shade_by_score: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            filter: QuantileFilter::All,
            shade_by_score: false,
        }
    }
}

/// Page shell. Owns selection and comparison state and hands it to children
/// explicitly.
#[component]
pub fn App() -> impl IntoView {
    let saved: Settings = gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default();
    let selection: RwSignal<SelectionState> = RwSignal::new(SelectionState::new());
    let filter: RwSignal<QuantileFilter> = RwSignal::new(saved.filter);
    let shade_by_score: RwSignal<bool> = RwSignal::new(saved.shade_by_score);
    let notice: RwSignal<Option<String>> = RwSignal::new(None);

    Effect::new(move || {
        let settings = Settings {
            filter: filter.get(),
            shade_by_score: shade_by_score.get(),
        };
        let _ = gloo_storage::LocalStorage::set(SETTINGS_KEY, &settings);
    });

    // Global keyboard shortcuts
    Effect::new(move || {
        use wasm_bindgen::prelude::*;

        let Some(window) = web_sys::window() else {
            return;
        };

        KEYDOWN_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "keydown",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler =
            Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
                let key = e.key();
                let target = e
                    .target()
                    .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok());
                let target_tag = target.as_ref().map(|el| el.tag_name()).unwrap_or_default();

                // Don't intercept when typing in a field
                if matches!(target_tag.as_str(), "INPUT" | "TEXTAREA" | "SELECT") {
                    if key == "Escape"
                        && let Some(el) = target
                    {
                        el.blur().ok();
                    }
                    return;
                }

                match key.as_str() {
                    "Escape" => selection.update(|s| s.select(None)),
                    "/" => {
                        e.prevent_default();
                        let Some(doc) = web_sys::window().and_then(|w| w.document()) else {
                            return;
                        };
                        if let Some(el) = doc.query_selector("[data-search-input]").ok().flatten()
                            && let Ok(input) = el.dyn_into::<web_sys::HtmlElement>()
                        {
                            input.focus().ok();
                        }
                    }
                    _ => {}
                }
            });

        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    let selected = Signal::derive(move || selection.with(|s| s.selected_key()));
    let on_select = Callback::new(move |region: RegionRef| {
        selection.update(|s| s.select(Some(region)));
    });
    let on_load_error = Callback::new(move |err: MapError| {
        notice.set(Some(err.to_string()));
    });

    view! {
        <div style="display: flex; width: 100%; height: 100%;">
            <MapView
                selected=selected
                filter=filter
                shade_by_score=shade_by_score
                on_select=on_select
                on_load_error=on_load_error
            />
            <aside style="width: 340px; flex-shrink: 0; height: 100%; overflow-y: auto; padding: 12px; box-sizing: border-box; display: flex; flex-direction: column; gap: 12px; background: #f7f7f5; border-left: 1px solid #ddd;">
                <DetailPanel selection=selection />
                <ComparePanel selection=selection />
                <Legend shade_by_score=shade_by_score />
            </aside>
        </div>
        <FetchNotice notice=notice />
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_tolerate_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{"filter":"Top25"}"#).expect("valid json");
        assert_eq!(settings.filter, QuantileFilter::Top25);
        assert!(!settings.shade_by_score);

        let settings: Settings = serde_json::from_str("{}").expect("valid json");
        assert_eq!(settings, Settings::default());
    }
}
