use leptos::prelude::*;
use wasm_bindgen::JsCast;

use opportunity_shared::QuantileFilter;

const NAMES_LIST_ID: &str = "region-names";

fn input_value(e: &leptos::ev::Event) -> Option<String> {
    let target = e.target()?;
    if let Ok(input) = target.clone().dyn_into::<web_sys::HtmlInputElement>() {
        return Some(input.value());
    }
    target
        .dyn_into::<web_sys::HtmlSelectElement>()
        .ok()
        .map(|select| select.value())
}

/// Search field with autocomplete plus the quantile filter select. Emits intents
/// only; all state changes happen in the map view.
#[component]
pub fn Toolbar(
    names: Signal<Vec<String>>,
    #[prop(into)] filter: Signal<QuantileFilter>,
    shade_by_score: RwSignal<bool>,
    on_search: Callback<String>,
    on_filter: Callback<QuantileFilter>,
) -> impl IntoView {
    let query: RwSignal<String> = RwSignal::new(String::new());

    let on_input = move |e: leptos::ev::Event| {
        if let Some(value) = input_value(&e) {
            query.set(value);
        }
    };
    let on_keydown = move |e: web_sys::KeyboardEvent| {
        if e.key() == "Enter" {
            e.prevent_default();
            on_search.run(query.get_untracked());
        }
    };
    let on_filter_change = move |e: leptos::ev::Event| {
        if let Some(selector) = input_value(&e).and_then(|v| v.parse::<QuantileFilter>().ok()) {
            on_filter.run(selector);
        }
    };

    view! {
        <div style="position: absolute; top: 12px; left: 12px; z-index: 10; display: flex; align-items: center; gap: 8px; padding: 8px 10px; background: rgba(255,255,255,0.95); border: 1px solid #ccc; border-radius: 6px; box-shadow: 0 2px 8px rgba(0,0,0,0.15); font-family: 'Inter', system-ui, sans-serif; font-size: 0.85rem;">
            <input
                data-search-input=""
                type="text"
                list=NAMES_LIST_ID
                placeholder="Search subzone..."
                style="width: 220px; padding: 6px 8px; border: 1px solid #bbb; border-radius: 4px; font-size: 0.85rem;"
                prop:value=move || query.get()
                on:input=on_input
                on:keydown=on_keydown
            />
            <datalist id=NAMES_LIST_ID>
                {move || {
                    names
                        .get()
                        .into_iter()
                        .map(|name| view! { <option value=name /> })
                        .collect_view()
                }}
            </datalist>
            <button
                style="padding: 6px 12px; border: 1px solid #888; border-radius: 4px; background: #f4f4f4; cursor: pointer;"
                on:click=move |_| on_search.run(query.get_untracked())
            >
                "Go"
            </button>
            <label style="display: flex; align-items: center; gap: 4px; color: #444;">
                "Filter"
                <select
                    style="padding: 5px 6px; border: 1px solid #bbb; border-radius: 4px;"
                    prop:value=move || filter.get().value()
                    on:change=on_filter_change
                >
                    {QuantileFilter::ALL
                        .into_iter()
                        .map(|option| {
                            view! {
                                <option value=option.value() selected=move || filter.get() == option>
                                    {option.label()}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>
            </label>
            <label style="display: flex; align-items: center; gap: 4px; color: #444; cursor: pointer;">
                <input
                    type="checkbox"
                    prop:checked=move || shade_by_score.get()
                    on:change=move |_| shade_by_score.update(|v| *v = !*v)
                />
                "Shade by score"
            </label>
        </div>
    }
}
