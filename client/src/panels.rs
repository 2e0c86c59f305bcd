use leptos::prelude::*;

use opportunity_shared::colors::LEGEND;
use opportunity_shared::format::{PLACEHOLDER, format_population, format_score};
use opportunity_shared::{Region, RegionRef, SelectionState};

const PANEL_STYLE: &str = "background: #fff; border: 1px solid #d6d6d6; border-radius: 6px; padding: 12px 14px; font-family: 'Inter', system-ui, sans-serif; font-size: 0.85rem; color: #222;";
const BUTTON_STYLE: &str = "padding: 4px 10px; border: 1px solid #999; border-radius: 4px; background: #f4f4f4; cursor: pointer; font-size: 0.78rem;";

/// Labelled metric rows shown for a region, in display order.
pub fn metric_rows(region: &Region) -> Vec<(&'static str, String)> {
    let attrs = &region.attributes;
    vec![
        ("Planning area", attrs.planning_area().unwrap_or(PLACEHOLDER).to_string()),
        ("H score", format_score(attrs.raw_score())),
        ("Demand", format_score(attrs.demand)),
        ("Supply", format_score(attrs.supply)),
        ("Accessibility", format_score(attrs.accessibility)),
        ("Population", format_population(attrs.population)),
    ]
}

fn display_name(region: &Region) -> String {
    region.name().unwrap_or("Unknown").to_string()
}

#[component]
fn MetricTable(region: RegionRef) -> impl IntoView {
    view! {
        <table style="width: 100%; border-collapse: collapse; margin-top: 6px;">
            {metric_rows(&region)
                .into_iter()
                .map(|(label, value)| view! {
                    <tr>
                        <td style="padding: 2px 0; color: #666;">{label}</td>
                        <td style="padding: 2px 0; text-align: right; font-family: 'JetBrains Mono', monospace; font-variant-numeric: tabular-nums;">{value}</td>
                    </tr>
                })
                .collect_view()}
        </table>
    }
}

/// Metrics of the selected region with compare and close actions.
#[component]
pub fn DetailPanel(selection: RwSignal<SelectionState>) -> impl IntoView {
    view! {
        {move || {
            let Some(region) = selection.with(|s| s.selected().cloned()) else {
                return ().into_any();
            };
            let compared = selection.with(|s| s.is_compared(&region));
            let for_toggle = region.clone();
            view! {
                <section style=PANEL_STYLE>
                    <div style="display: flex; justify-content: space-between; align-items: baseline; gap: 8px;">
                        <h2 style="margin: 0; font-size: 1rem;">{display_name(&region)}</h2>
                        <button
                            style=BUTTON_STYLE
                            title="Close (Esc)"
                            on:click=move |_| selection.update(|s| s.select(None))
                        >
                            "Close"
                        </button>
                    </div>
                    <MetricTable region=region />
                    <div style="margin-top: 8px;">
                        <button
                            style=BUTTON_STYLE
                            on:click=move |_| selection.update(|s| s.toggle_compare(for_toggle.clone()))
                        >
                            {if compared { "Remove from compare" } else { "Compare" }}
                        </button>
                    </div>
                </section>
            }
            .into_any()
        }}
    }
}

/// Side-by-side metrics for the comparison set.
#[component]
pub fn ComparePanel(selection: RwSignal<SelectionState>) -> impl IntoView {
    view! {
        {move || {
            let entries = selection.with(|s| s.compared().to_vec());
            if entries.is_empty() {
                return ().into_any();
            }
            view! {
                <section style=PANEL_STYLE>
                    <div style="display: flex; justify-content: space-between; align-items: baseline;">
                        <h2 style="margin: 0; font-size: 1rem;">"Compare"</h2>
                        <button
                            style=BUTTON_STYLE
                            on:click=move |_| selection.update(|s| s.clear_compare())
                        >
                            "Clear"
                        </button>
                    </div>
                    <div style="display: flex; gap: 12px; margin-top: 6px;">
                        {entries
                            .into_iter()
                            .map(|region| {
                                let for_remove = region.clone();
                                view! {
                                    <div style="flex: 1; min-width: 0;">
                                        <div style="display: flex; justify-content: space-between; gap: 6px;">
                                            <strong style="overflow: hidden; text-overflow: ellipsis; white-space: nowrap;">
                                                {display_name(&region)}
                                            </strong>
                                            <button
                                                style=BUTTON_STYLE
                                                title="Remove"
                                                on:click=move |_| selection.update(|s| s.remove_compared(&for_remove))
                                            >
                                                "\u{00D7}"
                                            </button>
                                        </div>
                                        <MetricTable region=region />
                                    </div>
                                }
                            })
                            .collect_view()}
                    </div>
                </section>
            }
            .into_any()
        }}
    }
}

/// Score color legend, shown while the overlay is shaded by score.
#[component]
pub fn Legend(shade_by_score: RwSignal<bool>) -> impl IntoView {
    view! {
        <section
            style=PANEL_STYLE
            style:display=move || if shade_by_score.get() { "block" } else { "none" }
        >
            <h2 style="margin: 0 0 6px; font-size: 0.9rem;">"H score"</h2>
            {LEGEND
                .into_iter()
                .map(|band| view! {
                    <div style="display: flex; align-items: center; gap: 8px; padding: 1px 0;">
                        <span style=format!(
                            "display: inline-block; width: 14px; height: 14px; border: 1px solid #999; background: {};",
                            band.hex()
                        ) />
                        <span style="font-family: 'JetBrains Mono', monospace; font-size: 0.78rem;">{band.label()}</span>
                    </div>
                })
                .collect_view()}
        </section>
    }
}

/// Dismissible, non-blocking notice for a failed data load.
#[component]
pub fn FetchNotice(notice: RwSignal<Option<String>>) -> impl IntoView {
    view! {
        {move || {
            let Some(message) = notice.get() else {
                return ().into_any();
            };
            view! {
                <div
                    role="alert"
                    style="position: fixed; left: 50%; bottom: 24px; transform: translateX(-50%); z-index: 200; display: flex; align-items: center; gap: 12px; padding: 10px 14px; background: #fff4f2; border: 1px solid #e31a1c; border-radius: 6px; box-shadow: 0 2px 10px rgba(0,0,0,0.2); font-family: 'Inter', system-ui, sans-serif; font-size: 0.85rem; color: #800026;"
                >
                    <span>{message}</span>
                    <button style=BUTTON_STYLE on:click=move |_| notice.set(None)>
                        "Dismiss"
                    </button>
                </div>
            }
            .into_any()
        }}
    }
}
