use choropleth_shared::info_panel::{clamp_panel_width, value_label_offset};
use choropleth_shared::{InfoRow, Legend, WidgetEvent};
use leptos::prelude::*;

use crate::app::{MapHandles, MapSize, WidgetSignal};

const BAR_COLOR: &str = "#9ecae1";

/// Selected features as a bar list, with the legend below.
#[component]
pub fn InfoPanel() -> impl IntoView {
    let WidgetSignal(widget) = expect_context();
    let MapSize(size) = expect_context();

    let rows = Memo::new(move |_| {
        widget.with(|w| w.as_ref().map(|w| w.info_rows()).unwrap_or_default())
    });
    let legend = Memo::new(move |_| widget.with(|w| w.as_ref().map(|w| w.legend())));
    let year = Memo::new(move |_| widget.with(|w| w.as_ref().map(|w| w.current_year())));

    let panel_ref = NodeRef::<leptos::html::Div>::new();

    Effect::new(move || {
        let (map_width, _) = size.get();
        rows.track();
        let Some(el) = panel_ref.get() else {
            return;
        };
        let style = web_sys::HtmlElement::style(&el);
        style.remove_property("width").ok();
        if let Some(width) = clamp_panel_width(el.offset_width() as f64, map_width) {
            style.set_property("width", &format!("{width}px")).ok();
        }
    });

    view! {
        <div
            node_ref=panel_ref
            class="choropleth-info"
            style="position: absolute; top: 10px; right: 10px; min-width: 180px; max-width: 320px; background: rgba(255,255,255,0.92); border-radius: 4px; box-shadow: 0 1px 4px rgba(0,0,0,0.3); padding: 8px 10px; font-size: 0.8rem; box-sizing: border-box;"
        >
            {move || year.get().map(|year| view! { <div class="choropleth-info-year" style="font-weight: 600; margin-bottom: 4px;">{year}</div> })}
            <Show
                when=move || !rows.with(Vec::is_empty)
                fallback=|| view! { <div class="choropleth-info-hint" style="color: #666;">"Click a region to compare it."</div> }
            >
                <ul class="choropleth-info-rows" style="list-style: none; margin: 0; padding: 0;">
                    <For
                        each=move || rows.get()
                        key=|row| (row.geocode.clone(), row.value.map(f64::to_bits))
                        children=move |row| view! { <InfoPanelRow row=row /> }
                    />
                </ul>
            </Show>
            {move || legend.get().map(|legend| view! { <LegendStrip legend=legend /> })}
        </div>
    }
}

/// Left edge of the value label, in pixels from the row start.
///
/// The label sits at the end of the bar unless that would put it on top of
/// the name, in which case it is pushed past the name.
fn value_label_left(name_width: f64, bar_width: f64) -> f64 {
    bar_width + value_label_offset(name_width, bar_width).unwrap_or(0.0)
}

#[component]
fn InfoPanelRow(row: InfoRow) -> impl IntoView {
    let handles: MapHandles = expect_context();

    let name_ref = NodeRef::<leptos::html::Span>::new();
    let bar_ref = NodeRef::<leptos::html::Div>::new();
    let value_ref = NodeRef::<leptos::html::Span>::new();

    Effect::new(move || {
        let (Some(name), Some(bar), Some(value)) = (name_ref.get(), bar_ref.get(), value_ref.get())
        else {
            return;
        };
        let left = value_label_left(name.offset_width() as f64, bar.offset_width() as f64);
        web_sys::HtmlElement::style(&value)
            .set_property("left", &format!("{left}px"))
            .ok();
    });

    let code = row.geocode.clone();
    let on_close = move |_| {
        handles.dispatch(WidgetEvent::PanelItemClosed(code.clone()));
    };

    let bar = row.percentage.map(|percentage| {
        view! {
            <div
                node_ref=bar_ref
                class="choropleth-info-bar"
                style=format!("position: absolute; left: 0; top: 0; bottom: 0; width: {percentage}%; background: {BAR_COLOR};")
            />
        }
    });
    let value = row.value_label().map(|label| {
        let left = row.percentage.unwrap_or(0);
        view! {
            <span
                node_ref=value_ref
                class="choropleth-info-value"
                style=format!("position: absolute; top: 0; left: {left}%; padding-left: 4px; font-weight: 600; white-space: nowrap;")
            >
                {label}
            </span>
        }
    });

    view! {
        <li
            class="choropleth-info-row"
            title="Click to remove"
            style="position: relative; padding: 2px 18px 2px 0; margin: 2px 0; cursor: pointer; line-height: 1.4;"
            on:click=on_close
        >
            <div class="choropleth-info-track" style="position: relative; min-height: 1.4em;">
                {bar}
                <span node_ref=name_ref class="choropleth-info-name" style="position: relative; padding-left: 4px; white-space: nowrap;">{row.name}</span>
                {value}
            </div>
            <span class="choropleth-info-close" style="position: absolute; right: 2px; top: 2px; color: #888;">"\u{00d7}"</span>
        </li>
    }
}


#[component]
fn LegendStrip(legend: Legend) -> impl IntoView {
    let width = legend.swatch_width_percent;
    let swatches = legend
        .swatches
        .iter()
        .map(|color| {
            view! {
                <span style=format!(
                    "display: inline-block; height: 10px; width: {width}%; background: {};",
                    color.to_hex(),
                ) />
            }
        })
        .collect_view();

    view! {
        <div class="choropleth-legend" style="margin-top: 8px;">
            <div style="display: flex; line-height: 0;">{swatches}</div>
            <div style="display: flex; justify-content: space-between; color: #555;">
                <span>{legend.max_label}</span>
                <span>{legend.min_label}</span>
            </div>
        </div>
    }
}
