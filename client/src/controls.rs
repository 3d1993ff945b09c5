use leptos::prelude::*;

use crate::app::{MapHandles, MapRoot, WidgetSignal};
use crate::viewport::Viewport;

const BUTTON_STYLE: &str = "display: block; width: 28px; height: 28px; border: none; border-bottom: 1px solid #ccc; background: #fff; font-size: 1rem; line-height: 28px; cursor: pointer; padding: 0;";

/// Zoom in, zoom out and back to the visible layers.
#[component]
pub fn ZoomControl() -> impl IntoView {
    let handles: MapHandles = expect_context();
    let viewport = handles.viewport;

    let can_zoom_in = Memo::new(move |_| viewport.with(Viewport::can_zoom_in));
    let can_zoom_out = Memo::new(move |_| viewport.with(Viewport::can_zoom_out));

    view! {
        <div
            class="choropleth-zoom"
            style="position: absolute; top: 10px; left: 10px; border-radius: 4px; overflow: hidden; box-shadow: 0 1px 4px rgba(0,0,0,0.3);"
        >
            <button
                title="Zoom in"
                style=BUTTON_STYLE
                disabled=move || !can_zoom_in.get()
                on:click=move |_| viewport.update(|vp| vp.zoom_centered(1.0))
            >
                "+"
            </button>
            <button
                title="Zoom out"
                style=BUTTON_STYLE
                disabled=move || !can_zoom_out.get()
                on:click=move |_| viewport.update(|vp| vp.zoom_centered(-1.0))
            >
                "\u{2212}"
            </button>
            <button title="Zoom home" style=BUTTON_STYLE on:click=move |_| handles.fit_to_visible()>
                "\u{2302}"
            </button>
        </div>
    }
}

fn toggle_fullscreen(root: &web_sys::Element) {
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return;
    };
    let result = if document.fullscreen_element().is_some() {
        document.exit_fullscreen();
        Ok(())
    } else {
        root.request_fullscreen()
    };
    if let Err(e) = result {
        web_sys::console::warn_1(&e);
    }
}

#[component]
pub fn FullscreenControl() -> impl IntoView {
    let MapRoot(root) = expect_context();

    let on_click = move |_| {
        if let Some(el) = root.get_untracked() {
            toggle_fullscreen(&el);
        }
    };

    view! {
        <button
            class="choropleth-fullscreen"
            title="Toggle full screen"
            style="position: absolute; top: 108px; left: 10px; width: 28px; height: 28px; border: none; border-radius: 4px; background: #fff; box-shadow: 0 1px 4px rgba(0,0,0,0.3); cursor: pointer; padding: 0;"
            on:click=on_click
        >
            "\u{26f6}"
        </button>
    }
}

/// Credit line for the boundary data, bottom right above the slider.
#[component]
pub fn Attribution() -> impl IntoView {
    let WidgetSignal(widget) = expect_context();

    let text = Memo::new(move |_| {
        widget.with(|w| {
            w.as_ref()
                .and_then(|w| w.config().tile_options.attribution_text().map(str::to_owned))
        })
    });

    move || {
        text.get().map(|text| {
            view! {
                <div
                    class="choropleth-attribution"
                    style="position: absolute; right: 0; bottom: 0; background: rgba(255,255,255,0.7); color: #333; padding: 0 5px; font-size: 0.7rem;"
                >
                    {text}
                </div>
            }
        })
    }
}
