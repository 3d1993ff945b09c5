use std::cell::RefCell;

use choropleth_shared::info_panel::clamp_map_height;
use choropleth_shared::error::LoadError;
use choropleth_shared::{
    Bounds, Feature, FocusRequest, MapWidget, WidgetError, WidgetEvent, WidgetUpdate,
};
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::controls::{Attribution, FullscreenControl, ZoomControl};
use crate::info_panel::InfoPanel;
use crate::loader;
use crate::map_view::{LayerShapes, MapView, build_shapes};
use crate::viewport::Viewport;
use crate::year_slider::YearSlider;

struct ResizeBinding {
    window: web_sys::Window,
    handler: Closure<dyn Fn()>,
    observer: Option<web_sys::ResizeObserver>,
    // The observer's entries are ignored; any resize triggers a full remeasure.
    _observer_callback: Closure<dyn Fn(JsValue)>,
}

thread_local! {
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum LoadPhase {
    Loading,
    /// Options are unusable; the map is not shown.
    Disabled(String),
    Failed(String),
    Ready,
}

#[derive(Clone, Copy)]
pub(crate) struct WidgetSignal(pub RwSignal<Option<MapWidget>>);
#[derive(Clone, Copy)]
pub(crate) struct MapSize(pub RwSignal<(f64, f64)>);
#[derive(Clone, Copy)]
pub(crate) struct Playing(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct Shapes(pub StoredValue<Vec<LayerShapes>>);
/// Outer widget element, the one that goes full screen.
#[derive(Clone, Copy)]
pub(crate) struct MapRoot(pub NodeRef<leptos::html::Div>);

/// Signals an event handler needs to drive the widget.
#[derive(Clone, Copy)]
pub(crate) struct MapHandles {
    pub widget: RwSignal<Option<MapWidget>>,
    pub viewport: RwSignal<Viewport>,
    pub size: RwSignal<(f64, f64)>,
}

impl MapHandles {
    /// Feed an event to the widget and apply the resulting focus request.
    pub fn dispatch(&self, event: WidgetEvent) -> WidgetUpdate {
        let mut update = WidgetUpdate::default();
        self.widget.maybe_update(|widget| {
            if let Some(widget) = widget.as_mut() {
                update = widget.handle(event);
            }
            !update.is_empty()
        });

        if let Some(FocusRequest {
            center: Some((lon, lat)),
            ..
        }) = update.focus
        {
            let (w, h) = self.size.get_untracked();
            self.viewport.update(|vp| vp.center_on(lon, lat, w, h));
        }
        update
    }

    /// Refit the viewport to the layers visible at the current zoom and keep
    /// panning inside them.
    pub fn fit_to_visible(&self) {
        let (w, h) = self.size.get_untracked();
        let zoom = self.viewport.with_untracked(Viewport::zoom);
        let bounds = self.widget.with_untracked(|widget| {
            widget
                .as_ref()
                .and_then(|widget| widget.visible_bounds(zoom).or_else(|| loaded_bounds(widget)))
        });
        self.viewport.update(|vp| {
            vp.set_screen_size(w, h);
            if let Some(bounds) = bounds.as_ref() {
                vp.fit_bounds(bounds, w, h);
            }
            vp.set_max_bounds(bounds.as_ref());
        });
    }
}

fn loaded_bounds(widget: &MapWidget) -> Option<Bounds> {
    (0..widget.config().geo_layers.len())
        .flat_map(|layer| widget.layer_features(layer))
        .filter_map(Feature::bounds)
        .reduce(Bounds::union)
}

fn bootstrap_failure_message(error: &LoadError) -> String {
    match error {
        LoadError::Http { status: 404 } => "Map data is not available.".to_string(),
        LoadError::Http { .. } | LoadError::Network(_) => {
            format!("Could not reach the map service ({error}).")
        }
        LoadError::Parse(_) => format!("Map data is malformed ({error})."),
    }
}

fn window_height() -> f64 {
    web_sys::window()
        .and_then(|window| window.inner_height().ok())
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0)
}

/// Root component: loads the bootstrap and layers, then mounts the map.
#[component]
pub fn App() -> impl IntoView {
    let widget: RwSignal<Option<MapWidget>> = RwSignal::new(None);
    let viewport: RwSignal<Viewport> = RwSignal::new(Viewport::default());
    let size: RwSignal<(f64, f64)> = RwSignal::new((0.0, 0.0));
    let playing: RwSignal<bool> = RwSignal::new(false);
    let phase: RwSignal<LoadPhase> = RwSignal::new(LoadPhase::Loading);
    let warning: RwSignal<Option<String>> = RwSignal::new(None);
    let shapes: StoredValue<Vec<LayerShapes>> = StoredValue::new(Vec::new());
    let handles = MapHandles {
        widget,
        viewport,
        size,
    };

    provide_context(WidgetSignal(widget));
    provide_context(viewport);
    provide_context(MapSize(size));
    provide_context(Playing(playing));
    provide_context(Shapes(shapes));
    provide_context(handles);

    let map_ref = NodeRef::<leptos::html::Div>::new();
    let root_ref = NodeRef::<leptos::html::Div>::new();
    provide_context(MapRoot(root_ref));

    // Measure the container, keep it inside the window and refit the map.
    let adapt = move || {
        let Some(el) = map_ref.get_untracked() else {
            return;
        };
        let rect = el.get_bounding_client_rect();
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return;
        }
        let mut height = rect.height();
        if let Some(max_height) = clamp_map_height(height, window_height()) {
            web_sys::HtmlElement::style(&el)
                .set_property("height", &format!("{max_height}px"))
                .ok();
            height = max_height;
        }
        size.set((rect.width(), height));
        handles.fit_to_visible();
    };

    Effect::new(move || {
        spawn_local(async move {
            let bootstrap = match loader::fetch_bootstrap().await {
                Ok(bootstrap) => bootstrap,
                Err(e) => {
                    web_sys::console::warn_1(&format!("Map bootstrap failed: {e}").into());
                    phase.set(LoadPhase::Failed(bootstrap_failure_message(&e)));
                    return;
                }
            };

            let (min_zoom, max_zoom) = (bootstrap.config.min_zoom, bootstrap.config.max_zoom);
            let mut loaded = match MapWidget::new(bootstrap.config, bootstrap.records) {
                Ok(loaded) => loaded,
                Err(WidgetError::Configuration(e)) => {
                    web_sys::console::warn_1(&e.to_string().into());
                    phase.set(LoadPhase::Disabled(e.to_string()));
                    return;
                }
                Err(e) => {
                    web_sys::console::warn_1(&e.to_string().into());
                    phase.set(LoadPhase::Failed(e.to_string()));
                    return;
                }
            };

            let results = loader::fetch_layers(loaded.config().geo_layers.len()).await;
            match loaded.load_layers(results) {
                Ok(report) => {
                    if let Some(message) = report.warning() {
                        web_sys::console::warn_1(&message.clone().into());
                        warning.set(Some(message));
                    }
                }
                Err(e) => {
                    web_sys::console::warn_1(&e.to_string().into());
                    phase.set(LoadPhase::Failed(format!("The map could not be loaded: {e}.")));
                    return;
                }
            }

            web_sys::console::info_1(
                &format!(
                    "Map ready: {} years, {} layers",
                    loaded.years().len(),
                    loaded.config().geo_layers.len()
                )
                .into(),
            );
            shapes.set_value(build_shapes(&loaded));
            viewport.set(Viewport::with_zoom_limits(min_zoom, max_zoom));
            widget.set(Some(loaded));
            phase.set(LoadPhase::Ready);
            adapt();
        });
    });

    // Re-adapt on window resize and whenever the container changes size (e.g. becomes visible).
    Effect::new(move || {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(el) = map_ref.get() else {
            return;
        };

        RESIZE_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "resize",
                    old.handler.as_ref().unchecked_ref(),
                );
                if let Some(observer) = old.observer {
                    observer.disconnect();
                }
            }
        });

        let handler = Closure::<dyn Fn()>::new(adapt);
        if window
            .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
            .is_err()
        {
            return;
        }

        let observer_callback = Closure::<dyn Fn(JsValue)>::new(move |_: JsValue| adapt());
        let observer =
            web_sys::ResizeObserver::new(observer_callback.as_ref().unchecked_ref()).ok();
        if let Some(observer) = observer.as_ref() {
            observer.observe(&el);
        }

        RESIZE_BINDING.with(|slot| {
            *slot.borrow_mut() = Some(ResizeBinding {
                window: window.clone(),
                handler,
                observer,
                _observer_callback: observer_callback,
            });
        });
    });

    view! {
        <div node_ref=root_ref class="choropleth" style="position: relative; width: 100%; height: 100%; font-family: sans-serif;">
            <div
                node_ref=map_ref
                class="choropleth-map"
                style="position: relative; width: 100%; height: 100%; overflow: hidden; background: #fafafa;"
            >
                {move || match phase.get() {
                    LoadPhase::Loading => {
                        view! { <div class="choropleth-status">"Loading map\u{2026}"</div> }.into_any()
                    }
                    LoadPhase::Disabled(message) | LoadPhase::Failed(message) => {
                        view! { <div class="choropleth-status choropleth-error">{message}</div> }
                            .into_any()
                    }
                    LoadPhase::Ready => {
                        view! {
                            <MapView />
                            <ZoomControl />
                            <FullscreenControl />
                            <InfoPanel />
                            <YearSlider />
                            <Attribution />
                        }
                            .into_any()
                    }
                }}
            </div>
            {move || {
                warning
                    .get()
                    .map(|message| {
                        view! {
                            <div
                                class="choropleth-warning"
                                style="position: absolute; top: 8px; left: 50%; transform: translateX(-50%); background: #fff3cd; color: #664d03; padding: 4px 10px; border-radius: 4px; font-size: 0.8rem; cursor: pointer;"
                                on:click=move |_| warning.set(None)
                            >
                                {message}
                            </div>
                        }
                    })
            }}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_failures_name_the_cause() {
        assert_eq!(
            bootstrap_failure_message(&LoadError::Http { status: 404 }),
            "Map data is not available."
        );
        assert_eq!(
            bootstrap_failure_message(&LoadError::Http { status: 503 }),
            "Could not reach the map service (HTTP 503)."
        );
        assert_eq!(
            bootstrap_failure_message(&LoadError::Parse("expected value".into())),
            "Map data is malformed (parse error: expected value)."
        );
    }
}
