use std::cell::Cell;
use std::fmt::Write as _;
use std::rc::Rc;

use choropleth_shared::geo::lon_lat;
use choropleth_shared::{Geometry, MapWidget, StyleOptions, WidgetEvent};
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MouseEvent, PointerEvent, WheelEvent};

use crate::app::{MapHandles, Shapes, WidgetSignal};
use crate::viewport::{Viewport, project};

/// Pointer travel below which a press-release counts as a click, not a drag.
const CLICK_SLOP_PX: f64 = 5.0;
const SELECTED_OVERLAY_FILL: &str = "none";

/// One feature ready to draw: its SVG path in world pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureShape {
    pub geocode: String,
    pub path: String,
    /// Bounding box center in world pixels, used to anchor the selection label.
    pub anchor: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerShapes {
    pub layer: usize,
    pub style: StyleOptions,
    pub features: Vec<FeatureShape>,
}

impl LayerShapes {
    fn find(&self, geocode: &str) -> Option<&FeatureShape> {
        self.features.iter().find(|shape| shape.geocode == geocode)
    }
}

/// SVG path data for a polygon geometry, projected into world pixels.
///
/// Every ring becomes its own closed subpath so holes render with `evenodd`.
pub fn path_data(geometry: &Geometry) -> String {
    let mut d = String::new();
    for ring in geometry.rings() {
        let points: Vec<(f64, f64)> = ring
            .iter()
            .filter_map(|position| lon_lat(position))
            .map(|(lon, lat)| project(lon, lat))
            .collect();
        if points.len() < 2 {
            continue;
        }
        for (i, (x, y)) in points.iter().enumerate() {
            let command = if i == 0 { 'M' } else { 'L' };
            if !d.is_empty() {
                d.push(' ');
            }
            let _ = write!(d, "{command}{x:.6} {y:.6}");
        }
        d.push_str(" Z");
    }
    d
}

/// Project every loaded feature once; the viewport transform is applied on top.
pub fn build_shapes(widget: &MapWidget) -> Vec<LayerShapes> {
    widget
        .config()
        .geo_layers
        .iter()
        .enumerate()
        .map(|(layer, config)| LayerShapes {
            layer,
            style: config.style_options.clone(),
            features: widget
                .layer_features(layer)
                .iter()
                .filter_map(|feature| {
                    let path = path_data(feature.geometry.as_ref()?);
                    if path.is_empty() {
                        return None;
                    }
                    Some(FeatureShape {
                        geocode: feature.geocode.clone(),
                        path,
                        anchor: feature.bounds().map(|b| {
                            let (lon, lat) = b.center();
                            project(lon, lat)
                        }),
                    })
                })
                .collect(),
        })
        .collect()
}

fn geocode_at(target: Option<web_sys::EventTarget>) -> Option<String> {
    target?
        .dyn_into::<web_sys::Element>()
        .ok()?
        .get_attribute("data-geocode")
}

#[component]
pub fn MapView() -> impl IntoView {
    let WidgetSignal(widget) = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();
    let Shapes(shapes) = expect_context();
    let handles: MapHandles = expect_context();

    let container_ref = NodeRef::<leptos::html::Div>::new();

    let zoom = Memo::new(move |_| viewport.with(Viewport::zoom));
    let visible = Memo::new(move |_| {
        let zoom = zoom.get();
        widget.with(|w| w.as_ref().map(|w| w.visible_layers(zoom)).unwrap_or_default())
    });
    let selected = Memo::new(move |_| {
        widget.with(|w| {
            w.as_ref()
                .map(|w| w.selection().all_selected().to_vec())
                .unwrap_or_default()
        })
    });

    let is_dragging = Rc::new(Cell::new(false));
    let drag_start = Rc::new(Cell::new((0.0f64, 0.0f64)));
    let last = Rc::new(Cell::new((0.0f64, 0.0f64)));

    let local_point = move |e: &MouseEvent| {
        let (cx, cy) = (e.client_x() as f64, e.client_y() as f64);
        container_ref
            .get_untracked()
            .map(|el| {
                let rect = el.get_bounding_client_rect();
                (cx - rect.left(), cy - rect.top())
            })
            .unwrap_or((cx, cy))
    };

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let (x, y) = local_point(&*e);
        viewport.update(|vp| vp.zoom_at(e.delta_y(), x, y));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start = drag_start.clone();
        let last = last.clone();
        move |e: PointerEvent| {
            let point = (e.client_x() as f64, e.client_y() as f64);
            is_dragging.set(true);
            drag_start.set(point);
            last.set(point);
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last = last.clone();
        move |e: PointerEvent| {
            if !is_dragging.get() {
                return;
            }
            let point = (e.client_x() as f64, e.client_y() as f64);
            let (lx, ly) = last.get();
            last.set(point);
            viewport.update(|vp| vp.pan(point.0 - lx, point.1 - ly));
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |_: PointerEvent| is_dragging.set(false)
    };

    let on_pointer_leave = move |_: PointerEvent| is_dragging.set(false);

    let on_click = move |e: MouseEvent| {
        let (sx, sy) = drag_start.get();
        let dx = (e.client_x() as f64 - sx).abs();
        let dy = (e.client_y() as f64 - sy).abs();
        if dx >= CLICK_SLOP_PX || dy >= CLICK_SLOP_PX {
            return;
        }
        if let Some(code) = geocode_at(e.target()) {
            handles.dispatch(WidgetEvent::FeatureClicked(code));
        }
    };

    let base_layers = move || {
        let visible = visible.get();
        shapes.with_value(|layers| {
            layers
                .iter()
                .filter(|layer| visible.contains(&layer.layer))
                .map(|layer| {
                    let style = layer.style.clone();
                    let paths = layer
                        .features
                        .iter()
                        .map(|shape| {
                            let code = shape.geocode.clone();
                            let fill = move || {
                                widget.with(|w| {
                                    w.as_ref()
                                        .map(|w| w.fill_for(&code).to_hex())
                                        .unwrap_or_default()
                                })
                            };
                            view! {
                                <path
                                    d=shape.path.clone()
                                    data-geocode=shape.geocode.clone()
                                    fill=fill
                                    fill-opacity=style.fill_opacity
                                    stroke=style.color.to_hex()
                                    stroke-opacity=style.opacity
                                    stroke-width=style.weight
                                    fill-rule="evenodd"
                                    vector-effect="non-scaling-stroke"
                                />
                            }
                        })
                        .collect_view();
                    view! { <g class="choropleth-layer">{paths}</g> }
                })
                .collect_view()
        })
    };

    // Selected features are drawn again above their layer so their outline is never covered.
    let selected_overlay = move || {
        let visible = visible.get();
        let selected = selected.get();
        let mut hits = Vec::new();
        shapes.with_value(|layers| {
            for code in &selected {
                for layer in layers.iter().filter(|layer| visible.contains(&layer.layer)) {
                    if let Some(shape) = layer.find(code) {
                        hits.push((layer.layer, shape.geocode.clone(), shape.path.clone()));
                    }
                }
            }
        });

        hits.into_iter()
            .map(|(layer, code, path)| {
                let style = widget
                    .with_untracked(|w| w.as_ref().and_then(|w| w.style_for(layer, &code)))
                    .unwrap_or_default();
                // The base layer below already carries the fill.
                view! {
                    <path
                        d=path
                        data-geocode=code
                        fill=SELECTED_OVERLAY_FILL
                        stroke=style.color.to_hex()
                        stroke-opacity=style.opacity
                        stroke-width=style.weight
                        fill-rule="evenodd"
                        vector-effect="non-scaling-stroke"
                    />
                }
            })
            .collect_view()
    };

    let labels = move || {
        let visible = visible.get();
        let selected = selected.get();
        let vp = viewport.get();
        widget.with(|w| {
            let Some(w) = w.as_ref() else {
                return Vec::new();
            };
            selected
                .iter()
                .filter_map(|code| {
                    let text = w.selection_label(code)?;
                    let (wx, wy) = shapes.with_value(|layers| {
                        layers
                            .iter()
                            .filter(|layer| visible.contains(&layer.layer))
                            .find_map(|layer| layer.find(code).and_then(|shape| shape.anchor))
                    })?;
                    let (x, y) = vp.world_to_screen(wx, wy);
                    Some(view! {
                        <text
                            x=x
                            y=y
                            text-anchor="middle"
                            font-size="12"
                            paint-order="stroke"
                            stroke="#ffffff"
                            stroke-width="3"
                            fill="#222222"
                            pointer-events="none"
                        >
                            {text}
                        </text>
                    })
                })
                .collect::<Vec<_>>()
        })
    };

    view! {
        <div
            node_ref=container_ref
            class="choropleth-canvas"
            style="position: absolute; inset: 0; touch-action: none; cursor: grab;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_click
        >
            <svg width="100%" height="100%" style="display: block;">
                <g transform=move || viewport.with(Viewport::svg_transform)>
                    {base_layers}
                    <g class="choropleth-selected">{selected_overlay}</g>
                </g>
                <g class="choropleth-labels">{labels}</g>
            </svg>
        </div>
    }
}
