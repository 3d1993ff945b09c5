use std::cell::RefCell;

use choropleth_shared::WidgetEvent;
use choropleth_shared::timeline::{PlaybackStep, PlayerOptions, YearRange, timestamp_ms_for_year};
use gloo_timers::callback::Interval;
use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crate::app::{MapHandles, Playing, WidgetSignal};

thread_local! {
    static PLAYER_INTERVAL: RefCell<Option<Interval>> = const { RefCell::new(None) };
}

fn stop_interval() {
    // Dropping the interval clears it.
    PLAYER_INTERVAL.with(|slot| slot.borrow_mut().take());
}

/// Move the map to `year` the way the slider reports it: as a timestamp.
fn show_year(handles: MapHandles, year: i32) {
    let event = match timestamp_ms_for_year(year) {
        Some(timestamp_ms) => WidgetEvent::TimeChanged { timestamp_ms },
        None => WidgetEvent::YearChanged(year),
    };
    handles.dispatch(event);
}

fn player_state(handles: MapHandles) -> Option<(YearRange, PlayerOptions, i32)> {
    handles.widget.with_untracked(|w| {
        let w = w.as_ref()?;
        Some((w.year_range()?, w.config().year_slider, w.current_year()))
    })
}

/// Year range slider with play/pause and step controls.
#[component]
pub fn YearSlider() -> impl IntoView {
    let WidgetSignal(widget) = expect_context();
    let Playing(playing) = expect_context();
    let handles: MapHandles = expect_context();

    let range = Memo::new(move |_| widget.with(|w| w.as_ref().and_then(|w| w.year_range())));
    let current = Memo::new(move |_| widget.with(|w| w.as_ref().map(|w| w.current_year())));

    // Stopping is deferred to an effect so the interval is never dropped from inside its own tick.
    Effect::new(move || {
        if !playing.get() {
            stop_interval();
        }
    });
    on_cleanup(stop_interval);

    let play = move || {
        let Some((range, options, year)) = player_state(handles) else {
            return;
        };
        let first = range.play_from(year, &options);
        if first != year {
            show_year(handles, first);
        }
        playing.set(true);

        let interval = Interval::new(options.transition_time.max(1), move || {
            if !playing.get_untracked() {
                return;
            }
            let Some((range, options, year)) = player_state(handles) else {
                playing.set(false);
                return;
            };
            match range.tick(year, &options) {
                PlaybackStep::Advance(next) => show_year(handles, next),
                PlaybackStep::Stop => playing.set(false),
            }
        });
        PLAYER_INTERVAL.with(|slot| *slot.borrow_mut() = Some(interval));
    };

    let on_toggle = move |_| {
        if playing.get_untracked() {
            playing.set(false);
        } else {
            play();
        }
    };

    let step = move |forward: bool| {
        playing.set(false);
        if let Some((range, _, year)) = player_state(handles) {
            let next = if forward {
                range.step_forward(year)
            } else {
                range.step_backward(year)
            };
            if next != year {
                show_year(handles, next);
            }
        }
    };

    let on_input = move |e: web_sys::Event| {
        let Some(input) = e
            .target()
            .and_then(|target| target.dyn_into::<web_sys::HtmlInputElement>().ok())
        else {
            return;
        };
        let Ok(year) = input.value().parse::<i32>() else {
            return;
        };
        if !range.get_untracked().is_some_and(|range| range.contains(year)) {
            return;
        }
        playing.set(false);
        if current.get_untracked() != Some(year) {
            show_year(handles, year);
        }
    };

    view! {
        <Show when=move || range.get().is_some()>
            <div
                class="choropleth-year-slider"
                style="position: absolute; left: 10px; right: 10px; bottom: 20px; display: flex; align-items: center; gap: 8px; background: rgba(255,255,255,0.92); border-radius: 4px; box-shadow: 0 1px 4px rgba(0,0,0,0.3); padding: 6px 10px; font-size: 0.8rem;"
            >
                <button title="Previous year" on:click=move |_| step(false)>"\u{2039}"</button>
                <button
                    title=move || if playing.get() { "Pause" } else { "Play" }
                    on:click=on_toggle
                >
                    {move || if playing.get() { "\u{275a}\u{275a}" } else { "\u{25b6}" }}
                </button>
                <button title="Next year" on:click=move |_| step(true)>"\u{203a}"</button>
                <span>{move || range.get().map(|r| r.start)}</span>
                <input
                    type="range"
                    step="1"
                    style="flex: 1;"
                    min=move || range.get().map(|r| r.start)
                    max=move || range.get().map(|r| r.end)
                    prop:value=move || current.get().map(|year| year.to_string()).unwrap_or_default()
                    on:input=on_input
                />
                <span>{move || range.get().map(|r| r.end)}</span>
                <strong style="min-width: 3em; text-align: right;">{move || current.get()}</strong>
            </div>
        </Show>
    }
}
