use std::sync::Arc;

use anyhow::{anyhow, Result};
use gloo_events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlCanvasElement, KeyboardEvent, TouchEvent};

use super::{InputState, KeyCode, NamedKey};

/// DOM listeners feeding an Ice Slide run's [`InputState`].
///
/// Keys are read on the window, touches on the canvas. Dropping the guard
/// removes every listener and detaches the input handle.
pub struct IceSlideListeners {
    input: Arc<InputState>,
    listeners: Vec<EventListener>,
}

impl IceSlideListeners {
    pub fn attach(canvas: &HtmlCanvasElement, input: Arc<InputState>) -> Result<Self> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let mut listeners = Vec::new();

        {
            let input_state = Arc::clone(&input);
            listeners.push(EventListener::new(&window, "keydown", move |event| {
                let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                    return;
                };
                if let Some(code) = KeyCode::from_name(&event.key()) {
                    if is_steering(code) {
                        event.prevent_default();
                    }
                    input_state.set_key_down(code);
                }
            }));
        }

        {
            let input_state = Arc::clone(&input);
            listeners.push(EventListener::new(&window, "keyup", move |event| {
                let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                    return;
                };
                if let Some(code) = KeyCode::from_name(&event.key()) {
                    input_state.set_key_up(code);
                }
            }));
        }

        {
            let input_state = Arc::clone(&input);
            let target = canvas.clone();
            listeners.push(EventListener::new(canvas, "touchstart", move |event| {
                if let Some(x) = touch_x(&target, event) {
                    input_state.touch_start(x);
                }
            }));
        }

        {
            let input_state = Arc::clone(&input);
            let target = canvas.clone();
            listeners.push(EventListener::new_with_options(
                canvas,
                "touchmove",
                EventListenerOptions::enable_prevent_default(),
                move |event| {
                    event.prevent_default();
                    if let Some(x) = touch_x(&target, event) {
                        input_state.touch_move(x);
                    }
                },
            ));
        }

        {
            let input_state = Arc::clone(&input);
            listeners.push(EventListener::new(canvas, "touchend", move |_| {
                input_state.touch_end();
            }));
        }

        Ok(Self { input, listeners })
    }
}

impl Drop for IceSlideListeners {
    fn drop(&mut self) {
        self.listeners.clear();
        self.input.detach();
    }
}

fn is_steering(code: KeyCode) -> bool {
    matches!(
        code,
        KeyCode::Named(NamedKey::Left) | KeyCode::Named(NamedKey::Right)
    )
}

/// Horizontal position of the first touch, relative to the canvas.
fn touch_x(canvas: &HtmlCanvasElement, event: &web_sys::Event) -> Option<f32> {
    let touch = event.dyn_ref::<TouchEvent>()?.touches().get(0)?;
    let left = canvas.get_bounding_client_rect().left();
    Some((f64::from(touch.client_x()) - left) as f32)
}
