#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use glam::Vec2;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlCanvasElement};

use crate::config::GameConfig;
use crate::game::GameKind;
use crate::geometry::Rect;
use crate::ice_slide::{IceSlideEvent, IceSlideNotice, Pace};
use crate::input::wasm::IceSlideListeners;
use crate::matching::MatchEvent;
use crate::section::{GamesSection, SectionEvent, SectionNotice};
use crate::snowman::{PartId, SnowmanEvent};
use crate::timing::FrameLoop;

#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Browser handle on a [`GamesSection`].
///
/// Notices are delivered as JSON strings to the handler registered with
/// `set_notice_handler`; the page re-renders from `snapshot_json`.
#[wasm_bindgen]
pub struct WasmGamesSection {
    inner: Rc<RefCell<SectionState>>,
}

#[wasm_bindgen]
impl WasmGamesSection {
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u32, config_xml: Option<String>) -> Result<WasmGamesSection, JsValue> {
        let config = match config_xml {
            Some(xml) => GameConfig::from_xml(&xml).map_err(to_js)?,
            None => GameConfig::default(),
        };
        let section = GamesSection::new(config, u64::from(seed)).map_err(to_js)?;
        Ok(Self {
            inner: Rc::new(RefCell::new(SectionState {
                section,
                listeners: None,
                on_notice: None,
                frames: FrameLoop::new(),
            })),
        })
    }

    pub fn set_notice_handler(&self, handler: Option<js_sys::Function>) {
        self.inner.borrow_mut().on_notice = handler;
    }

    pub fn select(&self, game: &str) -> Result<(), JsValue> {
        let kind: GameKind = game.parse().map_err(to_js)?;
        let mut select_error = None;
        self.apply(|state| match state.section.select(kind) {
            Ok(notices) => {
                state.listeners = None;
                notices
            }
            Err(err) => {
                select_error = Some(err);
                Vec::new()
            }
        });
        match select_error {
            Some(err) => Err(to_js(err)),
            None => Ok(()),
        }
    }

    pub fn back(&self) {
        self.apply(|state| {
            state.listeners = None;
            state.section.back()
        });
    }

    pub fn click_card(&self, index: usize) {
        self.apply(|state| {
            state
                .section
                .dispatch(SectionEvent::Match(MatchEvent::Click(index)))
        });
    }

    pub fn shuffle_cards(&self) {
        self.apply(|state| state.section.dispatch(SectionEvent::Match(MatchEvent::Reset)));
    }

    pub fn drag_start(&self, part: &str) -> Result<(), JsValue> {
        let part: PartId = part.parse().map_err(to_js)?;
        self.apply(|state| {
            state
                .section
                .dispatch(SectionEvent::Snowman(SnowmanEvent::DragStart { part }))
        });
        Ok(())
    }

    pub fn drag_move(&self, part: &str, dx: f32, dy: f32) -> Result<(), JsValue> {
        let part: PartId = part.parse().map_err(to_js)?;
        let delta = Vec2::new(dx, dy);
        self.apply(|state| {
            state
                .section
                .dispatch(SectionEvent::Snowman(SnowmanEvent::DragMove { part, delta }))
        });
        Ok(())
    }

    /// Drops a part; `left`/`top`/`width`/`height` are its bounding box in
    /// board coordinates.
    pub fn drag_end(
        &self,
        part: &str,
        left: f32,
        top: f32,
        width: f32,
        height: f32,
    ) -> Result<(), JsValue> {
        let part: PartId = part.parse().map_err(to_js)?;
        let bounds = Rect::new(left, top, width, height);
        self.apply(|state| {
            state
                .section
                .dispatch(SectionEvent::Snowman(SnowmanEvent::DragEnd { part, bounds }))
        });
        Ok(())
    }

    /// Starts an Ice Slide run and listens for steering input on the page.
    pub fn start_ice_slide(&self, canvas_id: &str, run: bool) -> Result<(), JsValue> {
        let canvas = find_canvas(canvas_id).map_err(to_js)?;
        let pace = if run { Pace::Run } else { Pace::Normal };
        let mut attach_error = None;
        self.apply(|state| {
            state.listeners = None;
            let notices = state
                .section
                .dispatch(SectionEvent::IceSlide(IceSlideEvent::Start(pace)));
            if let Some(input) = state.section.ice_slide_controls() {
                match IceSlideListeners::attach(&canvas, input) {
                    Ok(listeners) => state.listeners = Some(listeners),
                    Err(err) => attach_error = Some(err),
                }
            }
            notices
        });
        match attach_error {
            Some(err) => Err(to_js(err)),
            None => Ok(()),
        }
    }

    /// Resets the active game in place.
    pub fn reset(&self) {
        let mut state = self.inner.borrow_mut();
        state.listeners = None;
        state.section.reset();
    }

    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.borrow().section.snapshot()).map_err(to_js)
    }

    /// Starts advancing the section on every animation frame.
    pub fn start(&self) -> Result<(), JsValue> {
        let Some(generation) = self.inner.borrow_mut().frames.start() else {
            return Ok(());
        };
        request_frame(Rc::clone(&self.inner), generation).map_err(|err| {
            self.inner.borrow_mut().frames.stop();
            to_js(err)
        })
    }

    pub fn stop(&self) {
        self.inner.borrow_mut().frames.stop();
    }
}

impl WasmGamesSection {
    fn apply(&self, action: impl FnOnce(&mut SectionState) -> Vec<SectionNotice>) {
        let notices = action(&mut self.inner.borrow_mut());
        notify(&self.inner, &notices);
    }
}

impl Drop for WasmGamesSection {
    fn drop(&mut self) {
        let mut state = self.inner.borrow_mut();
        state.frames.stop();
        state.listeners = None;
        state.section.back();
    }
}

struct SectionState {
    section: GamesSection,
    listeners: Option<IceSlideListeners>,
    on_notice: Option<js_sys::Function>,
    frames: FrameLoop,
}

impl SectionState {
    /// Advances by the time since the previous frame; `None` once this
    /// loop has been stopped or replaced.
    fn frame(&mut self, generation: u64, timestamp: f64) -> Option<Vec<SectionNotice>> {
        let elapsed = self.frames.tick(generation, timestamp)?;
        let notices = self.section.advance(elapsed);
        if notices
            .iter()
            .any(|n| matches!(n, SectionNotice::IceSlide(IceSlideNotice::GameOver { .. })))
        {
            self.listeners = None;
        }
        Some(notices)
    }
}

fn request_frame(app: Rc<RefCell<SectionState>>, generation: u64) -> Result<()> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let callback = Closure::once_into_js(move |timestamp: f64| {
        let Some(notices) = app.borrow_mut().frame(generation, timestamp) else {
            return;
        };
        notify(&app, &notices);
        if let Err(err) = request_frame(app, generation) {
            web_sys::console::error_1(&JsValue::from_str(&err.to_string()));
        }
    });
    window
        .request_animation_frame(callback.unchecked_ref())
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
    Ok(())
}

/// Hands notices to the page's handler outside of any borrow, so the
/// handler may call back into the section.
fn notify(app: &Rc<RefCell<SectionState>>, notices: &[SectionNotice]) {
    if notices.is_empty() {
        return;
    }
    let Some(handler) = app.borrow().on_notice.clone() else {
        return;
    };
    for notice in notices {
        match serde_json::to_string(notice) {
            Ok(json) => {
                if let Err(err) = handler.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                    web_sys::console::error_1(&err);
                }
            }
            Err(err) => web_sys::console::error_1(&JsValue::from_str(&err.to_string())),
        }
    }
}

fn find_canvas(canvas_id: &str) -> Result<HtmlCanvasElement> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let document = window
        .document()
        .ok_or_else(|| anyhow!("document not available"))?;
    document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| anyhow!("canvas element not found"))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| anyhow!("element is not a canvas"))
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}
