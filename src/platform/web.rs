//! Browser bindings
//!
//! The page owns the camera and the pose model. It hands the engine a
//! `request(timestamp)` callback, pushes results back through
//! `push_landmarks` / `push_no_body` / `report_failure`, and drives `tick`
//! from `requestAnimationFrame`. Snapshots are returned as JSON.

use wasm_bindgen::prelude::*;

use crate::engine::Engine;
use crate::error::CollaboratorFailure;
use crate::pose::{Landmark, PoseMailbox, PoseReport, PoseSource};
use crate::settings::Settings;
use crate::sim::PauseReason;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    // Fails only if a logger is already installed
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("Pose Dodge engine loaded");
}

/// Pose source backed by JavaScript callbacks
struct JsPoseSource {
    request: js_sys::Function,
    release: Option<js_sys::Function>,
}

impl PoseSource for JsPoseSource {
    fn prime(&mut self, _mailbox: PoseMailbox) -> Result<(), CollaboratorFailure> {
        // Results come back through WebEngine's push_* methods
        Ok(())
    }

    fn request(&mut self, timestamp_ms: f64) -> Result<(), CollaboratorFailure> {
        self.request
            .call1(&JsValue::NULL, &JsValue::from_f64(timestamp_ms))
            .map(|_| ())
            .map_err(|err| {
                CollaboratorFailure::new("pose-model", format!("request callback threw: {:?}", err))
            })
    }

    fn release(&mut self) {
        if let Some(release) = &self.release
            && let Err(err) = release.call0(&JsValue::NULL)
        {
            log::warn!("pose release callback threw: {:?}", err);
        }
    }
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_reason(name: &str) -> Option<PauseReason> {
    match name {
        "user" => Some(PauseReason::User),
        "system" => Some(PauseReason::System),
        _ => None,
    }
}

/// Engine handle exported to JavaScript
#[wasm_bindgen]
pub struct WebEngine {
    engine: Engine,
    mailbox: PoseMailbox,
}

#[wasm_bindgen]
impl WebEngine {
    /// `settings_json` may be omitted for defaults
    #[wasm_bindgen(constructor)]
    pub fn new(
        settings_json: Option<String>,
        seed: f64,
        request: js_sys::Function,
        release: Option<js_sys::Function>,
    ) -> Result<WebEngine, JsValue> {
        let settings = match settings_json {
            Some(json) => Settings::from_json(&json).map_err(js_error)?,
            None => Settings::default(),
        };
        let source = JsPoseSource { request, release };
        let engine = Engine::new(settings, seed as u64, Box::new(source)).map_err(js_error)?;
        let mailbox = engine.mailbox();
        Ok(WebEngine { engine, mailbox })
    }

    pub fn start(&mut self) -> Result<(), JsValue> {
        self.engine.start().map_err(js_error)
    }

    pub fn tick(&mut self, timestamp_ms: f64) -> Result<(), JsValue> {
        self.engine.tick(timestamp_ms).map_err(js_error)
    }

    pub fn dispose(&mut self) {
        self.engine.dispose();
    }

    /// `"user"` or `"system"`
    pub fn pause(&mut self, reason: &str) -> bool {
        parse_reason(reason).is_some_and(|reason| self.engine.pause(reason))
    }

    pub fn resume(&mut self, reason: &str) -> bool {
        parse_reason(reason).is_some_and(|reason| self.engine.resume(reason))
    }

    /// JSON array of `{x, y, visibility}` in camera space
    pub fn push_landmarks(&self, landmarks_json: &str) -> Result<bool, JsValue> {
        let landmarks: Vec<Landmark> = serde_json::from_str(landmarks_json).map_err(js_error)?;
        Ok(self.mailbox.post(PoseReport::Body(landmarks)))
    }

    pub fn push_no_body(&self) -> bool {
        self.mailbox.post(PoseReport::NoBody)
    }

    /// Camera permission denied, model failed to load, etc.
    pub fn report_failure(&self, collaborator: &str, reason: &str) -> bool {
        self.mailbox
            .post(PoseReport::Failed(CollaboratorFailure::new(collaborator, reason)))
    }

    /// Last published frame as JSON
    pub fn snapshot(&self) -> Result<Option<String>, JsValue> {
        self.engine
            .snapshot()
            .map(serde_json::to_string)
            .transpose()
            .map_err(js_error)
    }

    pub fn high_scores(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.engine.high_scores()).map_err(js_error)
    }
}
