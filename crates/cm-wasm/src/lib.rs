//! WASM bridge for Company Map: exposes the editor core to the browser page.
//!
//! Compiled via `wasm-pack build --target web`. The page forwards raw mouse
//! and keyboard events, owns the dialogs, and redraws from the scene JSON
//! whenever a response asks for it.

#[cfg(target_arch = "wasm32")]
mod storage;

use cm_core::id::EntityId;
use cm_core::metrics::METRIC_CATALOG;
use cm_core::model::{Color, FeatureKind, GroupShape};
use cm_core::persist::{BlobStore, Codec};
use cm_editor::{Editor, EditorConfig, Modifiers, Response};
use log::warn;
use serde_json::json;
use std::fmt::Display;
use wasm_bindgen::prelude::*;

/// The main WASM-facing canvas controller.
///
/// Every interaction from the page goes through this struct. Methods that
/// change state return a small JSON string describing what to redraw.
#[wasm_bindgen]
pub struct CompanyMapCanvas {
    editor: Editor,
}

#[wasm_bindgen]
impl CompanyMapCanvas {
    /// Open the map from `localStorage`. `config_json` may be empty or a
    /// partial `EditorConfig`; bad config falls back to defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Self {
        console_error_panic_hook_setup();

        let mut config = if config_json.trim().is_empty() {
            EditorConfig::default()
        } else {
            EditorConfig::from_json(config_json).unwrap_or_else(|e| {
                warn!("{e}; using defaults");
                EditorConfig::default()
            })
        };
        if config.store.codec != Codec::Json {
            warn!("localStorage holds text only, switching the codec to JSON");
            config.store.codec = Codec::Json;
        }
        Self {
            editor: Editor::open(open_blobs(), config),
        }
    }

    /// Full render packet: transform, groups, nodes and arrows.
    pub fn get_scene_json(&self) -> String {
        serde_json::to_string(&self.editor.scene()).unwrap_or_else(|_| "{}".to_string())
    }

    // ─── Pointer & keyboard ──────────────────────────────────────────────

    /// Handle pointer down at client coordinates. Returns a response JSON:
    /// `{"repaint":"...","prompt":{...}?,"statusChanged":bool,"status":"...","mode":"..."}`
    pub fn handle_pointer_down(&mut self, x: f64, y: f64) -> String {
        let r = self.editor.pointer_down(x, y);
        response_json(&self.editor, &r)
    }

    pub fn handle_pointer_move(&mut self, x: f64, y: f64) -> String {
        let r = self.editor.pointer_move(x, y);
        response_json(&self.editor, &r)
    }

    /// Must be wired to a window-level listener so releases outside the
    /// canvas still end the gesture.
    pub fn handle_pointer_up(&mut self, x: f64, y: f64) -> String {
        let r = self.editor.pointer_up(x, y);
        response_json(&self.editor, &r)
    }

    /// Handle a window-level keydown. Pass `editing_text` when the event
    /// target is an input or textarea so Delete edits the field instead of
    /// removing the selected company.
    pub fn handle_key(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        editing_text: bool,
    ) -> String {
        let modifiers = Modifiers {
            ctrl,
            shift,
            alt,
            meta,
        };
        let r = self.editor.key(key, modifiers, editing_text);
        response_json(&self.editor, &r)
    }

    // ─── Arrow linking ───────────────────────────────────────────────────

    pub fn toggle_arrow_mode(&mut self) -> String {
        let r = self.editor.toggle_arrow_mode();
        response_json(&self.editor, &r)
    }

    pub fn is_arrow_mode(&self) -> bool {
        self.editor.controller().is_linking()
    }

    /// Submit the arrow-label dialog. An empty label is allowed.
    pub fn confirm_arrow(&mut self, label: &str) -> String {
        let r = self.editor.confirm_arrow(label);
        response_json(&self.editor, &r)
    }

    /// The arrow-label dialog was cancelled.
    pub fn cancel_arrow_prompt(&mut self) -> String {
        let r = self.editor.dismiss_arrow_prompt();
        response_json(&self.editor, &r)
    }

    pub fn get_status_text(&self) -> String {
        self.editor.status_text().unwrap_or_default()
    }

    pub fn get_mode(&self) -> String {
        self.editor.controller().mode().name().to_string()
    }

    // ─── Layout feedback ─────────────────────────────────────────────────

    /// Report a node element's rendered size so arrows trim to it.
    pub fn set_node_size(&mut self, id: &str, width: f64, height: f64) -> String {
        let r = self.editor.set_node_size(EntityId::intern(id), width, height);
        response_json(&self.editor, &r)
    }

    // ─── Companies ───────────────────────────────────────────────────────

    /// Returns `{"ok":true,"id":"..."}` or `{"ok":false,"error":"..."}`.
    pub fn add_company(&mut self, name: &str) -> String {
        match self.editor.add_company(name) {
            Ok(c) => json!({ "ok": true, "id": c.id }).to_string(),
            Err(e) => error_json(e),
        }
    }

    pub fn remove_company(&mut self, id: &str) -> String {
        let r = self.editor.remove_company(EntityId::intern(id));
        response_json(&self.editor, &r)
    }

    pub fn remove_selected(&mut self) -> String {
        let r = self.editor.remove_selected();
        response_json(&self.editor, &r)
    }

    pub fn select_company(&mut self, id: &str) -> bool {
        self.editor.select(EntityId::intern(id))
    }

    pub fn clear_selection(&mut self) {
        self.editor.clear_selection();
    }

    /// Selected company id, or empty string.
    pub fn get_selected_id(&self) -> String {
        self.editor
            .store()
            .selected()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    /// Company record for the details panel, or `null`.
    pub fn get_company_json(&self, id: &str) -> String {
        match self.editor.store().company(EntityId::intern(id)) {
            Some(c) => serde_json::to_string(c).unwrap_or_else(|_| "null".to_string()),
            None => "null".to_string(),
        }
    }

    pub fn update_metric(&mut self, company: &str, key: &str, value: &str) -> bool {
        self.editor.update_metric(EntityId::intern(company), key, value)
    }

    // ─── Features ────────────────────────────────────────────────────────

    /// `kind` is `"quantitative"` or `"qualitative"`.
    pub fn add_feature(&mut self, company: &str, kind: &str, name: &str, value: &str) -> String {
        let kind: FeatureKind = match kind.parse() {
            Ok(k) => k,
            Err(e) => return error_json(e),
        };
        match self
            .editor
            .add_feature(EntityId::intern(company), kind, name, value)
        {
            Ok(Some(f)) => json!({ "ok": true, "id": f.id }).to_string(),
            Ok(None) => error_json(format!("unknown company {company:?}")),
            Err(e) => error_json(e),
        }
    }

    pub fn update_feature(
        &mut self,
        company: &str,
        kind: &str,
        feature: &str,
        name: &str,
        value: &str,
    ) -> String {
        let kind: FeatureKind = match kind.parse() {
            Ok(k) => k,
            Err(e) => return error_json(e),
        };
        match self.editor.update_feature(
            EntityId::intern(company),
            kind,
            EntityId::intern(feature),
            name,
            value,
        ) {
            Ok(found) => json!({ "ok": found }).to_string(),
            Err(e) => error_json(e),
        }
    }

    pub fn remove_feature(&mut self, company: &str, kind: &str, feature: &str) -> bool {
        let Ok(kind) = kind.parse::<FeatureKind>() else {
            return false;
        };
        self.editor
            .remove_feature(EntityId::intern(company), kind, EntityId::intern(feature))
    }

    // ─── Groups & arrows ─────────────────────────────────────────────────

    /// `shape` is `"rect"` or `"circle"`; `color` is a hex string.
    pub fn add_group(&mut self, name: &str, shape: &str, color: &str) -> String {
        let shape: GroupShape = match shape.parse() {
            Ok(s) => s,
            Err(e) => return error_json(e),
        };
        let color: Color = match color.parse() {
            Ok(c) => c,
            Err(e) => return error_json(e),
        };
        match self.editor.add_group(name, shape, color) {
            Ok(g) => json!({ "ok": true, "id": g.id }).to_string(),
            Err(e) => error_json(e),
        }
    }

    pub fn remove_group(&mut self, id: &str) -> String {
        let r = self.editor.remove_group(EntityId::intern(id));
        response_json(&self.editor, &r)
    }

    pub fn remove_arrow(&mut self, id: &str) -> String {
        let r = self.editor.remove_arrow(EntityId::intern(id));
        response_json(&self.editor, &r)
    }
}

/// The metric catalog as a JSON array of `{key,label,unit,kind}`.
#[wasm_bindgen]
pub fn metric_catalog_json() -> String {
    serde_json::to_string(METRIC_CATALOG).unwrap_or_else(|_| "[]".to_string())
}

// ─── Helpers ─────────────────────────────────────────────────────────────

#[cfg(target_arch = "wasm32")]
fn open_blobs() -> Box<dyn BlobStore> {
    match storage::LocalStorage::open() {
        Ok(local) => Box::new(local),
        Err(e) => {
            warn!("{e}; changes will not survive a reload");
            Box::new(cm_core::persist::MemoryStore::new())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn open_blobs() -> Box<dyn BlobStore> {
    Box::new(cm_core::persist::MemoryStore::new())
}

fn response_json(editor: &Editor, response: &Response) -> String {
    let mut value = serde_json::to_value(response).unwrap_or_else(|_| json!({}));
    value["status"] = json!(editor.status_text().unwrap_or_default());
    value["mode"] = json!(editor.controller().mode().name());
    value.to_string()
}

fn error_json(e: impl Display) -> String {
    json!({ "ok": false, "error": e.to_string() }).to_string()
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Company Map WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn canvas() -> CompanyMapCanvas {
        CompanyMapCanvas::new("")
    }

    fn parse(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn seeded_scene_has_three_nodes() {
        let scene = parse(&canvas().get_scene_json());
        assert_eq!(scene["nodes"].as_array().map(Vec::len), Some(3));
        assert_eq!(scene["transform"]["scale"], 1.0);
    }

    #[test]
    fn arrow_flow_reports_prompt_and_status() {
        let mut c = canvas();
        let r = parse(&c.toggle_arrow_mode());
        assert_eq!(r["mode"], "arrow-linking");
        assert_eq!(r["status"], "Click on the source company");

        c.handle_pointer_down(300.0, 200.0);
        let r = parse(&c.handle_pointer_down(600.0, 350.0));
        assert_eq!(r["prompt"]["kind"], "arrowLabel");
        assert_eq!(r["prompt"]["fromName"], "DeepMind");
        assert_eq!(r["prompt"]["toName"], "OpenAI");

        let r = parse(&c.confirm_arrow("supplier"));
        assert_eq!(r["repaint"], "full");
        assert_eq!(
            r["status"],
            "Arrow created! Click on a source company for another, or press Esc"
        );
        let scene = parse(&c.get_scene_json());
        assert_eq!(scene["arrows"][0]["label"], "supplier");
    }

    #[test]
    fn dialog_errors_come_back_as_json() {
        let mut c = canvas();
        assert_eq!(
            parse(&c.add_company("  ")),
            json!({ "ok": false, "error": "company name must not be empty" })
        );
        assert_eq!(parse(&c.add_group("EU", "hexagon", "#fff"))["ok"], false);
        assert_eq!(parse(&c.add_group("EU", "circle", "nope"))["ok"], false);
        assert_eq!(parse(&c.add_group("EU", "circle", "#10b981"))["ok"], true);
        assert_eq!(parse(&c.add_feature("comp-1", "other", "a", "b"))["ok"], false);
        assert_eq!(parse(&c.add_feature("comp-404", "qualitative", "a", "b"))["ok"], false);
    }

    #[test]
    fn delete_in_a_text_field_keeps_the_company() {
        let mut c = canvas();
        assert!(c.select_company("comp-1"));
        let r = parse(&c.handle_key("Delete", false, false, false, false, true));
        assert_eq!(r["repaint"], "none");
        assert_eq!(c.get_selected_id(), "comp-1");

        let r = parse(&c.handle_key("Delete", false, false, false, false, false));
        assert_eq!(r["repaint"], "full");
        assert_eq!(c.get_company_json("comp-1"), "null");
    }

    #[test]
    fn company_lookup() {
        let mut c = canvas();
        let id = parse(&c.add_company("Mistral"))["id"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(c.select_company(&id));
        assert_eq!(c.get_selected_id(), id);
        assert_eq!(parse(&c.get_company_json(&id))["name"], "Mistral");
        assert_eq!(c.get_company_json("ghost"), "null");
        assert!(c.update_metric(&id, "eps_2025", "3.1"));
    }

    #[test]
    fn msgpack_config_is_forced_to_json() {
        let c = CompanyMapCanvas::new(r#"{"store":{"codec":"msgpack"}}"#);
        assert_eq!(c.editor.store().config().codec, Codec::Json);
        let bad = CompanyMapCanvas::new("{not json");
        assert_eq!(bad.editor.store().company_count(), 3);
    }

    #[test]
    fn catalog_lists_every_metric() {
        let catalog = parse(&metric_catalog_json());
        assert_eq!(catalog.as_array().map(Vec::len), Some(METRIC_CATALOG.len()));
        assert_eq!(catalog[0]["key"], "pe_12m_fw");
    }
}
