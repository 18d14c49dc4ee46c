//! Editor facade.
//!
//! Bundles the store, the interaction controller and host-measured node
//! sizes behind one API. Hosts feed it raw screen-space input and
//! dialog results; it answers with [`Response`]s and fresh [`Scene`]s.

use crate::input::{InputEvent, Modifiers};
use crate::interaction::{InteractionController, Repaint, Response};
use cm_core::config::StoreConfig;
use cm_core::id::EntityId;
use cm_core::model::{Color, Company, Feature, FeatureKind, Group, GroupShape};
use cm_core::persist::BlobStore;
use cm_core::store::GraphStore;
use cm_render::{HitTarget, NodeSizes, RenderConfig, Scene, build_scene, hit_test};
use kurbo::Point;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("invalid editor config: {0}")]
    Config(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub store: StoreConfig,
    pub render: RenderConfig,
}

impl EditorConfig {
    /// Parse a possibly partial JSON config; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Trim dialog input and reject it when nothing is left.
fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, EditorError> {
    let value = value.trim();
    if value.is_empty() {
        Err(EditorError::EmptyField(field))
    } else {
        Ok(value)
    }
}

pub struct Editor {
    store: GraphStore,
    controller: InteractionController,
    sizes: NodeSizes,
    render: RenderConfig,
}

impl Editor {
    pub fn open(blobs: Box<dyn BlobStore>, config: EditorConfig) -> Self {
        Self::with_store(GraphStore::open(blobs, config.store), config.render)
    }

    /// Wrap an already opened store.
    pub fn with_store(store: GraphStore, render: RenderConfig) -> Self {
        Self {
            store,
            controller: InteractionController::new(),
            sizes: NodeSizes::new(),
            render,
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.render
    }

    pub fn scene(&self) -> Scene {
        build_scene(
            &self.store,
            &self.sizes,
            &self.controller.overlay(),
            &self.render,
        )
    }

    /// Status line text while linking.
    pub fn status_text(&self) -> Option<String> {
        self.controller.status().map(ToString::to_string)
    }

    /// What sits under a screen-space point.
    pub fn hit_test_screen(&self, x: f64, y: f64) -> HitTarget {
        let canvas = self.store.transform().screen_to_canvas(Point::new(x, y));
        hit_test(&self.scene(), canvas)
    }

    // ─── Input ───────────────────────────────────────────────────────────

    pub fn handle(&mut self, event: &InputEvent) -> Response {
        let target = match event {
            InputEvent::PointerDown { x, y } => self.hit_test_screen(*x, *y),
            _ => HitTarget::Background,
        };
        let removed = self.store.selected();
        let response = self.controller.handle(&mut self.store, event, target);
        // Delete-key removals bypass `remove_company`; drop the stale size.
        if let Some(id) = removed
            && self.store.company(id).is_none()
        {
            self.sizes.remove(id);
        }
        response
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> Response {
        self.handle(&InputEvent::from_pointer_down(x, y))
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> Response {
        self.handle(&InputEvent::from_pointer_move(x, y))
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> Response {
        self.handle(&InputEvent::from_pointer_up(x, y))
    }

    /// Hosts must pass `editing_text` for keys typed into their own inputs,
    /// otherwise Delete in a metric field removes the selected company.
    pub fn key(&mut self, key: &str, modifiers: Modifiers, editing_text: bool) -> Response {
        self.handle(&InputEvent::key(key, modifiers, editing_text))
    }

    pub fn toggle_arrow_mode(&mut self) -> Response {
        self.controller.toggle_arrow_mode(&mut self.store)
    }

    pub fn cancel(&mut self) -> Response {
        self.controller.cancel()
    }

    pub fn confirm_arrow(&mut self, label: &str) -> Response {
        self.controller.confirm_arrow(&mut self.store, label)
    }

    pub fn dismiss_arrow_prompt(&mut self) -> Response {
        self.controller.dismiss_arrow_prompt()
    }

    /// Record a node's rendered size as measured by the host.
    pub fn set_node_size(&mut self, id: EntityId, width: f64, height: f64) -> Response {
        if self.store.company(id).is_none() {
            return Response::none();
        }
        self.sizes.set(id, width, height);
        Response::repaint(Repaint::Geometry)
    }

    // ─── Dialog-backed operations ────────────────────────────────────────

    pub fn add_company(&mut self, name: &str) -> Result<Company, EditorError> {
        let name = required("company name", name)?;
        Ok(self.store.add_company(name))
    }

    pub fn remove_company(&mut self, id: EntityId) -> Response {
        if !self.store.remove_company(id) {
            return Response::none();
        }
        self.sizes.remove(id);
        Response::repaint(Repaint::Full).merge(self.controller.forget(id))
    }

    pub fn remove_selected(&mut self) -> Response {
        match self.store.selected() {
            Some(id) => self.remove_company(id),
            None => Response::none(),
        }
    }

    pub fn select(&mut self, id: EntityId) -> bool {
        self.store.select(id)
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }

    pub fn add_feature(
        &mut self,
        company: EntityId,
        kind: FeatureKind,
        name: &str,
        value: &str,
    ) -> Result<Option<Feature>, EditorError> {
        let name = required("feature name", name)?;
        let value = required("feature value", value)?;
        Ok(self.store.add_feature(company, kind, name, value))
    }

    pub fn update_feature(
        &mut self,
        company: EntityId,
        kind: FeatureKind,
        feature: EntityId,
        name: &str,
        value: &str,
    ) -> Result<bool, EditorError> {
        let name = required("feature name", name)?;
        let value = required("feature value", value)?;
        Ok(self.store.update_feature(company, kind, feature, name, value))
    }

    pub fn remove_feature(&mut self, company: EntityId, kind: FeatureKind, feature: EntityId) -> bool {
        self.store.remove_feature(company, kind, feature)
    }

    /// Metric values are optional; an empty value clears the metric.
    pub fn update_metric(&mut self, company: EntityId, key: &str, value: &str) -> bool {
        self.store.update_metric(company, key, value.trim())
    }

    pub fn add_group(
        &mut self,
        name: &str,
        shape: GroupShape,
        color: Color,
    ) -> Result<Group, EditorError> {
        let name = required("group name", name)?;
        let group = self.store.add_group(name, shape, color);
        debug!("group {} added via dialog", group.id);
        Ok(group)
    }

    pub fn remove_group(&mut self, id: EntityId) -> Response {
        if self.store.remove_group(id) {
            Response::repaint(Repaint::Full)
        } else {
            Response::none()
        }
    }

    pub fn remove_arrow(&mut self, id: EntityId) -> Response {
        if self.store.remove_arrow(id) {
            Response::repaint(Repaint::Full)
        } else {
            Response::none()
        }
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("store", &self.store)
            .field("mode", self.controller.mode())
            .finish()
    }
}
