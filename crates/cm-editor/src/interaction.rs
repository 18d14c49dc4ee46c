//! Pointer-driven interaction state machine.
//!
//! One [`Mode`] value describes what the canvas is doing: idle, panning,
//! dragging a node, dragging or resizing a group, or picking arrow
//! endpoints. Background pans and group gestures are allowed while linking;
//! those gestures park the link state and restore it on pointer-up.
//!
//! The controller never keeps authoritative data. It calls the store, then
//! reports through [`Response`] what the presentation layer has to redraw.
//! Pointer positions are screen-space; drags convert the pointer delta to
//! canvas units with the current scale, pans do not.

use crate::input::InputEvent;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use cm_core::id::EntityId;
use cm_core::store::GraphStore;
use cm_render::{HitTarget, Overlay};
use kurbo::{Point, Size, Vec2};
use log::{debug, trace};
use serde::Serialize;
use std::fmt;

// ─── Modes ───────────────────────────────────────────────────────────────

/// Progress of arrow-endpoint picking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    NoSource,
    Source(EntityId),
    /// Both endpoints picked; waiting for the label dialog.
    AwaitingLabel { source: EntityId, target: EntityId },
}

impl LinkState {
    pub fn source(&self) -> Option<EntityId> {
        match *self {
            LinkState::NoSource => None,
            LinkState::Source(id) | LinkState::AwaitingLabel { source: id, .. } => Some(id),
        }
    }

    fn references(&self, id: EntityId) -> bool {
        match *self {
            LinkState::NoSource => false,
            LinkState::Source(s) => s == id,
            LinkState::AwaitingLabel { source, target } => source == id || target == id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Idle,
    PanningMap {
        start: Point,
        offset: Vec2,
        parked: Option<LinkState>,
    },
    DraggingNode {
        id: EntityId,
        start: Point,
        origin: Point,
    },
    DraggingGroup {
        id: EntityId,
        start: Point,
        origin: Point,
        parked: Option<LinkState>,
    },
    ResizingGroup {
        id: EntityId,
        start: Point,
        size: Size,
        parked: Option<LinkState>,
    },
    ArrowLinking(LinkState),
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::PanningMap { .. } => "panning-map",
            Mode::DraggingNode { .. } => "dragging-node",
            Mode::DraggingGroup { .. } => "dragging-group",
            Mode::ResizingGroup { .. } => "resizing-group",
            Mode::ArrowLinking(_) => "arrow-linking",
        }
    }

    /// Whether a pointer gesture is in progress.
    pub fn is_gesture(&self) -> bool {
        !matches!(self, Mode::Idle | Mode::ArrowLinking(_))
    }

    /// Link state, whether active or parked under a gesture.
    pub fn link_state(&self) -> Option<&LinkState> {
        match self {
            Mode::ArrowLinking(link) => Some(link),
            Mode::PanningMap { parked, .. }
            | Mode::DraggingGroup { parked, .. }
            | Mode::ResizingGroup { parked, .. } => parked.as_ref(),
            Mode::Idle | Mode::DraggingNode { .. } => None,
        }
    }

    fn link_state_mut(&mut self) -> Option<&mut LinkState> {
        match self {
            Mode::ArrowLinking(link) => Some(link),
            Mode::PanningMap { parked, .. }
            | Mode::DraggingGroup { parked, .. }
            | Mode::ResizingGroup { parked, .. } => parked.as_mut(),
            Mode::Idle | Mode::DraggingNode { .. } => None,
        }
    }

    /// Drop the link state, active or parked.
    fn leave_linking(&mut self) {
        match self {
            Mode::ArrowLinking(_) => *self = Mode::Idle,
            Mode::PanningMap { parked, .. }
            | Mode::DraggingGroup { parked, .. }
            | Mode::ResizingGroup { parked, .. } => *parked = None,
            Mode::Idle | Mode::DraggingNode { .. } => {}
        }
    }

    /// Mode to return to when the current gesture ends.
    fn after_gesture(&self) -> Mode {
        match self.link_state() {
            Some(link) => Mode::ArrowLinking(*link),
            None => Mode::Idle,
        }
    }
}

// ─── Responses ───────────────────────────────────────────────────────────

/// How much of the presentation must be rebuilt. Ordered by cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Repaint {
    #[default]
    None,
    /// Only the shared layer transform changed.
    Transform,
    /// Positions or sizes changed; arrows must be re-projected.
    Geometry,
    /// Entities or their flags changed.
    Full,
}

/// Request to the dialog collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PromptRequest {
    #[serde(rename_all = "camelCase")]
    ArrowLabel {
        from: EntityId,
        to: EntityId,
        from_name: String,
        to_name: String,
    },
    /// Close any open arrow-label dialog without submitting it.
    Dismiss,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub repaint: Repaint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptRequest>,
    pub status_changed: bool,
}

impl Response {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn repaint(repaint: Repaint) -> Self {
        Self {
            repaint,
            ..Self::default()
        }
    }

    /// Combine two responses; the larger repaint wins.
    pub fn merge(self, other: Response) -> Self {
        Self {
            repaint: self.repaint.max(other.repaint),
            prompt: other.prompt.or(self.prompt),
            status_changed: self.status_changed || other.status_changed,
        }
    }

    fn with_status(mut self) -> Self {
        self.status_changed = true;
        self
    }

    fn with_prompt(mut self, prompt: PromptRequest) -> Self {
        self.prompt = Some(prompt);
        self
    }
}

/// Hint line shown while linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusHint {
    PickSource,
    PickTarget { source_name: String },
    ArrowCreated,
}

impl fmt::Display for StatusHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusHint::PickSource => f.write_str("Click on the source company"),
            StatusHint::PickTarget { source_name } => {
                write!(f, "Source: {source_name} - now click on the target company")
            }
            StatusHint::ArrowCreated => {
                f.write_str("Arrow created! Click on a source company for another, or press Esc")
            }
        }
    }
}

// ─── Controller ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct InteractionController {
    mode: Mode,
    status: Option<StatusHint>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            mode: Mode::Idle,
            status: None,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn link_state(&self) -> Option<&LinkState> {
        self.mode.link_state()
    }

    pub fn is_linking(&self) -> bool {
        self.link_state().is_some()
    }

    pub fn status(&self) -> Option<&StatusHint> {
        self.status.as_ref()
    }

    /// Drawing flags the presentation layer needs from the controller.
    pub fn overlay(&self) -> Overlay {
        Overlay {
            arrow_source: self.link_state().and_then(LinkState::source),
            raised: match self.mode {
                Mode::DraggingNode { id, .. } => Some(id),
                _ => None,
            },
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode.name() != mode.name() {
            debug!("mode {} -> {}", self.mode.name(), mode.name());
        }
        self.mode = mode;
    }

    fn set_status(&mut self, status: Option<StatusHint>) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        true
    }

    /// Dispatch a normalized input event. `target` is what a pointer-down
    /// landed on; it is ignored for every other event.
    pub fn handle(
        &mut self,
        store: &mut GraphStore,
        event: &InputEvent,
        target: HitTarget,
    ) -> Response {
        match event {
            InputEvent::PointerDown { x, y } => self.pointer_down(store, Point::new(*x, *y), target),
            InputEvent::PointerMove { x, y } => self.pointer_move(store, Point::new(*x, *y)),
            InputEvent::PointerUp { .. } => self.pointer_up(store),
            InputEvent::Key {
                key,
                modifiers,
                editing_text,
            } => match ShortcutMap::resolve(key, *modifiers, *editing_text) {
                Some(ShortcutAction::Cancel) => self.cancel(),
                Some(ShortcutAction::DeleteSelected) => self.delete_selected(store),
                None => Response::none(),
            },
        }
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    pub fn pointer_down(&mut self, store: &mut GraphStore, at: Point, target: HitTarget) -> Response {
        if matches!(
            self.link_state(),
            Some(LinkState::AwaitingLabel { .. })
        ) {
            trace!("pointer-down ignored while the label prompt is open");
            return Response::none();
        }
        // A release we never saw: close that gesture before starting another.
        let mut response = if self.mode.is_gesture() {
            self.pointer_up(store)
        } else {
            Response::none()
        };
        let parked = self.link_state().copied();

        let next = match target {
            HitTarget::ArrowDelete(id) => {
                if store.remove_arrow(id) {
                    debug!("removed arrow {id}");
                    response = response.merge(Response::repaint(Repaint::Full));
                }
                return response;
            }
            HitTarget::GroupDelete(id) => {
                if store.remove_group(id) {
                    debug!("removed group {id}");
                    response = response.merge(Response::repaint(Repaint::Full));
                }
                return response;
            }
            HitTarget::Company(id) => {
                let Some(company) = store.company(id) else {
                    return response;
                };
                if parked.is_some() {
                    return response.merge(self.pick(store, id));
                }
                let origin = company.position();
                store.select(id);
                response = response.merge(Response::repaint(Repaint::Full));
                Mode::DraggingNode {
                    id,
                    start: at,
                    origin,
                }
            }
            HitTarget::Group(id) => {
                let Some(group) = store.group(id) else {
                    return response;
                };
                Mode::DraggingGroup {
                    id,
                    start: at,
                    origin: group.position(),
                    parked,
                }
            }
            HitTarget::GroupResize(id) => {
                let Some(group) = store.group(id) else {
                    return response;
                };
                Mode::ResizingGroup {
                    id,
                    start: at,
                    size: group.size(),
                    parked,
                }
            }
            HitTarget::Background => {
                if store.selected().is_some() {
                    store.clear_selection();
                    response = response.merge(Response::repaint(Repaint::Full));
                }
                Mode::PanningMap {
                    start: at,
                    offset: store.transform().offset(),
                    parked,
                }
            }
        };
        self.set_mode(next);
        response
    }

    pub fn pointer_move(&mut self, store: &mut GraphStore, at: Point) -> Response {
        match self.mode {
            Mode::PanningMap { start, offset, .. } => {
                store.set_pan(offset + (at - start));
                Response::repaint(Repaint::Transform)
            }
            Mode::DraggingNode { id, start, origin } => {
                let p = origin + store.transform().screen_delta_to_canvas(at - start);
                store.update_company_position(id, p.x, p.y);
                Response::repaint(Repaint::Geometry)
            }
            Mode::DraggingGroup {
                id, start, origin, ..
            } => {
                let p = origin + store.transform().screen_delta_to_canvas(at - start);
                store.update_group_position(id, p.x, p.y);
                Response::repaint(Repaint::Geometry)
            }
            Mode::ResizingGroup {
                id, start, size, ..
            } => {
                let d = store.transform().screen_delta_to_canvas(at - start);
                store.update_group_size(id, size.width + d.x, size.height + d.y);
                Response::repaint(Repaint::Geometry)
            }
            Mode::Idle | Mode::ArrowLinking(_) => Response::none(),
        }
    }

    /// End the current gesture and persist its result once.
    pub fn pointer_up(&mut self, store: &mut GraphStore) -> Response {
        if !self.mode.is_gesture() {
            return Response::none();
        }
        let repaint = match self.mode {
            // Node drops out of the raised layer.
            Mode::DraggingNode { .. } => Repaint::Full,
            _ => Repaint::None,
        };
        store.save();
        let next = self.mode.after_gesture();
        self.set_mode(next);
        Response::repaint(repaint)
    }

    // ─── Arrow linking ───────────────────────────────────────────────────

    fn pick(&mut self, store: &GraphStore, id: EntityId) -> Response {
        let Some(link) = self.mode.link_state_mut() else {
            return Response::none();
        };
        // A source deleted since it was picked no longer counts.
        if let LinkState::Source(s) = *link
            && store.company(s).is_none()
        {
            *link = LinkState::NoSource;
        }

        let (next, status, prompt) = match *link {
            LinkState::NoSource => {
                let source_name = store.company(id).map(|c| c.name.clone()).unwrap_or_default();
                (
                    LinkState::Source(id),
                    StatusHint::PickTarget { source_name },
                    None::<PromptRequest>,
                )
            }
            LinkState::Source(s) if s == id => (LinkState::NoSource, StatusHint::PickSource, None),
            LinkState::Source(source) => {
                let name = |c: EntityId| store.company(c).map(|c| c.name.clone()).unwrap_or_default();
                let prompt = PromptRequest::ArrowLabel {
                    from: source,
                    to: id,
                    from_name: name(source),
                    to_name: name(id),
                };
                *link = LinkState::AwaitingLabel { source, target: id };
                debug!("arrow endpoints picked: {source} -> {id}");
                return Response::repaint(Repaint::Full).with_prompt(prompt);
            }
            LinkState::AwaitingLabel { .. } => return Response::none(),
        };
        *link = next;
        self.set_status(Some(status));
        Response::repaint(Repaint::Full).with_status()
    }

    /// Enter or leave arrow-linking mode. Entering clears the selection.
    pub fn toggle_arrow_mode(&mut self, store: &mut GraphStore) -> Response {
        let mut response = if self.mode.is_gesture() {
            self.pointer_up(store)
        } else {
            Response::none()
        };
        if self.is_linking() {
            return response.merge(self.cancel());
        }
        store.clear_selection();
        self.set_mode(Mode::ArrowLinking(LinkState::NoSource));
        self.set_status(Some(StatusHint::PickSource));
        response = response.merge(Response::repaint(Repaint::Full).with_status());
        response
    }

    /// Leave arrow-linking mode entirely. No effect outside it.
    pub fn cancel(&mut self) -> Response {
        let Some(link) = self.link_state().copied() else {
            return Response::none();
        };
        self.mode.leave_linking();
        debug!("arrow linking cancelled");
        let changed = self.set_status(None);
        let mut response = Response::repaint(Repaint::Full);
        response.status_changed = changed;
        if matches!(link, LinkState::AwaitingLabel { .. }) {
            response = response.with_prompt(PromptRequest::Dismiss);
        }
        response
    }

    /// Create the pending arrow with `label` (trimmed; may be empty) and go
    /// back to picking a new source.
    pub fn confirm_arrow(&mut self, store: &mut GraphStore, label: &str) -> Response {
        let Some(link) = self.mode.link_state_mut() else {
            return Response::none();
        };
        let LinkState::AwaitingLabel { source, target } = *link else {
            return Response::none();
        };
        *link = LinkState::NoSource;
        let status = match store.add_arrow(source, target, label.trim()) {
            Some(_) => StatusHint::ArrowCreated,
            None => {
                debug!("arrow {source} -> {target} refused, an endpoint is gone");
                StatusHint::PickSource
            }
        };
        self.set_status(Some(status));
        Response::repaint(Repaint::Full).with_status()
    }

    /// The label dialog was cancelled: drop both picks but stay in linking.
    pub fn dismiss_arrow_prompt(&mut self) -> Response {
        let Some(link) = self.mode.link_state_mut() else {
            return Response::none();
        };
        if !matches!(link, LinkState::AwaitingLabel { .. }) {
            return Response::none();
        }
        *link = LinkState::NoSource;
        self.set_status(Some(StatusHint::PickSource));
        Response::repaint(Repaint::Full).with_status()
    }

    // ─── Removal ─────────────────────────────────────────────────────────

    /// Drop controller references to a company that no longer exists.
    pub fn forget(&mut self, id: EntityId) -> Response {
        if let Mode::DraggingNode { id: dragged, .. } = self.mode
            && dragged == id
        {
            self.set_mode(Mode::Idle);
            return Response::repaint(Repaint::Full);
        }
        let Some(link) = self.mode.link_state_mut() else {
            return Response::none();
        };
        if !link.references(id) {
            return Response::none();
        }
        let was_awaiting = matches!(link, LinkState::AwaitingLabel { .. });
        *link = LinkState::NoSource;
        self.set_status(Some(StatusHint::PickSource));
        let response = Response::repaint(Repaint::Full).with_status();
        if was_awaiting {
            response.with_prompt(PromptRequest::Dismiss)
        } else {
            response
        }
    }

    fn delete_selected(&mut self, store: &mut GraphStore) -> Response {
        let Some(id) = store.selected() else {
            return Response::none();
        };
        if !store.remove_company(id) {
            return Response::none();
        }
        Response::repaint(Repaint::Full).merge(self.forget(id))
    }
}
