//! Graph state store: the single source of truth for companies, groups,
//! arrows, the view transform, and the current selection.
//!
//! Every structural mutation writes the full snapshot before returning.
//! Position and size updates issued during a drag are gesture-scoped: they
//! change memory only, and the interaction layer calls [`GraphStore::save`]
//! once when the gesture ends.
//!
//! Mutations that name an unknown id are silent no-ops. Persistence failures
//! are logged and swallowed; the in-memory state stays authoritative.

use crate::config::{SpawnZone, StoreConfig};
use crate::graph::CompanyGraph;
use crate::id::{EntityId, IdSource, SequentialIds, prefix};
use crate::model::*;
use crate::persist::{BlobStore, seed_snapshot};
use kurbo::Vec2;
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct GraphStore {
    graph: CompanyGraph,
    groups: Vec<Group>,
    transform: Transform,
    selected: Option<EntityId>,
    blobs: Box<dyn BlobStore>,
    ids: Box<dyn IdSource>,
    rng: StdRng,
    config: StoreConfig,
}

impl GraphStore {
    /// Open the store, loading the persisted snapshot or seeding defaults.
    pub fn open(blobs: Box<dyn BlobStore>, config: StoreConfig) -> Self {
        Self::open_with(
            blobs,
            config,
            Box::new(SequentialIds::new()),
            StdRng::from_entropy(),
        )
    }

    /// Open with an explicit id source and placement RNG.
    pub fn open_with(
        blobs: Box<dyn BlobStore>,
        config: StoreConfig,
        ids: Box<dyn IdSource>,
        rng: StdRng,
    ) -> Self {
        let mut store = Self {
            graph: CompanyGraph::new(),
            groups: Vec::new(),
            transform: Transform::IDENTITY,
            selected: None,
            blobs,
            ids,
            rng,
            config,
        };
        match store.load_snapshot() {
            Some(snapshot) => store.install(snapshot),
            None => {
                store.install(seed_snapshot());
                store.save();
            }
        }
        store
    }

    fn load_snapshot(&self) -> Option<Snapshot> {
        let key = &self.config.storage_key;
        let bytes = match self.blobs.load(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no snapshot under {key:?}, seeding defaults");
                return None;
            }
            Err(e) => {
                warn!("could not read snapshot {key:?}: {e}");
                return None;
            }
        };
        match self.config.codec.decode(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("discarding stored snapshot {key:?}: {e}");
                None
            }
        }
    }

    /// Replace all state with `snapshot`.
    fn install(&mut self, snapshot: Snapshot) {
        self.graph = CompanyGraph::new();
        self.selected = None;
        self.transform = snapshot.transform;

        for company in snapshot.companies {
            self.observe_entity(&company);
            self.graph.insert_company(company);
        }
        for arrow in snapshot.arrows {
            self.ids.observe(arrow.id);
            let id = arrow.id;
            if self.graph.contains_arrow(id) {
                warn!("dropping arrow {id}, the id is already taken");
            } else if !self.graph.insert_arrow(arrow) {
                warn!("dropping arrow {id} with a missing endpoint");
            }
        }
        let mut groups = snapshot.groups;
        for group in &mut groups {
            self.ids.observe(group.id);
            let size = self.config.clamp_group_size(group.width, group.height);
            if size != group.size() {
                debug!("group {} grown to the minimum size on load", group.id);
                group.width = size.width;
                group.height = size.height;
            }
        }
        self.groups = groups;
    }

    fn observe_entity(&mut self, company: &Company) {
        self.ids.observe(company.id);
        for f in company.quantitative.iter().chain(company.qualitative.iter()) {
            self.ids.observe(f.id);
        }
    }

    /// Whether any entity of any kind already uses `id`.
    fn id_in_use(&self, id: EntityId) -> bool {
        self.graph.contains_company(id)
            || self.graph.contains_arrow(id)
            || self.groups.iter().any(|g| g.id == id)
            || self.graph.companies().any(|c| {
                c.quantitative
                    .iter()
                    .chain(c.qualitative.iter())
                    .any(|f| f.id == id)
            })
    }

    fn fresh_id(&mut self, prefix: &str) -> EntityId {
        loop {
            let id = self.ids.next(prefix);
            if !self.id_in_use(id) {
                return id;
            }
            trace!("id {id} already in use, drawing another");
        }
    }

    fn spawn_point(&mut self, zone: SpawnZone) -> (f64, f64) {
        let x = zone.x + self.rng.gen_range(0.0..1.0) * zone.width;
        let y = zone.y + self.rng.gen_range(0.0..1.0) * zone.height;
        (x, y)
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// The full persisted record of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            companies: self.graph.companies().cloned().collect(),
            groups: self.groups.clone(),
            arrows: self.graph.arrows().cloned().collect(),
            transform: self.transform,
        }
    }

    /// Write the full snapshot. Failures are logged, never returned.
    pub fn save(&mut self) {
        let snapshot = self.snapshot();
        let result = self
            .config
            .codec
            .encode(&snapshot)
            .and_then(|bytes| self.blobs.save(&self.config.storage_key, &bytes));
        match result {
            Ok(()) => trace!("saved snapshot under {:?}", self.config.storage_key),
            Err(e) => warn!("save failed: {e}"),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ─── Companies ───────────────────────────────────────────────────────

    /// Create a company at a random spot inside the spawn zone.
    pub fn add_company(&mut self, name: &str) -> Company {
        let id = self.fresh_id(prefix::COMPANY);
        let zone = self.config.company_spawn;
        let (x, y) = self.spawn_point(zone);
        let company = Company::new(id, name, x, y);
        self.graph.insert_company(company.clone());
        debug!("added company {id} {name:?}");
        self.save();
        company
    }

    pub fn company(&self, id: EntityId) -> Option<&Company> {
        self.graph.company(id)
    }

    /// Companies in creation order.
    pub fn companies(&self) -> impl Iterator<Item = &Company> + '_ {
        self.graph.companies()
    }

    pub fn company_count(&self) -> usize {
        self.graph.company_count()
    }

    /// Gesture-scoped: not persisted until [`GraphStore::save`].
    pub fn update_company_position(&mut self, id: EntityId, x: f64, y: f64) {
        if let Some(c) = self.graph.company_mut(id) {
            c.x = x;
            c.y = y;
            trace!("company {id} -> ({x:.1}, {y:.1})");
        }
    }

    /// Remove a company and every arrow that references it, in one step.
    /// Clears the selection if it pointed at the company.
    pub fn remove_company(&mut self, id: EntityId) -> bool {
        let Some((_, dropped)) = self.graph.remove_company(id) else {
            return false;
        };
        if self.selected == Some(id) {
            self.selected = None;
        }
        debug!("removed company {id} and {} arrow(s)", dropped.len());
        self.save();
        true
    }

    /// Overwrite one metric value. The key is not checked against the catalog.
    pub fn update_metric(&mut self, company: EntityId, key: &str, value: &str) -> bool {
        let Some(c) = self.graph.company_mut(company) else {
            return false;
        };
        c.metrics.set(key, value);
        self.save();
        true
    }

    // ─── Features ────────────────────────────────────────────────────────

    pub fn add_feature(
        &mut self,
        company: EntityId,
        kind: FeatureKind,
        name: &str,
        value: &str,
    ) -> Option<Feature> {
        if !self.graph.contains_company(company) {
            return None;
        }
        let feature = Feature {
            id: self.fresh_id(prefix::FEATURE),
            name: name.to_string(),
            value: value.to_string(),
        };
        self.graph
            .company_mut(company)?
            .features_mut(kind)
            .push(feature.clone());
        self.save();
        Some(feature)
    }

    pub fn update_feature(
        &mut self,
        company: EntityId,
        kind: FeatureKind,
        feature: EntityId,
        name: &str,
        value: &str,
    ) -> bool {
        let Some(f) = self
            .graph
            .company_mut(company)
            .and_then(|c| c.features_mut(kind).iter_mut().find(|f| f.id == feature))
        else {
            return false;
        };
        f.name = name.to_string();
        f.value = value.to_string();
        self.save();
        true
    }

    pub fn remove_feature(&mut self, company: EntityId, kind: FeatureKind, feature: EntityId) -> bool {
        let Some(c) = self.graph.company_mut(company) else {
            return false;
        };
        let list = c.features_mut(kind);
        let before = list.len();
        list.retain(|f| f.id != feature);
        if list.len() == before {
            return false;
        }
        self.save();
        true
    }

    // ─── Arrows ──────────────────────────────────────────────────────────

    /// Connect two existing, distinct companies. `None` if either is unknown
    /// or both ids are the same.
    pub fn add_arrow(&mut self, from: EntityId, to: EntityId, label: &str) -> Option<Arrow> {
        if from == to || !self.graph.contains_company(from) || !self.graph.contains_company(to) {
            return None;
        }
        let id = self.fresh_id(prefix::ARROW);
        let arrow = Arrow {
            id,
            from,
            to,
            label: label.to_string(),
        };
        if !self.graph.insert_arrow(arrow.clone()) {
            return None;
        }
        debug!("added arrow {id}: {from} -> {to}");
        self.save();
        Some(arrow)
    }

    pub fn remove_arrow(&mut self, id: EntityId) -> bool {
        if self.graph.remove_arrow(id).is_none() {
            return false;
        }
        self.save();
        true
    }

    pub fn arrow(&self, id: EntityId) -> Option<&Arrow> {
        self.graph.arrow(id)
    }

    /// Arrows in creation order.
    pub fn arrows(&self) -> impl Iterator<Item = &Arrow> + '_ {
        self.graph.arrows()
    }

    pub fn arrow_count(&self) -> usize {
        self.graph.arrow_count()
    }

    pub fn arrows_touching(&self, company: EntityId) -> Vec<&Arrow> {
        self.graph.arrows_touching(company)
    }

    // ─── Groups ──────────────────────────────────────────────────────────

    /// Create a group of the default size at a random spot in the spawn zone.
    pub fn add_group(&mut self, name: &str, shape: GroupShape, color: Color) -> Group {
        let id = self.fresh_id(prefix::GROUP);
        let zone = self.config.group_spawn;
        let (x, y) = self.spawn_point(zone);
        let (width, height) = self.config.group_size;
        let group = Group {
            id,
            name: name.to_string(),
            shape,
            color,
            x,
            y,
            width,
            height,
        };
        self.groups.push(group.clone());
        debug!("added group {id} {name:?}");
        self.save();
        group
    }

    pub fn remove_group(&mut self, id: EntityId) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g.id != id);
        if self.groups.len() == before {
            return false;
        }
        self.save();
        true
    }

    pub fn group(&self, id: EntityId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Gesture-scoped: not persisted until [`GraphStore::save`].
    pub fn update_group_position(&mut self, id: EntityId, x: f64, y: f64) {
        if let Some(g) = self.groups.iter_mut().find(|g| g.id == id) {
            g.x = x;
            g.y = y;
        }
    }

    /// Gesture-scoped. Width and height are clamped to the configured minimum.
    pub fn update_group_size(&mut self, id: EntityId, width: f64, height: f64) {
        let size = self.config.clamp_group_size(width, height);
        if let Some(g) = self.groups.iter_mut().find(|g| g.id == id) {
            g.width = size.width;
            g.height = size.height;
        }
    }

    // ─── View transform ──────────────────────────────────────────────────

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Gesture-scoped pan update; the scale is left alone.
    pub fn set_pan(&mut self, offset: Vec2) {
        self.transform.x = offset.x;
        self.transform.y = offset.y;
    }

    /// Replace the whole transform and persist it. Invalid transforms are ignored.
    pub fn set_transform(&mut self, transform: Transform) -> bool {
        if !transform.is_valid() {
            return false;
        }
        self.transform = transform;
        self.save();
        true
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn selected(&self) -> Option<EntityId> {
        self.selected
    }

    /// Select a company, deselecting any other. Unknown ids are ignored.
    pub fn select(&mut self, id: EntityId) -> bool {
        if !self.graph.contains_company(id) {
            return false;
        }
        self.selected = Some(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("companies", &self.graph.company_count())
            .field("arrows", &self.graph.arrow_count())
            .field("groups", &self.groups.len())
            .field("transform", &self.transform)
            .field("selected", &self.selected)
            .finish()
    }
}
