//! Company graph: companies are nodes, arrows are directed edges.
//!
//! Backed by a `StableDiGraph` so indices stay valid across removals. Because
//! petgraph reuses vacated slots, insertion order is tracked separately;
//! it is what serialization and rendering iterate over.

use crate::id::EntityId;
use crate::model::{Arrow, Company};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct CompanyGraph {
    graph: StableDiGraph<Company, Arrow>,
    company_index: HashMap<EntityId, NodeIndex>,
    arrow_index: HashMap<EntityId, EdgeIndex>,
    company_order: Vec<EntityId>,
    arrow_order: Vec<EntityId>,
}

impl CompanyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Companies ───────────────────────────────────────────────────────

    /// Insert a company. Returns `false` (and leaves the graph untouched) if
    /// its id is already present.
    pub fn insert_company(&mut self, company: Company) -> bool {
        let id = company.id;
        if self.company_index.contains_key(&id) {
            return false;
        }
        let idx = self.graph.add_node(company);
        self.company_index.insert(id, idx);
        self.company_order.push(id);
        true
    }

    /// Remove a company together with every arrow that starts or ends at it.
    /// Returns the removed company and the ids of the removed arrows.
    pub fn remove_company(&mut self, id: EntityId) -> Option<(Company, Vec<EntityId>)> {
        let idx = self.company_index.remove(&id)?;
        let dropped: Vec<EntityId> = self
            .graph
            .edges_directed(idx, petgraph::Direction::Outgoing)
            .chain(
                self.graph
                    .edges_directed(idx, petgraph::Direction::Incoming)
                    .filter(|e| e.source() != idx),
            )
            .map(|e| e.weight().id)
            .collect();
        for arrow_id in &dropped {
            self.arrow_index.remove(arrow_id);
        }
        self.arrow_order.retain(|a| !dropped.contains(a));
        self.company_order.retain(|c| *c != id);
        // Incident edges go with the node.
        let company = self.graph.remove_node(idx)?;
        Some((company, dropped))
    }

    pub fn company(&self, id: EntityId) -> Option<&Company> {
        self.company_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn company_mut(&mut self, id: EntityId) -> Option<&mut Company> {
        self.company_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    pub fn contains_company(&self, id: EntityId) -> bool {
        self.company_index.contains_key(&id)
    }

    /// Companies in insertion order.
    pub fn companies(&self) -> impl Iterator<Item = &Company> + '_ {
        self.company_order
            .iter()
            .filter_map(|id| self.company(*id))
    }

    pub fn company_count(&self) -> usize {
        self.company_order.len()
    }

    // ─── Arrows ──────────────────────────────────────────────────────────

    /// Insert an arrow between two existing companies. Returns `false` if an
    /// endpoint is missing or the id is taken.
    pub fn insert_arrow(&mut self, arrow: Arrow) -> bool {
        let (Some(&from), Some(&to)) = (
            self.company_index.get(&arrow.from),
            self.company_index.get(&arrow.to),
        ) else {
            return false;
        };
        if self.arrow_index.contains_key(&arrow.id) {
            return false;
        }
        let id = arrow.id;
        let edge = self.graph.add_edge(from, to, arrow);
        self.arrow_index.insert(id, edge);
        self.arrow_order.push(id);
        true
    }

    pub fn remove_arrow(&mut self, id: EntityId) -> Option<Arrow> {
        let edge = self.arrow_index.remove(&id)?;
        self.arrow_order.retain(|a| *a != id);
        self.graph.remove_edge(edge)
    }

    pub fn arrow(&self, id: EntityId) -> Option<&Arrow> {
        self.arrow_index
            .get(&id)
            .and_then(|e| self.graph.edge_weight(*e))
    }

    pub fn contains_arrow(&self, id: EntityId) -> bool {
        self.arrow_index.contains_key(&id)
    }

    /// Arrows in insertion order.
    pub fn arrows(&self) -> impl Iterator<Item = &Arrow> + '_ {
        self.arrow_order.iter().filter_map(|id| self.arrow(*id))
    }

    pub fn arrow_count(&self) -> usize {
        self.arrow_order.len()
    }

    /// Arrows leaving or entering the given company.
    pub fn arrows_touching(&self, id: EntityId) -> Vec<&Arrow> {
        let Some(&idx) = self.company_index.get(&id) else {
            return Vec::new();
        };
        // A self-loop shows up in both directions; count it once.
        self.graph
            .edges_directed(idx, petgraph::Direction::Outgoing)
            .chain(
                self.graph
                    .edges_directed(idx, petgraph::Direction::Incoming)
                    .filter(|e| e.source() != idx),
            )
            .map(|e| e.weight())
            .collect()
    }
}
