// orgscan-core/src/application/factory.rs

use serde_json::{Map, Value};

use crate::domain::dependency::DependencyGraph;
use crate::domain::entity::{Entity, EntityType};
use crate::domain::error::DomainError;
use crate::domain::scoring::{CodeScanner, ScoringEngine};

/// Turns raw property bags into sealed, optionally scored records. Shared by
/// every dataset of a run.
pub struct DataFactory {
    engine: ScoringEngine,
    scanner: CodeScanner,
}

impl DataFactory {
    pub fn new(engine: ScoringEngine) -> Result<Self, DomainError> {
        Ok(Self {
            engine,
            scanner: CodeScanner::new()?,
        })
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub fn scanner(&self) -> &CodeScanner {
        &self.scanner
    }

    /// Builds a record with exactly the declared fields of `entity_type`.
    /// Types that take part in dependency scoring get their fragment of
    /// `dependencies` attached.
    pub fn create(
        &self,
        entity_type: EntityType,
        properties: Map<String, Value>,
        dependencies: Option<&DependencyGraph>,
    ) -> Result<Entity, DomainError> {
        let mut entity = Entity::from_properties(entity_type, properties)?;
        if entity_type.has_dependencies() {
            if let Some(graph) = dependencies {
                let fragment = graph.fragment([entity.id()]);
                entity.attach_dependencies(fragment);
            }
        }
        Ok(entity)
    }

    pub fn compute_score(&self, entity: &mut Entity) {
        self.engine.compute_score(entity);
    }

    pub fn create_with_score(
        &self,
        entity_type: EntityType,
        properties: Map<String, Value>,
        dependencies: Option<&DependencyGraph>,
    ) -> Result<Entity, DomainError> {
        let mut entity = self.create(entity_type, properties, dependencies)?;
        self.compute_score(&mut entity);
        Ok(entity)
    }
}
