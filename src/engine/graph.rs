//! Dependency and blocker edges between entities of the same kind.
//!
//! Dependency edges per kind form a DAG. Every insert is checked for
//! reachability first, so a rejected edge never touches the store.

use std::collections::{HashSet, VecDeque};

use chrono::Utc;
use uuid::Uuid;

use crate::db::Store;
use crate::error::{Error, Result};
use crate::models::{Blocker, Dependency, EntityKind, StartReadiness, Status};

/// Graph operations scoped to one store transaction.
pub struct DependencyGraph<'s, 'c> {
    store: &'s Store<'c>,
}

impl<'s, 'c> DependencyGraph<'s, 'c> {
    pub fn new(store: &'s Store<'c>) -> Self {
        Self { store }
    }

    fn require(&self, kind: EntityKind, id: Uuid) -> Result<Status> {
        self.store
            .get_status(kind, id)?
            .ok_or_else(|| Error::not_found(kind, id))
    }

    /// Whether `to` already reaches `from`, so that `from -> to` would close a loop.
    pub fn would_create_cycle(&self, kind: EntityKind, from: Uuid, to: Uuid) -> Result<bool> {
        if from == to {
            return Ok(true);
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([to]);

        while let Some(current) = queue.pop_front() {
            if current == from {
                return Ok(true);
            }
            if !visited.insert(current) {
                continue;
            }
            for next in self.store.get_dependencies(kind, current)? {
                if !visited.contains(&next) {
                    queue.push_back(next);
                }
            }
        }

        Ok(false)
    }

    /// Record that `from` depends on `to`.
    pub fn add_dependency(&self, kind: EntityKind, from: Uuid, to: Uuid) -> Result<Dependency> {
        self.require(kind, from)?;
        self.require(kind, to)?;

        if self.would_create_cycle(kind, from, to)? {
            tracing::warn!(%kind, %from, %to, "Rejected cyclic dependency");
            return Err(Error::CyclicDependency { from, to });
        }
        if self.store.dependency_exists(kind, from, to)? {
            return Err(Error::InvalidInput(format!(
                "{} {} already depends on {}",
                kind, from, to
            )));
        }

        let edge = Dependency {
            entity_kind: kind,
            entity_id: from,
            depends_on_id: to,
            created_at: Utc::now(),
        };
        self.store.insert_dependency(&edge)?;
        Ok(edge)
    }

    pub fn remove_dependency(&self, kind: EntityKind, from: Uuid, to: Uuid) -> Result<()> {
        if !self.store.delete_dependency(kind, from, to)? {
            return Err(Error::NotFound(format!(
                "dependency {} {} -> {}",
                kind, from, to
            )));
        }
        Ok(())
    }

    pub fn add_blocker(
        &self,
        kind: EntityKind,
        entity: Uuid,
        blocker: Uuid,
        reason: Option<String>,
    ) -> Result<Blocker> {
        if entity == blocker {
            return Err(Error::InvalidInput(format!("{} {} cannot block itself", kind, entity)));
        }
        self.require(kind, entity)?;
        self.require(kind, blocker)?;

        if self
            .store
            .get_blockers(kind, entity)?
            .iter()
            .any(|b| b.blocker_id == blocker)
        {
            return Err(Error::InvalidInput(format!(
                "{} {} is already blocked by {}",
                kind, entity, blocker
            )));
        }

        let edge = Blocker {
            entity_kind: kind,
            entity_id: entity,
            blocker_id: blocker,
            reason,
            created_at: Utc::now(),
        };
        self.store.insert_blocker(&edge)?;
        Ok(edge)
    }

    pub fn resolve_blocker(&self, kind: EntityKind, entity: Uuid, blocker: Uuid) -> Result<()> {
        if !self.store.delete_blocker(kind, entity, blocker)? {
            return Err(Error::NotFound(format!(
                "blocker {} {} on {}",
                kind, blocker, entity
            )));
        }
        Ok(())
    }

    /// Dependencies not yet done and blockers not yet resolved.
    pub fn readiness(&self, kind: EntityKind, id: Uuid) -> Result<StartReadiness> {
        self.require(kind, id)?;

        let mut pending_dependencies = Vec::new();
        for dep in self.store.get_dependencies(kind, id)? {
            if self.store.get_status(kind, dep)? != Some(Status::Done) {
                pending_dependencies.push(dep);
            }
        }

        let open_blockers = self
            .store
            .get_blockers(kind, id)?
            .into_iter()
            .map(|b| b.blocker_id)
            .collect();

        Ok(StartReadiness {
            pending_dependencies,
            open_blockers,
        })
    }

    pub fn can_start(&self, kind: EntityKind, id: Uuid) -> Result<bool> {
        Ok(self.readiness(kind, id)?.is_ready())
    }
}
