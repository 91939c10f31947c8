//! # Associations
//!
//! Relations between resource kinds are declared once, as immutable data:
//!
//! - a typed `const` descriptor per relation ([`SingleAssociation`] for
//!   has-one / belongs-to, [`HasMany`] for has-many), used at call sites;
//! - an untyped [`AssociationTable`] per kind listing those descriptors, used
//!   for introspection. A table may extend its ancestor's table; lookups see the
//!   ancestor's entries plus the kind's own, own entries shadowing same-named
//!   ancestor ones.
//!
//! Every accessor goes through the same two resolvers,
//! [`Record::association`] and [`Record::collection`], which memoize the
//! resolved value in the record's association cache.

use crate::framework::collection::{Collection, CollectionScope};
use crate::framework::error::RecordResult;
use crate::framework::record::{Record, RecordInput, Resource};
use crate::framework::value::Value;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::debug;

/// Relation flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// Single related record owned by (embedded in) this one.
    HasOne,
    /// Single related record referenced through a foreign key.
    BelongsTo,
    /// Lazily loaded collection of child records.
    HasMany,
}

/// Untyped description of one relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationDescriptor {
    pub name: &'static str,
    pub kind: AssociationKind,
    /// For single relations: the attribute holding the related record (an
    /// identifier or a nested mapping). For has-many: the attribute on child
    /// records that points back to the owner.
    pub foreign_key: Option<&'static str>,
    pub target_kind: &'static str,
}

/// Immutable per-kind table of association descriptors.
#[derive(Debug)]
pub struct AssociationTable {
    parent: Option<&'static AssociationTable>,
    own: &'static [AssociationDescriptor],
}

impl AssociationTable {
    pub const EMPTY: AssociationTable = AssociationTable::new(&[]);

    pub const fn new(own: &'static [AssociationDescriptor]) -> Self {
        Self { parent: None, own }
    }

    /// Table for a kind that inherits `parent`'s relations.
    pub const fn extending(
        parent: &'static AssociationTable,
        own: &'static [AssociationDescriptor],
    ) -> Self {
        Self {
            parent: Some(parent),
            own,
        }
    }

    pub fn get(&self, name: &str) -> Option<&AssociationDescriptor> {
        self.own
            .iter()
            .find(|d| d.name == name)
            .or_else(|| self.parent.and_then(|p| p.get(name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Ancestor descriptors first (minus shadowed ones), then own.
    pub fn descriptors(&self) -> Vec<&AssociationDescriptor> {
        let mut all: Vec<&AssociationDescriptor> = match self.parent {
            Some(parent) => parent
                .descriptors()
                .into_iter()
                .filter(|d| !self.own.iter().any(|o| o.name == d.name))
                .collect(),
            None => Vec::new(),
        };
        all.extend(self.own.iter());
        all
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors().into_iter().map(|d| d.name).collect()
    }
}

/// Typed handle for a has-one or belongs-to relation targeting `T`.
pub struct SingleAssociation<T: Resource> {
    name: &'static str,
    kind: AssociationKind,
    foreign_key: Option<&'static str>,
    target: PhantomData<fn() -> T>,
}

impl<T: Resource> SingleAssociation<T> {
    pub const fn belongs_to(name: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            kind: AssociationKind::BelongsTo,
            foreign_key: Some(foreign_key),
            target: PhantomData,
        }
    }

    pub const fn has_one(name: &'static str, foreign_key: Option<&'static str>) -> Self {
        Self {
            name,
            kind: AssociationKind::HasOne,
            foreign_key,
            target: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn foreign_key(&self) -> Option<&'static str> {
        self.foreign_key
    }

    pub const fn descriptor(&self) -> AssociationDescriptor {
        AssociationDescriptor {
            name: self.name,
            kind: self.kind,
            foreign_key: self.foreign_key,
            target_kind: T::KIND,
        }
    }
}

/// Typed handle for a has-many relation served by collection scope `S`.
pub struct HasMany<S: CollectionScope> {
    name: &'static str,
    scope: PhantomData<fn() -> S>,
}

impl<S: CollectionScope> HasMany<S> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            scope: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn descriptor(&self) -> AssociationDescriptor {
        AssociationDescriptor {
            name: self.name,
            kind: AssociationKind::HasMany,
            foreign_key: Some(S::OWNER_KEY),
            target_kind: <S::Item as Resource>::KIND,
        }
    }
}

/// Per-record memo of resolved associations, keyed by relation name.
#[derive(Default)]
pub(crate) struct AssociationCache {
    slots: HashMap<&'static str, Box<dyn Any>>,
}

impl AssociationCache {
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub(crate) fn get_mut<V: Any>(&mut self, name: &str) -> Option<&mut V> {
        self.slots.get_mut(name).and_then(|slot| slot.downcast_mut())
    }

    pub(crate) fn insert<V: Any>(&mut self, name: &'static str, value: V) {
        self.slots.insert(name, Box::new(value));
    }

    pub(crate) fn remove(&mut self, name: &str) {
        self.slots.remove(name);
    }

    pub(crate) fn get_or_insert_with<V: Any>(
        &mut self,
        name: &'static str,
        init: impl FnOnce() -> V,
    ) -> &mut V {
        if !self.slots.get(name).is_some_and(|slot| slot.is::<V>()) {
            self.slots.insert(name, Box::new(init()));
        }
        match self.get_mut(name) {
            Some(value) => value,
            None => unreachable!("association slot `{name}` must hold a {}", type_name::<V>()),
        }
    }

    pub(crate) fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.slots.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl<R: Resource> Record<R> {
    /// Reads a has-one / belongs-to relation.
    ///
    /// Returns the cached record if one was resolved or assigned before.
    /// Otherwise, if the foreign key holds a value, builds the target from it
    /// (an identifier is fetched remotely, a mapping is copied), caches it and
    /// returns it. With no foreign-key value the result is `None` and nothing
    /// is cached.
    pub fn association<T: Resource>(
        &mut self,
        assoc: &SingleAssociation<T>,
    ) -> RecordResult<Option<&mut Record<T>>> {
        debug_assert!(
            R::associations().contains(assoc.name),
            "{} does not declare association `{}`",
            R::KIND,
            assoc.name
        );
        if !self.associations.contains(assoc.name) {
            let Some(value) = assoc
                .foreign_key
                .map(|key| self.get(key))
                .filter(|value| !value.is_null())
                .cloned()
            else {
                return Ok(None);
            };
            debug!(kind = R::KIND, association = assoc.name, "Resolving association");
            let target = Record::<T>::from_value(&self.gateway, value)?;
            self.associations.insert(assoc.name, target);
        }
        Ok(self.associations.get_mut::<Record<T>>(assoc.name))
    }

    /// Replaces (or clears, with `None`) the cached value of a single relation.
    ///
    /// The foreign-key attribute is left untouched.
    pub fn set_association<T: Resource>(
        &mut self,
        assoc: &SingleAssociation<T>,
        value: Option<Record<T>>,
    ) -> RecordResult<()> {
        self.ensure_mutable()?;
        match value {
            Some(record) => self.associations.insert(assoc.name, record),
            None => self.associations.remove(assoc.name),
        }
        Ok(())
    }

    /// Like [`set_association`](Self::set_association), wrapping any accepted
    /// input shape as a record of the target kind first.
    pub fn assign_association<'a, T: Resource>(
        &mut self,
        assoc: &SingleAssociation<T>,
        input: impl Into<RecordInput<'a>>,
    ) -> RecordResult<()> {
        self.ensure_mutable()?;
        let record = Record::<T>::new(&self.gateway, input)?;
        self.set_association(assoc, Some(record))
    }

    /// Reads a has-many relation.
    ///
    /// The collection is created on first access and the same instance is
    /// returned afterwards. It only knows the owner's identity, refreshed on
    /// each access, so it never keeps the owner alive.
    pub fn collection<S: CollectionScope>(&mut self, assoc: &HasMany<S>) -> &mut Collection<S> {
        debug_assert!(
            R::associations().contains(assoc.name),
            "{} does not declare association `{}`",
            R::KIND,
            assoc.name
        );
        let owner = self.owner_ref(S::OWNER_KEY);
        let gateway = &self.gateway;
        let collection = self
            .associations
            .get_or_insert_with(assoc.name, || Collection::<S>::new(gateway, Some(owner.clone())));
        collection.rebind(owner);
        collection
    }

    /// Drops cached single relations whose foreign key is among `changed`.
    pub(crate) fn invalidate_associations(&mut self, changed: &[&str]) {
        for descriptor in R::associations().descriptors() {
            if descriptor.kind == AssociationKind::HasMany {
                continue;
            }
            if descriptor
                .foreign_key
                .is_some_and(|key| changed.contains(&key))
            {
                self.associations.remove(descriptor.name);
            }
        }
    }
}

/// Value → record conversion used by the resolver.
impl<R: Resource> Record<R> {
    pub(crate) fn from_value(
        gateway: &crate::framework::Gateway,
        value: Value,
    ) -> RecordResult<Self> {
        match value {
            Value::Map(attributes) => Record::new(gateway, RecordInput::Attributes(attributes)),
            other => match other.as_identifier() {
                Some(id) => Record::new(gateway, RecordInput::Id(id)),
                None => Err(crate::framework::RecordError::MalformedInput {
                    kind: R::KIND,
                    found: other.type_name(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &[AssociationDescriptor] = &[
        AssociationDescriptor {
            name: "owner",
            kind: AssociationKind::BelongsTo,
            foreign_key: Some("owner_id"),
            target_kind: "person",
        },
        AssociationDescriptor {
            name: "notes",
            kind: AssociationKind::HasMany,
            foreign_key: Some("widget_id"),
            target_kind: "note",
        },
    ];

    static BASE_TABLE: AssociationTable = AssociationTable::new(BASE);

    static DERIVED_TABLE: AssociationTable = AssociationTable::extending(
        &BASE_TABLE,
        &[
            AssociationDescriptor {
                name: "owner",
                kind: AssociationKind::BelongsTo,
                foreign_key: Some("manager_id"),
                target_kind: "person",
            },
            AssociationDescriptor {
                name: "parts",
                kind: AssociationKind::HasMany,
                foreign_key: Some("gadget_id"),
                target_kind: "part",
            },
        ],
    );

    #[test]
    fn derived_table_is_union_of_ancestor_and_own() {
        assert_eq!(DERIVED_TABLE.names(), vec!["notes", "owner", "parts"]);
        assert_eq!(BASE_TABLE.names(), vec!["owner", "notes"]);
    }

    #[test]
    fn own_descriptor_shadows_ancestor() {
        assert_eq!(DERIVED_TABLE.get("owner").unwrap().foreign_key, Some("manager_id"));
        assert_eq!(BASE_TABLE.get("owner").unwrap().foreign_key, Some("owner_id"));
        assert!(DERIVED_TABLE.contains("notes"));
        assert!(!BASE_TABLE.contains("parts"));
    }

    #[test]
    fn empty_table_has_nothing() {
        assert!(AssociationTable::EMPTY.descriptors().is_empty());
    }
}
