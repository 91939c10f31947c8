//! # Records
//!
//! A [`Record<R>`] is a local, mutable view of one remote entity of kind `R`.
//! It carries:
//!
//! - the attribute mapping (only attributes `R` declares);
//! - the lifecycle flags `persisted` and `destroyed`;
//! - the validation [`Errors`] of the last save attempt;
//! - a cache of resolved associations (see [`association`](super::association)).
//!
//! ## Lifecycle
//!
//! ```text
//! new (persisted = false) ──save ok──▶ persisted ──destroy ok──▶ destroyed
//!                                        │  ▲                     (frozen)
//!                                        └──┘ save/update ok
//! ```
//!
//! A failed save (local or remote validation, or an infrastructure error)
//! never changes `persisted`. A destroyed record rejects every mutation with
//! [`ImmutableRecordError`].

use crate::framework::association::{AssociationCache, AssociationTable};
use crate::framework::error::{Errors, ImmutableRecordError, RecordError, RecordInvalid, RecordResult, TransportError};
use crate::framework::transport::{Gateway, OwnerRef};
use crate::framework::value::{Attributes, Entity, Value};
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use tracing::{debug, info, instrument, warn};

/// Reserved key in a constructor mapping that sets the persisted flag.
pub const PERSISTED_KEY: &str = "persisted";

static NULL: Value = Value::Null;

/// Static description of one remote resource kind.
///
/// Implementors are zero-sized marker types; all state lives in
/// [`Record<Self>`].
pub trait Resource: Sized + 'static {
    /// Resource kind name as the remote service knows it.
    const KIND: &'static str;

    /// Attribute holding the remote identifier.
    const ID_ATTRIBUTE: &'static str = "id";

    /// Every attribute a record of this kind may carry.
    const ATTRIBUTES: &'static [&'static str];

    /// Attributes assigned by the remote side and never sent back.
    const READONLY: &'static [&'static str] = &[];

    /// Attributes sent on create and update but never kept locally once the
    /// remote side has accepted them.
    const WRITE_ONLY: &'static [&'static str] = &[];

    fn associations() -> &'static AssociationTable {
        &AssociationTable::EMPTY
    }

    /// Local validation rules; push one entry per violated rule.
    fn validate(_record: &Record<Self>, _errors: &mut Errors) {}

    /// Owner used to scope create/update/delete of this record.
    fn scope(_record: &Record<Self>) -> Option<OwnerRef> {
        None
    }

    /// Payload sent on create and update.
    fn payload(record: &Record<Self>) -> Attributes {
        record.writable_attributes()
    }

    /// Removes write-only values from an attribute mapping.
    fn scrub(attributes: &mut Attributes) {
        attributes.retain(|key, _| !Self::WRITE_ONLY.contains(&key.as_str()));
    }
}

/// Anything that can expose attribute values by name, e.g. a foreign model.
pub trait AttributeSource {
    fn read_attribute(&self, name: &str) -> Option<Value>;

    /// `Some` when the source knows whether it is already stored remotely.
    fn is_persisted(&self) -> Option<bool> {
        None
    }
}

/// The shapes a record can be constructed from.
pub enum RecordInput<'a> {
    /// Fetch this identifier remotely.
    Id(String),
    /// Caller-supplied attributes; may carry the reserved `persisted` key.
    Attributes(Attributes),
    /// A remote entity; always persisted.
    Entity(Entity),
    /// Copy declared attributes from another object.
    Source(&'a dyn AttributeSource),
}

impl From<&str> for RecordInput<'_> {
    fn from(id: &str) -> Self {
        RecordInput::Id(id.to_string())
    }
}

impl From<String> for RecordInput<'_> {
    fn from(id: String) -> Self {
        RecordInput::Id(id)
    }
}

impl From<Attributes> for RecordInput<'_> {
    fn from(attributes: Attributes) -> Self {
        RecordInput::Attributes(attributes)
    }
}

impl<'a, S: AttributeSource> From<&'a S> for RecordInput<'a> {
    fn from(source: &'a S) -> Self {
        RecordInput::Source(source)
    }
}

/// Local view of one remote entity of kind `R`.
pub struct Record<R: Resource> {
    pub(crate) gateway: Gateway,
    attributes: Attributes,
    persisted: bool,
    destroyed: bool,
    errors: Errors,
    pub(crate) associations: AssociationCache,
    kind: PhantomData<fn() -> R>,
}

impl<R: Resource> Record<R> {
    fn blank(gateway: &Gateway, persisted: bool) -> Self {
        Self {
            gateway: gateway.clone(),
            attributes: Attributes::new(),
            persisted,
            destroyed: false,
            errors: Errors::new(),
            associations: AssociationCache::default(),
            kind: PhantomData,
        }
    }

    /// Builds a record from any accepted input shape.
    ///
    /// An identifier is fetched remotely (unscoped); a missing entity surfaces
    /// as a not-found [`ApiError`](crate::framework::ApiError).
    pub fn new<'a>(gateway: &Gateway, input: impl Into<RecordInput<'a>>) -> RecordResult<Self> {
        match input.into() {
            RecordInput::Id(id) => Self::find(gateway, None, &id),
            RecordInput::Attributes(attributes) => Self::build(gateway, attributes),
            RecordInput::Entity(entity) => Ok(Self::from_entity(gateway, entity)),
            RecordInput::Source(source) => Ok(Self::from_source(gateway, source)),
        }
    }

    /// New record from caller attributes. Unknown keys are rejected.
    pub fn build(gateway: &Gateway, mut attributes: Attributes) -> RecordResult<Self> {
        let persisted = attributes
            .remove(PERSISTED_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Self::check_declared(attributes.keys())?;
        let mut record = Self::blank(gateway, persisted);
        record.attributes = attributes;
        Ok(record)
    }

    /// Persisted record from a remote entity. Undeclared keys are dropped.
    pub fn from_entity(gateway: &Gateway, entity: Entity) -> Self {
        let mut record = Self::blank(gateway, true);
        record.attributes = entity
            .into_iter()
            .filter(|(key, _)| R::ATTRIBUTES.contains(&key.as_str()))
            .collect();
        record
    }

    pub fn from_source(gateway: &Gateway, source: &dyn AttributeSource) -> Self {
        let mut record = Self::blank(gateway, source.is_persisted().unwrap_or(false));
        for name in R::ATTRIBUTES {
            if let Some(value) = source.read_attribute(name).filter(|v| !v.is_null()) {
                record.attributes.insert(name.to_string(), value);
            }
        }
        record
    }

    /// Fetches one entity, optionally scoped to an owner.
    #[instrument(level = "debug", skip(gateway), fields(kind = R::KIND))]
    pub fn find(gateway: &Gateway, scope: Option<&OwnerRef>, id: &str) -> RecordResult<Self> {
        let entity = gateway.fetch_one(R::KIND, scope, id)?;
        debug!("Fetched");
        Ok(Self::from_entity(gateway, entity))
    }

    /// Builds and saves. The record is returned whether or not the save
    /// succeeded; check [`is_persisted`](Self::is_persisted) and
    /// [`errors`](Self::errors).
    pub fn create(gateway: &Gateway, attributes: Attributes) -> RecordResult<Self> {
        let mut record = Self::build(gateway, attributes)?;
        record.save()?;
        Ok(record)
    }

    pub fn create_strict(gateway: &Gateway, attributes: Attributes) -> RecordResult<Self> {
        let mut record = Self::build(gateway, attributes)?;
        record.save_strict()?;
        Ok(record)
    }

    /// Deletes a remote entity by identifier without loading it.
    #[instrument(level = "debug", skip(gateway), fields(kind = R::KIND))]
    pub fn delete(gateway: &Gateway, scope: Option<&OwnerRef>, id: &str) -> RecordResult<()> {
        gateway.delete(R::KIND, scope, id)?;
        info!(kind = R::KIND, %id, "Deleted");
        Ok(())
    }

    fn check_declared<'k>(mut keys: impl Iterator<Item = &'k String>) -> RecordResult<()> {
        match keys.find(|key| !R::ATTRIBUTES.contains(&key.as_str())) {
            Some(key) => Err(RecordError::UnknownAttribute {
                kind: R::KIND,
                name: key.clone(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn ensure_mutable(&self) -> Result<(), ImmutableRecordError> {
        if self.destroyed {
            return Err(ImmutableRecordError {
                kind: R::KIND,
                id: self.id().map(str::to_owned),
            });
        }
        Ok(())
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn kind(&self) -> &'static str {
        R::KIND
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str(R::ID_ATTRIBUTE).filter(|id| !id.is_empty())
    }

    /// Value of `name`, or [`Value::Null`] when absent.
    pub fn get(&self, name: &str) -> &Value {
        self.attributes.get(name).unwrap_or(&NULL)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).as_str()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> RecordResult<()> {
        self.ensure_mutable()?;
        let name = name.to_string();
        Self::check_declared(std::iter::once(&name))?;
        self.invalidate_associations(&[name.as_str()]);
        self.attributes.insert(name, value.into());
        Ok(())
    }

    /// Sets several attributes at once. Nothing changes if any key is unknown.
    pub fn assign_attributes(&mut self, attributes: Attributes) -> RecordResult<()> {
        self.ensure_mutable()?;
        Self::check_declared(attributes.keys())?;
        let changed: Vec<&str> = attributes.keys().map(String::as_str).collect();
        self.invalidate_associations(&changed);
        self.attributes.extend(attributes);
        Ok(())
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_new_record(&self) -> bool {
        !self.persisted && !self.destroyed
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    pub fn owner_ref(&self, key: &'static str) -> OwnerRef {
        OwnerRef::new(R::KIND, key, self.id().unwrap_or_default())
    }

    /// Declared attributes minus remote-assigned ones. The identifier is
    /// left out once the record is persisted.
    ///
    /// Nulls are skipped on create. On update an explicit null is sent so the
    /// remote side clears the field.
    pub fn writable_attributes(&self) -> Attributes {
        self.attributes
            .iter()
            .filter(|(key, value)| {
                (self.persisted || !value.is_null())
                    && !R::READONLY.contains(&key.as_str())
                    && !(self.persisted && key.as_str() == R::ID_ATTRIBUTE)
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Runs local validation, replacing the previous errors.
    pub fn validate(&mut self) -> bool {
        let mut errors = Errors::new();
        R::validate(self, &mut errors);
        self.errors = errors;
        self.errors.is_empty()
    }

    /// Creates or updates the remote entity.
    ///
    /// `Ok(false)` means local or remote validation failed and the messages
    /// are in [`errors`](Self::errors). Infrastructure failures are returned
    /// as `Err` and leave the errors untouched.
    #[instrument(level = "debug", skip(self), fields(kind = R::KIND, id = ?self.id()))]
    pub fn save(&mut self) -> RecordResult<bool> {
        self.ensure_mutable()?;
        if !self.validate() {
            debug!(errors = %self.errors, "Local validation failed");
            return Ok(false);
        }

        let scope = R::scope(self);
        let payload = R::payload(self);
        let result = if self.persisted {
            let id = self.id().unwrap_or_default().to_string();
            self.gateway.update(R::KIND, scope.as_ref(), &id, &payload)
        } else {
            self.gateway.create(R::KIND, scope.as_ref(), &payload)
        };

        match result {
            Ok(entity) => {
                let created = !self.persisted;
                self.merge_entity(entity);
                self.forget_write_only();
                self.persisted = true;
                info!(kind = R::KIND, id = self.id().unwrap_or_default(), created, "Saved");
                Ok(true)
            }
            Err(TransportError::Validation(remote)) => {
                for error in remote {
                    self.errors.push(error);
                }
                warn!(kind = R::KIND, errors = %self.errors, "Remote validation failed");
                Ok(false)
            }
            Err(TransportError::Api(e)) => {
                warn!(kind = R::KIND, error = %e, "Save failed");
                Err(e.into())
            }
        }
    }

    pub fn save_strict(&mut self) -> RecordResult<()> {
        if self.save()? {
            Ok(())
        } else {
            Err(self.invalid().into())
        }
    }

    /// Assigns then saves. Assigned values stay on the record even if the
    /// save fails.
    pub fn update_attributes(&mut self, attributes: Attributes) -> RecordResult<bool> {
        self.assign_attributes(attributes)?;
        self.save()
    }

    pub fn update_attributes_strict(&mut self, attributes: Attributes) -> RecordResult<()> {
        self.assign_attributes(attributes)?;
        self.save_strict()
    }

    /// Deletes the remote entity and freezes the record.
    ///
    /// A record that was never saved is frozen without a remote call.
    #[instrument(level = "debug", skip(self), fields(kind = R::KIND, id = ?self.id()))]
    pub fn destroy(&mut self) -> RecordResult<()> {
        self.ensure_mutable()?;
        if self.persisted {
            let scope = R::scope(self);
            let id = self.id().unwrap_or_default().to_string();
            self.gateway.delete(R::KIND, scope.as_ref(), &id)?;
        }
        self.persisted = false;
        self.destroyed = true;
        info!(kind = R::KIND, id = self.id().unwrap_or_default(), "Destroyed");
        Ok(())
    }

    /// Re-reads the remote entity, replacing local attributes.
    pub fn reload(&mut self) -> RecordResult<()> {
        self.ensure_mutable()?;
        let Some(id) = self.id().map(str::to_owned) else {
            return Err(crate::framework::ApiError::not_found(R::KIND, "(new)").into());
        };
        let scope = R::scope(self);
        let entity = self.gateway.fetch_one(R::KIND, scope.as_ref(), &id)?;
        self.attributes.clear();
        self.merge_entity(entity);
        self.persisted = true;
        Ok(())
    }

    fn merge_entity(&mut self, entity: Entity) {
        let mut changed = Vec::new();
        for (key, value) in entity {
            if !R::ATTRIBUTES.contains(&key.as_str()) {
                continue;
            }
            if self.attributes.get(&key) != Some(&value) {
                changed.push(key.clone());
            }
            self.attributes.insert(key, value);
        }
        let changed: Vec<&str> = changed.iter().map(String::as_str).collect();
        self.invalidate_associations(&changed);
    }

    fn forget_write_only(&mut self) {
        let before = self.attributes.clone();
        R::scrub(&mut self.attributes);
        let changed: Vec<&str> = before
            .iter()
            .filter(|(key, value)| self.attributes.get(*key) != Some(*value))
            .map(|(key, _)| key.as_str())
            .collect();
        self.invalidate_associations(&changed);
    }

    fn invalid(&self) -> RecordInvalid {
        RecordInvalid {
            kind: R::KIND,
            id: self.id().map(str::to_owned),
            errors: self.errors.clone(),
        }
    }

    /// Non-null attributes, suitable for JSON encoding.
    pub fn serializable_hash(&self) -> Attributes {
        self.attributes
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.serializable_hash()).unwrap_or(serde_json::Value::Null)
    }
}

impl<R: Resource> PartialEq for Record<R> {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes
            && self.persisted == other.persisted
            && self.destroyed == other.destroyed
    }
}

impl<R: Resource> Debug for Record<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut shown = self.attributes.clone();
        R::scrub(&mut shown);
        f.debug_struct("Record")
            .field("kind", &R::KIND)
            .field("attributes", &shown)
            .field("persisted", &self.persisted)
            .field("destroyed", &self.destroyed)
            .field("errors", &self.errors)
            .field("associations", &self.associations.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::framework::{ApiError, FieldError, MockTransport};

    struct Widget;

    impl Resource for Widget {
        const KIND: &'static str = "widget";
        const ATTRIBUTES: &'static [&'static str] = &["id", "name", "size", "created_at"];
        const READONLY: &'static [&'static str] = &["created_at"];

        fn validate(record: &Record<Self>, errors: &mut Errors) {
            if record.get("name").is_blank() {
                errors.add("name", "can't be blank");
            }
        }
    }

    struct Named(&'static str);

    impl AttributeSource for Named {
        fn read_attribute(&self, name: &str) -> Option<Value> {
            (name == "name").then(|| Value::from(self.0))
        }
    }

    /// A foreign model that knows it is already stored.
    struct Stored;

    impl AttributeSource for Stored {
        fn read_attribute(&self, name: &str) -> Option<Value> {
            match name {
                "id" => Some(Value::from("w9")),
                "name" => Some(Value::from("washer")),
                _ => None,
            }
        }

        fn is_persisted(&self) -> Option<bool> {
            Some(true)
        }
    }

    fn stored_widget(mock: &MockTransport) -> Record<Widget> {
        Record::<Widget>::new(
            &mock.gateway(),
            attrs! { "id" => "w1", "name" => "bolt", "size" => 3, "persisted" => true },
        )
        .unwrap()
    }

    #[test]
    fn mapping_builds_new_record() {
        let mock = MockTransport::new();
        let record = Record::<Widget>::new(&mock.gateway(), attrs! { "name" => "bolt" }).unwrap();

        assert!(!record.is_persisted());
        assert!(record.is_new_record());
        assert_eq!(record.get_str("name"), Some("bolt"));
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn persisted_key_is_consumed() {
        let mock = MockTransport::new();
        let record = Record::<Widget>::new(
            &mock.gateway(),
            attrs! { "id" => "w1", "persisted" => true },
        )
        .unwrap();

        assert!(record.is_persisted());
        assert!(!record.attributes().contains_key(PERSISTED_KEY));
    }

    #[test]
    fn identifier_fetches_remotely() {
        let mock = MockTransport::new();
        mock.expect_fetch_one("widget", "w1")
            .return_ok(attrs! { "id" => "w1", "name" => "bolt", "colour" => "red" });

        let record = Record::<Widget>::new(&mock.gateway(), "w1").unwrap();

        assert!(record.is_persisted());
        assert_eq!(record.id(), Some("w1"));
        assert!(!record.attributes().contains_key("colour"));
        mock.verify();
    }

    #[test]
    fn missing_identifier_is_not_found() {
        let mock = MockTransport::new();
        mock.expect_fetch_one("widget", "nope")
            .return_err(ApiError::not_found("widget", "nope"));

        let err = Record::<Widget>::new(&mock.gateway(), "nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn source_copies_declared_attributes() {
        let mock = MockTransport::new();
        let source = Named("nut");
        let record = Record::<Widget>::new(&mock.gateway(), &source).unwrap();

        assert_eq!(record.get_str("name"), Some("nut"));
        assert!(!record.is_persisted());
    }

    #[test]
    fn source_can_mark_record_persisted() {
        let mock = MockTransport::new();
        mock.expect_update("widget", "w9")
            .return_ok(attrs! { "id" => "w9", "name" => "washer" });

        let mut record = Record::<Widget>::new(&mock.gateway(), &Stored).unwrap();
        assert!(record.is_persisted());
        assert!(!record.is_new_record());
        assert_eq!(record.id(), Some("w9"));

        assert!(record.save().unwrap());
        assert_eq!(mock.calls()[0].attrs, Some(attrs! { "name" => "washer" }));
        mock.verify();
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let mock = MockTransport::new();
        let err = Record::<Widget>::build(&mock.gateway(), attrs! { "colour" => "red" }).unwrap_err();
        assert!(matches!(err, RecordError::UnknownAttribute { name, .. } if name == "colour"));

        let mut record = Record::<Widget>::build(&mock.gateway(), attrs! {}).unwrap();
        assert!(record.set("colour", "red").is_err());
        assert!(record
            .assign_attributes(attrs! { "name" => "x", "colour" => "red" })
            .is_err());
        assert!(record.get("name").is_null());
    }

    #[test]
    fn local_validation_failure_skips_remote_call() {
        let mock = MockTransport::new();
        let mut record = Record::<Widget>::build(&mock.gateway(), attrs! {}).unwrap();

        assert!(!record.save().unwrap());
        assert_eq!(record.errors().on("name"), vec!["can't be blank"]);
        assert!(!record.is_persisted());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn save_creates_then_updates() {
        let mock = MockTransport::new();
        mock.expect_create("widget")
            .return_ok(attrs! { "id" => "w1", "name" => "bolt", "created_at" => "now" });
        mock.expect_update("widget", "w1")
            .return_ok(attrs! { "id" => "w1", "name" => "nut", "created_at" => "now" });

        let mut record = Record::<Widget>::build(&mock.gateway(), attrs! { "name" => "bolt" }).unwrap();
        assert!(record.save().unwrap());
        assert!(record.is_persisted());
        assert_eq!(record.id(), Some("w1"));

        assert!(record.update_attributes(attrs! { "name" => "nut" }).unwrap());
        assert_eq!(record.get_str("name"), Some("nut"));

        let calls = mock.calls();
        assert_eq!(calls[1].attrs, Some(attrs! { "name" => "nut" }));
        mock.verify();
    }

    #[test]
    fn remote_validation_lands_in_errors() {
        let mock = MockTransport::new();
        mock.expect_create("widget")
            .return_validation(vec![FieldError::with_code("size", "is invalid", "123")]);

        let mut record = Record::<Widget>::build(&mock.gateway(), attrs! { "name" => "bolt" }).unwrap();
        assert!(!record.save().unwrap());
        assert_eq!(record.errors().on("size"), vec!["is invalid"]);
        assert!(!record.is_persisted());
    }

    #[test]
    fn strict_save_raises_invalid() {
        let mock = MockTransport::new();
        let mut record = Record::<Widget>::build(&mock.gateway(), attrs! {}).unwrap();

        match record.save_strict() {
            Err(RecordError::Invalid(invalid)) => {
                assert_eq!(invalid.kind, "widget");
                assert!(invalid.errors.has("name"));
            }
            other => panic!("expected invalid, got {other:?}"),
        }
    }

    #[test]
    fn strict_update_raises_invalid() {
        let mock = MockTransport::new();
        let mut record = stored_widget(&mock);

        match record.update_attributes_strict(attrs! { "name" => "" }) {
            Err(RecordError::Invalid(invalid)) => {
                assert_eq!(invalid.id.as_deref(), Some("w1"));
                assert_eq!(invalid.errors.on("name"), vec!["can't be blank"]);
            }
            other => panic!("expected invalid, got {other:?}"),
        }
        assert_eq!(record.get_str("name"), Some(""));
        assert!(record.is_persisted());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn strict_save_of_stored_record_stays_persisted() {
        let mock = MockTransport::new();
        mock.expect_update("widget", "w1")
            .return_validation(vec![FieldError::with_code("size", "is too large", "456")]);

        let mut record = stored_widget(&mock);
        record.set("size", 1000).unwrap();

        let err = record.save_strict().unwrap_err();
        assert!(matches!(err, RecordError::Invalid(ref invalid) if invalid.errors.has("size")));
        assert!(record.is_persisted());
        assert!(!record.is_destroyed());
        assert_eq!(record.get("size").as_i64(), Some(1000));
        mock.verify();
    }

    #[test]
    fn null_clears_field_on_update_only() {
        let mock = MockTransport::new();
        let unsaved = Record::<Widget>::build(
            &mock.gateway(),
            attrs! { "name" => "bolt", "size" => Value::Null },
        )
        .unwrap();
        assert_eq!(unsaved.writable_attributes(), attrs! { "name" => "bolt" });

        mock.expect_update("widget", "w1")
            .return_ok(attrs! { "id" => "w1", "name" => "bolt" });
        let mut record = stored_widget(&mock);
        assert!(record.update_attributes(attrs! { "size" => Value::Null }).unwrap());

        assert_eq!(
            mock.calls()[0].attrs,
            Some(attrs! { "name" => "bolt", "size" => Value::Null })
        );
        assert!(record.get("size").is_null());
        mock.verify();
    }

    #[test]
    fn infrastructure_errors_propagate_untouched() {
        let mock = MockTransport::new();
        mock.expect_create("widget").return_err(ApiError::transport("connection reset"));

        let mut record = Record::<Widget>::build(&mock.gateway(), attrs! { "name" => "bolt" }).unwrap();
        let err = record.save().unwrap_err();

        assert_eq!(err.to_string(), "connection reset");
        assert!(record.errors().is_empty());
        assert!(!record.is_persisted());
    }

    #[test]
    fn destroyed_record_is_frozen() {
        let mock = MockTransport::new();
        mock.expect_delete("widget", "w1").return_ok();

        let mut record = Record::<Widget>::new(
            &mock.gateway(),
            attrs! { "id" => "w1", "name" => "bolt", "persisted" => true },
        )
        .unwrap();
        record.destroy().unwrap();

        assert!(record.is_destroyed());
        assert!(!record.is_persisted());
        assert!(matches!(record.set("name", "nut"), Err(RecordError::Immutable(_))));
        assert!(matches!(record.save(), Err(RecordError::Immutable(_))));
        assert!(matches!(record.destroy(), Err(RecordError::Immutable(_))));
        mock.verify();
    }

    #[test]
    fn destroying_unsaved_record_skips_remote_call() {
        let mock = MockTransport::new();
        let mut record = Record::<Widget>::build(&mock.gateway(), attrs! { "name" => "bolt" }).unwrap();

        record.destroy().unwrap();
        assert!(record.is_destroyed());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn failed_destroy_keeps_record_alive() {
        let mock = MockTransport::new();
        mock.expect_delete("widget", "w1")
            .return_err(ApiError::not_found("widget", "w1"));

        let mut record = Record::<Widget>::new(
            &mock.gateway(),
            attrs! { "id" => "w1", "persisted" => true },
        )
        .unwrap();

        assert!(record.destroy().unwrap_err().is_not_found());
        assert!(!record.is_destroyed());
        assert!(record.is_persisted());
    }

    #[test]
    fn json_skips_nulls() {
        let mock = MockTransport::new();
        let record = Record::<Widget>::build(
            &mock.gateway(),
            attrs! { "name" => "bolt", "size" => Value::Null },
        )
        .unwrap();

        assert_eq!(record.to_json(), serde_json::json!({ "name": "bolt" }));
    }
}
