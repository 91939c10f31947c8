//! # Collections
//!
//! A [`Collection`] is the has-many side of an association: a lazily loaded,
//! owner-scoped list of child records.
//!
//! - The list is fetched on the first enumeration and cached until
//!   [`Collection::reload`] or an owner change. A failed fetch leaves it
//!   unloaded so the next access retries.
//! - [`Collection::build`] / [`Collection::create`] pre-fill the owner's
//!   identifier through the scope's default options, plus anything the scope
//!   resolves remotely (a customer's default card for new charges).
//! - [`Collection::find`] serves from the cache when loaded and otherwise asks
//!   the remote side directly, without loading the whole list.

use crate::framework::error::RecordResult;
use crate::framework::record::{Record, Resource};
use crate::framework::transport::{Gateway, OwnerRef};
use crate::framework::value::{Attributes, Value};
use std::fmt::{self, Debug};
use std::ops::{Deref, DerefMut};
use tracing::{debug, info};

/// Ties a collection type to its item kind and owner key.
pub trait CollectionScope: 'static {
    type Item: Resource;

    /// Attribute on items that holds the owner's identifier.
    const OWNER_KEY: &'static str;

    /// Attributes pre-filled on records built through the collection.
    fn default_options(owner: Option<&OwnerRef>) -> Attributes {
        let mut options = Attributes::new();
        if let Some(owner) = owner.filter(|o| o.has_identity()) {
            options.insert(owner.key().to_string(), Value::from(owner.id()));
        }
        options
    }

    /// Extra remote filter applied when loading the list.
    fn filter(_owner: Option<&OwnerRef>) -> Option<Attributes> {
        None
    }

    /// Adds options that can only be looked up remotely. Runs on every
    /// [`Collection::build`] with the caller's attributes, before they are
    /// merged over `options`.
    fn resolve_options(
        _gateway: &Gateway,
        _owner: Option<&OwnerRef>,
        _attributes: &Attributes,
        _options: &mut Attributes,
    ) -> RecordResult<()> {
        Ok(())
    }
}

/// A record handed out by a collection: either a member of the loaded list or
/// a standalone record (collection not loaded, or save failed).
pub enum Entry<'a, T: Resource> {
    Cached(&'a mut Record<T>),
    Detached(Record<T>),
}

impl<'a, T: Resource> Entry<'a, T> {
    pub fn is_cached(&self) -> bool {
        matches!(self, Entry::Cached(_))
    }

    /// The owned record, if this entry is not part of the loaded list.
    pub fn into_detached(self) -> Option<Record<T>> {
        match self {
            Entry::Cached(_) => None,
            Entry::Detached(record) => Some(record),
        }
    }
}

impl<T: Resource> Deref for Entry<'_, T> {
    type Target = Record<T>;

    fn deref(&self) -> &Record<T> {
        match self {
            Entry::Cached(record) => record,
            Entry::Detached(record) => record,
        }
    }
}

impl<T: Resource> DerefMut for Entry<'_, T> {
    fn deref_mut(&mut self) -> &mut Record<T> {
        match self {
            Entry::Cached(record) => record,
            Entry::Detached(record) => record,
        }
    }
}

impl<T: Resource> Debug for Entry<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Cached(record) => f.debug_tuple("Cached").field(record).finish(),
            Entry::Detached(record) => f.debug_tuple("Detached").field(record).finish(),
        }
    }
}

pub struct Collection<S: CollectionScope> {
    gateway: Gateway,
    owner: Option<OwnerRef>,
    items: Option<Vec<Record<S::Item>>>,
}

impl<S: CollectionScope> Collection<S> {
    pub fn new(gateway: &Gateway, owner: Option<OwnerRef>) -> Self {
        Self {
            gateway: gateway.clone(),
            owner,
            items: None,
        }
    }

    /// Collection over every entity of the item kind.
    pub fn unscoped(gateway: &Gateway) -> Self {
        Self::new(gateway, None)
    }

    pub fn owner(&self) -> Option<&OwnerRef> {
        self.owner.as_ref()
    }

    /// Points the collection at `owner`, dropping the cache if it changed.
    pub(crate) fn rebind(&mut self, owner: OwnerRef) {
        if self.owner.as_ref() != Some(&owner) {
            debug!(kind = <S::Item as Resource>::KIND, %owner, "Owner changed; cache reset");
            self.owner = Some(owner);
            self.items = None;
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.items.is_some()
    }

    pub fn default_options(&self) -> Attributes {
        S::default_options(self.owner.as_ref())
    }

    /// New unsaved record; explicit attributes override default options.
    pub fn build(&self, attributes: Attributes) -> RecordResult<Record<S::Item>> {
        let mut merged = self.default_options();
        S::resolve_options(&self.gateway, self.owner.as_ref(), &attributes, &mut merged)?;
        merged.extend(attributes);
        Record::build(&self.gateway, merged)
    }

    /// Builds and saves.
    ///
    /// On success the record joins the cached list when it is loaded. A record
    /// that failed validation comes back detached, carrying its errors.
    pub fn create(&mut self, attributes: Attributes) -> RecordResult<Entry<'_, S::Item>> {
        let mut record = self.build(attributes)?;
        if !record.save()? {
            return Ok(Entry::Detached(record));
        }
        Ok(self.adopt(record))
    }

    pub fn create_strict(&mut self, attributes: Attributes) -> RecordResult<Entry<'_, S::Item>> {
        let mut record = self.build(attributes)?;
        record.save_strict()?;
        Ok(self.adopt(record))
    }

    fn adopt(&mut self, record: Record<S::Item>) -> Entry<'_, S::Item> {
        match self.items.as_mut() {
            Some(items) => {
                items.push(record);
                let last = items.len() - 1;
                Entry::Cached(&mut items[last])
            }
            None => Entry::Detached(record),
        }
    }

    /// Looks up one member by identifier. `None` when it does not exist or
    /// belongs to another owner.
    pub fn find(&mut self, id: &str) -> RecordResult<Option<Entry<'_, S::Item>>> {
        match &mut self.items {
            Some(items) => Ok(items
                .iter_mut()
                .find(|record| record.id() == Some(id))
                .map(Entry::Cached)),
            None => {
                if self.owner.as_ref().is_some_and(|o| !o.has_identity()) {
                    return Ok(None);
                }
                match Record::find(&self.gateway, self.owner.as_ref(), id) {
                    Ok(record) => Ok(Some(Entry::Detached(record))),
                    Err(e) if e.is_not_found() => Ok(None),
                    Err(e) => Err(e),
                }
            }
        }
    }

    fn fetch(&self) -> RecordResult<Vec<Record<S::Item>>> {
        let kind = <S::Item as Resource>::KIND;
        if self.owner.as_ref().is_some_and(|o| !o.has_identity()) {
            return Ok(Vec::new());
        }
        let filter = S::filter(self.owner.as_ref());
        let entities = self
            .gateway
            .fetch_list(kind, self.owner.as_ref(), filter.as_ref())?;
        info!(kind, owner = ?self.owner, count = entities.len(), "Loaded collection");
        Ok(entities
            .into_iter()
            .map(|entity| Record::from_entity(&self.gateway, entity))
            .collect())
    }

    /// Loads the list if needed and returns it.
    pub fn load(&mut self) -> RecordResult<&mut Vec<Record<S::Item>>> {
        if self.items.is_none() {
            let records = self.fetch()?;
            self.items = Some(records);
        }
        Ok(self.items.get_or_insert_with(Vec::new))
    }

    /// Forgets the cached list; the next access fetches again.
    pub fn reload(&mut self) {
        self.items = None;
    }

    pub fn iter(&mut self) -> RecordResult<std::slice::Iter<'_, Record<S::Item>>> {
        Ok(self.load()?.iter())
    }

    pub fn iter_mut(&mut self) -> RecordResult<std::slice::IterMut<'_, Record<S::Item>>> {
        Ok(self.load()?.iter_mut())
    }

    pub fn len(&mut self) -> RecordResult<usize> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&mut self) -> RecordResult<bool> {
        Ok(self.load()?.is_empty())
    }

    pub fn contains(&mut self, id: &str) -> RecordResult<bool> {
        Ok(self.load()?.iter().any(|record| record.id() == Some(id)))
    }

    pub fn ids(&mut self) -> RecordResult<Vec<String>> {
        Ok(self
            .load()?
            .iter()
            .filter_map(|record| record.id().map(str::to_owned))
            .collect())
    }

    pub fn find_by(
        &mut self,
        mut predicate: impl FnMut(&Record<S::Item>) -> bool,
    ) -> RecordResult<Option<&mut Record<S::Item>>> {
        Ok(self.load()?.iter_mut().find(|record| predicate(record)))
    }
}

impl<S: CollectionScope> Debug for Collection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("kind", &<S::Item as Resource>::KIND)
            .field("owner", &self.owner)
            .field("loaded", &self.items.as_ref().map(Vec::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::framework::{ApiError, MockTransport};

    struct Note;

    impl Resource for Note {
        const KIND: &'static str = "note";
        const ATTRIBUTES: &'static [&'static str] = &["id", "widget_id", "body"];
    }

    struct Notes;

    impl CollectionScope for Notes {
        type Item = Note;
        const OWNER_KEY: &'static str = "widget_id";
    }

    fn owner(id: &str) -> Option<OwnerRef> {
        Some(OwnerRef::new("widget", "widget_id", id))
    }

    #[test]
    fn build_prefills_owner_key() {
        let mock = MockTransport::new();
        let notes = Collection::<Notes>::new(&mock.gateway(), owner("w1"));

        let note = notes.build(attrs! { "body" => "hi" }).unwrap();
        assert_eq!(note.get_str("widget_id"), Some("w1"));
        assert!(!note.is_persisted());

        let note = notes.build(attrs! { "widget_id" => "w2" }).unwrap();
        assert_eq!(note.get_str("widget_id"), Some("w2"));
    }

    #[test]
    fn unscoped_defaults_are_empty() {
        let mock = MockTransport::new();
        assert!(Collection::<Notes>::unscoped(&mock.gateway()).default_options().is_empty());
    }

    #[test]
    fn loads_once() {
        let mock = MockTransport::new();
        mock.expect_fetch_list("note")
            .return_ok(vec![attrs! { "id" => "n1", "widget_id" => "w1" }]);
        let mut notes = Collection::<Notes>::new(&mock.gateway(), owner("w1"));

        assert!(!notes.is_loaded());
        assert_eq!(notes.len().unwrap(), 1);
        assert!(notes.is_loaded());
        assert!(notes.contains("n1").unwrap());
        assert_eq!(notes.ids().unwrap(), vec!["n1".to_string()]);
        assert_eq!(mock.call_count(), 1);
        mock.verify();
    }

    #[test]
    fn failed_load_stays_unloaded() {
        let mock = MockTransport::new();
        mock.expect_fetch_list("note").return_err(ApiError::transport("timeout"));
        mock.expect_fetch_list("note").return_ok(vec![]);
        let mut notes = Collection::<Notes>::new(&mock.gateway(), owner("w1"));

        assert!(notes.len().is_err());
        assert!(!notes.is_loaded());
        assert!(notes.is_empty().unwrap());
        mock.verify();
    }

    #[test]
    fn owner_without_identity_has_no_members() {
        let mock = MockTransport::new();
        let mut notes = Collection::<Notes>::new(&mock.gateway(), owner(""));

        assert!(notes.is_empty().unwrap());
        assert!(notes.find("n1").unwrap().is_none());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn find_without_loading_asks_remote() {
        let mock = MockTransport::new();
        mock.expect_fetch_one("note", "n1")
            .return_ok(attrs! { "id" => "n1", "widget_id" => "w1" });
        mock.expect_fetch_one("note", "n9")
            .return_err(ApiError::not_found("note", "n9"));
        let mut notes = Collection::<Notes>::new(&mock.gateway(), owner("w1"));

        let found = notes.find("n1").unwrap().unwrap();
        assert!(!found.is_cached());
        assert_eq!(found.get_str("widget_id"), Some("w1"));
        assert!(notes.find("n9").unwrap().is_none());
        assert!(!notes.is_loaded());

        let calls = mock.calls();
        assert_eq!(calls[0].scope, owner("w1"));
        mock.verify();
    }

    #[test]
    fn find_when_loaded_serves_cache() {
        let mock = MockTransport::new();
        mock.expect_fetch_list("note")
            .return_ok(vec![attrs! { "id" => "n1", "widget_id" => "w1" }]);
        let mut notes = Collection::<Notes>::new(&mock.gateway(), owner("w1"));
        notes.load().unwrap();

        assert!(notes.find("n1").unwrap().unwrap().is_cached());
        assert!(notes.find("n2").unwrap().is_none());
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn create_appends_only_when_loaded() {
        let mock = MockTransport::new();
        mock.expect_create("note")
            .return_ok(attrs! { "id" => "n1", "widget_id" => "w1", "body" => "a" });
        mock.expect_fetch_list("note").return_ok(vec![]);
        mock.expect_create("note")
            .return_ok(attrs! { "id" => "n2", "widget_id" => "w1", "body" => "b" });
        let mut notes = Collection::<Notes>::new(&mock.gateway(), owner("w1"));

        let first = notes.create(attrs! { "body" => "a" }).unwrap();
        assert!(!first.is_cached());
        assert!(first.is_persisted());
        assert!(!notes.is_loaded());

        notes.load().unwrap();
        let second = notes.create(attrs! { "body" => "b" }).unwrap();
        assert!(second.is_cached());
        assert_eq!(notes.ids().unwrap(), vec!["n2".to_string()]);

        assert_eq!(mock.calls()[0].attrs, Some(attrs! { "widget_id" => "w1", "body" => "a" }));
        mock.verify();
    }

    #[test]
    fn rebind_to_other_owner_resets_cache() {
        let mock = MockTransport::new();
        mock.expect_fetch_list("note").return_ok(vec![]);
        let mut notes = Collection::<Notes>::new(&mock.gateway(), owner("w1"));
        notes.load().unwrap();

        notes.rebind(OwnerRef::new("widget", "widget_id", "w1"));
        assert!(notes.is_loaded());
        notes.rebind(OwnerRef::new("widget", "widget_id", "w2"));
        assert!(!notes.is_loaded());
    }
}
