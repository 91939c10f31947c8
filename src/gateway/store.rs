//! State of the in-memory vault. Owned exclusively by the
//! [`StoreActor`](super::StoreActor), so no locking is needed.

use crate::framework::{ApiError, Attributes, Entity, FieldError, OwnerRef, TransportError, Value};
use crate::gateway::schema::{self, codes, KindSchema, ADDRESS, CREDIT_CARD, CUSTOMER, TRANSACTION};
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Store {
    tables: HashMap<&'static str, Vec<Entity>>,
    sequence: u64,
}

/// RFC 3339 timestamp in UTC, e.g. `2026-10-19T08:30:00Z`.
fn now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn identifier(entity: &Entity, attribute: &str) -> Option<String> {
    entity.get(attribute).and_then(Value::as_identifier)
}

fn in_scope(entity: &Entity, scope: Option<&OwnerRef>) -> bool {
    scope.map_or(true, |s| identifier(entity, s.key()).as_deref() == Some(s.id()))
}

fn invalid(errors: Vec<FieldError>) -> Result<(), TransportError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TransportError::Validation(errors))
    }
}

fn prefixed(prefix: &str, errors: Vec<FieldError>) -> impl Iterator<Item = FieldError> + '_ {
    errors.into_iter().map(move |mut e| {
        e.field = format!("{prefix}.{}", e.field);
        e
    })
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities across all kinds.
    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn table(&self, kind: &str) -> &[Entity] {
        self.tables.get(kind).map(Vec::as_slice).unwrap_or_default()
    }

    fn position(&self, schema: &KindSchema, scope: Option<&OwnerRef>, id: &str) -> Option<usize> {
        self.table(schema.kind).iter().position(|entity| {
            identifier(entity, schema.id_attribute).as_deref() == Some(id) && in_scope(entity, scope)
        })
    }

    fn find(&self, kind: &str, id: &str) -> Option<&Entity> {
        let schema = schema::schema(kind).ok()?;
        self.position(schema, None, id)
            .map(|index| &self.table(kind)[index])
    }

    fn ensure_owner(&self, scope: Option<&OwnerRef>) -> Result<(), TransportError> {
        if let Some(owner) = scope {
            schema::schema(owner.kind())?;
            if self.find(owner.kind(), owner.id()).is_none() {
                return Err(ApiError::not_found(owner.kind(), owner.id()).into());
            }
        }
        Ok(())
    }

    fn next_id(&mut self, schema: &KindSchema) -> String {
        loop {
            self.sequence += 1;
            let id = match schema.id_prefix {
                Some(prefix) => format!("{prefix}{}", self.sequence),
                None => self.sequence.to_string(),
            };
            if self.find(schema.kind, &id).is_none() {
                return id;
            }
        }
    }

    fn insert(&mut self, schema: &'static KindSchema, mut attrs: Attributes) -> Entity {
        if identifier(&attrs, schema.id_attribute).is_none() {
            let id = self.next_id(schema);
            attrs.insert(schema.id_attribute.to_string(), id.into());
        }
        let stamp = now();
        attrs.insert("created_at".into(), stamp.clone());
        attrs.insert("updated_at".into(), stamp);
        self.tables.entry(schema.kind).or_default().push(attrs.clone());
        attrs
    }

    pub fn fetch_one(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        id: &str,
    ) -> Result<Entity, TransportError> {
        let schema = schema::schema(kind)?;
        self.ensure_owner(scope)?;
        self.position(schema, scope, id)
            .map(|index| self.table(kind)[index].clone())
            .ok_or_else(|| ApiError::not_found(kind, id).into())
    }

    pub fn fetch_list(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        filter: Option<&Attributes>,
    ) -> Result<Vec<Entity>, TransportError> {
        schema::schema(kind)?;
        self.ensure_owner(scope)?;
        Ok(self
            .table(kind)
            .iter()
            .filter(|entity| in_scope(entity, scope))
            .filter(|entity| {
                filter.map_or(true, |f| f.iter().all(|(key, value)| entity.get(key) == Some(value)))
            })
            .cloned()
            .collect())
    }

    pub fn create(
        &mut self,
        kind: &str,
        scope: Option<&OwnerRef>,
        mut attrs: Attributes,
    ) -> Result<Entity, TransportError> {
        let schema = schema::schema(kind)?;
        self.ensure_owner(scope)?;
        attrs.retain(|_, value| !value.is_null());
        if let Some(owner) = scope {
            attrs.insert(owner.key().to_string(), owner.id().into());
        }
        match schema.kind {
            CUSTOMER => self.create_customer(schema, attrs),
            CREDIT_CARD => self.create_card(schema, attrs),
            TRANSACTION => self.create_transaction(schema, attrs),
            _ => {
                invalid(schema::check_address(&attrs))?;
                if let Some(customer_id) = identifier(&attrs, "customer_id") {
                    self.ensure_exists(CUSTOMER, &customer_id)?;
                }
                Ok(self.insert(schema, attrs))
            }
        }
    }

    fn ensure_exists(&self, kind: &str, id: &str) -> Result<(), TransportError> {
        match self.find(kind, id) {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found(kind, id).into()),
        }
    }

    fn create_customer(
        &mut self,
        schema: &'static KindSchema,
        mut attrs: Attributes,
    ) -> Result<Entity, TransportError> {
        let card = match attrs.remove("credit_card") {
            Some(Value::Map(card)) => Some(card),
            _ => None,
        };

        let mut errors = schema::check_customer(&attrs);
        if let Some(id) = identifier(&attrs, "id") {
            if self.find(CUSTOMER, &id).is_some() {
                errors.push(FieldError::with_code(
                    "id",
                    "has already been taken",
                    codes::CUSTOMER_ID_TAKEN,
                ));
            }
        }
        if let Some(card) = &card {
            errors.extend(prefixed("credit_card", schema::check_card(card, true)));
        }
        invalid(errors)?;

        let customer = self.insert(schema, attrs);
        if let (Some(mut card), Some(id)) = (card, identifier(&customer, "id")) {
            card.insert("customer_id".into(), id.into());
            let card_schema = schema::schema(CREDIT_CARD)?;
            self.create_card(card_schema, card)?;
        }
        Ok(customer)
    }

    fn create_card(
        &mut self,
        schema: &'static KindSchema,
        mut attrs: Attributes,
    ) -> Result<Entity, TransportError> {
        let mut errors = schema::check_card(&attrs, true);
        let customer_id = identifier(&attrs, "customer_id");
        match &customer_id {
            Some(id) => self.ensure_exists(CUSTOMER, id)?,
            None => errors.push(FieldError::with_code(
                "customer_id",
                "is required",
                codes::CUSTOMER_ID_REQUIRED,
            )),
        }
        if let Some(Value::Map(billing)) = attrs.get("billing_address") {
            let nested = schema::check_address(billing)
                .into_iter()
                .filter(|e| e.field != "customer_id")
                .collect();
            errors.extend(prefixed("billing_address", nested));
        }
        invalid(errors)?;

        schema::vault_card(&mut attrs);
        let first = self
            .table(CREDIT_CARD)
            .iter()
            .all(|card| identifier(card, "customer_id") != customer_id);
        let default = first || attrs.get("default").and_then(Value::as_bool) == Some(true);
        if default {
            self.clear_default(customer_id.as_deref());
        }
        attrs.insert("default".into(), default.into());
        Ok(self.insert(schema, attrs))
    }

    fn clear_default(&mut self, customer_id: Option<&str>) {
        if let Some(cards) = self.tables.get_mut(CREDIT_CARD) {
            for card in cards
                .iter_mut()
                .filter(|card| identifier(card, "customer_id").as_deref() == customer_id)
            {
                card.insert("default".into(), false.into());
            }
        }
    }

    fn create_transaction(
        &mut self,
        schema: &'static KindSchema,
        mut attrs: Attributes,
    ) -> Result<Entity, TransportError> {
        let mut errors = schema::check_transaction(&attrs);

        let card = match identifier(&attrs, "payment_method_token") {
            Some(token) => self.find(CREDIT_CARD, &token),
            None => identifier(&attrs, "customer_id").and_then(|customer_id| {
                self.table(CREDIT_CARD).iter().find(|card| {
                    identifier(card, "customer_id").as_deref() == Some(customer_id.as_str())
                        && card.get("default").and_then(Value::as_bool) == Some(true)
                })
            }),
        };
        let card = card.map(|card| (identifier(card, "token"), identifier(card, "customer_id")));
        match card {
            Some((token, customer_id)) => {
                attrs.insert("payment_method_token".into(), token.into());
                attrs.insert("customer_id".into(), customer_id.into());
            }
            None => errors.push(FieldError::with_code(
                "payment_method_token",
                "is invalid",
                codes::PAYMENT_METHOD_INVALID,
            )),
        }
        invalid(errors)?;

        if let Some(amount) = attrs.get("amount").and_then(Value::as_f64) {
            attrs.insert("amount".into(), format!("{amount:.2}").into());
        }
        attrs.insert("status".into(), "authorized".into());
        Ok(self.insert(schema, attrs))
    }

    pub fn update(
        &mut self,
        kind: &str,
        scope: Option<&OwnerRef>,
        id: &str,
        mut attrs: Attributes,
    ) -> Result<Entity, TransportError> {
        let schema = schema::schema(kind)?;
        self.ensure_owner(scope)?;
        let index = self
            .position(schema, scope, id)
            .ok_or_else(|| ApiError::not_found(kind, id))?;

        for fixed in [schema.id_attribute, "created_at", "updated_at", "credit_card"] {
            attrs.remove(fixed);
        }
        if let Some(owner) = scope {
            attrs.remove(owner.key());
        }

        let mut merged = self.table(kind)[index].clone();
        merged.extend(attrs);
        merged.retain(|_, value| !value.is_null());
        match schema.kind {
            CREDIT_CARD => {
                invalid(schema::check_card(&merged, false))?;
                schema::vault_card(&mut merged);
                if merged.get("default").and_then(Value::as_bool) == Some(true) {
                    let customer_id = identifier(&merged, "customer_id");
                    self.clear_default(customer_id.as_deref());
                }
            }
            TRANSACTION => invalid(schema::check_transaction(&merged))?,
            ADDRESS => invalid(schema::check_address(&merged))?,
            _ => invalid(schema::check_customer(&merged))?,
        }
        merged.insert("updated_at".into(), now());

        let table = self.tables.entry(schema.kind).or_default();
        table[index] = merged.clone();
        Ok(merged)
    }

    pub fn delete(
        &mut self,
        kind: &str,
        scope: Option<&OwnerRef>,
        id: &str,
    ) -> Result<(), TransportError> {
        let schema = schema::schema(kind)?;
        self.ensure_owner(scope)?;
        let index = self
            .position(schema, scope, id)
            .ok_or_else(|| ApiError::not_found(kind, id))?;
        self.tables.entry(schema.kind).or_default().remove(index);

        if schema.kind == CUSTOMER {
            for child in [ADDRESS, CREDIT_CARD] {
                if let Some(table) = self.tables.get_mut(child) {
                    table.retain(|entity| identifier(entity, "customer_id").as_deref() != Some(id));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    fn card() -> Attributes {
        attrs! { "number" => "4111111111111111", "cvv" => "123", "expiration_date" => "05/2037" }
    }

    fn owner(id: &str) -> OwnerRef {
        OwnerRef::new(CUSTOMER, "customer_id", id)
    }

    #[test]
    fn customer_ids_are_numeric_unless_given() {
        let mut store = Store::new();
        let first = store.create(CUSTOMER, None, attrs! { "first_name" => "Foo" }).unwrap();
        let named = store.create(CUSTOMER, None, attrs! { "id" => "vip" }).unwrap();

        assert_eq!(first["id"].as_str(), Some("1"));
        assert_eq!(named["id"].as_str(), Some("vip"));
        assert!(first.contains_key("created_at"));
    }

    #[test]
    fn timestamps_are_rfc3339() {
        let mut store = Store::new();
        let created = store.create(CUSTOMER, None, attrs! {}).unwrap();
        let stamp = created["created_at"].as_str().expect("string timestamp");
        let parsed = chrono::DateTime::parse_from_rfc3339(stamp).expect("valid RFC 3339");
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        assert_eq!(created["updated_at"], created["created_at"]);
    }

    #[test]
    fn explicit_null_clears_field() {
        let mut store = Store::new();
        store
            .create(CUSTOMER, None, attrs! { "id" => "c1", "first_name" => "Foo", "email" => "foo@example.com" })
            .unwrap();
        let updated = store
            .update(CUSTOMER, None, "c1", attrs! { "email" => Value::Null })
            .unwrap();

        assert!(!updated.contains_key("email"));
        assert_eq!(updated["first_name"].as_str(), Some("Foo"));
        let fetched = store.fetch_one(CUSTOMER, None, "c1").unwrap();
        assert!(!fetched.contains_key("email"));
    }

    #[test]
    fn duplicate_customer_id_is_rejected() {
        let mut store = Store::new();
        store.create(CUSTOMER, None, attrs! { "id" => "vip" }).unwrap();
        match store.create(CUSTOMER, None, attrs! { "id" => "vip" }) {
            Err(TransportError::Validation(errors)) => {
                assert_eq!(errors[0].code.as_deref(), Some(codes::CUSTOMER_ID_TAKEN));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn nested_card_is_vaulted_with_customer() {
        let mut store = Store::new();
        let customer = store
            .create(CUSTOMER, None, attrs! { "id" => "c1", "credit_card" => card() })
            .unwrap();
        assert!(!customer.contains_key("credit_card"));

        let cards = store.fetch_list(CREDIT_CARD, Some(&owner("c1")), None).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0]["default"].as_bool(), Some(true));
        assert!(!cards[0].contains_key("number"));
    }

    #[test]
    fn scoped_reads_need_existing_owner() {
        let store = Store::new();
        let err = store.fetch_list(ADDRESS, Some(&owner("ghost")), None).unwrap_err();
        assert!(matches!(err, TransportError::Api(e) if e.is_not_found()));
    }

    #[test]
    fn scoped_fetch_hides_other_owners_entities() {
        let mut store = Store::new();
        store.create(CUSTOMER, None, attrs! { "id" => "c1" }).unwrap();
        store.create(CUSTOMER, None, attrs! { "id" => "c2" }).unwrap();
        let address = store
            .create(ADDRESS, Some(&owner("c1")), attrs! { "postal_code" => "60622" })
            .unwrap();
        let id = address["id"].as_str().unwrap();

        assert!(store.fetch_one(ADDRESS, Some(&owner("c1")), id).is_ok());
        assert!(store.fetch_one(ADDRESS, Some(&owner("c2")), id).is_err());
        assert!(store.delete(ADDRESS, Some(&owner("c2")), id).is_err());
    }

    #[test]
    fn second_card_is_not_default_unless_asked() {
        let mut store = Store::new();
        store.create(CUSTOMER, None, attrs! { "id" => "c1" }).unwrap();
        let first = store.create(CREDIT_CARD, Some(&owner("c1")), card()).unwrap();
        let second = store.create(CREDIT_CARD, Some(&owner("c1")), card()).unwrap();
        assert_eq!(first["default"].as_bool(), Some(true));
        assert_eq!(second["default"].as_bool(), Some(false));

        let mut third = card();
        third.insert("default".into(), true.into());
        store.create(CREDIT_CARD, Some(&owner("c1")), third).unwrap();
        let defaults = store
            .fetch_list(CREDIT_CARD, Some(&owner("c1")), Some(&attrs! { "default" => true }))
            .unwrap();
        assert_eq!(defaults.len(), 1);
    }

    #[test]
    fn transaction_falls_back_to_default_card() {
        let mut store = Store::new();
        store
            .create(CUSTOMER, None, attrs! { "id" => "c1", "credit_card" => card() })
            .unwrap();
        let txn = store
            .create(TRANSACTION, None, attrs! { "customer_id" => "c1", "amount" => 10, "type" => "sale" })
            .unwrap();

        assert_eq!(txn["amount"].as_str(), Some("10.00"));
        assert!(txn["payment_method_token"].as_str().is_some());
        assert_eq!(txn["status"].as_str(), Some("authorized"));
    }

    #[test]
    fn unknown_payment_method_is_rejected() {
        let mut store = Store::new();
        let err = store
            .create(TRANSACTION, None, attrs! { "payment_method_token" => "nope", "amount" => 1, "type" => "sale" })
            .unwrap_err();
        match err {
            TransportError::Validation(errors) => {
                assert_eq!(errors[0].code.as_deref(), Some(codes::PAYMENT_METHOD_INVALID));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn deleting_customer_cascades() {
        let mut store = Store::new();
        store
            .create(CUSTOMER, None, attrs! { "id" => "c1", "credit_card" => card() })
            .unwrap();
        store
            .create(ADDRESS, Some(&owner("c1")), attrs! { "postal_code" => "60622" })
            .unwrap();

        store.delete(CUSTOMER, None, "c1").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn update_merges_and_keeps_identity() {
        let mut store = Store::new();
        store.create(CUSTOMER, None, attrs! { "id" => "c1", "first_name" => "Foo" }).unwrap();
        let updated = store
            .update(CUSTOMER, None, "c1", attrs! { "id" => "other", "last_name" => "Bar" })
            .unwrap();

        assert_eq!(updated["id"].as_str(), Some("c1"));
        assert_eq!(updated["first_name"].as_str(), Some("Foo"));
        assert_eq!(updated["last_name"].as_str(), Some("Bar"));
    }
}
