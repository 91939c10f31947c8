//! # Mock Transport
//!
//! Utilities for testing records and collections without a remote service.
//!
//! [`MockTransport`] answers calls from a queue of expectations, in order.
//! Register them with the fluent builders, hand [`MockTransport::gateway`] to
//! the code under test, then call [`MockTransport::verify`].
//!
//! ```ignore
//! let mock = MockTransport::new();
//! mock.expect_fetch_one("customer", "c1").return_ok(attrs! { "id" => "c1" });
//! mock.expect_create("address").return_validation(vec![FieldError::new("postal_code", "is invalid")]);
//!
//! let gateway = mock.gateway();
//! // Use gateway in tests...
//! mock.verify(); // Ensures all expectations were met
//! ```
//!
//! A request that does not match the next expectation panics, which fails
//! the test at the offending call.

use crate::framework::error::{ApiError, FieldError, TransportError};
use crate::framework::transport::{Gateway, OwnerRef, Transport};
use crate::framework::value::{Attributes, Entity};
use std::collections::VecDeque;
use std::fmt::{self, Display};
use std::sync::{Arc, Mutex};

/// Transport operation, as seen by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FetchOne,
    FetchList,
    Create,
    Update,
    Delete,
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::FetchOne => "fetch_one",
            Operation::FetchList => "fetch_list",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// One request received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub operation: Operation,
    pub kind: String,
    pub scope: Option<OwnerRef>,
    pub id: Option<String>,
    pub attrs: Option<Attributes>,
}

enum Response {
    Entity(Result<Entity, TransportError>),
    List(Result<Vec<Entity>, TransportError>),
    Unit(Result<(), TransportError>),
}

struct Expectation {
    operation: Operation,
    kind: String,
    id: Option<String>,
    response: Response,
}

type Queue = Arc<Mutex<VecDeque<Expectation>>>;

/// A transport with expectation tracking for fluent testing.
#[derive(Clone, Default)]
pub struct MockTransport {
    expectations: Queue,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockTransport {
    /// Creates a new mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a gateway backed by this mock.
    pub fn gateway(&self) -> Gateway {
        Gateway::new(self.clone())
    }

    pub fn expect_fetch_one(&self, kind: &str, id: &str) -> EntityExpectationBuilder {
        EntityExpectationBuilder::new(self, Operation::FetchOne, kind, Some(id))
    }

    pub fn expect_fetch_list(&self, kind: &str) -> ListExpectationBuilder {
        ListExpectationBuilder {
            kind: kind.to_string(),
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_create(&self, kind: &str) -> EntityExpectationBuilder {
        EntityExpectationBuilder::new(self, Operation::Create, kind, None)
    }

    pub fn expect_update(&self, kind: &str, id: &str) -> EntityExpectationBuilder {
        EntityExpectationBuilder::new(self, Operation::Update, kind, Some(id))
    }

    pub fn expect_delete(&self, kind: &str, id: &str) -> DeleteExpectationBuilder {
        DeleteExpectationBuilder {
            kind: kind.to_string(),
            id: id.to_string(),
            expectations: self.expectations.clone(),
        }
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }

    fn respond(
        &self,
        operation: Operation,
        kind: &str,
        scope: Option<&OwnerRef>,
        id: Option<&str>,
        attrs: Option<&Attributes>,
    ) -> Response {
        self.calls.lock().unwrap().push(Call {
            operation,
            kind: kind.to_string(),
            scope: scope.cloned(),
            id: id.map(str::to_owned),
            attrs: attrs.cloned(),
        });

        let expectation = self.expectations.lock().unwrap().pop_front();
        match expectation {
            Some(exp) if exp.operation == operation && exp.kind == kind && (exp.id.is_none() || exp.id.as_deref() == id) => {
                exp.response
            }
            Some(exp) => panic!(
                "Unexpected request or expectation mismatch: got {operation} {kind} {id:?}, expected {} {} {:?}",
                exp.operation, exp.kind, exp.id
            ),
            None => panic!("Unexpected request: {operation} {kind} {id:?}"),
        }
    }
}

impl Transport for MockTransport {
    fn fetch_one(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        id: &str,
    ) -> Result<Entity, TransportError> {
        match self.respond(Operation::FetchOne, kind, scope, Some(id), None) {
            Response::Entity(result) => result,
            _ => unreachable!("fetch_one expectations carry an entity"),
        }
    }

    fn fetch_list(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        filter: Option<&Attributes>,
    ) -> Result<Vec<Entity>, TransportError> {
        match self.respond(Operation::FetchList, kind, scope, None, filter) {
            Response::List(result) => result,
            _ => unreachable!("fetch_list expectations carry a list"),
        }
    }

    fn create(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        attrs: &Attributes,
    ) -> Result<Entity, TransportError> {
        match self.respond(Operation::Create, kind, scope, None, Some(attrs)) {
            Response::Entity(result) => result,
            _ => unreachable!("create expectations carry an entity"),
        }
    }

    fn update(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        id: &str,
        attrs: &Attributes,
    ) -> Result<Entity, TransportError> {
        match self.respond(Operation::Update, kind, scope, Some(id), Some(attrs)) {
            Response::Entity(result) => result,
            _ => unreachable!("update expectations carry an entity"),
        }
    }

    fn delete(&self, kind: &str, scope: Option<&OwnerRef>, id: &str) -> Result<(), TransportError> {
        match self.respond(Operation::Delete, kind, scope, Some(id), None) {
            Response::Unit(result) => result,
            _ => unreachable!("delete expectations carry no payload"),
        }
    }
}

/// Builder for fetch-one, create and update expectations.
pub struct EntityExpectationBuilder {
    operation: Operation,
    kind: String,
    id: Option<String>,
    expectations: Queue,
}

impl EntityExpectationBuilder {
    fn new(mock: &MockTransport, operation: Operation, kind: &str, id: Option<&str>) -> Self {
        Self {
            operation,
            kind: kind.to_string(),
            id: id.map(str::to_owned),
            expectations: mock.expectations.clone(),
        }
    }

    fn push(self, response: Result<Entity, TransportError>) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation {
            operation: self.operation,
            kind: self.kind,
            id: self.id,
            response: Response::Entity(response),
        });
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, entity: Entity) {
        self.push(Ok(entity));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: ApiError) {
        self.push(Err(TransportError::Api(error)));
    }

    /// Sets the expectation to reject the payload.
    pub fn return_validation(self, errors: Vec<FieldError>) {
        self.push(Err(TransportError::Validation(errors)));
    }
}

/// Builder for `fetch_list` expectations.
pub struct ListExpectationBuilder {
    kind: String,
    expectations: Queue,
}

impl ListExpectationBuilder {
    fn push(self, response: Result<Vec<Entity>, TransportError>) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation {
            operation: Operation::FetchList,
            kind: self.kind,
            id: None,
            response: Response::List(response),
        });
    }

    pub fn return_ok(self, entities: Vec<Entity>) {
        self.push(Ok(entities));
    }

    pub fn return_err(self, error: ApiError) {
        self.push(Err(TransportError::Api(error)));
    }
}

/// Builder for `delete` expectations.
pub struct DeleteExpectationBuilder {
    kind: String,
    id: String,
    expectations: Queue,
}

impl DeleteExpectationBuilder {
    fn push(self, response: Result<(), TransportError>) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation {
            operation: Operation::Delete,
            kind: self.kind,
            id: Some(self.id),
            response: Response::Unit(response),
        });
    }

    pub fn return_ok(self) {
        self.push(Ok(()));
    }

    pub fn return_err(self, error: ApiError) {
        self.push(Err(TransportError::Api(error)));
    }
}
