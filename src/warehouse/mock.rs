//! Scripted warehouse driver double.
//!
//! Records the exact call sequence the orchestrator issues and can be
//! programmed to fail at any point of the protocol. Used by this crate's
//! test suites and useful to embedders for dry runs; internals are `Rc`
//! based, so clones observe the same recording.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;

use super::{ConnectRequest, DriverError, DriverResult, WarehouseDriver};

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    /// A connect with the full request the orchestrator built
    Connect(ConnectRequest),
    /// An executed SQL statement
    Execute(String),
    /// A session release
    Close,
}

#[derive(Debug, Clone)]
enum FailurePoint {
    Connect,
    SqlContaining(String),
    Close,
}

#[derive(Debug, Clone)]
struct PlannedFailure {
    point: FailurePoint,
    error: DriverError,
}

/// Recording driver double with scripted failures.
#[derive(Clone, Default)]
pub struct MockDriver {
    calls: Rc<RefCell<Vec<DriverCall>>>,
    failures: Rc<RefCell<Vec<PlannedFailure>>>,
}

impl MockDriver {
    /// Create a driver that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the connect call with the given error.
    pub fn fail_on_connect(&self, error: DriverError) {
        self.failures.borrow_mut().push(PlannedFailure {
            point: FailurePoint::Connect,
            error,
        });
    }

    /// Fail any executed statement containing `fragment`.
    pub fn fail_on_sql(&self, fragment: &str, error: DriverError) {
        self.failures.borrow_mut().push(PlannedFailure {
            point: FailurePoint::SqlContaining(fragment.to_string()),
            error,
        });
    }

    /// Fail the close call with the given error.
    pub fn fail_on_close(&self, error: DriverError) {
        self.failures.borrow_mut().push(PlannedFailure {
            point: FailurePoint::Close,
            error,
        });
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.borrow().clone()
    }

    /// Only the executed SQL statements, in order.
    pub fn executed_sql(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                DriverCall::Execute(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    fn failure_for_connect(&self) -> Option<DriverError> {
        self.failures
            .borrow()
            .iter()
            .find(|f| matches!(f.point, FailurePoint::Connect))
            .map(|f| f.error.clone())
    }

    fn failure_for_sql(&self, statement: &str) -> Option<DriverError> {
        self.failures
            .borrow()
            .iter()
            .find(|f| match &f.point {
                FailurePoint::SqlContaining(fragment) => statement.contains(fragment.as_str()),
                _ => false,
            })
            .map(|f| f.error.clone())
    }

    fn failure_for_close(&self) -> Option<DriverError> {
        self.failures
            .borrow()
            .iter()
            .find(|f| matches!(f.point, FailurePoint::Close))
            .map(|f| f.error.clone())
    }
}

#[async_trait(?Send)]
impl WarehouseDriver for MockDriver {
    async fn connect(&self, request: &ConnectRequest) -> DriverResult<()> {
        self.calls
            .borrow_mut()
            .push(DriverCall::Connect(request.clone()));
        match self.failure_for_connect() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn execute(&self, statement: &str) -> DriverResult<()> {
        self.calls
            .borrow_mut()
            .push(DriverCall::Execute(statement.to_string()));
        match self.failure_for_sql(statement) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn close(&self) -> DriverResult<()> {
        self.calls.borrow_mut().push(DriverCall::Close);
        match self.failure_for_close() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn driver_name(&self) -> &'static str {
        "mock"
    }
}
