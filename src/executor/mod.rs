//! Executor module for the selection-projection operator.
//!
//! [`select_project`] resolves the requested attributes through the catalog,
//! parses the filter literal into the attribute's stored form, and then drives
//! one scan of the source relation, inserting one projected record into the
//! destination per qualifying source record.
//!
//! Rows inserted before a failure stay in the destination; there is no
//! rollback at this layer.

mod lease;
mod projection;
mod resolver;

use std::fmt;

use tracing::{debug, info, instrument};

use crate::catalog::{AttributeCatalog, AttributeDescriptor};
use crate::error::{Result, RelscanError};
use crate::storage::{ScanPredicate, StorageEngine};
use crate::types::CompareOp;

pub use lease::{InsertLease, ScanLease};
pub use projection::ProjectionList;
pub use resolver::{resolve_all, resolve_attribute};

/// Symbolic reference to one attribute of one relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrRef {
    pub relation: String,
    pub attribute: String,
}

impl AttrRef {
    #[must_use]
    pub fn new(relation: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.relation, self.attribute)
    }
}

/// Unresolved filter: attribute, operator and textual literal, present as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRequest {
    pub attribute: AttrRef,
    pub op: CompareOp,
    pub literal: String,
}

/// Arguments of one selection-projection invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectRequest {
    /// Existing relation the projected records are appended to.
    pub destination: String,
    /// Attributes to project, in output order.
    pub projection: Vec<AttrRef>,
    /// Optional filter; `None` selects every record.
    pub filter: Option<FilterRequest>,
}

impl SelectRequest {
    /// Creates a request with an empty projection and no filter.
    #[must_use]
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            projection: Vec::new(),
            filter: None,
        }
    }

    /// Appends an attribute to the projection list.
    #[must_use]
    pub fn project(mut self, relation: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.projection.push(AttrRef::new(relation, attribute));
        self
    }

    /// Sets the filter predicate `relation.attribute op literal`.
    #[must_use]
    pub fn filter(
        mut self,
        relation: impl Into<String>,
        attribute: impl Into<String>,
        op: CompareOp,
        literal: impl Into<String>,
    ) -> Self {
        self.filter = Some(FilterRequest {
            attribute: AttrRef::new(relation, attribute),
            op,
            literal: literal.into(),
        });
        self
    }
}

/// A resolved filter.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    pub attribute: AttributeDescriptor,
    pub op: CompareOp,
    pub literal: String,
}

impl FilterSpec {
    /// Resolves the filter attribute through the catalog.
    ///
    /// # Errors
    ///
    /// See [`resolve_attribute`].
    pub fn resolve(catalog: &dyn AttributeCatalog, request: &FilterRequest) -> Result<Self> {
        let attribute = resolve_attribute(
            catalog,
            &request.attribute.relation,
            &request.attribute.attribute,
        )?;
        Ok(Self {
            attribute,
            op: request.op,
            literal: request.literal.clone(),
        })
    }

    /// Converts the literal to stored form and builds the scan predicate.
    ///
    /// # Errors
    ///
    /// Returns `LiteralParseFailed` if the literal does not parse as the attribute's type.
    pub fn to_predicate(&self) -> Result<ScanPredicate> {
        let attr = &self.attribute;
        let literal = attr.strategy().parse_literal(&self.literal, attr.length())?;
        ScanPredicate::new(attr.layout, attr.attr_type, literal, self.op)
    }
}

/// Outcome of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectSummary {
    pub source_relation: String,
    pub destination: String,
    /// Number of records appended to the destination.
    pub records_inserted: usize,
    /// Length of each appended record.
    pub output_record_length: usize,
}

/// Operator states, in the order a successful invocation visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecState {
    Init,
    OutputOpened,
    SourceOpened,
    Scanning,
    Exhausted,
    Failed,
    Closed,
}

fn enter(state: ExecState) {
    debug!(?state, "select state");
}

/// Pipeline stages that can fail once handles are involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    OutputOpen,
    SourceOpen,
    ScanStart,
    ScanRead,
    Insert,
    ScanEnd,
}

impl Stage {
    fn wrap(self, relation: &str, error: RelscanError) -> RelscanError {
        debug!(state = ?ExecState::Failed, stage = ?self, relation, %error, "select failed");
        let relation = relation.to_string();
        let source = Box::new(error);
        match self {
            Stage::OutputOpen => RelscanError::OutputOpenFailed { relation, source },
            Stage::SourceOpen => RelscanError::SourceOpenFailed { relation, source },
            Stage::ScanStart => RelscanError::ScanStartFailed { relation, source },
            Stage::ScanRead => RelscanError::ScanReadFailed { relation, source },
            Stage::Insert => RelscanError::InsertFailed { relation, source },
            Stage::ScanEnd => RelscanError::ScanEndFailed { relation, source },
        }
    }
}

/// Selects records of one relation and appends their projections to another.
///
/// Every attribute is resolved and the filter literal is parsed before any
/// storage handle is opened. The output handle is acquired first and the
/// source scan second; both are released, in reverse order, on every return
/// path.
///
/// # Errors
///
/// - `SchemaError` for an empty projection, a projection over more than one
///   relation, a filter on a different relation than the projection, or a
///   destination equal to the source
/// - `AttributeNotFound`, `UnsupportedType`, `LayoutViolation` from resolution
/// - `LiteralParseFailed` for a malformed filter literal
/// - `OutputOpenFailed`, `SourceOpenFailed`, `ScanStartFailed`,
///   `ScanReadFailed`, `InsertFailed`, `ScanEndFailed` from the pipeline
#[instrument(skip_all, fields(destination = %request.destination))]
pub fn select_project(
    catalog: &dyn AttributeCatalog,
    storage: &dyn StorageEngine,
    request: &SelectRequest,
) -> Result<SelectSummary> {
    enter(ExecState::Init);
    if request.projection.is_empty() {
        return Err(RelscanError::SchemaError(
            "Projection list must not be empty".into(),
        ));
    }

    let projection = ProjectionList::new(resolve_all(
        catalog,
        request
            .projection
            .iter()
            .map(|r| (r.relation.as_str(), r.attribute.as_str())),
    )?)?;
    let filter = request
        .filter
        .as_ref()
        .map(|f| FilterSpec::resolve(catalog, f))
        .transpose()?;

    let source_relation = projection.source_relation().to_string();
    if let Some(filter) = &filter {
        if filter.attribute.relation != source_relation {
            return Err(RelscanError::SchemaError(format!(
                "Filter attribute {} is not in source relation '{source_relation}'",
                filter.attribute
            )));
        }
    }
    if request.destination == source_relation {
        return Err(RelscanError::SchemaError(format!(
            "Cannot select from '{source_relation}' into itself"
        )));
    }
    let predicate = filter.as_ref().map(FilterSpec::to_predicate).transpose()?;

    let destination = request.destination.as_str();
    let mut output = InsertLease::open(storage, destination)
        .map_err(|e| Stage::OutputOpen.wrap(destination, e))?;
    enter(ExecState::OutputOpened);
    let mut source = ScanLease::open(storage, &source_relation)
        .map_err(|e| Stage::SourceOpen.wrap(&source_relation, e))?;
    enter(ExecState::SourceOpened);

    if let Some(pred) = &predicate {
        debug!(relation = %source_relation, predicate = %pred, "starting filtered scan");
    } else {
        debug!(relation = %source_relation, "starting unconditional scan");
    }
    source
        .start(predicate)
        .map_err(|e| Stage::ScanStart.wrap(&source_relation, e))?;
    enter(ExecState::Scanning);

    while let Some(rid) = source
        .next()
        .map_err(|e| Stage::ScanRead.wrap(&source_relation, e))?
    {
        let record = source
            .fetch(rid)
            .map_err(|e| Stage::ScanRead.wrap(&source_relation, e))?;
        let projected = projection
            .assemble(&record)
            .map_err(|e| Stage::ScanRead.wrap(&source_relation, e))?;
        output
            .insert(&projected)
            .map_err(|e| Stage::Insert.wrap(destination, e))?;
    }

    enter(ExecState::Exhausted);
    source
        .finish()
        .map_err(|e| Stage::ScanEnd.wrap(&source_relation, e))?;
    let records_inserted = output.finish();
    enter(ExecState::Closed);

    info!(
        source = %source_relation,
        destination,
        records_inserted,
        "select completed"
    );
    Ok(SelectSummary {
        source_relation,
        destination: destination.to_string(),
        records_inserted,
        output_record_length: projection.output_length(),
    })
}
