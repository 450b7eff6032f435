//! Reconciliation against the artifact index
//!
//! After aggregation, the image digests a build observed are correlated with
//! what the artifact index actually stores. Every matching entry is tagged
//! with the build's identity properties and registered as a deployed artifact.
//!
//! The index is queried once with a disjunction over all digests. Digests the
//! index does not know about are dropped without error; the index may still be
//! catching up with the registry push.

use buildinfo_digest::Digest;
use buildinfo_index::{BuildProperties, IndexEntry, IndexError, MatchField, SearchQuery};
use tracing::{debug, info};

use crate::record::{Artifact, BuildInfo, RecordState, RecordStateError};

/// Artifact index collaborator.
///
/// Implementations own transport, authentication and timeouts. Failures are
/// returned as-is and never retried here.
pub trait ArtifactIndex: Send + Sync {
    /// Run a query in the index mini-language
    fn search(&self, query: &str) -> Result<Vec<IndexEntry>, IndexError>;

    /// Attach properties to the entry at `path`. Must be idempotent.
    fn set_properties(&self, path: &str, properties: &BuildProperties) -> Result<(), IndexError>;
}

/// Errors for reconciliation
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Artifact index error: {0}")]
    Index(#[from] IndexError),

    #[error(transparent)]
    State(#[from] RecordStateError),
}

/// Outcome of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Digests included in the query
    pub queried_digests: usize,
    /// Entries returned by the index (each one was tagged)
    pub matched_entries: usize,
    /// Entries that were not already in the deployed-artifacts set
    pub new_artifacts: usize,
}

/// Match field used for a digest.
///
/// Self-hash digests are compared with the checksum the index computed; every
/// other algorithm is assumed to be sha256 and matched against the property
/// registries stamp on blobs.
pub fn match_field(digest: &Digest) -> MatchField {
    if digest.is_self_hash() {
        MatchField::ActualSha1
    } else {
        MatchField::Sha256Property
    }
}

/// Build the single disjunctive query covering every digest
pub fn build_query<'a>(digests: impl IntoIterator<Item = &'a Digest>) -> SearchQuery {
    digests
        .into_iter()
        .fold(SearchQuery::new(), |query, digest| {
            query.or_match(match_field(digest), digest.value())
        })
}

/// Reconciles open records against an index
pub struct Reconciler<'a> {
    index: &'a dyn ArtifactIndex,
    enabled: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(index: &'a dyn ArtifactIndex) -> Self {
        Self {
            index,
            enabled: true,
        }
    }

    /// When disabled, records are moved to `Reconciled` without contacting the index.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Reconcile an open record and move it to `Reconciled`.
    ///
    /// On an index failure the record stays `Open`; entries tagged before the
    /// failure keep their artifacts in the record.
    pub fn reconcile(&self, record: &mut BuildInfo) -> Result<ReconcileReport, ReconcileError> {
        if record.state() != RecordState::Open {
            return Err(RecordStateError::WrongState {
                expected: RecordState::Open,
                actual: record.state(),
            }
            .into());
        }

        let mut report = ReconcileReport::default();
        let digests = record.image().digests();

        if self.enabled && !digests.is_empty() {
            let query = build_query(digests);
            report.queried_digests = query.criteria().len();
            debug!(digests = report.queried_digests, "querying artifact index");

            let entries = self.index.search(&query.to_query_string())?;
            let properties = BuildProperties::new(
                record.name(),
                record.number(),
                record.start_millis(),
            );

            for entry in entries {
                let path = entry.located_path();
                self.index.set_properties(&path, &properties)?;
                report.matched_entries += 1;

                let mut artifact = Artifact::new(entry.name);
                if let Some(sha1) = entry.actual_sha1 {
                    artifact = artifact.with_sha1(sha1);
                }
                if record.insert_reconciled_artifact(artifact) {
                    report.new_artifacts += 1;
                }
                debug!(path = %path, "tagged index entry");
            }
        }

        record.transition(RecordState::Reconciled)?;
        info!(
            build = %record.name(),
            number = %record.number(),
            queried = report.queried_digests,
            matched = report.matched_entries,
            new = report.new_artifacts,
            "reconciled record"
        );
        Ok(report)
    }
}

/// Reconcile with an enabled [`Reconciler`]
pub fn reconcile(
    record: &mut BuildInfo,
    index: &dyn ArtifactIndex,
) -> Result<ReconcileReport, ReconcileError> {
    Reconciler::new(index).reconcile(record)
}
