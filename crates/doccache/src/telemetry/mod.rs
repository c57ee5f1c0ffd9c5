// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Query cache telemetry.
//!
//! Every orchestrator step is recorded as an operation plus the activity it ended
//! in. Records become structured `tracing` events when logging is enabled and
//! OpenTelemetry counter and histogram samples when a meter is configured.

use tracing::Level;

pub(crate) mod attributes;
pub(crate) mod ext;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
mod query;
#[cfg(test)]
pub(crate) mod testing;

pub(crate) use query::QueryTelemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueryOperation {
    Lookup,
    Execute,
    Store,
    PostStore,
    Delete,
    Clear,
    Script,
}

impl QueryOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lookup => "cache.lookup",
            Self::Execute => "cache.execute",
            Self::Store => "cache.store",
            Self::PostStore => "cache.post_store",
            Self::Delete => "cache.delete",
            Self::Clear => "cache.clear",
            Self::Script => "cache.script",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueryActivity {
    Hit,
    Miss,
    Executed,
    Stored,
    ScriptEvaluated,
    Deleted,
    Cleared,
    Passthrough,
    Error,
}

impl QueryActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Executed => "cache.executed",
            Self::Stored => "cache.stored",
            Self::ScriptEvaluated => "cache.script_evaluated",
            Self::Deleted => "cache.deleted",
            Self::Cleared => "cache.cleared",
            Self::Passthrough => "cache.passthrough",
            Self::Error => "cache.error",
        }
    }

    pub fn severity(self) -> Level {
        match self {
            Self::Hit | Self::Miss | Self::Executed | Self::Passthrough => Level::DEBUG,
            Self::Stored | Self::ScriptEvaluated | Self::Deleted | Self::Cleared => Level::INFO,
            Self::Error => Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_as_str() {
        assert_eq!(QueryOperation::Lookup.as_str(), "cache.lookup");
        assert_eq!(QueryOperation::Execute.as_str(), "cache.execute");
        assert_eq!(QueryOperation::Store.as_str(), "cache.store");
        assert_eq!(QueryOperation::PostStore.as_str(), "cache.post_store");
        assert_eq!(QueryOperation::Delete.as_str(), "cache.delete");
        assert_eq!(QueryOperation::Clear.as_str(), "cache.clear");
        assert_eq!(QueryOperation::Script.as_str(), "cache.script");
    }

    #[test]
    fn activity_as_str() {
        assert_eq!(QueryActivity::Hit.as_str(), "cache.hit");
        assert_eq!(QueryActivity::Miss.as_str(), "cache.miss");
        assert_eq!(QueryActivity::Executed.as_str(), "cache.executed");
        assert_eq!(QueryActivity::Stored.as_str(), "cache.stored");
        assert_eq!(QueryActivity::ScriptEvaluated.as_str(), "cache.script_evaluated");
        assert_eq!(QueryActivity::Deleted.as_str(), "cache.deleted");
        assert_eq!(QueryActivity::Cleared.as_str(), "cache.cleared");
        assert_eq!(QueryActivity::Passthrough.as_str(), "cache.passthrough");
        assert_eq!(QueryActivity::Error.as_str(), "cache.error");
    }

    #[test]
    fn activity_severity() {
        assert_eq!(QueryActivity::Hit.severity(), Level::DEBUG);
        assert_eq!(QueryActivity::Miss.severity(), Level::DEBUG);
        assert_eq!(QueryActivity::Passthrough.severity(), Level::DEBUG);
        assert_eq!(QueryActivity::Stored.severity(), Level::INFO);
        assert_eq!(QueryActivity::Cleared.severity(), Level::INFO);
        assert_eq!(QueryActivity::Error.severity(), Level::ERROR);
    }
}
