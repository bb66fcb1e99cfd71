// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Results reported by the split and compress operations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Outcome of splitting one document into per-page files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitReport {
    /// Directory the pages were written into.
    pub destination: PathBuf,
    /// Written files, in page order.
    pub written: Vec<PathBuf>,
    /// 1-based numbers of pages that could not be rasterised.
    pub skipped_pages: Vec<u32>,
}

/// What happened to one input of a compress run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Written {
        path: PathBuf,
        skipped_pages: Vec<u32>,
    },
    Failed {
        reason: String,
    },
}

impl DocumentOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Written { path, .. } => Some(path),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Outcome of compressing a batch of documents. `outcomes` has one entry per
/// input, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompressReport {
    pub written: Vec<PathBuf>,
    pub outcomes: Vec<DocumentOutcome>,
}

impl CompressReport {
    pub fn from_outcomes(outcomes: Vec<DocumentOutcome>) -> Self {
        let written = outcomes
            .iter()
            .filter_map(|outcome| outcome.path().map(Path::to_path_buf))
            .collect();
        Self { written, outcomes }
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.written.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_paths_follow_outcome_order() {
        let report = CompressReport::from_outcomes(vec![
            DocumentOutcome::Written {
                path: "b.pdf".into(),
                skipped_pages: vec![],
            },
            DocumentOutcome::Failed {
                reason: "corrupt".into(),
            },
            DocumentOutcome::Written {
                path: "a.pdf".into(),
                skipped_pages: vec![2],
            },
        ]);
        assert_eq!(report.written, vec![PathBuf::from("b.pdf"), PathBuf::from("a.pdf")]);
        assert_eq!(report.failed_count(), 1);
    }

    #[test]
    fn outcomes_serialise_with_a_status_tag() {
        let json = serde_json::to_value(DocumentOutcome::Failed {
            reason: "corrupt".into(),
        })
        .expect("serialise");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "corrupt");
    }
}
