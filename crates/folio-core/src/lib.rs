// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio core: types, errors, configuration, and the output naming policy
// shared across all crates.

pub mod config;
pub mod error;
pub mod naming;
pub mod report;
pub mod types;

pub use config::FolioConfig;
pub use error::FolioError;
pub use naming::NamingPolicy;
pub use report::{CompressReport, DocumentOutcome, SplitReport};
pub use types::*;
