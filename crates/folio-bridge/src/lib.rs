// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-bridge: the seams between the document pipeline and its host.
//
// The pipeline never touches the disk, sandbox permissions or an asset
// library directly. It talks to the traits defined here, and the host plugs
// in an implementation. `local` provides plain desktop implementations used
// by the CLI and the test-suite.

pub mod local;
pub mod scope;
pub mod traits;

pub use local::{DirectoryAssetSource, LocalFileSystem, UnscopedAccess};
pub use scope::{ScopedAccess, read_scoped};
pub use traits::{AssetImage, AssetSource, FileSystem, PermissionScope};
