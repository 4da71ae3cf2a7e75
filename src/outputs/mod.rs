//! Output generation for the digest.
//!
//! # Submodules
//!
//! - [`html`]: Renders merged feeds into the HTML body of the digest email
//!
//! The document lives only for the duration of a run: it is either handed to
//! the mail dispatcher or, with `--dry-run`, written to stdout.

pub mod html;
