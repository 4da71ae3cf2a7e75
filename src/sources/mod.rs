//! Feed intake: remote artifacts and the snapshot files they contain.
//!
//! Intake follows a two-phase pattern:
//!
//! 1. **Fetching**: List the crawling job's artifacts and unpack them into the
//!    working directory ([`artifacts`])
//! 2. **Merging**: Read every snapshot file in that directory and fold them
//!    into one deduplicated collection ([`snapshots`])
//!
//! # Working Directory Layout
//!
//! ```text
//! artifacts_json/
//! ├── RSS_FEEDS_2025-05-06_0800.json
//! ├── RSS_FEEDS_2025-05-06_1600.json
//! └── ...
//! ```
//!
//! Fetching always finishes before merging starts; the two never touch the
//! directory at the same time.

pub mod artifacts;
pub mod snapshots;
