//! Hive — a CLI tool for supervising many long-running coding-assistant
//! "drones" in parallel, each in its own git worktree, via a file-based
//! status protocol.
//!
//! # Modules
//!
//! - `config`: paths, two-tier configuration, profile management
//! - `types`: shared data model (plans, tasks, drone status)
//! - `plan`: plan-file loading, markdown/legacy-JSON parsing, validation
//! - `worktree`: git worktree creation, reuse, and teardown
//! - `state`: the atomically-rewritten per-drone status store
//! - `supervisor`: spawning and stopping drone processes
//! - `lifecycle`: the start/stop/clean/unblock orchestration built on the above
//! - `aggregator`: read-only status reconciliation and snapshotting
//! - `streamer`: log tailing and session transcript parsing
//! - `tui`: the ratatui-based dashboard, session viewer, and unblock workflow
//! - `commands`: CLI command implementations
//! - `error`: the structured error taxonomy shared across the library

pub mod aggregator;
pub mod commands;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod plan;
pub mod state;
pub mod streamer;
pub mod supervisor;
pub mod tui;
pub mod types;
pub mod worktree;
