//! Domain models for Workgate.
//!
//! # Core Concepts
//!
//! - [`Project`]: Root container. Owns work items and the rules that gate them.
//! - [`WorkItem`]: A deliverable with two independent lifecycle axes,
//!   [`Status`] and [`Phase`]. Work items can nest via `parent_id`.
//! - [`Task`]: Atomic unit of work inside one work item, auto-assigned to a
//!   worker role by its [`TaskType`].
//! - [`Rule`]: A data-defined constraint with an [`Enforcement`] level.
//!
//! ## Relationships
//!
//! - [`Dependency`]: `A depends_on B`. Acyclic per entity kind.
//! - [`Blocker`]: `A blocked_by B`. Removed only by an explicit resolve.

mod edge;
mod project;
mod rule;
mod status;
mod task;
mod work_item;

pub use edge::*;
pub use project::*;
pub use rule::*;
pub use status::*;
pub use task::*;
pub use work_item::*;
