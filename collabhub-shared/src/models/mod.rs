/// Domain models
///
/// Plain data types shared by both storage backends. Membership writes go
/// through the associated functions on [`membership::Membership`]; everything
/// else is persisted via [`UnitOfWork`](crate::db::store::UnitOfWork).
///
/// # Models
///
/// - `user`: accounts and the system-wide role
/// - `project`: collaboration workspaces with an optimistic version counter
/// - `membership`: (project, user) → project role
/// - `invitation`: single-use admission tickets
/// - `notice`: notice board posts
/// - `activity`: the append-only project activity log

pub mod activity;
pub mod invitation;
pub mod membership;
pub mod notice;
pub mod project;
pub mod user;
