pub mod admin;
pub mod auth;
pub mod lifecycle;
pub mod reaper;
pub mod signup;

pub use admin::{AdminError, AdminService};
pub use auth::{AuthError, AuthService, TokenKeys};
pub use lifecycle::{CleanerDashboard, ErrorKind, LifecycleError, LifecyclePolicy, RequestLifecycle};
pub use reaper::StaleAssignmentReaper;
pub use signup::SignupService;
