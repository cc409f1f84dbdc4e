pub mod account;
pub mod auth;
pub mod request;
pub mod stats;

pub use account::{
    Admin, Cleaner, NewCleanerRequest, OtpRecord, RoomGroup, Roommate, Student,
    UpdateCleanerRequest,
};
pub use auth::{
    Actor, AdminLogin, CleanerLogin, Claims, Role, SignupRequest, StudentLogin, TokenResponse,
    VerifyOtpRequest,
};
pub use request::{
    CleaningRequest, CompleteRequestBody, NewCleaningRequest, OwnedRequest, RateRequestBody,
    RequestFilter, RequestStatus,
};
pub use stats::{AdminStats, BlockCount, CleanerJob, CleanerStats, Review};
