pub mod accounts;
pub mod otps;
pub mod requests;
pub mod stats;
