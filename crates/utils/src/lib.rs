pub mod response;
pub mod sentry;
