/// Time windows, frame rates and cancellation.
pub mod core;
/// Error taxonomy.
pub mod error;
