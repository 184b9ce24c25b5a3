/// Staggered bulk loading of the whole sequence.
pub mod bulk;
/// Frame cache ownership, window planning and response handling.
pub mod scheduler;
