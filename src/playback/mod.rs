/// Scroll-to-frame mapping and paint decisions.
pub mod driver;
/// Viewport fitting and canvas compositing.
pub mod paint;
