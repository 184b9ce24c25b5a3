/// Frame bytes to RGBA8 images.
pub mod decode;
/// Frame locators and the per-session index/locator table.
pub mod source;
