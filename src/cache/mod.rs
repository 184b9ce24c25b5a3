/// Index-keyed decoded frame store.
pub mod frame_cache;
