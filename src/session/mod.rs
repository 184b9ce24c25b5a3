/// Poll-driven facade tying the worker, scheduler and playback driver together.
pub mod scrub_session;
