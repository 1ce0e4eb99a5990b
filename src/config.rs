//! Build-time-generated tuning constants (component: configuration).
//!
//! Values come from `hatstack.toml` (overridable via `HATSTACK_CONFIG`),
//! resolved and validated by `build.rs`, exactly as the teacher's
//! `rtmalloc.toml` mechanism feeds `OUT_DIR/config_gen.rs`.

include!(concat!(env!("OUT_DIR"), "/config_gen.rs"));
