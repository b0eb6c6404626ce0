//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `smallpress_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("smallpress_core ping={}", smallpress_core::ping());
    println!("smallpress_core version={}", smallpress_core::core_version());
}
