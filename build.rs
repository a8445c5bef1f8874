//! Build script that ensures Cargo rebuilds when bundled assets change.
//!
//! The embedded manifest source and the default scaffolding template are
//! compiled in with `include_bytes!`/`include_str!`, but Cargo does not track
//! the directories they live in. This script emits `rerun-if-changed`
//! directives for them.

fn main() {
    println!("cargo:rerun-if-changed=manifests");
    println!("cargo:rerun-if-changed=templates");
}
