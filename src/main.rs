//! Static analyzer for skin XML packs.
//!
//! Binary crate entry point. All CLI logic is in the `cli` module.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() {
    skinlint::cli::run();
}
