//! verax CLI binary.
//!
//! This is the minimal entrypoint; all logic is in the library and
//! cli::run() handles every output channel. main only maps to process exit.

fn main() {
    if let Err(code) = verax::cli::run() {
        std::process::exit(code.as_i32());
    }
}
