//! finvault CLI entry point
//!
//! A minimal entrypoint: argument parsing, dispatch, and exit-code mapping all
//! live in the cli module. Exit codes:
//!
//! - 0: success (including list mode and an operator-declined restore)
//! - 1: fatal local failure (missing database, failed database copy,
//!   unresolvable selector, configuration or lock error)
//! - 2: post-mutation failure (data restored but the service did not resume)

use finvault::cli;

fn main() {
    std::process::exit(cli::run());
}
