//! Binary entry point for the `tdc` command-line tool.

use clap::Parser;

use tdc::cli::{run, Args};
use tdc::stats::StatAllocator;

// The driver measures allocation statistics process-wide; the library reads
// zeros when this allocator is not installed.
#[global_allocator]
static ALLOC: StatAllocator = StatAllocator;

fn main() {
    let args = Args::parse();
    std::process::exit(run(args));
}
