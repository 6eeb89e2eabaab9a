use clap::Parser;
use log::warn;
use snafu::ErrorCompat;

mod args;
mod roster;

fn main() {
    let args = args::Args::parse();
    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let mut cache = roster::cache::ResultCache::with_default_ttl();
    if let Err(e) = roster::run_tabulation(&args, &mut cache) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(e.as_ref()) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
