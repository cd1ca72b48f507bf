fn main() {
    if let Err(e) = idscan_lib::run() {
        eprintln!("{}: {e}", idscan_lib::config::APP_NAME);
        std::process::exit(1);
    }
}
