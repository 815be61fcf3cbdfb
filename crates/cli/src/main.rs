//! Inventory listener entry point.

fn main() {
    if let Err(e) = inventory_listener_cli::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
