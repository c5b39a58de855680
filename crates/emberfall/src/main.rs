//! Binary entry point for the Emberfall world server.

#[tokio::main]
async fn main() {
    if let Err(e) = lib_emberfall::init().await {
        eprintln!("Fatal: {e}");
        std::process::exit(1);
    }
}
