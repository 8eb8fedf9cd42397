//! Entry point for the Corvus chess engine. Control is immediately
//! passed to the Universal Chess Interface (UCI) handling loop.

use corvus_chess::uci;

fn main() {
    env_logger::init();
    log::info!("Corvus chess engine starting");
    let mut uci_main = uci::UCI::new();
    uci_main.main_loop();
}
