use std::io;
use std::process;

use clap::Parser;

use ipsniff::capture::{Interrupt, RawSocket, Sniffer};
use ipsniff::config::{Args, Config};
use ipsniff::{error, info, log};

fn main() {
    // Route SIGINT/SIGTERM to the capture wait before anything else, so an
    // early interrupt still ends the process with status 1.
    let interrupt = Interrupt::new().unwrap_or_else(|err| {
        error!("failed to set up interrupt handling: {err}");
        process::exit(1);
    });

    let args = Args::parse();
    log::set_max_level(args.log_level());

    let config = Config::from(&args);

    let socket = RawSocket::with_interrupt(&config, interrupt).unwrap_or_else(|err| {
        error!("{err}");
        process::exit(1);
    });

    info!(
        "listening on {} for {:?} packets",
        socket.host(),
        socket.protocol()
    );

    let mut sniffer = Sniffer::new(socket, io::stdout().lock(), &config);

    if let Err(err) = sniffer.run() {
        error!("capture failed: {err}");
    }

    // Capture only ends on interrupt or failure.
    process::exit(1);
}
