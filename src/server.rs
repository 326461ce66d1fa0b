use std::{
    fs,
    net::{SocketAddr, UdpSocket},
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use anyhow::{anyhow, Context, Result};
use arec::{ZoneStore, DEFAULT_RECORDS};
use clap::Parser;
use log::{debug, error, info, warn};

/// Largest query datagram read from the socket.
const MAX_QUERY_SIZE: usize = 512;

/// Largest reply sent; longer replies are truncated and carry TC.
const MAX_REPLY_SIZE: usize = 512;

/// Serve A records for a small zone over UDP.
#[derive(Parser, Debug)]
#[command(version, about, max_term_width = 80)]
struct Cli {
    /// Zone file in TOML format. Without one, a few built-in records are
    /// served.
    #[arg(short, long)]
    zone: Option<PathBuf>,
    /// Address to listen on.
    #[arg(short, long, default_value = "0.0.0.0:5380")]
    bind: SocketAddr,
    /// Number of worker threads reading from the socket.
    #[arg(short, long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    workers: u16,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = Server::start(Cli::parse()) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

/// A DNS server.
struct Server {
    zone: ZoneStore,
}

impl Server {
    /// Starts a new DNS server and serves until a worker dies.
    fn start(cli: Cli) -> Result<()> {
        let zone = load_zone(cli.zone.as_deref())?;
        info!("loaded {} records", zone.len());

        let socket = UdpSocket::bind(cli.bind)
            .with_context(|| format!("failed to bind {}", cli.bind))?;
        info!("listening on {}", socket.local_addr()?);

        let server = Arc::new(Self { zone });
        let workers = (0..cli.workers)
            .map(|i| -> Result<_> {
                let socket = socket.try_clone()?;
                let server = Arc::clone(&server);
                let worker = thread::Builder::new()
                    .name(format!("worker-{i}"))
                    .spawn(move || server.serve(&socket))?;
                Ok(worker)
            })
            .collect::<Result<Vec<_>>>()?;

        for worker in workers {
            worker
                .join()
                .map_err(|_| anyhow!("worker thread panicked"))?;
        }

        Ok(())
    }

    /// Answers queries arriving on `socket`, one datagram at a time.
    ///
    /// Malformed datagrams are logged and dropped.
    fn serve(&self, socket: &UdpSocket) {
        let mut query_buffer = [0; MAX_QUERY_SIZE];
        loop {
            let (len, addr) = match socket.recv_from(&mut query_buffer) {
                Ok(received) => received,
                Err(err) => {
                    warn!("failed to receive datagram: {err}");
                    continue;
                }
            };
            debug!("received {len} bytes from {addr}");

            let answered = self
                .zone
                .answer_datagram(&query_buffer[..len], MAX_REPLY_SIZE);
            let response = match answered {
                Ok(Some(response)) => response,
                Ok(None) => {
                    debug!("ignoring response datagram from {addr}");
                    continue;
                }
                Err(err) => {
                    warn!("dropping datagram from {addr}: {err}");
                    continue;
                }
            };

            if let Err(err) = socket.send_to(&response, addr) {
                warn!("failed to reply to {addr}: {err}");
            }
        }
    }
}

/// Loads the zone file, or the built-in records when there is none.
fn load_zone(path: Option<&Path>) -> Result<ZoneStore> {
    match path {
        Some(path) => {
            let zone_data = fs::read_to_string(path)
                .with_context(|| format!("failed to read zone file {}", path.display()))?;
            ZoneStore::from_toml(&zone_data)
                .with_context(|| format!("failed to load zone file {}", path.display()))
        }
        None => {
            info!("no zone file given, serving built-in records");
            let mut zone = ZoneStore::new();
            zone.add_records(DEFAULT_RECORDS)?;
            Ok(zone)
        }
    }
}
