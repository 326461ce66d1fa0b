use std::{fs, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Result};
use arec::{Name, ResponseCode, UdpTransport, DEFAULT_RESPONSE_SIZE};
use clap::Parser;
use colored::Colorize;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

mod minimal;

use minimal::MinimalRecord;

/// Used when the system does not name a nameserver.
const FALLBACK_NAMESERVER: &str = "8.8.8.8";

/// Look up the IPv4 addresses of a domain.
#[derive(Parser, Debug)]
#[command(version, about, max_term_width = 80)]
struct Cli {
    /// The domain to find addresses for.
    ///
    /// If the domain is relative, it will be treated as a fully qualified
    /// domain name. For example, "example.com" is looked up as
    /// "example.com.".
    domain: Name,
    /// The nameserver to send the request to, specified with an @ symbol in
    /// front of the name (e.g., @8.8.8.8). The nameserver may include a port
    /// number (e.g., @127.0.0.1:5380), and the host may be specified using a
    /// hostname or an IP address. (default: system default nameserver)
    nameserver: Option<Nameserver>,
    /// Print the answer records as JSON.
    #[arg(long)]
    json: bool,
    /// Print every answer record instead of just the addresses.
    #[arg(short, long)]
    verbose: bool,
    /// How long to wait for a reply, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout: u64,
}

/// A nameserver argument of the form `@host[:port]`.
#[derive(Debug, Clone)]
struct Nameserver(String);

impl FromStr for Nameserver {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix('@') {
            Some(host) if !host.is_empty() => Ok(Self(host.to_owned())),
            _ => Err(anyhow!("expected a nameserver like @8.8.8.8, got {s:?}")),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        domain,
        nameserver,
        json,
        verbose,
        timeout,
    } = cli;

    if Hosts::contains(&domain.to_string()) {
        eprintln!(
            "{} {} is present in hosts file",
            "warning:".yellow().bold(),
            domain
        );
    }

    let nameserver = match nameserver {
        Some(Nameserver(host)) => host,
        None => find_default_nameserver(),
    };
    debug!("using nameserver {nameserver}");

    let transport = UdpTransport::new(nameserver, DEFAULT_RESPONSE_SIZE)
        .with_timeout(Duration::from_millis(timeout));
    let response = transport.resolve(&domain)?;

    if !matches!(response.header.resp_code, ResponseCode::Success) {
        bail!("server responded with {}", response.header.resp_code);
    }

    if json {
        let records: Vec<_> = response
            .answer_records
            .into_iter()
            .map(MinimalRecord::from)
            .collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if verbose {
        for record in &response.answer_records {
            println!("{record}");
        }
    } else {
        for addr in response.addresses() {
            println!("{addr}");
        }
    }

    Ok(())
}

/// Represents the hosts file found on most operating systems.
struct Hosts;

impl Hosts {
    /// Returns true if the hosts file contains the given host.
    fn contains(host: &str) -> bool {
        match fs::read_to_string("/etc/hosts") {
            Ok(content) => Self::contains_inner(&content, host),
            Err(_) => false,
        }
    }

    fn contains_inner(input: &str, host: &str) -> bool {
        for line in input.lines() {
            let line = line.split('#').next().unwrap_or_default();
            // the first field is the address
            for in_host in line.split_whitespace().skip(1) {
                if in_host.eq_ignore_ascii_case(host)
                    || (in_host.to_owned() + ".").eq_ignore_ascii_case(host)
                {
                    return true;
                }
            }
        }
        false
    }
}

/// Finds the default nameserver for this operating system.
#[cfg(not(windows))]
fn find_default_nameserver() -> String {
    let configured = fs::read_to_string("/etc/resolv.conf")
        .ok()
        .and_then(|config| parse_resolv_conf(&config));

    configured.unwrap_or_else(|| {
        warn!("no nameserver in /etc/resolv.conf, using {FALLBACK_NAMESERVER}");
        FALLBACK_NAMESERVER.to_owned()
    })
}

/// Finds the default nameserver for this operating system.
#[cfg(windows)]
fn find_default_nameserver() -> String {
    let configured = ipconfig::get_adapters()
        .ok()
        .into_iter()
        .flatten()
        .flat_map(|adapter| adapter.dns_servers().to_vec())
        .find(|addr| addr.is_ipv4())
        .map(|addr| addr.to_string());

    configured.unwrap_or_else(|| {
        warn!("no nameserver configured on any adapter, using {FALLBACK_NAMESERVER}");
        FALLBACK_NAMESERVER.to_owned()
    })
}

/// Returns the first nameserver listed in a resolv.conf file.
#[cfg_attr(windows, allow(dead_code))]
fn parse_resolv_conf(input: &str) -> Option<String> {
    lazy_static! {
        static ref NAMESERVER: Regex = Regex::new(r"^\s*nameserver\s+(\S+)").unwrap();
    }

    input
        .lines()
        .find_map(|line| NAMESERVER.captures(line))
        .map(|caps| caps[1].to_owned())
}
