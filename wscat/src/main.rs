use std::env;
use std::io;
use std::process;

use structopt::StructOpt;
use tracing::debug;
use wscat::relay::{self, Console, Outcome};
use wscat::{logging, proxy, Config, Error, Session};

/// Exit status after clean end of input, or after a failed request without `--strict`.
const EXIT_OK: i32 = 0;

/// Exit status when the client cannot be set up. Usage errors also exit with 1.
const EXIT_INIT: i32 = 1;

/// Exit status after a failed request with `--strict`.
const EXIT_ABORTED: i32 = 2;

fn run(config: &Config) -> i32 {
    let http_proxy = env::var("http_proxy").ok();
    let https_proxy = env::var("https_proxy").ok();
    let proxy = proxy::select(&config.url, http_proxy.as_deref(), https_proxy.as_deref());

    let mut session = match Session::new(config, proxy) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("wscat: {}", e);
            return EXIT_INIT;
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = Console::new(stdout.lock(), io::stderr());
    let outcome = relay::run(&mut session, stdin.lock(), &mut console, config.buffer_size);
    drop(session);

    match outcome {
        Outcome::Exhausted { requests } => {
            debug!(requests, "done");
            EXIT_OK
        }
        Outcome::Aborted { requests, error } => {
            eprintln!("wscat: {}", Error::from(error));
            debug!(requests, "stopped after failed request");
            if config.strict {
                EXIT_ABORTED
            } else {
                EXIT_OK
            }
        }
    }
}

fn main() {
    let config = Config::from_args();
    logging::init(config.verbose);
    process::exit(run(&config));
}
