use std::time::Duration;

use structopt::StructOpt;
use url::Url;

/// The protocol label sent when `--protocol` is not given.
pub const DEFAULT_PROTOCOL: &str = "wscat-protocol";

/// The input chunk size used when `--buffer-size` is not given.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// The largest chunk size `--buffer-size` accepts.
pub const MAX_BUFFER_SIZE: usize = 4 * 1024 * 1024;

fn parse_secs(s: &str) -> Result<Duration, String> {
    let n = s
        .parse()
        .map_err(|e| format!("invalid number of seconds {:?}: {}", s, e))?;

    Ok(Duration::from_secs(n))
}

fn parse_buffer_size(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("invalid buffer size {:?}: {}", s, e))?;
    if n == 0 || n > MAX_BUFFER_SIZE {
        return Err(format!("buffer size must be between 1 and {} bytes", MAX_BUFFER_SIZE));
    }

    Ok(n)
}

fn parse_protocol(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("protocol label must not be empty".to_owned());
    }

    if s.contains(|c| c == '\r' || c == '\n') {
        return Err("protocol label must fit on one header line".to_owned());
    }

    Ok(s.to_owned())
}

fn parse_target(s: &str) -> Result<Url, String> {
    let url = Url::parse(s).map_err(|e| format!("invalid URL {:?}: {}", s, e))?;
    match url.scheme() {
        "ws" | "wss" | "http" | "https" => {}
        scheme => return Err(format!("unsupported URL scheme {:?}", scheme)),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("URL {:?} has no host", s));
    }

    Ok(url)
}

/// The command line, parsed and validated. Fixed for the whole run.
#[derive(Clone, Debug, StructOpt)]
#[structopt(name = "wscat", about = "Relays standard input to a WebSocket-style HTTP endpoint")]
pub struct Config {
    /// Header label sent on each request
    #[structopt(
        short = "p",
        long = "protocol",
        default_value = "wscat-protocol",
        parse(try_from_str = parse_protocol)
    )]
    pub protocol: String,

    /// Input chunk size in bytes
    #[structopt(
        short = "b",
        long = "buffer-size",
        default_value = "1024",
        parse(try_from_str = parse_buffer_size)
    )]
    pub buffer_size: usize,

    /// Connect + total timeout in seconds (0 disables it)
    #[structopt(short = "t", long = "timeout", default_value = "60", parse(try_from_str = parse_secs))]
    pub timeout: Duration,

    /// DNS cache lifetime in seconds (0 disables caching)
    #[structopt(short = "d", long = "dns-timeout", default_value = "30", parse(try_from_str = parse_secs))]
    pub dns_timeout: Duration,

    /// Request deflate-encoded responses
    #[structopt(short = "z", long = "deflate")]
    pub deflate: bool,

    /// Skip TLS certificate and hostname verification
    #[structopt(short = "k", long = "insecure")]
    pub insecure: bool,

    /// Exit with status 2 when a request fails
    #[structopt(short = "s", long = "strict")]
    pub strict: bool,

    /// More diagnostics on standard error (repeatable)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    pub verbose: u8,

    /// Target URL. ex. ws://echo.example.com/
    #[structopt(name = "URL", parse(try_from_str = parse_target))]
    pub url: Url,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use structopt::clap::ErrorKind;
    use structopt::StructOpt;

    use crate::config::{Config, DEFAULT_BUFFER_SIZE, DEFAULT_PROTOCOL, MAX_BUFFER_SIZE};

    fn parse(args: &[&str]) -> Result<Config, structopt::clap::Error> {
        Config::from_iter_safe(Some("wscat").into_iter().chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let config = parse(&["ws://localhost:8000/"]).unwrap();
        assert_eq!(DEFAULT_PROTOCOL, config.protocol);
        assert_eq!(DEFAULT_BUFFER_SIZE, config.buffer_size);
        assert_eq!(Duration::from_secs(60), config.timeout);
        assert_eq!(Duration::from_secs(30), config.dns_timeout);
        assert!(!config.deflate);
        assert!(!config.insecure);
        assert!(!config.strict);
        assert_eq!(0, config.verbose);
        assert_eq!("ws://localhost:8000/", config.url.as_str());
    }

    #[test]
    fn short_options() {
        let config = parse(&[
            "-p", "chat", "-b", "16", "-t", "5", "-d", "0", "-z", "-k", "-s", "-vv", "wss://example.com/x",
        ])
        .unwrap();

        assert_eq!("chat", config.protocol);
        assert_eq!(16, config.buffer_size);
        assert_eq!(Duration::from_secs(5), config.timeout);
        assert_eq!(Duration::from_secs(0), config.dns_timeout);
        assert!(config.deflate);
        assert!(config.insecure);
        assert!(config.strict);
        assert_eq!(2, config.verbose);
    }

    #[test]
    fn long_options() {
        let config = parse(&[
            "--protocol",
            "chat",
            "--buffer-size",
            "4096",
            "--timeout",
            "1",
            "--dns-timeout",
            "2",
            "--deflate",
            "--insecure",
            "ws://example.com/",
        ])
        .unwrap();

        assert_eq!("chat", config.protocol);
        assert_eq!(4096, config.buffer_size);
        assert_eq!(Duration::from_secs(1), config.timeout);
        assert_eq!(Duration::from_secs(2), config.dns_timeout);
        assert!(config.deflate);
        assert!(config.insecure);
    }

    #[test]
    fn missing_url_is_a_usage_error() {
        assert_eq!(ErrorKind::MissingRequiredArgument, parse(&["-z"]).unwrap_err().kind);
    }

    #[test]
    fn unknown_option_is_a_usage_error() {
        assert_eq!(
            ErrorKind::UnknownArgument,
            parse(&["--frobnicate", "ws://example.com/"]).unwrap_err().kind
        );
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        assert!(parse(&["-b", "lots", "ws://example.com/"]).is_err());
        assert!(parse(&["-t", "1s", "ws://example.com/"]).is_err());
        assert!(parse(&["-d", "-1", "ws://example.com/"]).is_err());
    }

    #[test]
    fn buffer_size_is_bounded() {
        assert!(parse(&["-b", "0", "ws://example.com/"]).is_err());
        let too_big = (MAX_BUFFER_SIZE + 1).to_string();
        assert!(parse(&["-b", &too_big, "ws://example.com/"]).is_err());
        let max = MAX_BUFFER_SIZE.to_string();
        assert_eq!(MAX_BUFFER_SIZE, parse(&["-b", &max, "ws://example.com/"]).unwrap().buffer_size);
    }

    #[test]
    fn protocol_must_be_one_line() {
        assert!(parse(&["-p", "a\r\nX-Injected: 1", "ws://example.com/"]).is_err());
        assert!(parse(&["-p", "", "ws://example.com/"]).is_err());
    }

    #[test]
    fn url_must_be_supported() {
        assert!(parse(&["not a url"]).is_err());
        assert!(parse(&["ftp://example.com/"]).is_err());
        assert!(parse(&["https://example.com/"]).is_ok());
    }
}
