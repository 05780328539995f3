use std::time::Duration;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Options {
    /// Short identity code of the student (e.g. AQ123456)
    pub code: String,
    /// Password of the student
    #[arg(long, env = "AQUINAS_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Base URL every endpoint is relative to
    #[arg(long, env = "AQUINAS_BASE_URL")]
    pub base_url: Option<String>,
    /// XML namespace of API responses, empty for unqualified documents
    #[arg(long, env = "AQUINAS_NAMESPACE")]
    pub namespace: Option<String>,
    /// Seconds to wait for each request before giving up
    #[arg(long, env = "AQUINAS_TIMEOUT", value_parser = parse_seconds)]
    pub timeout: Option<Duration>,
    /// What to fetch after authenticating
    #[arg(long, value_enum, default_value_t = Fetch::All)]
    pub fetch: Fetch,
    /// Only output today's timetable
    #[arg(long)]
    pub today: bool,
    /// Format to output data
    #[arg(long, value_enum, default_value_t = DataFormat::Json)]
    pub format: DataFormat,
    /// Pretty-print the output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Fetch {
    All,
    Details,
    Timetable,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum DataFormat {
    Json,
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    s.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|err| format!("`{s}` is not a number of seconds: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_valid() {
        use clap::CommandFactory;
        Options::command().debug_assert();
    }

    #[test]
    fn parses_timeout_and_fetch() {
        let options = Options::try_parse_from([
            "aquinas",
            "AQ123456",
            "--password",
            "secret",
            "--timeout",
            "5",
            "--fetch",
            "timetable",
        ])
        .unwrap();
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.fetch, Fetch::Timetable);
        assert!(parse_seconds("soon").is_err());
    }
}
