use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};

use crate::app::PlayerKind;

const KEYS_HELP: &str = "\
While a podcast is playing, [ENTER] or [q] skips to the next one.
CTRL+C stops everything.

Seeking (mplayer):
   left/right  10s
   up/down     1m
   pgup/pgdown 10m";

#[derive(Debug, Parser)]
#[command(
    name = "rac1",
    version,
    about = "Listen to Rac1 podcasts sequentially and without interruptions",
    after_help = KEYS_HELP
)]
pub struct Cli {
    /// Day to listen to: today, yesterday, -N (days ago), YYYY-MM-DD or DD/MM/YYYY
    #[arg(short = 'd', long, default_value = "today", allow_hyphen_values = true)]
    pub date: String,

    /// First hour to listen to [default: 8]
    #[arg(short = 'f', long = "from", value_name = "FROM")]
    pub from_hour: Option<u32>,

    /// Last hour to listen to [default: 14]
    #[arg(short = 't', long = "to", value_name = "TO")]
    pub to_hour: Option<u32>,

    /// Where to start the first podcast, in the player's seek syntax [default: 0]
    #[arg(short = 's', long, value_name = "START")]
    pub start_first: Option<String>,

    /// Programs to skip, by hour or by name; comma separated and repeatable
    #[arg(
        short = 'x',
        long = "exclude",
        value_name = "EXCLUDE1[,EXCLUDE2...]",
        action = ArgAction::Append
    )]
    pub exclude: Vec<String>,

    /// Forget the exclusions given so far, defaults included; later -x still apply
    #[arg(short = 'c', long = "clean-exclude", action = ArgAction::Count)]
    pub clean_exclude: u8,

    /// Only print the player commands that would run
    #[arg(short = 'p', long = "print", conflicts_with = "print_url")]
    pub print: bool,

    /// Only print the podcast URLs
    #[arg(short = 'u', long = "print-url")]
    pub print_url: bool,

    /// Player used to listen
    #[arg(long, value_enum)]
    pub player: Option<PlayerKind>,

    /// Config file [default: <config dir>/rac1/config.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Set when -c dropped the exclusions preceding it, including configured defaults.
    #[arg(skip)]
    pub excludes_cleared: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        let matches = Self::command().get_matches();
        Self::from_matches(&matches).unwrap_or_else(|err| err.exit())
    }

    /// Like `from_arg_matches`, but honours where `-c` appeared among the `-x` flags.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let mut cli = Self::from_arg_matches(matches)?;
        if matches.value_source("clean_exclude") != Some(ValueSource::CommandLine) {
            return Ok(cli);
        }

        let Some(cleaned_at) = matches.indices_of("clean_exclude").and_then(Iterator::max) else {
            return Ok(cli);
        };
        let kept = matches
            .indices_of("exclude")
            .map(|indices| {
                indices
                    .zip(cli.exclude.iter())
                    .filter(|(index, _)| *index > cleaned_at)
                    .map(|(_, value)| value.clone())
                    .collect()
            })
            .unwrap_or_default();
        cli.exclude = kept;
        cli.excludes_cleared = true;
        Ok(cli)
    }
}

#[cfg(test)]
pub(crate) fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = Cli::command()
        .try_get_matches_from(args)
        .expect("arguments should parse");
    Cli::from_matches(&matches).expect("arguments should convert")
}
