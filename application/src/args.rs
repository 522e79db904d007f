//! [`Args`] definitions.

use clap::Parser;

/// Server of the library loan, reservation and fine system.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML configuration file.
    ///
    /// Missing file is fine: defaults and `CONF.*` environment variables are
    /// used then.
    #[arg(short, long, default_value = "config.toml", value_name = "PATH")]
    pub config: String,
}

impl Args {
    /// Parses command line arguments.
    ///
    /// # Errors
    ///
    /// If the arguments are malformed, or `--help`/`--version` is requested.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

#[cfg(test)]
mod spec {
    use clap::Parser as _;

    use super::Args;

    #[test]
    fn defaults_to_local_config_file() {
        let args = Args::try_parse_from(["library"]).unwrap();

        assert_eq!(args.config, "config.toml");
    }

    #[test]
    fn accepts_config_path() {
        let args =
            Args::try_parse_from(["library", "-c", "/etc/library.toml"])
                .unwrap();

        assert_eq!(args.config, "/etc/library.toml");
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(Args::try_parse_from(["library", "--port", "80"]).is_err());
    }
}
