//! Command-line surface: three positional numeric arguments plus two
//! optional logging flags.

use std::path::PathBuf;

use clap::Parser;

/// `plazza <multiplier> <cooks_per_kitchen> <restock_time_ms>`
#[derive(Debug, Parser)]
#[command(name = "plazza", version, about = "Multi-process pizza cooking fleet simulator")]
pub struct Cli {
    /// Global cook-time multiplier applied to every pizza type's base cook time.
    pub multiplier: f64,

    /// Number of cook threads in each kitchen's pool.
    pub cooks_per_kitchen: u16,

    /// How often, in milliseconds, a kitchen replenishes its ingredient stock.
    pub restock_time_ms: u64,

    /// Write the reception process's own log here instead of `plazza.log`.
    #[arg(long, default_value = "plazza.log")]
    pub log_file: PathBuf,

    /// Mirror `INFO`-and-above log lines to stderr in addition to the log file.
    #[arg(long)]
    pub verbose: bool,
}

impl Cli {
    /// `false` if any of the three positional arguments is non-positive.
    pub fn arguments_are_valid(&self) -> bool {
        self.multiplier > 0.0 && self.cooks_per_kitchen > 0 && self.restock_time_ms > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn rejects_zero_multiplier() {
        let cli = Cli::parse_from(["plazza", "0", "1", "1000"]);
        assert!(!cli.arguments_are_valid());
    }

    #[test]
    fn accepts_positive_arguments() {
        let cli = Cli::parse_from(["plazza", "1.5", "2", "5000"]);
        assert!(cli.arguments_are_valid());
    }

    #[test]
    fn rejects_missing_arguments() {
        assert!(Cli::try_parse_from(["plazza", "1.0"]).is_err());
    }
}
