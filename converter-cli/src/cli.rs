use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use converter_core::{
    Config, HistoryStore, RateProvider, Session,
    config::{API_KEY_ENV, HISTORY_PATH_ENV},
    model::timestamp_format,
    provider_from_config,
};
use inquire::{Password, PasswordDisplayMode, Text};
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};
use tracing::debug;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "converter", version, about = "Currency converter CLI")]
pub struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Where conversions are recorded (JSON Lines).
    #[arg(long, global = true, env = HISTORY_PATH_ENV)]
    pub history_file: Option<PathBuf>,

    /// ExchangeRate-API key; overrides the configured one.
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert amounts interactively (default).
    Convert,

    /// Store the API key and defaults in the config file.
    Configure,

    /// Show recorded conversions.
    History {
        /// Only show the most recent N records.
        #[arg(long)]
        limit: Option<usize>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load()?;
        config.apply_overrides(self.api_key, self.history_file);

        match self.command.unwrap_or(Command::Convert) {
            Command::Convert => convert(&config).await,
            Command::Configure => configure(config),
            Command::History { limit } => history(&config, limit),
        }
    }
}

async fn convert(config: &Config) -> Result<()> {
    let provider = provider_from_config(config)?;
    let store = HistoryStore::new(config.history_path());

    run_convert(provider.as_ref(), io::stdin().lock(), io::stdout().lock(), &store).await
}

/// Fetch rates, run the session, then append its records to `store`.
///
/// A fetch failure is fatal; a failure to save history is only reported.
async fn run_convert<R: BufRead, W: Write>(
    provider: &dyn RateProvider,
    input: R,
    mut output: W,
    store: &HistoryStore,
) -> Result<()> {
    let rates = match provider.fetch_rates().await {
        Ok(rates) if !rates.is_empty() => rates,
        Ok(_) => {
            writeln!(output, "Error fetching exchange rates. Please try again later.")?;
            bail!("Exchange rate response contained no usable rates");
        }
        Err(e) => {
            writeln!(output, "Error fetching exchange rates. Please try again later.")?;
            return Err(e);
        }
    };

    let mut session = Session::new(&rates);
    let outcome = session.run(input, &mut output);
    let records = session.into_records();

    match store.append(&records) {
        Ok(count) => {
            writeln!(output, "{count} conversion(s) saved to {}.", store.path().display())?
        }
        Err(e) => writeln!(output, "Error saving conversions to file: {e:#}")?,
    }

    outcome.context("Console I/O failed during the conversion session")
}

fn configure(mut config: Config) -> Result<()> {
    let api_key = Password::new("ExchangeRate-API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let base_currency = Text::new("Base currency:")
        .with_default(&config.base_currency)
        .prompt()
        .context("Failed to read base currency")?;

    let default_history = config.history_path().display().to_string();
    let history_path = Text::new("History file:")
        .with_default(&default_history)
        .prompt()
        .context("Failed to read history path")?;

    config.apply_overrides(Some(api_key), Some(PathBuf::from(history_path)));
    config.base_currency = base_currency.trim().to_uppercase();

    let path = config.save()?;
    debug!(path = %path.display(), "Saved configuration");
    println!("Configuration saved to {}", path.display());

    Ok(())
}

fn history(config: &Config, limit: Option<usize>) -> Result<()> {
    let store = HistoryStore::new(config.history_path());
    let records = store.load()?;

    if records.is_empty() {
        println!("No conversions recorded in {}.", store.path().display());
        return Ok(());
    }

    let skip = limit.map_or(0, |n| records.len().saturating_sub(n));
    for record in &records[skip..] {
        println!(
            "{}  {:.2} {} -> {:.2} {}",
            record.timestamp.format(timestamp_format::FORMAT),
            record.from_amount,
            record.from_currency,
            record.to_amount,
            record.to_currency,
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use clap::CommandFactory;
    use converter_core::RateTable;
    use std::{collections::HashMap, io::Cursor};

    #[derive(Debug)]
    struct StubProvider {
        rates: Option<HashMap<String, f64>>,
    }

    #[async_trait]
    impl RateProvider for StubProvider {
        async fn fetch_rates(&self) -> Result<RateTable> {
            match &self.rates {
                Some(rates) => Ok(RateTable::new("USD", rates.clone())),
                None => Err(anyhow!("connection refused")),
            }
        }
    }

    fn usd_eur() -> StubProvider {
        StubProvider {
            rates: Some(HashMap::from([("USD".to_string(), 1.0), ("EUR".to_string(), 0.9)])),
        }
    }

    #[tokio::test]
    async fn fetch_failure_is_fatal_and_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("conversions.jsonl"));
        let mut out = Vec::new();

        let err = run_convert(
            &StubProvider { rates: None },
            Cursor::new("USD\nEUR\n1\nexit\n"),
            &mut out,
            &store,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("connection refused"));
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Error fetching exchange rates. Please try again later."));
        assert!(!out.contains("Welcome"));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn empty_rate_table_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("conversions.jsonl"));
        let provider = StubProvider { rates: Some(HashMap::from([("USD".to_string(), 0.0)])) };

        let result = run_convert(&provider, Cursor::new(""), Vec::new(), &store).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn conversions_are_saved_after_exit() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history").join("conversions.jsonl"));
        let mut out = Vec::new();

        run_convert(&usd_eur(), Cursor::new("USD\nEUR\n100\nexit\n"), &mut out, &store)
            .await
            .unwrap();

        let records = store.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].to_amount, 90.0);
        assert!(String::from_utf8(out).unwrap().contains("1 conversion(s) saved to"));
    }

    #[tokio::test]
    async fn persist_failure_is_reported_but_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = HistoryStore::new(blocker.join("conversions.jsonl"));
        let mut out = Vec::new();

        let result =
            run_convert(&usd_eur(), Cursor::new("USD\nEUR\n100\nexit\n"), &mut out, &store)
                .await;

        assert!(result.is_ok());
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("100.00 USD is equivalent to 90.00 EUR"));
        assert!(out.contains("Error saving conversions to file"));
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_convert() {
        let cli = Cli::try_parse_from(["converter"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_history_limit_and_global_flags() {
        let cli = Cli::try_parse_from([
            "converter",
            "history",
            "--limit",
            "3",
            "--history-file",
            "out/h.jsonl",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.history_file, Some(PathBuf::from("out/h.jsonl")));
        assert!(matches!(cli.command, Some(Command::History { limit: Some(3) })));
    }
}
