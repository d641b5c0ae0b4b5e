//! Subcommand execution and rendering.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use clap::Subcommand;
use finmate_common::Currency;
use finmate_fx::CurrencyFacade;
use tracing::info;

/// Currency engine commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List supported currencies, marking the selected one
    List,

    /// Show the selected currency and rate freshness
    Show,

    /// Select the display currency
    Select {
        /// Currency code, e.g. USD
        code: String,
    },

    /// Fetch fresh exchange rates now
    Refresh,

    /// Convert an amount into the selected currency
    Convert {
        /// Amount to convert
        #[arg(allow_negative_numbers = true)]
        amount: f64,

        /// Currency the amount is in (defaults to the base currency)
        #[arg(short, long)]
        from: Option<String>,
    },
}

impl Command {
    /// Whether the command reports its own refresh outcome.
    pub fn refreshes(&self) -> bool {
        matches!(self, Command::Refresh)
    }
}

/// Run a command against an initialized facade and return its output.
pub async fn execute(facade: &Arc<CurrencyFacade>, command: &Command) -> anyhow::Result<String> {
    let mut out = String::new();

    match command {
        Command::List => {
            out.push_str(&render_currency_list(
                facade.list_currencies(),
                &facade.selected_currency(),
            ));
        }
        Command::Show => {
            let selected = facade.selected_currency();
            let stats = facade.cache_stats();
            writeln!(out, "Currency:     {} ({})", selected.name, selected.code)?;
            writeln!(
                out,
                "Base:         {}",
                facade.catalog().pivot().code
            )?;
            writeln!(
                out,
                "Last updated: {}",
                format_last_updated(facade.rates_last_updated())
            )?;
            writeln!(out, "Known rates:  {}", stats.entries)?;
        }
        Command::Select { code } => match facade.select_currency(code).await? {
            Some(currency) => {
                writeln!(
                    out,
                    "Currency updated. All amounts will now be displayed in {}",
                    currency.name
                )?;
            }
            None => {
                writeln!(out, "Unknown currency code: {code}")?;
            }
        },
        Command::Refresh => {
            let snapshot = facade.refresh_rates().await?;
            info!(entries = snapshot.table.len(), "Manual refresh completed");
            writeln!(out, "Exchange rates updated!")?;
            writeln!(
                out,
                "Last updated: {}",
                format_last_updated(snapshot.fetched_at)
            )?;
        }
        Command::Convert { amount, from } => {
            let from = from.as_deref();
            let converted = facade.convert_amount(*amount, from);
            writeln!(out, "{}", facade.format_amount(*amount, from))?;
            writeln!(out, "({converted})")?;
        }
    }

    Ok(out)
}

/// Human-readable refresh time, `Never` when rates were never fetched.
pub fn format_last_updated(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "Never".to_string(),
    }
}

/// One line per currency, with a check mark on the selected one.
pub fn render_currency_list(currencies: &[Currency], selected: &Currency) -> String {
    let mut out = String::new();
    for currency in currencies {
        let mark = if currency.code == selected.code { "✓" } else { " " };
        let _ = writeln!(
            out,
            "{mark} {:<4} {:<3} {}",
            currency.code, currency.symbol, currency.name
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmate_common::CurrencyCatalog;
    use finmate_fx::{FetchError, FxConfig, MemoryStore, MockRateFeed};

    fn facade(feed: Arc<MockRateFeed>) -> Arc<CurrencyFacade> {
        Arc::new(CurrencyFacade::new(
            CurrencyCatalog::default(),
            feed,
            Arc::new(MemoryStore::new()),
            &FxConfig::default(),
        ))
    }

    #[test]
    fn test_last_updated_never() {
        assert_eq!(format_last_updated(None), "Never");
    }

    #[test]
    fn test_render_list_marks_selection() {
        let catalog = CurrencyCatalog::default();
        let usd = catalog.find("USD").unwrap();

        let rendered = render_currency_list(catalog.list(), usd);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 10);
        assert!(lines[0].starts_with("  INR"));
        assert!(lines[1].starts_with("✓ USD"));
    }

    #[tokio::test]
    async fn test_select_and_convert() {
        let feed = Arc::new(MockRateFeed::new("test"));
        feed.set_rates([("USD", 0.012)]);
        let facade = facade(feed);
        facade.initialize().await.await.unwrap();

        let out = execute(&facade, &Command::Select { code: "usd".into() })
            .await
            .unwrap();
        assert!(out.contains("US Dollar"));

        let out = execute(
            &facade,
            &Command::Convert {
                amount: 1000.0,
                from: None,
            },
        )
        .await
        .unwrap();
        assert!(out.starts_with("$12.00"));
    }

    #[tokio::test]
    async fn test_select_unknown_code() {
        let facade = facade(Arc::new(MockRateFeed::new("test")));

        let out = execute(&facade, &Command::Select { code: "XYZ".into() })
            .await
            .unwrap();

        assert_eq!(out, "Unknown currency code: XYZ\n");
    }

    #[tokio::test]
    async fn test_refresh_failure_propagates() {
        let feed = Arc::new(MockRateFeed::new("test"));
        feed.set_error(FetchError::Status { status: 503 });
        let facade = facade(feed);

        let err = execute(&facade, &Command::Refresh).await.unwrap_err();

        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_show_before_any_fetch() {
        let facade = facade(Arc::new(MockRateFeed::new("test")));

        let out = execute(&facade, &Command::Show).await.unwrap();

        assert!(out.contains("Indian Rupee (INR)"));
        assert!(out.contains("Last updated: Never"));
    }
}
