use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use salary_core::SalaryField;

use crate::config::ConfigOverrides;
use crate::units::DisplayUnit;
use crate::utils::parse_decimal;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Japanese salary tax estimator.
///
/// Estimates income tax and residence tax from an annual salary, keeps the
/// latest inputs per user, and tracks a small todo list.
#[derive(Debug, Parser)]
#[command(name = "salary", version)]
pub struct Cli {
    /// Config file. Defaults to `./salary.toml` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database backend to use.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `salary.db`) or `:memory:`.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Unit used for amounts on the command line and in reports.
    #[arg(long, global = true, value_enum)]
    pub unit: Option<DisplayUnit>,

    /// Log level or EnvFilter directive. `RUST_LOG` takes precedence.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also append logs to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            backend: self.backend.clone(),
            db: self.db.clone(),
            unit: self.unit,
            log_level: self.log_level.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Estimate taxes for the given amounts without touching the database.
    Calc {
        #[command(flatten)]
        amounts: AmountArgs,

        /// Print JSON (amounts in yen) instead of the text report.
        #[arg(long)]
        json: bool,
    },

    /// Show the saved inputs and their estimate.
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Change one saved input, e.g. `salary set tax-credit 30000`.
    Set {
        field: SalaryField,

        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Update any of the saved inputs.
    Save {
        #[command(flatten)]
        amounts: AmountArgs,
    },

    /// List every saved record, newest first.
    History,

    /// Import salary records from a CSV file.
    Import { path: PathBuf },

    #[command(subcommand)]
    Todo(TodoCommand),

    /// Print the signed-in user.
    Whoami,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum TodoCommand {
    List,
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    Done { id: i64 },
    Delete { id: i64 },
}

/// Amount flags shared by `calc` and `save`, in the display unit.
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct AmountArgs {
    /// Annual gross salary.
    #[arg(long, value_parser = parse_decimal, allow_hyphen_values = true)]
    pub income: Option<Decimal>,

    /// Social insurance premiums paid.
    #[arg(
        long,
        value_parser = parse_decimal,
        allow_hyphen_values = true,
        conflicts_with = "estimate_social_insurance"
    )]
    pub social_insurance: Option<Decimal>,

    /// Estimate social insurance as 19.45% of income.
    #[arg(long)]
    pub estimate_social_insurance: bool,

    #[arg(long, value_parser = parse_decimal, allow_hyphen_values = true)]
    pub other_deduction: Option<Decimal>,

    /// Subtracted from the computed income tax.
    #[arg(long, value_parser = parse_decimal, allow_hyphen_values = true)]
    pub tax_credit: Option<Decimal>,
}

impl AmountArgs {
    /// The amounts that were given, paired with the field they set.
    pub fn values(&self) -> Vec<(SalaryField, Decimal)> {
        [
            (SalaryField::Income, self.income),
            (SalaryField::SocialInsuranceDeduction, self.social_insurance),
            (SalaryField::OtherDeduction, self.other_deduction),
            (SalaryField::TaxCredit, self.tax_credit),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty() && !self.estimate_social_insurance
    }
}
