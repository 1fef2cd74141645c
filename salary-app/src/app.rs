use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use salary_core::auth::{LocalAuthService, OAuthProvider};
use salary_core::calculations::social_insurance_deduction;
use salary_core::db::RepositoryRegistry;
use salary_core::services::{
    add_todo, complete_todo, delete_todo, estimate, list_todos, load_salary_record,
    save_salary_record,
};
use salary_core::{
    AuthService, FinanceRepository, SalaryField, SalaryRecord, SalaryTaxError, SalaryTaxInput, calculate_tax,
};
use salary_db_sqlite::SqliteRepositoryFactory;
use tracing::{debug, info, warn};

use crate::cli::{AmountArgs, Command, TodoCommand};
use crate::config::{AppConfig, AuthConfig};
use crate::csv_loader;
use crate::report::{JsonReport, SalaryReport, history_table, todo_list};
use crate::state::AppState;
use crate::units::DisplayUnit;
use crate::utils::parse_decimal;

/// Registry with every backend this binary ships.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

pub fn build_auth(config: &AuthConfig) -> LocalAuthService {
    let auth = LocalAuthService::new();
    match &config.google {
        Some(user) => auth.with_identity(OAuthProvider::Google, user.clone()),
        None => auth,
    }
}

/// Opens the configured database and signs in.
///
/// A failed sign-in is logged and the state stays signed out; commands that
/// need a user then fail with `NotSignedIn`.
pub async fn connect(config: AppConfig) -> Result<AppState> {
    debug!("connecting to {} backend", config.database.backend);
    let repo = build_registry()
        .create(&config.database)
        .await
        .with_context(|| {
            format!(
                "cannot open {} database '{}'",
                config.database.backend, config.database.connection_string
            )
        })?;

    let auth = Arc::new(build_auth(&config.auth));
    let state = AppState::new(config, repo, auth);

    if let Err(error) = state.auth().sign_in_with_oauth(OAuthProvider::Google).await {
        warn!(%error, "sign-in failed; continuing signed out");
    }
    Ok(state)
}

/// Applies the given amounts (in `unit`) to `record`.
fn apply_amounts(
    record: &mut SalaryRecord,
    amounts: &AmountArgs,
    unit: DisplayUnit,
) -> Result<(), SalaryTaxError> {
    for (field, value) in amounts.values() {
        record.set_field(field, unit.to_yen(field, value)?)?;
    }
    if amounts.estimate_social_insurance {
        record.set_field(
            SalaryField::SocialInsuranceDeduction,
            social_insurance_deduction(record.income),
        )?;
    }
    Ok(())
}

fn render(
    report: &SalaryReport,
    record_id: Option<i64>,
    json: bool,
) -> Result<String> {
    if json {
        let mut body = JsonReport::from(report);
        body.record_id = record_id;
        serde_json::to_string_pretty(&body).context("cannot serialize report")
    } else {
        Ok(report.to_string())
    }
}

fn record_report(
    record: &SalaryRecord,
    unit: DisplayUnit,
) -> Result<SalaryReport> {
    let result = estimate(record)?;
    Ok(SalaryReport::new(SalaryTaxInput::from(record), result, unit))
}

/// `salary calc`: pure estimate, no database.
pub fn calc(
    amounts: &AmountArgs,
    json: bool,
    unit: DisplayUnit,
) -> Result<String> {
    if amounts.income.is_none() {
        bail!("calc needs --income");
    }

    let mut scratch = SalaryRecord::empty("");
    apply_amounts(&mut scratch, amounts, unit)?;
    let input = SalaryTaxInput::from(&scratch);
    let result = calculate_tax(&input)?;
    render(&SalaryReport::new(input, result, unit), None, json)
}

/// Executes `command` against an open [`AppState`].
pub async fn run(
    state: &AppState,
    command: Command,
) -> Result<String> {
    let unit = state.unit();
    match command {
        Command::Calc { amounts, json } => calc(&amounts, json, unit),
        Command::Show { json } => show(state, json).await,
        Command::Set { field, value } => set_field(state, field, &value).await,
        Command::Save { amounts } => save(state, &amounts).await,
        Command::History => history(state).await,
        Command::Import { path } => import(state, &path).await,
        Command::Todo(todo) => run_todo(state, todo).await,
        Command::Whoami => {
            let user = state.require_user()?;
            Ok(match user.email {
                Some(email) => format!("{} <{}>", user.id, email),
                None => user.id,
            })
        }
    }
}

async fn show(
    state: &AppState,
    json: bool,
) -> Result<String> {
    let user = state.require_user()?;
    let record = load_salary_record(state.repo(), &user.id).await?;
    let report = record_report(&record, state.unit())?;
    let rendered = render(&report, record.id, json)?;

    if record.is_persisted() || json {
        Ok(rendered)
    } else {
        Ok(format!("No saved salary yet.\n{rendered}"))
    }
}

async fn set_field(
    state: &AppState,
    field: SalaryField,
    value: &str,
) -> Result<String> {
    let user = state.require_user()?;
    let amount = state.unit().to_yen(field, parse_decimal(value)?)?;

    let mut record = load_salary_record(state.repo(), &user.id).await?;
    record.set_field(field, amount)?;
    save_salary_record(state.repo(), &mut record).await?;

    Ok(format!(
        "{} set to {}.\n{}",
        field.label(),
        state.unit().format(amount),
        record_report(&record, state.unit())?
    ))
}

async fn save(
    state: &AppState,
    amounts: &AmountArgs,
) -> Result<String> {
    if amounts.is_empty() {
        bail!("nothing to save; pass at least one amount flag");
    }

    let user = state.require_user()?;
    let mut record = load_salary_record(state.repo(), &user.id).await?;
    apply_amounts(&mut record, amounts, state.unit())?;
    save_salary_record(state.repo(), &mut record).await?;

    Ok(record_report(&record, state.unit())?.to_string())
}

async fn history(state: &AppState) -> Result<String> {
    let user = state.require_user()?;
    let records = state.repo().list_salary_records(&user.id).await?;

    let rows = records
        .into_iter()
        .map(|record| {
            let result = estimate(&record)?;
            Ok((record, result))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(history_table(&rows, state.unit()))
}

async fn import(
    state: &AppState,
    path: &Path,
) -> Result<String> {
    let user = state.require_user()?;
    let records = csv_loader::load_from_file(path, &user.id, state.unit())?;

    let count = state.repo().import_salary_records(records).await?.len();
    info!(user_id = %user.id, count, path = %path.display(), "imported salary records");
    Ok(format!("Imported {count} salary record(s)."))
}

async fn run_todo(
    state: &AppState,
    command: TodoCommand,
) -> Result<String> {
    let user = state.require_user()?;
    let repo = state.repo();
    match command {
        TodoCommand::List => Ok(todo_list(&list_todos(repo, &user.id).await?)),
        TodoCommand::Add { text } => {
            let item = add_todo(repo, &user.id, &text.join(" ")).await?;
            Ok(format!("Added todo {}: {}", item.id, item.text))
        }
        TodoCommand::Done { id } => {
            complete_todo(repo, &user.id, id).await?;
            Ok(format!("Completed todo {id}."))
        }
        TodoCommand::Delete { id } => {
            delete_todo(repo, &user.id, id).await?;
            Ok(format!("Deleted todo {id}."))
        }
    }
}
