use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use paybatch::config::DashboardConfig;
use paybatch::reconcile::{BatchMode, Reconciler, RunContext, RunOutcome};
use paybatch::reference::{ReferenceData, load_reference_data};
use paybatch::report;
use paybatch::session::{Credentials, Session};
use paybatch::submit::{SubmissionOutcome, submit_bonus, submit_payroll};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Dashboard base URL
    #[arg(long, env = "PAYBATCH_BASE_URL")]
    base_url: String,

    /// Dashboard account username
    #[arg(long, env = "PAYBATCH_USERNAME")]
    username: String,

    /// Dashboard account password
    #[arg(long, env = "PAYBATCH_PASSWORD")]
    password: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile and submit a payroll batch (columns: name, amount, type, note)
    Payroll {
        /// Input payments CSV file
        input: PathBuf,

        /// Dry run. Reconcile and print, do not submit.
        #[arg(long)]
        dry: bool,
    },
    /// Reconcile and submit a bonus batch (columns: name, amount)
    Bonus {
        /// Input payments CSV file
        input: PathBuf,

        /// Payment date for the whole batch (YYYY-MM-DD)
        #[arg(long)]
        pay_date: NaiveDate,

        /// Dry run. Reconcile and print, do not submit.
        #[arg(long)]
        dry: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let run = RunContext::new();
    println!("Start request, id: {}", run.run_id);

    let config = DashboardConfig::new(cli.base_url);
    let credentials = Credentials {
        username: cli.username,
        password: cli.password,
    };

    match cli.command {
        Command::Payroll { input, dry } => run_payroll(config, credentials, run, &input, dry),
        Command::Bonus {
            input,
            pay_date,
            dry,
        } => run_bonus(config, credentials, run, &input, pay_date, dry),
    }
}

fn run_payroll(
    config: DashboardConfig,
    credentials: Credentials,
    run: RunContext,
    input: &Path,
    dry: bool,
) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let mut session = Session::new(config, credentials).into_diagnostic()?;
    let reference = load_reference_data(&mut session).into_diagnostic()?;
    print_reference_summary(&reference);

    let reconciler = Reconciler::new(&reference, &run.run_id, BatchMode::Payroll);
    let outcome = reconciler.reconcile_csv(file);

    println!("\nPayments to create:");
    report::write_payroll(&outcome.records, &mut io::stdout().lock()).into_diagnostic()?;
    check_outcome(&outcome)?;

    if !dry {
        println!("\nCreating payments");
        report_submission(submit_payroll(&mut session, &outcome.records).into_diagnostic()?);
    }
    Ok(())
}

fn run_bonus(
    config: DashboardConfig,
    credentials: Credentials,
    run: RunContext,
    input: &Path,
    pay_date: NaiveDate,
    dry: bool,
) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let mut session = Session::new(config, credentials).into_diagnostic()?;
    let reference = load_reference_data(&mut session).into_diagnostic()?;
    println!("\nPersons found: {}", reference.employees.len());

    let reconciler = Reconciler::new(&reference, &run.run_id, BatchMode::Bonus);
    let outcome = reconciler.reconcile_csv(file);

    println!("\nPayments to create:");
    report::write_bonus(&outcome.records, &mut io::stdout().lock()).into_diagnostic()?;
    check_outcome(&outcome)?;

    if !dry {
        println!("\nCreating payments");
        report_submission(
            submit_bonus(&mut session, &outcome.records, pay_date, &run.run_id)
                .into_diagnostic()?,
        );
    }
    Ok(())
}

fn print_reference_summary(reference: &ReferenceData) {
    println!("\nPersons found: {}", reference.employees.len());

    println!("\nSupported payment dates:");
    for (frequency, dates) in &reference.pay_dates {
        println!("{frequency}");
        for date in dates {
            let marker = if date.disabled { " (disabled)" } else { "" };
            println!("  {}, {}{marker}", date.value, date.description);
        }
    }

    println!("\nSupported payment types:");
    for subtype in &reference.subtypes {
        println!("{} - {}", subtype.value, subtype.description);
    }
}

/// Validation failures flip the exit code; submission failures never do.
fn check_outcome(outcome: &RunOutcome) -> Result<()> {
    for rejection in &outcome.rejections {
        eprintln!(
            "line {}: {} [{}]",
            rejection.line, rejection.reason, rejection.row
        );
    }
    if outcome.all_valid() {
        Ok(())
    } else {
        Err(miette!(
            "some rows failed validation; fix them before continuing"
        ))
    }
}

fn report_submission(outcome: SubmissionOutcome) {
    match outcome {
        SubmissionOutcome::Accepted => println!("DONE"),
        SubmissionOutcome::Rejected { status, body } => {
            eprintln!("Payment creation failed.");
            eprintln!("status code: {status}");
            eprintln!("response text: {body}");
        }
    }
}
