pub mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "erpflow",
    about = "Erpflow operator CLI",
    long_about = "Operate the Erpflow database: migrations, config inspection, readiness checks, payroll tax previews, and attendance backfills.",
    after_help = "Examples:\n  erpflow doctor --json\n  erpflow tax --gross 35000\n  erpflow backfill-absences --from 2026-03-01 --to 2026-03-31 --dry-run"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity, and migration state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Compute contributions, withholding tax, and net pay for a monthly gross")]
    Tax {
        #[arg(long, help = "Monthly gross pay, e.g. 35000 or 35000.50")]
        gross: Decimal,
    },
    #[command(
        name = "backfill-absences",
        about = "Mark Absent or OnLeave attendance for days with no record"
    )]
    BackfillAbsences {
        #[arg(long, help = "First day to examine (YYYY-MM-DD)")]
        from: NaiveDate,
        #[arg(long, help = "Last day to examine, inclusive (YYYY-MM-DD)")]
        to: NaiveDate,
        #[arg(long, help = "Also mark Saturdays and Sundays")]
        include_weekends: bool,
        #[arg(long, help = "Count what would be inserted without writing")]
        dry_run: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Tax { gross } => commands::tax::run(gross),
        Command::BackfillAbsences { from, to, include_weekends, dry_run } => {
            commands::backfill::run(commands::backfill::BackfillArgs {
                from,
                to,
                include_weekends: include_weekends.then_some(true),
                dry_run,
            })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn backfill_arguments_parse_dates_and_flags() {
        let cli = Cli::try_parse_from([
            "erpflow",
            "backfill-absences",
            "--from",
            "2026-03-01",
            "--to",
            "2026-03-31",
            "--dry-run",
        ])
        .expect("parse");
        match cli.command {
            Command::BackfillAbsences { from, to, include_weekends, dry_run } => {
                assert_eq!(from.to_string(), "2026-03-01");
                assert_eq!(to.to_string(), "2026-03-31");
                assert!(!include_weekends);
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn tax_rejects_non_numeric_gross() {
        assert!(Cli::try_parse_from(["erpflow", "tax", "--gross", "lots"]).is_err());
    }
}
