use chrono::NaiveDate;
use erpflow_db::{connect_with_settings, migrations, AbsenceBackfill, BackfillOptions};

use crate::commands::{prepare, CommandResult};

#[derive(Clone, Debug)]
pub struct BackfillArgs {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Overrides `backfill.include_weekends` from config when set.
    pub include_weekends: Option<bool>,
    pub dry_run: bool,
}

pub fn run(args: BackfillArgs) -> CommandResult {
    let (config, runtime) = match prepare("backfill-absences") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let options = BackfillOptions {
        from: args.from,
        to: args.to,
        include_weekends: args.include_weekends.unwrap_or(config.backfill.include_weekends),
        dry_run: args.dry_run,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let report = AbsenceBackfill::new(pool.clone()).run(&options).await.map_err(|error| {
            let class = if error.is_validation() { "validation" } else { "backfill" };
            (class, error.to_string(), 6u8)
        })?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(report)
    });

    match result {
        Ok(report) => CommandResult::success_with_data(
            "backfill-absences",
            format!(
                "{} absent and {} on-leave rows {} over {}..={}",
                report.inserted_absent,
                report.inserted_on_leave,
                if options.dry_run { "would be inserted" } else { "inserted" },
                options.from,
                options.to
            ),
            &report,
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("backfill-absences", error_class, message, exit_code)
        }
    }
}
