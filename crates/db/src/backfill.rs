use chrono::{Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use erpflow_core::domain::attendance::{AttendanceId, AttendanceRecord, AttendanceStatus};
use erpflow_core::errors::ApplicationError;

use crate::repositories::{
    AttendanceRepository, EmployeeRepository, LeaveRepository, SqlAttendanceRepository,
    SqlEmployeeRepository, SqlLeaveRepository,
};
use crate::DbPool;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackfillOptions {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub include_weekends: bool,
    pub dry_run: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    pub examined: u64,
    pub inserted_absent: u64,
    pub inserted_on_leave: u64,
    pub skipped: u64,
}

/// Fills attendance gaps for active employees: `OnLeave` where an approved
/// leave covers the day, `Absent` otherwise. Existing rows are never touched,
/// so running twice over the same range inserts nothing the second time.
pub struct AbsenceBackfill {
    employees: SqlEmployeeRepository,
    attendance: SqlAttendanceRepository,
    leaves: SqlLeaveRepository,
}

impl AbsenceBackfill {
    pub fn new(pool: DbPool) -> Self {
        Self {
            employees: SqlEmployeeRepository::new(pool.clone()),
            attendance: SqlAttendanceRepository::new(pool.clone()),
            leaves: SqlLeaveRepository::new(pool),
        }
    }

    pub async fn run(&self, options: &BackfillOptions) -> Result<BackfillReport, ApplicationError> {
        if options.to < options.from {
            return Err(ApplicationError::validation(format!(
                "backfill range end {} is before start {}",
                options.to, options.from
            )));
        }

        info!(
            event_name = "attendance.backfill.start",
            from = %options.from,
            to = %options.to,
            include_weekends = options.include_weekends,
            dry_run = options.dry_run,
            "starting absence backfill"
        );

        let employees = self.employees.list_active().await?;
        let mut report = BackfillReport::default();

        for employee in &employees {
            for date in options.from.iter_days().take_while(|date| *date <= options.to) {
                report.examined += 1;

                if date < employee.hired_on
                    || (!options.include_weekends && is_weekend(date))
                    || self.attendance.find(&employee.id, date).await?.is_some()
                {
                    report.skipped += 1;
                    continue;
                }

                let on_leave = self.leaves.has_approved_covering(&employee.id, date).await?;
                let (status, remarks) = if on_leave {
                    (AttendanceStatus::OnLeave, "approved leave")
                } else {
                    (AttendanceStatus::Absent, "no attendance recorded")
                };

                let inserted = if options.dry_run {
                    true
                } else {
                    let record = AttendanceRecord::system_marked(
                        AttendanceId(Uuid::new_v4().to_string()),
                        employee.id.clone(),
                        date,
                        status,
                        remarks,
                        Utc::now(),
                    );
                    self.attendance.insert_if_absent(&record).await?
                };

                if !inserted {
                    report.skipped += 1;
                } else if on_leave {
                    report.inserted_on_leave += 1;
                } else {
                    report.inserted_absent += 1;
                }

                debug!(
                    event_name = "attendance.backfill.marked",
                    employee_id = %employee.id.0,
                    work_date = %date,
                    status = status.as_str(),
                    inserted,
                    "attendance gap filled"
                );
            }
        }

        info!(
            event_name = "attendance.backfill.finish",
            employees = employees.len(),
            examined = report.examined,
            inserted_absent = report.inserted_absent,
            inserted_on_leave = report.inserted_on_leave,
            skipped = report.skipped,
            dry_run = options.dry_run,
            "absence backfill finished"
        );
        Ok(report)
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
