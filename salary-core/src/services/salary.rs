use tracing::{debug, info};

use crate::calculations::{SalaryTaxInput, TaxCalculationResult, calculate_tax};
use crate::db::FinanceRepository;
use crate::models::SalaryRecord;

use super::ServiceError;

/// Loads the most recent record of `user_id`, or a zeroed, unsaved record
/// when the user has none yet.
pub async fn load_salary_record(
    repo: &dyn FinanceRepository,
    user_id: &str,
) -> Result<SalaryRecord, ServiceError> {
    match repo.latest_salary_record(user_id).await? {
        Some(record) => {
            debug!(user_id, id = ?record.id, "loaded salary record");
            Ok(record)
        }
        None => {
            debug!(user_id, "no salary record yet; starting empty");
            Ok(SalaryRecord::empty(user_id))
        }
    }
}

/// Inserts `record` when it has no id yet, otherwise updates it in place.
///
/// On insert the stored id and timestamp are copied back into `record`.
/// Inputs are validated before anything is written.
pub async fn save_salary_record(
    repo: &dyn FinanceRepository,
    record: &mut SalaryRecord,
) -> Result<(), ServiceError> {
    SalaryTaxInput::from(&*record).validate()?;

    match record.id {
        Some(id) => {
            repo.update_salary_record(record).await?;
            info!(user_id = %record.user_id, id, "updated salary record");
        }
        None => {
            let stored = repo.create_salary_record(record.to_new_record()).await?;
            record.id = stored.id;
            record.created_at = stored.created_at;
            info!(user_id = %record.user_id, id = ?record.id, "created salary record");
        }
    }
    Ok(())
}

/// Tax breakdown for `record`.
pub fn estimate(record: &SalaryRecord) -> Result<TaxCalculationResult, ServiceError> {
    Ok(calculate_tax(&SalaryTaxInput::from(record))?)
}
