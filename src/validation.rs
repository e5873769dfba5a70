//! Row admission rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data_models::Column;

/// Whether a null `initial_three_min_cnt` keeps a row out of the dataset.
///
/// `Lenient` is the default: the count is a metric, and a row whose count
/// failed to parse still counts as an observation (it contributes 0 to sums).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    #[default]
    Lenient,
    RequireCount,
}

impl AdmissionPolicy {
    /// Columns that must exist somewhere in a non-empty source.
    pub fn required_columns(&self) -> &'static [Column] {
        match self {
            AdmissionPolicy::Lenient => &[Column::Date, Column::CommonName],
            AdmissionPolicy::RequireCount => {
                &[Column::Date, Column::CommonName, Column::InitialThreeMinCnt]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingDate,
    MissingCommonName,
    MissingCount,
}

/// Checks the post-coercion required fields of one row and hands back the
/// admitted date and name. The first failing rule is reported.
pub fn check_admission(
    date: Option<NaiveDate>,
    common_name: Option<String>,
    count: Option<u64>,
    policy: AdmissionPolicy,
) -> Result<(NaiveDate, String), DropReason> {
    let date = date.ok_or(DropReason::MissingDate)?;
    let common_name = common_name
        .filter(|name| !name.trim().is_empty())
        .ok_or(DropReason::MissingCommonName)?;
    if policy == AdmissionPolicy::RequireCount && count.is_none() {
        return Err(DropReason::MissingCount);
    }
    Ok((date, common_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2023, 5, 1)
    }

    #[test]
    fn test_missing_date_wins() {
        assert_eq!(
            check_admission(None, None, None, AdmissionPolicy::RequireCount),
            Err(DropReason::MissingDate)
        );
    }

    #[test]
    fn test_missing_common_name_reported_as_such() {
        assert_eq!(
            check_admission(day(), None, Some(1), AdmissionPolicy::Lenient),
            Err(DropReason::MissingCommonName)
        );
    }

    #[test]
    fn test_blank_common_name_rejected() {
        assert_eq!(
            check_admission(day(), Some("  ".into()), Some(1), AdmissionPolicy::Lenient),
            Err(DropReason::MissingCommonName)
        );
    }

    #[test]
    fn test_count_policy() {
        assert_eq!(
            check_admission(day(), Some("Robin".into()), None, AdmissionPolicy::Lenient),
            Ok((NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(), "Robin".to_string()))
        );
        assert_eq!(
            check_admission(day(), Some("Robin".into()), None, AdmissionPolicy::RequireCount),
            Err(DropReason::MissingCount)
        );
    }

    #[test]
    fn test_required_columns() {
        assert!(!AdmissionPolicy::Lenient
            .required_columns()
            .contains(&Column::InitialThreeMinCnt));
        assert!(AdmissionPolicy::RequireCount
            .required_columns()
            .contains(&Column::InitialThreeMinCnt));
    }
}
