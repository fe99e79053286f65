use crate::error::AppError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// Utility for converting diesel errors to structured AppError variants.
pub struct DatabaseErrorConverter;

impl DatabaseErrorConverter {
    /// Converts a Diesel error to an appropriate AppError variant.
    ///
    /// # Arguments
    /// * `error` - The Diesel error to convert
    /// * `operation` - Description of the database operation that failed
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::NotFound => AppError::NotFound {
                entity: "resource".to_string(),
                field: "id".to_string(),
                value: "unknown".to_string(),
            },
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                AppError::Validation {
                    field: info
                        .constraint_name()
                        .map(Self::column_from_fkey)
                        .unwrap_or_else(|| "reference".to_string()),
                    reason: "Referenced record does not exist".to_string(),
                }
            }
            DieselError::DatabaseError(_, info) => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::msg(format!("Database error: {}", info.message())),
            },
            other => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }

    /// `cron_jobs_user_id_fkey` -> `user_id`
    fn column_from_fkey(constraint: &str) -> String {
        let trimmed = constraint.strip_suffix("_fkey").unwrap_or(constraint);
        for table in ["cron_jobs_", "events_"] {
            if let Some(column) = trimmed.strip_prefix(table) {
                return column.to_string();
            }
        }
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockDatabaseErrorInfo {
        message: String,
        constraint_name: Option<String>,
    }

    impl diesel::result::DatabaseErrorInformation for MockDatabaseErrorInfo {
        fn message(&self) -> &str {
            &self.message
        }

        fn details(&self) -> Option<&str> {
            None
        }

        fn hint(&self) -> Option<&str> {
            None
        }

        fn table_name(&self) -> Option<&str> {
            None
        }

        fn column_name(&self) -> Option<&str> {
            None
        }

        fn constraint_name(&self) -> Option<&str> {
            self.constraint_name.as_deref()
        }

        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    #[test]
    fn test_convert_not_found_error() {
        let result = DatabaseErrorConverter::convert_diesel_error(DieselError::NotFound, "find job");
        assert!(matches!(result, AppError::NotFound { .. }));
    }

    #[test]
    fn test_convert_foreign_key_violation() {
        let info = MockDatabaseErrorInfo {
            message: "insert or update on table \"cron_jobs\" violates foreign key constraint"
                .to_string(),
            constraint_name: Some("cron_jobs_user_id_fkey".to_string()),
        };
        let error =
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, Box::new(info));

        match DatabaseErrorConverter::convert_diesel_error(error, "insert job") {
            AppError::Validation { field, .. } => assert_eq!(field, "user_id"),
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[test]
    fn test_convert_other_database_error() {
        let info = MockDatabaseErrorInfo {
            message: "deadlock detected".to_string(),
            constraint_name: None,
        };
        let error = DieselError::DatabaseError(DatabaseErrorKind::Unknown, Box::new(info));

        match DatabaseErrorConverter::convert_diesel_error(error, "delete job") {
            AppError::Database { operation, .. } => assert_eq!(operation, "delete job"),
            other => panic!("Expected Database error, got: {:?}", other),
        }
    }
}
