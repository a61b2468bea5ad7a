#[cfg(test)]
mod tests {
    use crate::domain::error::{AppError, ErrorCode};
    use crate::domain::job::{Filter, Job, JobStatus};
    use crate::domain::settings::Preferences;
    use crate::domain::transition::{ActionKind, ActionState, StatusTransition};

    #[test]
    fn test_job_status_serialization() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Uploaded).unwrap(),
            "\"UPLOADED\""
        );
        assert_eq!(
            serde_json::to_string(&JobStatus::ReadyToPrint).unwrap(),
            "\"READY_TO_PRINT\""
        );
        assert_eq!(
            serde_json::from_str::<JobStatus>("\"COMPLETED\"").unwrap(),
            JobStatus::Completed
        );
    }

    #[test]
    fn test_filter_serialization() {
        assert_eq!(serde_json::to_string(&Filter::All).unwrap(), "\"all\"");
        assert_eq!(
            serde_json::to_string(&Filter::Status(JobStatus::Rejected)).unwrap(),
            "\"REJECTED\""
        );
        assert_eq!(
            serde_json::from_str::<Filter>("\"PRINTING\"").unwrap(),
            Filter::Status(JobStatus::Printing)
        );
        assert!(serde_json::from_str::<Filter>("\"approved\"").is_err());
    }

    #[test]
    fn test_job_deserialization_from_api_payload() {
        let json = r#"{
            "id": "job-001",
            "studentName": "Test Student",
            "studentEmail": "test@example.com",
            "discipline": "Engineering",
            "classNumber": "ENG101",
            "originalFilename": "test.stl",
            "displayName": "Test Job",
            "filePath": "/path/to/file.stl",
            "metadataPath": "/path/to/metadata.json",
            "status": "UPLOADED",
            "printer": null,
            "color": null,
            "material": null,
            "weightG": null,
            "timeHours": null,
            "costUsd": null,
            "createdAt": "2024-01-15T10:00:00Z",
            "updatedAt": "2024-01-15T10:00:00Z",
            "staffViewedAt": null,
            "notes": null
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.id, "job-001");
        assert_eq!(job.class_number, "ENG101");
        assert_eq!(job.status, JobStatus::Uploaded);
        assert!(job.staff_viewed_at.is_none());
        assert!(job.cost_usd.is_none());
    }

    #[test]
    fn test_job_deserialization_tolerates_missing_metadata() {
        let json = r#"{
            "id": "job-002",
            "displayName": "Sparse",
            "status": "PRINTING",
            "createdAt": "2024-01-15T10:00:00Z",
            "updatedAt": "2024-01-16T10:00:00Z"
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert!(job.student_name.is_empty());
        assert!(job.material.is_none());
    }

    #[test]
    fn test_error_code_serialization() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::NotFound).unwrap(),
            "\"E_NOT_FOUND\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::Conflict).unwrap(),
            "\"E_CONFLICT\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::Transport).unwrap(),
            "\"E_TRANSPORT\""
        );
    }

    #[test]
    fn test_app_error_serialization() {
        let err = AppError::transport("承認に失敗しました").with_job("job-9");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("E_TRANSPORT"));
        assert!(json.contains("\"recoverable\":true"));
        assert!(json.contains("\"jobId\":\"job-9\""));

        let json = serde_json::to_string(&AppError::validation("x")).unwrap();
        assert!(!json.contains("jobId"));
    }

    #[test]
    fn test_error_classification() {
        assert!(AppError::not_found("j").refresh_suggested());
        assert!(AppError::invalid_state("stale").refresh_suggested());
        assert!(!AppError::conflict("j").refresh_suggested());
        assert!(AppError::transport("down").is_retryable());
        assert!(!AppError::validation("empty").is_retryable());
    }

    #[test]
    fn test_preferences_roundtrip_and_defaults() {
        let json = serde_json::to_string(&Preferences { sound_enabled: false }).unwrap();
        assert_eq!(json, "{\"soundEnabled\":false}");
        let prefs: Preferences = serde_json::from_str("{}").unwrap();
        assert!(prefs.sound_enabled);
    }

    #[test]
    fn test_action_state_serialization() {
        let json = serde_json::to_string(&ActionState::Submitting {
            kind: ActionKind::Reject,
        })
        .unwrap();
        assert!(json.contains("\"state\":\"submitting\""));
        assert!(json.contains("\"kind\":\"reject\""));
        assert_eq!(
            serde_json::to_string(&ActionState::Idle).unwrap(),
            "{\"state\":\"idle\"}"
        );
    }

    #[test]
    fn test_status_transition_serialization() {
        let t = StatusTransition {
            job_id: "job-1".to_string(),
            kind: ActionKind::Approve,
            prev_status: JobStatus::Uploaded,
            new_status: JobStatus::ReadyToPrint,
        };
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"prevStatus\":\"UPLOADED\""));
        assert!(json.contains("\"newStatus\":\"READY_TO_PRINT\""));
    }
}
