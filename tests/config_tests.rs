//! Settings validation tests through the pipeline's accept surface
//!
//! The unit tests beside `config` cover the validation matrix field by
//! field; these exercise the host-visible behavior: error surfacing,
//! fallback announcements, and JSON settings documents as a host would
//! deliver them.

mod accept_tests {
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use snowflake_loader_sdk::{
        AuthMode, Config, HostEngine, MockDriver, Pipeline, RawSettings, SqlType,
    };
    use tempfile::TempDir;

    #[derive(Clone)]
    struct RecordingHost {
        errors: Rc<RefCell<Vec<String>>>,
        file_outputs: Rc<RefCell<Vec<String>>>,
        temp: PathBuf,
    }

    impl RecordingHost {
        fn new(temp: &Path) -> Self {
            Self {
                errors: Rc::new(RefCell::new(Vec::new())),
                file_outputs: Rc::new(RefCell::new(Vec::new())),
                temp: temp.to_path_buf(),
            }
        }
    }

    impl HostEngine for RecordingHost {
        fn info(&self, _message: &str) {}
        fn error(&self, message: &str) {
            self.errors.borrow_mut().push(message.to_string());
        }
        fn file_output(&self, message: &str) {
            self.file_outputs.borrow_mut().push(message.to_string());
        }
        fn progress(&self, _fraction: f64) {}
        fn default_temp_dir(&self) -> PathBuf {
            self.temp.clone()
        }
    }

    fn settings_document() -> String {
        r#"{
            "account": "https://xy12345.snowflakecomputing.com",
            "user": "loader",
            "password": "secret",
            "warehouse": "compute_wh",
            "database": "analytics",
            "schema": "raw",
            "table": "events",
            "sqlType": "create",
            "dataField": "payload",
            "caseSensitive": false,
            "suspendWarehouseAfterLoad": true
        }"#
        .to_string()
    }

    fn accept(document: &str) -> (Result<(), String>, RecordingHost, TempDir, Option<Config>) {
        let temp = TempDir::new().unwrap();
        let host = RecordingHost::new(temp.path());
        let mut pipeline = Pipeline::new(MockDriver::new(), host.clone());
        let result = match RawSettings::from_json(document) {
            Ok(raw) => pipeline.accept(raw).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let config = pipeline.config().cloned();
        (result, host, temp, config)
    }

    #[test]
    fn test_full_document_accepted() {
        let (result, _host, _temp, config) = accept(&settings_document());
        assert!(result.is_ok());
        let config = config.expect("config should be set");
        assert_eq!(config.account, "xy12345.snowflakecomputing.com");
        assert_eq!(config.password, "terces");
        assert_eq!(config.auth_mode, AuthMode::Snowflake);
        assert_eq!(config.sql_type, SqlType::Create);
        assert!(config.suspend_warehouse_after_load);
    }

    #[test]
    fn test_fallback_temp_dir_announced_once() {
        let (result, host, temp, config) = accept(&settings_document());
        assert!(result.is_ok());
        assert_eq!(config.unwrap().temp_dir, temp.path());

        let outputs = host.file_outputs.borrow();
        assert_eq!(outputs.len(), 1);
        assert_eq!(
            outputs[0],
            format!(
                "{}| Using system temp dir {}",
                temp.path().display(),
                temp.path().display()
            )
        );
    }

    #[test]
    fn test_missing_field_surfaced_to_host() {
        let document = settings_document().replace("\"warehouse\": \"compute_wh\",", "");
        let (result, host, _temp, config) = accept(&document);
        assert!(result.is_err());
        assert!(config.is_none());
        assert_eq!(
            host.errors.borrow().as_slice(),
            ["Enter a valid warehouse"]
        );
    }

    #[test]
    fn test_unknown_sql_type_surfaced_to_host() {
        let document = settings_document().replace("create", "merge");
        let (result, host, _temp, config) = accept(&document);
        assert!(result.is_err());
        assert!(config.is_none());
        assert_eq!(
            host.errors.borrow().as_slice(),
            ["Unknown sqlType: merge"]
        );
    }

    #[test]
    fn test_okta_document() {
        let document = settings_document().replace(
            "\"sqlType\": \"create\",",
            "\"sqlType\": \"create\", \"authMode\": \"okta\", \"oktaUrl\": \"https://example.okta.com\",",
        );
        let (result, _host, _temp, config) = accept(&document);
        assert!(result.is_ok());
        let config = config.unwrap();
        assert_eq!(config.auth_mode, AuthMode::Okta);
        assert_eq!(config.okta_url.as_deref(), Some("https://example.okta.com"));
    }

    #[test]
    fn test_okta_without_url_surfaced_to_host() {
        let document = settings_document().replace(
            "\"sqlType\": \"create\",",
            "\"sqlType\": \"create\", \"authMode\": \"okta\",",
        );
        let (result, host, _temp, config) = accept(&document);
        assert!(result.is_err());
        assert!(config.is_none());
        assert_eq!(
            host.errors.borrow().as_slice(),
            ["Enter a valid Okta URL when authenticating using Okta"]
        );
    }

    #[test]
    fn test_listrunner_whitespace_is_sanitized() {
        let document = settings_document().replace(
            "\"warehouse\": \"compute_wh\",",
            "\"warehouse\": \"  compute_wh\n\",",
        );
        let (result, _host, _temp, config) = accept(&document);
        assert!(result.is_ok());
        assert_eq!(config.unwrap().warehouse, "compute_wh");
    }

    #[test]
    fn test_reaccept_after_failure() {
        let temp = TempDir::new().unwrap();
        let host = RecordingHost::new(temp.path());
        let mut pipeline = Pipeline::new(MockDriver::new(), host.clone());

        let bad = RawSettings::default();
        assert!(pipeline.accept(bad).is_err());
        assert!(pipeline.config().is_none());

        let good = RawSettings::from_json(&settings_document()).unwrap();
        assert!(pipeline.accept(good).is_ok());
        assert!(pipeline.config().is_some());
    }
}
