use thiserror::Error;

/// Core error types for EmberFHIR operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid FHIR resource type: {0}")]
    InvalidResourceType(String),

    #[error("Invalid FHIR DateTime: {0}")]
    InvalidDateTime(String),

    #[error("Invalid resource data: {message}")]
    InvalidResource { message: String },

    #[error("Invalid service base URL: {0}")]
    InvalidServiceBaseUrl(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl CoreError {
    /// Create a new InvalidResourceType error
    pub fn invalid_resource_type(resource_type: impl Into<String>) -> Self {
        Self::InvalidResourceType(resource_type.into())
    }

    /// Create a new InvalidDateTime error
    pub fn invalid_date_time(datetime: impl Into<String>) -> Self {
        Self::InvalidDateTime(datetime.into())
    }

    /// Create a new InvalidResource error
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            message: message.into(),
        }
    }

    /// Create a new InvalidServiceBaseUrl error
    pub fn invalid_service_base_url(message: impl Into<String>) -> Self {
        Self::InvalidServiceBaseUrl(message.into())
    }

    /// Create a new Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CoreError::invalid_resource_type("InvalidType");
        assert_eq!(err.to_string(), "Invalid FHIR resource type: InvalidType");
    }

    #[test]
    fn test_invalid_date_time_error() {
        let err = CoreError::invalid_date_time("2023-13-45");
        assert_eq!(err.to_string(), "Invalid FHIR DateTime: 2023-13-45");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let core_err: CoreError = json_err.into();
        assert!(matches!(core_err, CoreError::JsonError(_)));
    }

    #[test]
    fn test_url_error_conversion() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let core_err: CoreError = url_err.into();
        assert!(matches!(core_err, CoreError::UrlError(_)));
    }

    #[test]
    fn test_invalid_resource_message() {
        let err = CoreError::invalid_resource("Missing required field 'id'");
        assert!(err.to_string().contains("Missing required field 'id'"));
    }

    #[test]
    fn test_result_type_usage() {
        fn ok_path() -> Result<String> {
            Ok("success".to_string())
        }

        fn err_path() -> Result<String> {
            Err(CoreError::configuration("bad"))
        }

        assert!(ok_path().is_ok());
        assert!(err_path().is_err());
    }
}
