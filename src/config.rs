//! Configuration management for Region Extract Server

use std::env;
use std::str::FromStr;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use thiserror::Error;

use crate::ocr::PollPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub aws: AwsConfig,
    pub ocr: OcrConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings shared by the S3 and Textract clients
#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// Region override; the SDK default chain is used when absent
    pub region: Option<String>,
    /// S3-compatible endpoint (MinIO, LocalStack). Enables path-style addressing.
    pub s3_endpoint: Option<String>,
    pub textract_endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// Polling behaviour for on-demand text detection jobs
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub poll_interval_secs: u64,
    pub poll_backoff: f64,
    pub poll_max_interval_secs: u64,
    pub max_poll_attempts: Option<u32>,
    pub max_wait_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub scale: f32,
    pub timeout_secs: u64,
    pub crop_format: CropFormat,
}

/// Encoding of cropped page regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropFormat {
    Jpeg,
    Png,
}

impl CropFormat {
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            CropFormat::Jpeg => image::ImageFormat::Jpeg,
            CropFormat::Png => image::ImageFormat::Png,
        }
    }
}

impl FromStr for CropFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(CropFormat::Jpeg),
            "png" => Ok(CropFormat::Png),
            other => Err(format!("unsupported crop format '{}'", other)),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            aws: AwsConfig {
                region: None,
                s3_endpoint: None,
                textract_endpoint: None,
                access_key: None,
                secret_key: None,
            },
            ocr: OcrConfig {
                poll_interval_secs: 5,
                poll_backoff: 1.0,
                poll_max_interval_secs: 60,
                max_poll_attempts: None,
                max_wait_secs: None,
            },
            render: RenderConfig {
                scale: 2.0,
                timeout_secs: 30,
                crop_format: CropFormat::Jpeg,
            },
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// A variable that is set but cannot be parsed is an error; unset
    /// variables take their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let optional = |name: &str| optional_var(&lookup, name);

        let config = Config {
            server: ServerConfig {
                host: optional("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var(&lookup, "SERVER_PORT")?.unwrap_or(defaults.server.port),
            },
            aws: AwsConfig {
                region: optional("AWS_REGION"),
                s3_endpoint: optional("S3_ENDPOINT"),
                textract_endpoint: optional("TEXTRACT_ENDPOINT"),
                access_key: optional("AWS_ACCESS_KEY_ID"),
                secret_key: optional("AWS_SECRET_ACCESS_KEY"),
            },
            ocr: OcrConfig {
                poll_interval_secs: parse_var(&lookup, "OCR_POLL_INTERVAL_SECS")?
                    .unwrap_or(defaults.ocr.poll_interval_secs),
                poll_backoff: parse_var(&lookup, "OCR_POLL_BACKOFF")?
                    .unwrap_or(defaults.ocr.poll_backoff),
                poll_max_interval_secs: parse_var(&lookup, "OCR_POLL_MAX_INTERVAL_SECS")?
                    .unwrap_or(defaults.ocr.poll_max_interval_secs),
                max_poll_attempts: parse_var(&lookup, "OCR_MAX_POLL_ATTEMPTS")?,
                max_wait_secs: parse_var(&lookup, "OCR_MAX_WAIT_SECS")?,
            },
            render: RenderConfig {
                scale: parse_var(&lookup, "RENDER_SCALE")?.unwrap_or(defaults.render.scale),
                timeout_secs: parse_var(&lookup, "RENDER_TIMEOUT_SECS")?
                    .unwrap_or(defaults.render.timeout_secs),
                crop_format: parse_var(&lookup, "CROP_FORMAT")?
                    .unwrap_or(defaults.render.crop_format),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ocr.poll_backoff < 1.0 || !self.ocr.poll_backoff.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "OCR_POLL_BACKOFF",
                message: "must be a finite number >= 1.0".to_string(),
            });
        }
        if self.render.scale <= 0.0 || !self.render.scale.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "RENDER_SCALE",
                message: "must be a positive number".to_string(),
            });
        }
        Ok(())
    }
}

impl AwsConfig {
    /// Load the SDK configuration shared by every AWS client
    ///
    /// Static credentials are used only when both keys are set; otherwise the
    /// default provider chain applies.
    pub async fn load_sdk_config(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }

        if let (Some(access_key), Some(secret_key)) = (&self.access_key, &self.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "region-extract",
            ));
        }

        loader.load().await
    }
}

impl OcrConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            backoff_factor: self.poll_backoff,
            max_interval: Duration::from_secs(self.poll_max_interval_secs),
            max_attempts: self.max_poll_attempts,
            max_wait: self.max_wait_secs.map(Duration::from_secs),
        }
    }
}

fn optional_var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.trim().is_empty())
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_var(lookup, name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name,
                message: format!("'{}': {}", raw.trim(), e),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults_match_baseline_behaviour() {
        let config = Config::default();
        let policy = config.ocr.poll_policy();

        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.backoff_factor, 1.0);
        assert!(policy.max_attempts.is_none());
        assert!(policy.max_wait.is_none());
        assert_eq!(config.render.scale, 2.0);
        assert_eq!(config.render.crop_format, CropFormat::Jpeg);
    }

    #[test]
    fn test_crop_format_parsing() {
        assert_eq!("JPEG".parse::<CropFormat>(), Ok(CropFormat::Jpeg));
        assert_eq!("jpg".parse::<CropFormat>(), Ok(CropFormat::Jpeg));
        assert_eq!("png".parse::<CropFormat>(), Ok(CropFormat::Png));
        assert!("tiff".parse::<CropFormat>().is_err());
    }

    #[test]
    fn test_validate_rejects_shrinking_backoff() {
        let mut config = Config::default();
        config.ocr.poll_backoff = 0.5;
        assert!(config.validate().is_err());

        config.ocr.poll_backoff = 1.5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_scale() {
        let mut config = Config::default();
        config.render.scale = 0.0;
        assert!(config.validate().is_err());
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_reads_every_section() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_PORT", "9090"),
            ("S3_ENDPOINT", "http://minio:9000"),
            ("AWS_REGION", "eu-west-1"),
            ("OCR_MAX_WAIT_SECS", "600"),
            ("OCR_POLL_BACKOFF", "1.5"),
            ("CROP_FORMAT", "png"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.aws.s3_endpoint.as_deref(), Some("http://minio:9000"));
        assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.ocr.max_wait_secs, Some(600));
        assert_eq!(config.ocr.poll_backoff, 1.5);
        assert_eq!(config.render.crop_format, CropFormat::Png);
    }

    #[test]
    fn test_malformed_variable_fails_the_load() {
        let result = Config::from_lookup(lookup(&[
            ("S3_ENDPOINT", "http://minio:9000"),
            ("AWS_REGION", "eu-west-1"),
            ("OCR_MAX_WAIT_SECS", "10m"),
        ]));

        match result {
            Err(ConfigError::InvalidValue { name, message }) => {
                assert_eq!(name, "OCR_MAX_WAIT_SECS");
                assert!(message.contains("10m"));
            }
            Ok(_) => panic!("malformed OCR_MAX_WAIT_SECS was accepted"),
        }
    }

    #[test]
    fn test_blank_variables_use_defaults() {
        let config = Config::from_lookup(lookup(&[("SERVER_PORT", "  "), ("S3_ENDPOINT", "")]))
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(config.aws.s3_endpoint.is_none());
    }
}
