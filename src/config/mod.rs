pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::{ConfigProvider, RecordKind};
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "nutrition-etl")]
#[command(about = "Normalize food nutrition payloads and score glycemic risk")]
pub struct CliConfig {
    #[arg(long, help = "JSON file with one payload or an array of payloads")]
    pub input: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = "analysis", help = "Payload kind: analysis, meal or qr")]
    pub kind: RecordKind,

    #[arg(long, value_delimiter = ',', default_value = "json,csv")]
    pub formats: Vec<String>,

    #[arg(long, default_value = "0.1", help = "Lower clamp for measured portion factors")]
    pub min_factor: f64,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn record_kind(&self) -> RecordKind {
        self.kind
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }

    fn min_factor(&self) -> Option<f64> {
        Some(self.min_factor)
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input)?;
        validation::validate_input_extension("input", &self.input)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_formats("formats", &self.formats)?;
        validation::validate_min_factor("min_factor", Some(self.min_factor))?;
        Ok(())
    }
}
