/*
Copyright 2024 San Francisco Compute Company

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use clap::Parser;
use env_logger::Env;
use hardware_probe::adapters::render_inventory_text;
use hardware_probe::container::{ContainerConfig, ServiceContainer};
use hardware_probe::domain::{OutputFormat, ProbeConfig};
use log::{info, warn};
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hardware_probe")]
#[command(version)]
#[command(about = "Decode installed memory modules from SMBIOS or the device tree")]
struct Cli {
    /// TOML configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a dump in this format (json, toml, txt, xml or plist); repeatable
    #[arg(long = "format", value_name = "FORMAT")]
    formats: Vec<OutputFormat>,

    /// Directory receiving dump files
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Decode a saved DMI table instead of the running system
    #[arg(long)]
    dmi_table: Option<PathBuf>,

    /// Never escalate privileges with sudo
    #[arg(long)]
    no_sudo: bool,

    /// Timeout for external commands, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Do not print the inventory tree
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Layer command line flags over a loaded configuration
    fn apply(&self, mut config: ProbeConfig) -> ProbeConfig {
        if !self.formats.is_empty() {
            config.formats = self.formats.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = Some(dir.clone());
        }
        if let Some(path) = &self.dmi_table {
            config.dmi_table_path = Some(path.clone());
        }
        if let Some(timeout) = self.timeout {
            config.command_timeout = timeout;
        }
        config.skip_sudo |= self.no_sudo;
        config.verbose |= self.verbose;
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let file_config = ServiceContainer::create_configuration_provider(cli.config.as_deref())
        .get_probe_config()
        .await?;
    let config = cli.apply(file_config);

    let default_level = if config.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let container = ServiceContainer::new(ContainerConfig::from(&config));
    info!("Probing memory on {}", container.get_platform_name());

    if config.dmi_table_path.is_none() && !container.check_privileges().await? {
        if config.skip_sudo {
            warn!("Firmware tables may be unreadable without root and sudo is disabled");
        } else {
            info!("Firmware tables are root-only; sudo may prompt for a password");
        }
    }

    let missing = container.validate_dependencies().await?;
    if !missing.is_empty() {
        warn!("Missing required dependencies: {}", missing.join(", "));
    }

    let service = container.create_probe_service()?;
    let inventory = service.collect_inventory().await?;

    if !cli.quiet {
        print!("{}", render_inventory_text(&inventory)?);
    }

    if !config.formats.is_empty() {
        let output_dir = config.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let written = container
            .create_exporter()
            .save_formats(&inventory, &output_dir, &config.formats)
            .await?;
        for path in written {
            println!("Inventory has been written to {}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file_config() {
        let cli = Cli::parse_from([
            "hardware_probe",
            "--format",
            "json",
            "--format",
            "txt",
            "--timeout",
            "5",
            "--no-sudo",
        ]);
        let file_config = ProbeConfig {
            formats: vec![OutputFormat::Toml],
            output_dir: Some(PathBuf::from("/var/tmp")),
            ..Default::default()
        };

        let config = cli.apply(file_config);

        assert_eq!(config.formats, vec![OutputFormat::Json, OutputFormat::Text]);
        assert_eq!(config.output_dir, Some(PathBuf::from("/var/tmp")));
        assert_eq!(config.command_timeout, 5);
        assert!(config.skip_sudo);
        assert!(!config.verbose);
    }

    #[test]
    fn test_accepts_xml_and_plist_formats() {
        let cli = Cli::parse_from(["hardware_probe", "--format", "xml", "--format", "plist"]);
        assert_eq!(cli.formats, vec![OutputFormat::Xml, OutputFormat::Plist]);
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["hardware_probe", "--format", "yaml"]).is_err());
    }
}
