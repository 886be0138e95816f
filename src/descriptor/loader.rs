use anyhow::{Result, Context as AnyhowContext};
use std::fs;
use std::path::Path;

use crate::descriptor::Descriptor;

pub fn load_descriptor_from_yaml(file_path: &Path) -> Result<Descriptor> {
    let yaml_content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read YAML file from {}", file_path.display()))?;

    parse_descriptor(&yaml_content)
        .with_context(|| format!("Failed to deserialize YAML content from {}", file_path.display()))
}

pub fn parse_descriptor(yaml_content: &str) -> Result<Descriptor> {
    let descriptor: Descriptor = serde_yaml::from_str(yaml_content)?;
    Ok(descriptor)
}
