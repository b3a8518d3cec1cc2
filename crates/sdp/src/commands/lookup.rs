//! Read-only lookups used to find ids before writing a bulk config.

use anyhow::Result;
use colored::Colorize;
use sdp_core::SdpClient;
use serde_json::Value;
use std::path::Path;
use std::process::ExitCode;

use super::load_config;
use crate::cli::{CiAction, CiCommand, Collection, TechnicianAction, TechnicianCommand, UserAction, UserCommand};

fn client(config_path: Option<&Path>) -> Result<SdpClient> {
    let config = load_config(config_path)?;
    Ok(SdpClient::from_config(&config)?)
}

pub async fn ci(cmd: CiCommand, config_path: Option<&Path>) -> Result<ExitCode> {
    let client = client(config_path)?;
    match cmd.action {
        CiAction::Show { ci_id } => print_json(&client.get_ci(&ci_id).await?)?,
        CiAction::Search { filters } => {
            let cis = client.search_cis(&filters).await?;
            print_records("Configuration items", &cis);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn user(cmd: UserCommand, config_path: Option<&Path>) -> Result<ExitCode> {
    let client = client(config_path)?;
    match cmd.action {
        UserAction::Show { user_id } => print_json(&client.get_user(&user_id).await?)?,
        UserAction::Search { filters } => {
            let users = client.search_users(&filters).await?;
            print_records("Users", &users);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn technician(cmd: TechnicianCommand, config_path: Option<&Path>) -> Result<ExitCode> {
    let client = client(config_path)?;
    match cmd.action {
        TechnicianAction::Show { technician_id } => {
            print_json(&client.get_technician(&technician_id).await?)?
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn list(collection: Collection, config_path: Option<&Path>) -> Result<ExitCode> {
    let client = client(config_path)?;
    let (title, records) = match collection {
        Collection::Sites => ("Sites", client.list_sites().await?),
        Collection::Groups => ("Groups", client.list_groups().await?),
        Collection::Roles => ("Roles", client.list_roles().await?),
    };
    print_records(title, &records);
    Ok(ExitCode::SUCCESS)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_records(title: &str, records: &[Value]) {
    println!("{} ({})", title.cyan().bold(), records.len());
    println!("{}", "─".repeat(50));
    for record in records {
        println!("  {:<16} {}", field(record, "id"), field(record, "name"));
    }
}

/// Render a scalar field; ids come back as strings or numbers
fn field(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_rendering() {
        let record = json!({"id": 301, "name": "HQ", "parent": null});
        assert_eq!(field(&record, "id"), "301");
        assert_eq!(field(&record, "name"), "HQ");
        assert_eq!(field(&record, "parent"), "-");
        assert_eq!(field(&record, "missing"), "-");
    }
}
