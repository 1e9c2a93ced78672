// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Engine status check

use anyhow::Result;
use colored::Colorize;

use crate::client::EngineClient;

pub async fn run(host: &str, port: u16) -> Result<()> {
    let client = EngineClient::new(host, port)?;

    match client.health().await {
        Ok(health) => {
            println!("{}", "✓ Engine is running".green());
            println!("  Address: http://{}:{}", host, port);
            if let Some(version) = &health.version {
                println!("  Version: {}", version);
            }
            if let Some(uptime) = health.uptime_secs {
                println!("  Uptime: {}", format_duration(uptime));
            }
            if health.status != "ok" {
                println!("  {} status reported: {}", "⚠".yellow(), health.status);
            }
        }
        Err(e) => {
            println!(
                "{}",
                format!("✗ Engine not reachable at http://{}:{}", host, port).red()
            );
            println!("  {}", e);
        }
    }

    Ok(())
}

fn format_duration(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m {}s", minutes, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_scales_units() {
        assert_eq!(format_duration(42), "0m 42s");
        assert_eq!(format_duration(3 * 3600 + 5 * 60), "3h 5m");
        assert_eq!(format_duration(2 * 86400 + 3600 + 60), "2d 1h 1m");
    }
}
