//! Network gate
//!
//! Answers one question: is the device currently associated with the
//! configured target WiFi network? A pure predicate over a local system
//! query; being off-network is a hard stop for the orchestrator, never a
//! retryable condition.

use async_trait::async_trait;
use tokio::process::Command;

#[async_trait]
pub trait NetworkGate: Send + Sync {
    /// SSID of the currently associated wireless network, if any
    async fn current_ssid(&self) -> Option<String>;

    /// True iff we are associated with `target` right now
    async fn is_on_target(&self, target: &str) -> bool {
        match self.current_ssid().await {
            Some(ssid) => ssid_matches(&ssid, target),
            None => false,
        }
    }
}

/// Case-insensitive SSID comparison, with any OS-added quoting stripped
pub fn ssid_matches(current: &str, target: &str) -> bool {
    let current = current.trim().trim_matches('"');
    let target = target.trim();
    !current.is_empty() && !target.is_empty() && current.eq_ignore_ascii_case(target)
}

/// Gate backed by the system's wireless tooling.
///
/// Tries `iwgetid -r` first and falls back to NetworkManager; both report
/// nothing when WiFi is down or unassociated.
pub struct SystemNetwork;

#[async_trait]
impl NetworkGate for SystemNetwork {
    async fn current_ssid(&self) -> Option<String> {
        if let Ok(output) = Command::new("iwgetid").arg("-r").output().await {
            if output.status.success() {
                let ssid = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !ssid.is_empty() {
                    return Some(ssid);
                }
            }
        }

        let output = Command::new("nmcli")
            .args(["-t", "-f", "active,ssid", "dev", "wifi"])
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            if let Some(ssid) = line.strip_prefix("yes:") {
                if !ssid.is_empty() {
                    return Some(ssid.to_string());
                }
            }
        }
        None
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssid_match_ignores_case() {
        assert!(ssid_matches("Asianet-Home", "asianet-home"));
    }

    #[test]
    fn test_ssid_match_strips_os_quoting() {
        // Android and wpa_supplicant wrap the SSID in quotes
        assert!(ssid_matches("\"asianet-home\"", "asianet-home"));
    }

    #[test]
    fn test_ssid_mismatch() {
        assert!(!ssid_matches("neighbours-wifi", "asianet-home"));
        assert!(!ssid_matches("", "asianet-home"));
        assert!(!ssid_matches("asianet-home", ""));
    }
}
