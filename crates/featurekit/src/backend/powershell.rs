//! PowerShell backend using ServerManager cmdlets over WinRM remoting.

use crate::backend::HostBackend;
use crate::error::{Error, Operation, Result};
use crate::retry::{self, LogCallback};
use crate::types::{FeatureRecord, FeatureSnapshot, FeatureType, Host, InstallState, RetryConfig};
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

#[cfg(windows)]
const DEFAULT_SHELL: &str = "powershell";
#[cfg(not(windows))]
const DEFAULT_SHELL: &str = "pwsh";

const PREAMBLE: &str = "$ErrorActionPreference = 'Stop'; $ProgressPreference = 'SilentlyContinue';";

/// Projection of `Get-WindowsFeature` into plain JSON-friendly values.
const QUERY_BODY: &str = r#"Import-Module ServerManager;
$features = @(Get-WindowsFeature | ForEach-Object {
    $info = @{}
    if ($_.AdditionalInfo) { foreach ($k in $_.AdditionalInfo.Keys) { $info[[string]$k] = [string]$_.AdditionalInfo[$k] } }
    [pscustomobject]@{
        Name = $_.Name
        DisplayName = $_.DisplayName
        Installed = [bool]$_.Installed
        InstallState = [string]$_.InstallState
        FeatureType = [string]$_.FeatureType
        Path = [string]$_.Path
        Depth = [int]$_.Depth
        DependsOn = @($_.DependsOn | Where-Object { $_ })
        Parent = $_.Parent
        SubFeatures = @($_.SubFeatures | Where-Object { $_ })
        AdditionalInfo = $info
    }
});
ConvertTo-Json -InputObject $features -Depth 4 -Compress"#;

/// Feature entry as emitted by [`QUERY_BODY`].
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawFeature {
    name: String,
    display_name: String,
    installed: bool,
    install_state: String,
    feature_type: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    depth: Option<u32>,
    #[serde(default)]
    depends_on: Option<Vec<String>>,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    sub_features: Option<Vec<String>>,
    #[serde(default)]
    additional_info: Option<BTreeMap<String, String>>,
}

/// Backend that runs ServerManager cmdlets through PowerShell.
///
/// Remote hosts are reached with `Invoke-Command -ComputerName`; local
/// hosts run the same script in-process. Unreachable-host failures are
/// retried according to the configured [`RetryConfig`].
pub struct PowerShellBackend {
    /// PowerShell executable (`powershell` or `pwsh`)
    shell: String,
    retry: RetryConfig,
}

impl PowerShellBackend {
    /// Create a backend using the platform's default PowerShell.
    pub fn new() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// Use a different PowerShell executable.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Use a different retry policy for unreachable hosts.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Run a script body on a host and return its stdout.
    fn run_script(&self, host: &Host, body: &str, op: Operation<'_>) -> Result<String> {
        let script = format!("{PREAMBLE} {}", wrap_for_host(host, body));

        retry::with_retry(&self.retry, Some(&LogCallback), || {
            log::trace!("{} on {}: {}", self.shell, host, script);
            let output = Command::new(&self.shell)
                .args(["-NoProfile", "-NonInteractive", "-Command", &script])
                .output()
                .map_err(|e| {
                    Error::from_shell_output(
                        &format!("failed to execute {}: {}", self.shell, e),
                        host.name(),
                        op,
                    )
                })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(Error::from_shell_output(&stderr, host.name(), op));
            }

            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        })
    }
}

impl Default for PowerShellBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBackend for PowerShellBackend {
    fn query_inventory(&self, host: &Host) -> Result<FeatureSnapshot> {
        let stdout = self.run_script(host, QUERY_BODY, Operation::Query)?;
        let features = parse_inventory(&stdout).map_err(|message| Error::QueryFailed {
            host: host.to_string(),
            message,
        })?;
        log::debug!("Read {} catalog entries from {}", features.len(), host);
        Ok(FeatureSnapshot::new(host.clone(), features))
    }

    fn install(&self, host: &Host, name: &str) -> Result<()> {
        let body = format!(
            "Import-Module ServerManager; $r = Install-WindowsFeature -Name {}; \
             if (-not $r.Success) {{ throw \"Install-WindowsFeature reported failure (exit code: $($r.ExitCode))\" }}",
            ps_quote(name)
        );
        self.run_script(host, &body, Operation::Install(name))?;
        Ok(())
    }

    fn remove(&self, host: &Host, name: &str) -> Result<()> {
        let body = format!(
            "Import-Module ServerManager; $r = Uninstall-WindowsFeature -Name {}; \
             if (-not $r.Success) {{ throw \"Uninstall-WindowsFeature reported failure (exit code: $($r.ExitCode))\" }}",
            ps_quote(name)
        );
        self.run_script(host, &body, Operation::Remove(name))?;
        Ok(())
    }

    fn persist_audit(&self, host: &Host, installed: &[&str]) -> Result<PathBuf> {
        let file_name = format!(
            "rolesync-audit-{}-{}.txt",
            sanitize_file_component(host.name()),
            Utc::now().format("%Y%m%d%H%M%S")
        );
        let names = installed
            .iter()
            .map(|n| ps_quote(n))
            .collect::<Vec<_>>()
            .join(",");
        let body = format!(
            "$p = Join-Path $env:TEMP {}; [System.IO.File]::WriteAllLines($p, [string[]]@({})); $p",
            ps_quote(&file_name),
            names
        );

        let stdout = self.run_script(host, &body, Operation::Audit)?;
        let path = stdout
            .lines()
            .map(str::trim)
            .rfind(|l| !l.is_empty())
            .ok_or_else(|| Error::AuditWriteFailed {
                host: host.to_string(),
                message: "no audit path returned".to_string(),
            })?;
        Ok(PathBuf::from(path))
    }
}

/// Wrap a script body so it runs on the given host.
fn wrap_for_host(host: &Host, body: &str) -> String {
    if host.is_local() {
        body.to_string()
    } else {
        format!(
            "Invoke-Command -ComputerName {} -ErrorAction Stop -ScriptBlock {{ {} }}",
            ps_quote(host.name()),
            body
        )
    }
}

/// Quote a value as a PowerShell single-quoted string literal.
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn sanitize_file_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Parse the JSON emitted by the inventory script.
fn parse_inventory(stdout: &str) -> std::result::Result<Vec<FeatureRecord>, String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err("inventory query returned no features".to_string());
    }

    let raw: Vec<RawFeature> =
        serde_json::from_str(trimmed).map_err(|e| format!("invalid inventory JSON: {e}"))?;
    if raw.is_empty() {
        return Err("inventory query returned no features".to_string());
    }

    raw.into_iter()
        .map(|f| {
            let feature_type = FeatureType::parse(&f.feature_type)
                .ok_or_else(|| format!("unknown feature type '{}' for {}", f.feature_type, f.name))?;
            Ok(FeatureRecord {
                path: f.path.unwrap_or_else(|| f.name.clone()),
                name: f.name,
                display_name: f.display_name,
                installed: f.installed,
                install_state: InstallState::parse(&f.install_state),
                feature_type,
                depth: f.depth.unwrap_or(1),
                depends_on: f.depends_on.unwrap_or_default(),
                parent: f.parent.filter(|p| !p.is_empty()),
                sub_features: f.sub_features.unwrap_or_default(),
                additional_info: f.additional_info.unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"Name":"Web-Server","DisplayName":"Web Server (IIS)","Installed":true,
         "InstallState":"Installed","FeatureType":"Role","Path":"Web Server (IIS)","Depth":1,
         "DependsOn":[],"Parent":null,"SubFeatures":["Web-WebServer","Web-Ftp-Server"],
         "AdditionalInfo":{"MajorVersion":"10","InstallName":"IIS-WebServerRole"}},
        {"Name":"Web-Ftp-Server","DisplayName":"FTP Server","Installed":false,
         "InstallState":"Available","FeatureType":"Role Service",
         "Path":"Web Server (IIS)\\FTP Server","Depth":2,"DependsOn":["Web-Server"],
         "Parent":"Web-Server","SubFeatures":[],"AdditionalInfo":{}}
    ]"#;

    #[test]
    fn test_parse_inventory() {
        let features = parse_inventory(SAMPLE).unwrap();
        assert_eq!(features.len(), 2);

        let web = &features[0];
        assert_eq!(web.name, "Web-Server");
        assert!(web.installed);
        assert_eq!(web.feature_type, FeatureType::Role);
        assert_eq!(web.parent, None);
        assert_eq!(web.sub_features, vec!["Web-WebServer", "Web-Ftp-Server"]);
        assert_eq!(web.additional_info.get("MajorVersion").map(String::as_str), Some("10"));

        let ftp = &features[1];
        assert_eq!(ftp.feature_type, FeatureType::RoleService);
        assert_eq!(ftp.install_state, InstallState::Available);
        assert_eq!(ftp.parent.as_deref(), Some("Web-Server"));
        assert_eq!(ftp.depth, 2);
    }

    #[test]
    fn test_parse_inventory_rejects_empty_output() {
        let err = parse_inventory("  \n").unwrap_err();
        assert_eq!(err, "inventory query returned no features");

        let err = parse_inventory("[]").unwrap_err();
        assert_eq!(err, "inventory query returned no features");
    }

    #[test]
    fn test_parse_inventory_rejects_unknown_type() {
        let json = r#"[{"Name":"X","DisplayName":"X","Installed":false,
            "InstallState":"Available","FeatureType":"Driver"}]"#;
        let err = parse_inventory(json).unwrap_err();
        assert!(err.contains("Driver"));
    }

    #[test]
    fn test_ps_quote_escapes_single_quotes() {
        assert_eq!(ps_quote("Web-Server"), "'Web-Server'");
        assert_eq!(ps_quote("it's"), "'it''s'");
    }

    #[test]
    fn test_wrap_for_host() {
        assert_eq!(wrap_for_host(&Host::local(), "Get-Date"), "Get-Date");
        let remote = wrap_for_host(&Host::new("srv01"), "Get-Date");
        assert!(remote.starts_with("Invoke-Command -ComputerName 'srv01'"));
        assert!(remote.contains("{ Get-Date }"));
    }

    #[test]
    fn test_sanitize_file_component() {
        assert_eq!(sanitize_file_component("srv01.corp.local"), "srv01_corp_local");
    }
}
