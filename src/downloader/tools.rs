use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ToolType {
    Ffmpeg,
    YtDlp,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::Ffmpeg => "ffmpeg",
            ToolType::YtDlp => "yt-dlp",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::Ffmpeg => "-version",
            ToolType::YtDlp => "--version",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
    pub is_available: bool,
}

#[derive(Debug, Default)]
pub struct ToolManager;

impl ToolManager {
    pub fn new() -> Self {
        Self
    }

    /// Look up a tool, preferring an explicitly configured path
    pub fn get_tool_info(&self, tool_type: ToolType, configured: Option<&Path>) -> ToolInfo {
        let path = match configured {
            Some(p) => Some(p.to_path_buf()),
            None => self.detect_tool(tool_type),
        };
        let version = path.as_deref().and_then(|p| self.get_version(p, tool_type));

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            is_available: version.is_some(),
            version,
            path,
        }
    }

    /// Path to run the tool with: configured, detected, or the bare name for PATH lookup
    pub fn resolve_binary(&self, tool_type: ToolType, configured: Option<&Path>) -> PathBuf {
        configured
            .map(Path::to_path_buf)
            .or_else(|| self.detect_tool(tool_type))
            .unwrap_or_else(|| PathBuf::from(tool_type.as_str()))
    }

    fn detect_tool(&self, tool_type: ToolType) -> Option<PathBuf> {
        let binary_name = tool_type.as_str();

        // 1. Try common paths first
        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary_name),
            format!("/usr/local/bin/{}", binary_name),
            format!("/usr/bin/{}", binary_name),
        ];

        for path in common_paths {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Try PATH
        let finder = if cfg!(windows) { "where" } else { "which" };
        match Command::new(finder).arg(binary_name).output() {
            Ok(output) if output.status.success() => {
                let found = String::from_utf8_lossy(&output.stdout);
                found
                    .lines()
                    .next()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
            }
            _ => None,
        }
    }

    fn get_version(&self, path: &Path, tool_type: ToolType) -> Option<String> {
        match Command::new(path).arg(tool_type.version_arg()).output() {
            Ok(output) if output.status.success() => {
                // ffmpeg prints a banner; the first line carries the version
                String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .map(|l| l.trim().to_string())
            }
            _ => None,
        }
    }
}
