//! Host platform detection.
//!
//! Pure functions over OS/architecture names; the only impure entry point is
//! [`Platform::current`], which feeds the compile-time target names in.


use std::fmt;

use crate::PlatformError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Windows,
    Unix,
    MacOsX,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Architecture {
    X86,
    X86_64,
    Aarch64,
    /// Any other architecture; the server binary is resolved the same way
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Architecture,
}

/// Classifies an OS name such as `linux`, `macos`, `Mac OS X` or `Windows 10`.
pub fn detect_os(os_name: &str) -> Result<Os> {
    let name = os_name.trim().to_lowercase();

    // "darwin" contains "win", so macOS names are matched first
    if name == "mac os x" || name == "macos" || name == "darwin" {
        Ok(Os::MacOsX)
    } else if name.contains("win") {
        Ok(Os::Windows)
    } else if name.contains("nix") || name.contains("nux") || name.contains("aix") {
        Ok(Os::Unix)
    } else {
        Err(PlatformError::UnrecognizedOs(os_name.to_string()).into())
    }
}

/// Never fails: only the OS decides whether the harness can run.
pub fn detect_arch(arch_name: &str) -> Architecture {
    match arch_name.trim().to_lowercase().as_str() {
        "x86_64" | "amd64" => Architecture::X86_64,
        "x86" | "i386" | "i686" => Architecture::X86,
        "aarch64" | "arm64" => Architecture::Aarch64,
        other => Architecture::Other(other.to_string()),
    }
}

impl Platform {
    pub fn detect(
        os_name: &str,
        arch_name: &str,
    ) -> Result<Self> {
        Ok(Self {
            os: detect_os(os_name)?,
            arch: detect_arch(arch_name),
        })
    }

    /// Platform this binary was compiled for
    pub fn current() -> Result<Self> {
        Self::detect(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Executable file name for `base` on this platform
    pub fn executable_name(
        &self,
        base: &str,
    ) -> String {
        match self.os {
            Os::Windows if !base.to_lowercase().ends_with(".exe") => format!("{base}.exe"),
            _ => base.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match &self.arch {
            Architecture::Other(name) => write!(f, "{:?}/{name}", self.os),
            arch => write!(f, "{:?}/{arch:?}", self.os),
        }
    }
}
