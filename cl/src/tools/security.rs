//! Path policy for tools that modify the filesystem

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// System directories no tool may write into or delete from
const BLOCKED_DIRECTORIES: &[&str] = &[
    "/etc",
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
    "/boot",
    "/sys",
    "/proc",
    "/dev",
    "C:\\Windows",
    "C:\\Program Files",
    "C:\\Program Files (x86)",
    "C:\\System32",
];

const BLOCKED_EXTENSIONS: &[&str] = &[
    "exe",
    "dll",
    "sys",
    "bat",
    "cmd",
    "com",
    "scr",
    "pif",
    "application",
    "gadget",
    "msi",
    "msp",
    "msc",
];

const BLOCKED_FILENAMES: &[&str] = &[
    "boot.ini",
    "ntldr",
    "bootmgr",
    "pagefile.sys",
    "hiberfil.sys",
    "autoexec.bat",
    "config.sys",
    ".ds_store",
    "thumbs.db",
    "desktop.ini",
];

const DANGEROUS_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Why a target path was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityViolation {
    #[error("cannot modify files in system directory: {0}")]
    SystemDirectory(String),

    #[error("file extension '.{0}' is not allowed")]
    BlockedExtension(String),

    #[error("cannot modify system file: {0}")]
    SystemFile(String),

    #[error("filename contains invalid characters: {0}")]
    InvalidCharacters(String),
}

/// Lowercased path components with `.` dropped and `..` applied lexically.
/// Both separators are accepted so Windows-style entries compare on any host.
fn normalized_components(path: &str) -> Vec<String> {
    let mut components: Vec<String> = Vec::new();
    for part in path.to_lowercase().replace('\\', "/").split('/') {
        match part {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            other => components.push(other.to_string()),
        }
    }
    components
}

/// Check that `path` may be written or deleted
///
/// `path` should already be resolved against the working directory.
pub fn check_path(path: &Path) -> Result<(), SecurityViolation> {
    debug!(?path, "check_path: called");
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let display = absolute.to_string_lossy().to_string();
    let components = normalized_components(&display);

    for blocked in BLOCKED_DIRECTORIES {
        let prefix = normalized_components(blocked);
        if components.starts_with(&prefix) {
            debug!(%blocked, "check_path: inside blocked directory");
            return Err(SecurityViolation::SystemDirectory((*blocked).to_string()));
        }
    }

    let Some(file_name) = absolute.file_name().map(|n| n.to_string_lossy().to_string()) else {
        return Ok(());
    };
    let lower_name = file_name.to_lowercase();

    if BLOCKED_FILENAMES.contains(&lower_name.as_str()) {
        debug!(%file_name, "check_path: blocked filename");
        return Err(SecurityViolation::SystemFile(file_name));
    }

    if let Some(ext) = Path::new(&lower_name).extension().map(|e| e.to_string_lossy().to_string())
        && BLOCKED_EXTENSIONS.contains(&ext.as_str())
    {
        debug!(%ext, "check_path: blocked extension");
        return Err(SecurityViolation::BlockedExtension(ext));
    }

    if file_name.contains(DANGEROUS_CHARS) {
        debug!(%file_name, "check_path: dangerous characters");
        return Err(SecurityViolation::InvalidCharacters(file_name));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_blocks_system_directories() {
        assert!(matches!(
            check_path(Path::new("/etc/passwd")),
            Err(SecurityViolation::SystemDirectory(_))
        ));
        assert!(matches!(
            check_path(Path::new("/usr/bin/tool")),
            Err(SecurityViolation::SystemDirectory(_))
        ));
        assert!(matches!(
            check_path(Path::new("/tmp/../etc/hosts")),
            Err(SecurityViolation::SystemDirectory(_))
        ));
    }

    #[test]
    fn test_directory_match_is_component_wise() {
        assert!(check_path(Path::new("/etcetera/notes.txt")).is_ok());
        assert!(check_path(Path::new("/usr/binaries/readme.md")).is_ok());
    }

    #[test]
    fn test_windows_directories_compare_case_insensitively() {
        let components = normalized_components("c:\\WINDOWS\\system.ini");
        assert!(components.starts_with(&normalized_components("C:\\Windows")));
    }

    #[test]
    fn test_blocks_extensions_case_insensitive() {
        assert_eq!(
            check_path(Path::new("/tmp/work/setup.EXE")),
            Err(SecurityViolation::BlockedExtension("exe".to_string()))
        );
        assert!(check_path(Path::new("/tmp/work/run.bat")).is_err());
        assert!(check_path(Path::new("/tmp/work/main.rs")).is_ok());
    }

    #[test]
    fn test_blocks_system_filenames() {
        assert!(matches!(
            check_path(Path::new("/tmp/work/.DS_Store")),
            Err(SecurityViolation::SystemFile(_))
        ));
        assert!(matches!(
            check_path(Path::new("/tmp/work/thumbs.DB")),
            Err(SecurityViolation::SystemFile(_))
        ));
    }

    #[test]
    fn test_blocks_dangerous_characters() {
        let path = PathBuf::from("/tmp/work").join("what?.txt");
        assert!(matches!(check_path(&path), Err(SecurityViolation::InvalidCharacters(_))));
        assert!(check_path(&PathBuf::from("/tmp/work").join("a|b")).is_err());
    }

    #[test]
    fn test_relative_path_checked_as_absolute() {
        assert!(check_path(Path::new("notes/todo.md")).is_ok());
    }
}
