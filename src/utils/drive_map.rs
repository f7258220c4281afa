use log::debug;

/// Resolves a substituted drive letter (`subst D: C:\work`) to the path it
/// stands for, so backups of the same file land in one place whichever
/// drive it was opened through.
pub trait DriveMapper: Send + Sync + std::fmt::Debug {
    /// `drive` is a two character drive such as `D:`.
    fn resolve(&self, drive: &str) -> Option<String>;
}

/// Asks the `subst` command for the current drive substitutions.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstDriveMapper;

impl DriveMapper for SubstDriveMapper {
    #[cfg(windows)]
    fn resolve(&self, drive: &str) -> Option<String> {
        let output = match std::process::Command::new("subst").output() {
            Ok(output) => output,
            Err(e) => {
                debug!("Could not run subst: {}", e);
                return None;
            }
        };
        let listing = String::from_utf8_lossy(&output.stdout);
        parse_subst_output(&listing, drive)
    }

    #[cfg(not(windows))]
    fn resolve(&self, drive: &str) -> Option<String> {
        debug!("Drive substitution is only available on Windows, keeping {}", drive);
        None
    }
}

/// Parse `subst` listing lines of the form `D:\: => C:\mypath`.
#[cfg_attr(not(windows), allow(dead_code))]
pub fn parse_subst_output(listing: &str, drive: &str) -> Option<String> {
    let wanted = drive.to_uppercase();
    listing.lines().find_map(|line| {
        let (left, right) = line.split_once("=>")?;
        let left = left.trim();
        if left.len() < 2 || !left.is_char_boundary(2) {
            return None;
        }
        if left[..2].to_uppercase() != wanted {
            return None;
        }
        let target = right.trim();
        let target = target.strip_prefix(r"\??\").unwrap_or(target);
        Some(target.to_string())
    })
}
