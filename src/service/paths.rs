use crate::models::backup_outcome::Trigger;
use crate::models::config::{BackupPerTime, Config};
use crate::utils::directory::{clean_path, expand_home, resolve_path};
use crate::utils::drive_map::{DriveMapper, SubstDriveMapper};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H%M%S";

/// Which path rules apply when flattening a source path under the backup root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Derives where a backup of a file goes for a given wall clock time.
///
/// Layout below the root:
/// - `<root>/<rel>` without per-day folders
/// - `<root>/<YYYY-MM-DD>/<rel>` per day
/// - `<root>/<YYYY-MM-DD>/<HHMMSS>/<rel>` per day with per-time folders
/// - `<root>/<YYYY-MM-DD>/<dir>/<stem>_<HHMMSS><ext>` per day with per-time files
///
/// `<rel>` is the source path made relative (drive colon and leading
/// separator removed), so unrelated files never share a target.
#[derive(Debug, Clone)]
pub struct BackupPaths {
    root: String,
    per_day: bool,
    per_time: BackupPerTime,
    platform: Platform,
    drive_mapper: Arc<dyn DriveMapper>,
}

impl BackupPaths {
    pub fn new(
        root: &str,
        per_day: bool,
        per_time: BackupPerTime,
        platform: Platform,
        drive_mapper: Arc<dyn DriveMapper>,
    ) -> Self {
        BackupPaths {
            root: root.to_string(),
            per_day,
            per_time,
            platform,
            drive_mapper,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.backup_dir,
            config.backup_per_day,
            config.backup_per_time,
            Platform::current(),
            Arc::new(SubstDriveMapper),
        )
    }

    pub fn per_day(&self) -> bool {
        self.per_day
    }

    /// Per-time granularity only exists inside per-day folders
    pub fn per_time(&self) -> BackupPerTime {
        if self.per_day {
            self.per_time
        } else {
            BackupPerTime::None
        }
    }

    /// The configured root with `~` expanded and made absolute, `None` when
    /// unset. Relative roots resolve against the working directory.
    pub fn root(&self) -> Option<PathBuf> {
        if self.root.is_empty() {
            None
        } else if self.platform == Platform::current() {
            Some(resolve_path(&self.root))
        } else {
            Some(expand_home(&self.root))
        }
    }

    /// Directory that receives backups taken at `now`. With `only_base`
    /// the date and time folders are left off.
    pub fn base_dir(&self, now: NaiveDateTime, only_base: bool) -> Option<PathBuf> {
        let mut base = self.root()?;
        if only_base || !self.per_day {
            return Some(base);
        }

        base.push(now.format(DATE_FORMAT).to_string());
        if self.per_time == BackupPerTime::Folder {
            base.push(now.format(TIME_FORMAT).to_string());
        }
        Some(base)
    }

    /// Flatten an absolute path into a relative one that can live under the
    /// backup root. `slashes` forces `/` separators on Windows.
    pub fn normalise_path(&self, path: &str, slashes: bool) -> String {
        if path.is_empty() {
            return String::new();
        }

        if self.platform != Platform::Windows {
            return path.strip_prefix('/').unwrap_or(path).to_string();
        }

        let mut path = path.replace('/', "\\");

        if has_drive_prefix(&path) {
            let drive = &path[..2];
            let mapped = self
                .drive_mapper
                .resolve(drive)
                .unwrap_or_else(|| drive.to_string());
            path = format!("{}{}", mapped, &path[2..]);
        }

        // C:\dir -> C\dir
        if has_drive_prefix(&path) {
            path = format!("{}{}", &path[..1], &path[2..]);
        }

        // \\remotebox\share -> network\remotebox\share
        if let Some(rest) = path.strip_prefix("\\\\") {
            let host_len = rest
                .chars()
                .take_while(|c| is_word_char(*c) || *c == '-')
                .count();
            if host_len >= 2 {
                path = format!("network\\{}", rest);
            }
        }

        if slashes {
            path = path.replace('\\', "/");
        }
        path
    }

    /// Backup file name for `file_name`: a `_HHMMSS` suffix before the
    /// extension when per-time file granularity is on. An open trigger is
    /// stamped one second ahead so it never lands on a save's name.
    pub fn timestamp_file(&self, file_name: &str, now: NaiveDateTime, trigger: Trigger) -> String {
        if self.per_time() != BackupPerTime::File {
            return file_name.to_string();
        }

        let stamp = if trigger.is_open() {
            now + Duration::seconds(1)
        } else {
            now
        };
        let (stem, extension) = split_extension(file_name);
        format!("{}_{}{}", stem, stamp.format(TIME_FORMAT), extension)
    }

    /// Backup directory mirroring the parent directory of `source`
    pub fn backup_path(&self, source: &Path, now: NaiveDateTime) -> Option<PathBuf> {
        let source = self.resolve_source(source);
        let parent = source.parent().map(Path::to_path_buf).unwrap_or_default();
        let relative = self.normalise_path(&parent.to_string_lossy(), false);

        let mut target = self.base_dir(now, false)?;
        for component in self.split_relative(&relative) {
            target.push(component);
        }
        Some(target)
    }

    /// Full backup file path for `source` saved at `now`
    pub fn backup_filepath(&self, source: &Path, now: NaiveDateTime, trigger: Trigger) -> Option<PathBuf> {
        let file_name = source.file_name()?.to_string_lossy().into_owned();
        let directory = self.backup_path(source, now)?;
        Some(directory.join(self.timestamp_file(&file_name, now, trigger)))
    }

    /// Relative location of `source` inside a day or time folder, as used
    /// when scanning existing backups
    pub fn relative_source(&self, source: &Path) -> PathBuf {
        let source = self.resolve_source(source);
        let relative = self.normalise_path(&source.to_string_lossy(), true);
        relative
            .split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .collect()
    }

    /// True when `path` lies inside the backup root
    pub fn is_backup_file(&self, path: &Path) -> bool {
        let Some(root) = self.root() else {
            return false;
        };
        let path = self.resolve_source(path);
        let path = self.normalise_path(&path.to_string_lossy(), true);
        let root = self.normalise_path(&root.to_string_lossy(), true);

        let path_parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let root_parts: Vec<&str> = root.split('/').filter(|p| !p.is_empty()).collect();
        !root_parts.is_empty() && path_parts.starts_with(&root_parts)
    }

    /// `source` with `~` expanded, made absolute and with `.`/`..` segments
    /// folded away, so the derived target cannot climb out of the backup root
    pub fn resolve_source(&self, source: &Path) -> PathBuf {
        if self.platform == Platform::current() {
            resolve_path(&source.to_string_lossy())
        } else {
            clean_path(&expand_home(&source.to_string_lossy()))
        }
    }

    fn split_relative<'a>(&self, relative: &'a str) -> Vec<&'a str> {
        let separators: &[char] = match self.platform {
            Platform::Windows => &['\\', '/'],
            Platform::Unix => &['/'],
        };
        relative
            .split(separators)
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .collect()
    }
}

/// `YYYY-MM-DD` folder name to date; anything else is not a backup day
pub fn parse_date_folder(name: &str) -> Option<NaiveDate> {
    let bytes = name.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDate::parse_from_str(name, DATE_FORMAT).ok()
}

/// `HHMMSS`
pub fn is_time_stamp(name: &str) -> bool {
    name.len() == 6 && name.bytes().all(|b| b.is_ascii_digit())
}

/// `140709` -> `14:07:09`
pub fn format_time_label(stamp: &str) -> String {
    if !is_time_stamp(stamp) {
        return stamp.to_string();
    }
    format!("{}:{}:{}", &stamp[0..2], &stamp[2..4], &stamp[4..6])
}

/// Split `name` into stem and extension (with its dot). Leading dots do
/// not start an extension, so `.bashrc` has none.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if name[..dot].chars().any(|c| c != '.') => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let mut chars = path.chars();
    matches!((chars.next(), chars.next()), (Some(letter), Some(':')) if is_word_char(letter) && letter.is_ascii())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::drive_map::testing::StaticDriveMapper;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn unix_paths(root: &str, per_day: bool, per_time: BackupPerTime) -> BackupPaths {
        BackupPaths::new(root, per_day, per_time, Platform::Unix, Arc::new(StaticDriveMapper::default()))
    }

    fn windows_paths(mapper: StaticDriveMapper) -> BackupPaths {
        BackupPaths::new("C:/Backups", true, BackupPerTime::None, Platform::Windows, Arc::new(mapper))
    }

    #[test]
    fn test_per_day_and_time_folder_layout() {
        let paths = unix_paths("/backups", true, BackupPerTime::Folder);
        let target = paths
            .backup_filepath(Path::new("/home/u/a/b.txt"), at(2024, 3, 5, 14, 7, 9), Trigger::Save)
            .unwrap();

        assert_eq!(target, PathBuf::from("/backups/2024-03-05/140709/home/u/a/b.txt"));
    }

    #[test]
    fn test_per_day_and_time_file_layout() {
        let paths = unix_paths("/backups", true, BackupPerTime::File);
        let target = paths
            .backup_filepath(Path::new("/home/u/a/b.txt"), at(2024, 3, 5, 14, 7, 9), Trigger::Save)
            .unwrap();

        assert_eq!(target, PathBuf::from("/backups/2024-03-05/home/u/a/b_140709.txt"));
    }

    #[test]
    fn test_per_day_only_layout() {
        let paths = unix_paths("/backups", true, BackupPerTime::None);
        let target = paths
            .backup_filepath(Path::new("/etc/hosts"), at(2024, 12, 31, 23, 59, 59), Trigger::Save)
            .unwrap();

        assert_eq!(target, PathBuf::from("/backups/2024-12-31/etc/hosts"));
    }

    #[test]
    fn test_flat_layout_ignores_per_time() {
        let paths = unix_paths("/backups", false, BackupPerTime::File);
        let target = paths
            .backup_filepath(Path::new("/srv/app/main.rs"), at(2024, 3, 5, 14, 7, 9), Trigger::Save)
            .unwrap();

        assert_eq!(target, PathBuf::from("/backups/srv/app/main.rs"));
    }

    #[test]
    fn test_open_trigger_is_one_second_later() {
        let paths = unix_paths("/backups", true, BackupPerTime::File);
        let now = at(2024, 3, 5, 23, 59, 59);

        assert_eq!(paths.timestamp_file("notes.md", now, Trigger::Save), "notes_235959.md");
        assert_eq!(paths.timestamp_file("notes.md", now, Trigger::Open), "notes_000000.md");
    }

    #[test]
    fn test_same_clock_same_path() {
        let paths = unix_paths("/backups", true, BackupPerTime::Folder);
        let now = at(2024, 3, 5, 14, 7, 9);
        let first = paths.backup_filepath(Path::new("/a/b.txt"), now, Trigger::Save);
        let second = paths.backup_filepath(Path::new("/a/b.txt"), now, Trigger::Save);
        let other = paths.backup_filepath(Path::new("/a/c/b.txt"), now, Trigger::Save);

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn test_base_dir_only_base() {
        let paths = unix_paths("/backups", true, BackupPerTime::Folder);
        let now = at(2024, 3, 5, 14, 7, 9);

        assert_eq!(paths.base_dir(now, true), Some(PathBuf::from("/backups")));
        assert_eq!(paths.base_dir(now, false), Some(PathBuf::from("/backups/2024-03-05/140709")));
    }

    #[test]
    fn test_empty_root_has_no_target() {
        let paths = unix_paths("", true, BackupPerTime::None);
        assert!(paths
            .backup_filepath(Path::new("/a/b.txt"), at(2024, 3, 5, 1, 2, 3), Trigger::Save)
            .is_none());
    }

    #[test]
    fn test_home_relative_root() {
        let paths = unix_paths("~/.backups", false, BackupPerTime::None);
        let home = dirs::home_dir().unwrap();

        assert_eq!(paths.root(), Some(home.join(".backups")));
    }

    #[test]
    fn test_unix_normalise_strips_one_leading_slash() {
        let paths = unix_paths("/backups", true, BackupPerTime::None);

        assert_eq!(paths.normalise_path("/home/u/file", false), "home/u/file");
        assert_eq!(paths.normalise_path("relative/file", false), "relative/file");
        assert_eq!(paths.normalise_path("", false), "");
    }

    #[test]
    fn test_windows_normalise_drive_letter() {
        let paths = windows_paths(StaticDriveMapper::default());

        assert_eq!(paths.normalise_path("C:\\Users\\me\\a.txt", false), "C\\Users\\me\\a.txt");
        assert_eq!(paths.normalise_path("C:/Users/me/a.txt", true), "C/Users/me/a.txt");
    }

    #[test]
    fn test_windows_normalise_resolves_subst_drive() {
        let paths = windows_paths(StaticDriveMapper::with("D:", "C:\\mypath"));

        assert_eq!(paths.normalise_path("D:\\src\\lib.rs", false), "C\\mypath\\src\\lib.rs");
    }

    #[test]
    fn test_windows_normalise_network_share() {
        let paths = windows_paths(StaticDriveMapper::default());

        assert_eq!(
            paths.normalise_path("\\\\remotebox\\share\\doc.txt", true),
            "network/remotebox/share/doc.txt"
        );
        // single character host names are not treated as shares
        assert_eq!(paths.normalise_path("\\\\x\\doc.txt", true), "//x/doc.txt");
    }

    #[test]
    fn test_is_backup_file() {
        let paths = unix_paths("/backups", true, BackupPerTime::Folder);

        assert!(paths.is_backup_file(Path::new("/backups/2024-03-05/140709/home/u/a.txt")));
        assert!(paths.is_backup_file(Path::new("/backups/2020-01-01/etc/hosts")));
        assert!(!paths.is_backup_file(Path::new("/backups-old/a.txt")));
        assert!(!paths.is_backup_file(Path::new("/home/u/a.txt")));
    }

    #[test]
    fn test_parent_segments_stay_under_root() {
        let paths = unix_paths("/backups", true, BackupPerTime::None);
        let now = at(2024, 3, 5, 14, 7, 9);

        let target = paths
            .backup_filepath(Path::new("/home/u/../../../../etc/passwd"), now, Trigger::Save)
            .unwrap();
        assert_eq!(target, PathBuf::from("/backups/2024-03-05/etc/passwd"));

        let target = paths
            .backup_filepath(Path::new("/home/u/./docs/../a.txt"), now, Trigger::Save)
            .unwrap();
        assert_eq!(target, PathBuf::from("/backups/2024-03-05/home/u/a.txt"));
        assert_eq!(
            paths.relative_source(Path::new("/home/u/./docs/../a.txt")),
            PathBuf::from("home/u/a.txt")
        );
    }

    #[test]
    fn test_relative_root_is_resolved_against_working_dir() {
        let paths = unix_paths("backups", true, BackupPerTime::None);
        let root = std::env::current_dir().unwrap().join("backups");

        assert_eq!(paths.root(), Some(clean_path(&root)));
        assert!(paths.is_backup_file(&root.join("2024-03-05").join("home/u/a.txt")));
        assert!(paths.is_backup_file(Path::new("backups/2024-03-05/home/u/a.txt")));
        assert!(!paths.is_backup_file(Path::new("/elsewhere/backups/a.txt")));
    }

    #[test]
    fn test_is_backup_file_with_parent_segments() {
        let paths = unix_paths("/backups", true, BackupPerTime::None);

        assert!(paths.is_backup_file(Path::new("/home/../backups/2024-03-05/a.txt")));
        assert!(!paths.is_backup_file(Path::new("/backups/../home/u/a.txt")));
    }

    #[test]
    fn test_relative_source() {
        let paths = unix_paths("/backups", true, BackupPerTime::None);
        assert_eq!(paths.relative_source(Path::new("/home/u/a.txt")), PathBuf::from("home/u/a.txt"));
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("b.txt"), ("b", ".txt"));
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", ".gz"));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension("Makefile"), ("Makefile", ""));
        assert_eq!(split_extension("..hidden"), ("..hidden", ""));
    }

    #[test]
    fn test_parse_date_folder() {
        assert_eq!(parse_date_folder("2024-03-05"), NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(parse_date_folder("2024-02-30"), None);
        assert_eq!(parse_date_folder("2024-3-05"), None);
        assert_eq!(parse_date_folder("2024-03-05-old"), None);
        assert_eq!(parse_date_folder("+024-03-05"), None);
    }

    #[test]
    fn test_time_stamps() {
        assert!(is_time_stamp("140709"));
        assert!(!is_time_stamp("14070"));
        assert!(!is_time_stamp("14:07:09"));
        assert_eq!(format_time_label("140709"), "14:07:09");
    }
}
