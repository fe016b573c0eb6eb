use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::DepositBoxError;
use crate::inspect::metadata::{MetadataSummary, read_metadata};

/// `<ftp_dir>/eva-box-NN/upload/<username>`
pub fn deposit_box_path(ftp_dir: &Path, ftp_box: u32, username: &str) -> PathBuf {
    upload_dir(ftp_dir, ftp_box).join(username)
}

fn upload_dir(ftp_dir: &Path, ftp_box: u32) -> PathBuf {
    ftp_dir.join(format!("eva-box-{ftp_box:02}")).join("upload")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub struct FtpDepositBox {
    path: PathBuf,
    username: String,
    modified: DateTime<Local>,
    vcf_files: Vec<FileEntry>,
    metadata_files: Vec<FileEntry>,
    other_files: Vec<FileEntry>,
}

impl FtpDepositBox {
    /// Walks the user's deposit box and sorts its files into vcf, metadata and other.
    pub fn open(ftp_dir: &Path, ftp_box: u32, username: &str) -> Result<Self, DepositBoxError> {
        let path = deposit_box_path(ftp_dir, ftp_box, username);
        if !path.is_dir() {
            return Err(DepositBoxError::UserNotFound {
                ftp_box,
                username: username.to_owned(),
            });
        }
        let modified = DateTime::from(fs::metadata(&path)?.modified()?);

        let mut files = Vec::new();
        for entry in fs::read_dir(&path)? {
            visit(entry, &mut files);
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut vcf_files = Vec::new();
        let mut metadata_files = Vec::new();
        let mut other_files = Vec::new();
        for entry in files {
            let name = entry.path.to_string_lossy();
            if name.ends_with(".vcf.gz") || name.ends_with(".vcf") {
                vcf_files.push(entry);
            } else if name.ends_with(".xlsx") {
                metadata_files.push(entry);
            } else {
                other_files.push(entry);
            }
        }

        Ok(Self {
            path,
            username: username.to_owned(),
            modified,
            vcf_files,
            metadata_files,
            other_files,
        })
    }

    pub fn vcf_files(&self) -> &[FileEntry] {
        &self.vcf_files
    }

    pub fn metadata_files(&self) -> &[FileEntry] {
        &self.metadata_files
    }

    pub fn other_files(&self) -> &[FileEntry] {
        &self.other_files
    }

    pub fn size(&self) -> u64 {
        size_of(&self.vcf_files) + size_of(&self.metadata_files) + size_of(&self.other_files)
    }

    /// Falls back to the box directory's own mtime unless every category has files.
    pub fn last_modified(&self) -> DateTime<Local> {
        if self.vcf_files.is_empty() || self.metadata_files.is_empty() || self.other_files.is_empty() {
            return self.modified;
        }
        [&self.vcf_files, &self.metadata_files, &self.other_files]
            .into_iter()
            .filter_map(|files| last_modified_of(files))
            .max()
            .unwrap_or(self.modified)
    }

    pub fn most_recent_metadata(&self) -> Option<&Path> {
        self.metadata_files
            .iter()
            .max_by_key(|f| f.modified)
            .map(|f| f.path.as_path())
    }

    /// Builds the report. Spreadsheet details come from the most recent
    /// metadata file and stay `None` when it is absent or unreadable.
    pub fn report(&self) -> DepositBoxReport {
        let metadata: Option<MetadataSummary> = self.most_recent_metadata().and_then(|path| {
            read_metadata(path)
                .map_err(|e| log::warn!("cannot read metadata {}: {e}", path.display()))
                .ok()
        });

        DepositBoxReport {
            ftp_box: self.path.clone(),
            username: self.username.clone(),
            ftp_box_last_modified: self.last_modified(),
            ftp_box_size: self.size(),
            number_vcf: self.vcf_files.len(),
            vcf_last_modified: last_modified_of(&self.vcf_files),
            vcf_size: size_of(&self.vcf_files),
            number_metadata: self.metadata_files.len(),
            metadata_last_modified: last_modified_of(&self.metadata_files),
            most_recent_metadata: self.most_recent_metadata().map(Path::to_path_buf),
            number_other: self.other_files.len(),
            project_title: metadata.as_ref().and_then(|m| m.project_title.clone()),
            number_analysis: metadata.as_ref().map(|m| m.number_analysis),
            reference_genome: metadata
                .as_ref()
                .map(|m| m.references.join(", "))
                .filter(|r| !r.is_empty()),
            number_samples: metadata.as_ref().map(|m| m.number_samples),
        }
    }
}

pub fn size_of(files: &[FileEntry]) -> u64 {
    files.iter().map(|f| f.size).sum()
}

pub fn last_modified_of(files: &[FileEntry]) -> Option<DateTime<Local>> {
    files.iter().map(|f| f.modified).max()
}

/// Records one directory entry below the box root. Unreadable entries and
/// subdirectories are logged and skipped.
fn visit(entry: std::io::Result<fs::DirEntry>, out: &mut Vec<FileEntry>) {
    let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
            log::warn!("skipping unreadable entry: {e}");
            return;
        }
    };
    let path = entry.path();

    if entry.file_type().is_ok_and(|t| t.is_dir()) {
        match fs::read_dir(&path) {
            Ok(entries) => entries.for_each(|e| visit(e, out)),
            Err(e) => log::warn!("skipping {}: {e}", path.display()),
        }
        return;
    }

    match fs::metadata(&path).and_then(|meta| Ok((meta.is_file(), meta.len(), meta.modified()?))) {
        Ok((true, size, modified)) => out.push(FileEntry {
            path,
            size,
            modified: DateTime::from(modified),
        }),
        Ok(_) => {}
        Err(e) => log::warn!("skipping {}: {e}", path.display()),
    }
}

/// Reports for every user under the box's upload directory, sorted by username.
/// Hidden directories such as `.snapshot` are not users.
pub fn inspect_all_users(ftp_dir: &Path, ftp_box: u32) -> Result<Vec<DepositBoxReport>, DepositBoxError> {
    let upload = upload_dir(ftp_dir, ftp_box);
    if !upload.is_dir() {
        return Err(DepositBoxError::BoxNotFound { ftp_box });
    }

    let mut users = Vec::new();
    for entry in fs::read_dir(&upload)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') && entry.file_type()?.is_dir() {
            users.push(name);
        }
    }
    users.sort();

    users
        .iter()
        .map(|user| FtpDepositBox::open(ftp_dir, ftp_box, user).map(|b| b.report()))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositBoxReport {
    pub ftp_box: PathBuf,
    pub username: String,
    pub ftp_box_last_modified: DateTime<Local>,
    pub ftp_box_size: u64,
    pub number_vcf: usize,
    pub vcf_last_modified: Option<DateTime<Local>>,
    pub vcf_size: u64,
    pub number_metadata: usize,
    pub metadata_last_modified: Option<DateTime<Local>>,
    pub most_recent_metadata: Option<PathBuf>,
    pub number_other: usize,
    pub project_title: Option<String>,
    pub number_analysis: Option<usize>,
    pub reference_genome: Option<String>,
    pub number_samples: Option<usize>,
}

impl fmt::Display for DepositBoxReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "#############################";
        writeln!(f, "{rule}")?;
        writeln!(f, "ftp box: {}", self.ftp_box.display())?;
        writeln!(f, "last modified: {}", timestamp(Some(self.ftp_box_last_modified)))?;
        writeln!(f, "size: {}", natural_size(self.ftp_box_size))?;
        writeln!(f, "-----")?;
        writeln!(f, "number of vcf files: {}", self.number_vcf)?;
        writeln!(f, "last modified: {}", timestamp(self.vcf_last_modified))?;
        writeln!(f, "size: {}", natural_size(self.vcf_size))?;
        writeln!(f, "-----")?;
        writeln!(f, "number of metadata spreadsheet: {}", self.number_metadata)?;
        writeln!(f, "last modified: {}", timestamp(self.metadata_last_modified))?;
        writeln!(f, "Project title: {}", or_na(self.project_title.as_deref()))?;
        writeln!(f, "Number of analysis: {}", or_na(self.number_analysis))?;
        writeln!(f, "Number of sample: {}", or_na(self.number_samples))?;
        writeln!(f, "{rule}")
    }
}

fn or_na<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "NA".into(), |v| v.to_string())
}

fn timestamp(t: Option<DateTime<Local>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "NA".into())
}

/// Human readable size in decimal units: `1 Byte`, `512 Bytes`, `1.5 kB`, `3.2 GB`.
pub fn natural_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 8] = ["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
    if bytes == 1 {
        return "1 Byte".into();
    }
    if bytes < 1000 {
        return format!("{bytes} Bytes");
    }
    let value = bytes as f64;
    let mut unit = 1000f64;
    for suffix in &SUFFIXES[..SUFFIXES.len() - 1] {
        if value < unit * 1000.0 {
            return format!("{:.1} {suffix}", value / unit);
        }
        unit *= 1000.0;
    }
    format!("{:.1} {}", value / unit, SUFFIXES[SUFFIXES.len() - 1])
}
