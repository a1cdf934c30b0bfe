use std::fs::Metadata;
use std::path::Path;
use std::process::Command;

/// True when the filesystem reports the entry as a cloud placeholder —
/// an entry whose bytes are not locally materialized. Hashing such a file
/// would force the sync client to download it.
#[cfg(target_os = "macos")]
pub fn is_cloud_placeholder(_path: &Path, metadata: &Metadata) -> bool {
    use std::os::macos::fs::MetadataExt;
    // UF_DATALESS: the file's content is managed by a file provider and
    // not present on disk.
    const UF_DATALESS: u32 = 0x0000_0040;
    metadata.st_flags() & UF_DATALESS != 0
}

#[cfg(all(unix, not(target_os = "macos")))]
pub fn is_cloud_placeholder(_path: &Path, metadata: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    // Sync clients on Linux expose placeholders as sparse entries with a
    // nominal size but no allocated blocks.
    metadata.len() > 0 && metadata.blocks() == 0
}

#[cfg(windows)]
pub fn is_cloud_placeholder(_path: &Path, metadata: &Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_OFFLINE: u32 = 0x0000_1000;
    const FILE_ATTRIBUTE_RECALL_ON_DATA_ACCESS: u32 = 0x0040_0000;
    metadata.file_attributes() & (FILE_ATTRIBUTE_OFFLINE | FILE_ATTRIBUTE_RECALL_ON_DATA_ACCESS) != 0
}

/// Reveal a file in the OS file manager, selecting it where supported.
pub fn reveal_in_file_manager(path: &Path) -> crate::Result<()> {
    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg("-R").arg(path).spawn()?;
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        let target = path.parent().unwrap_or(path);
        Command::new("xdg-open").arg(target).spawn()?;
    }
    #[cfg(windows)]
    {
        Command::new("explorer")
            .arg(format!("/select,{}", path.display()))
            .spawn()?;
    }
    Ok(())
}
