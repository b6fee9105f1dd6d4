//! Copy primitive preserving file metadata.

use std::fs;
use std::io;
use std::path::Path;

use filetime::FileTime;

/// Copy `source` to `dest`, preserving permissions and timestamps.
///
/// Returns the number of bytes copied. Permissions travel with
/// `fs::copy`; modification and access times are restamped afterwards.
pub fn copy_with_metadata(source: &Path, dest: &Path) -> io::Result<u64> {
    let bytes = fs::copy(source, dest)?;

    let metadata = fs::metadata(source)?;
    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_times(dest, atime, mtime)?;

    Ok(bytes)
}
