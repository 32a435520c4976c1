use rand::Rng;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Atomically replace the file at `path` with `bytes`.
///
/// Writes a sibling temp file, syncs it, renames it over `path` and then
/// fsyncs the directory. A crash leaves either the old or the new contents,
/// never a partial library.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other("missing file name"))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let nonce: u64 = rand::thread_rng().r#gen();
    let tmp = dir.join(format!(".{}.inkwell.tmp.{}", name.to_string_lossy(), nonce));
    let mut f = OpenOptions::new().create_new(true).write(true).open(&tmp)?;
    if let Err(err) = f.write_all(bytes).and_then(|()| f.sync_all()) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    fs::rename(&tmp, path)?;
    let dirf = File::open(dir)?;
    dirf.sync_all()?;
    Ok(())
}
