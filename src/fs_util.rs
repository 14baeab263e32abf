use std::fs;
use std::io::Write;

use camino::Utf8Path;

use crate::error::KiraError;

pub fn write_atomic(dest: &Utf8Path, bytes: &[u8]) -> Result<(), KiraError> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("create {parent}: {err}")))?;
    let mut temp = tempfile::Builder::new()
        .prefix("kira-cg-out")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    temp.write_all(bytes)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("persist {dest}: {}", err.error)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn writes_into_missing_directories() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let dest = root.join("out").join("graph.json");

        write_atomic(&dest, b"{}").unwrap();
        write_atomic(&dest, b"{\"nodes\":[]}").unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "{\"nodes\":[]}");
    }
}
