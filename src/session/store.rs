use crate::error::{ClientError, Result};
use crate::session::Identity;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const RECORD_FILE: &str = "user.json";

/// The single persisted identity record.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    dir: PathBuf,
}

impl IdentityStore {
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self) -> PathBuf {
        self.dir.join(RECORD_FILE)
    }

    pub fn load(&self) -> Result<Option<Identity>> {
        let path = self.record_path();
        if !path.exists() {
            return Ok(None);
        }
        read_record(&path).map(Some)
    }

    pub fn save(&self, identity: &Identity) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let final_path = self.record_path();
        let tmp_path = self.dir.join(format!("{RECORD_FILE}.tmp"));
        let bytes = serde_json::to_vec_pretty(identity)?;

        fs::write(&tmp_path, bytes)?;
        match fs::rename(&tmp_path, &final_path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if final_path.exists() {
                    fs::remove_file(&final_path)?;
                    fs::rename(&tmp_path, &final_path)?;
                    Ok(())
                } else {
                    Err(rename_err.into())
                }
            }
        }
    }

    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(self.record_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn read_record(path: &Path) -> Result<Identity> {
    let data = fs::read(path)?;
    let identity: Identity = serde_json::from_slice(&data)?;
    if identity.sub.trim().is_empty() {
        return Err(ClientError::Config(format!(
            "identity record {} has no subject id",
            path.display()
        )));
    }
    Ok(identity)
}
