use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::process::Command;

/// Locations of the Tesseract executable and its language data.
#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: Option<PathBuf>,
}

/// Returns the directory for a locally installed Tesseract.
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rooftop-harvest")
        .join("tesseract")
}

fn executable_name() -> &'static str {
    if cfg!(windows) { "tesseract.exe" } else { "tesseract" }
}

fn runs_version(exe: &PathBuf) -> bool {
    Command::new(exe)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Finds the Tesseract executable, checking our local dir first, then PATH.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let local_exe = get_tesseract_dir().join(executable_name());
    if local_exe.exists() && runs_version(&local_exe) {
        return Ok(local_exe);
    }

    let on_path = PathBuf::from("tesseract");
    if runs_version(&on_path) {
        return Ok(on_path);
    }

    Err(anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds a tessdata directory containing English trained data.
///
/// Returns `None` when only the executable's built-in default applies.
pub fn find_tessdata_dir() -> Option<PathBuf> {
    let local_tessdata = get_tesseract_dir().join("tessdata");
    if local_tessdata.join("eng.traineddata").exists() {
        return Some(local_tessdata);
    }

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if p.join("eng.traineddata").exists() {
            return Some(p);
        }
        let p = PathBuf::from(&prefix).join("tessdata");
        if p.join("eng.traineddata").exists() {
            return Some(p);
        }
    }

    None
}

/// Locates Tesseract for the text extractor.
pub fn locate_tesseract() -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;
    let tessdata = find_tessdata_dir();

    log::info!(
        "Tesseract found at: {} (tessdata: {})",
        executable.display(),
        tessdata
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "default".to_string())
    );

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}
