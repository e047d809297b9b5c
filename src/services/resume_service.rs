use std::path::Path;
use std::sync::OnceLock;

use bytes::Bytes;
use regex::Regex;
use tokio::fs;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::services::ai_service::{AIService, ContactDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    Docx,
}

impl ResumeFormat {
    /// Detects the format from the content type, falling back to the file extension.
    pub fn detect(file_name: Option<&str>, content_type: Option<&str>) -> Option<Self> {
        match content_type.map(|c| c.trim().to_ascii_lowercase()).as_deref() {
            Some("application/pdf") => return Some(ResumeFormat::Pdf),
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document") => {
                return Some(ResumeFormat::Docx)
            }
            _ => {}
        }
        let ext = file_name
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("pdf") => Some(ResumeFormat::Pdf),
            Some("docx") => Some(ResumeFormat::Docx),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct ResumeService {
    ai: AIService,
}

impl ResumeService {
    pub fn new(ai: AIService) -> Self {
        Self { ai }
    }

    pub async fn parse(
        &self,
        file_name: Option<&str>,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<ContactDetails> {
        let format = ResumeFormat::detect(file_name, content_type).ok_or_else(|| {
            Error::BadRequest("Please upload a PDF or DOCX file".to_string())
        })?;
        if data.is_empty() {
            return Err(Error::BadRequest("Uploaded resume is empty".to_string()));
        }

        let text = match format {
            ResumeFormat::Pdf => extract_pdf_text(data).await?,
            ResumeFormat::Docx => extract_docx_text(data).await?,
        };
        tracing::info!(?format, chars = text.len(), "Extracted resume text");

        let heuristic = extract_contact_heuristic(&text);
        let details = match self.ai.extract_contact_details(&text).await {
            Some(found) => merge(found, heuristic),
            None => heuristic,
        };
        Ok(ContactDetails {
            name: details.name.trim().to_string(),
            email: details.email.trim().to_lowercase(),
            phone: details.phone.trim().to_string(),
        })
    }
}

async fn extract_pdf_text(data: Bytes) -> Result<String> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
        .await
        .map_err(|e| Error::Internal(format!("PDF extraction task failed: {}", e)))?
        .map_err(|e| Error::BadRequest(format!("Could not read PDF: {}", e)))
}

async fn extract_docx_text(data: Bytes) -> Result<String> {
    let temp_dir = tempfile::tempdir()?;
    let input = temp_dir.path().join("resume.docx");
    fs::write(&input, &data).await?;

    let output = Command::new("libreoffice")
        .arg("--headless")
        .arg("--norestore")
        .arg("--convert-to")
        .arg("txt:Text")
        .arg("--outdir")
        .arg(temp_dir.path())
        .arg(&input)
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run libreoffice: {}", e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "LibreOffice text conversion failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )
        .into());
    }

    let text = fs::read(temp_dir.path().join("resume.txt")).await.map_err(|e| {
        tracing::warn!(error = %e, "LibreOffice produced no text output");
        Error::BadRequest("Could not read DOCX".to_string())
    })?;
    Ok(String::from_utf8_lossy(&text).into_owned())
}

fn merge(found: ContactDetails, fallback: ContactDetails) -> ContactDetails {
    let pick = |a: String, b: String| if a.trim().is_empty() { b } else { a };
    ContactDetails {
        name: pick(found.name, fallback.name),
        email: pick(found.email, fallback.email),
        phone: pick(found.phone, fallback.phone),
    }
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("email regex")
    })
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+?\(?\d[\d \t\-().]{5,}\d").expect("phone regex"))
}

/// Best effort: first email, first run of 7 to 15 digits, and the first short
/// line made of letters as the name.
pub fn extract_contact_heuristic(text: &str) -> ContactDetails {
    let email = email_re()
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let phone = phone_re()
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .find(|p| (7..=15).contains(&p.chars().filter(char::is_ascii_digit).count()))
        .unwrap_or_default()
        .to_string();

    let name = text
        .lines()
        .map(str::trim)
        .find(|line| {
            let words = line.split_whitespace().count();
            (1..=4).contains(&words)
                && line.len() <= 60
                && !line.contains('@')
                && line.chars().all(|c| c.is_alphabetic() || c.is_whitespace() || matches!(c, '.' | '-' | '\''))
        })
        .unwrap_or_default()
        .to_string();

    ContactDetails { name, email, phone }
}
