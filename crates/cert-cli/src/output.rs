use anyhow::Result;
use cert_core::lifecycle::{progress_percent, stage_label};
use cert_core::CertificationRequest;
use serde::Serialize;

const BAR_WIDTH: usize = 20;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `[#####---------------]  25%`
pub fn progress_bar(percent: u8) -> String {
    let filled = (usize::from(percent.min(100)) * BAR_WIDTH + 50) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent
    )
}

pub fn request_line(request: &CertificationRequest) -> String {
    format!(
        "- [{}] {} ({}) {} | target {} | {}",
        request.darp_key,
        request.project_name,
        request.kind,
        stage_label(request.status),
        request.target_date,
        progress_bar(progress_percent(request))
    )
}

pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(progress_bar(0), format!("[{}]   0%", "-".repeat(20)));
        assert_eq!(progress_bar(25), format!("[{}{}]  25%", "#".repeat(5), "-".repeat(15)));
        assert_eq!(progress_bar(100), format!("[{}] 100%", "#".repeat(20)));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Compliance Reqs", 6), "Compl…");
    }
}
