//! Appointment letter payload for the external renderer.
//!
//! [`prepare`] is a pure function of the appointment: no store access, no
//! clock. Every rendering is byte-for-byte reproducible from the same input.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use rendezvous_shared::constants::{EXPORT_FOOTER, EXPORT_TITLE};
use rendezvous_shared::types::{format_date, format_time, AppointmentId, AppointmentStatus};
use rendezvous_store::Appointment;

use crate::error::{LifecycleError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub appointment_id: AppointmentId,
    pub title: String,
    pub subject: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub attendees: String,
    pub footer: String,
}

/// Build the letter for a confirmed appointment.
pub fn prepare(appointment: &Appointment) -> Result<ExportDocument> {
    if appointment.status != AppointmentStatus::Confirmed {
        return Err(LifecycleError::NotConfirmed(appointment.status));
    }

    Ok(ExportDocument {
        appointment_id: appointment.id,
        title: EXPORT_TITLE.to_string(),
        subject: appointment.subject.clone(),
        date: format_date(appointment.date),
        time: format_time(appointment.time),
        location: appointment.location.clone(),
        attendees: appointment.attendees.clone(),
        footer: EXPORT_FOOTER.to_string(),
    })
}

impl ExportDocument {
    fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("Subject", self.subject.as_str()),
            ("Date", self.date.as_str()),
            ("Time", self.time.as_str()),
            ("Location", self.location.as_str()),
            ("Attendees", self.attendees.as_str()),
        ]
    }

    /// Suggested file name for the rendered letter.
    pub fn file_name(&self) -> String {
        format!("Appointment_{}.pdf", self.appointment_id)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out);
        for (label, value) in self.fields() {
            let _ = writeln!(out, "{label}: {value}");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.footer);
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        out.push_str("<html>\n<head>\n<style>\n");
        out.push_str("body { font-family: Arial, sans-serif; padding: 20px; }\n");
        out.push_str("h1 { color: #4CAF50; text-align: center; }\n");
        out.push_str("p { font-size: 16px; line-height: 1.5; }\n");
        out.push_str(
            ".footer { text-align: center; margin-top: 20px; font-size: 12px; color: #888; }\n",
        );
        out.push_str("</style>\n</head>\n<body>\n");
        let _ = writeln!(out, "<h1>{}</h1>", escape_html(&self.title));
        for (label, value) in self.fields() {
            let _ = writeln!(out, "<p><strong>{label}:</strong> {}</p>", escape_html(value));
        }
        let _ = writeln!(out, "<p class=\"footer\">{}</p>", escape_html(&self.footer));
        out.push_str("</body>\n</html>\n");
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
