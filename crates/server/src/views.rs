//! Server-rendered verification page.

use certdesk_common::i18n::{format_expiry, format_issued};
use certdesk_common::{CertificateRecord, CertificateStatus, Language, VerificationOutcome};

/// Inputs of one render of the verification page.
pub struct VerifyPage<'a> {
    pub language: Language,
    /// Code as typed, echoed back into the form.
    pub code: Option<&'a str>,
    /// `None` until a code has been submitted.
    pub outcome: Option<&'a VerificationOutcome>,
}

impl VerifyPage<'_> {
    pub fn render(&self) -> String {
        let t = self.language.strings();
        let dir = if self.language.is_rtl() { "rtl" } else { "ltr" };
        let code = self.code.unwrap_or("");

        let mut html = String::from("<!DOCTYPE html>\n");
        html.push_str(&format!(
            "<html lang=\"{}\" dir=\"{}\">\n<head>\n<meta charset=\"utf-8\"/>\n",
            self.language.code(),
            dir
        ));
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"/>\n");
        html.push_str(&format!("<title>{}</title>\n", html_escape(t.verify_certificates)));
        html.push_str("</head>\n<body>\n");

        html.push_str("<nav class=\"languages\">\n");
        html.push_str(&format!("<span>{}</span>\n<ul>\n", html_escape(t.language)));
        for lang in Language::ALL {
            let mut href = format!("?lang={}", lang.code());
            if !code.is_empty() {
                href.push_str(&format!("&code={}", url_encode(code)));
            }
            html.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                html_escape(&href),
                html_escape(lang.strings().language)
            ));
        }
        html.push_str("</ul>\n</nav>\n");

        html.push_str("<main id=\"maincontent\">\n");
        html.push_str(&format!("<h1>{}</h1>\n", html_escape(t.verify_certificates)));
        html.push_str("<form method=\"get\" action=\"/verify\">\n");
        html.push_str(&format!(
            "<input type=\"hidden\" name=\"lang\" value=\"{}\"/>\n",
            self.language.code()
        ));
        html.push_str(&format!(
            "<label for=\"code\">{}</label>\n<input id=\"code\" name=\"code\" type=\"text\" value=\"{}\"/>\n",
            html_escape(t.code),
            html_escape(code)
        ));
        html.push_str(&format!(
            "<button type=\"submit\">{}</button>\n</form>\n",
            html_escape(t.verify)
        ));

        if let Some(outcome) = self.outcome {
            html.push_str("<section id=\"verification-result\">\n");
            html.push_str(&self.outcome_panel(outcome));
            html.push_str("</section>\n");
        }

        html.push_str("</main>\n</body>\n</html>\n");
        html
    }

    fn outcome_panel(&self, outcome: &VerificationOutcome) -> String {
        let t = self.language.strings();
        match outcome {
            VerificationOutcome::NotProvided => alert("alert-danger", t.alert_not_verified),
            VerificationOutcome::NotFound => alert("alert-danger", t.alert_invalid_certificate),
            VerificationOutcome::Found(record) => {
                let mut html = alert("alert-success", t.alert_valid_certificate);
                html.push_str(&details_table(self.language, record));
                html.push_str(&format!(
                    "<a class=\"btn\" href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>\n",
                    html_escape(&certificate_link(record)),
                    html_escape(t.view_certificate)
                ));
                html
            }
        }
    }
}

fn alert(class: &str, message: &str) -> String {
    format!(
        "<div class=\"alert {}\" role=\"alert\">{}</div>\n",
        class,
        html_escape(message)
    )
}

fn details_table(language: Language, record: &CertificateRecord) -> String {
    let t = language.strings();
    let course = if record.certificate.trim().is_empty() {
        "N/A"
    } else {
        record.certificate.as_str()
    };
    let status = match record.status {
        CertificateStatus::Valid => t.valid_certificate,
        CertificateStatus::Invalid => t.invalid_certificate,
    };
    let rows = [
        (t.full_name, record.full_name()),
        (t.certificate, course.to_string()),
        (t.date_issued, format_issued(language, record.issued_at())),
        (t.expiry_date, format_expiry(language, &record.expiry_date)),
        (t.status, status.to_string()),
    ];

    let mut html = String::from("<table class=\"details\">\n<tbody>\n");
    for (label, value) in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            html_escape(label),
            html_escape(&value)
        ));
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

/// Stored attachment if any, else the generated PDF.
fn certificate_link(record: &CertificateRecord) -> String {
    match record.pdf_url.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => url.to_string(),
        None => format!("/api/v1/generate-certificate?id={}", url_encode(&record.id)),
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn url_encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::record;

    fn page(language: Language, outcome: Option<&VerificationOutcome>) -> String {
        VerifyPage {
            language,
            code: Some("6606202546RH"),
            outcome,
        }
        .render()
    }

    #[test]
    fn form_only_before_submission() {
        let html = page(Language::En, None);
        assert!(html.contains("<h1>Verify certificates</h1>"));
        assert!(html.contains("value=\"6606202546RH\""));
        assert!(!html.contains("verification-result"));
    }

    #[test]
    fn not_provided_and_not_found_alerts() {
        let html = page(Language::En, Some(&VerificationOutcome::NotProvided));
        assert!(html.contains("alert-danger"));
        assert!(html.contains("Not verified"));

        let html = page(Language::En, Some(&VerificationOutcome::NotFound));
        assert!(html.contains("The certificate is not valid."));
        assert!(!html.contains("<table"));
    }

    #[test]
    fn found_shows_details_and_generated_pdf_link() {
        let outcome = VerificationOutcome::Found(record());
        let html = page(Language::Es, Some(&outcome));
        assert!(html.contains("alert-success"));
        assert!(html.contains("Ana Lucía Ruiz"));
        assert!(html.contains("Data Literacy"));
        assert!(html.contains("20 de junio de 2025, 14:30"));
        assert!(html.contains("Nunca"));
        assert!(html.contains("href=\"/api/v1/generate-certificate?id=6606202546RH\""));
    }

    #[test]
    fn found_links_to_stored_pdf_and_labels_invalid_status() {
        let mut record = record();
        record.status = CertificateStatus::Invalid;
        record.pdf_url = Some("https://files.example.com/certificates/a.pdf?x=1&y=2".into());
        let html = page(Language::En, Some(&VerificationOutcome::Found(record)));
        assert!(html.contains("href=\"https://files.example.com/certificates/a.pdf?x=1&amp;y=2\""));
        assert!(html.contains("<td>Status</td><td>Invalid</td>"));
    }

    #[test]
    fn arabic_is_right_to_left() {
        let html = page(Language::Ar, None);
        assert!(html.contains("<html lang=\"ar\" dir=\"rtl\">"));
    }

    #[test]
    fn interpolated_values_are_escaped() {
        let mut record = record();
        record.first_name = "<script>alert(1)</script>".to_string();
        let html = VerifyPage {
            language: Language::En,
            code: Some("\"><img>"),
            outcome: Some(&VerificationOutcome::Found(record)),
        }
        .render();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("value=\"&quot;&gt;&lt;img&gt;\""));
    }
}
