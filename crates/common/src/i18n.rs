//! 多语言文案
//!
//! 每种语言对应一张静态 [`Strings`] 表，进程内只读，按请求选择。

use crate::models::ExpiryDate;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
    PtBr,
    Ar,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::En,
        Language::Es,
        Language::Fr,
        Language::PtBr,
        Language::Ar,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::PtBr => "pt_br",
            Self::Ar => "ar",
        }
    }

    pub fn strings(&self) -> &'static Strings {
        match self {
            Self::En => &EN,
            Self::Es => &ES,
            Self::Fr => &FR,
            Self::PtBr => &PT_BR,
            Self::Ar => &AR,
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, Self::Ar)
    }

    /// Parses a language code, falling back to `default` when unknown.
    pub fn from_code_or(code: Option<&str>, default: Language) -> Language {
        code.and_then(|c| c.parse().ok()).unwrap_or(default)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            "fr" => Ok(Self::Fr),
            "pt_br" | "pt-br" | "pt" => Ok(Self::PtBr),
            "ar" => Ok(Self::Ar),
            other => Err(format!("unsupported language {:?}", other)),
        }
    }
}

#[derive(Debug)]
pub struct Strings {
    pub verify_certificates: &'static str,
    pub code: &'static str,
    pub verify: &'static str,
    pub home: &'static str,
    pub language: &'static str,
    pub valid_certificate: &'static str,
    pub invalid_certificate: &'static str,
    pub alert_valid_certificate: &'static str,
    pub alert_invalid_certificate: &'static str,
    pub alert_not_verified: &'static str,
    pub certificate_details: &'static str,
    pub issued_to: &'static str,
    pub course: &'static str,
    pub date_issued: &'static str,
    pub full_name: &'static str,
    pub certificate: &'static str,
    pub expiry_date: &'static str,
    pub status: &'static str,
    pub view_certificate: &'static str,
    pub never: &'static str,
    pub months: [&'static str; 12],
}

pub static EN: Strings = Strings {
    verify_certificates: "Verify certificates",
    code: "Code",
    verify: "Verify",
    home: "Home",
    language: "English (en)",
    valid_certificate: "Valid",
    invalid_certificate: "Invalid",
    alert_valid_certificate: "This certificate is valid",
    alert_invalid_certificate: "The certificate is not valid. Please check the code and try again.",
    alert_not_verified: "Not verified",
    certificate_details: "Certificate Details",
    issued_to: "Issued To",
    course: "Course",
    date_issued: "Date Issued",
    full_name: "Full name",
    certificate: "Certificate",
    expiry_date: "Expiry date",
    status: "Status",
    view_certificate: "View certificate",
    never: "Never",
    months: [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ],
};

pub static ES: Strings = Strings {
    verify_certificates: "Verificar certificados",
    code: "Código",
    verify: "Verificar",
    home: "Página principal",
    language: "Español (es)",
    valid_certificate: "Válido",
    invalid_certificate: "Inválido",
    alert_valid_certificate: "Este certificado es válido",
    alert_invalid_certificate: "El certificado no es válido. Por favor, compruebe el código e inténtelo de nuevo.",
    alert_not_verified: "No verificado",
    certificate_details: "Detalles del Certificado",
    issued_to: "Emitido a",
    course: "Curso",
    date_issued: "Fecha y Hora de Emisión",
    full_name: "Nombre completo",
    certificate: "Certificado",
    expiry_date: "Fecha de vencimiento",
    status: "Estado",
    view_certificate: "Ver certificado",
    never: "Nunca",
    months: [
        "enero",
        "febrero",
        "marzo",
        "abril",
        "mayo",
        "junio",
        "julio",
        "agosto",
        "septiembre",
        "octubre",
        "noviembre",
        "diciembre",
    ],
};

pub static FR: Strings = Strings {
    verify_certificates: "Vérifier les certificats",
    code: "Code",
    verify: "Vérifier",
    home: "Accueil",
    language: "Français (fr)",
    valid_certificate: "Valide",
    invalid_certificate: "Invalide",
    alert_valid_certificate: "Le certificat est valide",
    alert_invalid_certificate: "Le certificat n'est pas valide. Veuillez vérifier le code et réessayer.",
    alert_not_verified: "Non vérifié",
    certificate_details: "Détails du Certificat",
    issued_to: "Délivré à",
    course: "Cours",
    date_issued: "Date et Heure d'émission",
    full_name: "Nom complet",
    certificate: "Certificat",
    expiry_date: "Date d'expiration",
    status: "Statut",
    view_certificate: "Voir le certificat",
    never: "Jamais",
    months: [
        "janvier",
        "février",
        "mars",
        "avril",
        "mai",
        "juin",
        "juillet",
        "août",
        "septembre",
        "octobre",
        "novembre",
        "décembre",
    ],
};

pub static PT_BR: Strings = Strings {
    verify_certificates: "Verificar certificados",
    code: "Código",
    verify: "Verificar",
    home: "Início",
    language: "Português (pt_br)",
    valid_certificate: "Válido",
    invalid_certificate: "Inválido",
    alert_valid_certificate: "O certificado é válido",
    alert_invalid_certificate: "O certificado não é válido. Por favor, verifique o código e tente novamente.",
    alert_not_verified: "Não verificado",
    certificate_details: "Detalhes do Certificado",
    issued_to: "Emitido para",
    course: "Curso",
    date_issued: "Data e Hora de Emissão",
    full_name: "Nome completo",
    certificate: "Certificado",
    expiry_date: "Data de validade",
    status: "Status",
    view_certificate: "Ver certificado",
    never: "Nunca",
    months: [
        "janeiro",
        "fevereiro",
        "março",
        "abril",
        "maio",
        "junho",
        "julho",
        "agosto",
        "setembro",
        "outubro",
        "novembro",
        "dezembro",
    ],
};

pub static AR: Strings = Strings {
    verify_certificates: "التحقق من الشهادات",
    code: "الرمز",
    verify: "التحقق",
    home: "الرئيسية",
    language: "العربية (ar)",
    valid_certificate: "صالح",
    invalid_certificate: "غير صالح",
    alert_valid_certificate: "الشهادة صالحة",
    alert_invalid_certificate: "الشهادة غير صالحة. يرجى التحقق من الرمز والمحاولة مرة أخرى.",
    alert_not_verified: "غير محقق",
    certificate_details: "تفاصيل الشهادة",
    issued_to: "صدرت ل",
    course: "دورة",
    date_issued: "تاريخ ووقت الإصدار",
    full_name: "الاسم الكامل",
    certificate: "شهادة",
    expiry_date: "تاريخ انتهاء الصلاحية",
    status: "الحالة",
    view_certificate: "عرض الشهادة",
    never: "أبداً",
    months: [
        "يناير",
        "فبراير",
        "مارس",
        "أبريل",
        "مايو",
        "يونيو",
        "يوليو",
        "أغسطس",
        "سبتمبر",
        "أكتوبر",
        "نوفمبر",
        "ديسمبر",
    ],
};

/// 长日期格式，例如 `June 20, 2025` / `20 de junio de 2025`
pub fn format_long_date(lang: Language, date: NaiveDate) -> String {
    let month = lang.strings().months[date.month0() as usize];
    let day = date.day();
    let year = date.year();
    match lang {
        Language::En => format!("{} {}, {}", month, day, year),
        Language::Es | Language::PtBr => format!("{} de {} de {}", day, month, year),
        Language::Fr | Language::Ar => format!("{} {} {}", day, month, year),
    }
}

/// 签发日期和时间
pub fn format_issued(lang: Language, issued_at: NaiveDateTime) -> String {
    let date = format_long_date(lang, issued_at.date());
    let (hour, minute) = (issued_at.hour(), issued_at.minute());
    match lang {
        Language::En => {
            let (is_pm, hour12) = issued_at.hour12();
            let suffix = if is_pm { "PM" } else { "AM" };
            format!("{} at {:02}:{:02} {}", date, hour12, minute, suffix)
        }
        Language::Es | Language::Ar => format!("{}, {:02}:{:02}", date, hour, minute),
        Language::Fr => format!("{} à {:02}:{:02}", date, hour, minute),
        Language::PtBr => format!("{} às {:02}:{:02}", date, hour, minute),
    }
}

/// 到期日，"Never" 显示为本地化文案
pub fn format_expiry(lang: Language, expiry: &ExpiryDate) -> String {
    match expiry {
        ExpiryDate::Never => lang.strings().never.to_string(),
        ExpiryDate::On(date) => format_long_date(lang, *date),
    }
}
